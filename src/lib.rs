pub mod captions;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod ffmpeg;
pub mod font;
pub mod frame;
pub mod labels;
pub mod layout;
pub mod log;
pub mod network;
pub mod output;
pub mod pipeline;
pub mod profiler;
pub mod source;
pub mod uri;

pub use captions::{caption_for, CaptionEntry, CaptionLine, LinePattern, Slot, CAPTIONS};
pub use classifier::{Classifier, Prediction};
pub use cli::{execute, parse_args, run_cli, split_known_args, Cli, Invocation};
pub use config::{ExtraArgs, RunConfig};
pub use font::{BitmapFont, TextOverlay};
pub use frame::Frame;
pub use layout::OverlayLayout;
pub use output::VideoOutput;
pub use pipeline::{annotate, format_percent, LoopState, Pipeline, Step};
pub use source::VideoSource;
