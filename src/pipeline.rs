use crate::captions::caption_for;
use crate::classifier::{Classifier, Prediction};
use crate::font::TextOverlay;
use crate::frame::Frame;
use crate::layout::OverlayLayout;
use crate::output::VideoOutput;
use crate::source::VideoSource;
use anyhow::Result;
use std::io::Write;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The source timed out; nothing was classified or rendered.
    Skipped,
    Rendered { predictions: usize },
}

/// Confidence as a zero-padded percentage with two decimals, e.g. `07.50`.
pub fn format_percent(confidence: f32) -> String {
    format!("{:05.2}", confidence * 100.0)
}

/// Logs the predictions to `console` and draws them, with their feeding
/// captions, onto `frame`.
pub fn annotate<C, F, W>(
    frame: &mut Frame,
    predictions: &[Prediction],
    net: &C,
    font: &F,
    layout: &OverlayLayout,
    console: &mut W,
) -> Result<()>
where
    C: Classifier + ?Sized,
    F: TextOverlay + ?Sized,
    W: Write + ?Sized,
{
    let line_height = font.line_height();
    let frame_height = frame.height();
    for (n, prediction) in predictions.iter().enumerate() {
        let label = net.class_label(prediction.class_id).unwrap_or("");
        let percent = format_percent(prediction.confidence);
        writeln!(
            console,
            "imagenet:  {percent}% class #{} ({label})",
            prediction.class_id
        )?;

        if let Some(caption) = caption_for(prediction.class_id) {
            writeln!(console, "{}", caption.summary)?;
            for line in caption.lines {
                let y = layout.caption_y(frame_height, predictions.len(), line_height, line.slot, n);
                font.overlay(
                    frame,
                    line.text,
                    layout.margin_x,
                    y,
                    layout.foreground,
                    layout.background,
                )?;
            }
        }

        font.overlay(
            frame,
            &format!("{percent}% {label}, "),
            layout.margin_x,
            layout.label_y(n, line_height),
            layout.foreground,
            layout.background,
        )?;
    }
    Ok(())
}

/// Capture, classify, annotate and render until the source or the output
/// stops streaming.
pub struct Pipeline<S, O, C, F> {
    source: S,
    output: O,
    net: C,
    font: F,
    top_k: usize,
    layout: OverlayLayout,
    state: LoopState,
    rendered: u64,
}

impl<S, O, C, F> Pipeline<S, O, C, F>
where
    S: VideoSource,
    O: VideoOutput,
    C: Classifier,
    F: TextOverlay,
{
    pub fn new(source: S, output: O, net: C, font: F, top_k: usize) -> Self {
        Self {
            source,
            output,
            net,
            font,
            top_k,
            layout: OverlayLayout::default(),
            state: LoopState::Running,
            rendered: 0,
        }
    }

    pub fn with_layout(mut self, layout: OverlayLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames handed to the output so far.
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn classifier(&self) -> &C {
        &self.net
    }

    pub fn into_parts(self) -> (S, O, C, F) {
        (self.source, self.output, self.net, self.font)
    }

    fn check_streaming(&mut self) {
        if !self.source.is_streaming() || !self.output.is_streaming() {
            debug!(
                source = self.source.is_streaming(),
                output = self.output.is_streaming(),
                "stream ended"
            );
            self.state = LoopState::Stopped;
        }
    }

    /// Runs a single iteration. Does nothing once stopped.
    pub fn step<W: Write + ?Sized>(&mut self, console: &mut W) -> Result<Step> {
        if self.state == LoopState::Stopped {
            return Ok(Step::Skipped);
        }
        let Some(mut frame) = self.source.capture()? else {
            // a timeout from a live source is retried on the next iteration
            self.check_streaming();
            return Ok(Step::Skipped);
        };

        let predictions = self.net.classify(&frame, self.top_k)?;
        annotate(
            &mut frame,
            &predictions,
            &self.net,
            &self.font,
            &self.layout,
            console,
        )?;
        trace!(frame = frame.index(), predictions = predictions.len(), "annotated");

        self.output.render(&frame)?;
        self.rendered += 1;
        let status = format!(
            "{} | Network {:.0} FPS",
            self.net.network_name(),
            self.net.network_fps()
        );
        self.output.set_status(&status);
        self.net.print_profiler_times();

        self.check_streaming();
        Ok(Step::Rendered {
            predictions: predictions.len(),
        })
    }

    /// Loops until stopped and returns the number of rendered frames.
    pub fn run<W: Write + ?Sized>(&mut self, console: &mut W) -> Result<u64> {
        info!(
            network = self.net.network_name(),
            classes = self.net.num_classes(),
            top_k = self.top_k,
            "processing started"
        );
        while self.state == LoopState::Running {
            self.step(console)?;
        }
        info!(frames = self.rendered, "processing finished");
        Ok(self.rendered)
    }
}
