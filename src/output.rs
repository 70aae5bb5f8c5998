use crate::config::ExtraArgs;
use crate::ffmpeg::{encoder_for, EncodeOptions, FfmpegWriter};
use crate::frame::Frame;
use crate::uri::{Protocol, Uri};
use anyhow::{bail, Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub fn usage() -> &'static str {
    "videoOutput arguments:
    output               URI of the output stream, for example:
                           * file://my_image.jpg      (image file)
                           * file://my_images/img_%i.jpg (numbered images)
                           * file://my_video.mp4      (video file)
                           * rtp://<remote-ip>:1234   (RTP stream)
                           * rtmp://<remote-ip>/live  (RTMP stream)
                           * display://0              (no window, runs headless)
                         video files and network streams are encoded by ffmpeg
  --output-codec=CODEC   desired codec for compressed output streams:
                            * h264 (default)
                            * h265
                            * vp8
                            * vp9
                            * mjpeg
  --output-rate=RATE     framerate of compressed output streams (default 30)
  --bitrate=BITRATE      desired target VBR bitrate for compressed streams,
                         in bits per second. The default is 4000000 (4 Mbps)
  --headless             don't create a display window
"
}

/// Consumer of annotated frames.
pub trait VideoOutput {
    fn render(&mut self, frame: &Frame) -> Result<()>;

    /// Status line, shown where a title bar would be.
    fn set_status(&mut self, status: &str);

    /// `false` once the consumer went away.
    fn is_streaming(&self) -> bool;
}

impl<O: VideoOutput + ?Sized> VideoOutput for Box<O> {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        (**self).render(frame)
    }

    fn set_status(&mut self, status: &str) {
        (**self).set_status(status)
    }

    fn is_streaming(&self) -> bool {
        (**self).is_streaming()
    }
}

/// Opens the sink named by `uri`.
pub fn open_output(uri: &str, extra: &ExtraArgs) -> Result<Box<dyn VideoOutput>> {
    let uri = Uri::parse(uri);
    info!(output = %uri, "opening video output");
    if extra.flag("headless") {
        return Ok(Box::new(HeadlessOutput::default()));
    }
    let output: Box<dyn VideoOutput> = match uri.protocol {
        Protocol::Default | Protocol::Display => {
            warn!("no display available, running headless");
            Box::new(HeadlessOutput::default())
        }
        Protocol::File if uri.is_image() => Box::new(ImageWriter::new(&uri.location)),
        Protocol::File if uri.is_video() => Box::new(FfmpegOutput::new(
            uri.location.clone(),
            encode_options(extra, None)?,
        )),
        Protocol::File => bail!("unsupported output file extension in {uri}"),
        Protocol::Rtp => Box::new(FfmpegOutput::new(
            uri.string.clone(),
            encode_options(extra, Some("rtp"))?,
        )),
        Protocol::Rtmp => Box::new(FfmpegOutput::new(
            uri.string.clone(),
            encode_options(extra, Some("flv"))?,
        )),
        _ => return Err(uri.unsupported().into()),
    };
    Ok(output)
}

fn encode_options(extra: &ExtraArgs, format: Option<&'static str>) -> Result<EncodeOptions> {
    let codec = extra.value("output-codec").unwrap_or("h264").to_string();
    encoder_for(&codec)?;
    Ok(EncodeOptions {
        codec,
        bitrate: extra.parsed_or("bitrate", 4_000_000u32)?,
        rate: extra.parsed_or("output-rate", 30.0f32)?,
        format,
    })
}

/// Discards frames; the status line goes to the log.
#[derive(Debug, Default)]
pub struct HeadlessOutput {
    rendered: u64,
    status: String,
}

impl HeadlessOutput {
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

impl VideoOutput for HeadlessOutput {
    fn render(&mut self, _frame: &Frame) -> Result<()> {
        self.rendered += 1;
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        if status != self.status {
            debug!(%status, "status");
            self.status = status.to_string();
        }
    }

    fn is_streaming(&self) -> bool {
        true
    }
}

/// Saves each frame as an image. `%i` in the path becomes the frame number,
/// otherwise the same file is rewritten every frame.
pub struct ImageWriter {
    pattern: String,
    written: u64,
}

impl ImageWriter {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            written: 0,
        }
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        PathBuf::from(self.pattern.replace("%i", &index.to_string()))
    }
}

impl VideoOutput for ImageWriter {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        let path = self.path_for(self.written);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        frame
            .image()
            .save(&path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        debug!(path = %path.display(), "saved frame");
        self.written += 1;
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        debug!(%status, "status");
    }

    fn is_streaming(&self) -> bool {
        true
    }
}

/// Encodes frames through ffmpeg. The encoder starts with the first frame.
pub struct FfmpegOutput {
    target: String,
    options: EncodeOptions,
    writer: Option<FfmpegWriter>,
    streaming: bool,
}

impl FfmpegOutput {
    pub fn new(target: String, options: EncodeOptions) -> Self {
        Self {
            target,
            options,
            writer: None,
            streaming: true,
        }
    }
}

impl VideoOutput for FfmpegOutput {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        let size = (frame.width(), frame.height());
        if let Some(writer) = &self.writer {
            if writer.size() != size {
                bail!(
                    "frame size changed from {:?} to {size:?} while encoding {}",
                    writer.size(),
                    self.target
                );
            }
        }
        let writer = match self.writer.take() {
            Some(w) => w,
            None => FfmpegWriter::spawn(&self.target, size, &self.options)?,
        };
        let writer = self.writer.insert(writer);
        match writer.write_frame(frame.image()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                warn!(output = %self.target, "encoder closed its input");
                self.streaming = false;
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("failed to encode frame to {}", self.target)),
        }
    }

    fn set_status(&mut self, status: &str) {
        debug!(%status, "status");
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }
}
