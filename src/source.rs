use crate::config::ExtraArgs;
use crate::ffmpeg::{probe_size, spawn_decoder, DecodeOptions, FfmpegError};
use crate::frame::Frame;
use crate::uri::{Protocol, Uri, IMAGE_EXTENSIONS};
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use image::imageops::{self, FilterType};
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType},
    Camera,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub fn usage() -> &'static str {
    "videoSource arguments:
    input                URI of the input stream, for example:
                           * /dev/video0              (V4L2 camera #0)
                           * csi://0                  (camera #0, same as v4l2)
                           * file://my_image.jpg      (image file)
                           * file://my_folder/        (directory of images)
                           * file://my_images/*.jpg   (wildcard of images)
                           * file://my_video.mp4      (video file)
                           * rtsp://<host>:<port>     (RTSP stream)
                           * rtp://@:1234             (RTP stream)
                         video files and network streams are decoded by ffmpeg
  --input-width=WIDTH    explicitly request a width of the stream (optional)
  --input-height=HEIGHT  explicitly request a height of the stream (optional)
  --input-rate=RATE      explicitly request a framerate of the stream (optional)
  --input-loop=LOOP      for file-based inputs, the number of loops to run:
                           * -1 = loop forever
                           *  0 = don't loop (default)
                           * >0 = set number of loops
  --input-timeout=MS     capture timeout for decoded streams (default 1000)
"
}

/// A stream of frames.
pub trait VideoSource {
    /// The next frame, or `None` when none arrived in time.
    fn capture(&mut self) -> Result<Option<Frame>>;

    /// `false` once the stream has ended or the device went away.
    fn is_streaming(&self) -> bool;
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn capture(&mut self) -> Result<Option<Frame>> {
        (**self).capture()
    }

    fn is_streaming(&self) -> bool {
        (**self).is_streaming()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rate: Option<f32>,
    pub loops: i32,
    pub timeout: Duration,
}

impl SourceOptions {
    pub fn from_args(extra: &ExtraArgs) -> Result<Self> {
        Ok(Self {
            width: extra.parsed("input-width")?,
            height: extra.parsed("input-height")?,
            rate: extra.parsed("input-rate")?,
            loops: extra.parsed_or("input-loop", 0)?,
            timeout: Duration::from_millis(extra.parsed_or("input-timeout", 1000u64)?),
        })
    }

    fn size(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// Opens the source named by `uri`.
pub fn open_source(uri: &str, extra: &ExtraArgs) -> Result<Box<dyn VideoSource>> {
    let uri = Uri::parse(uri);
    let options = SourceOptions::from_args(extra)?;
    info!(input = %uri, "opening video source");
    let source: Box<dyn VideoSource> = match uri.protocol {
        Protocol::Default | Protocol::V4l2 | Protocol::Csi => {
            Box::new(CameraSource::open(uri.device_index()?, &options)?)
        }
        Protocol::File if !uri.is_video() => Box::new(ImageSequence::open(&uri.location, &options)?),
        Protocol::File => Box::new(FfmpegSource::open(&uri.location, true, &options)?),
        Protocol::Rtsp | Protocol::Rtp | Protocol::Rtmp | Protocol::Http => {
            Box::new(FfmpegSource::open(&uri.string, false, &options)?)
        }
        _ => return Err(uri.unsupported().into()),
    };
    Ok(source)
}

/// A local camera read through nokhwa.
pub struct CameraSource {
    cam: Camera,
    next_index: u64,
}

impl CameraSource {
    pub fn open(index: u32, options: &SourceOptions) -> Result<Self> {
        let rate = options.rate.map(|r| r.round() as u32).unwrap_or(30);
        let sizes = match options.size() {
            Some(size) => vec![size],
            None => vec![(1280, 720), (640, 480)],
        };
        let mut cam = None;
        'search: for (w, h) in sizes {
            for fmt in [FrameFormat::RAWRGB, FrameFormat::MJPEG, FrameFormat::YUYV] {
                let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                    CameraFormat::new_from(w, h, fmt, rate),
                ));
                if let Ok(c) = Camera::new(CameraIndex::Index(index), req) {
                    cam = Some(c);
                    break 'search;
                }
            }
        }
        let fallback = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let mut cam = match cam {
            Some(c) => c,
            None => Camera::new(CameraIndex::Index(index), fallback)
                .map_err(|e| anyhow!("failed to open camera #{index}: {e}"))?,
        };
        cam.open_stream()
            .map_err(|e| anyhow!("failed to open camera stream: {e}"))?;
        debug!(format = ?cam.camera_format(), "camera stream opened");
        Ok(Self { cam, next_index: 0 })
    }
}

impl VideoSource for CameraSource {
    fn capture(&mut self) -> Result<Option<Frame>> {
        let buffer = self
            .cam
            .frame()
            .map_err(|e| anyhow!("failed to capture frame: {e}"))?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow!("failed to decode frame: {e}"))?;
        let frame = Frame::new(image, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn is_streaming(&self) -> bool {
        self.cam.is_stream_open()
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            warn!("failed to stop camera stream: {e}");
        }
    }
}

/// Still images from a file, a directory or a glob pattern, in name order.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    position: usize,
    loops_left: i32,
    resize: Option<(u32, u32)>,
    next_index: u64,
    streaming: bool,
}

impl ImageSequence {
    pub fn open(location: &str, options: &SourceOptions) -> Result<Self> {
        let paths = list_images(location)?;
        if paths.is_empty() {
            bail!("no images found in {location}");
        }
        debug!(count = paths.len(), "image sequence");
        Ok(Self::from_paths(paths, options))
    }

    pub fn from_paths(paths: Vec<PathBuf>, options: &SourceOptions) -> Self {
        Self {
            streaming: !paths.is_empty(),
            paths,
            position: 0,
            loops_left: options.loops,
            resize: options.size(),
            next_index: 0,
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn advance(&mut self) {
        self.position += 1;
        if self.position < self.paths.len() {
            return;
        }
        if self.loops_left == 0 {
            self.streaming = false;
        } else {
            if self.loops_left > 0 {
                self.loops_left -= 1;
            }
            self.position = 0;
        }
    }
}

impl VideoSource for ImageSequence {
    fn capture(&mut self) -> Result<Option<Frame>> {
        if !self.streaming {
            return Ok(None);
        }
        let path = &self.paths[self.position];
        let image = image::open(path)
            .with_context(|| format!("failed to load image {}", path.display()))?
            .into_rgb8();
        let image = match self.resize {
            Some((w, h)) if (w, h) != image.dimensions() => {
                imageops::resize(&image, w, h, FilterType::Triangle)
            }
            _ => image,
        };
        let frame = Frame::new(image, self.next_index);
        self.next_index += 1;
        self.advance();
        Ok(Some(frame))
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_string_lossy().to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

/// Expands a file, directory or glob pattern (`*`, `?`, `[..]`, also in
/// directory components) into image paths sorted by name.
pub fn list_images(location: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(location);
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let pattern = if path.is_dir() {
        let dir = glob::Pattern::escape(location.trim_end_matches('/'));
        format!("{dir}/*")
    } else if location.contains(['*', '?', '[']) {
        location.to_string()
    } else {
        bail!("image {location} not found");
    };
    let mut paths = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("invalid image pattern {location}"))? {
        match entry {
            Ok(p) if is_image_file(&p) => paths.push(p),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable path: {e}"),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Video files and network streams decoded by an ffmpeg child process.
pub struct FfmpegSource {
    frames: Receiver<Result<RgbImage, FfmpegError>>,
    timeout: Duration,
    next_index: u64,
    streaming: bool,
}

impl FfmpegSource {
    pub fn open(uri: &str, is_file: bool, options: &SourceOptions) -> Result<Self> {
        let size = match options.size() {
            Some(size) => size,
            None => probe_size(uri)?,
        };
        let decode = DecodeOptions {
            size,
            rate: options.rate,
            loops: options.loops,
            queue: 4,
        };
        let frames = spawn_decoder(uri, is_file, &decode)?;
        Ok(Self::from_channel(frames, options.timeout))
    }

    pub fn from_channel(frames: Receiver<Result<RgbImage, FfmpegError>>, timeout: Duration) -> Self {
        Self {
            frames,
            timeout,
            next_index: 0,
            streaming: true,
        }
    }
}

impl VideoSource for FfmpegSource {
    fn capture(&mut self) -> Result<Option<Frame>> {
        match self.frames.recv_timeout(self.timeout) {
            Ok(Ok(image)) => {
                let frame = Frame::new(image, self.next_index);
                self.next_index += 1;
                Ok(Some(frame))
            }
            Ok(Err(e)) => {
                self.streaming = false;
                Err(e.into())
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                debug!("decoder reached end of stream");
                self.streaming = false;
                Ok(None)
            }
        }
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }
}
