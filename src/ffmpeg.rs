//! Compressed video through `ffmpeg` child processes exchanging raw RGB24.

use crossbeam_channel::{bounded, Receiver, Sender};
use image::RgbImage;
use std::io::{self, ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FfmpegError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("could not determine the frame size of {0:?}, pass --input-width and --input-height")]
    Probe(String),
    #[error("decoder stream failed: {0}")]
    Read(#[from] io::Error),
    #[error("unsupported codec {0:?}")]
    Codec(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    pub size: (u32, u32),
    pub rate: Option<f32>,
    /// Extra passes over a file input, `-1` for endless.
    pub loops: i32,
    pub queue: usize,
}

/// Starts a decoder for `uri` and returns the channel its frames arrive on.
///
/// The channel disconnects once the stream ends; a decode failure is sent as
/// the last message.
pub fn spawn_decoder(
    uri: &str,
    is_file: bool,
    options: &DecodeOptions,
) -> Result<Receiver<Result<RgbImage, FfmpegError>>, FfmpegError> {
    let (width, height) = options.size;
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "error"]);
    if uri.starts_with("rtsp") {
        cmd.args(["-rtsp_transport", "tcp"]);
    }
    if is_file && options.loops != 0 {
        cmd.arg("-stream_loop").arg(options.loops.to_string());
    }
    cmd.arg("-i").arg(uri).arg("-an");
    cmd.arg("-vf").arg(format!("scale={width}:{height}"));
    if let Some(rate) = options.rate {
        cmd.arg("-r").arg(rate.to_string());
    }
    cmd.args(["-pix_fmt", "rgb24", "-f", "rawvideo", "-"]);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    debug!(?cmd, "starting decoder");

    let mut child = cmd.spawn().map_err(|source| FfmpegError::Spawn {
        program: "ffmpeg",
        source,
    })?;
    let stdout = child.stdout.take().ok_or_else(|| FfmpegError::Spawn {
        program: "ffmpeg",
        source: io::Error::new(ErrorKind::BrokenPipe, "stdout not captured"),
    })?;

    let (tx, rx) = bounded(options.queue.max(1));
    let size = options.size;
    thread::spawn(move || {
        if let Err(err) = decode_loop(stdout, size, &tx) {
            let _ = tx.send(Err(err));
        }
        let _ = child.kill();
        let _ = child.wait();
    });
    Ok(rx)
}

fn decode_loop(
    mut stdout: impl Read,
    (width, height): (u32, u32),
    tx: &Sender<Result<RgbImage, FfmpegError>>,
) -> Result<(), FfmpegError> {
    let frame_bytes = width as usize * height as usize * 3;
    let mut buffer = vec![0u8; frame_bytes];
    loop {
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {
                let Some(image) = RgbImage::from_raw(width, height, buffer.clone()) else {
                    return Err(FfmpegError::Read(io::Error::new(
                        ErrorKind::InvalidData,
                        "short frame",
                    )));
                };
                if tx.send(Ok(image)).is_err() {
                    return Ok(());
                }
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Frame size of the first video stream, as reported by `ffprobe`.
pub fn probe_size(uri: &str) -> Result<(u32, u32), FfmpegError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(uri)
        .output()
        .map_err(|source| FfmpegError::Spawn {
            program: "ffprobe",
            source,
        })?;
    parse_size(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| FfmpegError::Probe(uri.to_string()))
}

/// Parses `WIDTHxHEIGHT`.
pub fn parse_size(text: &str) -> Option<(u32, u32)> {
    let (w, h) = text.trim().lines().next()?.split_once('x')?;
    let size = (w.trim().parse().ok()?, h.trim().parse().ok()?);
    (size.0 > 0 && size.1 > 0).then_some(size)
}

/// Maps a codec name to the ffmpeg encoder used for it.
pub fn encoder_for(codec: &str) -> Result<&'static str, FfmpegError> {
    match codec.to_ascii_lowercase().as_str() {
        "h264" => Ok("libx264"),
        "h265" | "hevc" => Ok("libx265"),
        "vp8" => Ok("libvpx"),
        "vp9" => Ok("libvpx-vp9"),
        "mjpeg" => Ok("mjpeg"),
        other => Err(FfmpegError::Codec(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub codec: String,
    pub bitrate: u32,
    pub rate: f32,
    /// Container forced with `-f`, needed for network targets.
    pub format: Option<&'static str>,
}

/// An encoder process fed with raw frames on stdin.
pub struct FfmpegWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    size: (u32, u32),
}

impl FfmpegWriter {
    pub fn spawn(target: &str, size: (u32, u32), options: &EncodeOptions) -> Result<Self, FfmpegError> {
        let encoder = encoder_for(&options.codec)?;
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"]);
        cmd.args(["-f", "rawvideo", "-pix_fmt", "rgb24"]);
        cmd.arg("-s").arg(format!("{}x{}", size.0, size.1));
        cmd.arg("-r").arg(options.rate.to_string());
        cmd.args(["-i", "-", "-c:v", encoder]);
        cmd.arg("-b:v").arg(options.bitrate.to_string());
        if encoder != "mjpeg" {
            cmd.args(["-pix_fmt", "yuv420p"]);
        }
        if let Some(format) = options.format {
            cmd.args(["-f", format]);
        }
        cmd.arg(target);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        debug!(?cmd, "starting encoder");

        let mut child = cmd.spawn().map_err(|source| FfmpegError::Spawn {
            program: "ffmpeg",
            source,
        })?;
        let stdin = child.stdin.take();
        Ok(Self { child, stdin, size })
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn write_frame(&mut self, image: &RgbImage) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(ErrorKind::BrokenPipe, "encoder closed"))?;
        stdin.write_all(image.as_raw())
    }

    /// Closes stdin and waits for the encoder to flush its output.
    pub fn finish(&mut self) {
        if self.stdin.take().is_some() {
            match self.child.wait() {
                Ok(status) if !status.success() => warn!(%status, "encoder exited"),
                Ok(_) => {}
                Err(e) => warn!("failed to wait for encoder: {e}"),
            }
        }
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        self.finish();
    }
}
