use std::fmt;
use std::path::Path;
use thiserror::Error;

pub const IMAGE_EXTENSIONS: [&str; 9] = ["jpg", "jpeg", "png", "bmp", "gif", "tga", "tif", "tiff", "webp"];
pub const VIDEO_EXTENSIONS: [&str; 8] = ["mp4", "mkv", "avi", "mov", "webm", "flv", "h264", "h265"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// Empty URI: the default device.
    Default,
    V4l2,
    Csi,
    File,
    Rtsp,
    Rtp,
    Rtmp,
    Http,
    Display,
    Other(String),
}

#[derive(Debug, Error)]
pub enum UriError {
    #[error("unsupported protocol {protocol:?} in {uri:?}")]
    Unsupported { protocol: String, uri: String },
    #[error("invalid device in {0:?}")]
    Device(String),
}

/// A parsed stream resource such as `v4l2:///dev/video0` or `images/*.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub string: String,
    pub protocol: Protocol,
    /// Path, device or address following the protocol.
    pub location: String,
    /// Lowercase file extension, empty when there is none.
    pub extension: String,
}

impl Uri {
    pub fn parse(input: &str) -> Self {
        let string = input.trim().to_string();
        if string.is_empty() {
            return Self {
                string,
                protocol: Protocol::Default,
                location: String::new(),
                extension: String::new(),
            };
        }

        let (protocol, location) = match string.split_once("://") {
            Some((scheme, rest)) => {
                let protocol = match scheme.to_ascii_lowercase().as_str() {
                    "v4l2" => Protocol::V4l2,
                    "csi" => Protocol::Csi,
                    "file" => Protocol::File,
                    "rtsp" | "rtsps" => Protocol::Rtsp,
                    "rtp" | "udp" => Protocol::Rtp,
                    "rtmp" => Protocol::Rtmp,
                    "http" | "https" => Protocol::Http,
                    "display" => Protocol::Display,
                    other => Protocol::Other(other.to_string()),
                };
                (protocol, rest.to_string())
            }
            None if string.starts_with("/dev/video") => (Protocol::V4l2, string.clone()),
            None => (Protocol::File, string.clone()),
        };

        let extension = match protocol {
            Protocol::File | Protocol::Http => Path::new(&location)
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default(),
            _ => String::new(),
        };

        Self {
            string,
            protocol,
            location,
            extension,
        }
    }

    pub fn is_image(&self) -> bool {
        IMAGE_EXTENSIONS.contains(&self.extension.as_str())
    }

    pub fn is_video(&self) -> bool {
        VIDEO_EXTENSIONS.contains(&self.extension.as_str())
    }

    /// Camera index for `v4l2://`, `csi://`, `/dev/videoN` and the default device.
    pub fn device_index(&self) -> Result<u32, UriError> {
        let digits = match self.protocol {
            Protocol::Default => return Ok(0),
            Protocol::V4l2 => self
                .location
                .strip_prefix("/dev/video")
                .unwrap_or(&self.location),
            Protocol::Csi | Protocol::Display => self.location.as_str(),
            _ => return Err(UriError::Device(self.string.clone())),
        };
        if digits.is_empty() {
            return Ok(0);
        }
        digits
            .parse()
            .map_err(|_| UriError::Device(self.string.clone()))
    }

    pub fn unsupported(&self) -> UriError {
        let protocol = match &self.protocol {
            Protocol::Other(p) => p.clone(),
            p => format!("{p:?}").to_lowercase(),
        };
        UriError::Unsupported {
            protocol,
            uri: self.string.clone(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.string.is_empty() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.string)
        }
    }
}
