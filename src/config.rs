use serde::Serialize;
use std::str::FromStr;
use std::{env, path::PathBuf};
use thiserror::Error;

pub const DEFAULT_NETWORK: &str = "googlenet";
pub const DEFAULT_TOP_K: usize = 1;

/// Settings resolved once from the command line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub input: String,
    pub output: String,
    pub network: String,
    pub top_k: usize,
    pub extra: ExtraArgs,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            network: DEFAULT_NETWORK.to_string(),
            top_k: DEFAULT_TOP_K,
            extra: ExtraArgs::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ArgError {
    #[error("invalid value {value:?} for --{key}")]
    InvalidValue { key: String, value: String },
    #[error("--{key} requires a value")]
    MissingValue { key: String },
}

/// Flags the argument resolver did not recognize, kept verbatim and in order.
///
/// Collaborators look up their own options here using the `--key=value` or
/// bare `--key` forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtraArgs {
    raw: Vec<String>,
}

impl ExtraArgs {
    pub fn new(raw: Vec<String>) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.raw.iter().filter_map(|arg| {
            let body = arg.trim_start_matches('-');
            if body.is_empty() || body.len() == arg.len() {
                return None;
            }
            match body.split_once('=') {
                Some((k, v)) => Some((k, Some(v))),
                None => Some((body, None)),
            }
        })
    }

    /// Whether `--key` (or `--key=<anything>`) was passed. A later occurrence wins.
    pub fn flag(&self, key: &str) -> bool {
        self.entries()
            .filter(|(k, _)| *k == key)
            .last()
            .map(|(_, v)| !matches!(v, Some("false") | Some("0")))
            .unwrap_or(false)
    }

    /// The value of the last `--key=value` occurrence.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.entries()
            .filter(|(k, _)| *k == key)
            .filter_map(|(_, v)| v)
            .last()
    }

    pub fn parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ArgError> {
        match self.value(key) {
            Some(v) => v.parse().map(Some).map_err(|_| ArgError::InvalidValue {
                key: key.to_string(),
                value: v.to_string(),
            }),
            None if self.flag(key) => Err(ArgError::MissingValue {
                key: key.to_string(),
            }),
            None => Ok(None),
        }
    }

    pub fn parsed_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ArgError> {
        Ok(self.parsed(key)?.unwrap_or(default))
    }
}

/// Directory holding the downloaded networks and the optional `models.json`.
pub fn networks_dir() -> PathBuf {
    env::var_os("IMAGENET_NETWORKS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("networks"))
}

/// Hugging Face repository used to fetch model files missing on disk.
pub fn model_repo(extra: &ExtraArgs) -> Option<String> {
    extra
        .value("model-repo")
        .map(str::to_string)
        .or_else(|| env::var("IMAGENET_MODEL_REPO").ok())
        .filter(|r| !r.is_empty())
}
