use crate::config::{model_repo, ExtraArgs, RunConfig, DEFAULT_NETWORK, DEFAULT_TOP_K};
use crate::font::BitmapFont;
use crate::log::init_tracing;
use crate::network::{resolve_network, OnnxClassifier};
use crate::output::open_output;
use crate::pipeline::Pipeline;
use crate::source::open_source;
use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "imagenet-feeder",
    version,
    about = "Classify a live camera stream using an image recognition DNN.",
    after_help = usage_epilog()
)]
pub struct Cli {
    /// URI of the input stream
    pub input: Option<String>,
    /// URI of the output stream
    pub output: Option<String>,
    /// pre-trained model to load (see below for options)
    #[arg(long, default_value = DEFAULT_NETWORK)]
    pub network: String,
    /// show the topK number of class predictions (default: 1)
    #[arg(long = "topK", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

/// Usage of the options forwarded to the classifier, video and log layers.
pub fn usage_epilog() -> String {
    [
        crate::network::usage(),
        crate::source::usage().to_string(),
        crate::output::usage().to_string(),
        crate::log::usage().to_string(),
    ]
    .join("\n")
}

/// Result of resolving the command line.
#[derive(Debug)]
pub enum Invocation {
    Run(RunConfig),
    /// Help (or version) text to print before exiting successfully.
    Help(String),
}

/// Options this parser owns and whether they take a value.
const KNOWN_OPTIONS: [(&str, bool); 6] = [
    ("--network", true),
    ("--topK", true),
    ("--help", false),
    ("-h", false),
    ("--version", false),
    ("-V", false),
];

/// Looks up an option by its full name or an unambiguous prefix of a long
/// option, e.g. `--net` or `--top`.
fn resolve_option(name: &str) -> Option<(&'static str, bool)> {
    if let Some(&(full, takes_value)) = KNOWN_OPTIONS.iter().find(|(k, _)| *k == name) {
        return Some((full, takes_value));
    }
    if name.len() < 3 || !name.starts_with("--") {
        return None;
    }
    let mut candidates = KNOWN_OPTIONS
        .iter()
        .filter(|(k, _)| k.starts_with("--") && k.starts_with(name));
    match (candidates.next(), candidates.next()) {
        (Some(&(full, takes_value)), None) => Some((full, takes_value)),
        _ => None,
    }
}

/// Separates forwarded flags from the ones this parser understands.
///
/// Returns `(known, forwarded)`; the program name stays in `known`.
pub fn split_known_args<I, T>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args
        .into_iter()
        .map(|a| a.into().to_string_lossy().into_owned());
    let mut known: Vec<String> = args.next().into_iter().collect();
    let mut forwarded = Vec::new();
    let mut positional_only = false;
    while let Some(arg) = args.next() {
        if positional_only || !arg.starts_with('-') || arg == "-" {
            known.push(arg);
            continue;
        }
        if arg == "--" {
            positional_only = true;
            known.push(arg);
            continue;
        }
        let (name, inline) = match arg.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (arg.as_str(), None),
        };
        match resolve_option(name) {
            Some((full, takes_value)) => {
                known.push(match inline {
                    Some(v) => format!("{full}={v}"),
                    None => full.to_string(),
                });
                if takes_value && inline.is_none() {
                    if let Some(value) = args.next() {
                        known.push(value);
                    }
                }
            }
            None => forwarded.push(arg),
        }
    }
    (known, forwarded)
}

/// Resolves the process arguments into a run configuration.
///
/// Anything that fails to parse yields the help text instead of an error.
pub fn parse_args<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let (known, forwarded) = split_known_args(args);
    match Cli::try_parse_from(&known) {
        Ok(cli) => Invocation::Run(RunConfig {
            input: cli.input.unwrap_or_default(),
            output: cli.output.unwrap_or_default(),
            network: cli.network,
            top_k: cli.top_k,
            extra: ExtraArgs::new(forwarded),
        }),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Invocation::Help(e.render().to_string())
        }
        Err(_) => Invocation::Help(format!("\n{}", Cli::command().render_help())),
    }
}

pub fn run_cli() -> Result<()> {
    match parse_args(std::env::args_os()) {
        Invocation::Help(text) => {
            println!("{text}");
            Ok(())
        }
        Invocation::Run(config) => {
            init_tracing(&config.extra)?;
            execute(&config)
        }
    }
}

/// Builds the collaborators named by `config` and runs the loop to the end
/// of the stream.
pub fn execute(config: &RunConfig) -> Result<()> {
    debug!(
        config = %serde_json::to_string(config).unwrap_or_default(),
        "run configuration"
    );
    let desc = resolve_network(&config.network, &config.extra)?;
    let repo = model_repo(&config.extra);
    let net = OnnxClassifier::load(&desc, repo.as_deref())
        .with_context(|| format!("failed to load network {}", config.network))?;
    let source = open_source(&config.input, &config.extra)
        .with_context(|| format!("failed to open video source {:?}", config.input))?;
    let output = open_output(&config.output, &config.extra)
        .with_context(|| format!("failed to open video output {:?}", config.output))?;
    let font = BitmapFont::default();

    let mut pipeline = Pipeline::new(source, output, net, font, config.top_k);
    let stdout = std::io::stdout();
    let frames = pipeline.run(&mut stdout.lock())?;
    info!(frames, "shutting down");
    Ok(())
}
