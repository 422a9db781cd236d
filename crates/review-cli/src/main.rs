use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use review_core::{AppConfig, FlagSet, MatchScope, PatternBuffer, SampleText};
use review_highlight::HighlightOptions;
use review_observe::Observer;
use review_ui::{KeyBindings, SessionConfig, TuiTheme, load_keybindings, run_session};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    /// Match each line on its own; `^` and `$` anchor at every line.
    Line,
    /// Match the whole text at once; anchors follow the `m` flag.
    Text,
}

impl From<ScopeArg> for MatchScope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Line => MatchScope::Line,
            ScopeArg::Text => MatchScope::Text,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "review", version, disable_version_flag = true)]
#[command(about = "Edit a regular expression and watch its matches highlight live", long_about = None)]
struct Cli {
    /// Text to match against. `-` reads stdin; omitted uses generated filler text.
    #[arg(value_name = "INPUT_FILE")]
    input: Option<PathBuf>,

    /// Initial pattern.
    #[arg(short = 'r', long = "regex", value_name = "REGEX")]
    regex: Option<String>,

    /// Initial flag letters (i, m, s, u, a, x). A bare `-f` starts with no flags.
    #[arg(
        short = 'f',
        long = "flags",
        value_name = "FLAGS",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    flags: Option<String>,

    /// Print version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Write debug entries to the log file.
    #[arg(long)]
    verbose: bool,

    /// Seed for the generated filler text.
    #[arg(long)]
    seed: Option<u64>,

    /// Match against each line or the whole text.
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = AppConfig::load(&cwd)?;

    let mut observer = Observer::new(config.log_path());
    observer.set_verbose(cli.verbose);

    // Bad flags are reported before the terminal is touched.
    let flags = FlagSet::parse(cli.flags.as_deref().unwrap_or(&config.defaults.flags))?;
    let pattern = cli
        .regex
        .clone()
        .unwrap_or_else(|| config.defaults.pattern.clone());

    let sample = load_sample(cli.input.as_deref(), &config, cli.seed, &observer);
    let session_config = SessionConfig {
        bindings: load_bindings(&config)?,
        theme: TuiTheme::from_config(&config.theme),
        continuation_marker: config.ui.continuation_marker.clone(),
        poll_interval: Duration::from_millis(config.ui.poll_interval_ms.max(1)),
        highlight: HighlightOptions {
            scope: cli.scope.map(MatchScope::from).unwrap_or(config.ui.match_scope),
            size_limit: config.regex.size_limit,
        },
    };

    let report = run_session(
        PatternBuffer::new(&pattern, flags),
        sample,
        &session_config,
        &observer,
    )?;
    println!("{report}");
    Ok(())
}

/// Reads the input text. An unreadable input falls back to filler text so
/// the session still starts.
fn load_sample(
    input: Option<&Path>,
    config: &AppConfig,
    seed: Option<u64>,
    observer: &Observer,
) -> SampleText {
    let seed = seed.or(config.sample.seed);
    let loaded = match input {
        None => return SampleText::generated(config.sample.paragraphs, seed),
        Some(path) if path == Path::new("-") => SampleText::from_reader(io::stdin().lock()),
        Some(path) => SampleText::from_path(path),
    };
    loaded.unwrap_or_else(|err| {
        observer.warn_log(&format!("{err}; using generated text"));
        SampleText::generated(config.sample.paragraphs, seed)
    })
}

fn load_bindings(config: &AppConfig) -> Result<KeyBindings> {
    let path = config.keybindings_path();
    if !path.exists() {
        return Ok(KeyBindings::default());
    }
    load_keybindings(&path).with_context(|| format!("invalid keybindings in {}", path.display()))
}
