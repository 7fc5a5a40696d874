mod parallel;
mod utils;

use chat_text_export::{MatchRule, Profile};
use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Turn captured chat page snapshots into plain-text transcripts.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON snapshots produced by the page-side capture helper.
    #[arg(value_name = "SNAPSHOT", required = true)]
    snapshots: Vec<PathBuf>,

    /// Directory to write transcripts to.
    /// Defaults to ./chat-text-export if not set in config.
    #[arg(long, value_name = "DIR")]
    target_dir: Option<PathBuf>,

    /// Source profile (claude, chatgpt, grok, genai or a custom one).
    /// Detected from the snapshot location if omitted.
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Turn rule as ROLE=SELECTOR (e.g. "user=.question"). Repeatable;
    /// replaces the profile's rules.
    #[arg(long = "rule", value_name = "ROLE=SELECTOR")]
    rules: Vec<String>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/chat-text-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the transcript instead of writing a file (single snapshot only).
    #[arg(long)]
    stdout: bool,

    /// Leave markdown markers in the transcript.
    #[arg(long)]
    keep_markdown: bool,

    /// Log every file written and every dropped turn.
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors; no summary line.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    target_dir: Option<PathBuf>,
    profile: Option<String>,
    #[serde(default)]
    profiles: Vec<Profile>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        // Search: XDG/OS config dir, then nothing
        dirs::config_dir()
            .map(|d| d.join("chat-text-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve target_dir (CLI > Config > Default)
    let target_dir = cli
        .target_dir
        .or(file_cfg.target_dir)
        .unwrap_or_else(|| PathBuf::from("chat-text-export"));

    // 3. Resolve profile (CLI > Config > detected per snapshot)
    let profile = cli.profile.or(file_cfg.profile);

    // 4. Parse ad-hoc rules
    let rules = cli
        .rules
        .iter()
        .map(|arg| MatchRule::parse_cli(arg))
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("Invalid --rule")?;

    // 5. Build the Export Config
    let config = utils::ExportConfig {
        snapshots: cli.snapshots,
        target_dir,
        profile,
        custom_profiles: file_cfg.profiles,
        rules,
        keep_markdown: cli.keep_markdown,
        stdout: cli.stdout,
        quiet: cli.quiet,
    };

    // 6. Run the Business Logic
    parallel::execute(config)
}
