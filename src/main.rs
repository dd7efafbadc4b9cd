use std::{path::PathBuf, process};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dialoguer::{theme::ColorfulTheme, Select};
use log::{error, info, LevelFilter};

use geomfix::{
    config::{modes, BraceCounting, FixerConfig},
    fixer::Fixer,
};

/// CLI wrapper for the log level filter
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "geomfix")]
#[command(version)]
#[command(about = "Moves FBX mesh transforms into geometric transforms")]
#[command(long_about = "geomfix moves the local rotation and scale of every mesh node of ASCII FBX \
files into the node's geometric transform, mirrors the geometry of nodes with a negative scale, \
and resets the transforms of Unity prefabs. Each patched file is written beside its input with a \
suffix added to its name.")]
struct Args {
    /// FBX or prefab files, or directories to search recursively
    #[arg(value_name = "PATHS", required = true)]
    paths: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not correct the geometry of nodes with a negative scale
    #[arg(long)]
    no_mirror: bool,

    /// Ignore braces inside quoted strings when tracking blocks
    #[arg(long)]
    quote_aware: bool,

    /// Pick the processing mode from a prompt
    #[arg(short, long)]
    interactive: bool,

    /// Log level
    #[arg(short, long, value_enum, default_value = "info")]
    log_level: CliLogLevel,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level.into())
        .parse_default_env()
        .init();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            error!("{:#}", err);
            process::exit(1);
        }
    }
}

/// Runs the fixer. Returns whether every file was handled without failure.
fn run(args: Args) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => FixerConfig::from_file(path)?,
        None => FixerConfig::default(),
    };

    if args.interactive {
        let modes = modes();
        let names: Vec<_> = modes.iter().map(|mode| mode.name).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select the processing mode")
            .items(&names)
            .default(0)
            .interact()
            .context("Failed to read the processing mode")?;
        modes[selection].apply(&mut config);
    }

    if args.no_mirror {
        config.mirror_geometry = false;
    }
    if args.quote_aware {
        config.brace_counting = BraceCounting::QuoteAware;
    }

    let summary = Fixer::new(config).run(&args.paths);
    info!(
        "{} written, {} unchanged, {} skipped, {} failed",
        summary.written, summary.unchanged, summary.skipped, summary.failed
    );

    Ok(summary.failed == 0)
}
