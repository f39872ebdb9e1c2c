use anyhow::{Context, Result};
use callsift::cli::{Cli, Command};
use callsift::config::TracerConfig;
use callsift::{relevance, report};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the file config (if any), then apply environment overrides
fn load_config(path: Option<&Path>) -> Result<TracerConfig> {
    let base = match path {
        Some(path) => TracerConfig::from_file(path)?,
        None => TracerConfig::default(),
    };
    let config = base.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn run_report(logs: &str, formats: &str, outdir: &Path) -> Result<()> {
    let formats = report::ReportFormat::parse_list(formats).context("report")?;
    let log_files = report::collect_log_files(logs).context("report")?;
    tracing::debug!("analyzing {} log files", log_files.len());

    let coverage = report::analyze_logs(&log_files).context("report error")?;
    let written: Vec<PathBuf> = report::write_reports(&coverage, &formats, outdir)?;
    for path in written {
        eprintln!("[callsift: wrote {}]", path.display());
    }
    Ok(())
}

fn print_verdict(out: &mut impl Write, name: &str, explain: bool) -> io::Result<()> {
    match (relevance::classify(name), explain) {
        (None, false) => writeln!(out, "{}", name),
        (None, true) => writeln!(out, "{}\ttraced", name),
        (Some(reason), true) => writeln!(out, "{}\tskipped ({})", name, reason),
        (Some(_), false) => Ok(()),
    }
}

fn run_filter(names: &[String], explain: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if names.is_empty() {
        for line in io::stdin().lock().lines() {
            let line = line.context("Failed to read symbol names from stdin")?;
            print_verdict(&mut out, &line, explain)?;
        }
    } else {
        for name in names {
            print_verdict(&mut out, name, explain)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::Report {
            logs,
            formats,
            outdir,
        } => run_report(&logs, &formats, &outdir),
        Command::Filter { names, explain } => run_filter(&names, explain),
        Command::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", toml::to_string(&config)?);
            Ok(())
        }
    }
}
