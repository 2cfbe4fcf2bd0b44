use clap::Parser;
use std::path::PathBuf;

use progress::config::{validate_interval, ReportFormat};

#[derive(Debug, Parser)]
#[command(
    name = "progress",
    about = "Run a command and report its progress at a fixed interval.",
    long_about = "Runs COMMAND through bash, relays its stdout, and reports the number of lines seen and the elapsed time on stderr every interval from a background thread.\n\nDefaults are read from ~/.config/progress.yml when present; flags override them."
)]
pub(crate) struct Cli {
    /// Load configuration from PATH instead of ~/.config/progress.yml.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Load configuration from PATH instead of ~/.config/progress.yml."
    )]
    pub(crate) config: Option<PathBuf>,

    #[arg(
        short = 'i',
        long = "interval",
        value_name = "SECONDS",
        value_parser = parse_interval,
        help = "Seconds between reports (fractions allowed)."
    )]
    pub(crate) interval: Option<f64>,

    #[arg(
        short = 'n',
        long = "name",
        value_name = "NAME",
        help = "Name of the reporter thread."
    )]
    pub(crate) name: Option<String>,

    #[arg(
        short = 'l',
        long = "label",
        value_name = "LABEL",
        help = "Label shown in reports (defaults to the command line)."
    )]
    pub(crate) label: Option<String>,

    #[arg(long = "format", value_enum, help = "Report format.")]
    pub(crate) format: Option<ReportFormat>,

    #[arg(long = "trace-lock", help = "Trace every reporter lock acquire/release.")]
    pub(crate) trace_lock: bool,

    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) command: Vec<String>,
}

pub(crate) fn parse_interval(raw: &str) -> Result<f64, String> {
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid interval {:?}: expected a number of seconds", raw))?;
    validate_interval(seconds)?;
    Ok(seconds)
}
