use clap::Parser;
use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use progress::config::{resolve_config, validate_interval, Config, ReportFormat};
use progress::logger::{sanitize_log_value, Logger};
use progress::runner::{interval_from_secs, PeriodicRunner, RunnerOptions};

use crate::cli::Cli;
use crate::report::{reporter_task, ReportLine, ARG_ELAPSED, ARG_LABEL, ARG_LINES};
use crate::shell::{render_command, spawn_shell_command};

const DEFAULT_THREAD_NAME: &str = "progress";

#[derive(Debug)]
pub(crate) struct Quit {
    pub(crate) code: i32,
    #[allow(dead_code)]
    pub(crate) reason: String,
}

impl Quit {
    pub(crate) fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code as u8)
    }
}

pub(crate) fn quit(logger: &Logger, reason: &str, code: i32) -> Quit {
    let sanitized = if reason.trim().is_empty() {
        "unknown".to_string()
    } else {
        sanitize_log_value(reason)
    };
    logger.log_transition(&format!("quit reason={}", sanitized));
    Quit {
        code,
        reason: reason.to_string(),
    }
}

fn fail(message: String) -> Quit {
    eprintln!("{}", message);
    Quit {
        code: 1,
        reason: message,
    }
}

/// Settings after merging the config file and command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub(crate) interval_secs: f64,
    pub(crate) thread_name: String,
    pub(crate) log_path: Option<PathBuf>,
    pub(crate) trace_lock: bool,
    pub(crate) format: ReportFormat,
    pub(crate) label: String,
}

pub(crate) fn resolve_settings(cli: &Cli, config: &Config) -> Result<Settings, String> {
    let interval_secs = cli.interval.unwrap_or_else(|| config.interval_secs());
    validate_interval(interval_secs).map_err(|message| format!("interval {}", message))?;

    let (command, args) = cli
        .command
        .split_first()
        .ok_or_else(|| "Missing COMMAND.".to_string())?;
    let label = cli
        .label
        .clone()
        .unwrap_or_else(|| render_command(command, args));

    Ok(Settings {
        interval_secs,
        thread_name: cli
            .name
            .clone()
            .or_else(|| config.thread_name.clone())
            .unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string()),
        log_path: config.log_path.clone(),
        trace_lock: cli.trace_lock || config.trace_lock,
        format: cli.format.unwrap_or(config.format),
        label,
    })
}

fn interrupt_flag() -> Arc<AtomicBool> {
    static FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();
    FLAG.get_or_init(|| {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&flag);
        if let Err(err) = ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        }) {
            eprintln!("Failed to set interrupt handler: {}", err);
        }
        flag
    })
    .clone()
}

pub(crate) fn run_with_cli(cli: Cli) -> Result<(), Quit> {
    let config = resolve_config(cli.config.as_deref()).map_err(fail)?;
    let settings = resolve_settings(&cli, &config).map_err(fail)?;
    let logger = Arc::new(Logger::new(settings.log_path.clone()));

    let interrupt_flag = interrupt_flag();
    interrupt_flag.store(false, Ordering::SeqCst);

    let interval = interval_from_secs(settings.interval_secs)
        .map_err(|err| quit(&logger, &err.to_string(), 1))?;
    let runner = PeriodicRunner::new(
        reporter_task(settings.format, io::stderr()),
        RunnerOptions {
            interval,
            auto_start: false,
            thread_name: Some(settings.thread_name.clone()),
            trace_lock: settings.trace_lock,
            diagnostics: Some(logger.clone()),
        },
    )
    .map_err(|err| {
        eprintln!("{}", err);
        quit(&logger, &format!("runner_setup:{err}"), 1)
    })?;
    runner
        .set(ARG_LABEL, settings.label.as_str())
        .map_err(|err| quit(&logger, &format!("runner_setup:{err}"), 1))?;

    let (command, args) = cli
        .command
        .split_first()
        .ok_or_else(|| quit(&logger, "missing_command", 1))?;
    let mut child = spawn_shell_command(command, args, &logger).map_err(|message| {
        eprintln!("{}", message);
        quit(&logger, &message, 1)
    })?;

    let started_at = Instant::now();
    runner.start().map_err(|err| {
        eprintln!("{}", err);
        let _ = child.kill();
        quit(&logger, &format!("runner_start:{err}"), 1)
    })?;

    let mut lines: u64 = 0;
    let mut interrupted = false;
    if let Some(stdout) = child.stdout.take() {
        // Lines are relayed as raw bytes; the command's output need not be UTF-8.
        let mut reader = BufReader::new(stdout);
        let mut out = io::stdout().lock();
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    eprintln!("Failed to read command output: {}", err);
                    break;
                }
            }
            if out.write_all(&line).and_then(|_| out.flush()).is_err() {
                break;
            }
            lines += 1;
            let update = {
                let args = runner.lock();
                let result = args
                    .set(ARG_LINES, lines)
                    .and_then(|_| args.set(ARG_ELAPSED, started_at.elapsed().as_secs_f64()));
                result
            };
            if let Err(err) = update {
                eprintln!("{}", err);
                let _ = child.kill();
                let _ = child.wait();
                return Err(quit(&logger, &format!("runner_update:{err}"), 1));
            }
            if interrupt_flag.load(Ordering::SeqCst) {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted || interrupt_flag.load(Ordering::SeqCst) {
        let _ = child.kill();
    }
    let status = child.wait().map_err(|err| {
        let message = format!("Failed to wait for command: {}", err);
        eprintln!("{}", message);
        quit(&logger, &message, 1)
    })?;

    runner.stop();
    runner.join();

    let exit_code = status.code().unwrap_or(1);
    let elapsed_secs = started_at.elapsed().as_secs_f64();
    let summary = ReportLine {
        label: &settings.label,
        lines,
        elapsed_secs,
        done: true,
        exit_code: Some(exit_code),
    };
    match summary.render(settings.format) {
        Ok(line) => eprintln!("{}", line),
        Err(message) => eprintln!("{}", message),
    }
    logger.log_transition(&format!(
        "done lines={} elapsed={:.3} exit={}",
        lines, elapsed_secs, exit_code
    ));

    if interrupted || interrupt_flag.load(Ordering::SeqCst) {
        return Err(quit(&logger, "interrupted", 130));
    }
    if exit_code != 0 {
        return Err(quit(&logger, &format!("command_exit:{exit_code}"), exit_code));
    }
    Ok(())
}

pub(crate) fn run_with_args(args: Vec<OsString>) -> Result<(), Quit> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // clap's `Error::print()` uses termcolor and can bypass Rust's test output
            // capturing. Rendering it ourselves keeps CLI errors capture-friendly.
            eprintln!("{err}");
            return Err(Quit {
                code: err.exit_code(),
                reason: "cli_parse".to_string(),
            });
        }
    };
    run_with_cli(cli)
}

pub(crate) fn main_with_args(args: Vec<OsString>) -> ExitCode {
    match run_with_args(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(quit) => quit.exit_code(),
    }
}

pub(crate) fn main() -> ExitCode {
    main_with_args(env::args_os().collect())
}

