use shell_escape::unix::escape;
use std::process::{Child, Command, Stdio};

use progress::logger::{sanitize_log_value, Logger};

pub(crate) fn render_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| escape(arg.as_str().into()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The command as a user would type it, used as the default report label.
pub(crate) fn render_command(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        return command.to_string();
    }
    format!("{} {}", command, render_args(args))
}

/// Starts `bash -lc COMMAND -- ARGS...` with stdout piped back to us.
pub(crate) fn spawn_shell_command(
    command: &str,
    args: &[String],
    logger: &Logger,
) -> Result<Child, String> {
    if command.trim().is_empty() {
        return Err("Command must not be empty.".to_string());
    }

    logger.log_transition(&format!(
        "cmd start mode=bash_lc command={} args={}",
        sanitize_log_value(command),
        sanitize_log_value(&render_args(args))
    ));

    let mut cmd = Command::new("bash");
    cmd.arg("-lc").arg(command);
    if !args.is_empty() {
        cmd.arg("--");
        cmd.args(args);
    }
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::inherit());
    cmd.spawn()
        .map_err(|err| format!("Failed to run command '{}': {}", command, err))
}
