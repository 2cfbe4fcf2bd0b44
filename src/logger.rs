use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Where the runner sends what it cannot return to the owner.
pub trait Diagnostics: Send + Sync {
    /// A failed invocation. Called once per failure, never raised to the owner.
    fn report(&self, message: &str);

    /// Lock tracing, only emitted when the runner was built with `trace_lock`.
    fn trace(&self, message: &str);

    /// Runner lifecycle transitions.
    fn transition(&self, _message: &str) {}
}

#[derive(Debug)]
pub struct Logger {
    path: Option<PathBuf>,
    disabled: AtomicBool,
}

impl Logger {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            disabled: AtomicBool::new(false),
        }
    }

    /// A logger with no transition file; reports still reach stderr.
    pub fn stderr() -> Self {
        Self::new(None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn log_transition(&self, message: &str) {
        let Some(path) = &self.path else {
            return;
        };
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }
        let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let sanitized = sanitize_log_value(message);
        let line = format!("{} {}\n", ts, sanitized);
        let mut file = match fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => file,
            Err(err) => {
                self.disable_with_warning(path, &err);
                return;
            }
        };
        if let Err(err) = file.write_all(line.as_bytes()) {
            self.disable_with_warning(path, &err);
        }
    }

    fn disable_with_warning(&self, path: &Path, err: &std::io::Error) {
        if self
            .disabled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // Avoid `eprintln!` so tests can reliably capture stderr via fd redirection.
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(
                stderr,
                "Warning: transition logging disabled log_path={} io_error={}",
                path.display(),
                err
            );
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::stderr()
    }
}

impl Diagnostics for Logger {
    fn report(&self, message: &str) {
        let sanitized = sanitize_log_value(message);
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", sanitized);
        drop(stderr);
        self.log_transition(message);
    }

    fn trace(&self, message: &str) {
        if self.path.is_some() {
            self.log_transition(message);
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{}", sanitize_log_value(message));
    }

    fn transition(&self, message: &str) {
        self.log_transition(message);
    }
}

pub fn sanitize_log_value(value: &str) -> String {
    value
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn sanitize_log_value_replaces_controls() {
        let value = "line\ncarriage\rtab\t";
        assert_eq!(sanitize_log_value(value), "line\\ncarriage\\rtab\\t");
    }

    #[test]
    fn transitions_are_timestamped_and_sanitized() {
        let temp = TempDir::new().expect("temp dir");
        let log_path = temp.path().join("progress.log");
        let logger = Logger::new(Some(log_path.clone()));

        logger.log_transition("runner start name=report\ninterval=0.5");
        logger.trace(">locked (report)");

        let contents = fs::read_to_string(&log_path).expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2, "got: {contents:?}");
        let (ts, rest) = lines[0].split_once(' ').expect("timestamp prefix");
        assert!(ts.ends_with('Z') && ts.contains('T'), "timestamp: {ts}");
        assert_eq!(rest, "runner start name=report\\ninterval=0.5");
        assert!(lines[1].ends_with(">locked (report)"));
    }

    #[test]
    fn unwritable_log_path_disables_file_logging() {
        let temp = TempDir::new().expect("temp dir");
        // A directory cannot be opened for appending.
        let logger = Logger::new(Some(temp.path().to_path_buf()));
        logger.log_transition("first");
        assert!(logger.disabled.load(Ordering::SeqCst));
        logger.log_transition("second");
    }

    #[test]
    fn logger_without_path_skips_transitions() {
        let logger = Logger::stderr();
        assert!(logger.path().is_none());
        logger.log_transition("ignored");
        assert!(!logger.disabled.load(Ordering::SeqCst));
    }
}
