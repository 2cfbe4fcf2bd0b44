use serde::Serialize;
use serde_json::Value;
use std::io::Write;

use progress::config::ReportFormat;
use progress::task::{Task, TaskError};

pub(crate) const REPORT_TASK: &str = "report";
pub(crate) const ARG_LABEL: &str = "label";
pub(crate) const ARG_LINES: &str = "lines";
pub(crate) const ARG_ELAPSED: &str = "elapsed";

#[derive(Debug, Serialize)]
pub(crate) struct ReportLine<'a> {
    pub(crate) label: &'a str,
    pub(crate) lines: u64,
    pub(crate) elapsed_secs: f64,
    pub(crate) done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) exit_code: Option<i32>,
}

impl ReportLine<'_> {
    pub(crate) fn render(&self, format: ReportFormat) -> Result<String, String> {
        match format {
            ReportFormat::Text => {
                let mut line = format!(
                    "progress: {} lines={} elapsed={:.1}s",
                    self.label, self.lines, self.elapsed_secs
                );
                if self.done {
                    line.push_str(" done");
                    if let Some(code) = self.exit_code {
                        line.push_str(&format!(" exit={}", code));
                    }
                }
                Ok(line)
            }
            ReportFormat::Json => serde_json::to_string(self)
                .map_err(|err| format!("failed to serialize report: {err}")),
        }
    }
}

/// The periodic reporter: `report(label, lines, elapsed)`, with `lines` and `elapsed`
/// defaulting to zero and `label` left for the owner to set.
pub(crate) fn reporter_task<W>(format: ReportFormat, mut out: W) -> Task<Value>
where
    W: Write + Send + 'static,
{
    Task::new(
        REPORT_TASK,
        [ARG_LABEL, ARG_LINES, ARG_ELAPSED],
        move |args: &[Value]| -> Result<(), TaskError> {
            let line = report_line(args)?.render(format)?;
            writeln!(out, "{}", line)?;
            out.flush()?;
            Ok(())
        },
    )
    .with_defaults(vec![Value::from(0u64), Value::from(0.0)])
}

fn report_line(args: &[Value]) -> Result<ReportLine<'_>, String> {
    let [label, lines, elapsed] = args else {
        return Err(format!("expected 3 report arguments, got {}", args.len()));
    };
    let label = label
        .as_str()
        .ok_or_else(|| format!("{ARG_LABEL} must be a string (got {label})"))?;
    let lines = lines
        .as_u64()
        .ok_or_else(|| format!("{ARG_LINES} must be a non-negative integer (got {lines})"))?;
    let elapsed_secs = elapsed
        .as_f64()
        .ok_or_else(|| format!("{ARG_ELAPSED} must be a number (got {elapsed})"))?;
    Ok(ReportLine {
        label,
        lines,
        elapsed_secs,
        done: false,
        exit_code: None,
    })
}
