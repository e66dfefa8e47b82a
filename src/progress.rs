//! Upload progress reporting.
//!
//! Reports observable progress during an upload run so users see which file
//! is being processed, how many rows are done, and what was skipped.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Rows between human-readable progress lines.
pub const HUMAN_ROW_INTERVAL: u64 = 10_000;

/// A single progress event for an upload run.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum IngestProgressEvent {
    /// Scanning the input root. Total unknown.
    Discovering { root: PathBuf },
    /// Starting file `n` of `total`.
    FileStarted { path: PathBuf, n: usize, total: usize },
    /// Already checkpointed; not read.
    FileSkipped { path: PathBuf },
    /// Rows read so far in the current file (valid and invalid).
    Rows { path: PathBuf, rows: u64 },
    FileCompleted {
        path: PathBuf,
        rows: u64,
        points: u64,
        elapsed_ms: u64,
    },
}

/// Reports upload progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "upload people.csv  20,000 rows".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Discovering { root } => {
                format!("upload {}  discovering...\n", root.display())
            }
            IngestProgressEvent::FileStarted { path, n, total } => {
                format!("upload [{}/{}] {}\n", n, total, path.display())
            }
            IngestProgressEvent::FileSkipped { path } => {
                format!("upload {}  skipped (checkpointed)\n", path.display())
            }
            IngestProgressEvent::Rows { path, rows } => {
                if rows % HUMAN_ROW_INTERVAL != 0 {
                    return;
                }
                format!("upload {}  {} rows\n", file_name(path), format_number(*rows))
            }
            IngestProgressEvent::FileCompleted {
                path,
                rows,
                points,
                elapsed_ms,
            } => format!(
                "upload {}  done  {} rows, {} points in {:.1}s\n",
                file_name(path),
                format_number(*rows),
                format_number(*points),
                *elapsed_ms as f64 / 1000.0
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn render(event: &IngestProgressEvent) -> Option<String> {
        let mut obj = serde_json::to_value(event).ok()?;
        obj["event"] = serde_json::json!("progress");
        serde_json::to_string(&obj).ok()
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        if let Some(line) = Self::render(&event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Arc<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Arc::new(NoProgress),
            ProgressMode::Human => Arc::new(StderrProgress),
            ProgressMode::Json => Arc::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_event_shape() {
        let line = JsonProgress::render(&IngestProgressEvent::Rows {
            path: PathBuf::from("/data/a.csv"),
            rows: 3000,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "progress");
        assert_eq!(value["phase"], "rows");
        assert_eq!(value["path"], "/data/a.csv");
        assert_eq!(value["rows"], 3000);
    }

    #[test]
    fn json_completed_event() {
        let line = JsonProgress::render(&IngestProgressEvent::FileCompleted {
            path: PathBuf::from("b.csv"),
            rows: 250,
            points: 240,
            elapsed_ms: 1200,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["phase"], "file_completed");
        assert_eq!(value["points"], 240);
    }
}
