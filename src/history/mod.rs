// Append-only log of finished operations.
//
// Records live in memory for the session; the History view renders them and
// can export a CSV snapshot on request. Durable storage is a concern of the
// surrounding application, not of this log.

use crate::exec::{OperationKind, TaskOutcome, TaskSpec};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use std::fs;
use std::time::Duration;

/// One finished operation.
#[derive(Clone, Debug)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub operation: OperationKind,
    pub target: Utf8PathBuf,
    pub status: String,
    pub message: String,
    pub duration: Duration,
    pub risk_score: Option<u8>,
}

impl HistoryRecord {
    /// Derive a record from a terminal outcome and the task that produced it.
    /// The target is the file the operation produced when there is one, the
    /// primary input otherwise.
    pub fn from_outcome(task: &TaskSpec, outcome: &TaskOutcome, duration: Duration) -> Self {
        let produced = match outcome {
            TaskOutcome::Completed(output) => output.target().map(Utf8Path::to_path_buf),
            _ => None,
        };
        let target = produced
            .or_else(|| task.primary_input().map(Utf8Path::to_path_buf))
            .unwrap_or_default();

        let risk_score = match outcome {
            TaskOutcome::Completed(output) => output.risk_score(),
            _ => None,
        };

        Self {
            timestamp: Utc::now(),
            operation: task.operation(),
            target,
            status: outcome.status_label().to_string(),
            message: outcome.summary(),
            duration,
            risk_score,
        }
    }
}

/// Session history, newest entry last.
#[derive(Clone, Debug, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: HistoryRecord) {
        self.entries.push(record);
    }

    pub fn entries(&self) -> &[HistoryRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all entries as CSV. Existing files are overwritten.
    pub fn export_csv(&self, path: &Utf8Path) -> Result<()> {
        let mut lines = vec!["timestamp,operation,file,status,message,duration_s,risk".to_string()];
        for record in &self.entries {
            lines.push(format!(
                "{},{},{},{},{},{:.2},{}",
                record.timestamp.to_rfc3339(),
                record.operation,
                csv_field(record.target.as_str()),
                record.status,
                csv_field(&record.message),
                record.duration.as_secs_f64(),
                record
                    .risk_score
                    .map(|r| r.to_string())
                    .unwrap_or_default(),
            ));
        }

        fs::write(path, lines.join("\n"))
            .with_context(|| format!("Failed to write history CSV: {path}"))?;
        tracing::info!("exported {} history entries to {}", self.entries.len(), path);
        Ok(())
    }
}

/// Quote a field when it contains CSV metacharacters.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{AnalyzeParams, TaskParams};

    fn analyze_spec(path: &str) -> TaskSpec {
        TaskSpec::new(
            vec![Utf8PathBuf::from(path)],
            TaskParams::Analyze(AnalyzeParams::default()),
        )
    }

    #[test]
    fn test_record_from_cancelled_outcome() {
        let spec = analyze_spec("photo.png");
        let record =
            HistoryRecord::from_outcome(&spec, &TaskOutcome::Cancelled, Duration::from_secs(1));

        assert_eq!(record.operation, OperationKind::Analyze);
        assert_eq!(record.target, Utf8PathBuf::from("photo.png"));
        assert_eq!(record.status, "cancelled");
        assert_eq!(record.risk_score, None);
    }

    #[test]
    fn test_record_prefers_produced_file() {
        let spec = analyze_spec("in.png");
        let outcome = TaskOutcome::Completed(crate::engine::OperationOutput::Neutralized {
            output: Utf8PathBuf::from("in.neutralized.standard.png"),
        });
        let record = HistoryRecord::from_outcome(&spec, &outcome, Duration::from_millis(10));

        assert_eq!(
            record.target,
            Utf8PathBuf::from("in.neutralized.standard.png")
        );
        assert_eq!(record.status, "completed");
    }

    #[test]
    fn test_log_is_append_only_in_order() {
        let mut log = HistoryLog::new();
        assert!(log.is_empty());

        for name in ["a.png", "b.png", "c.png"] {
            log.append(HistoryRecord::from_outcome(
                &analyze_spec(name),
                &TaskOutcome::Cancelled,
                Duration::ZERO,
            ));
        }

        assert_eq!(log.len(), 3);
        let targets: Vec<&str> = log.entries().iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_csv_export_escapes_fields() {
        let mut log = HistoryLog::new();
        let mut record = HistoryRecord::from_outcome(
            &analyze_spec("odd,name.png"),
            &TaskOutcome::Failed("said \"no\"".to_string()),
            Duration::from_secs(2),
        );
        record.risk_score = Some(42);
        log.append(record);

        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("history.csv")).unwrap();
        log.export_csv(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("timestamp,operation,file,status,message"));
        assert!(contents.contains("\"odd,name.png\""));
        assert!(contents.contains("\"said \"\"no\"\"\""));
        assert!(contents.contains("42"));
    }
}
