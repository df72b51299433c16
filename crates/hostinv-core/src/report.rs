//! Report envelopes and their JSON Lines persistence

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use hostinv_inventory::Content;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ReportSettings;
use crate::error::{CoreError, format_trace};

/// Message recorded when a report cannot be written
pub const PERSIST_FAILURE_MESSAGE: &str = "Error with logging procedure";

/// Timestamp layout used for `start_time` and `end_time`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result state of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Pending,
    Successful,
    Failed,
}

/// The caller-facing projection of an envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnBody {
    pub outcome: Outcome,
    pub messages: Vec<String>,
    pub content: Content,
}

impl ReturnBody {
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.outcome == Outcome::Successful
    }
}

mod timestamp {
    use chrono::{DateTime, Local};
    use serde::Serializer;

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(time: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format(TIMESTAMP_FORMAT))
    }

    pub mod option {
        use chrono::{DateTime, Local};
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            time: &Option<DateTime<Local>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, s),
                None => s.serialize_none(),
            }
        }
    }
}

/// Per-run record of one capability
///
/// Created at the start of a run with outcome `Pending`, filled in by the
/// probe, then consumed by [`ReportEnvelope::finalize_and_persist`]. The
/// whole envelope is what lands in the log; callers only see the
/// [`ReturnBody`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportEnvelope {
    pub capability_name: String,
    pub version: String,
    pub host: String,
    #[serde(with = "timestamp")]
    pub start_time: DateTime<Local>,
    #[serde(serialize_with = "timestamp::option::serialize")]
    pub end_time: Option<DateTime<Local>>,
    pub outcome: Outcome,
    pub messages: Vec<String>,
    pub content: Content,
    pub exception: Option<String>,
    pub return_body: ReturnBody,
    #[serde(skip)]
    log_dir: PathBuf,
}

impl ReportEnvelope {
    /// Open a pending envelope stamped with the current local time
    #[must_use]
    pub fn new(
        capability_name: impl Into<String>,
        host: impl Into<String>,
        settings: &ReportSettings,
    ) -> Self {
        Self {
            capability_name: capability_name.into(),
            version: settings.version.clone(),
            host: host.into(),
            start_time: Local::now(),
            end_time: None,
            outcome: Outcome::Pending,
            messages: Vec::new(),
            content: Content::new(),
            exception: None,
            return_body: ReturnBody::default(),
            log_dir: settings.log_dir(),
        }
    }

    /// File this envelope appends to
    #[must_use]
    pub fn report_file(&self) -> PathBuf {
        self.log_dir.join(format!("{}_report", self.capability_name))
    }

    /// Stamp the end time, persist one JSON line and return the projection
    ///
    /// Persistence failures never escape: they are logged, the exception is
    /// recorded and diagnostic lines are appended to the messages of both
    /// the envelope and the returned body.
    pub fn finalize_and_persist(mut self) -> ReturnBody {
        self.end_time = Some(Local::now());
        self.return_body = ReturnBody {
            outcome: self.outcome,
            messages: self.messages.clone(),
            content: self.content.clone(),
        };

        match self.persist() {
            Ok(()) => {
                debug!(
                    capability = %self.capability_name,
                    outcome = ?self.outcome,
                    "report persisted"
                );
            }
            Err(err) => {
                warn!(
                    capability = %self.capability_name,
                    error = %err,
                    "failed to persist report"
                );
                let trace = format_trace(&err);
                self.messages.push(PERSIST_FAILURE_MESSAGE.to_string());
                self.messages.push(trace.clone());
                self.messages.push(err.to_string());
                self.exception = Some(trace);
                self.return_body.messages.clone_from(&self.messages);
            }
        }

        self.return_body
    }

    fn persist(&self) -> Result<(), CoreError> {
        fs::create_dir_all(&self.log_dir).map_err(|source| CoreError::Persist {
            path: self.log_dir.clone(),
            source,
        })?;

        let mut line = serde_json::to_string(self)?;
        line.push('\n');

        let path = self.report_file();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| CoreError::Persist { path, source })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;

    fn settings(dir: &TempDir) -> ReportSettings {
        ReportSettings {
            project_dir: dir.path().to_path_buf(),
            ..ReportSettings::default()
        }
    }

    fn read_lines(path: &std::path::Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_new_envelope_is_pending() {
        let dir = TempDir::new().unwrap();
        let envelope = ReportEnvelope::new("win_bios_statistics", "WS01", &settings(&dir));

        assert_eq!(envelope.outcome, Outcome::Pending);
        assert_eq!(envelope.version, "0");
        assert!(envelope.end_time.is_none());
        assert_eq!(
            envelope.report_file(),
            dir.path().join("logs").join("win_bios_statistics_report")
        );
    }

    #[test]
    fn test_finalize_writes_one_line() {
        let dir = TempDir::new().unwrap();
        let mut envelope = ReportEnvelope::new("win_bios_statistics", "WS01", &settings(&dir));
        envelope.outcome = Outcome::Successful;
        envelope
            .content
            .insert("bios".to_string(), json!({"X1": {"Version": "1.0"}}));
        let file = envelope.report_file();

        let body = envelope.finalize_and_persist();

        assert!(body.is_successful());
        assert!(body.messages.is_empty());

        let lines = read_lines(&file);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["capability_name"], json!("win_bios_statistics"));
        assert_eq!(line["outcome"], json!("Successful"));
        assert_eq!(line["exception"], json!(null));
        assert_eq!(line["return_body"]["content"]["bios"]["X1"]["Version"], json!("1.0"));
        assert!(line.get("log_dir").is_none());

        let start = line["start_time"].as_str().unwrap();
        let end = line["end_time"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(start, TIMESTAMP_FORMAT).is_ok());
        assert!(chrono::NaiveDateTime::parse_from_str(end, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_two_finalizations_append() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);

        for outcome in [Outcome::Successful, Outcome::Failed] {
            let mut envelope = ReportEnvelope::new("win_os_statistics", "WS01", &settings);
            envelope.outcome = outcome;
            envelope.finalize_and_persist();
        }

        let file = settings.log_dir().join("win_os_statistics_report");
        let lines = read_lines(&file);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["outcome"], json!("Successful"));
        assert_eq!(lines[1]["outcome"], json!("Failed"));
    }

    #[test]
    fn test_unwritable_log_dir_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, "not a directory").unwrap();

        let mut envelope = ReportEnvelope::new("win_memory_statistics", "WS01", &settings(&dir));
        envelope.outcome = Outcome::Successful;
        envelope.content.insert("physical_memory".to_string(), json!({}));

        let body = envelope.finalize_and_persist();

        assert_eq!(body.outcome, Outcome::Successful);
        assert_eq!(body.content["physical_memory"], json!({}));
        assert_eq!(body.messages[0], PERSIST_FAILURE_MESSAGE);
        assert!(body.messages.len() >= 3);
        assert!(body.messages[2].starts_with("failed to persist report to"));
    }

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(serde_json::to_value(Outcome::Pending).unwrap(), json!("Pending"));
        assert_eq!(
            serde_json::from_value::<Outcome>(json!("Failed")).unwrap(),
            Outcome::Failed
        );
    }
}
