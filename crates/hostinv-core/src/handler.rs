//! Uniform failure path for probe runs

use tracing::error;

use crate::error::format_trace;
use crate::report::{Outcome, ReportEnvelope, ReturnBody};

/// Mark the envelope failed, record the error and finalize it
///
/// The error's text lands in `messages`, its full cause chain in
/// `exception`. An optional caller message is appended after the error.
/// Persistence failures are swallowed the same way as on success.
pub fn handle_error(
    mut envelope: ReportEnvelope,
    err: &(dyn std::error::Error + 'static),
    message: Option<&str>,
) -> ReturnBody {
    error!(
        capability = %envelope.capability_name,
        host = %envelope.host,
        error = %err,
        "probe run failed"
    );

    envelope.outcome = Outcome::Failed;
    envelope.exception = Some(format_trace(err));
    envelope.messages.push(err.to_string());
    if let Some(message) = message {
        envelope.messages.push(message.to_string());
    }

    envelope.finalize_and_persist()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use hostinv_exec::ExecError;
    use hostinv_inventory::InventoryError;
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::config::ReportSettings;
    use crate::error::CoreError;

    #[test]
    fn test_failed_with_error_text() {
        let dir = TempDir::new().unwrap();
        let settings = ReportSettings {
            project_dir: dir.path().to_path_buf(),
            ..ReportSettings::default()
        };
        let envelope = ReportEnvelope::new("win_services_statistics", "WS01", &settings);
        let file = envelope.report_file();
        let err = CoreError::Probe(InventoryError::Interface(ExecError::CommandFailed {
            status: 1,
            stderr: "Access is denied.".to_string(),
        }));

        let body = handle_error(envelope, &err, Some("while querying services"));

        assert_eq!(body.outcome, Outcome::Failed);
        assert_eq!(body.messages.len(), 2);
        assert!(body.messages[0].contains("Access is denied."));
        assert_eq!(body.messages[1], "while querying services");

        let line: Value = serde_json::from_str(fs::read_to_string(file).unwrap().trim()).unwrap();
        assert_eq!(line["outcome"], "Failed");
        assert!(line["exception"].as_str().unwrap().contains("caused by:"));
    }

    #[test]
    fn test_no_extra_message() {
        let dir = TempDir::new().unwrap();
        let settings = ReportSettings {
            project_dir: dir.path().to_path_buf(),
            ..ReportSettings::default()
        };
        let envelope = ReportEnvelope::new("win_bios_statistics", "WS01", &settings);
        let err = CoreError::Timeout(std::time::Duration::from_secs(5));

        let body = handle_error(envelope, &err, None);

        assert_eq!(body.messages, vec!["probe timed out after 5s".to_string()]);
        assert!(body.content.is_empty());
    }
}
