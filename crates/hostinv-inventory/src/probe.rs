//! Probe trait and shared record helpers

use async_trait::async_trait;
use hostinv_exec::{ManagementInterface, WqlQuery};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::InventoryError;
use crate::mof;
use crate::types::{Content, ParsedRecord, record_to_json};

/// One category of host data
///
/// A probe turns management-interface answers into a content mapping. It
/// knows nothing about envelopes, persistence or concurrency.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Short name used on the command line (`drives`)
    fn name(&self) -> &'static str;

    /// Report name; the log file is `<capability_name>_report`
    fn capability_name(&self) -> &'static str;

    /// Gather this probe's content from the interface
    async fn collect(&self, iface: &dyn ManagementInterface) -> Result<Content, InventoryError>;
}

/// Run a class query and parse every returned instance
///
/// # Errors
/// Returns an error if the query fails or any instance text is malformed.
pub async fn query_records(
    iface: &dyn ManagementInterface,
    query: &WqlQuery,
) -> Result<Vec<ParsedRecord>, InventoryError> {
    let raw = iface.query(query).await?;
    debug!(class = query.class(), instances = raw.len(), "parsing instances");

    raw.iter()
        .map(|text| mof::parse(text).map_err(InventoryError::from))
        .collect()
}

/// Key a record by the string form of one of its properties
///
/// # Errors
/// Returns `MissingField` if the property is absent or a list.
pub fn record_key(class: &str, record: &ParsedRecord, field: &str) -> Result<String, InventoryError> {
    record
        .get(field)
        .and_then(|value| value.key_string())
        .ok_or_else(|| InventoryError::MissingField {
            class: class.to_string(),
            field: field.to_string(),
        })
}

/// Group records by one property; a later record with the same key replaces
/// the earlier one
///
/// # Errors
/// Returns `MissingField` if any record lacks the property.
pub fn group_by(
    class: &str,
    records: Vec<ParsedRecord>,
    field: &str,
) -> Result<Map<String, Value>, InventoryError> {
    let mut grouped = Map::new();
    for record in records {
        let key = record_key(class, &record, field)?;
        grouped.insert(key, record_to_json(record));
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::ValueLiteral;

    fn record(pairs: &[(&str, ValueLiteral)]) -> ParsedRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_group_by_integer_key() {
        let records = vec![
            record(&[("Index", 0.into()), ("Model", "Disk A".into())]),
            record(&[("Index", 1.into()), ("Model", "Disk B".into())]),
        ];

        let grouped = group_by("Win32_DiskDrive", records, "Index").unwrap();

        assert_eq!(grouped["0"], json!({"Index": 0, "Model": "Disk A"}));
        assert_eq!(grouped["1"]["Model"], json!("Disk B"));
    }

    #[test]
    fn test_group_by_later_wins() {
        let records = vec![
            record(&[("Name", "svchost.exe".into()), ("ProcessId", 4.into())]),
            record(&[("Name", "svchost.exe".into()), ("ProcessId", 8.into())]),
        ];

        let grouped = group_by("Win32_Process", records, "Name").unwrap();

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["svchost.exe"]["ProcessId"], json!(8));
    }

    #[test]
    fn test_group_by_missing_field() {
        let records = vec![record(&[("Other", 1.into())])];

        let err = group_by("Win32_BIOS", records, "SerialNumber").unwrap_err();

        assert!(matches!(err, InventoryError::MissingField { ref field, .. } if field == "SerialNumber"));
    }
}
