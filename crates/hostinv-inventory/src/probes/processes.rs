//! Running processes with their owning account

use async_trait::async_trait;
use hostinv_exec::{ManagementInterface, WqlQuery};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::InventoryError;
use crate::probe::{Probe, group_by, query_records};
use crate::types::Content;

/// Processes keyed by caption, each annotated with an `Owner`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessesProbe;

impl ProcessesProbe {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Probe for ProcessesProbe {
    fn name(&self) -> &'static str {
        "processes"
    }

    fn capability_name(&self) -> &'static str {
        "win_processes_statistics"
    }

    #[instrument(skip(self, iface))]
    async fn collect(&self, iface: &dyn ManagementInterface) -> Result<Content, InventoryError> {
        let records = query_records(iface, &WqlQuery::new("Win32_Process")).await?;
        let mut processes = group_by("Win32_Process", records, "Caption")?;

        let names: Vec<String> = processes.keys().cloned().collect();
        let owners = iface.process_owners(&names).await?;
        debug!(processes = names.len(), "resolved process owners");

        for (name, owner) in names.iter().zip(owners) {
            if let Some(Value::Object(entry)) = processes.get_mut(name) {
                entry.insert(
                    "Owner".to_string(),
                    owner.map_or(Value::Null, Value::String),
                );
            }
        }

        let mut content = Content::new();
        content.insert("processes".to_string(), Value::Object(processes));
        Ok(content)
    }
}
