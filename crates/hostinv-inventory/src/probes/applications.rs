//! Installed software from the registry uninstall keys

use std::collections::BTreeMap;

use async_trait::async_trait;
use hostinv_exec::{Hive, ManagementInterface};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::error::InventoryError;
use crate::probe::Probe;
use crate::types::Content;

/// 64-bit and 32-bit uninstall roots
pub const UNINSTALL_ROOTS: [&str; 2] = [
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
    r"SOFTWARE\Wow6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
];

const DISPLAY_NAME: &str = "DisplayName";

/// Lists installed software keyed by display name
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationsProbe;

impl ApplicationsProbe {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Read one uninstall entry; returns its content key and details
    async fn read_entry(
        iface: &dyn ManagementInterface,
        root: &str,
        subkey: &str,
    ) -> Result<(String, Map<String, Value>), InventoryError> {
        let path = format!(r"{root}\{subkey}");
        let mut details = Map::new();
        details.insert(
            "reg_path".to_string(),
            Value::String(format!(r"{}\{path}", Hive::LocalMachine.abbreviation())),
        );

        let names = iface.enum_values(Hive::LocalMachine, &path).await?;
        if names.is_empty() {
            return Ok((subkey.to_string(), details));
        }

        let values = iface
            .get_string_values(Hive::LocalMachine, &path, &names)
            .await?;

        let mut display_name = None;
        for (name, value) in names.into_iter().zip(values) {
            if name == DISPLAY_NAME {
                display_name.clone_from(&value);
            }
            details.insert(name, value.map_or(Value::Null, Value::String));
        }

        let key = display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| subkey.to_string());

        Ok((key, details))
    }
}

#[async_trait]
impl Probe for ApplicationsProbe {
    fn name(&self) -> &'static str {
        "applications"
    }

    fn capability_name(&self) -> &'static str {
        "win_application_statistics"
    }

    #[instrument(skip(self, iface))]
    async fn collect(&self, iface: &dyn ManagementInterface) -> Result<Content, InventoryError> {
        let mut software: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

        for root in UNINSTALL_ROOTS {
            let subkeys = iface.enum_keys(Hive::LocalMachine, root).await?;
            debug!(root, entries = subkeys.len(), "enumerated uninstall root");

            for subkey in subkeys {
                let (key, details) = Self::read_entry(iface, root, &subkey).await?;
                software.insert(key, details);
            }
        }

        info!(count = software.len(), "collected installed software");

        let mut content = Content::new();
        content.insert(
            "software_list".to_string(),
            Value::Array(software.keys().cloned().map(Value::String).collect()),
        );
        content.insert(
            "software_details".to_string(),
            Value::Object(
                software
                    .into_iter()
                    .map(|(k, v)| (k, Value::Object(v)))
                    .collect(),
            ),
        );

        Ok(content)
    }
}
