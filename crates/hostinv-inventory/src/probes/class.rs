//! Probes that group the instances of one or more classes by a key property

use async_trait::async_trait;
use hostinv_exec::{ManagementInterface, WqlQuery};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::InventoryError;
use crate::probe::{Probe, group_by, query_records};
use crate::types::Content;

/// One class query and where its grouped instances land in the content
#[derive(Debug, Clone, Copy)]
pub struct Section {
    /// Content key (`logical_drives`)
    pub content_key: &'static str,
    /// Management class (`Win32_LogicalDisk`)
    pub class: &'static str,
    /// Property whose value keys each instance
    pub group_by: &'static str,
    /// Optional boolean filter (`IPEnabled = True`)
    pub filter: Option<(&'static str, bool)>,
}

impl Section {
    const fn new(content_key: &'static str, class: &'static str, group_by: &'static str) -> Self {
        Self {
            content_key,
            class,
            group_by,
            filter: None,
        }
    }

    const fn filtered(mut self, property: &'static str, value: bool) -> Self {
        self.filter = Some((property, value));
        self
    }

    fn query(&self) -> WqlQuery {
        let query = WqlQuery::new(self.class);
        match self.filter {
            Some((property, value)) => query.where_bool(property, value),
            None => query,
        }
    }
}

/// Probe built from a fixed list of [`Section`]s
#[derive(Debug, Clone)]
pub struct ClassProbe {
    name: &'static str,
    capability_name: &'static str,
    sections: Vec<Section>,
}

impl ClassProbe {
    /// Create a probe from sections
    #[must_use]
    pub fn new(name: &'static str, capability_name: &'static str, sections: Vec<Section>) -> Self {
        Self {
            name,
            capability_name,
            sections,
        }
    }

    #[must_use]
    pub fn bios() -> Self {
        Self::new(
            "bios",
            "win_bios_statistics",
            vec![Section::new("bios", "Win32_BIOS", "SerialNumber")],
        )
    }

    #[must_use]
    pub fn drives() -> Self {
        Self::new(
            "drives",
            "win_drive_statistics",
            vec![
                Section::new("disk_partitions", "Win32_DiskPartition", "DiskIndex"),
                Section::new("physical_drives", "Win32_DiskDrive", "Index"),
                Section::new("logical_drives", "Win32_LogicalDisk", "DeviceID"),
            ],
        )
    }

    #[must_use]
    pub fn local_accounts() -> Self {
        Self::new(
            "local_accounts",
            "win_local_accounts_statistics",
            vec![
                Section::new("local_accounts", "Win32_UserAccount", "Name")
                    .filtered("LocalAccount", true),
            ],
        )
    }

    #[must_use]
    pub fn memory() -> Self {
        Self::new(
            "memory",
            "win_memory_statistics",
            vec![Section::new("physical_memory", "Win32_PhysicalMemory", "Tag")],
        )
    }

    #[must_use]
    pub fn network() -> Self {
        Self::new(
            "network",
            "win_network_statistics",
            vec![
                Section::new(
                    "network_adapters",
                    "Win32_NetworkAdapterConfiguration",
                    "Index",
                )
                .filtered("IPEnabled", true),
            ],
        )
    }

    #[must_use]
    pub fn os() -> Self {
        Self::new(
            "os",
            "win_os_statistics",
            vec![Section::new("operating_system", "Win32_OperatingSystem", "Caption")],
        )
    }

    #[must_use]
    pub fn processor() -> Self {
        Self::new(
            "processor",
            "win_processor_statistics",
            vec![Section::new("processors", "Win32_Processor", "DeviceID")],
        )
    }

    #[must_use]
    pub fn services() -> Self {
        Self::new(
            "services",
            "win_services_statistics",
            vec![Section::new("services", "Win32_Service", "Name")],
        )
    }

    /// Sections in query order
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

#[async_trait]
impl Probe for ClassProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capability_name(&self) -> &'static str {
        self.capability_name
    }

    #[instrument(skip(self, iface), fields(probe = self.name))]
    async fn collect(&self, iface: &dyn ManagementInterface) -> Result<Content, InventoryError> {
        let mut content = Content::new();

        for section in &self.sections {
            let records = query_records(iface, &section.query()).await?;
            let grouped = group_by(section.class, records, section.group_by)?;

            debug!(section = section.content_key, entries = grouped.len(), "section collected");

            content.insert(section.content_key.to_string(), Value::Object(grouped));
        }

        Ok(content)
    }
}
