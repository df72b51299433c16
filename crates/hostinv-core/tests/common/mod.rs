//! Shared mocks for hostinv-core integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hostinv_core::ReportSettings;
use hostinv_exec::{ExecError, Hive, InterfaceFactory, ManagementInterface, WqlQuery};
use hostinv_inventory::{Content, InventoryError, Probe};
use serde_json::Value;
use tempfile::TempDir;

/// Interface that answers nothing and counts sessions
#[derive(Default)]
pub struct MockInterface {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub refuse_session: AtomicBool,
}

#[async_trait]
impl ManagementInterface for MockInterface {
    async fn query(&self, _query: &WqlQuery) -> Result<Vec<String>, ExecError> {
        Ok(Vec::new())
    }

    async fn enum_keys(&self, _hive: Hive, _subkey: &str) -> Result<Vec<String>, ExecError> {
        Ok(Vec::new())
    }

    async fn enum_values(&self, _hive: Hive, _subkey: &str) -> Result<Vec<String>, ExecError> {
        Ok(Vec::new())
    }

    async fn get_string_value(
        &self,
        _hive: Hive,
        _subkey: &str,
        _value_name: &str,
    ) -> Result<Option<String>, ExecError> {
        Ok(None)
    }

    async fn process_owner(&self, _process_name: &str) -> Result<Option<String>, ExecError> {
        Ok(None)
    }

    fn initialize(&self) -> Result<(), ExecError> {
        if self.refuse_session.load(Ordering::SeqCst) {
            return Err(ExecError::SessionError("apartment refused".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninitialize(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn interface_type(&self) -> &'static str {
        "mock"
    }
}

/// Hands out one shared [`MockInterface`]
pub struct MockFactory {
    pub interface: Arc<MockInterface>,
    pub unreachable: bool,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            interface: Arc::new(MockInterface::default()),
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl InterfaceFactory for MockFactory {
    async fn connect(&self, host: &str) -> Result<Arc<dyn ManagementInterface>, ExecError> {
        if self.unreachable {
            return Err(ExecError::SpawnError(format!("{host} is unreachable")));
        }
        Ok(self.interface.clone())
    }

    async fn is_available(&self) -> bool {
        !self.unreachable
    }
}

pub enum Behavior {
    Content(Value),
    Fail(&'static str),
    Sleep(Duration, Value),
    Panic,
}

/// Probe with scripted behavior
pub struct MockProbe {
    pub name: &'static str,
    pub behavior: Behavior,
}

impl MockProbe {
    pub fn content(name: &'static str, content: Value) -> Arc<dyn Probe> {
        Arc::new(Self {
            name,
            behavior: Behavior::Content(content),
        })
    }

    pub fn failing(name: &'static str, detail: &'static str) -> Arc<dyn Probe> {
        Arc::new(Self {
            name,
            behavior: Behavior::Fail(detail),
        })
    }

    pub fn slow(name: &'static str, delay: Duration, content: Value) -> Arc<dyn Probe> {
        Arc::new(Self {
            name,
            behavior: Behavior::Sleep(delay, content),
        })
    }

    pub fn panicking(name: &'static str) -> Arc<dyn Probe> {
        Arc::new(Self {
            name,
            behavior: Behavior::Panic,
        })
    }
}

fn to_content(value: &Value) -> Content {
    value.as_object().cloned().unwrap_or_default()
}

#[async_trait]
impl Probe for MockProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn capability_name(&self) -> &'static str {
        self.name
    }

    async fn collect(&self, _iface: &dyn ManagementInterface) -> Result<Content, InventoryError> {
        match &self.behavior {
            Behavior::Content(value) => Ok(to_content(value)),
            Behavior::Fail(detail) => Err(InventoryError::UnexpectedValue {
                field: "Name".to_string(),
                detail: (*detail).to_string(),
            }),
            Behavior::Sleep(delay, value) => {
                tokio::time::sleep(*delay).await;
                Ok(to_content(value))
            }
            Behavior::Panic => panic!("probe {} exploded", self.name),
        }
    }
}

pub fn settings(dir: &TempDir) -> ReportSettings {
    ReportSettings {
        project_dir: dir.path().to_path_buf(),
        ..ReportSettings::default()
    }
}

/// Parse every line of a report file
pub fn report_lines(settings: &ReportSettings, capability: &str) -> Vec<Value> {
    let path = settings.log_dir().join(format!("{capability}_report"));
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
