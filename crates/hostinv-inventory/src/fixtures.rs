//! In-memory management interface for probe tests

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use hostinv_exec::{ExecError, Hive, ManagementInterface, WqlQuery};

#[derive(Default)]
pub struct StaticInterface {
    classes: HashMap<String, Vec<String>>,
    registry: BTreeMap<String, Vec<(String, Option<String>)>>,
    owners: HashMap<String, String>,
    failing_class: Option<String>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticInterface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instances(mut self, class: &str, instances: &[&str]) -> Self {
        self.classes.insert(
            class.to_string(),
            instances.iter().map(|s| (*s).to_string()).collect(),
        );
        self
    }

    pub fn with_key(mut self, path: &str, values: &[(&str, Option<&str>)]) -> Self {
        self.registry.insert(
            path.to_string(),
            values
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.map(str::to_string)))
                .collect(),
        );
        self
    }

    pub fn with_owner(mut self, process: &str, user: &str) -> Self {
        self.owners.insert(process.to_string(), user.to_string());
        self
    }

    pub fn failing_on(mut self, class: &str) -> Self {
        self.failing_class = Some(class.to_string());
        self
    }
}

#[async_trait]
impl ManagementInterface for StaticInterface {
    async fn query(&self, query: &WqlQuery) -> Result<Vec<String>, ExecError> {
        self.queries.lock().unwrap().push(query.build());
        if self.failing_class.as_deref() == Some(query.class()) {
            return Err(ExecError::CommandFailed {
                status: 1,
                stderr: "Access is denied.".to_string(),
            });
        }
        Ok(self.classes.get(query.class()).cloned().unwrap_or_default())
    }

    async fn enum_keys(&self, _hive: Hive, subkey: &str) -> Result<Vec<String>, ExecError> {
        let prefix = format!("{subkey}\\");
        Ok(self
            .registry
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('\\'))
            .map(str::to_string)
            .collect())
    }

    async fn enum_values(&self, _hive: Hive, subkey: &str) -> Result<Vec<String>, ExecError> {
        Ok(self
            .registry
            .get(subkey)
            .map(|values| values.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_string_value(
        &self,
        _hive: Hive,
        subkey: &str,
        value_name: &str,
    ) -> Result<Option<String>, ExecError> {
        Ok(self.registry.get(subkey).and_then(|values| {
            values
                .iter()
                .find(|(k, _)| k == value_name)
                .and_then(|(_, v)| v.clone())
        }))
    }

    async fn process_owner(&self, process_name: &str) -> Result<Option<String>, ExecError> {
        Ok(self.owners.get(process_name).cloned())
    }

    fn interface_type(&self) -> &'static str {
        "static"
    }
}
