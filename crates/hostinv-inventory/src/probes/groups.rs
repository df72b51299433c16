//! Local groups and their members

use async_trait::async_trait;
use hostinv_exec::{ManagementInterface, WqlQuery};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::InventoryError;
use crate::probe::{Probe, query_records, record_key};
use crate::types::{Content, record_to_json};

/// Groups keyed by name, each with its information record and member names
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGroupsProbe;

impl LocalGroupsProbe {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// `Name` key property of an object path
///
/// `\\WS01\root\cimv2:Win32_Group.Domain="WS01",Name="Users"` yields `Users`.
#[must_use]
pub fn component_name(path: &str) -> Option<String> {
    let relative = path.split_once(':').map_or(path, |(_, rest)| rest);
    let keys = relative.split_once('.').map_or(relative, |(_, keys)| keys);
    keys.split(',').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == "Name").then(|| value.trim().trim_matches('"').to_string())
    })
}

fn component(record: &crate::types::ParsedRecord, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(component_name)
}

#[async_trait]
impl Probe for LocalGroupsProbe {
    fn name(&self) -> &'static str {
        "local_groups"
    }

    fn capability_name(&self) -> &'static str {
        "win_local_groups_statistics"
    }

    #[instrument(skip(self, iface))]
    async fn collect(&self, iface: &dyn ManagementInterface) -> Result<Content, InventoryError> {
        let mut groups = Map::new();

        for record in query_records(iface, &WqlQuery::new("Win32_Group")).await? {
            let name = record_key("Win32_Group", &record, "Name")?;
            let mut entry = Map::new();
            entry.insert("group_information".to_string(), record_to_json(record));
            groups.insert(name, Value::Object(entry));
        }

        let memberships = query_records(iface, &WqlQuery::new("Win32_GroupUser")).await?;
        debug!(groups = groups.len(), memberships = memberships.len(), "joining members");

        for membership in memberships {
            let (Some(group), Some(user)) = (
                component(&membership, "GroupComponent"),
                component(&membership, "PartComponent"),
            ) else {
                warn!("skipping membership without group or member name");
                continue;
            };

            let Some(Value::Object(entry)) = groups.get_mut(&group) else {
                continue;
            };

            let users = entry
                .entry("group_users")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(users) = users {
                users.push(Value::String(user));
            }
        }

        let mut content = Content::new();
        content.insert("local_groups".to_string(), Value::Object(groups));
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fixtures::StaticInterface;

    fn group(name: &str) -> String {
        format!("instance of Win32_Group\n{{\n\tDomain = \"WS01\";\n\tName = \"{name}\";\n\tLocalAccount = TRUE;\n}};")
    }

    fn member(group: &str, user: &str) -> String {
        format!(
            "instance of Win32_GroupUser\n{{\n\tGroupComponent = \"\\\\\\\\WS01\\\\root\\\\cimv2:Win32_Group.Domain=\\\"WS01\\\",Name=\\\"{group}\\\"\";\n\tPartComponent = \"\\\\\\\\WS01\\\\root\\\\cimv2:Win32_UserAccount.Domain=\\\"WS01\\\",Name=\\\"{user}\\\"\";\n}};"
        )
    }

    #[test]
    fn test_component_name() {
        assert_eq!(
            component_name(r#"\\WS01\root\cimv2:Win32_Group.Domain="WS01",Name="Remote Desktop Users""#)
                .as_deref(),
            Some("Remote Desktop Users")
        );
        assert_eq!(component_name("no keys here"), None);
    }

    #[tokio::test]
    async fn test_members_joined_to_groups() {
        let groups = [group("Administrators"), group("Guests")];
        let members = [
            member("Administrators", "Administrator"),
            member("Administrators", "alice"),
            member("Domain Admins", "bob"),
        ];
        let group_refs: Vec<&str> = groups.iter().map(String::as_str).collect();
        let member_refs: Vec<&str> = members.iter().map(String::as_str).collect();

        let iface = StaticInterface::new()
            .with_instances("Win32_Group", &group_refs)
            .with_instances("Win32_GroupUser", &member_refs);

        let content = LocalGroupsProbe::new().collect(&iface).await.unwrap();
        let local_groups = &content["local_groups"];

        assert_eq!(
            local_groups["Administrators"]["group_users"],
            json!(["Administrator", "alice"])
        );
        assert_eq!(
            local_groups["Administrators"]["group_information"]["Domain"],
            json!("WS01")
        );
        assert!(local_groups["Guests"].get("group_users").is_none());
        assert!(local_groups.get("Domain Admins").is_none());
    }
}
