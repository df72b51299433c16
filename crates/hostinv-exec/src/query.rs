//! WQL query builder for management-interface class queries

use std::fmt;

/// WQL query builder
///
/// Selects every property of one management class, optionally filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WqlQuery {
    /// Management class name (`Win32_Process`, ...)
    class: String,
    /// WHERE clauses, joined with AND
    where_clauses: Vec<String>,
}

impl WqlQuery {
    /// Create a new query for a class
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            where_clauses: Vec::new(),
        }
    }

    /// Add an equality filter on a string property
    #[must_use]
    pub fn where_eq(mut self, property: &str, value: &str) -> Self {
        self.where_clauses
            .push(format!("{property} = '{}'", escape(value)));
        self
    }

    /// Add an equality filter on a boolean property
    #[must_use]
    pub fn where_bool(mut self, property: &str, value: bool) -> Self {
        let literal = if value { "True" } else { "False" };
        self.where_clauses.push(format!("{property} = {literal}"));
        self
    }

    /// Class being queried
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Filter expression, if any
    #[must_use]
    pub fn filter(&self) -> Option<String> {
        if self.where_clauses.is_empty() {
            None
        } else {
            Some(self.where_clauses.join(" AND "))
        }
    }

    /// Build the WQL string
    #[must_use]
    pub fn build(&self) -> String {
        let mut wql = format!("SELECT * FROM {}", self.class);

        if let Some(filter) = self.filter() {
            wql.push_str(" WHERE ");
            wql.push_str(&filter);
        }

        wql
    }
}

impl fmt::Display for WqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build())
    }
}

/// WQL string literals escape backslash and the quote character
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_class_query() {
        let query = WqlQuery::new("Win32_Processor");
        assert_eq!(query.build(), "SELECT * FROM Win32_Processor");
        assert_eq!(query.filter(), None);
        assert_eq!(query.class(), "Win32_Processor");
    }

    #[test]
    fn test_filters_are_joined() {
        let query = WqlQuery::new("Win32_UserAccount")
            .where_bool("LocalAccount", true)
            .where_eq("Name", "Guest");

        assert_eq!(
            query.build(),
            "SELECT * FROM Win32_UserAccount WHERE LocalAccount = True AND Name = 'Guest'"
        );
    }

    #[test]
    fn test_quote_injection_is_escaped() {
        let query = WqlQuery::new("Win32_Process").where_eq("Name", "x' OR Name LIKE '%");
        assert!(query.build().contains(r"Name = 'x\' OR Name LIKE \'%'"));
    }

    #[test]
    fn test_backslash_is_escaped() {
        let query = WqlQuery::new("Win32_Directory").where_eq("Name", r"C:\Windows");
        assert!(query.build().ends_with(r"Name = 'C:\\Windows'"));
    }
}
