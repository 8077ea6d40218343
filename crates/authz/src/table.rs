use std::collections::HashMap;

/// Required permissions per operation.
///
/// Operations are keyed `"<METHOD> <route template>"`, for example
/// `"POST /api/boards/:board_id/tasks"`. Operations not listed require nothing.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    entries: HashMap<String, Vec<String>>,
}

impl PermissionTable {
    pub fn builder() -> PermissionTableBuilder {
        PermissionTableBuilder::default()
    }

    pub fn operation_id(method: &str, route: &str) -> String {
        format!("{} {}", method.to_ascii_uppercase(), route)
    }

    pub fn required_for(&self, method: &str, route: &str) -> &[String] {
        self.entries
            .get(&Self::operation_id(method, route))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace or add entries, e.g. from configuration. Keys are normalized the
    /// same way as builder entries.
    pub fn with_overrides(mut self, overrides: HashMap<String, Vec<String>>) -> Self {
        for (operation, slugs) in overrides {
            let key = match operation.trim().split_once(char::is_whitespace) {
                Some((method, route)) => Self::operation_id(method, route.trim()),
                None => operation.trim().to_string(),
            };
            self.entries.insert(key, slugs);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PermissionTableBuilder {
    entries: HashMap<String, Vec<String>>,
}

impl PermissionTableBuilder {
    pub fn require(mut self, method: &str, route: &str, slugs: &[&str]) -> Self {
        self.entries.insert(
            PermissionTable::operation_id(method, route),
            slugs.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn build(self) -> PermissionTable {
        PermissionTable {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PermissionTable {
        PermissionTable::builder()
            .require("get", "/api/audit-logs", &["audit.view"])
            .require("DELETE", "/api/boards/:board_id", &["boards.view", "boards.delete"])
            .build()
    }

    #[test]
    fn test_lookup_is_method_insensitive() {
        let table = table();
        assert_eq!(table.required_for("GET", "/api/audit-logs"), ["audit.view"]);
        assert_eq!(
            table.required_for("delete", "/api/boards/:board_id"),
            ["boards.view", "boards.delete"]
        );
    }

    #[test]
    fn test_unlisted_operation_requires_nothing() {
        let table = table();
        assert!(table.required_for("POST", "/api/audit-logs").is_empty());
        assert!(table.required_for("GET", "/health").is_empty());
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let overrides = HashMap::from([
            ("get  /api/audit-logs".to_string(), vec!["audit.view".to_string(), "users.view".to_string()]),
            ("POST /api/boards".to_string(), vec!["boards.create".to_string()]),
        ]);

        let table = table().with_overrides(overrides);
        assert_eq!(table.len(), 3);
        assert_eq!(table.required_for("GET", "/api/audit-logs"), ["audit.view", "users.view"]);
        assert_eq!(table.required_for("POST", "/api/boards"), ["boards.create"]);
    }
}
