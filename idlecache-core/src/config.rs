//! Table configuration.

use serde::{Deserialize, Serialize};

/// Options applied when a table is first created.
///
/// Later lookups of an existing table ignore the configuration they pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Number of entries to preallocate room for
    pub initial_capacity: usize,
    /// Whether to attach a tracing-backed logger at creation
    pub trace_events: bool,
}

impl TableConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preallocated capacity.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Enables forwarding of table diagnostics to `tracing`.
    pub fn trace_events(mut self) -> Self {
        self.trace_events = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TableConfig::default();
        assert_eq!(config.initial_capacity, 0);
        assert!(!config.trace_events);
    }

    #[test]
    fn test_builder() {
        let config = TableConfig::new().initial_capacity(64).trace_events();
        assert_eq!(config.initial_capacity, 64);
        assert!(config.trace_events);
    }

    #[test]
    fn test_partial_json() {
        let config: TableConfig = serde_json::from_str(r#"{"trace_events":true}"#).unwrap();
        assert_eq!(config, TableConfig::new().trace_events());
    }
}
