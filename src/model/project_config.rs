//! Per-project configuration shared with the backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Project configuration as stored by the backend.
///
/// The editor only reads `classMapping`. Any other keys are kept in `extra`
/// so that saving the config back does not drop settings owned by other
/// tools.
///
/// Mapping keys stay strings, as they are on the wire: integer map keys do
/// not survive the buffering that `flatten` requires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    class_mapping: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or rename a class.
    pub fn with_class(mut self, index: u32, name: impl Into<String>) -> Self {
        self.set_class(index, name);
        self
    }

    pub fn set_class(&mut self, index: u32, name: impl Into<String>) {
        self.class_mapping.insert(index.to_string(), name.into());
    }

    pub fn remove_class(&mut self, index: u32) -> Option<String> {
        self.class_mapping.remove(&index.to_string())
    }

    /// Name of a class index, if one is mapped.
    pub fn class_name(&self, index: u32) -> Option<&str> {
        self.class_mapping
            .get(&index.to_string())
            .map(String::as_str)
    }

    /// Mapped classes in ascending index order. Keys that are not
    /// non-negative integers are skipped.
    pub fn classes(&self) -> Vec<(u32, &str)> {
        let mut classes: Vec<(u32, &str)> = self
            .class_mapping
            .iter()
            .filter_map(|(key, name)| key.trim().parse().ok().map(|i| (i, name.as_str())))
            .collect();
        classes.sort_by_key(|(index, _)| *index);
        classes
    }

    /// Resolve the label of a new box: an explicit non-empty label wins, then
    /// the mapped class name, then the empty string.
    pub fn resolve_label(&self, explicit: Option<&str>, class_index: u32) -> String {
        match explicit {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => self.class_name(class_index).unwrap_or_default().to_string(),
        }
    }
}
