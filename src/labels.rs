//! Class id to product-name mapping.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Default label set for the bundled product model, indexed by class id.
pub const DEFAULT_LABELS: &[&str] = &[
    "corn",
    "green_beans",
    "sweet_peas",
    "pineapple_chunks",
    "pineapple_slices",
    "pineapple_juice",
    "fruit_cocktail",
    "sliced_peaches",
    "tomato_sauce",
    "ketchup",
    "spaghetti_sauce",
];

/// Fixed mapping from class id to canonical label string. For the local
/// model this comes from the model's training configuration; the remote
/// detector grows its table as new label strings arrive.
#[derive(Debug, Clone)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn product_defaults() -> Self {
        Self {
            names: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Load a label table from a JSON array of class-id-ordered names.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {}", path.display()))?;
        let names: Vec<String> = serde_json::from_str(&contents)
            .with_context(|| format!("label file {} is not a JSON array of strings", path.display()))?;
        if names.is_empty() {
            bail!("label file {} contains no labels", path.display());
        }
        Ok(Self { names })
    }

    pub fn resolve(&self, class_id: u32) -> Option<&str> {
        self.names.get(class_id as usize).map(String::as_str)
    }

    /// Index of `name`, adding it to the table if unseen. Ids handed out are
    /// stable for the lifetime of the table.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(index) = self.names.iter().position(|n| n == name) {
            return index as u32;
        }
        self.names.push(name.to_string());
        (self.names.len() - 1) as u32
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_table_resolves_in_order() {
        let table = LabelTable::product_defaults();
        assert_eq!(table.resolve(0), Some("corn"));
        assert_eq!(table.resolve(3), Some("pineapple_chunks"));
        assert_eq!(table.resolve(999), None);
        assert_eq!(table.len(), DEFAULT_LABELS.len());
    }

    #[test]
    fn test_intern_reuses_existing_ids() {
        let mut table = LabelTable::from_names(Vec::new());
        let a = table.intern("corn");
        let b = table.intern("ketchup");
        let c = table.intern("corn");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.resolve(a), Some("corn"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_from_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.json");
        fs::write(&path, r#"["corn", "green_beans"]"#).unwrap();

        let table = LabelTable::from_file(&path).unwrap();
        assert_eq!(table.resolve(0), Some("corn"));
        assert_eq!(table.resolve(1), Some("green_beans"));
        assert_eq!(table.resolve(2), None);
    }

    #[test]
    fn test_from_file_rejects_empty_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.json");
        fs::write(&path, "[]").unwrap();

        assert!(LabelTable::from_file(&path).is_err());
    }

    #[test]
    fn test_from_file_rejects_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.json");
        fs::write(&path, r#"{"0": "corn"}"#).unwrap();

        assert!(LabelTable::from_file(&path).is_err());
    }
}
