use crate::constants::NIFTY50_SYMBOLS;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Stock universe organized by sector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    #[serde(flatten)]
    pub groups: HashMap<String, Vec<String>>,
}

impl Universe {
    /// Load sector groups from a JSON file (`{"BANKING": ["HDFCBANK.NS", ...]}`)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let groups: HashMap<String, Vec<String>> = serde_json::from_str(&content)?;
        if groups.values().all(|v| v.is_empty()) {
            return Err(AppError::Config(format!(
                "Universe file {} lists no symbols",
                path.as_ref().display()
            )));
        }
        Ok(Self { groups })
    }

    /// Load from file, falling back to the built-in Nifty 50 list
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(universe) => universe,
            Err(e) => {
                tracing::warn!(
                    "Using built-in Nifty 50 list, could not load {}: {}",
                    path.as_ref().display(),
                    e
                );
                Self::nifty50()
            }
        }
    }

    /// Built-in Nifty 50 constituents as a single group
    pub fn nifty50() -> Self {
        let mut groups = HashMap::new();
        groups.insert(
            "NIFTY50".to_string(),
            NIFTY50_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        );
        Self { groups }
    }

    /// Get all symbols across all groups (flattened, sorted, unique)
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.groups.values().flat_map(|v| v.clone()).collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Get symbols for a specific group
    pub fn get_group(&self, group_name: &str) -> Option<&Vec<String>> {
        self.groups.get(group_name)
    }

    /// Sector a symbol belongs to
    pub fn sector_of(&self, symbol: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, symbols)| symbols.iter().any(|s| s == symbol))
            .map(|(sector, _)| sector.as_str())
    }

    /// Get all group names
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn symbol_count(&self) -> usize {
        self.all_symbols().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_structure() {
        let mut groups = HashMap::new();
        groups.insert("IT".to_string(), vec!["TCS.NS".to_string(), "INFY.NS".to_string()]);
        groups.insert("BANKING".to_string(), vec!["HDFCBANK.NS".to_string(), "TCS.NS".to_string()]);

        let universe = Universe { groups };

        assert_eq!(universe.symbol_count(), 3);
        assert_eq!(universe.group_names(), vec!["BANKING", "IT"]);
        assert_eq!(universe.sector_of("INFY.NS"), Some("IT"));
        assert_eq!(universe.sector_of("XYZ.NS"), None);
    }

    #[test]
    fn test_builtin_list_has_fifty() {
        assert_eq!(Universe::nifty50().symbol_count(), 50);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let universe = Universe::load_or_default(dir.path().join("missing.json"));
        assert_eq!(universe.symbol_count(), 50);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u.json");
        std::fs::write(&path, r#"{"IT": ["TCS.NS", "WIPRO.NS"]}"#).unwrap();
        let universe = Universe::from_file(&path).unwrap();
        assert_eq!(universe.all_symbols(), vec!["TCS.NS", "WIPRO.NS"]);
    }
}
