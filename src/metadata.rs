// src/metadata.rs - Run context and Parameter/Value metadata tables

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub const SOFTWARE_NAME: &str = "Orgaplex-Analyzer";

/// Timestamp format inside metadata tables.
pub const METADATA_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp format inside file names.
pub const FILE_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareInfo {
    pub name: String,
    pub version: String,
}

impl Default for SoftwareInfo {
    fn default() -> Self {
        Self {
            name: SOFTWARE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Everything a run stamps onto its outputs. Passed explicitly; one per run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub software: SoftwareInfo,
    pub input_dir: PathBuf,
    pub timestamp: DateTime<Local>,
}

impl RunContext {
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        Self {
            software: SoftwareInfo::default(),
            input_dir: input_dir.as_ref().to_path_buf(),
            timestamp: Local::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Timestamp suitable for file names, e.g. `20250101_120000`.
    pub fn file_stamp(&self) -> String {
        self.timestamp.format(FILE_TIME_FORMAT).to_string()
    }

    /// Metadata table pre-filled with the base keys.
    pub fn metadata(&self, analysis_type: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata
            .push("Software", &self.software.name)
            .push("Version", &self.software.version)
            .push("Analysis_Type", analysis_type)
            .push("Timestamp", self.timestamp.format(METADATA_TIME_FORMAT))
            .push("Platform", std::env::consts::OS)
            .push("Input_Directory", self.input_dir.display());
        metadata
    }
}

/// Ordered `Parameter, Value` pairs. Pushing an existing key replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base_keys_in_order() {
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let ctx = RunContext::new("/data/run1").with_timestamp(ts);
        let metadata = ctx.metadata("N-way Interaction Analysis");

        let keys: Vec<&str> = metadata.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["Software", "Version", "Analysis_Type", "Timestamp", "Platform", "Input_Directory"]
        );
        assert_eq!(metadata.get("Software"), Some("Orgaplex-Analyzer"));
        assert_eq!(metadata.get("Timestamp"), Some("2024-03-05 14:07:09"));
        assert_eq!(ctx.file_stamp(), "20240305_140709");
    }

    #[test]
    fn test_push_replaces_existing_key() {
        let mut metadata = Metadata::new();
        metadata.push("Organelle", "ER").push("Total_Bins", 4).push("Organelle", "LD");
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("Organelle"), Some("LD"));
    }
}
