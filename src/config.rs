// src/config.rs - Run configuration loaded from TOML

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{OrgaplexError, Result};
use crate::measurement::DEFAULT_VOLUME_WARNING_CEILING;
use crate::nway::TargetSetPolicy;
use crate::oneway::OutputMode;

/// Configuration for Orgaplex-Analyzer
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    #[serde(default)]
    pub analysis: AnalysisKind,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    // N-way interaction
    #[serde(default = "default_contact_threshold")]
    pub contact_threshold: f64,

    /// Empty means every organelle is used as a bait.
    #[serde(default)]
    pub bait_organelles: Vec<String>,

    #[serde(default)]
    pub target_set_policy: TargetSetPolicy,

    // Radial distribution
    #[serde(default)]
    pub radial_organelle: Option<String>,

    #[serde(default = "default_radial_bin_width")]
    pub radial_bin_width: f64,

    #[serde(default = "default_radial_max_distance")]
    pub radial_max_distance: f64,

    // Volume / sphericity metrics; empty means all organelles
    #[serde(default)]
    pub metrics_organelles: Vec<String>,

    // One-way interaction
    #[serde(default)]
    pub oneway_output_mode: OutputMode,

    #[serde(default = "default_volume_warning_ceiling")]
    pub volume_warning_ceiling: f64,

    /// Write `run_summary.json` next to the results.
    #[serde(default = "default_write_run_summary")]
    pub write_run_summary: bool,
}

/// Which analysis a run performs
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// Exact contact combinations around a bait
    #[default]
    Nway,
    /// Volume distribution by distance from the cell origin
    Radial,
    /// Volume and sphericity summary statistics
    Metrics,
    /// Mean distance per organelle pair
    Oneway,
}

impl AnalysisKind {
    /// Name stamped into metadata tables.
    pub fn title(&self) -> &'static str {
        match self {
            AnalysisKind::Nway => "N-Way Interaction Analysis",
            AnalysisKind::Radial => "Radial Distribution",
            AnalysisKind::Metrics => "Vol/Spher Metrics",
            AnalysisKind::Oneway => "One-Way Interaction Analysis",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisKind::Nway => "nway",
            AnalysisKind::Radial => "radial",
            AnalysisKind::Metrics => "metrics",
            AnalysisKind::Oneway => "oneway",
        };
        f.write_str(name)
    }
}

fn default_parallel() -> bool {
    true
}

fn default_contact_threshold() -> f64 {
    0.0
}

fn default_radial_bin_width() -> f64 {
    0.25
}

fn default_radial_max_distance() -> f64 {
    80.0
}

fn default_volume_warning_ceiling() -> f64 {
    DEFAULT_VOLUME_WARNING_CEILING
}

fn default_write_run_summary() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            OrgaplexError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| OrgaplexError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Create default configuration
    pub fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            analysis: AnalysisKind::Nway,
            use_parallel: true,
            contact_threshold: 0.0,
            bait_organelles: Vec::new(),
            target_set_policy: TargetSetPolicy::PerCell,
            radial_organelle: None,
            radial_bin_width: 0.25,
            radial_max_distance: 80.0,
            metrics_organelles: Vec::new(),
            oneway_output_mode: OutputMode::Single,
            volume_warning_ceiling: DEFAULT_VOLUME_WARNING_CEILING,
            write_run_summary: true,
        }
    }

    /// Check parameters without touching the file system.
    pub fn check_parameters(&self) -> Result<()> {
        if !self.contact_threshold.is_finite() {
            return Err(OrgaplexError::Config(
                "contact_threshold must be a finite number".to_string(),
            ));
        }

        if !(self.radial_bin_width.is_finite() && self.radial_bin_width > 0.0) {
            return Err(OrgaplexError::Config(
                "radial_bin_width must be > 0.0".to_string(),
            ));
        }

        if !self.radial_max_distance.is_finite() || self.radial_max_distance <= self.radial_bin_width {
            return Err(OrgaplexError::Config(
                "radial_max_distance must be greater than radial_bin_width".to_string(),
            ));
        }

        if self.volume_warning_ceiling <= 0.0 {
            return Err(OrgaplexError::Config(
                "volume_warning_ceiling must be > 0.0".to_string(),
            ));
        }

        if self.analysis == AnalysisKind::Radial && self.radial_organelle.is_none() {
            return Err(OrgaplexError::Config(
                "radial analysis requires radial_organelle".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate configuration and create the output directory
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.is_dir() {
            return Err(OrgaplexError::InvalidPath(input_path));
        }

        self.check_parameters()?;

        fs::create_dir_all(&self.output_base_dir)?;

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            OrgaplexError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: Config = toml::from_str(
            "input_path = \"data\"\noutput_base_dir = \"out\"\nanalysis = \"radial\"\nradial_organelle = \"LD\"\n",
        )
        .unwrap();

        assert_eq!(config.analysis, AnalysisKind::Radial);
        assert_eq!(config.radial_bin_width, 0.25);
        assert_eq!(config.radial_max_distance, 80.0);
        assert_eq!(config.target_set_policy, TargetSetPolicy::PerCell);
        assert!(config.bait_organelles.is_empty());
        assert!(config.check_parameters().is_ok());
    }

    #[test]
    fn test_policy_and_mode_names() {
        let config: Config = toml::from_str(
            "input_path = \"a\"\noutput_base_dir = \"b\"\ntarget_set_policy = \"per_cell\"\noneway_output_mode = \"per_cell\"\n",
        )
        .unwrap();
        assert_eq!(config.target_set_policy, TargetSetPolicy::PerCell);
        assert_eq!(config.oneway_output_mode, OutputMode::PerCell);
    }

    #[test]
    fn test_rejects_bad_binning() {
        let mut config = Config::default();
        config.radial_bin_width = 0.0;
        assert!(config.check_parameters().is_err());

        let mut config = Config::default();
        config.radial_max_distance = 0.1;
        assert!(config.check_parameters().is_err());
    }

    #[test]
    fn test_radial_needs_organelle() {
        let mut config = Config::default();
        config.analysis = AnalysisKind::Radial;
        assert!(config.check_parameters().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let mut config = Config::default();
        config.bait_organelles = vec!["ER".to_string(), "LD".to_string()];
        config.contact_threshold = 0.1;

        config.save_to_file(&path).unwrap();
        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.bait_organelles, config.bait_organelles);
        assert_eq!(reloaded.contact_threshold, 0.1);
    }

    #[test]
    fn test_parse_error_names_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.toml");
        fs::write(&path, "input_path = ").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, OrgaplexError::ConfigLoad { .. }));
    }
}
