//! Pipeline configuration file.
//!
//! Loaded from YAML or JSON (chosen by extension). Every field has a default,
//! so an empty file or a partial one is valid.

use std::path::{Path, PathBuf};

use common::{FileExtensionError, FileFormat, SerdeFormatError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::Acquisition;
use crate::segmentation::SegmentationConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extension(#[from] FileExtensionError),

    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: SerdeFormatError,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Where and how results are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// SQLite database, relative paths resolve against the output directory.
    pub db_path: PathBuf,
    /// Append-only summary CSV, resolved like `db_path`.
    pub summary_csv: PathBuf,
    /// Write a segmentation panel PNG per image.
    pub visualize: bool,
    /// Delete an existing database before the run.
    pub overwrite_db: bool,
    /// Process files on the rayon thread pool.
    pub parallel: bool,
    /// Side of each panel tile in pixels.
    pub panel_size: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("results.db"),
            summary_csv: PathBuf::from("image_summary.csv"),
            visualize: true,
            overwrite_db: false,
            parallel: false,
            panel_size: 800,
        }
    }
}

impl OutputConfig {
    pub fn resolved_db_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.db_path)
    }

    pub fn resolved_summary_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.summary_csv)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationConfig,
    pub acquisition: Acquisition,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = FileFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            common::deserialize(&text, format).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };

        tracing::debug!("Loaded config from '{}'", path.display());
        Ok(config)
    }

    /// Check user-supplied values without panicking.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.segmentation.check().map_err(ConfigError::Invalid)?;
        if self.output.panel_size == 0 {
            return Err(ConfigError::Invalid("panel_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Panics
    /// Panics on an invalid segmentation section or a zero panel size.
    pub fn validate(&self) {
        if let Err(e) = self.check() {
            panic!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::Connectivity;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        config.validate();
        assert_eq!(config.output.db_path, PathBuf::from("results.db"));
        assert_eq!(config.output.summary_csv, PathBuf::from("image_summary.csv"));
        assert!(config.output.visualize);
        assert!(!config.output.parallel);
        assert_eq!(config.acquisition.magnification, "40x");
        assert_eq!(config.acquisition.fluorophore, "mCherry-H2B");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &path,
            "segmentation:\n  min_area: 12\n  connectivity: four\noutput:\n  parallel: true\n",
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();

        assert_eq!(config.segmentation.min_area, 12);
        assert_eq!(config.segmentation.connectivity, Connectivity::Four);
        assert_eq!(config.segmentation.block_size, 201);
        assert!(config.output.parallel);
        assert_eq!(config.output.panel_size, 800);
    }

    #[test]
    fn test_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"acquisition": {"magnification": "63x"}}"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();

        assert_eq!(config.acquisition.magnification, "63x");
        assert_eq!(config.acquisition.fluorophore, "mCherry-H2B");
    }

    #[test]
    fn test_empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yml");
        std::fs::write(&path, "\n").unwrap();

        assert_eq!(PipelineConfig::load(&path).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_round_trip_through_yaml() {
        let mut config = PipelineConfig::default();
        config.segmentation.block_size = 51;
        config.output.visualize = false;

        let text = common::serialize(&config, FileFormat::Yaml).unwrap();
        let back: PipelineConfig = common::deserialize(&text, FileFormat::Yaml).unwrap();

        assert_eq!(back, config);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let bad_ext = dir.path().join("pipeline.toml");
        std::fs::write(&bad_ext, "").unwrap();
        assert!(matches!(
            PipelineConfig::load(&bad_ext),
            Err(ConfigError::Extension(_))
        ));

        let missing = dir.path().join("absent.yaml");
        assert!(matches!(PipelineConfig::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(PipelineConfig::load(&broken), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_check_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        assert!(config.check().is_ok());

        config.segmentation.block_size = 200;
        let err = config.check().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert_eq!(err.to_string(), "Invalid config: block_size must be odd, got 200");

        config.segmentation.block_size = 201;
        config.output.panel_size = 0;
        assert_eq!(
            config.check().unwrap_err().to_string(),
            "Invalid config: panel_size must be positive"
        );
    }

    #[test]
    #[should_panic(expected = "min_area must be at least 1")]
    fn test_validate_panics_on_zero_min_area() {
        let mut config = PipelineConfig::default();
        config.segmentation.min_area = 0;
        config.validate();
    }

    #[test]
    fn test_output_paths_resolve_against_output_dir() {
        let output = OutputConfig::default();
        let dir = Path::new("/data/run1");
        assert_eq!(output.resolved_db_path(dir), dir.join("results.db"));

        let absolute = OutputConfig {
            summary_csv: PathBuf::from("/tmp/summary.csv"),
            ..Default::default()
        };
        assert_eq!(absolute.resolved_summary_path(dir), PathBuf::from("/tmp/summary.csv"));
    }
}
