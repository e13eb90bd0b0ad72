//! Application configuration management.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. Built-in defaults (every field has one)
//! 2. An optional TOML file
//! 3. Environment overrides: `BINSCAN__<SECTION>__<KEY>`, e.g.
//!    `BINSCAN__GEOFENCE__THRESHOLD_METERS=50`
//!
//! The geofence threshold lives in exactly one place
//! ([`GeofenceConfig::threshold_meters`]); both the enforced check and the
//! user-facing notice read it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bins::BinRegistry;
use crate::codes::CodeSet;
use crate::geofence::{GeofenceGate, DEFAULT_GEOFENCE_THRESHOLD_METERS};
use crate::history::{is_valid_timestamp_pattern, TimestampStyle, DEFAULT_TIMESTAMP_FORMAT};
use crate::proximity::{RadiusExpansion, PRESET_RADII_METERS};
use crate::storage::Storage;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "BINSCAN";

/// Errors raised while loading, validating, or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The layered sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    /// The config file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field has an invalid value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields are invalid.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Bin search radii.
    pub search: SearchConfig,
    /// Scan-screen proximity gate.
    pub geofence: GeofenceConfig,
    /// Scan cooldown and timestamp rendering.
    pub scan: ScanConfig,
    /// Where data is persisted.
    pub storage: StorageConfig,
    /// Overrides for the packaged bin and code lists.
    pub data: DataConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Search radius settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Radii offered in the search menu, in meters.
    pub preset_radii: Vec<f64>,
    /// Progressive search policy.
    pub expansion: RadiusExpansion,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            preset_radii: PRESET_RADII_METERS.to_vec(),
            expansion: RadiusExpansion::default(),
        }
    }
}

/// Geofence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// Distance within which a bin may be scanned, in meters.
    pub threshold_meters: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            threshold_meters: DEFAULT_GEOFENCE_THRESHOLD_METERS,
        }
    }
}

/// Scan handling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Seconds a device must wait after an accepted scan.
    pub cooldown_secs: u64,
    /// IANA timezone for displayed timestamps.
    pub timezone: String,
    /// strftime pattern for displayed timestamps.
    pub timestamp_format: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: crate::scan::DEFAULT_SCAN_COOLDOWN.as_secs(),
            timezone: "UTC".to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory; the platform default when unset.
    pub data_dir: Option<PathBuf>,
    /// Whether bins dropped on the map survive a restart.
    pub persist_dropped_pins: bool,
}

/// Overrides for packaged data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// JSON bin list replacing the packaged one.
    pub bins_path: Option<PathBuf>,
    /// JSON code list replacing the packaged one.
    pub codes_path: Option<PathBuf>,
}

impl DataConfig {
    /// Load the bin list from the override file or the packaged data.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be read or is malformed.
    pub fn load_bins(&self) -> crate::Result<BinRegistry> {
        match &self.bins_path {
            Some(path) => BinRegistry::load_file(path),
            None => BinRegistry::bundled(),
        }
    }

    /// Load the bundled code set from the override file or the packaged data.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be read or is malformed.
    pub fn load_codes(&self) -> crate::Result<CodeSet> {
        match &self.codes_path {
            Some(path) => CodeSet::load_file(path),
            None => CodeSet::bundled(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from a file that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file is missing, otherwise as
    /// [`Config::load`].
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::load(Some(path))
    }

    /// Save configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        let write_error = |source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(path, content).map_err(write_error)?;
        Ok(())
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns the single error, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut fail = |field, message: String| {
            errors.push(ConfigError::ValidationError { field, message });
        };

        if self.search.preset_radii.is_empty() {
            fail("search.preset_radii", "at least one radius is required".into());
        }
        if let Some(r) = self
            .search
            .preset_radii
            .iter()
            .find(|r| !(r.is_finite() && **r > 0.0))
        {
            fail("search.preset_radii", format!("{r} is not a positive radius"));
        }
        if let Err(e) = self.search.expansion.validate() {
            fail("search.expansion", e.to_string());
        }
        if !(self.geofence.threshold_meters.is_finite() && self.geofence.threshold_meters > 0.0) {
            fail(
                "geofence.threshold_meters",
                format!("{} is not a positive distance", self.geofence.threshold_meters),
            );
        }
        if !is_valid_timezone(&self.scan.timezone) {
            fail(
                "scan.timezone",
                format!("'{}' is not an IANA timezone", self.scan.timezone),
            );
        }
        if !is_valid_timestamp_pattern(&self.scan.timestamp_format) {
            fail(
                "scan.timestamp_format",
                format!("'{}' is not a strftime pattern", self.scan.timestamp_format),
            );
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Geofence gate using the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is invalid.
    pub fn geofence_gate(&self) -> crate::Result<GeofenceGate> {
        GeofenceGate::new(self.geofence.threshold_meters)
    }

    /// Timestamp style from the scan settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the timezone or pattern is invalid.
    pub fn timestamp_style(&self) -> crate::Result<TimestampStyle> {
        let tz: Tz = self.scan.timezone.parse().map_err(|_| {
            crate::BinscanError::ConfigValidationError(format!(
                "scan.timezone: '{}' is not an IANA timezone",
                self.scan.timezone
            ))
        })?;
        TimestampStyle::new(tz, self.scan.timestamp_format.clone())
    }

    /// Scan cooldown period.
    #[must_use]
    pub const fn scan_cooldown(&self) -> Duration {
        Duration::from_secs(self.scan.cooldown_secs)
    }

    /// Storage at the configured or default data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory is configured and none can be determined.
    pub fn storage(&self) -> crate::Result<Storage> {
        match &self.storage.data_dir {
            Some(dir) => Ok(Storage::new(dir.clone())),
            None => Storage::default_location(),
        }
    }
}

/// Default config file location.
///
/// On Linux servers: `/etc/binscan/config.toml`
/// Elsewhere: the platform config dir, e.g. `~/.config/binscan/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Some(PathBuf::from("/etc/binscan/config.toml"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "binscan")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Whether `name` is a known IANA timezone.
#[must_use]
pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.geofence.threshold_meters, 100.0);
        assert_eq!(config.search.preset_radii, vec![100.0, 250.0, 500.0]);
        assert_eq!(config.search.expansion, RadiusExpansion::default());
        assert!(!config.storage.persist_dropped_pins);
        assert_eq!(config.scan_cooldown(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binscan.toml");
        std::fs::write(
            &path,
            r#"
[geofence]
threshold_meters = 50.0

[scan]
timezone = "Asia/Bangkok"

[search.expansion]
step = 250.0
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.geofence.threshold_meters, 50.0);
        assert_eq!(config.scan.timezone, "Asia/Bangkok");
        assert_eq!(config.search.expansion.step, 250.0);
        assert_eq!(config.search.expansion.max, 1000.0);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_load_from_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("binscan.toml");

        let mut config = Config::default();
        config.geofence.threshold_meters = 10.0;
        config.storage.persist_dropped_pins = true;
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.geofence.threshold_meters, 10.0);
        assert!(loaded.storage.persist_dropped_pins);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.geofence.threshold_meters = 0.0;
        config.scan.timezone = "Mars/Olympus".into();
        config.search.preset_radii = vec![100.0, -1.0];

        match config.validate().unwrap_err() {
            ConfigError::MultipleValidationErrors(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_single_validation_error() {
        let mut config = Config::default();
        config.search.expansion.step = 0.0;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { field, .. } if field == "search.expansion")
        );
    }

    #[test]
    fn test_converts_into_unified_error() {
        let mut config = Config::default();
        config.scan.timestamp_format = "%Y-%".into();
        let err: crate::BinscanError = config.validate().unwrap_err().into();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_derived_components() {
        let mut config = Config::default();
        config.geofence.threshold_meters = 25.0;
        config.scan.timezone = "Asia/Bangkok".into();

        assert_eq!(config.geofence_gate().unwrap().threshold_meters(), 25.0);
        assert!(config.timestamp_style().is_ok());
    }

    #[test]
    fn test_data_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let bins = dir.path().join("bins.json");
        std::fs::write(&bins, r#"[{"id": "x", "latitude": 1.0, "longitude": 1.0}]"#).unwrap();

        let data = DataConfig {
            bins_path: Some(bins),
            codes_path: None,
        };
        assert_eq!(data.load_bins().unwrap().len(), 1);
        assert!(data.load_codes().unwrap().contains("BIN-003"));
    }

    #[test]
    fn test_timezone_validation() {
        assert!(is_valid_timezone("UTC"));
        assert!(is_valid_timezone("Asia/Bangkok"));
        assert!(!is_valid_timezone("Nowhere/Land"));
    }
}
