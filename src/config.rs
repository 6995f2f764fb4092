//! Pipeline configuration.
//!
//! Every field has a default, so an empty or partial TOML file is valid.
//! Lookup order: explicit path, then `<config_dir>/hubdist/config.toml`,
//! then the built-in defaults.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Requests per minute the routing provider tolerates before throttling us.
pub const PROVIDER_RPM_CEILING: u32 = 40;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub provider: ProviderConfig,
    pub limits: LimitsConfig,
    pub estimate: EstimateConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub municipalities: PathBuf,
    pub hubs: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            municipalities: PathBuf::from("data/municipalities.json"),
            hubs: PathBuf::from("data/cities.json"),
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingBackend {
    Google,
    Osrm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub geocoder_url: String,
    pub routing: RoutingBackend,
    pub routing_url: String,
    pub osrm_url: String,
    /// Language hint passed to both providers.
    pub language: String,
    /// Appended to every text-search query.
    pub country: String,
    /// Word placed before the district name, e.g. "okres Zvolen".
    pub district_label: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            geocoder_url: "https://maps.googleapis.com/maps/api".into(),
            routing: RoutingBackend::Google,
            routing_url: "https://maps.googleapis.com/maps/api".into(),
            osrm_url: "https://router.project-osrm.org".into(),
            language: "sk".into(),
            country: "Slovensko".into(),
            district_label: "okres".into(),
            timeout_secs: 15,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub min_interval_ms: u64,
    /// When set, overrides `min_interval_ms`.
    pub requests_per_minute: Option<u32>,
    pub checkpoint_interval: usize,
    pub candidates: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1715,
            requests_per_minute: None,
            checkpoint_interval: 50,
            candidates: 10,
        }
    }
}

impl LimitsConfig {
    pub fn min_interval(&self) -> Duration {
        match self.requests_per_minute {
            Some(rpm) if rpm > 0 => Duration::from_millis(60_000_u64.div_ceil(u64::from(rpm))),
            _ => Duration::from_millis(self.min_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateConfig {
    pub correction_factor: f64,
    pub minutes_per_km: f64,
}

impl Default for EstimateConfig {
    fn default() -> Self {
        Self {
            correction_factor: 2.0,
            minutes_per_km: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub threshold_percent: f64,
    pub threshold_km: f64,
    pub moderate_percent: f64,
    pub large_percent: f64,
    pub extreme_percent: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 20.0,
            threshold_km: 5.0,
            moderate_percent: 30.0,
            large_percent: 50.0,
            extreme_percent: 100.0,
        }
    }
}

impl PipelineConfig {
    /// Load from an explicit path, the per-user config file, or defaults.
    /// `GOOGLE_API_KEY` from the environment overrides any key in the file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::read_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::read_file(&path)?,
                None => Self::default(),
            },
        };

        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if !key.trim().is_empty() {
                config.provider.api_key = Some(key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    fn read_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hubdist").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.checkpoint_interval == 0 {
            return Err(config_err("limits.checkpoint_interval must be at least 1"));
        }
        if limits.candidates == 0 {
            return Err(config_err("limits.candidates must be at least 1"));
        }
        if let Some(rpm) = limits.requests_per_minute {
            if rpm == 0 || rpm >= PROVIDER_RPM_CEILING {
                return Err(config_err(&format!(
                    "limits.requests_per_minute must be between 1 and {}",
                    PROVIDER_RPM_CEILING - 1
                )));
            }
        }

        let est = &self.estimate;
        if est.correction_factor <= 0.0 || est.minutes_per_km <= 0.0 {
            return Err(config_err("estimate factors must be positive"));
        }

        let v = &self.verification;
        if v.threshold_percent < 0.0 || v.threshold_km < 0.0 {
            return Err(config_err("verification thresholds must not be negative"));
        }
        if !(v.moderate_percent < v.large_percent && v.large_percent < v.extreme_percent) {
            return Err(config_err(
                "verification bands must increase: moderate < large < extreme",
            ));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.provider.api_key.as_deref()
    }
}

fn config_err(msg: &str) -> PipelineError {
    PipelineError::Config(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.limits.candidates, 10);
        assert_eq!(config.limits.checkpoint_interval, 50);
        assert_eq!(config.provider.routing, RoutingBackend::Google);
        assert!((config.estimate.correction_factor - 2.0).abs() < 1e-12);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = PipelineConfig::from_toml(
            r#"
            [provider]
            routing = "osrm"
            country = "Česko"

            [estimate]
            correction_factor = 1.6
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.routing, RoutingBackend::Osrm);
        assert_eq!(config.provider.country, "Česko");
        assert_eq!(config.provider.language, "sk");
        assert!((config.estimate.correction_factor - 1.6).abs() < 1e-12);
        assert!((config.estimate.minutes_per_km - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_rpm_overrides_interval() {
        let limits = LimitsConfig {
            requests_per_minute: Some(30),
            ..LimitsConfig::default()
        };
        assert_eq!(limits.min_interval(), Duration::from_millis(2000));
        assert_eq!(LimitsConfig::default().min_interval(), Duration::from_millis(1715));
    }

    #[test]
    fn test_rpm_ceiling_rejected() {
        let mut config = PipelineConfig::default();
        config.limits.requests_per_minute = Some(40);
        assert!(config.validate().is_err());
        config.limits.requests_per_minute = Some(39);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bands_must_increase() {
        let mut config = PipelineConfig::default();
        config.verification.large_percent = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[limits]\ncandidates = 4\n").unwrap();
        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.limits.candidates, 4);
    }

    #[test]
    fn test_example_file_parses() {
        let config = PipelineConfig::from_toml(include_str!("../hubdist.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.limits.min_interval(), Duration::from_millis(1715));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(PipelineConfig::load(Some(&path)).is_err());
    }
}
