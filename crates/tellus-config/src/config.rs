//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Planet terrain and LOD settings.
    pub terrain: TerrainConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Planet terrain and LOD configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Fixed-point scale exponent: positions are world units × 2^scale.
    pub scale: u8,
    /// Planet radius in world units.
    pub radius: f64,
    /// Maximum terrain height above the sphere, in world units.
    pub height_max: f32,
    /// Number of subdivision levels.
    pub level_max: u8,
    /// Distance at which level 0 subdivides, as a fraction of the radius.
    /// Each deeper level halves it.
    pub subdiv_distance_factor: f64,
    /// Ratio of unsubdivide to subdivide distance per level; must exceed 1
    /// so an observer hovering between the two thresholds changes nothing.
    pub hysteresis: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            scale: 10,
            radius: 6_371_000.0,
            height_max: 8_849.0,
            level_max: 6,
            subdiv_distance_factor: 0.7,
            hysteresis: 2.0,
        }
    }
}

impl TerrainConfig {
    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level_max == 0 {
            return Err(ConfigError::Invalid("level_max must be at least 1".into()));
        }
        if self.level_max > 24 {
            return Err(ConfigError::Invalid(format!(
                "level_max {} is beyond any usable subdivision depth",
                self.level_max
            )));
        }
        if self.scale >= 40 {
            return Err(ConfigError::Invalid(format!(
                "scale {} leaves no fixed-point headroom",
                self.scale
            )));
        }
        if !(self.radius > 0.0) {
            return Err(ConfigError::Invalid("radius must be positive".into()));
        }
        if !(self.subdiv_distance_factor > 0.0) {
            return Err(ConfigError::Invalid(
                "subdiv_distance_factor must be positive".into(),
            ));
        }
        if !(self.hysteresis > 1.0) {
            return Err(ConfigError::Invalid(
                "hysteresis must exceed 1 to prevent oscillation".into(),
            ));
        }
        // The converted tables must keep strict hysteresis per level.
        let subdiv = self.subdiv_thresholds();
        let unsubdiv = self.unsubdiv_thresholds();
        for (lvl, (s, u)) in subdiv.iter().zip(&unsubdiv).enumerate() {
            if u <= s {
                return Err(ConfigError::Invalid(format!(
                    "level {lvl}: unsubdivide threshold {u} does not exceed subdivide \
                     threshold {s}; raise the radius, scale, or hysteresis"
                )));
            }
        }
        Ok(())
    }

    /// Per-level subdivide distances in fixed-point units, halving per level.
    #[must_use]
    pub fn subdiv_thresholds(&self) -> Vec<u64> {
        let fixed_one = 2f64.powi(i32::from(self.scale));
        let base = self.radius * self.subdiv_distance_factor * fixed_one;
        (0..self.level_max)
            .map(|lvl| (base / 2f64.powi(i32::from(lvl))) as u64)
            .collect()
    }

    /// Per-level unsubdivide distances: the subdivide table scaled by the
    /// hysteresis factor.
    #[must_use]
    pub fn unsubdiv_thresholds(&self) -> Vec<u64> {
        self.subdiv_thresholds()
            .into_iter()
            .map(|s| (s as f64 * self.hysteresis) as u64)
            .collect()
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (tracing `EnvFilter` syntax); empty uses the
    /// built-in default.
    pub log_level: String,
    /// Run the full rule audit after every terrain update.
    pub check_rules: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: String::new(),
            check_rules: false,
        }
    }
}

impl Config {
    /// Load configuration from a RON file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: Config = ron::from_str(&content).map_err(ConfigError::Parse)?;
        config.terrain.validate()?;
        Ok(config)
    }

    /// Save configuration to a RON file, pretty-printed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::default();
        let content =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.terrain.validate().is_ok());
    }

    #[test]
    fn test_thresholds_halve_per_level() {
        let terrain = TerrainConfig::default();
        let subdiv = terrain.subdiv_thresholds();
        assert_eq!(subdiv.len(), terrain.level_max as usize);
        for pair in subdiv.windows(2) {
            // Integer truncation may be off by one from an exact halving.
            assert!(pair[1] <= pair[0] / 2 + 1);
            assert!(pair[1] > 0);
        }
    }

    #[test]
    fn test_hysteresis_holds_per_level() {
        let terrain = TerrainConfig::default();
        let subdiv = terrain.subdiv_thresholds();
        let unsubdiv = terrain.unsubdiv_thresholds();
        for (s, u) in subdiv.iter().zip(&unsubdiv) {
            assert!(u > s);
        }
    }

    #[test]
    fn test_validation_rejects_bad_settings() {
        let mut terrain = TerrainConfig {
            level_max: 0,
            ..TerrainConfig::default()
        };
        assert!(terrain.validate().is_err());

        terrain.level_max = 4;
        terrain.hysteresis = 1.0;
        assert!(terrain.validate().is_err());

        terrain.hysteresis = 2.0;
        terrain.radius = -1.0;
        assert!(terrain.validate().is_err());
    }

    #[test]
    fn test_ron_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tellus.ron");

        let mut config = Config::default();
        config.terrain.level_max = 3;
        config.debug.check_rules = true;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let partial: Config = ron::from_str("(terrain: (level_max: 2))").unwrap();
        assert_eq!(partial.terrain.level_max, 2);
        assert_eq!(partial.terrain.scale, TerrainConfig::default().scale);
        assert_eq!(partial.debug, DebugConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(terrain: (level_max: 0))").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }
}
