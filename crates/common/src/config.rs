use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for loading and viewing a map. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Hard ceiling on vertices per splat batch (indices are 16-bit).
    pub splat_vertex_ceiling: u32,
    /// Shadow-map texels per cell edge.
    pub shadow_resolution: u32,
    pub target_fps: f32,
    /// Tint multiplier for entities outside the playable area.
    pub outside_tint_factor: f32,
    /// Shadow value written outside the playable area.
    pub outside_shadow: u8,
    /// Shadow value written under entity footprints.
    pub footprint_shadow: u8,
    /// Pointer travel, in pixels, below which a drag counts as a click.
    pub click_threshold_px: f32,
    pub camera_min_distance: f32,
    pub camera_max_distance: f32,
    pub camera_default_distance: f32,
    pub field_of_view: f32,
    /// Asset completions delivered per tick.
    pub load_budget: usize,
    /// Ticks a request may stay pending before it is reported as failed. 0 disables.
    pub load_timeout_ticks: u64,
    /// Seed for stand-animation choice.
    pub animation_seed: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            splat_vertex_ceiling: 65_000,
            shadow_resolution: 4,
            target_fps: 60.0,
            outside_tint_factor: 51.0 / 255.0,
            outside_shadow: 204,
            footprint_shadow: 128,
            click_threshold_px: 4.0,
            camera_min_distance: 8.0,
            camera_max_distance: 3000.0,
            camera_default_distance: 2000.0,
            field_of_view: std::f32::consts::FRAC_PI_4,
            load_budget: 64,
            load_timeout_ticks: 600,
            animation_seed: 0x5eed,
        }
    }
}

impl ViewerConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded viewer config");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.splat_vertex_ceiling == 0 || self.splat_vertex_ceiling > u16::MAX as u32 + 1 {
            return Err(ConfigError::Invalid(format!(
                "splat_vertex_ceiling {} must be in 1..=65536",
                self.splat_vertex_ceiling
            )));
        }
        if self.shadow_resolution == 0 {
            return Err(ConfigError::Invalid("shadow_resolution must be positive".into()));
        }
        if self.target_fps <= 0.0 {
            return Err(ConfigError::Invalid("target_fps must be positive".into()));
        }
        if self.camera_min_distance > self.camera_max_distance {
            return Err(ConfigError::Invalid(
                "camera_min_distance exceeds camera_max_distance".into(),
            ));
        }
        Ok(())
    }
}
