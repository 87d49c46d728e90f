// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration.

use crate::error::GraphicsError;
use lacking_core::renderer::DataFormat;
use serde::{Deserialize, Serialize};

/// The tone mapping operator applied by the final stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMappingMode {
    /// `c / (1 + c)`
    #[default]
    Reinhard,
    /// `1 - exp(-c)`
    Exponential,
}

/// Bloom settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Whether the bloom stage runs at all.
    pub enabled: bool,
    /// Number of horizontal+vertical blur pairs.
    pub blur_iterations: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blur_iterations: 2,
        }
    }
}

/// Forces the format of the exposure probe target instead of asking the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureFormat {
    /// Four 16-bit floats per pixel.
    Rgba16f,
    /// Four 32-bit floats per pixel.
    Rgba32f,
}

impl From<ExposureFormat> for DataFormat {
    fn from(format: ExposureFormat) -> Self {
        match format {
            ExposureFormat::Rgba16f => DataFormat::Rgba16F,
            ExposureFormat::Rgba32f => DataFormat::Rgba32F,
        }
    }
}

/// Options recognized by the engine and the default stage builder.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```
/// let config: lacking_graphics::EngineConfig =
///     serde_json::from_str(r#"{ "directional_shadow_map_size": 4096 }"#).unwrap();
/// assert_eq!(config.directional_shadow_map_count, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of directional lights that can cast shadows in one frame.
    pub directional_shadow_map_count: u32,
    /// Edge length of each directional shadow map, in texels.
    pub directional_shadow_map_size: u32,
    /// Number of cascades per directional shadow map.
    pub directional_shadow_map_cascade_count: u32,
    /// Number of spot lights that can cast shadows in one frame.
    pub spot_shadow_map_count: u32,
    /// Edge length of each spot shadow map, in texels.
    pub spot_shadow_map_size: u32,
    /// Number of point lights that can cast shadows in one frame.
    pub point_shadow_map_count: u32,
    /// Edge length of each point shadow cube face, in texels.
    pub point_shadow_map_size: u32,
    /// Whether the forward stage draws debug lines.
    pub debug_lines_enabled: bool,
    /// Bloom settings.
    pub bloom: BloomConfig,
    /// Tone mapping operator.
    pub tone_mapping: ToneMappingMode,
    /// Overrides the device's choice of exposure probe format.
    pub exposure_format: Option<ExposureFormat>,
    /// Capacity of the per-frame uniform block buffer, in bytes.
    pub uniform_buffer_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            directional_shadow_map_count: 1,
            directional_shadow_map_size: 2048,
            directional_shadow_map_cascade_count: 1,
            spot_shadow_map_count: 0,
            spot_shadow_map_size: 1024,
            point_shadow_map_count: 0,
            point_shadow_map_size: 1024,
            debug_lines_enabled: true,
            bloom: BloomConfig::default(),
            tone_mapping: ToneMappingMode::default(),
            exposure_format: None,
            uniform_buffer_size: 16 * 1024 * 1024,
        }
    }
}

impl EngineConfig {
    /// Checks the configuration for values the renderer cannot honour.
    ///
    /// # Errors
    /// Returns [`GraphicsError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<(), GraphicsError> {
        if self.directional_shadow_map_count > 0 && self.directional_shadow_map_size == 0 {
            return Err(GraphicsError::InvalidConfig(
                "directional shadow maps need a non-zero size".to_string(),
            ));
        }
        if self.directional_shadow_map_cascade_count == 0 {
            return Err(GraphicsError::InvalidConfig(
                "at least one shadow cascade is required".to_string(),
            ));
        }
        if self.spot_shadow_map_count > 0 && self.spot_shadow_map_size == 0 {
            return Err(GraphicsError::InvalidConfig(
                "spot shadow maps need a non-zero size".to_string(),
            ));
        }
        if self.point_shadow_map_count > 0 && self.point_shadow_map_size == 0 {
            return Err(GraphicsError::InvalidConfig(
                "point shadow maps need a non-zero size".to_string(),
            ));
        }
        if self.uniform_buffer_size < 64 * 1024 {
            return Err(GraphicsError::InvalidConfig(format!(
                "uniform buffer of {} bytes cannot hold a single model batch",
                self.uniform_buffer_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.directional_shadow_map_count, 1);
        assert_eq!(config.directional_shadow_map_size, 2048);
        assert_eq!(config.directional_shadow_map_cascade_count, 1);
        assert_eq!(config.spot_shadow_map_count, 0);
        assert_eq!(config.point_shadow_map_size, 1024);
        assert!(config.bloom.enabled);
        assert_eq!(config.bloom.blur_iterations, 2);
        assert_eq!(config.tone_mapping, ToneMappingMode::Reinhard);
        config.validate().unwrap();
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{ "tone_mapping": "exponential", "bloom": { "blur_iterations": 5 }, "exposure_format": "rgba32f" }"#,
        )
        .unwrap();
        assert_eq!(config.tone_mapping, ToneMappingMode::Exponential);
        assert_eq!(config.bloom.blur_iterations, 5);
        assert!(config.bloom.enabled);
        assert_eq!(config.exposure_format, Some(ExposureFormat::Rgba32f));
        assert_eq!(config.directional_shadow_map_size, 2048);
    }

    #[test]
    fn zero_cascades_are_rejected() {
        let config = EngineConfig {
            directional_shadow_map_cascade_count: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GraphicsError::InvalidConfig(_))
        ));
    }
}
