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

//! Stage construction.

use super::{
    BloomStage, BloomStageInput, DepthSourceStage, ExposureProbeStage, ExposureProbeStageInput,
    ForwardSourceStage, ForwardStage, ForwardStageInput, GeometrySourceStage, GeometryStage,
    GeometryStageInput, LightingStage, LightingStageInput, ShadowStage, Stage, ToneMappingStage,
    ToneMappingStageInput,
};
use crate::config::EngineConfig;
use crate::shader::ShaderCollection;
use crate::shape::ShapeSet;
use lacking_core::renderer::GraphicsDevice;
use std::sync::Arc;

/// Builds the ordered list of stages a frame runs through.
pub type StageBuilder = Arc<dyn Fn(&StageProvider) -> Vec<Box<dyn Stage>> + Send + Sync>;

/// Hands out the stock stages, wired to the engine's device, shaders and
/// shapes. Custom [`StageBuilder`]s use it to mix stock and own stages.
#[derive(Clone)]
pub struct StageProvider {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    shapes: Arc<ShapeSet>,
    config: EngineConfig,
}

impl StageProvider {
    pub(crate) fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        shapes: Arc<ShapeSet>,
        config: EngineConfig,
    ) -> Self {
        Self {
            device,
            shaders,
            shapes,
            config,
        }
    }

    /// The device stages allocate from.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// The host's programs.
    pub fn shaders(&self) -> &Arc<dyn ShaderCollection> {
        &self.shaders
    }

    /// Shared primitive shapes.
    pub fn shapes(&self) -> &Arc<ShapeSet> {
        &self.shapes
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The depth-stencil source.
    pub fn create_depth_source_stage(&self) -> DepthSourceStage {
        DepthSourceStage::new(Arc::clone(&self.device))
    }

    /// The G-buffer source.
    pub fn create_geometry_source_stage(&self) -> GeometrySourceStage {
        GeometrySourceStage::new(Arc::clone(&self.device))
    }

    /// The HDR target source.
    pub fn create_forward_source_stage(&self) -> ForwardSourceStage {
        ForwardSourceStage::new(Arc::clone(&self.device))
    }

    /// The directional shadow stage.
    pub fn create_shadow_stage(&self) -> ShadowStage {
        ShadowStage::new(Arc::clone(&self.device), self.config.clone())
    }

    /// The G-buffer stage.
    pub fn create_geometry_stage(&self, input: GeometryStageInput) -> GeometryStage {
        GeometryStage::new(Arc::clone(&self.device), input)
    }

    /// The deferred lighting stage.
    pub fn create_lighting_stage(&self, input: LightingStageInput) -> LightingStage {
        LightingStage::new(
            Arc::clone(&self.device),
            Arc::clone(&self.shaders),
            Arc::clone(&self.shapes),
            input,
        )
    }

    /// The sky, debug line and forward stage.
    pub fn create_forward_stage(&self, input: ForwardStageInput) -> ForwardStage {
        ForwardStage::new(
            Arc::clone(&self.device),
            Arc::clone(&self.shaders),
            Arc::clone(&self.shapes),
            input,
            self.config.debug_lines_enabled,
        )
    }

    /// The automatic exposure probe.
    pub fn create_exposure_probe_stage(&self, input: ExposureProbeStageInput) -> ExposureProbeStage {
        ExposureProbeStage::new(
            Arc::clone(&self.device),
            Arc::clone(&self.shaders),
            Arc::clone(&self.shapes),
            input,
            self.config.exposure_format.map(Into::into),
        )
    }

    /// The bloom stage, blurring as configured.
    pub fn create_bloom_stage(&self, input: BloomStageInput) -> BloomStage {
        BloomStage::new(
            Arc::clone(&self.device),
            Arc::clone(&self.shaders),
            Arc::clone(&self.shapes),
            input,
            self.config.bloom.blur_iterations,
        )
    }

    /// The final tone mapping stage.
    pub fn create_tone_mapping_stage(&self, input: ToneMappingStageInput) -> ToneMappingStage {
        ToneMappingStage::new(
            Arc::clone(&self.device),
            Arc::clone(&self.shaders),
            Arc::clone(&self.shapes),
            input,
            self.config.tone_mapping,
        )
    }
}

/// The stock deferred frame: depth, G-buffer and HDR sources, shadows,
/// geometry, lighting, forward, exposure probe, bloom (when enabled) and
/// tone mapping.
pub fn default_stage_builder(provider: &StageProvider) -> Vec<Box<dyn Stage>> {
    let depth_source = provider.create_depth_source_stage();
    let geometry_source = provider.create_geometry_source_stage();
    let forward_source = provider.create_forward_source_stage();
    let shadow = provider.create_shadow_stage();

    let depth = depth_source.depth_texture();
    let albedo_metallic = geometry_source.albedo_metallic_texture();
    let normal_roughness = geometry_source.normal_roughness_texture();
    let hdr = forward_source.hdr_texture();

    let geometry = provider.create_geometry_stage(GeometryStageInput {
        albedo_metallic: albedo_metallic.clone(),
        normal_roughness: normal_roughness.clone(),
        depth: depth.clone(),
    });
    let lighting = provider.create_lighting_stage(LightingStageInput {
        albedo_metallic,
        normal_roughness,
        depth: depth.clone(),
        hdr: hdr.clone(),
        shadow_maps: shadow.shadow_maps(),
    });
    let forward = provider.create_forward_stage(ForwardStageInput {
        hdr: hdr.clone(),
        depth,
    });
    let exposure = provider.create_exposure_probe_stage(ExposureProbeStageInput { hdr: hdr.clone() });

    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(depth_source),
        Box::new(geometry_source),
        Box::new(forward_source),
        Box::new(shadow),
        Box::new(geometry),
        Box::new(lighting),
        Box::new(forward),
        Box::new(exposure),
    ];

    let bloom = if provider.config().bloom.enabled {
        let bloom = provider.create_bloom_stage(BloomStageInput { hdr: hdr.clone() });
        let texture = bloom.bloom_texture();
        stages.push(Box::new(bloom));
        Some(texture)
    } else {
        None
    };
    stages.push(Box::new(provider.create_tone_mapping_stage(
        ToneMappingStageInput { hdr, bloom },
    )));
    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BloomConfig;
    use crate::testing::StubShaders;
    use lacking_core::renderer::mock::MockDevice;

    fn provider(config: EngineConfig) -> StageProvider {
        let device = Arc::new(MockDevice::new());
        let shapes = Arc::new(ShapeSet::new(device.as_ref()).unwrap());
        StageProvider::new(device, Arc::new(StubShaders), shapes, config)
    }

    fn labels(stages: &[Box<dyn Stage>]) -> Vec<&'static str> {
        stages.iter().map(|stage| stage.label()).collect()
    }

    #[test]
    fn default_frame_order() {
        let stages = default_stage_builder(&provider(EngineConfig::default()));
        assert_eq!(
            labels(&stages),
            [
                "Depth Source",
                "Geometry Source",
                "Forward Source",
                "Shadow",
                "Geometry",
                "Lighting",
                "Forward",
                "Exposure Probe",
                "Bloom",
                "Tone Mapping",
            ]
        );
    }

    #[test]
    fn disabled_bloom_is_left_out() {
        let config = EngineConfig {
            bloom: BloomConfig {
                enabled: false,
                ..BloomConfig::default()
            },
            ..EngineConfig::default()
        };
        let stages = default_stage_builder(&provider(config));
        assert_eq!(stages.len(), 9);
        assert!(!labels(&stages).contains(&"Bloom"));
    }
}
