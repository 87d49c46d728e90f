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

//! The per-frame stage graph.
//!
//! A frame is a linear sequence of [`Stage`]s. Stages own their framebuffers
//! and pipelines and share textures through [`StageTextureParameter`]s: late
//! bound accessors that downstream stages query every frame, so an upstream
//! reallocation propagates without rewiring.

mod bloom;
mod builder;
mod exposure;
mod forward;
mod geometry;
mod lighting;
mod shadow;
mod source;
mod tone_mapping;

pub use self::bloom::{BloomStage, BloomStageInput};
pub use self::builder::{default_stage_builder, StageBuilder, StageProvider};
pub use self::exposure::{ExposureProbeStage, ExposureProbeStageInput, ExposureState};
pub use self::forward::{ForwardStage, ForwardStageInput};
pub use self::geometry::{GeometryStage, GeometryStageInput};
pub use self::lighting::{LightingStage, LightingStageInput};
pub use self::shadow::{DirectionalShadow, ShadowMaps, ShadowStage};
pub use self::source::{DepthSourceStage, ForwardSourceStage, GeometrySourceStage};
pub use self::tone_mapping::{ToneMappingStage, ToneMappingStageInput};

use crate::camera::Camera;
use crate::debug::DebugLine;
use crate::renderer::MeshRenderer;
use crate::scene::{
    AmbientLightHandle, DirectionalLightHandle, MeshHandle, PointLightHandle, Scene,
    SpotLightHandle, StaticMeshHandle,
};
use crate::shader::ProgramCodeRef;
use crate::ubo::{UniformBlockBuffer, UniformPlacement};
use lacking_core::math::{Mat4, Vec3};
use lacking_core::renderer::{
    BlendState, ColorMask, CommandBuffer, Comparison, CullMode, FaceOrientation, FilterMode,
    FramebufferId, GraphicsDevice, PipelineDescriptor, PipelineId, ProgramDescriptor, ProgramId,
    ResourceError, SamplerDescriptor, SamplerId, TextureBinding, TextureId, Topology,
    UniformBinding, VertexArrayId, Viewport, WrapMode,
};
use lacking_core::telemetry::MetricContext;
use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A late bound texture published by an upstream stage.
pub type StageTextureParameter = Arc<dyn Fn() -> Option<TextureId> + Send + Sync>;

/// A shared slot a stage publishes one of its textures through.
#[derive(Debug, Clone, Default)]
pub struct TextureCell(Arc<Mutex<Option<TextureId>>>);

impl TextureCell {
    /// The currently published texture.
    pub fn get(&self) -> Option<TextureId> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a texture, or withdraws it.
    pub fn set(&self, texture: Option<TextureId>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = texture;
    }

    /// An accessor that downstream stages keep.
    pub fn parameter(&self) -> StageTextureParameter {
        let cell = self.clone();
        Arc::new(move || cell.get())
    }
}

/// Everything a stage may read or record into while rendering one frame.
pub struct StageContext<'a> {
    /// The rendered scene.
    pub scene: &'a mut Scene,
    /// The viewer. Exposure is updated in place.
    pub camera: &'a mut Camera,
    /// World position of the camera.
    pub camera_position: Vec3,
    /// Camera projection matrix for this frame.
    pub projection_matrix: Mat4,
    /// Camera view matrix for this frame.
    pub view_matrix: Mat4,
    /// Camera uniform block, written once per frame.
    pub camera_placement: UniformPlacement,
    /// Meshes intersecting the camera frustum.
    pub visible_meshes: &'a [MeshHandle],
    /// Static meshes intersecting the camera frustum.
    pub visible_static_meshes: &'a [StaticMeshHandle],
    /// Ambient lights intersecting the camera frustum.
    pub visible_ambient_lights: &'a [AmbientLightHandle],
    /// Point lights intersecting the camera frustum.
    pub visible_point_lights: &'a [PointLightHandle],
    /// Spot lights intersecting the camera frustum.
    pub visible_spot_lights: &'a [SpotLightHandle],
    /// Directional lights intersecting the camera frustum.
    pub visible_directional_lights: &'a [DirectionalLightHandle],
    /// Lines to overlay this frame.
    pub debug_lines: &'a [DebugLine],
    /// Output region of the final framebuffer.
    pub viewport: Viewport,
    /// The externally supplied output framebuffer.
    pub framebuffer: FramebufferId,
    /// The frame's command buffer. Stages record, never submit.
    pub commands: &'a mut dyn CommandBuffer,
    /// The frame's uniform block buffer.
    pub uniforms: &'a mut UniformBlockBuffer,
    /// Shared mesh batching queue.
    pub renderer: &'a mut MeshRenderer,
    /// Metric regions for this frame.
    pub metrics: &'a dyn MetricContext,
    /// Time since the previous frame.
    pub delta: Duration,
}

/// A step of the frame.
pub trait Stage: Send {
    /// Debug label, also used as metric region name.
    fn label(&self) -> &'static str;

    /// Creates size independent resources. Called once.
    fn allocate(&mut self) -> anyhow::Result<()>;

    /// Releases every resource, in reverse allocation order.
    fn release(&mut self);

    /// Reallocates size dependent resources when the target size or an
    /// upstream texture changed.
    fn pre_render(&mut self, width: u32, height: u32) -> anyhow::Result<()>;

    /// Records the stage's commands.
    fn render(&mut self, ctx: &mut StageContext<'_>);

    /// Runs after the frame was submitted.
    fn post_render(&mut self) {}
}

pub(crate) fn create_sampler(
    device: &dyn GraphicsDevice,
    label: &'static str,
    filter: FilterMode,
) -> Result<SamplerId, ResourceError> {
    device.create_sampler(&SamplerDescriptor {
        label: Some(Cow::Borrowed(label)),
        wrap: WrapMode::Clamp,
        filter,
        mipmaps: false,
        comparison: None,
    })
}

pub(crate) fn destroy_texture(device: &dyn GraphicsDevice, texture: &mut Option<TextureId>) {
    if let Some(texture) = texture.take() {
        if let Err(err) = device.destroy_texture(texture) {
            log::warn!("Failed to release texture: {}", err);
        }
    }
}

pub(crate) fn destroy_framebuffer(
    device: &dyn GraphicsDevice,
    framebuffer: &mut Option<FramebufferId>,
) {
    if let Some(framebuffer) = framebuffer.take() {
        if let Err(err) = device.destroy_framebuffer(framebuffer) {
            log::warn!("Failed to release framebuffer: {}", err);
        }
    }
}

pub(crate) fn destroy_sampler(device: &dyn GraphicsDevice, sampler: &mut Option<SamplerId>) {
    if let Some(sampler) = sampler.take() {
        if let Err(err) = device.destroy_sampler(sampler) {
            log::warn!("Failed to release sampler: {}", err);
        }
    }
}

pub(crate) fn destroy_pipeline(
    device: &dyn GraphicsDevice,
    pipeline: &mut Option<PipelineId>,
) {
    if let Some(pipeline) = pipeline.take() {
        if let Err(err) = device.destroy_pipeline(pipeline) {
            log::warn!("Failed to release pipeline: {}", err);
        }
    }
}

pub(crate) fn destroy_program(
    device: &dyn GraphicsDevice,
    program: &mut Option<ProgramId>,
) {
    if let Some(program) = program.take() {
        if let Err(err) = device.destroy_program(program) {
            log::warn!("Failed to release program: {}", err);
        }
    }
}

/// Fixed state of a full screen, volume or overlay pass.
pub(crate) struct PassPipelineInfo {
    pub label: &'static str,
    pub code: ProgramCodeRef,
    pub texture_bindings: Vec<TextureBinding>,
    pub uniform_bindings: Vec<UniformBinding>,
    pub vertex_array: VertexArrayId,
    pub topology: Topology,
    pub culling: CullMode,
    pub depth_test: bool,
    pub blend: Option<BlendState>,
}

/// Compiled program and pipeline of a full screen or volume pass.
#[derive(Debug, Default)]
pub(crate) struct PassPipeline {
    pub program: Option<ProgramId>,
    pub pipeline: Option<PipelineId>,
}

impl PassPipeline {
    pub fn create(
        device: &dyn GraphicsDevice,
        info: PassPipelineInfo,
    ) -> Result<Self, ResourceError> {
        let program = device.create_program(&ProgramDescriptor {
            label: Some(Cow::Borrowed(info.label)),
            code: info.code,
            texture_bindings: Cow::Owned(info.texture_bindings),
            uniform_bindings: Cow::Owned(info.uniform_bindings),
        })?;
        let pipeline = device.create_pipeline(&PipelineDescriptor {
            label: Some(Cow::Borrowed(info.label)),
            program,
            vertex_array: info.vertex_array,
            topology: info.topology,
            culling: info.culling,
            front_face: FaceOrientation::Ccw,
            depth_test: info.depth_test,
            depth_write: false,
            depth_comparison: Comparison::LessOrEqual,
            stencil_test: false,
            color_write: ColorMask::ALL,
            blend_enabled: info.blend.is_some(),
            blend: info.blend.unwrap_or_default(),
        });
        match pipeline {
            Ok(pipeline) => Ok(Self {
                program: Some(program),
                pipeline: Some(pipeline),
            }),
            Err(err) => {
                if let Err(destroy_err) = device.destroy_program(program) {
                    log::warn!("Failed to release program '{}': {}", info.label, destroy_err);
                }
                Err(err)
            }
        }
    }

    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        destroy_pipeline(device, &mut self.pipeline);
        destroy_program(device, &mut self.program);
    }
}
