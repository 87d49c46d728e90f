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

//! Automatic exposure.
//!
//! The HDR target is reduced to a single texel which is copied into a pixel
//! transfer buffer. A fence armed after submission tells a later frame when
//! the copy can be read; until then the camera keeps converging towards the
//! previous measurement. Measurements therefore lag a few frames behind, but
//! the frame never waits for the GPU.

use anyhow::Context;
use super::{
    create_sampler, destroy_framebuffer, destroy_sampler, destroy_texture, PassPipeline,
    PassPipelineInfo, Stage, StageContext, StageTextureParameter,
};
use crate::constants::texture_slot;
use crate::shader::ShaderCollection;
use crate::shape::ShapeSet;
use half::f16;
use lacking_core::math::{clamp, lerp, TAU};
use lacking_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, ColorTexture2DDescriptor, CopyFramebufferToBufferInfo,
    CullMode, DataFormat, FenceId, FenceStatus, FilterMode, FramebufferDescriptor, FramebufferId,
    GraphicsDevice, Operations, RenderPassDescriptor, ResourceError, SamplerId, TextureBinding,
    TextureId, Viewport,
};
use std::borrow::Cow;
use std::sync::Arc;

const MIN_LUMINANCE: f32 = 0.001;
const MAX_LUMINANCE: f32 = 1000.0;

/// Inputs of the exposure probe.
#[derive(Clone)]
pub struct ExposureProbeStageInput {
    /// HDR image to measure.
    pub hdr: StageTextureParameter,
}

/// Progress of the asynchronous measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureState {
    /// No measurement in flight.
    Idle,
    /// A measurement was recorded this frame and waits for submission.
    RenderingMeasure,
    /// The measurement was submitted; the fence signals its completion.
    AwaitingFence(FenceId),
}

/// Measures the average scene luminance and drives the camera exposure.
pub struct ExposureProbeStage {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    shapes: Arc<ShapeSet>,
    input: ExposureProbeStageInput,
    format: DataFormat,
    texture: Option<TextureId>,
    framebuffer: Option<FramebufferId>,
    buffer: Option<BufferId>,
    sampler: Option<SamplerId>,
    pipeline: PassPipeline,
    state: ExposureState,
    target: Option<f32>,
}

impl ExposureProbeStage {
    /// Creates the stage. `format` overrides the device's preferred probe
    /// format.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        shapes: Arc<ShapeSet>,
        input: ExposureProbeStageInput,
        format: Option<DataFormat>,
    ) -> Self {
        let format = match format.unwrap_or(device.capabilities().exposure_format) {
            DataFormat::Unsupported => {
                log::warn!("Device has no exposure probe format, reading back RGBA32F");
                DataFormat::Rgba32F
            }
            format => format,
        };
        Self {
            device,
            shaders,
            shapes,
            input,
            format,
            texture: None,
            framebuffer: None,
            buffer: None,
            sampler: None,
            pipeline: PassPipeline::default(),
            state: ExposureState::Idle,
            target: None,
        }
    }

    /// The measurement state.
    pub fn state(&self) -> ExposureState {
        self.state
    }

    /// The exposure the camera converges towards, once measured.
    pub fn target(&self) -> Option<f32> {
        self.target
    }

    /// Format the probe texel is read back in.
    pub fn format(&self) -> DataFormat {
        self.format
    }

    fn allocate_resources(&mut self) -> Result<(), ResourceError> {
        let device = self.device.as_ref();
        let texture = device.create_color_texture_2d(&ColorTexture2DDescriptor {
            label: Some(Cow::Borrowed("Exposure Probe")),
            width: 1,
            height: 1,
            mipmapping: false,
            gamma_correction: false,
            format: self.format,
            data: None,
        })?;
        self.texture = Some(texture);
        self.framebuffer = Some(device.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Borrowed("Exposure Probe")),
            color_attachments: [Some(texture), None, None, None],
            depth_attachment: None,
        })?);
        self.buffer = Some(device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("Exposure Probe")),
            size: self.format.texel_size(),
            usage: BufferUsage::PixelTransfer,
            dynamic: true,
            data: None,
        })?);
        self.sampler = Some(create_sampler(device, "Exposure Probe", FilterMode::Linear)?);
        self.pipeline = PassPipeline::create(
            device,
            PassPipelineInfo {
                label: "Exposure Probe",
                code: self.shaders.exposure_set(),
                texture_bindings: vec![TextureBinding::new(
                    "fbColor0TextureIn",
                    texture_slot::POSTPROCESS_FB_COLOR0,
                )],
                uniform_bindings: Vec::new(),
                vertex_array: self.shapes.quad.vertex_array,
                topology: self.shapes.quad.topology,
                culling: CullMode::None,
                depth_test: false,
                blend: None,
            },
        )?;
        Ok(())
    }

    /// Consumes a completed measurement.
    fn poll(&mut self, min_exposure: f32, max_exposure: f32) {
        let ExposureState::AwaitingFence(fence) = self.state else {
            return;
        };
        match self.device.fence_status(fence) {
            FenceStatus::NotReady => return,
            FenceStatus::Success => match self.read_luminance() {
                Ok(luminance) => match exposure_target(luminance, min_exposure, max_exposure) {
                    Some(target) => self.target = Some(target),
                    None => log::warn!("Exposure probe read back {}, keeping previous target", luminance),
                },
                Err(err) => log::warn!("Failed to read exposure probe: {}", err),
            },
            FenceStatus::DeviceLost => {
                log::warn!("Exposure probe fence lost, measuring again");
            }
        }
        if let Err(err) = self.device.destroy_fence(fence) {
            log::debug!("Exposure probe fence already gone: {}", err);
        }
        self.state = ExposureState::Idle;
    }

    fn read_luminance(&self) -> Result<f32, ResourceError> {
        let buffer = self.buffer.ok_or(ResourceError::InvalidHandle)?;
        let mut texel = [0u8; 16];
        let texel = &mut texel[..self.format.texel_size() as usize];
        self.device.read_buffer(buffer, 0, texel)?;
        Ok(luminance(self.format, texel))
    }

    fn measure(&mut self, ctx: &mut StageContext<'_>) {
        let (Some(framebuffer), Some(buffer), Some(sampler), Some(pipeline)) = (
            self.framebuffer,
            self.buffer,
            self.sampler,
            self.pipeline.pipeline,
        ) else {
            return;
        };
        let Some(hdr) = (self.input.hdr)() else {
            return;
        };

        let mut pass = RenderPassDescriptor::new(framebuffer, Viewport::new(0, 0, 1, 1));
        pass.label = Some("Exposure Probe");
        pass.color_attachments[0] = Some(Operations::clear(lacking_core::math::Vec4::ZERO));
        ctx.commands.begin_render_pass(&pass);
        ctx.commands.bind_pipeline(pipeline);
        ctx.commands
            .texture_unit(texture_slot::POSTPROCESS_FB_COLOR0, hdr);
        ctx.commands
            .sampler_unit(texture_slot::POSTPROCESS_FB_COLOR0, sampler);
        ctx.commands
            .draw_indexed(0, self.shapes.quad.index_count, 1);
        ctx.commands
            .copy_framebuffer_to_buffer(&CopyFramebufferToBufferInfo {
                buffer,
                offset: 0,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                format: self.format,
            });
        ctx.commands.end_render_pass();
        self.state = ExposureState::RenderingMeasure;
    }
}

impl Stage for ExposureProbeStage {
    fn label(&self) -> &'static str {
        "Exposure Probe"
    }

    fn allocate(&mut self) -> anyhow::Result<()> {
        if let Err(err) = self.allocate_resources() {
            self.release();
            return Err(err).context("allocating exposure probe");
        }
        Ok(())
    }

    fn release(&mut self) {
        let device = self.device.as_ref();
        if let ExposureState::AwaitingFence(fence) = self.state {
            if let Err(err) = device.destroy_fence(fence) {
                log::warn!("Failed to release exposure probe fence: {}", err);
            }
        }
        self.state = ExposureState::Idle;
        self.pipeline.release(device);
        destroy_sampler(device, &mut self.sampler);
        if let Some(buffer) = self.buffer.take() {
            if let Err(err) = device.destroy_buffer(buffer) {
                log::warn!("Failed to release exposure buffer: {}", err);
            }
        }
        destroy_framebuffer(device, &mut self.framebuffer);
        destroy_texture(device, &mut self.texture);
    }

    fn pre_render(&mut self, _width: u32, _height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) {
        if !ctx.camera.auto_exposure {
            return;
        }
        self.poll(ctx.camera.min_exposure, ctx.camera.max_exposure);

        if let Some(target) = self.target {
            let alpha = clamp(
                ctx.camera.auto_exposure_speed * ctx.delta.as_secs_f32(),
                0.0,
                1.0,
            );
            ctx.camera.exposure = lerp(ctx.camera.exposure, target, alpha);
        }

        if self.state == ExposureState::Idle {
            self.measure(ctx);
        }
    }

    fn post_render(&mut self) {
        if self.state != ExposureState::RenderingMeasure {
            return;
        }
        self.state = match self.device.create_fence() {
            Ok(fence) => ExposureState::AwaitingFence(fence),
            Err(err) => {
                log::warn!("Failed to arm exposure fence: {}", err);
                ExposureState::Idle
            }
        };
    }
}

/// Relative luminance of the first texel in `bytes`.
pub(crate) fn luminance(format: DataFormat, bytes: &[u8]) -> f32 {
    let channel = |index: usize| -> f32 {
        match format {
            DataFormat::Rgba8 => bytes[index] as f32 / 255.0,
            DataFormat::Rgba16F => {
                f16::from_le_bytes([bytes[index * 2], bytes[index * 2 + 1]]).to_f32()
            }
            DataFormat::Rgba32F | DataFormat::Unsupported => {
                let start = index * 4;
                f32::from_le_bytes([
                    bytes[start],
                    bytes[start + 1],
                    bytes[start + 2],
                    bytes[start + 3],
                ])
            }
        }
    };
    0.2126 * channel(0) + 0.7152 * channel(1) + 0.0722 * channel(2)
}

/// Exposure that maps `luminance` to middle grey, or `None` for a NaN sample.
pub(crate) fn exposure_target(luminance: f32, min_exposure: f32, max_exposure: f32) -> Option<f32> {
    if luminance.is_nan() {
        return None;
    }
    let luminance = clamp(luminance, MIN_LUMINANCE, MAX_LUMINANCE);
    Some(clamp(1.0 / (TAU * luminance), min_exposure, max_exposure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn decodes_half_float_texels() {
        let one = f16::from_f32(1.0).to_le_bytes();
        let texel = [one[0], one[1], one[0], one[1], one[0], one[1], one[0], one[1]];
        assert_relative_eq!(luminance(DataFormat::Rgba16F, &texel), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn decodes_float_texels() {
        let mut texel = Vec::new();
        for value in [0.0f32, 2.0, 0.0, 1.0] {
            texel.extend_from_slice(&value.to_le_bytes());
        }
        assert_relative_eq!(luminance(DataFormat::Rgba32F, &texel), 1.4304, epsilon = 1e-4);
    }

    #[test]
    fn white_maps_to_one_over_two_pi() {
        assert_relative_eq!(
            exposure_target(1.0, 0.00001, 10000.0).unwrap(),
            0.159_154_94,
            epsilon = 1e-6
        );
    }

    #[test]
    fn black_is_clamped_before_inverting() {
        assert_relative_eq!(
            exposure_target(0.0, 0.00001, 10000.0).unwrap(),
            1.0 / (TAU * 0.001)
        );
        assert_relative_eq!(exposure_target(0.0, 0.00001, 100.0).unwrap(), 100.0);
    }

    #[test]
    fn nan_samples_produce_no_target() {
        assert_eq!(exposure_target(f32::NAN, 0.001, 10.0), None);
        let nan = f16::NAN.to_le_bytes();
        let texel = [nan[0], nan[1], 0, 0, 0, 0, 0, 0];
        assert_eq!(exposure_target(luminance(DataFormat::Rgba16F, &texel), 0.001, 10.0), None);
    }

    #[test]
    fn infinite_samples_hit_the_bright_limit() {
        assert_relative_eq!(
            exposure_target(f32::INFINITY, 0.00001, 10000.0).unwrap(),
            1.0 / (TAU * MAX_LUMINANCE)
        );
    }
}
