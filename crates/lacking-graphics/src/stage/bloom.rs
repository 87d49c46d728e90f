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

//! Half resolution bloom.

use anyhow::Context;
use super::{
    create_sampler, destroy_framebuffer, destroy_sampler, destroy_texture, PassPipeline,
    PassPipelineInfo, Stage, StageContext, StageTextureParameter, TextureCell,
};
use crate::constants::{texture_slot, uniform_slot};
use crate::renderer::bind_uniform;
use crate::shader::{ProgramCodeRef, ShaderCollection};
use crate::shape::ShapeSet;
use crate::ubo::{write_uniform, UniformPlacement};
use crate::uniforms::BloomBlurUniform;
use lacking_core::renderer::{
    ColorTexture2DDescriptor, CullMode, DataFormat, FilterMode, FramebufferDescriptor,
    FramebufferId, GraphicsDevice, Operations, PipelineId, RenderPassDescriptor, ResourceError,
    SamplerId, TextureBinding, TextureId, UniformBinding, Viewport,
};
use std::borrow::Cow;
use std::sync::Arc;

/// Inputs of the bloom stage.
#[derive(Clone)]
pub struct BloomStageInput {
    /// HDR image to bloom.
    pub hdr: StageTextureParameter,
}

#[derive(Debug, Default)]
struct BloomTarget {
    texture: Option<TextureId>,
    framebuffer: Option<FramebufferId>,
}

impl BloomTarget {
    fn allocate(
        device: &dyn GraphicsDevice,
        label: &'static str,
        width: u32,
        height: u32,
    ) -> Result<Self, ResourceError> {
        let texture = device.create_color_texture_2d(&ColorTexture2DDescriptor {
            label: Some(Cow::Borrowed(label)),
            width,
            height,
            mipmapping: false,
            gamma_correction: false,
            format: DataFormat::Rgba16F,
            data: None,
        })?;
        let mut target = Self {
            texture: Some(texture),
            framebuffer: None,
        };
        match device.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Borrowed(label)),
            color_attachments: [Some(texture), None, None, None],
            depth_attachment: None,
        }) {
            Ok(framebuffer) => target.framebuffer = Some(framebuffer),
            Err(err) => {
                target.release(device);
                return Err(err);
            }
        }
        Ok(target)
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        destroy_framebuffer(device, &mut self.framebuffer);
        destroy_texture(device, &mut self.texture);
    }
}

/// Downsamples the HDR image into a half resolution target and blurs it with
/// alternating horizontal and vertical passes.
pub struct BloomStage {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    shapes: Arc<ShapeSet>,
    input: BloomStageInput,
    blur_iterations: u32,
    sampler: Option<SamplerId>,
    downsample: PassPipeline,
    blur: PassPipeline,
    targets: [BloomTarget; 2],
    size: (u32, u32),
    output: TextureCell,
}

impl BloomStage {
    /// Creates the stage. `blur_iterations` horizontal and vertical pass
    /// pairs run per frame.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        shapes: Arc<ShapeSet>,
        input: BloomStageInput,
        blur_iterations: u32,
    ) -> Self {
        Self {
            device,
            shaders,
            shapes,
            input,
            blur_iterations,
            sampler: None,
            downsample: PassPipeline::default(),
            blur: PassPipeline::default(),
            targets: Default::default(),
            size: (0, 0),
            output: TextureCell::default(),
        }
    }

    /// The blurred result.
    pub fn bloom_texture(&self) -> StageTextureParameter {
        self.output.parameter()
    }

    fn pass_pipeline(
        &self,
        label: &'static str,
        code: ProgramCodeRef,
        uniform_bindings: Vec<UniformBinding>,
    ) -> Result<PassPipeline, ResourceError> {
        PassPipeline::create(
            self.device.as_ref(),
            PassPipelineInfo {
                label,
                code,
                texture_bindings: vec![TextureBinding::new(
                    "fbColor0TextureIn",
                    texture_slot::POSTPROCESS_FB_COLOR0,
                )],
                uniform_bindings,
                vertex_array: self.shapes.quad.vertex_array,
                topology: self.shapes.quad.topology,
                culling: CullMode::None,
                depth_test: false,
                blend: None,
            },
        )
    }

    fn allocate_resources(&mut self) -> Result<(), ResourceError> {
        self.sampler = Some(create_sampler(
            self.device.as_ref(),
            "Bloom",
            FilterMode::Linear,
        )?);
        self.downsample =
            self.pass_pipeline("Bloom Downsample", self.shaders.bloom_downsample_set(), Vec::new())?;
        self.blur = self.pass_pipeline(
            "Bloom Blur",
            self.shaders.bloom_blur_set(),
            vec![UniformBinding::new("Bloom", uniform_slot::POSTPROCESS)],
        )?;
        Ok(())
    }

    fn release_targets(&mut self) {
        self.output.set(None);
        for target in self.targets.iter_mut().rev() {
            target.release(self.device.as_ref());
        }
        self.size = (0, 0);
    }

    fn draw_pass(
        &self,
        ctx: &mut StageContext<'_>,
        label: &'static str,
        pipeline: PipelineId,
        target: usize,
        source: TextureId,
        uniform: Option<UniformPlacement>,
    ) {
        let (Some(framebuffer), Some(sampler)) = (self.targets[target].framebuffer, self.sampler)
        else {
            return;
        };
        let mut pass =
            RenderPassDescriptor::new(framebuffer, Viewport::new(0, 0, self.size.0, self.size.1));
        pass.label = Some(label);
        pass.color_attachments[0] = Some(Operations::discard());
        ctx.commands.begin_render_pass(&pass);
        ctx.commands.bind_pipeline(pipeline);
        if let Some(uniform) = uniform {
            bind_uniform(ctx.commands, uniform_slot::POSTPROCESS, uniform);
        }
        ctx.commands
            .texture_unit(texture_slot::POSTPROCESS_FB_COLOR0, source);
        ctx.commands
            .sampler_unit(texture_slot::POSTPROCESS_FB_COLOR0, sampler);
        ctx.commands.draw_indexed(0, self.shapes.quad.index_count, 1);
        ctx.commands.end_render_pass();
    }
}

impl Stage for BloomStage {
    fn label(&self) -> &'static str {
        "Bloom"
    }

    fn allocate(&mut self) -> anyhow::Result<()> {
        if let Err(err) = self.allocate_resources() {
            self.release();
            return Err(err).context("allocating bloom pipelines");
        }
        Ok(())
    }

    fn release(&mut self) {
        self.release_targets();
        self.blur.release(self.device.as_ref());
        self.downsample.release(self.device.as_ref());
        destroy_sampler(self.device.as_ref(), &mut self.sampler);
    }

    fn pre_render(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        let size = ((width / 2).max(1), (height / 2).max(1));
        if size == self.size {
            return Ok(());
        }
        self.release_targets();
        for (index, label) in ["Bloom Ping", "Bloom Pong"].into_iter().enumerate() {
            match BloomTarget::allocate(self.device.as_ref(), label, size.0, size.1) {
                Ok(target) => self.targets[index] = target,
                Err(err) => {
                    self.release_targets();
                    return Err(err).with_context(|| format!("allocating {}", label));
                }
            }
        }
        self.size = size;
        Ok(())
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) {
        let (Some(hdr), Some(downsample), Some(blur)) = (
            (self.input.hdr)(),
            self.downsample.pipeline,
            self.blur.pipeline,
        ) else {
            return;
        };

        self.draw_pass(ctx, "Bloom Downsample", downsample, 0, hdr, None);

        let mut front = 0;
        for pass in 0..self.blur_iterations * 2 {
            let Some(source) = self.targets[front].texture else {
                return;
            };
            let Some(placement) = write_uniform(ctx.uniforms, &BloomBlurUniform::new(pass % 2 == 0))
            else {
                break;
            };
            self.draw_pass(ctx, "Bloom Blur", blur, 1 - front, source, Some(placement));
            front = 1 - front;
        }
        self.output.set(self.targets[front].texture);
    }
}
