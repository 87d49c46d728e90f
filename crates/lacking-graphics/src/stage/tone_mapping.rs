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

//! Final tone mapping into the output framebuffer.

use anyhow::Context;
use super::{
    create_sampler, destroy_sampler, PassPipeline, PassPipelineInfo, Stage, StageContext,
    StageTextureParameter,
};
use crate::config::ToneMappingMode;
use crate::constants::{texture_slot, uniform_slot};
use crate::renderer::bind_uniform;
use crate::shader::{PostprocessingConfig, ShaderCollection};
use crate::shape::ShapeSet;
use crate::ubo::write_uniform;
use crate::uniforms::PostprocessUniform;
use lacking_core::renderer::{
    CullMode, FilterMode, GraphicsDevice, LoadOp, Operations, RenderPassDescriptor, ResourceError,
    SamplerId, StoreOp, TextureBinding, UniformBinding,
};
use std::sync::Arc;

/// Inputs of the tone mapping stage.
#[derive(Clone)]
pub struct ToneMappingStageInput {
    /// HDR image.
    pub hdr: StageTextureParameter,
    /// Bloom added before tone mapping, when enabled.
    pub bloom: Option<StageTextureParameter>,
}

/// Maps the HDR image into the output framebuffer.
pub struct ToneMappingStage {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    shapes: Arc<ShapeSet>,
    input: ToneMappingStageInput,
    mode: ToneMappingMode,
    hdr_sampler: Option<SamplerId>,
    bloom_sampler: Option<SamplerId>,
    pipeline: PassPipeline,
}

impl ToneMappingStage {
    /// Creates the stage. Nothing is allocated yet.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        shapes: Arc<ShapeSet>,
        input: ToneMappingStageInput,
        mode: ToneMappingMode,
    ) -> Self {
        Self {
            device,
            shaders,
            shapes,
            input,
            mode,
            hdr_sampler: None,
            bloom_sampler: None,
            pipeline: PassPipeline::default(),
        }
    }

    fn allocate_resources(&mut self) -> Result<(), ResourceError> {
        let device = self.device.as_ref();
        self.hdr_sampler = Some(create_sampler(device, "Tone Mapping HDR", FilterMode::Nearest)?);
        self.bloom_sampler = Some(create_sampler(device, "Tone Mapping Bloom", FilterMode::Linear)?);

        let bloom = self.input.bloom.is_some();
        let mut texture_bindings = vec![TextureBinding::new(
            "fbColor0TextureIn",
            texture_slot::POSTPROCESS_FB_COLOR0,
        )];
        if bloom {
            texture_bindings.push(TextureBinding::new(
                "bloomTextureIn",
                texture_slot::POSTPROCESS_BLOOM,
            ));
        }
        self.pipeline = PassPipeline::create(
            device,
            PassPipelineInfo {
                label: "Tone Mapping",
                code: self.shaders.postprocessing_set(&PostprocessingConfig {
                    tone_mapping: self.mode,
                    bloom,
                }),
                texture_bindings,
                uniform_bindings: vec![UniformBinding::new(
                    "Postprocess",
                    uniform_slot::POSTPROCESS,
                )],
                vertex_array: self.shapes.quad.vertex_array,
                topology: self.shapes.quad.topology,
                culling: CullMode::None,
                depth_test: false,
                blend: None,
            },
        )?;
        Ok(())
    }
}

impl Stage for ToneMappingStage {
    fn label(&self) -> &'static str {
        "Tone Mapping"
    }

    fn allocate(&mut self) -> anyhow::Result<()> {
        if let Err(err) = self.allocate_resources() {
            self.release();
            return Err(err).context("allocating tone mapping");
        }
        Ok(())
    }

    fn release(&mut self) {
        self.pipeline.release(self.device.as_ref());
        destroy_sampler(self.device.as_ref(), &mut self.bloom_sampler);
        destroy_sampler(self.device.as_ref(), &mut self.hdr_sampler);
    }

    fn pre_render(&mut self, _width: u32, _height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) {
        let (Some(pipeline), Some(hdr), Some(hdr_sampler)) =
            (self.pipeline.pipeline, (self.input.hdr)(), self.hdr_sampler)
        else {
            return;
        };
        let bloom = self.input.bloom.as_ref().and_then(|bloom| bloom());
        let Some(placement) = write_uniform(
            ctx.uniforms,
            &PostprocessUniform::new(ctx.camera.exposure, bloom.is_some()),
        ) else {
            return;
        };

        let mut pass = RenderPassDescriptor::new(ctx.framebuffer, ctx.viewport);
        pass.label = Some("Tone Mapping");
        // Every pixel of the viewport is overwritten.
        pass.color_attachments[0] = Some(Operations {
            load: LoadOp::DontCare,
            store: StoreOp::Store,
        });
        ctx.commands.begin_render_pass(&pass);
        ctx.commands.bind_pipeline(pipeline);
        bind_uniform(ctx.commands, uniform_slot::POSTPROCESS, placement);
        ctx.commands
            .texture_unit(texture_slot::POSTPROCESS_FB_COLOR0, hdr);
        ctx.commands
            .sampler_unit(texture_slot::POSTPROCESS_FB_COLOR0, hdr_sampler);
        if let (Some(bloom), Some(sampler)) = (bloom, self.bloom_sampler) {
            ctx.commands.texture_unit(texture_slot::POSTPROCESS_BLOOM, bloom);
            ctx.commands
                .sampler_unit(texture_slot::POSTPROCESS_BLOOM, sampler);
        }
        ctx.commands.draw_indexed(0, self.shapes.quad.index_count, 1);
        ctx.commands.end_render_pass();
    }
}
