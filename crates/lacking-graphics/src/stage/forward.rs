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

//! Sky, debug lines and forward passes over the lit HDR target.

use anyhow::Context;
use super::{
    destroy_framebuffer, PassPipeline, PassPipelineInfo, Stage, StageContext,
    StageTextureParameter,
};
use crate::constants::{attribute, texture_slot, uniform_slot, DEBUG_LINE_BUFFER_SIZE};
use crate::debug::{DebugVertex, DEBUG_VERTEX_SIZE};
use crate::material::PassKind;
use crate::renderer::bind_uniform;
use crate::shader::ShaderCollection;
use crate::shape::ShapeSet;
use crate::sky::SkySource;
use crate::ubo::write_uniform;
use crate::uniforms::SkyboxUniform;
use lacking_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, CullMode, FramebufferDescriptor, FramebufferId,
    GraphicsDevice, IndexFormat, Operations, RenderPassDescriptor, ResourceError, TextureId,
    Topology, UniformBinding, VertexArrayAttribute, VertexArrayBinding, VertexArrayDescriptor,
    VertexArrayId, VertexFormat, Viewport,
};
use std::borrow::Cow;
use std::sync::Arc;

/// Inputs of the forward stage.
#[derive(Clone)]
pub struct ForwardStageInput {
    /// HDR target, already lit.
    pub hdr: StageTextureParameter,
    /// Depth written by the geometry pass.
    pub depth: StageTextureParameter,
}

/// Dynamic line buffer split in two halves that alternate between frames, so
/// a frame never overwrites vertices the previous one may still be reading.
#[derive(Debug, Default)]
struct DebugLines {
    buffer: Option<BufferId>,
    vertex_array: Option<VertexArrayId>,
    pipeline: PassPipeline,
    half: u32,
}

impl DebugLines {
    const HALF_SIZE: u32 = DEBUG_LINE_BUFFER_SIZE / 2;
    const HALF_VERTEX_CAPACITY: usize = (Self::HALF_SIZE / DEBUG_VERTEX_SIZE) as usize;

    fn allocate(
        device: &dyn GraphicsDevice,
        shaders: &dyn ShaderCollection,
    ) -> Result<Self, ResourceError> {
        let mut lines = Self::default();
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("Debug Lines")),
            size: DEBUG_LINE_BUFFER_SIZE,
            usage: BufferUsage::Vertex,
            dynamic: true,
            data: None,
        })?;
        lines.buffer = Some(buffer);
        let vertex_array = device.create_vertex_array(&VertexArrayDescriptor {
            label: Some(Cow::Borrowed("Debug Lines")),
            bindings: Cow::Owned(vec![VertexArrayBinding {
                buffer,
                stride: DEBUG_VERTEX_SIZE,
            }]),
            attributes: Cow::Owned(vec![
                VertexArrayAttribute {
                    binding: 0,
                    location: attribute::COORD,
                    format: VertexFormat::Float32x3,
                    offset: 0,
                },
                VertexArrayAttribute {
                    binding: 0,
                    location: attribute::COLOR,
                    format: VertexFormat::Unorm8x4,
                    offset: 12,
                },
            ]),
            index_buffer: None,
            index_format: IndexFormat::U16,
        });
        let vertex_array = match vertex_array {
            Ok(vertex_array) => vertex_array,
            Err(err) => {
                lines.release(device);
                return Err(err);
            }
        };
        lines.vertex_array = Some(vertex_array);
        match PassPipeline::create(
            device,
            PassPipelineInfo {
                label: "Debug Lines",
                code: shaders.debug_set(),
                texture_bindings: Vec::new(),
                uniform_bindings: vec![UniformBinding::new("Camera", uniform_slot::CAMERA)],
                vertex_array,
                topology: Topology::LineList,
                culling: CullMode::None,
                depth_test: true,
                blend: None,
            },
        ) {
            Ok(pipeline) => lines.pipeline = pipeline,
            Err(err) => {
                lines.release(device);
                return Err(err);
            }
        }
        Ok(lines)
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        self.pipeline.release(device);
        if let Some(vertex_array) = self.vertex_array.take() {
            if let Err(err) = device.destroy_vertex_array(vertex_array) {
                log::warn!("Failed to release debug vertex array: {}", err);
            }
        }
        if let Some(buffer) = self.buffer.take() {
            if let Err(err) = device.destroy_buffer(buffer) {
                log::warn!("Failed to release debug line buffer: {}", err);
            }
        }
    }

    fn render(&mut self, device: &dyn GraphicsDevice, ctx: &mut StageContext<'_>) {
        let (Some(buffer), Some(pipeline)) = (self.buffer, self.pipeline.pipeline) else {
            return;
        };
        if ctx.debug_lines.is_empty() {
            return;
        }
        let capacity = Self::HALF_VERTEX_CAPACITY / 2;
        if ctx.debug_lines.len() > capacity {
            log::warn!(
                "Dropping {} debug lines over the per-frame limit of {}",
                ctx.debug_lines.len() - capacity,
                capacity
            );
        }
        let vertices: Vec<DebugVertex> = ctx
            .debug_lines
            .iter()
            .take(capacity)
            .flat_map(|line| line.vertices())
            .collect();

        let offset = self.half * Self::HALF_SIZE;
        if let Err(err) = device.write_buffer(buffer, offset, bytemuck::cast_slice(&vertices)) {
            log::error!("Failed to upload debug lines: {}", err);
            return;
        }
        self.half ^= 1;

        ctx.commands.bind_pipeline(pipeline);
        bind_uniform(ctx.commands, uniform_slot::CAMERA, ctx.camera_placement);
        ctx.commands
            .draw(offset / DEBUG_VERTEX_SIZE, vertices.len() as u32, 1);
    }
}

/// Draws the sky, debug lines and forward mesh passes.
pub struct ForwardStage {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    shapes: Arc<ShapeSet>,
    input: ForwardStageInput,
    debug_lines_enabled: bool,
    debug_lines: DebugLines,
    framebuffer: Option<FramebufferId>,
    attachments: Option<[TextureId; 2]>,
    size: (u32, u32),
}

impl ForwardStage {
    /// Creates the stage. Nothing is allocated yet.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        shapes: Arc<ShapeSet>,
        input: ForwardStageInput,
        debug_lines_enabled: bool,
    ) -> Self {
        Self {
            device,
            shaders,
            shapes,
            input,
            debug_lines_enabled,
            debug_lines: DebugLines::default(),
            framebuffer: None,
            attachments: None,
            size: (0, 0),
        }
    }

    fn render_sky(&self, ctx: &mut StageContext<'_>) {
        let Some(sky) = ctx.scene.active_sky() else {
            return;
        };
        let definition = Arc::clone(&sky.definition);
        let color = definition.background_color().extend(1.0);
        let cube = self.shapes.cube;

        definition.with_passes(|passes| {
            for pass in passes {
                let Some(skybox) = write_uniform(ctx.uniforms, &SkyboxUniform { color }) else {
                    return;
                };
                let material = match &pass.source {
                    SkySource::Material(material) => {
                        let uniforms = material.uniform_set();
                        if uniforms.is_empty() {
                            None
                        } else {
                            match write_uniform(ctx.uniforms, &*uniforms) {
                                Some(placement) => Some(placement),
                                None => return,
                            }
                        }
                    }
                    _ => None,
                };
                ctx.commands.bind_pipeline(pass.pipeline);
                bind_uniform(ctx.commands, uniform_slot::CAMERA, ctx.camera_placement);
                bind_uniform(ctx.commands, uniform_slot::SKYBOX, skybox);
                if let Some(placement) = material {
                    bind_uniform(ctx.commands, uniform_slot::MATERIAL, placement);
                }
                match &pass.source {
                    SkySource::Material(material) => {
                        material.texture_set().bind(ctx.commands);
                    }
                    SkySource::Texture { texture, sampler } => {
                        ctx.commands
                            .texture_unit(texture_slot::SKYBOX_ALBEDO, *texture);
                        ctx.commands
                            .sampler_unit(texture_slot::SKYBOX_ALBEDO, *sampler);
                    }
                    SkySource::Color => {}
                }
                ctx.commands.draw_indexed(0, cube.index_count, 1);
            }
        });
    }
}

impl Stage for ForwardStage {
    fn label(&self) -> &'static str {
        "Forward"
    }

    fn allocate(&mut self) -> anyhow::Result<()> {
        if self.debug_lines_enabled {
            self.debug_lines = DebugLines::allocate(self.device.as_ref(), self.shaders.as_ref())
                .context("allocating debug lines")?;
        }
        Ok(())
    }

    fn release(&mut self) {
        destroy_framebuffer(self.device.as_ref(), &mut self.framebuffer);
        self.attachments = None;
        self.debug_lines.release(self.device.as_ref());
    }

    fn pre_render(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.size = (width, height);
        let (Some(hdr), Some(depth)) = ((self.input.hdr)(), (self.input.depth)()) else {
            destroy_framebuffer(self.device.as_ref(), &mut self.framebuffer);
            anyhow::bail!("forward targets are not allocated");
        };
        if self.attachments == Some([hdr, depth]) && self.framebuffer.is_some() {
            return Ok(());
        }
        destroy_framebuffer(self.device.as_ref(), &mut self.framebuffer);
        self.framebuffer = Some(self.device.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Borrowed("Forward")),
            color_attachments: [Some(hdr), None, None, None],
            depth_attachment: Some(depth),
        })?);
        self.attachments = Some([hdr, depth]);
        Ok(())
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) {
        let Some(framebuffer) = self.framebuffer else {
            return;
        };
        let mut pass =
            RenderPassDescriptor::new(framebuffer, Viewport::new(0, 0, self.size.0, self.size.1));
        pass.label = Some("Forward");
        pass.color_attachments[0] = Some(Operations::load());
        pass.depth = Some(Operations::load());
        pass.stencil = Some(Operations::discard());
        ctx.commands.begin_render_pass(&pass);

        self.render_sky(ctx);
        let device = Arc::clone(&self.device);
        self.debug_lines.render(device.as_ref(), ctx);

        for &mesh in ctx.visible_meshes {
            ctx.renderer.queue_mesh(ctx.scene.mesh(mesh), PassKind::Forward);
        }
        for &mesh in ctx.visible_static_meshes {
            ctx.renderer.queue_static_mesh(
                ctx.scene.static_mesh(mesh),
                ctx.camera_position,
                PassKind::Forward,
            );
        }
        ctx.renderer
            .render(ctx.commands, ctx.uniforms, ctx.camera_placement);
        ctx.commands.end_render_pass();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_half_holds_sixteen_thousand_lines() {
        assert_eq!(DebugLines::HALF_SIZE, 512 * 1024);
        assert_eq!(DebugLines::HALF_VERTEX_CAPACITY / 2, 16384);
    }
}
