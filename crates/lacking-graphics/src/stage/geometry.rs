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

//! Fills the G-buffer.

use super::{destroy_framebuffer, Stage, StageContext, StageTextureParameter};
use crate::material::PassKind;
use lacking_core::math::Vec4;
use lacking_core::renderer::{
    FramebufferDescriptor, FramebufferId, GraphicsDevice, Operations, RenderPassDescriptor,
    TextureId, Viewport,
};
use std::borrow::Cow;
use std::sync::Arc;

/// Textures the geometry stage renders into.
#[derive(Clone)]
pub struct GeometryStageInput {
    /// Albedo and metallic target.
    pub albedo_metallic: StageTextureParameter,
    /// Normal and roughness target.
    pub normal_roughness: StageTextureParameter,
    /// Shared depth-stencil target.
    pub depth: StageTextureParameter,
}

/// Draws the geometry passes of visible meshes into the G-buffer.
pub struct GeometryStage {
    device: Arc<dyn GraphicsDevice>,
    input: GeometryStageInput,
    framebuffer: Option<FramebufferId>,
    attachments: Option<[TextureId; 3]>,
    size: (u32, u32),
}

impl GeometryStage {
    /// Creates the stage.
    pub fn new(device: Arc<dyn GraphicsDevice>, input: GeometryStageInput) -> Self {
        Self {
            device,
            input,
            framebuffer: None,
            attachments: None,
            size: (0, 0),
        }
    }
}

impl Stage for GeometryStage {
    fn label(&self) -> &'static str {
        "Geometry"
    }

    fn allocate(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn release(&mut self) {
        destroy_framebuffer(self.device.as_ref(), &mut self.framebuffer);
        self.attachments = None;
    }

    fn pre_render(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.size = (width, height);
        let (Some(albedo), Some(normal), Some(depth)) = (
            (self.input.albedo_metallic)(),
            (self.input.normal_roughness)(),
            (self.input.depth)(),
        ) else {
            self.release();
            anyhow::bail!("geometry stage inputs are not allocated");
        };
        let attachments = [albedo, normal, depth];
        if self.attachments == Some(attachments) && self.framebuffer.is_some() {
            return Ok(());
        }

        self.release();
        self.framebuffer = Some(self.device.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Borrowed("Geometry")),
            color_attachments: [Some(albedo), Some(normal), None, None],
            depth_attachment: Some(depth),
        })?);
        self.attachments = Some(attachments);
        Ok(())
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) {
        let Some(framebuffer) = self.framebuffer else {
            return;
        };
        let background = ctx
            .scene
            .active_sky()
            .map(|sky| sky.definition.background_color().extend(1.0))
            .unwrap_or(Vec4::new(0.0, 0.0, 0.0, 1.0));

        let mut pass =
            RenderPassDescriptor::new(framebuffer, Viewport::new(0, 0, self.size.0, self.size.1));
        pass.label = Some("Geometry");
        pass.color_attachments[0] = Some(Operations::clear(background));
        pass.color_attachments[1] = Some(Operations::clear(Vec4::new(0.0, 0.0, 1.0, 0.0)));
        pass.depth = Some(Operations::clear(1.0));
        pass.stencil = Some(Operations::clear(0));
        ctx.commands.begin_render_pass(&pass);

        for &mesh in ctx.visible_meshes {
            ctx.renderer
                .queue_mesh(ctx.scene.mesh(mesh), PassKind::Geometry);
        }
        for &mesh in ctx.visible_static_meshes {
            ctx.renderer.queue_static_mesh(
                ctx.scene.static_mesh(mesh),
                ctx.camera_position,
                PassKind::Geometry,
            );
        }
        ctx.renderer
            .render(ctx.commands, ctx.uniforms, ctx.camera_placement);
        ctx.commands.end_render_pass();
    }
}
