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

//! Deferred lighting.
//!
//! Every visible light adds its contribution to the HDR target with additive
//! blending. Ambient and directional lights cover the screen with the quad;
//! point and spot lights rasterize their volume with front faces culled so
//! the back hemisphere still covers the affected pixels when the camera is
//! inside the volume.

use anyhow::Context;
use super::{
    create_sampler, destroy_framebuffer, destroy_sampler, destroy_texture, PassPipeline,
    PassPipelineInfo, ShadowMaps, Stage, StageContext, StageTextureParameter,
};
use crate::constants::{texture_slot, uniform_slot};
use crate::pipeline::{lighting_texture_bindings, lighting_uniform_bindings};
use crate::renderer::bind_uniform;
use crate::shader::{ProgramCodeRef, ShaderCollection};
use crate::shape::{Shape, ShapeSet};
use crate::ubo::write_uniform;
use crate::uniforms::{LightPropertiesUniform, LightUniform};
use lacking_core::math::{Mat4, Vec3, Vec4};
use lacking_core::renderer::{
    BlendState, CommandBuffer, Comparison, CullMode, DepthTexture2DDescriptor, FilterMode,
    FramebufferDescriptor, FramebufferId, GraphicsDevice, Operations, RenderPassDescriptor,
    ResourceError, SamplerDescriptor, SamplerId, TextureId, Viewport, WrapMode,
};
use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};

/// Inputs of the lighting stage.
#[derive(Clone)]
pub struct LightingStageInput {
    /// G-buffer albedo and metallic.
    pub albedo_metallic: StageTextureParameter,
    /// G-buffer normal and roughness.
    pub normal_roughness: StageTextureParameter,
    /// Scene depth.
    pub depth: StageTextureParameter,
    /// HDR target the light accumulates into.
    pub hdr: StageTextureParameter,
    /// Shadow maps rendered earlier in the frame.
    pub shadow_maps: Arc<Mutex<ShadowMaps>>,
}

#[derive(Debug, Default)]
struct LightPipelines {
    ambient: PassPipeline,
    point: PassPipeline,
    spot: PassPipeline,
    directional: PassPipeline,
}

/// Accumulates light into the HDR target.
pub struct LightingStage {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    shapes: Arc<ShapeSet>,
    input: LightingStageInput,
    pipelines: LightPipelines,
    nearest_sampler: Option<SamplerId>,
    linear_sampler: Option<SamplerId>,
    shadow_sampler: Option<SamplerId>,
    no_shadow_texture: Option<TextureId>,
    no_shadow_framebuffer: Option<FramebufferId>,
    no_shadow_cleared: bool,
    framebuffer: Option<FramebufferId>,
    hdr: Option<TextureId>,
    size: (u32, u32),
}

impl LightingStage {
    /// Creates the stage. Nothing is allocated yet.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        shapes: Arc<ShapeSet>,
        input: LightingStageInput,
    ) -> Self {
        Self {
            device,
            shaders,
            shapes,
            input,
            pipelines: LightPipelines::default(),
            nearest_sampler: None,
            linear_sampler: None,
            shadow_sampler: None,
            no_shadow_texture: None,
            no_shadow_framebuffer: None,
            no_shadow_cleared: false,
            framebuffer: None,
            hdr: None,
            size: (0, 0),
        }
    }

    fn light_pipeline(
        &self,
        label: &'static str,
        code: ProgramCodeRef,
        shape: &Shape,
        culling: CullMode,
    ) -> Result<PassPipeline, ResourceError> {
        PassPipeline::create(
            self.device.as_ref(),
            PassPipelineInfo {
                label,
                code,
                texture_bindings: lighting_texture_bindings(),
                uniform_bindings: lighting_uniform_bindings(),
                vertex_array: shape.vertex_array,
                topology: shape.topology,
                culling,
                depth_test: false,
                blend: Some(BlendState::ADDITIVE),
            },
        )
    }

    fn allocate_resources(&mut self) -> Result<(), ResourceError> {
        let device = self.device.as_ref();
        self.nearest_sampler = Some(create_sampler(device, "Lighting Nearest", FilterMode::Nearest)?);
        self.linear_sampler = Some(create_sampler(device, "Lighting Linear", FilterMode::Linear)?);
        self.shadow_sampler = Some(device.create_sampler(&SamplerDescriptor {
            label: Some(Cow::Borrowed("Lighting Shadow")),
            wrap: WrapMode::Clamp,
            filter: FilterMode::Linear,
            mipmaps: false,
            comparison: Some(Comparison::LessOrEqual),
        })?);

        let texture = device.create_depth_texture_2d(&DepthTexture2DDescriptor {
            label: Some(Cow::Borrowed("No Shadow")),
            width: 1,
            height: 1,
            comparable: true,
            stencil: false,
        })?;
        self.no_shadow_texture = Some(texture);
        self.no_shadow_framebuffer = Some(device.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Borrowed("No Shadow")),
            depth_attachment: Some(texture),
            ..FramebufferDescriptor::default()
        })?);
        self.no_shadow_cleared = false;

        let shapes = Arc::clone(&self.shapes);
        let shaders = Arc::clone(&self.shaders);
        self.pipelines.ambient = self.light_pipeline(
            "Ambient Light",
            shaders.ambient_light_set(),
            &shapes.quad,
            CullMode::None,
        )?;
        self.pipelines.point = self.light_pipeline(
            "Point Light",
            shaders.point_light_set(),
            &shapes.sphere,
            CullMode::Front,
        )?;
        self.pipelines.spot = self.light_pipeline(
            "Spot Light",
            shaders.spot_light_set(),
            &shapes.cone,
            CullMode::Front,
        )?;
        self.pipelines.directional = self.light_pipeline(
            "Directional Light",
            shaders.directional_light_set(),
            &shapes.quad,
            CullMode::None,
        )?;
        Ok(())
    }

    fn bind_geometry(&self, commands: &mut dyn CommandBuffer) {
        let Some(sampler) = self.nearest_sampler else {
            return;
        };
        let inputs = [
            (texture_slot::LIGHTING_FB_COLOR0, (self.input.albedo_metallic)()),
            (texture_slot::LIGHTING_FB_COLOR1, (self.input.normal_roughness)()),
            (texture_slot::LIGHTING_FB_DEPTH, (self.input.depth)()),
        ];
        for (slot, texture) in inputs {
            if let Some(texture) = texture {
                commands.texture_unit(slot, texture);
                commands.sampler_unit(slot, sampler);
            }
        }
    }

    fn begin_light(
        &self,
        ctx: &mut StageContext<'_>,
        pipeline: &PassPipeline,
        light: &LightUniform,
        properties: &LightPropertiesUniform,
    ) -> bool {
        let Some(pipeline) = pipeline.pipeline else {
            return false;
        };
        let (Some(light), Some(properties)) = (
            write_uniform(ctx.uniforms, light),
            write_uniform(ctx.uniforms, properties),
        ) else {
            return false;
        };
        ctx.commands.bind_pipeline(pipeline);
        self.bind_geometry(ctx.commands);
        bind_uniform(ctx.commands, uniform_slot::CAMERA, ctx.camera_placement);
        bind_uniform(ctx.commands, uniform_slot::LIGHT, light);
        bind_uniform(ctx.commands, uniform_slot::LIGHT_PROPERTIES, properties);
        true
    }

    fn draw_shape(commands: &mut dyn CommandBuffer, shape: &Shape) {
        commands.draw_indexed(0, shape.index_count, 1);
    }

    fn render_ambient_lights(&self, ctx: &mut StageContext<'_>) {
        for &handle in ctx.visible_ambient_lights {
            let light = ctx.scene.ambient_light(handle).clone();
            if !light.active {
                continue;
            }
            let uniform = LightUniform {
                model: Mat4::IDENTITY,
                ..LightUniform::default()
            };
            let properties = LightPropertiesUniform {
                color: Vec4::ONE,
                position: light.position.extend(1.0),
                range: light.outer_radius,
                inner: light.inner_radius,
                ..LightPropertiesUniform::default()
            };
            if !self.begin_light(ctx, &self.pipelines.ambient, &uniform, &properties) {
                return;
            }
            if let Some(sampler) = self.linear_sampler {
                let cubes = [
                    (texture_slot::LIGHTING_REFLECTION, light.reflection_texture),
                    (texture_slot::LIGHTING_REFRACTION, light.refraction_texture),
                ];
                for (slot, texture) in cubes {
                    if let Some(texture) = texture {
                        ctx.commands.texture_unit(slot, texture);
                        ctx.commands.sampler_unit(slot, sampler);
                    }
                }
            }
            Self::draw_shape(ctx.commands, &self.shapes.quad);
        }
    }

    fn render_point_lights(&self, ctx: &mut StageContext<'_>) {
        for &handle in ctx.visible_point_lights {
            let light = ctx.scene.point_light(handle).clone();
            if !light.active {
                continue;
            }
            let uniform = LightUniform {
                model: Mat4::from_translation(light.position)
                    * Mat4::from_scale(Vec3::splat(light.emit_distance)),
                ..LightUniform::default()
            };
            let properties = LightPropertiesUniform {
                color: light.emit_color.extend(1.0),
                position: light.position.extend(1.0),
                range: light.emit_distance,
                ..LightPropertiesUniform::default()
            };
            if !self.begin_light(ctx, &self.pipelines.point, &uniform, &properties) {
                return;
            }
            Self::draw_shape(ctx.commands, &self.shapes.sphere);
        }
    }

    fn render_spot_lights(&self, ctx: &mut StageContext<'_>) {
        for &handle in ctx.visible_spot_lights {
            let light = ctx.scene.spot_light(handle).clone();
            if !light.active {
                continue;
            }
            let uniform = LightUniform {
                model: light.volume_matrix(),
                ..LightUniform::default()
            };
            let properties = LightPropertiesUniform {
                color: light.emit_color.extend(1.0),
                position: light.matrix.w_axis,
                range: light.emit_distance,
                inner: light.emit_angle_inner,
                outer: light.emit_angle_outer,
                shadowed: 0.0,
            };
            if !self.begin_light(ctx, &self.pipelines.spot, &uniform, &properties) {
                return;
            }
            Self::draw_shape(ctx.commands, &self.shapes.cone);
        }
    }

    fn render_directional_lights(&self, ctx: &mut StageContext<'_>) {
        let (Some(no_shadow), Some(shadow_sampler)) = (self.no_shadow_texture, self.shadow_sampler)
        else {
            return;
        };
        let maps = Arc::clone(&self.input.shadow_maps);
        let maps = maps.lock().unwrap_or_else(PoisonError::into_inner);

        for &handle in ctx.visible_directional_lights {
            let light = ctx.scene.directional_light(handle).clone();
            if !light.active {
                continue;
            }
            let shadow = maps.directional(handle);
            let uniform = match shadow {
                Some(shadow) => LightUniform {
                    shadow_projection: shadow.projection,
                    shadow_view: shadow.view,
                    model: light.matrix,
                    cascade_distances: Vec4::new(shadow.cascade_distance, 0.0, 0.0, 0.0),
                },
                None => LightUniform {
                    model: light.matrix,
                    ..LightUniform::default()
                },
            };
            let properties = LightPropertiesUniform {
                color: light.emit_color.extend(1.0),
                position: light.direction().extend(0.0),
                range: light.emit_range,
                shadowed: if shadow.is_some() { 1.0 } else { 0.0 },
                ..LightPropertiesUniform::default()
            };
            if !self.begin_light(ctx, &self.pipelines.directional, &uniform, &properties) {
                return;
            }
            let texture = shadow.map_or(no_shadow, |shadow| shadow.texture);
            ctx.commands
                .texture_unit(texture_slot::SHADOW_FB_DEPTH, texture);
            ctx.commands
                .sampler_unit(texture_slot::SHADOW_FB_DEPTH, shadow_sampler);
            Self::draw_shape(ctx.commands, &self.shapes.quad);
        }
    }
}

impl Stage for LightingStage {
    fn label(&self) -> &'static str {
        "Lighting"
    }

    fn allocate(&mut self) -> anyhow::Result<()> {
        if let Err(err) = self.allocate_resources() {
            self.release();
            return Err(err).context("allocating lighting resources");
        }
        Ok(())
    }

    fn release(&mut self) {
        let device = self.device.as_ref();
        destroy_framebuffer(device, &mut self.framebuffer);
        self.hdr = None;
        self.pipelines.directional.release(device);
        self.pipelines.spot.release(device);
        self.pipelines.point.release(device);
        self.pipelines.ambient.release(device);
        destroy_framebuffer(device, &mut self.no_shadow_framebuffer);
        destroy_texture(device, &mut self.no_shadow_texture);
        destroy_sampler(device, &mut self.shadow_sampler);
        destroy_sampler(device, &mut self.linear_sampler);
        destroy_sampler(device, &mut self.nearest_sampler);
    }

    fn pre_render(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.size = (width, height);
        let Some(hdr) = (self.input.hdr)() else {
            destroy_framebuffer(self.device.as_ref(), &mut self.framebuffer);
            anyhow::bail!("lighting target is not allocated");
        };
        if self.hdr == Some(hdr) && self.framebuffer.is_some() {
            return Ok(());
        }
        destroy_framebuffer(self.device.as_ref(), &mut self.framebuffer);
        let mut color_attachments = [None; 4];
        color_attachments[0] = Some(hdr);
        self.framebuffer = Some(self.device.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Borrowed("Lighting")),
            color_attachments,
            depth_attachment: None,
        })?);
        self.hdr = Some(hdr);
        Ok(())
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) {
        let Some(framebuffer) = self.framebuffer else {
            return;
        };

        if !self.no_shadow_cleared {
            if let Some(no_shadow) = self.no_shadow_framebuffer {
                let mut pass = RenderPassDescriptor::new(no_shadow, Viewport::new(0, 0, 1, 1));
                pass.label = Some("No Shadow");
                pass.depth = Some(Operations::clear(1.0));
                ctx.commands.begin_render_pass(&pass);
                ctx.commands.end_render_pass();
                self.no_shadow_cleared = true;
            }
        }

        let mut pass =
            RenderPassDescriptor::new(framebuffer, Viewport::new(0, 0, self.size.0, self.size.1));
        pass.label = Some("Lighting");
        pass.color_attachments[0] = Some(Operations::clear(Vec4::new(0.0, 0.0, 0.0, 1.0)));
        ctx.commands.begin_render_pass(&pass);
        self.render_ambient_lights(ctx);
        self.render_point_lights(ctx);
        self.render_spot_lights(ctx);
        self.render_directional_lights(ctx);
        ctx.commands.end_render_pass();
    }
}
