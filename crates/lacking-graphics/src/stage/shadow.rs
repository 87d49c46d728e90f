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

//! Directional shadow maps.
//!
//! Each frame the stage assigns its maps to the visible shadow casting
//! directional lights, fits an orthographic projection around the first
//! camera cascade and renders the shadow passes of every mesh inside the
//! light volume. Assignments are published through [`ShadowMaps`] for the
//! lighting stage.

use anyhow::Context;
use super::{destroy_framebuffer, destroy_texture, Stage, StageContext};
use crate::config::EngineConfig;
use crate::material::PassKind;
use crate::scene::{DirectionalLightHandle, MeshHandle, StaticMeshHandle};
use crate::ubo::write_uniform;
use crate::uniforms::CameraUniform;
use lacking_core::math::{HexahedronRegion, Mat4, Vec3, Vec4};
use lacking_core::renderer::{
    DepthTexture2DDescriptor, FramebufferDescriptor, FramebufferId, GraphicsDevice, Operations,
    RenderPassDescriptor, ResourceError, TextureId, Viewport,
};
use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};

/// A directional light's shadow map for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalShadow {
    /// Comparable depth texture.
    pub texture: TextureId,
    /// Light projection matrix.
    pub projection: Mat4,
    /// Light view matrix.
    pub view: Mat4,
    /// Camera distance the map covers.
    pub cascade_distance: f32,
}

/// Shadow maps rendered this frame, keyed by light.
#[derive(Debug, Default)]
pub struct ShadowMaps {
    directional: Vec<(DirectionalLightHandle, DirectionalShadow)>,
}

impl ShadowMaps {
    /// The shadow map of a directional light, if one was rendered.
    pub fn directional(&self, handle: DirectionalLightHandle) -> Option<DirectionalShadow> {
        self.directional
            .iter()
            .find(|(owner, _)| *owner == handle)
            .map(|(_, shadow)| *shadow)
    }

    /// Number of directional maps rendered this frame.
    pub fn directional_count(&self) -> usize {
        self.directional.len()
    }
}

#[derive(Debug, Default)]
struct ShadowMap {
    texture: Option<TextureId>,
    framebuffer: Option<FramebufferId>,
}

impl ShadowMap {
    fn allocate(
        device: &dyn GraphicsDevice,
        label: &str,
        size: u32,
    ) -> Result<Self, ResourceError> {
        let texture = device.create_depth_texture_2d(&DepthTexture2DDescriptor {
            label: Some(Cow::Borrowed(label)),
            width: size,
            height: size,
            comparable: true,
            stencil: false,
        })?;
        let framebuffer = match device.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Borrowed(label)),
            depth_attachment: Some(texture),
            ..FramebufferDescriptor::default()
        }) {
            Ok(framebuffer) => framebuffer,
            Err(err) => {
                if let Err(destroy_err) = device.destroy_texture(texture) {
                    log::warn!("Failed to release shadow map texture '{}': {}", label, destroy_err);
                }
                return Err(err);
            }
        };
        Ok(Self {
            texture: Some(texture),
            framebuffer: Some(framebuffer),
        })
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        destroy_framebuffer(device, &mut self.framebuffer);
        destroy_texture(device, &mut self.texture);
    }
}

/// Renders shadow maps for directional lights.
///
/// Spot and point lights cast no shadows, so no maps are allocated for them
/// whatever the configuration asks for.
#[derive(Debug)]
pub struct ShadowStage {
    device: Arc<dyn GraphicsDevice>,
    config: EngineConfig,
    directional_maps: Vec<ShadowMap>,
    maps: Arc<Mutex<ShadowMaps>>,
    visible_meshes: Vec<MeshHandle>,
    visible_static_meshes: Vec<StaticMeshHandle>,
}

impl ShadowStage {
    /// Creates the stage. Nothing is allocated yet.
    pub fn new(device: Arc<dyn GraphicsDevice>, config: EngineConfig) -> Self {
        Self {
            device,
            config,
            directional_maps: Vec::new(),
            maps: Arc::new(Mutex::new(ShadowMaps::default())),
            visible_meshes: Vec::new(),
            visible_static_meshes: Vec::new(),
        }
    }

    /// The per-frame assignment of maps to lights.
    pub fn shadow_maps(&self) -> Arc<Mutex<ShadowMaps>> {
        Arc::clone(&self.maps)
    }

    fn allocate_maps(&mut self) -> Result<(), ResourceError> {
        let device = self.device.as_ref();
        for index in 0..self.config.directional_shadow_map_count {
            let label = format!("Directional Shadow Map #{}", index);
            self.directional_maps.push(ShadowMap::allocate(
                device,
                &label,
                self.config.directional_shadow_map_size,
            )?);
        }
        if self.config.spot_shadow_map_count > 0 || self.config.point_shadow_map_count > 0 {
            log::debug!(
                "{} spot and {} point shadow maps requested, spot and point lights are rendered unshadowed",
                self.config.spot_shadow_map_count,
                self.config.point_shadow_map_count
            );
        }
        if self.config.directional_shadow_map_cascade_count > 1 {
            log::debug!(
                "{} cascades requested, rendering the first one only",
                self.config.directional_shadow_map_cascade_count
            );
        }
        Ok(())
    }
}

impl Stage for ShadowStage {
    fn label(&self) -> &'static str {
        "Shadow"
    }

    fn allocate(&mut self) -> anyhow::Result<()> {
        if let Err(err) = self.allocate_maps() {
            self.release();
            return Err(err).context("allocating shadow maps");
        }
        Ok(())
    }

    fn release(&mut self) {
        let device = self.device.as_ref();
        for map in self.directional_maps.iter_mut().rev() {
            map.release(device);
        }
        self.directional_maps.clear();
        self.maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .directional
            .clear();
    }

    fn pre_render(&mut self, _width: u32, _height: u32) -> anyhow::Result<()> {
        Ok(())
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) {
        let maps = Arc::clone(&self.maps);
        let mut maps = maps.lock().unwrap_or_else(PoisonError::into_inner);
        maps.directional.clear();

        let size = self.config.directional_shadow_map_size;
        let cascade_far = ctx.camera.cascade_distance(0);
        let (near, far) = (ctx.camera.near, ctx.camera.far);
        let mut next = 0;

        for &handle in ctx.visible_directional_lights {
            let Some(map) = self.directional_maps.get(next) else {
                break;
            };
            let (Some(texture), Some(framebuffer)) = (map.texture, map.framebuffer) else {
                continue;
            };
            let light = ctx.scene.directional_light(handle);
            if !light.active || !light.cast_shadow {
                continue;
            }
            let (direction, range) = (light.direction(), light.emit_range);

            let (center, radius) = cascade_sphere(
                &ctx.projection_matrix,
                &ctx.view_matrix,
                near,
                far,
                cascade_far,
            );
            let (projection, view) = light_matrices(direction, range, center, radius, size);

            let Some(placement) = write_uniform(
                ctx.uniforms,
                &CameraUniform::new(
                    projection,
                    view,
                    view.inverse(),
                    Vec4::new(0.0, 0.0, size as f32, size as f32),
                    0.0,
                    1.0,
                ),
            ) else {
                break;
            };

            let region = HexahedronRegion::from_projection_matrix(&(projection * view));
            self.visible_meshes.clear();
            self.visible_static_meshes.clear();
            ctx.scene.visible_meshes(&region, &mut self.visible_meshes);
            ctx.scene
                .visible_static_meshes(&region, &mut self.visible_static_meshes);

            let mut pass = RenderPassDescriptor::new(framebuffer, Viewport::new(0, 0, size, size));
            pass.label = Some("Shadow");
            pass.depth = Some(Operations::clear(1.0));
            ctx.commands.begin_render_pass(&pass);
            for &mesh in &self.visible_meshes {
                ctx.renderer.queue_mesh(ctx.scene.mesh(mesh), PassKind::Shadow);
            }
            for &mesh in &self.visible_static_meshes {
                ctx.renderer.queue_static_mesh(
                    ctx.scene.static_mesh(mesh),
                    ctx.camera_position,
                    PassKind::Shadow,
                );
            }
            ctx.renderer.render(ctx.commands, ctx.uniforms, placement);
            ctx.commands.end_render_pass();

            maps.directional.push((
                handle,
                DirectionalShadow {
                    texture,
                    projection,
                    view,
                    cascade_distance: cascade_far,
                },
            ));
            next += 1;
        }
    }
}

/// Bounding sphere of the camera frustum slice between `near` and
/// `cascade_far`. The radius is rounded up to 1/16 so it does not flicker as
/// the camera rotates.
pub(crate) fn cascade_sphere(
    projection: &Mat4,
    view: &Mat4,
    near: f32,
    far: f32,
    cascade_far: f32,
) -> (Vec3, f32) {
    let inverse = (*projection * *view).inverse();
    let t = ((cascade_far - near) / (far - near).max(f32::EPSILON)).clamp(0.0, 1.0);

    let mut corners = [Vec3::ZERO; 8];
    let mut index = 0;
    for y in [-1.0, 1.0] {
        for x in [-1.0, 1.0] {
            let near_corner = inverse.project_point3(Vec3::new(x, y, -1.0));
            let far_corner = inverse.project_point3(Vec3::new(x, y, 1.0));
            corners[index] = near_corner;
            corners[index + 1] = near_corner + (far_corner - near_corner) * t;
            index += 2;
        }
    }

    let center = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;
    let radius = corners
        .iter()
        .map(|corner| corner.distance(center))
        .fold(0.0, f32::max);
    (center, (radius * 16.0).ceil() / 16.0)
}

/// Orthographic projection and view of a directional light around a sphere.
/// The sphere center is snapped to shadow map texels in light space so that
/// static geometry does not shimmer while the camera moves.
pub(crate) fn light_matrices(
    direction: Vec3,
    range: f32,
    center: Vec3,
    radius: f32,
    size: u32,
) -> (Mat4, Mat4) {
    let direction = direction.normalize_or(Vec3::NEG_Z);
    let up = if direction.y.abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let rotation = Mat4::look_to_rh(Vec3::ZERO, direction, up);

    let texel = (2.0 * radius) / size.max(1) as f32;
    let local = rotation.transform_point3(center);
    let snapped = Vec3::new(
        (local.x / texel).floor() * texel,
        (local.y / texel).floor() * texel,
        local.z,
    );
    let center = rotation.inverse().transform_point3(snapped);

    let half_depth = (range / 2.0).max(radius);
    let eye = center - direction * half_depth;
    let view = Mat4::look_to_rh(eye, direction, up);
    let projection =
        Mat4::orthographic_rh_gl(-radius, radius, -radius, radius, 0.0, 2.0 * half_depth);
    (projection, view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lacking_core::renderer::mock::MockDevice;

    #[test]
    fn cascade_sphere_encloses_the_frustum_slice() {
        let projection = Mat4::perspective_rh_gl(1.0, 1.0, 0.5, 100.0);
        let (center, radius) = cascade_sphere(&projection, &Mat4::IDENTITY, 0.5, 100.0, 10.0);

        assert!(center.z < -0.5 && center.z > -10.0);
        let half_extent = 10.0 * 0.5f32.tan();
        let far_corner = Vec3::new(half_extent, half_extent, -10.0);
        assert!(far_corner.distance(center) <= radius + 1e-3);
        assert_relative_eq!((radius * 16.0).fract(), 0.0);
    }

    #[test]
    fn light_position_is_snapped_to_texels() {
        let direction = Vec3::new(0.3, -1.0, 0.2).normalize();
        let (radius, size) = (8.0, 256);
        let texel = 2.0 * radius / size as f32;
        let rotation = Mat4::look_to_rh(Vec3::ZERO, direction, Vec3::Y);

        let (_, view) = light_matrices(direction, 100.0, Vec3::new(1.37, 0.21, -3.9), radius, size);
        let eye = rotation.transform_point3(view.inverse().w_axis.truncate());
        for coordinate in [eye.x, eye.y] {
            let texels = coordinate / texel;
            assert!((texels - texels.round()).abs() < 1e-2, "{} is off grid", texels);
        }
    }

    #[test]
    fn only_directional_maps_are_allocated() {
        let device = Arc::new(MockDevice::new());
        let mut stage = ShadowStage::new(
            device.clone(),
            EngineConfig {
                directional_shadow_map_count: 2,
                directional_shadow_map_size: 512,
                spot_shadow_map_count: 1,
                point_shadow_map_count: 1,
                ..EngineConfig::default()
            },
        );
        stage.allocate().unwrap();
        assert_eq!(device.textures_labelled("Directional Shadow Map #1").len(), 1);
        // Texture plus framebuffer per directional map, nothing for spot or point lights.
        assert_eq!(device.live_resource_count(), 4);

        stage.release();
        assert_eq!(device.live_resource_count(), 0);
    }
}
