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

//! Light sources. Lights are plain data owned by a [`Scene`](crate::scene::Scene).

use crate::scene::Spatial;
use lacking_core::math::{Mat4, Vec3, FRAC_PI_4};
use lacking_core::renderer::TextureId;

/// Image based ambient lighting inside a sphere of influence.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    /// Center of the influence sphere.
    pub position: Vec3,
    /// Radius of full influence.
    pub inner_radius: f32,
    /// Radius beyond which the light has no effect.
    pub outer_radius: f32,
    /// Cube texture sampled for reflections.
    pub reflection_texture: Option<TextureId>,
    /// Cube texture sampled for refractions.
    pub refraction_texture: Option<TextureId>,
    /// Whether the light is drawn.
    pub active: bool,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            inner_radius: 25.0,
            outer_radius: 25.0,
            reflection_texture: None,
            refraction_texture: None,
            active: true,
        }
    }
}

impl Spatial for AmbientLight {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.position, self.outer_radius)
    }
}

/// An omnidirectional light with a limited range.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    /// World position.
    pub position: Vec3,
    /// Emitted color, intensity premultiplied.
    pub emit_color: Vec3,
    /// Distance at which the light fades out.
    pub emit_distance: f32,
    /// Whether the light is drawn.
    pub active: bool,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            emit_color: Vec3::ONE,
            emit_distance: 10.0,
            active: true,
        }
    }
}

impl Spatial for PointLight {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.position, self.emit_distance)
    }
}

/// A cone light pointing down its local -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    /// Light to world transform.
    pub matrix: Mat4,
    /// Emitted color, intensity premultiplied.
    pub emit_color: Vec3,
    /// Distance at which the light fades out.
    pub emit_distance: f32,
    /// Half angle of the outer cone, in radians.
    pub emit_angle_outer: f32,
    /// Half angle of the fully lit inner cone, in radians.
    pub emit_angle_inner: f32,
    /// Whether the light is drawn.
    pub active: bool,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            emit_color: Vec3::ONE,
            emit_distance: 10.0,
            emit_angle_outer: FRAC_PI_4,
            emit_angle_inner: FRAC_PI_4 * 0.75,
            active: true,
        }
    }
}

impl SpotLight {
    /// Transform of the unit cone volume covering the lit region.
    pub fn volume_matrix(&self) -> Mat4 {
        let radius = self.emit_distance * self.emit_angle_outer.tan();
        self.matrix * Mat4::from_scale(Vec3::new(radius, radius, self.emit_distance))
    }
}

impl Spatial for SpotLight {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.matrix.w_axis.truncate(), self.emit_distance)
    }
}

/// A light at infinity shining down its local -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Light to world transform. Only the rotation affects shading; the
    /// translation centers the region of influence.
    pub matrix: Mat4,
    /// Emitted color, intensity premultiplied.
    pub emit_color: Vec3,
    /// Radius of the region of influence.
    pub emit_range: f32,
    /// Whether the light renders a shadow map.
    pub cast_shadow: bool,
    /// Whether the light is drawn.
    pub active: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            emit_color: Vec3::ONE,
            emit_range: 16000.0,
            cast_shadow: false,
            active: true,
        }
    }
}

impl DirectionalLight {
    /// Unit direction the light travels in.
    pub fn direction(&self) -> Vec3 {
        (-self.matrix.z_axis.truncate()).normalize_or_zero()
    }
}

impl Spatial for DirectionalLight {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        (self.matrix.w_axis.truncate(), self.emit_range)
    }
}
