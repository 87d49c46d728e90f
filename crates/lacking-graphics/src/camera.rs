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

//! The viewer.

use lacking_core::math::{Mat4, Vec3, FRAC_PI_2};
use lacking_core::renderer::Viewport;

/// How the field of view adapts to the viewport's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FovMode {
    /// The camera's own aspect ratio is used regardless of the viewport.
    Anamorphic,
    /// The vertical field of view is kept; wider viewports see more.
    #[default]
    HorizontalPlus,
    /// The horizontal field of view is kept; taller viewports see more.
    VerticalMinus,
    /// Orthographic, one world unit per pixel.
    PixelBased,
}

/// A camera placed in world space with its exposure state.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera to world transform. The camera looks down its local -Z.
    pub matrix: Mat4,
    /// Field of view in radians.
    pub fov: f32,
    /// Field of view adaptation.
    pub fov_mode: FovMode,
    /// Aspect ratio used by [`FovMode::Anamorphic`].
    pub aspect_ratio: f32,
    /// Near clipping distance.
    pub near: f32,
    /// Far clipping distance.
    pub far: f32,
    /// Far distance of each shadow cascade.
    pub cascade_distances: Vec<f32>,
    /// Current exposure multiplier.
    pub exposure: f32,
    /// Lower bound of automatic exposure.
    pub min_exposure: f32,
    /// Upper bound of automatic exposure.
    pub max_exposure: f32,
    /// Whether the exposure follows the measured scene luminance.
    pub auto_exposure: bool,
    /// Rate at which automatic exposure approaches its target, per second.
    pub auto_exposure_speed: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            fov: FRAC_PI_2,
            fov_mode: FovMode::default(),
            aspect_ratio: 1.0,
            near: 0.5,
            far: 900.0,
            cascade_distances: vec![32.0],
            exposure: 1.0,
            min_exposure: 0.00001,
            max_exposure: 10000.0,
            auto_exposure: false,
            auto_exposure_speed: 2.0,
        }
    }
}

impl Camera {
    /// World position of the camera.
    pub fn position(&self) -> Vec3 {
        self.matrix.w_axis.truncate()
    }

    /// World to camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        self.matrix.inverse()
    }

    /// Projection matrix for a viewport, OpenGL clip conventions.
    pub fn projection_matrix(&self, viewport: Viewport) -> Mat4 {
        let width = viewport.width.max(1) as f32;
        let height = viewport.height.max(1) as f32;
        let viewport_aspect = width / height;
        match self.fov_mode {
            FovMode::Anamorphic => {
                Mat4::perspective_rh_gl(self.fov, self.aspect_ratio, self.near, self.far)
            }
            FovMode::HorizontalPlus => {
                Mat4::perspective_rh_gl(self.fov, viewport_aspect, self.near, self.far)
            }
            FovMode::VerticalMinus => {
                let vertical = 2.0 * ((self.fov / 2.0).tan() / viewport_aspect).atan();
                Mat4::perspective_rh_gl(vertical, viewport_aspect, self.near, self.far)
            }
            FovMode::PixelBased => Mat4::orthographic_rh_gl(
                -width / 2.0,
                width / 2.0,
                -height / 2.0,
                height / 2.0,
                self.near,
                self.far,
            ),
        }
    }

    /// Far distance of shadow cascade `index`, clamped to the far plane.
    pub fn cascade_distance(&self, index: usize) -> f32 {
        self.cascade_distances
            .get(index)
            .copied()
            .unwrap_or(self.far)
            .min(self.far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lacking_core::math::Vec4;

    #[test]
    fn horizontal_plus_keeps_vertical_fov() {
        let camera = Camera::default();
        let square = camera.projection_matrix(Viewport::new(0, 0, 100, 100));
        let wide = camera.projection_matrix(Viewport::new(0, 0, 200, 100));
        assert_relative_eq!(square.y_axis.y, wide.y_axis.y);
        assert_relative_eq!(wide.x_axis.x, square.x_axis.x / 2.0);
    }

    #[test]
    fn vertical_minus_keeps_horizontal_fov() {
        let camera = Camera {
            fov_mode: FovMode::VerticalMinus,
            ..Camera::default()
        };
        let square = camera.projection_matrix(Viewport::new(0, 0, 100, 100));
        let tall = camera.projection_matrix(Viewport::new(0, 0, 100, 200));
        assert_relative_eq!(square.x_axis.x, tall.x_axis.x, epsilon = 1e-5);
    }

    #[test]
    fn pixel_based_maps_pixels_to_units() {
        let camera = Camera {
            fov_mode: FovMode::PixelBased,
            ..Camera::default()
        };
        let projection = camera.projection_matrix(Viewport::new(0, 0, 200, 100));
        let edge = projection * Vec4::new(100.0, 50.0, -1.0, 1.0);
        assert_relative_eq!(edge.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(edge.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn cascade_distances_are_clamped() {
        let camera = Camera {
            far: 20.0,
            ..Camera::default()
        };
        assert_eq!(camera.cascade_distance(0), 20.0);
        assert_eq!(camera.cascade_distance(3), 20.0);
    }
}
