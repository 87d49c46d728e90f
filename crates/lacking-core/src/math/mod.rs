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

//! Math types used throughout the renderer.
//!
//! Vector and matrix types are provided by `glam` and re-exported here so that
//! downstream crates never name the math backend directly. Geometric helpers
//! used for culling live in [`geometry`].
//!
//! All angular functions operate in **radians**.

pub mod geometry;

pub use glam::{Mat3, Mat4, Quat, UVec2, Vec2, Vec3, Vec4};

pub use self::geometry::{HexahedronRegion, Plane, Sphere};

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, SQRT_2, TAU};

/// `sqrt(3)`, the ratio between a cube's diagonal and its edge.
pub const SQRT_3: f32 = 1.732_050_8;

/// Clamps a value to a specified minimum and maximum range.
///
/// # Examples
///
/// ```
/// use lacking_core::math::clamp;
/// assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
/// assert_eq!(clamp(-1.0, 0.0, 1.0), 0.0);
/// ```
#[inline]
pub fn clamp<T: PartialOrd>(value: T, min_val: T, max_val: T) -> T {
    if value < min_val {
        min_val
    } else if value > max_val {
        max_val
    } else {
        value
    }
}

/// Linearly interpolates between `a` and `b`.
///
/// # Examples
///
/// ```
/// use lacking_core::math::lerp;
/// assert_eq!(lerp(0.0, 10.0, 0.25), 2.5);
/// ```
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Performs an approximate equality comparison with a custom tolerance.
#[inline]
pub fn approx_eq_eps(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

/// Rounds `value` up to the next multiple of `alignment`.
///
/// An alignment of zero leaves the value unchanged.
///
/// # Examples
///
/// ```
/// use lacking_core::math::align_up;
/// assert_eq!(align_up(20, 16), 32);
/// assert_eq!(align_up(32, 16), 32);
/// assert_eq!(align_up(7, 0), 7);
/// ```
#[inline]
pub fn align_up(value: u32, alignment: u32) -> u32 {
    if alignment == 0 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}
