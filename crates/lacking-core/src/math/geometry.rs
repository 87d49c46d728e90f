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

//! Geometric primitives used for visibility culling.
//!
//! The renderer culls with convex six-sided volumes ([`HexahedronRegion`])
//! built from a projection-view matrix, tested against bounding spheres.

use super::{Mat4, Vec3, Vec4};

/// An oriented plane in Hessian normal form: points `p` with
/// `normal · p + distance = 0` lie on the plane.
///
/// The positive half-space is the side the normal points into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// The unit normal of the plane.
    pub normal: Vec3,
    /// The signed offset of the plane from the origin along `normal`.
    pub distance: f32,
}

impl Plane {
    /// Creates a plane from a (not necessarily unit) normal and offset.
    ///
    /// The plane is normalized so that [`Plane::signed_distance`] returns
    /// world-space distances.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let length = normal.length();
        if length <= f32::EPSILON {
            return Self {
                normal: Vec3::ZERO,
                distance,
            };
        }
        Self {
            normal: normal / length,
            distance: distance / length,
        }
    }

    /// Creates a plane from the `(a, b, c, d)` coefficients of `ax + by + cz + d = 0`.
    #[inline]
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        Self::new(coefficients.truncate(), coefficients.w)
    }

    /// Returns the signed distance from `point` to the plane.
    ///
    /// Positive values lie in the half-space the normal points into.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// The center of the sphere.
    pub center: Vec3,
    /// The radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere.
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Returns `true` if `other` lies entirely within this sphere.
    #[inline]
    pub fn contains_sphere(&self, other: &Sphere) -> bool {
        self.center.distance(other.center) + other.radius <= self.radius
    }
}

/// A convex volume bounded by six inward-facing planes.
///
/// Planes are stored in the order left, right, far, bottom, top, near. Wide
/// scenes reject most items against the side and far planes, so testing those
/// first exits early more often.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexahedronRegion {
    /// The six bounding planes, normals pointing into the region.
    pub planes: [Plane; 6],
}

impl HexahedronRegion {
    /// Creates a region from six explicit planes.
    #[inline]
    pub const fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extracts the frustum planes of a projection-view matrix.
    ///
    /// Clip space is expected to span `[-1, 1]` on all three axes.
    pub fn from_projection_matrix(matrix: &Mat4) -> Self {
        let r0 = matrix.row(0);
        let r1 = matrix.row(1);
        let r2 = matrix.row(2);
        let r3 = matrix.row(3);
        Self {
            planes: [
                Plane::from_coefficients(r3 + r0), // left
                Plane::from_coefficients(r3 - r0), // right
                Plane::from_coefficients(r3 - r2), // far
                Plane::from_coefficients(r3 + r1), // bottom
                Plane::from_coefficients(r3 - r1), // top
                Plane::from_coefficients(r3 + r2), // near
            ],
        }
    }

    /// Creates an axis-aligned box region spanning `min..=max`.
    pub fn from_box(min: Vec3, max: Vec3) -> Self {
        Self {
            planes: [
                Plane::new(Vec3::X, -min.x),
                Plane::new(Vec3::NEG_X, max.x),
                Plane::new(Vec3::Z, -min.z),
                Plane::new(Vec3::Y, -min.y),
                Plane::new(Vec3::NEG_Y, max.y),
                Plane::new(Vec3::NEG_Z, max.z),
            ],
        }
    }

    /// Returns `true` if any part of the sphere reaches the positive side of
    /// every plane.
    ///
    /// Spheres tangent to a plane are considered inside.
    #[inline]
    pub fn is_sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance(center) >= -radius)
    }

    /// Returns `true` if the point lies inside or on the region boundary.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.is_sphere_visible(point, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn plane_is_normalized_on_construction() {
        let plane = Plane::new(Vec3::new(0.0, 2.0, 0.0), -4.0);
        assert_relative_eq!(plane.normal.length(), 1.0);
        assert_relative_eq!(plane.signed_distance(Vec3::new(0.0, 5.0, 0.0)), 3.0);
    }

    #[test]
    fn orthographic_frustum_contains_center_and_rejects_outside() {
        let projection = Mat4::orthographic_rh_gl(-10.0, 10.0, -10.0, 10.0, 0.1, 100.0);
        let region = HexahedronRegion::from_projection_matrix(&projection);

        assert!(region.contains_point(Vec3::new(0.0, 0.0, -50.0)));
        assert!(!region.contains_point(Vec3::new(0.0, 0.0, 50.0)));
        assert!(!region.is_sphere_visible(Vec3::new(20.0, 0.0, -50.0), 5.0));
        // Tangent to the right plane.
        assert!(region.is_sphere_visible(Vec3::new(15.0, 0.0, -50.0), 5.0));
    }

    #[test]
    fn box_region_matches_bounds() {
        let region = HexahedronRegion::from_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(region.contains_point(Vec3::ZERO));
        assert!(region.contains_point(Vec3::ONE));
        assert!(!region.contains_point(Vec3::new(1.5, 0.0, 0.0)));
    }

    #[test]
    fn sphere_containment() {
        let outer = Sphere::new(Vec3::ZERO, 10.0);
        assert!(outer.contains_sphere(&Sphere::new(Vec3::new(5.0, 0.0, 0.0), 5.0)));
        assert!(!outer.contains_sphere(&Sphere::new(Vec3::new(6.0, 0.0, 0.0), 5.0)));
    }
}
