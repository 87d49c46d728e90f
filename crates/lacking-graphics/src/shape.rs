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

//! Canonical meshes used by full screen passes, light volumes and skies.

use crate::constants::attribute;
use lacking_core::math::{Vec3, PI, TAU};
use lacking_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, IndexFormat, ResourceError,
    Topology, VertexArrayAttribute, VertexArrayBinding, VertexArrayDescriptor, VertexArrayId,
    VertexFormat,
};
use std::borrow::Cow;

const CONE_SEGMENTS: u16 = 32;
const SPHERE_RINGS: u16 = 16;
const SPHERE_SEGMENTS: u16 = 32;

/// A position-only mesh with 16-bit indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Vertex positions.
    pub vertex_buffer: BufferId,
    /// Triangle indices.
    pub index_buffer: BufferId,
    /// Vertex array binding both buffers.
    pub vertex_array: VertexArrayId,
    /// Number of indices to draw.
    pub index_count: u32,
    /// Primitive topology.
    pub topology: Topology,
}

impl Shape {
    fn new(
        device: &dyn GraphicsDevice,
        label: &str,
        vertices: &[Vec3],
        indices: &[u16],
    ) -> Result<Self, ResourceError> {
        let vertex_data: &[u8] = bytemuck::cast_slice(vertices);
        let index_data: &[u8] = bytemuck::cast_slice(indices);
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{} Vertices", label))),
            size: vertex_data.len() as u32,
            usage: BufferUsage::Vertex,
            dynamic: false,
            data: Some(vertex_data),
        })?;
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{} Indices", label))),
            size: index_data.len() as u32,
            usage: BufferUsage::Index,
            dynamic: false,
            data: Some(index_data),
        })?;
        let vertex_array = device.create_vertex_array(&VertexArrayDescriptor {
            label: Some(Cow::Borrowed(label)),
            bindings: Cow::Owned(vec![VertexArrayBinding {
                buffer: vertex_buffer,
                stride: 12,
            }]),
            attributes: Cow::Owned(vec![VertexArrayAttribute {
                binding: 0,
                location: attribute::COORD,
                format: VertexFormat::Float32x3,
                offset: 0,
            }]),
            index_buffer: Some(index_buffer),
            index_format: IndexFormat::U16,
        })?;
        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_array,
            index_count: indices.len() as u32,
            topology: Topology::TriangleList,
        })
    }

    fn release(&self, device: &dyn GraphicsDevice) {
        let results = [
            device.destroy_vertex_array(self.vertex_array),
            device.destroy_buffer(self.index_buffer),
            device.destroy_buffer(self.vertex_buffer),
        ];
        for err in results.into_iter().filter_map(Result::err) {
            log::warn!("Failed to release shape resource: {}", err);
        }
    }
}

/// The four canonical shapes, allocated once per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeSet {
    /// A `[-1, 1]` quad in the XY plane facing +Z.
    pub quad: Shape,
    /// A `[-1, 1]` cube with outward facing triangles.
    pub cube: Shape,
    /// A unit cone with its apex at the origin opening towards -Z.
    pub cone: Shape,
    /// A unit sphere.
    pub sphere: Shape,
}

impl ShapeSet {
    /// Uploads all shapes.
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self, ResourceError> {
        let (vertices, indices) = quad();
        let quad = Shape::new(device, "Quad Shape", &vertices, &indices)?;
        let (vertices, indices) = cube();
        let cube = Shape::new(device, "Cube Shape", &vertices, &indices)?;
        let (vertices, indices) = cone();
        let cone = Shape::new(device, "Cone Shape", &vertices, &indices)?;
        let (vertices, indices) = sphere();
        let sphere = Shape::new(device, "Sphere Shape", &vertices, &indices)?;
        Ok(Self {
            quad,
            cube,
            cone,
            sphere,
        })
    }

    /// Destroys all shapes, in reverse creation order.
    pub fn release(&self, device: &dyn GraphicsDevice) {
        self.sphere.release(device);
        self.cone.release(device);
        self.cube.release(device);
        self.quad.release(device);
    }
}

fn quad() -> (Vec<Vec3>, Vec<u16>) {
    let vertices = vec![
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    (vertices, vec![0, 1, 2, 0, 2, 3])
}

fn cube() -> (Vec<Vec3>, Vec<u16>) {
    let vertices = vec![
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
    ];
    let indices = vec![
        0, 1, 2, 0, 2, 3, // front
        3, 2, 6, 3, 6, 7, // right
        7, 6, 5, 7, 5, 4, // back
        4, 5, 1, 4, 1, 0, // left
        4, 0, 3, 4, 3, 7, // top
        1, 5, 6, 1, 6, 2, // bottom
    ];
    (vertices, indices)
}

fn cone() -> (Vec<Vec3>, Vec<u16>) {
    let mut vertices = Vec::with_capacity(CONE_SEGMENTS as usize + 2);
    vertices.push(Vec3::ZERO);
    for i in 0..CONE_SEGMENTS {
        let angle = TAU * f32::from(i) / f32::from(CONE_SEGMENTS);
        vertices.push(Vec3::new(angle.cos(), angle.sin(), -1.0));
    }
    let base_center = vertices.len() as u16;
    vertices.push(Vec3::new(0.0, 0.0, -1.0));

    let mut indices = Vec::with_capacity(CONE_SEGMENTS as usize * 6);
    for i in 0..CONE_SEGMENTS {
        let current = 1 + i;
        let next = 1 + (i + 1) % CONE_SEGMENTS;
        indices.extend_from_slice(&[0, next, current]);
        indices.extend_from_slice(&[base_center, current, next]);
    }
    (vertices, indices)
}

fn sphere() -> (Vec<Vec3>, Vec<u16>) {
    let columns = SPHERE_SEGMENTS + 1;
    let mut vertices = Vec::with_capacity(((SPHERE_RINGS + 1) * columns) as usize);
    for ring in 0..=SPHERE_RINGS {
        let polar = PI * f32::from(ring) / f32::from(SPHERE_RINGS);
        for segment in 0..=SPHERE_SEGMENTS {
            let azimuth = TAU * f32::from(segment) / f32::from(SPHERE_SEGMENTS);
            vertices.push(Vec3::new(
                polar.sin() * azimuth.cos(),
                polar.cos(),
                -polar.sin() * azimuth.sin(),
            ));
        }
    }

    let mut indices = Vec::with_capacity((SPHERE_RINGS * SPHERE_SEGMENTS * 6) as usize);
    for ring in 0..SPHERE_RINGS {
        for segment in 0..SPHERE_SEGMENTS {
            let top_left = ring * columns + segment;
            let bottom_left = top_left + columns;
            indices.extend_from_slice(&[top_left, bottom_left, bottom_left + 1]);
            indices.extend_from_slice(&[top_left, bottom_left + 1, top_left + 1]);
        }
    }
    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lacking_core::renderer::mock::MockDevice;

    #[test]
    fn shapes_have_expected_index_counts() {
        let device = MockDevice::new();
        let shapes = ShapeSet::new(&device).unwrap();
        assert_eq!(shapes.quad.index_count, 6);
        assert_eq!(shapes.cube.index_count, 36);
        assert_eq!(shapes.cone.index_count, 32 * 6);
        assert_eq!(shapes.sphere.index_count, 16 * 32 * 6);

        let before = device.live_resource_count();
        shapes.release(&device);
        assert_eq!(device.live_resource_count(), before - 12);
    }

    #[test]
    fn generated_geometry_is_unit_sized() {
        let (vertices, indices) = sphere();
        assert!(vertices
            .iter()
            .all(|v| (v.length() - 1.0).abs() < 1e-5));
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));

        let (vertices, indices) = cone();
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        assert_eq!(vertices[0], Vec3::ZERO);
    }
}
