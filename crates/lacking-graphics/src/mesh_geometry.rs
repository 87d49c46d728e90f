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

//! Immutable, GPU resident mesh geometry and the builder that packs it.

use crate::constants::attribute;
use crate::error::{GraphicsError, Result};
use crate::shader::MeshProgramConfig;
use half::f16;
use lacking_core::math::{Vec2, Vec3, Vec4};
use lacking_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, IndexFormat, Topology,
    VertexArrayAttribute, VertexArrayBinding, VertexArrayDescriptor, VertexArrayId, VertexFormat,
};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A vertex attribute with a fixed shader location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Position.
    Coord,
    /// Normal.
    Normal,
    /// Tangent.
    Tangent,
    /// Texture coordinate.
    TexCoord,
    /// Vertex color.
    Color,
    /// Skinning weights.
    Weights,
    /// Skinning joint indices.
    Joints,
}

impl VertexAttribute {
    /// The shader location of the attribute.
    pub const fn location(&self) -> u32 {
        match self {
            VertexAttribute::Coord => attribute::COORD,
            VertexAttribute::Normal => attribute::NORMAL,
            VertexAttribute::Tangent => attribute::TANGENT,
            VertexAttribute::TexCoord => attribute::TEX_COORD,
            VertexAttribute::Color => attribute::COLOR,
            VertexAttribute::Weights => attribute::WEIGHTS,
            VertexAttribute::Joints => attribute::JOINTS,
        }
    }
}

/// Storage precision of a floating point attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeFormat {
    /// 32-bit floats.
    #[default]
    F32,
    /// 16-bit floats.
    F16,
    /// 8-bit unsigned normalized.
    U8Norm,
    /// 16-bit unsigned normalized.
    U16Norm,
}

impl AttributeFormat {
    fn vertex_format(&self, components: u32) -> Option<VertexFormat> {
        match (self, components) {
            (AttributeFormat::F32, 2) => Some(VertexFormat::Float32x2),
            (AttributeFormat::F32, 3) => Some(VertexFormat::Float32x3),
            (AttributeFormat::F32, 4) => Some(VertexFormat::Float32x4),
            (AttributeFormat::F16, 2) => Some(VertexFormat::Float16x2),
            (AttributeFormat::F16, 3) => Some(VertexFormat::Float16x3),
            (AttributeFormat::F16, 4) => Some(VertexFormat::Float16x4),
            (AttributeFormat::U8Norm, 3) => Some(VertexFormat::Unorm8x3),
            (AttributeFormat::U8Norm, 4) => Some(VertexFormat::Unorm8x4),
            (AttributeFormat::U16Norm, 2) => Some(VertexFormat::Unorm16x2),
            (AttributeFormat::U16Norm, 4) => Some(VertexFormat::Unorm16x4),
            _ => None,
        }
    }

    fn pack(&self, components: &[f32], target: &mut Vec<u8>) {
        for &value in components {
            match self {
                AttributeFormat::F32 => target.extend_from_slice(&value.to_le_bytes()),
                AttributeFormat::F16 => {
                    target.extend_from_slice(&f16::from_f32(value).to_le_bytes())
                }
                AttributeFormat::U8Norm => {
                    target.push((value.clamp(0.0, 1.0) * 255.0).round() as u8)
                }
                AttributeFormat::U16Norm => target.extend_from_slice(
                    &((value.clamp(0.0, 1.0) * 65535.0).round() as u16).to_le_bytes(),
                ),
            }
        }
    }
}

/// A named index range drawn with one topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshFragment {
    /// Debug name.
    pub name: String,
    /// Primitive topology.
    pub topology: Topology,
    /// Byte offset of the first index.
    pub index_byte_offset: u32,
    /// Number of indices.
    pub index_count: u32,
}

/// CPU side description of a mesh geometry, ready for upload.
#[derive(Debug, Clone)]
pub struct MeshGeometryInfo {
    /// Debug name.
    pub name: String,
    /// Interleaved vertex data.
    pub vertex_data: Vec<u8>,
    /// Byte distance between consecutive vertices.
    pub vertex_stride: u32,
    /// Attribute layout inside a vertex.
    pub attributes: Vec<(VertexAttribute, VertexFormat, u32)>,
    /// Packed index data.
    pub index_data: Vec<u8>,
    /// Index element format.
    pub index_format: IndexFormat,
    /// Index ranges.
    pub fragments: Vec<MeshFragment>,
    /// Radius of the bounding sphere centered at the local origin.
    pub bounding_radius: f32,
    /// Closest camera distance at which static instances are drawn.
    pub min_distance: f32,
    /// Furthest camera distance at which static instances are drawn.
    pub max_distance: f32,
    /// Last shadow cascade the geometry is drawn into.
    pub max_cascade: u32,
}

struct PendingFragment {
    name: String,
    topology: Topology,
    first_index: u32,
    index_count: u32,
}

/// Packs per-vertex attribute arrays into a [`MeshGeometryInfo`].
pub struct MeshGeometryBuilder {
    name: String,
    coords: Vec<Vec3>,
    coord_format: AttributeFormat,
    normals: Vec<Vec3>,
    normal_format: AttributeFormat,
    tangents: Vec<Vec3>,
    tangent_format: AttributeFormat,
    tex_coords: Vec<Vec2>,
    tex_coord_format: AttributeFormat,
    colors: Vec<Vec4>,
    color_format: AttributeFormat,
    weights: Vec<Vec4>,
    weight_format: AttributeFormat,
    joints: Vec<[u8; 4]>,
    indices: Vec<u32>,
    fragments: Vec<PendingFragment>,
    bounding_radius: Option<f32>,
    min_distance: f32,
    max_distance: f32,
    max_cascade: u32,
}

impl MeshGeometryBuilder {
    /// Starts an empty geometry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coords: Vec::new(),
            coord_format: AttributeFormat::F32,
            normals: Vec::new(),
            normal_format: AttributeFormat::F32,
            tangents: Vec::new(),
            tangent_format: AttributeFormat::F32,
            tex_coords: Vec::new(),
            tex_coord_format: AttributeFormat::F32,
            colors: Vec::new(),
            color_format: AttributeFormat::F32,
            weights: Vec::new(),
            weight_format: AttributeFormat::F32,
            joints: Vec::new(),
            indices: Vec::new(),
            fragments: Vec::new(),
            bounding_radius: None,
            min_distance: 0.0,
            max_distance: f32::MAX,
            max_cascade: u32::MAX,
        }
    }

    /// Sets vertex positions.
    pub fn coords(mut self, coords: Vec<Vec3>, format: AttributeFormat) -> Self {
        self.coords = coords;
        self.coord_format = format;
        self
    }

    /// Sets vertex normals.
    pub fn normals(mut self, normals: Vec<Vec3>, format: AttributeFormat) -> Self {
        self.normals = normals;
        self.normal_format = format;
        self
    }

    /// Sets vertex tangents.
    pub fn tangents(mut self, tangents: Vec<Vec3>, format: AttributeFormat) -> Self {
        self.tangents = tangents;
        self.tangent_format = format;
        self
    }

    /// Sets texture coordinates.
    pub fn tex_coords(mut self, tex_coords: Vec<Vec2>, format: AttributeFormat) -> Self {
        self.tex_coords = tex_coords;
        self.tex_coord_format = format;
        self
    }

    /// Sets vertex colors.
    pub fn colors(mut self, colors: Vec<Vec4>, format: AttributeFormat) -> Self {
        self.colors = colors;
        self.color_format = format;
        self
    }

    /// Sets skinning weights and joint indices.
    pub fn skinning(mut self, weights: Vec<Vec4>, joints: Vec<[u8; 4]>, format: AttributeFormat) -> Self {
        self.weights = weights;
        self.joints = joints;
        self.weight_format = format;
        self
    }

    /// Sets the index list shared by all fragments.
    pub fn indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    /// Adds a fragment drawing `index_count` indices starting at `first_index`.
    pub fn fragment(
        mut self,
        name: impl Into<String>,
        topology: Topology,
        first_index: u32,
        index_count: u32,
    ) -> Self {
        self.fragments.push(PendingFragment {
            name: name.into(),
            topology,
            first_index,
            index_count,
        });
        self
    }

    /// Overrides the bounding sphere radius.
    pub fn bounding_radius(mut self, radius: f32) -> Self {
        self.bounding_radius = Some(radius);
        self
    }

    /// Limits the camera distances at which static instances are drawn.
    pub fn distance_range(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    /// Limits the shadow cascades the geometry is drawn into.
    pub fn max_cascade(mut self, cascade: u32) -> Self {
        self.max_cascade = cascade;
        self
    }

    /// Interleaves the attributes and packs the indices.
    ///
    /// # Errors
    /// Fails when attribute arrays disagree in length, a format cannot hold
    /// the attribute, or a fragment or index reaches past the data.
    pub fn build(self) -> Result<MeshGeometryInfo> {
        let vertex_count = self.coords.len();
        if vertex_count == 0 {
            return Err(invalid(&self.name, "no vertex coordinates"));
        }

        let mut streams: Vec<(VertexAttribute, AttributeFormat, u32, Vec<f32>)> = Vec::new();
        let mut push_stream =
            |attribute: VertexAttribute, format: AttributeFormat, components: u32, data: Vec<f32>| {
                streams.push((attribute, format, components, data));
            };
        push_stream(
            VertexAttribute::Coord,
            self.coord_format,
            3,
            self.coords.iter().flat_map(|v| v.to_array()).collect(),
        );
        if !self.normals.is_empty() {
            push_stream(
                VertexAttribute::Normal,
                self.normal_format,
                3,
                self.normals.iter().flat_map(|v| v.to_array()).collect(),
            );
        }
        if !self.tangents.is_empty() {
            push_stream(
                VertexAttribute::Tangent,
                self.tangent_format,
                3,
                self.tangents.iter().flat_map(|v| v.to_array()).collect(),
            );
        }
        if !self.tex_coords.is_empty() {
            push_stream(
                VertexAttribute::TexCoord,
                self.tex_coord_format,
                2,
                self.tex_coords.iter().flat_map(|v| v.to_array()).collect(),
            );
        }
        if !self.colors.is_empty() {
            push_stream(
                VertexAttribute::Color,
                self.color_format,
                4,
                self.colors.iter().flat_map(|v| v.to_array()).collect(),
            );
        }
        if !self.weights.is_empty() {
            push_stream(
                VertexAttribute::Weights,
                self.weight_format,
                4,
                self.weights.iter().flat_map(|v| v.to_array()).collect(),
            );
        }

        // Resolve formats and offsets. Every attribute starts on a 4-byte boundary.
        let mut attributes = Vec::with_capacity(streams.len() + 1);
        let mut stride = 0;
        for (attribute, format, components, data) in &streams {
            if data.len() != vertex_count * *components as usize {
                return Err(invalid(
                    &self.name,
                    &format!("{:?} has a different vertex count than coords", attribute),
                ));
            }
            let vertex_format = format.vertex_format(*components).ok_or_else(|| {
                invalid(
                    &self.name,
                    &format!("{:?} cannot be stored as {:?}", attribute, format),
                )
            })?;
            attributes.push((*attribute, vertex_format, stride));
            stride = lacking_core::math::align_up(stride + vertex_format.size(), 4);
        }
        if !self.joints.is_empty() {
            if self.joints.len() != vertex_count || self.weights.len() != vertex_count {
                return Err(invalid(&self.name, "joints need one weight set per vertex"));
            }
            attributes.push((VertexAttribute::Joints, VertexFormat::Uint8x4, stride));
            stride += VertexFormat::Uint8x4.size();
        }

        let mut vertex_data = Vec::with_capacity(vertex_count * stride as usize);
        for vertex in 0..vertex_count {
            let start = vertex_data.len();
            for (_, format, components, data) in &streams {
                let components = *components as usize;
                format.pack(&data[vertex * components..(vertex + 1) * components], &mut vertex_data);
                let written = vertex_data.len() - start;
                vertex_data.resize(start + lacking_core::math::align_up(written as u32, 4) as usize, 0);
            }
            if !self.joints.is_empty() {
                vertex_data.extend_from_slice(&self.joints[vertex]);
            }
        }

        if let Some(index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(invalid(&self.name, &format!("index {} is out of range", index)));
        }
        let max_index = self.indices.iter().copied().max().unwrap_or(0);
        let (index_format, index_data) = if max_index <= u32::from(u16::MAX) {
            let packed: Vec<u16> = self.indices.iter().map(|&i| i as u16).collect();
            (IndexFormat::U16, bytemuck::cast_slice(&packed).to_vec())
        } else {
            (IndexFormat::U32, bytemuck::cast_slice(&self.indices).to_vec())
        };

        let fragments = self
            .fragments
            .into_iter()
            .map(|fragment| {
                let end = fragment.first_index as usize + fragment.index_count as usize;
                if end > self.indices.len() {
                    return Err(invalid(
                        &self.name,
                        &format!("fragment '{}' reaches past the index data", fragment.name),
                    ));
                }
                Ok(MeshFragment {
                    name: fragment.name,
                    topology: fragment.topology,
                    index_byte_offset: fragment.first_index * index_format.size(),
                    index_count: fragment.index_count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let bounding_radius = self.bounding_radius.unwrap_or_else(|| {
            self.coords
                .iter()
                .map(|coord| coord.length())
                .fold(0.0, f32::max)
        });

        Ok(MeshGeometryInfo {
            name: self.name,
            vertex_data,
            vertex_stride: stride,
            attributes,
            index_data,
            index_format,
            fragments,
            bounding_radius,
            min_distance: self.min_distance,
            max_distance: self.max_distance,
            max_cascade: self.max_cascade,
        })
    }
}

fn invalid(name: &str, reason: &str) -> GraphicsError {
    GraphicsError::InvalidGeometry(format!("{}: {}", name, reason))
}

/// Vertex and index buffers plus the vertex array that binds them.
#[derive(Debug)]
pub struct MeshGeometry {
    device: Arc<dyn GraphicsDevice>,
    name: String,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    vertex_array: VertexArrayId,
    index_format: IndexFormat,
    attributes: Vec<VertexAttribute>,
    fragments: Vec<MeshFragment>,
    bounding_radius: f32,
    min_distance: f32,
    max_distance: f32,
    max_cascade: u32,
    deleted: AtomicBool,
}

impl MeshGeometry {
    /// Uploads `info` to the device.
    pub fn new(device: Arc<dyn GraphicsDevice>, info: MeshGeometryInfo) -> Result<Self> {
        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{} Vertices", info.name))),
            size: info.vertex_data.len() as u32,
            usage: BufferUsage::Vertex,
            dynamic: false,
            data: Some(&info.vertex_data),
        })?;
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Owned(format!("{} Indices", info.name))),
            size: info.index_data.len() as u32,
            usage: BufferUsage::Index,
            dynamic: false,
            data: Some(&info.index_data),
        })?;
        let layout: Vec<VertexArrayAttribute> = info
            .attributes
            .iter()
            .map(|&(attribute, format, offset)| VertexArrayAttribute {
                binding: 0,
                location: attribute.location(),
                format,
                offset,
            })
            .collect();
        let vertex_array = device.create_vertex_array(&VertexArrayDescriptor {
            label: Some(Cow::Borrowed(info.name.as_str())),
            bindings: Cow::Owned(vec![VertexArrayBinding {
                buffer: vertex_buffer,
                stride: info.vertex_stride,
            }]),
            attributes: Cow::Owned(layout),
            index_buffer: Some(index_buffer),
            index_format: info.index_format,
        })?;
        log::debug!(
            "Created mesh geometry '{}' ({} fragments, stride {})",
            info.name,
            info.fragments.len(),
            info.vertex_stride
        );
        Ok(Self {
            device,
            name: info.name,
            vertex_buffer,
            index_buffer,
            vertex_array,
            index_format: info.index_format,
            attributes: info.attributes.iter().map(|(attribute, _, _)| *attribute).collect(),
            fragments: info.fragments,
            bounding_radius: info.bounding_radius,
            min_distance: info.min_distance,
            max_distance: info.max_distance,
            max_cascade: info.max_cascade,
            deleted: AtomicBool::new(false),
        })
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The vertex array to draw with.
    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    /// The index element format.
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// The index ranges.
    pub fn fragments(&self) -> &[MeshFragment] {
        &self.fragments
    }

    /// Whether the vertex layout contains `attribute`.
    pub fn has_attribute(&self, attribute: VertexAttribute) -> bool {
        self.attributes.contains(&attribute)
    }

    /// Bounding sphere radius around the local origin.
    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    /// Camera distance range at which static instances are drawn.
    pub fn distance_range(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    /// Last shadow cascade the geometry is drawn into.
    pub fn max_cascade(&self) -> u32 {
        self.max_cascade
    }

    /// Program features implied by the vertex layout.
    pub fn program_config(&self) -> MeshProgramConfig {
        MeshProgramConfig {
            has_normals: self.has_attribute(VertexAttribute::Normal),
            has_tangents: self.has_attribute(VertexAttribute::Tangent),
            has_tex_coords: self.has_attribute(VertexAttribute::TexCoord),
            has_vertex_colors: self.has_attribute(VertexAttribute::Color),
            skinned: self.has_attribute(VertexAttribute::Weights)
                && self.has_attribute(VertexAttribute::Joints),
        }
    }

    /// Destroys the GPU resources. Also runs on drop; later calls do nothing.
    pub fn delete(&self) {
        if self.deleted.swap(true, Ordering::AcqRel) {
            return;
        }
        let results = [
            self.device.destroy_vertex_array(self.vertex_array),
            self.device.destroy_buffer(self.index_buffer),
            self.device.destroy_buffer(self.vertex_buffer),
        ];
        for err in results.into_iter().filter_map(|result| result.err()) {
            log::warn!("Failed to release mesh geometry '{}': {}", self.name, err);
        }
    }
}

impl Drop for MeshGeometry {
    fn drop(&mut self) {
        self.delete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshGeometryBuilder {
        MeshGeometryBuilder::new("Triangle")
            .coords(
                vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0)],
                AttributeFormat::F32,
            )
            .indices(vec![0, 1, 2])
            .fragment("main", Topology::TriangleList, 0, 3)
    }

    #[test]
    fn interleaves_mixed_precisions() {
        let info = triangle()
            .normals(vec![Vec3::Z; 3], AttributeFormat::F16)
            .colors(vec![Vec4::ONE; 3], AttributeFormat::U8Norm)
            .build()
            .unwrap();

        assert_eq!(
            info.attributes,
            vec![
                (VertexAttribute::Coord, VertexFormat::Float32x3, 0),
                (VertexAttribute::Normal, VertexFormat::Float16x3, 12),
                (VertexAttribute::Color, VertexFormat::Unorm8x4, 20),
            ]
        );
        assert_eq!(info.vertex_stride, 24);
        assert_eq!(info.vertex_data.len(), 72);
        // Normal z of the first vertex is 1.0 as f16.
        let z = f16::from_le_bytes([info.vertex_data[16], info.vertex_data[17]]);
        assert_eq!(z.to_f32(), 1.0);
        assert_eq!(&info.vertex_data[20..24], &[255, 255, 255, 255]);
    }

    #[test]
    fn small_index_ranges_use_sixteen_bits() {
        let info = triangle().fragment("tail", Topology::LineStrip, 1, 2).build().unwrap();
        assert_eq!(info.index_format, IndexFormat::U16);
        assert_eq!(info.index_data.len(), 6);
        assert_eq!(info.fragments[1].index_byte_offset, 2);
        assert!((info.bounding_radius - 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn large_index_values_use_thirty_two_bits() {
        let coords = vec![Vec3::ZERO; 70_000];
        let info = MeshGeometryBuilder::new("Large")
            .coords(coords, AttributeFormat::F16)
            .indices(vec![0, 69_999, 1])
            .fragment("all", Topology::TriangleList, 0, 3)
            .build()
            .unwrap();
        assert_eq!(info.index_format, IndexFormat::U32);
        assert_eq!(info.index_data.len(), 12);
    }

    #[test]
    fn rejects_inconsistent_data() {
        let mismatched = triangle().normals(vec![Vec3::Z; 2], AttributeFormat::F32).build();
        assert!(matches!(mismatched, Err(GraphicsError::InvalidGeometry(_))));

        let unsupported = triangle().normals(vec![Vec3::Z; 3], AttributeFormat::U16Norm).build();
        assert!(matches!(unsupported, Err(GraphicsError::InvalidGeometry(_))));

        let overlong = triangle().fragment("bad", Topology::TriangleList, 2, 3).build();
        assert!(matches!(overlong, Err(GraphicsError::InvalidGeometry(_))));
    }
}
