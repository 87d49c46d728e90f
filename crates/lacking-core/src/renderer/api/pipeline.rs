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

//! Programs, vertex arrays and pipelines.

use crate::renderer::api::resource::BufferId;
use std::any::Any;
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

/// An opaque handle to a compiled GPU program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u64);

/// An opaque handle to a pipeline state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(pub u64);

/// An opaque handle to a vertex array (vertex buffer bindings plus index buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayId(pub u64);

/// Backend-specific program source produced by the host's shader builder.
///
/// The renderer never inspects program code; it only forwards it to
/// [`GraphicsDevice::create_program`](crate::renderer::GraphicsDevice::create_program),
/// where the backend downcasts it to its own representation.
pub trait ProgramCode: Any + Debug + Send + Sync {
    /// Returns the code as `Any` for backend downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Maps a named sampler in program code to a texture unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    /// The sampler name in the program.
    pub name: Cow<'static, str>,
    /// The texture unit index.
    pub index: u32,
}

impl TextureBinding {
    /// Creates a new texture binding.
    pub fn new(name: impl Into<Cow<'static, str>>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// Maps a named uniform block in program code to a uniform buffer binding slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniformBinding {
    /// The block name in the program.
    pub name: Cow<'static, str>,
    /// The binding slot index.
    pub index: u32,
}

impl UniformBinding {
    /// Creates a new uniform binding.
    pub fn new(name: impl Into<Cow<'static, str>>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// A descriptor used to create a [`ProgramId`].
#[derive(Debug, Clone)]
pub struct ProgramDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The program code, as produced by the host.
    pub code: Arc<dyn ProgramCode>,
    /// Sampler name to texture unit assignments.
    pub texture_bindings: Cow<'a, [TextureBinding]>,
    /// Uniform block name to binding slot assignments.
    pub uniform_bindings: Cow<'a, [UniformBinding]>,
}

/// The memory format of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One 32-bit float.
    Float32,
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// Two 16-bit floats.
    Float16x2,
    /// Three 16-bit floats.
    Float16x3,
    /// Four 16-bit floats.
    Float16x4,
    /// Three 8-bit unsigned components normalized to `[0.0, 1.0]`.
    Unorm8x3,
    /// Four 8-bit unsigned components normalized to `[0.0, 1.0]`.
    Unorm8x4,
    /// Two 16-bit unsigned components normalized to `[0.0, 1.0]`.
    Unorm16x2,
    /// Four 16-bit unsigned components normalized to `[0.0, 1.0]`.
    Unorm16x4,
    /// Four 8-bit unsigned integers.
    Uint8x4,
}

impl VertexFormat {
    /// Returns the size in bytes of this vertex format.
    pub const fn size(&self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Float16x2 => 4,
            VertexFormat::Float16x3 => 6,
            VertexFormat::Float16x4 => 8,
            VertexFormat::Unorm8x3 => 3,
            VertexFormat::Unorm8x4 => 4,
            VertexFormat::Unorm16x2 => 4,
            VertexFormat::Unorm16x4 => 8,
            VertexFormat::Uint8x4 => 4,
        }
    }
}

/// The format of index data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    U16,
    /// 32-bit unsigned indices.
    U32,
}

impl IndexFormat {
    /// Returns the size in bytes of a single index.
    pub const fn size(&self) -> u32 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Binds a buffer to a vertex array binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayBinding {
    /// The vertex buffer.
    pub buffer: BufferId,
    /// The byte distance between consecutive vertices.
    pub stride: u32,
}

/// Describes a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayAttribute {
    /// Index into [`VertexArrayDescriptor::bindings`].
    pub binding: u32,
    /// The shader input location.
    pub location: u32,
    /// The attribute format.
    pub format: VertexFormat,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

/// A descriptor used to create a [`VertexArrayId`].
#[derive(Debug, Clone)]
pub struct VertexArrayDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Vertex buffer bindings.
    pub bindings: Cow<'a, [VertexArrayBinding]>,
    /// Vertex attributes.
    pub attributes: Cow<'a, [VertexArrayAttribute]>,
    /// The index buffer, if the geometry is indexed.
    pub index_buffer: Option<BufferId>,
    /// The format of the index buffer.
    pub index_format: IndexFormat,
}

/// The primitive topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    /// Individual points.
    Points,
    /// Pairs of vertices form lines.
    LineList,
    /// Consecutive vertices form a connected line.
    LineStrip,
    /// Triples of vertices form triangles.
    #[default]
    TriangleList,
    /// Consecutive vertices form a strip of triangles.
    TriangleStrip,
    /// Triangles share the first vertex.
    TriangleFan,
}

/// Which faces are discarded during rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    None,
    /// Front faces are culled.
    Front,
    /// Back faces are culled.
    #[default]
    Back,
    /// All polygons are culled.
    FrontAndBack,
}

/// The vertex winding considered front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FaceOrientation {
    /// Counter-clockwise winding is front-facing.
    #[default]
    Ccw,
    /// Clockwise winding is front-facing.
    Cw,
}

/// A comparison function for depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Comparison {
    /// Never passes.
    Never,
    /// Passes if the new value is less than the existing one.
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less than or equal to the existing one.
    #[default]
    LessOrEqual,
    /// Passes if the new value is greater than the existing one.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the new value is greater than or equal to the existing one.
    GreaterOrEqual,
    /// Always passes.
    Always,
}

/// A blend factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0.0`
    Zero,
    /// `1.0`
    One,
    /// Source color.
    SourceColor,
    /// `1.0 - source color`
    OneMinusSourceColor,
    /// Destination color.
    DestinationColor,
    /// `1.0 - destination color`
    OneMinusDestinationColor,
    /// Source alpha.
    SourceAlpha,
    /// `1.0 - source alpha`
    OneMinusSourceAlpha,
    /// Destination alpha.
    DestinationAlpha,
    /// `1.0 - destination alpha`
    OneMinusDestinationAlpha,
}

/// How source and destination factors combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// `src + dst`
    #[default]
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// The blend equation used when blending is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Source factor for the color channels.
    pub source_color_factor: BlendFactor,
    /// Destination factor for the color channels.
    pub destination_color_factor: BlendFactor,
    /// Source factor for the alpha channel.
    pub source_alpha_factor: BlendFactor,
    /// Destination factor for the alpha channel.
    pub destination_alpha_factor: BlendFactor,
    /// Operation for the color channels.
    pub color_operation: BlendOperation,
    /// Operation for the alpha channel.
    pub alpha_operation: BlendOperation,
}

impl BlendState {
    /// Classic `src * alpha + dst * (1 - alpha)` transparency.
    pub const ALPHA: Self = Self {
        source_color_factor: BlendFactor::SourceAlpha,
        destination_color_factor: BlendFactor::OneMinusSourceAlpha,
        source_alpha_factor: BlendFactor::One,
        destination_alpha_factor: BlendFactor::Zero,
        color_operation: BlendOperation::Add,
        alpha_operation: BlendOperation::Add,
    };

    /// Additive `src + dst` accumulation of color; alpha is left untouched.
    pub const ADDITIVE: Self = Self {
        source_color_factor: BlendFactor::One,
        destination_color_factor: BlendFactor::One,
        source_alpha_factor: BlendFactor::Zero,
        destination_alpha_factor: BlendFactor::One,
        color_operation: BlendOperation::Add,
        alpha_operation: BlendOperation::Add,
    };
}

impl Default for BlendState {
    fn default() -> Self {
        Self::ALPHA
    }
}

/// Per-channel color write mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorMask {
    /// Write the red channel.
    pub r: bool,
    /// Write the green channel.
    pub g: bool,
    /// Write the blue channel.
    pub b: bool,
    /// Write the alpha channel.
    pub a: bool,
}

impl ColorMask {
    /// All channels are written.
    pub const ALL: Self = Self {
        r: true,
        g: true,
        b: true,
        a: true,
    };

    /// No channel is written.
    pub const NONE: Self = Self {
        r: false,
        g: false,
        b: false,
        a: false,
    };

    /// Color channels are written, alpha is preserved.
    pub const RGB: Self = Self {
        r: true,
        g: true,
        b: true,
        a: false,
    };
}

impl Default for ColorMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// A descriptor used to create a [`PipelineId`].
#[derive(Debug, Clone)]
pub struct PipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The program to execute.
    pub program: ProgramId,
    /// The vertex array supplying geometry.
    pub vertex_array: VertexArrayId,
    /// The primitive topology.
    pub topology: Topology,
    /// Face culling.
    pub culling: CullMode,
    /// Front-face winding.
    pub front_face: FaceOrientation,
    /// Whether the depth test is enabled.
    pub depth_test: bool,
    /// Whether depth values are written.
    pub depth_write: bool,
    /// The depth comparison function.
    pub depth_comparison: Comparison,
    /// Whether the stencil test is enabled.
    pub stencil_test: bool,
    /// Color write mask applied to every attachment.
    pub color_write: ColorMask,
    /// Whether blending is enabled.
    pub blend_enabled: bool,
    /// The blend equation, used when `blend_enabled` is set.
    pub blend: BlendState,
}
