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

//! GPU resource handles and the descriptors used to create them.

use crate::renderer::api::pipeline::Comparison;
use std::borrow::Cow;

/// An opaque handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// An opaque handle to a GPU texture (2D, cube or depth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// An opaque handle to a texture sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub u64);

/// An opaque handle to a framebuffer (a set of render attachments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u64);

/// An opaque handle to a GPU fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);

/// How a buffer is going to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex attribute data.
    Vertex,
    /// Index data.
    Index,
    /// Uniform block data.
    Uniform,
    /// Destination of framebuffer-to-buffer copies, readable by the CPU.
    PixelTransfer,
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The size of the buffer in bytes.
    pub size: u32,
    /// The intended usage.
    pub usage: BufferUsage,
    /// Whether the contents are rewritten frequently.
    pub dynamic: bool,
    /// Initial contents. When present its length must equal `size`.
    pub data: Option<&'a [u8]>,
}

/// The texel format of color textures and pixel transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// The device cannot report or handle the requested format.
    Unsupported,
    /// Four 8-bit unsigned normalized components.
    Rgba8,
    /// Four 16-bit float components.
    Rgba16F,
    /// Four 32-bit float components.
    Rgba32F,
}

impl DataFormat {
    /// The size of a single texel in bytes, or `0` for [`DataFormat::Unsupported`].
    pub const fn texel_size(&self) -> u32 {
        match self {
            DataFormat::Unsupported => 0,
            DataFormat::Rgba8 => 4,
            DataFormat::Rgba16F => 8,
            DataFormat::Rgba32F => 16,
        }
    }
}

/// A descriptor used to create a 2D color texture.
#[derive(Debug, Clone)]
pub struct ColorTexture2DDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Whether a full mip chain is generated.
    pub mipmapping: bool,
    /// Whether the data is stored in sRGB space.
    pub gamma_correction: bool,
    /// The texel format.
    pub format: DataFormat,
    /// Optional initial texel data.
    pub data: Option<&'a [u8]>,
}

/// A descriptor used to create a cube color texture.
#[derive(Debug, Clone)]
pub struct ColorTextureCubeDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Edge length of each face in texels.
    pub dimension: u32,
    /// Whether a full mip chain is generated.
    pub mipmapping: bool,
    /// Whether the data is stored in sRGB space.
    pub gamma_correction: bool,
    /// The texel format.
    pub format: DataFormat,
    /// Optional face data in `+X, -X, +Y, -Y, +Z, -Z` order.
    pub faces: Option<[&'a [u8]; 6]>,
}

/// A descriptor used to create a 2D depth texture.
#[derive(Debug, Clone)]
pub struct DepthTexture2DDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Whether the texture is sampled with comparison (shadow) samplers.
    pub comparable: bool,
    /// Whether the texture also carries a stencil component.
    pub stencil: bool,
}

/// Defines how texture coordinates outside `[0, 1]` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Coordinates are clamped to the edge.
    Clamp,
    /// Coordinates wrap around.
    Repeat,
    /// Coordinates wrap around, mirroring at each integer boundary.
    Mirror,
}

/// Defines the filtering mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Returns the value of the nearest texel.
    Nearest,
    /// Linear interpolation between the nearest texels.
    Linear,
    /// Anisotropic filtering, where available.
    Anisotropic,
}

/// A descriptor used to create a [`SamplerId`].
#[derive(Debug, Clone)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Wrapping on all axes.
    pub wrap: WrapMode,
    /// Minification and magnification filter.
    pub filter: FilterMode,
    /// Whether mipmaps are sampled.
    pub mipmaps: bool,
    /// When set, the sampler performs a depth comparison.
    pub comparison: Option<Comparison>,
}

/// The maximum number of color attachments a framebuffer can carry.
pub const MAX_COLOR_ATTACHMENTS: usize = 4;

/// A descriptor used to create a [`FramebufferId`].
#[derive(Debug, Clone, Default)]
pub struct FramebufferDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Color attachments, by attachment index.
    pub color_attachments: [Option<TextureId>; MAX_COLOR_ATTACHMENTS],
    /// The depth (or depth-stencil) attachment.
    pub depth_attachment: Option<TextureId>,
}
