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

//! Render pass descriptors and transfer operations.

use crate::math::Vec4;
use crate::renderer::api::resource::{
    BufferId, DataFormat, FramebufferId, MAX_COLOR_ATTACHMENTS,
};

/// A rectangular region of a framebuffer, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// Left edge.
    pub x: u32,
    /// Bottom edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Creates a new viewport.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Describes the operation to perform on an attachment at the start of a render pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoadOp<V> {
    /// The existing contents are loaded.
    Load,
    /// The attachment is cleared to the specified value.
    Clear(V),
    /// The previous contents are undefined.
    DontCare,
}

/// Describes the operation to perform on an attachment at the end of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    /// The results are stored.
    Store,
    /// The results are discarded.
    Discard,
}

/// Load and store operations for a single attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Operations<V> {
    /// Operation at the beginning of the pass.
    pub load: LoadOp<V>,
    /// Operation at the end of the pass.
    pub store: StoreOp,
}

impl<V> Operations<V> {
    /// Clears to `value` and stores the results.
    pub const fn clear(value: V) -> Self {
        Self {
            load: LoadOp::Clear(value),
            store: StoreOp::Store,
        }
    }

    /// Loads the previous contents and stores the results.
    pub const fn load() -> Self {
        Self {
            load: LoadOp::Load,
            store: StoreOp::Store,
        }
    }

    /// Ignores previous contents and discards the results.
    pub const fn discard() -> Self {
        Self {
            load: LoadOp::DontCare,
            store: StoreOp::Discard,
        }
    }
}

/// A descriptor for a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    /// An optional debug label for the render pass.
    pub label: Option<&'static str>,
    /// The framebuffer rendered into.
    pub framebuffer: FramebufferId,
    /// The region of the framebuffer affected by draws.
    pub viewport: Viewport,
    /// Per-attachment color operations; `None` for unused attachments.
    pub color_attachments: [Option<Operations<Vec4>>; MAX_COLOR_ATTACHMENTS],
    /// Depth operations, if the framebuffer has a depth attachment.
    pub depth: Option<Operations<f32>>,
    /// Stencil operations, if the framebuffer has a stencil component.
    pub stencil: Option<Operations<u32>>,
}

impl RenderPassDescriptor {
    /// Creates a render pass with no attachment operations configured.
    pub fn new(framebuffer: FramebufferId, viewport: Viewport) -> Self {
        Self {
            label: None,
            framebuffer,
            viewport,
            color_attachments: [None; MAX_COLOR_ATTACHMENTS],
            depth: None,
            stencil: None,
        }
    }
}

/// Describes a copy of a framebuffer region into a pixel transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyFramebufferToBufferInfo {
    /// The destination buffer.
    pub buffer: BufferId,
    /// Byte offset into the destination buffer.
    pub offset: u32,
    /// Left edge of the source region.
    pub x: u32,
    /// Bottom edge of the source region.
    pub y: u32,
    /// Width of the source region.
    pub width: u32,
    /// Height of the source region.
    pub height: u32,
    /// The format the pixels are converted to.
    pub format: DataFormat,
}
