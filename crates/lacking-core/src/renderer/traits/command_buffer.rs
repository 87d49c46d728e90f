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

//! Defines the command recording trait.

use crate::renderer::api::command::{CopyFramebufferToBufferInfo, RenderPassDescriptor};
use crate::renderer::api::pipeline::PipelineId;
use crate::renderer::api::resource::{BufferId, SamplerId, TextureId};
use std::any::Any;

/// A trait for an object that records a sequence of GPU commands.
///
/// A single command buffer is shared by every stage of a frame. Stages record
/// into it in order; nothing is executed until the buffer is handed to
/// [`GraphicsDevice::submit`](crate::renderer::GraphicsDevice::submit).
///
/// Draw commands are only valid between [`begin_render_pass`](Self::begin_render_pass)
/// and [`end_render_pass`](Self::end_render_pass), and only after a pipeline
/// has been bound.
pub trait CommandBuffer: Send {
    /// Starts a render pass, applying the descriptor's load operations.
    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor);

    /// Ends the current render pass, applying its store operations.
    fn end_render_pass(&mut self);

    /// Binds the pipeline (program, vertex array and fixed state) used by subsequent draws.
    fn bind_pipeline(&mut self, pipeline: PipelineId);

    /// Binds a texture to a texture unit.
    fn texture_unit(&mut self, index: u32, texture: TextureId);

    /// Binds a sampler to a texture unit.
    fn sampler_unit(&mut self, index: u32, sampler: SamplerId);

    /// Binds a range of a uniform buffer to a uniform block slot.
    ///
    /// `offset` must be a multiple of the device's uniform buffer offset alignment.
    fn uniform_buffer_unit(&mut self, index: u32, buffer: BufferId, offset: u32, size: u32);

    /// Records a non-indexed draw.
    fn draw(&mut self, vertex_offset: u32, vertex_count: u32, instance_count: u32);

    /// Records an indexed draw using the index buffer of the bound vertex array.
    fn draw_indexed(&mut self, index_byte_offset: u32, index_count: u32, instance_count: u32);

    /// Copies a region of the current framebuffer into a pixel transfer buffer.
    fn copy_framebuffer_to_buffer(&mut self, info: &CopyFramebufferToBufferInfo);

    /// Discards all recorded commands so the buffer can be reused.
    fn reset(&mut self);

    /// Returns `self` as `Any` so that a backend can recover its concrete type on submit.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
