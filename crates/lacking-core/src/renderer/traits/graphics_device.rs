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

//! Defines the main graphics device trait.

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::CommandBuffer;
use std::fmt::Debug;

/// The main trait for a graphics device, representing a logical connection to the GPU.
///
/// This is the entry point for creating and destroying every GPU resource the
/// renderer uses. It is object-safe and shared as `Arc<dyn GraphicsDevice>`.
/// Every resource is owned by exactly one component, which destroys it before
/// creating a replacement.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Returns the hard limits of the device.
    fn limits(&self) -> DeviceLimits;

    /// Returns the optional capabilities of the device.
    fn capabilities(&self) -> Capabilities;

    /// Creates a new GPU buffer.
    ///
    /// # Errors
    /// * `ResourceError::OutOfBounds` - If initial data does not match the size.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes `data` into a buffer starting at `offset` bytes.
    ///
    /// # Errors
    /// * `ResourceError::OutOfBounds` - If the write exceeds the buffer's size.
    fn write_buffer(&self, id: BufferId, offset: u32, data: &[u8]) -> Result<(), ResourceError>;

    /// Reads the contents of a pixel transfer buffer into `target`.
    ///
    /// Only valid once a fence created after the producing submission has signalled.
    fn read_buffer(&self, id: BufferId, offset: u32, target: &mut [u8])
        -> Result<(), ResourceError>;

    /// Creates a 2D color texture.
    fn create_color_texture_2d(
        &self,
        descriptor: &ColorTexture2DDescriptor,
    ) -> Result<TextureId, ResourceError>;

    /// Creates a cube color texture.
    fn create_color_texture_cube(
        &self,
        descriptor: &ColorTextureCubeDescriptor,
    ) -> Result<TextureId, ResourceError>;

    /// Creates a 2D depth (or depth-stencil) texture.
    fn create_depth_texture_2d(
        &self,
        descriptor: &DepthTexture2DDescriptor,
    ) -> Result<TextureId, ResourceError>;

    /// Destroys a texture of any kind.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a texture sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Destroys a texture sampler.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a framebuffer from existing textures.
    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, ResourceError>;

    /// Destroys a framebuffer. The attached textures are not destroyed.
    fn destroy_framebuffer(&self, id: FramebufferId) -> Result<(), ResourceError>;

    /// Creates a vertex array from existing buffers.
    fn create_vertex_array(
        &self,
        descriptor: &VertexArrayDescriptor,
    ) -> Result<VertexArrayId, ResourceError>;

    /// Destroys a vertex array. The referenced buffers are not destroyed.
    fn destroy_vertex_array(&self, id: VertexArrayId) -> Result<(), ResourceError>;

    /// Compiles program code into a program.
    ///
    /// # Errors
    /// * `ResourceError::CompilationFailed` - If the backend rejects the code.
    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramId, ResourceError>;

    /// Destroys a program.
    fn destroy_program(&self, id: ProgramId) -> Result<(), ResourceError>;

    /// Creates a pipeline state object.
    fn create_pipeline(&self, descriptor: &PipelineDescriptor)
        -> Result<PipelineId, ResourceError>;

    /// Destroys a pipeline.
    fn destroy_pipeline(&self, id: PipelineId) -> Result<(), ResourceError>;

    /// Inserts a fence after all previously submitted work.
    fn create_fence(&self) -> Result<FenceId, ResourceError>;

    /// Polls the state of a fence without blocking.
    fn fence_status(&self, id: FenceId) -> FenceStatus;

    /// Destroys a fence.
    fn destroy_fence(&self, id: FenceId) -> Result<(), ResourceError>;

    /// Creates an empty command buffer with room for `capacity` bytes of commands.
    fn create_command_buffer(&self, capacity: usize) -> Box<dyn CommandBuffer>;

    /// Executes the commands recorded in `commands`, then resets it.
    fn submit(&self, commands: &mut dyn CommandBuffer) -> Result<(), RenderError>;
}
