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

//! A recording, GPU-less implementation of the rendering contracts.
//!
//! [`MockDevice`] keeps every live resource in memory together with the
//! properties it was created with, and [`MockCommandBuffer`] records commands
//! as [`RecordedCommand`] values. On [`GraphicsDevice::submit`] the recorded
//! list is stored for inspection and framebuffer-to-buffer copies are resolved
//! with scripted pixel data, so readback paths can be exercised without a GPU.

use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::{CommandBuffer, GraphicsDevice};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A single command captured by [`MockCommandBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// `begin_render_pass`
    BeginRenderPass(RenderPassDescriptor),
    /// `end_render_pass`
    EndRenderPass,
    /// `bind_pipeline`
    BindPipeline(PipelineId),
    /// `texture_unit`
    TextureUnit {
        /// Texture unit index.
        index: u32,
        /// Bound texture.
        texture: TextureId,
    },
    /// `sampler_unit`
    SamplerUnit {
        /// Texture unit index.
        index: u32,
        /// Bound sampler.
        sampler: SamplerId,
    },
    /// `uniform_buffer_unit`
    UniformBufferUnit {
        /// Uniform block slot.
        index: u32,
        /// Bound buffer.
        buffer: BufferId,
        /// Byte offset of the range.
        offset: u32,
        /// Byte size of the range.
        size: u32,
    },
    /// `draw`
    Draw {
        /// First vertex.
        vertex_offset: u32,
        /// Number of vertices.
        vertex_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// `draw_indexed`
    DrawIndexed {
        /// Byte offset into the index buffer.
        index_byte_offset: u32,
        /// Number of indices.
        index_count: u32,
        /// Number of instances.
        instance_count: u32,
    },
    /// `copy_framebuffer_to_buffer`
    CopyFramebufferToBuffer(CopyFramebufferToBufferInfo),
}

/// The kind of a texture created on a [`MockDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockTextureKind {
    /// A 2D color texture.
    Color2D,
    /// A cube color texture.
    ColorCube,
    /// A 2D depth texture.
    Depth2D,
}

/// The recorded properties of a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTexture {
    /// The debug label, if any.
    pub label: Option<String>,
    /// The texture kind.
    pub kind: MockTextureKind,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format; [`DataFormat::Unsupported`] for depth textures.
    pub format: DataFormat,
}

/// The recorded properties of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockBuffer {
    /// The debug label, if any.
    pub label: Option<String>,
    /// The buffer usage.
    pub usage: BufferUsage,
    /// The current contents.
    pub data: Vec<u8>,
}

/// The recorded properties of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MockPipeline {
    /// The debug label, if any.
    pub label: Option<String>,
    /// The program.
    pub program: ProgramId,
    /// The vertex array.
    pub vertex_array: VertexArrayId,
    /// Primitive topology.
    pub topology: Topology,
    /// Face culling.
    pub culling: CullMode,
    /// Whether the depth test is enabled.
    pub depth_test: bool,
    /// Whether depth is written.
    pub depth_write: bool,
    /// The depth comparison.
    pub depth_comparison: Comparison,
    /// The color write mask.
    pub color_write: ColorMask,
    /// Whether blending is enabled.
    pub blend_enabled: bool,
    /// The blend equation.
    pub blend: BlendState,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    buffers: HashMap<BufferId, MockBuffer>,
    textures: HashMap<TextureId, MockTexture>,
    samplers: HashMap<SamplerId, FilterMode>,
    framebuffers: HashMap<FramebufferId, FramebufferDescriptor<'static>>,
    vertex_arrays: HashMap<VertexArrayId, Option<BufferId>>,
    programs: HashMap<ProgramId, Option<String>>,
    pipelines: HashMap<PipelineId, MockPipeline>,
    fences: HashMap<FenceId, FenceStatus>,
    buffer_writes: Vec<(BufferId, u32, usize)>,
    submissions: Vec<Vec<RecordedCommand>>,
    fence_status: Option<FenceStatus>,
    readback_pixel: Vec<u8>,
    rejected_program: Option<String>,
}

impl MockState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A graphics device that records instead of rendering.
#[derive(Debug)]
pub struct MockDevice {
    limits: DeviceLimits,
    capabilities: Capabilities,
    state: Mutex<MockState>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Creates a device with default limits and capabilities.
    pub fn new() -> Self {
        Self {
            limits: DeviceLimits::default(),
            capabilities: Capabilities::default(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Overrides the reported limits.
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Overrides the reported capabilities.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the status reported for every fence. `Success` when never set.
    pub fn set_fence_status(&self, status: FenceStatus) {
        self.state().fence_status = Some(status);
    }

    /// Sets the bytes of a single pixel that framebuffer copies produce.
    ///
    /// Copies repeat the pattern for every pixel in the copied region.
    pub fn set_readback_pixel(&self, bytes: Vec<u8>) {
        self.state().readback_pixel = bytes;
    }

    /// Makes [`GraphicsDevice::create_program`] fail for programs with the given label.
    pub fn reject_program(&self, label: impl Into<String>) {
        self.state().rejected_program = Some(label.into());
    }

    /// Returns every submitted command list, oldest first.
    pub fn submissions(&self) -> Vec<Vec<RecordedCommand>> {
        self.state().submissions.clone()
    }

    /// Returns the most recent submitted command list.
    pub fn last_submission(&self) -> Vec<RecordedCommand> {
        self.state().submissions.last().cloned().unwrap_or_default()
    }

    /// Returns `(buffer, offset, length)` for every `write_buffer` call so far.
    pub fn buffer_writes(&self) -> Vec<(BufferId, u32, usize)> {
        self.state().buffer_writes.clone()
    }

    /// Returns a copy of a live buffer.
    pub fn buffer(&self, id: BufferId) -> Option<MockBuffer> {
        self.state().buffers.get(&id).cloned()
    }

    /// Returns a copy of a live texture's properties.
    pub fn texture(&self, id: TextureId) -> Option<MockTexture> {
        self.state().textures.get(&id).cloned()
    }

    /// Returns every live texture with the given label.
    pub fn textures_labelled(&self, label: &str) -> Vec<(TextureId, MockTexture)> {
        let mut found: Vec<_> = self
            .state()
            .textures
            .iter()
            .filter(|(_, texture)| texture.label.as_deref() == Some(label))
            .map(|(id, texture)| (*id, texture.clone()))
            .collect();
        found.sort_by_key(|(id, _)| *id);
        found
    }

    /// Returns a copy of a live pipeline's properties.
    pub fn pipeline(&self, id: PipelineId) -> Option<MockPipeline> {
        self.state().pipelines.get(&id).cloned()
    }

    /// Returns the attachments of a live framebuffer.
    pub fn framebuffer(&self, id: FramebufferId) -> Option<FramebufferDescriptor<'static>> {
        self.state().framebuffers.get(&id).cloned()
    }

    /// Returns the number of live programs.
    pub fn program_count(&self) -> usize {
        self.state().programs.len()
    }

    /// Returns the number of live fences.
    pub fn fence_count(&self) -> usize {
        self.state().fences.len()
    }

    /// Returns the total number of live resources of every kind.
    pub fn live_resource_count(&self) -> usize {
        let state = self.state();
        state.buffers.len()
            + state.textures.len()
            + state.samplers.len()
            + state.framebuffers.len()
            + state.vertex_arrays.len()
            + state.programs.len()
            + state.pipelines.len()
            + state.fences.len()
    }

    fn create_texture(&self, texture: MockTexture) -> TextureId {
        let mut state = self.state();
        let id = TextureId(state.next_id());
        state.textures.insert(id, texture);
        id
    }
}

fn label_of(label: &Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    label.as_ref().map(|l| l.to_string())
}

fn not_found(kind: &'static str, id: u64) -> ResourceError {
    ResourceError::NotFound { kind, id }
}

impl GraphicsDevice for MockDevice {
    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let data = match descriptor.data {
            Some(data) if data.len() != descriptor.size as usize => {
                return Err(ResourceError::OutOfBounds);
            }
            Some(data) => data.to_vec(),
            None => vec![0; descriptor.size as usize],
        };
        let mut state = self.state();
        let id = BufferId(state.next_id());
        state.buffers.insert(
            id,
            MockBuffer {
                label: label_of(&descriptor.label),
                usage: descriptor.usage,
                data,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.state()
            .buffers
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("buffer", id.0))
    }

    fn write_buffer(&self, id: BufferId, offset: u32, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        let buffer = state
            .buffers
            .get_mut(&id)
            .ok_or(not_found("buffer", id.0))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.data.len() {
            return Err(ResourceError::OutOfBounds);
        }
        buffer.data[start..end].copy_from_slice(data);
        state.buffer_writes.push((id, offset, data.len()));
        Ok(())
    }

    fn read_buffer(
        &self,
        id: BufferId,
        offset: u32,
        target: &mut [u8],
    ) -> Result<(), ResourceError> {
        let state = self.state();
        let buffer = state.buffers.get(&id).ok_or(not_found("buffer", id.0))?;
        let start = offset as usize;
        let end = start + target.len();
        if end > buffer.data.len() {
            return Err(ResourceError::OutOfBounds);
        }
        target.copy_from_slice(&buffer.data[start..end]);
        Ok(())
    }

    fn create_color_texture_2d(
        &self,
        descriptor: &ColorTexture2DDescriptor,
    ) -> Result<TextureId, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(self.create_texture(MockTexture {
            label: label_of(&descriptor.label),
            kind: MockTextureKind::Color2D,
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
        }))
    }

    fn create_color_texture_cube(
        &self,
        descriptor: &ColorTextureCubeDescriptor,
    ) -> Result<TextureId, ResourceError> {
        if descriptor.dimension == 0 {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(self.create_texture(MockTexture {
            label: label_of(&descriptor.label),
            kind: MockTextureKind::ColorCube,
            width: descriptor.dimension,
            height: descriptor.dimension,
            format: descriptor.format,
        }))
    }

    fn create_depth_texture_2d(
        &self,
        descriptor: &DepthTexture2DDescriptor,
    ) -> Result<TextureId, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(self.create_texture(MockTexture {
            label: label_of(&descriptor.label),
            kind: MockTextureKind::Depth2D,
            width: descriptor.width,
            height: descriptor.height,
            format: DataFormat::Unsupported,
        }))
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        self.state()
            .textures
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("texture", id.0))
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let mut state = self.state();
        let id = SamplerId(state.next_id());
        state.samplers.insert(id, descriptor.filter);
        Ok(id)
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.state()
            .samplers
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("sampler", id.0))
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferId, ResourceError> {
        let mut state = self.state();
        let attachments = descriptor
            .color_attachments
            .iter()
            .flatten()
            .chain(descriptor.depth_attachment.iter());
        for texture in attachments {
            if !state.textures.contains_key(texture) {
                return Err(not_found("texture", texture.0));
            }
        }
        let id = FramebufferId(state.next_id());
        state.framebuffers.insert(
            id,
            FramebufferDescriptor {
                label: descriptor
                    .label
                    .as_ref()
                    .map(|l| std::borrow::Cow::Owned(l.to_string())),
                color_attachments: descriptor.color_attachments,
                depth_attachment: descriptor.depth_attachment,
            },
        );
        Ok(id)
    }

    fn destroy_framebuffer(&self, id: FramebufferId) -> Result<(), ResourceError> {
        self.state()
            .framebuffers
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("framebuffer", id.0))
    }

    fn create_vertex_array(
        &self,
        descriptor: &VertexArrayDescriptor,
    ) -> Result<VertexArrayId, ResourceError> {
        let mut state = self.state();
        let buffers = descriptor
            .bindings
            .iter()
            .map(|binding| binding.buffer)
            .chain(descriptor.index_buffer);
        for buffer in buffers {
            if !state.buffers.contains_key(&buffer) {
                return Err(not_found("buffer", buffer.0));
            }
        }
        let id = VertexArrayId(state.next_id());
        state.vertex_arrays.insert(id, descriptor.index_buffer);
        Ok(id)
    }

    fn destroy_vertex_array(&self, id: VertexArrayId) -> Result<(), ResourceError> {
        self.state()
            .vertex_arrays
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("vertex array", id.0))
    }

    fn create_program(&self, descriptor: &ProgramDescriptor) -> Result<ProgramId, ResourceError> {
        let mut state = self.state();
        let label = label_of(&descriptor.label);
        if label.is_some() && label == state.rejected_program {
            return Err(ResourceError::CompilationFailed {
                label: label.unwrap_or_default(),
                details: "rejected by mock device".to_string(),
            });
        }
        let id = ProgramId(state.next_id());
        state.programs.insert(id, label);
        Ok(id)
    }

    fn destroy_program(&self, id: ProgramId) -> Result<(), ResourceError> {
        self.state()
            .programs
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("program", id.0))
    }

    fn create_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<PipelineId, ResourceError> {
        let mut state = self.state();
        if !state.programs.contains_key(&descriptor.program) {
            return Err(not_found("program", descriptor.program.0));
        }
        if !state.vertex_arrays.contains_key(&descriptor.vertex_array) {
            return Err(not_found("vertex array", descriptor.vertex_array.0));
        }
        let id = PipelineId(state.next_id());
        state.pipelines.insert(
            id,
            MockPipeline {
                label: label_of(&descriptor.label),
                program: descriptor.program,
                vertex_array: descriptor.vertex_array,
                topology: descriptor.topology,
                culling: descriptor.culling,
                depth_test: descriptor.depth_test,
                depth_write: descriptor.depth_write,
                depth_comparison: descriptor.depth_comparison,
                color_write: descriptor.color_write,
                blend_enabled: descriptor.blend_enabled,
                blend: descriptor.blend,
            },
        );
        Ok(id)
    }

    fn destroy_pipeline(&self, id: PipelineId) -> Result<(), ResourceError> {
        self.state()
            .pipelines
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("pipeline", id.0))
    }

    fn create_fence(&self) -> Result<FenceId, ResourceError> {
        let mut state = self.state();
        let id = FenceId(state.next_id());
        state.fences.insert(id, FenceStatus::NotReady);
        Ok(id)
    }

    fn fence_status(&self, id: FenceId) -> FenceStatus {
        let state = self.state();
        match state.fences.get(&id) {
            Some(_) => state.fence_status.unwrap_or(FenceStatus::Success),
            None => FenceStatus::DeviceLost,
        }
    }

    fn destroy_fence(&self, id: FenceId) -> Result<(), ResourceError> {
        self.state()
            .fences
            .remove(&id)
            .map(|_| ())
            .ok_or(not_found("fence", id.0))
    }

    fn create_command_buffer(&self, capacity: usize) -> Box<dyn CommandBuffer> {
        Box::new(MockCommandBuffer::with_capacity(capacity))
    }

    fn submit(&self, commands: &mut dyn CommandBuffer) -> Result<(), RenderError> {
        let recorded = commands
            .as_any_mut()
            .downcast_mut::<MockCommandBuffer>()
            .map(|buffer| std::mem::take(&mut buffer.commands))
            .ok_or_else(|| RenderError::Internal("foreign command buffer".to_string()))?;

        let mut state = self.state();
        for command in &recorded {
            if let RecordedCommand::CopyFramebufferToBuffer(info) = command {
                let pixel = state.readback_pixel.clone();
                let texel_size = info.format.texel_size() as usize;
                let length = (info.width * info.height) as usize * texel_size;
                let buffer = state
                    .buffers
                    .get_mut(&info.buffer)
                    .ok_or(not_found("buffer", info.buffer.0))?;
                let start = info.offset as usize;
                let end = start + length;
                if end > buffer.data.len() {
                    return Err(ResourceError::OutOfBounds.into());
                }
                for (i, byte) in buffer.data[start..end].iter_mut().enumerate() {
                    *byte = if pixel.is_empty() {
                        0
                    } else {
                        pixel[i % pixel.len()]
                    };
                }
            }
        }
        state.submissions.push(recorded);
        Ok(())
    }
}

/// A command buffer that records commands into a vector.
#[derive(Debug, Default)]
pub struct MockCommandBuffer {
    commands: Vec<RecordedCommand>,
}

impl MockCommandBuffer {
    /// Creates an empty command buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity / 64),
        }
    }

    /// Returns the commands recorded since the last submission.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }
}

impl CommandBuffer for MockCommandBuffer {
    fn begin_render_pass(&mut self, descriptor: &RenderPassDescriptor) {
        self.commands
            .push(RecordedCommand::BeginRenderPass(descriptor.clone()));
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn bind_pipeline(&mut self, pipeline: PipelineId) {
        self.commands.push(RecordedCommand::BindPipeline(pipeline));
    }

    fn texture_unit(&mut self, index: u32, texture: TextureId) {
        self.commands
            .push(RecordedCommand::TextureUnit { index, texture });
    }

    fn sampler_unit(&mut self, index: u32, sampler: SamplerId) {
        self.commands
            .push(RecordedCommand::SamplerUnit { index, sampler });
    }

    fn uniform_buffer_unit(&mut self, index: u32, buffer: BufferId, offset: u32, size: u32) {
        self.commands.push(RecordedCommand::UniformBufferUnit {
            index,
            buffer,
            offset,
            size,
        });
    }

    fn draw(&mut self, vertex_offset: u32, vertex_count: u32, instance_count: u32) {
        self.commands.push(RecordedCommand::Draw {
            vertex_offset,
            vertex_count,
            instance_count,
        });
    }

    fn draw_indexed(&mut self, index_byte_offset: u32, index_count: u32, instance_count: u32) {
        self.commands.push(RecordedCommand::DrawIndexed {
            index_byte_offset,
            index_count,
            instance_count,
        });
    }

    fn copy_framebuffer_to_buffer(&mut self, info: &CopyFramebufferToBufferInfo) {
        self.commands
            .push(RecordedCommand::CopyFramebufferToBuffer(*info));
    }

    fn reset(&mut self) {
        self.commands.clear();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_resources_are_reported_missing() {
        let device = MockDevice::new();
        let buffer = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 16,
                usage: BufferUsage::Uniform,
                dynamic: true,
                data: None,
            })
            .unwrap();
        assert_eq!(device.live_resource_count(), 1);
        device.destroy_buffer(buffer).unwrap();
        assert!(matches!(
            device.destroy_buffer(buffer),
            Err(ResourceError::NotFound { kind: "buffer", .. })
        ));
        assert_eq!(device.live_resource_count(), 0);
    }

    #[test]
    fn submit_resolves_framebuffer_copies() {
        let device = MockDevice::new();
        device.set_readback_pixel(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let buffer = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 8,
                usage: BufferUsage::PixelTransfer,
                dynamic: true,
                data: None,
            })
            .unwrap();

        let mut commands = device.create_command_buffer(1024);
        commands.copy_framebuffer_to_buffer(&CopyFramebufferToBufferInfo {
            buffer,
            offset: 0,
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            format: DataFormat::Rgba16F,
        });
        device.submit(commands.as_mut()).unwrap();

        let mut pixel = [0u8; 8];
        device.read_buffer(buffer, 0, &mut pixel).unwrap();
        assert_eq!(pixel, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(device.submissions().len(), 1);
    }

    #[test]
    fn fences_follow_scripted_status() {
        let device = MockDevice::new();
        let fence = device.create_fence().unwrap();
        assert_eq!(device.fence_status(fence), FenceStatus::Success);
        device.set_fence_status(FenceStatus::NotReady);
        assert_eq!(device.fence_status(fence), FenceStatus::NotReady);
        device.destroy_fence(fence).unwrap();
        assert_eq!(device.fence_status(fence), FenceStatus::DeviceLost);
    }
}
