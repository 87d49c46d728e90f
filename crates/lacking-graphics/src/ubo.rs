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

//! A per-frame uniform block buffer with aligned suballocation.
//!
//! Every uniform block written during a frame lands in one CPU-side staging
//! area that mirrors a single dynamic GPU buffer. Placements are aligned to the
//! device's uniform offset alignment and padded to 16 bytes, and the whole used
//! range is written to the GPU with one call at the end of the frame.

use lacking_core::math::{align_up, Mat4, Vec4};
use lacking_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, GraphicsDevice, ResourceError,
};
use std::borrow::Cow;

/// Padding granularity of every placement (one matrix row).
pub const PLACEMENT_PADDING: u32 = 16;

/// A region of the uniform block buffer reserved for one uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformPlacement {
    /// The GPU buffer holding the block.
    pub buffer: BufferId,
    /// Byte offset of the block inside the buffer.
    pub offset: u32,
    /// Padded byte size of the block.
    pub size: u32,
}

/// A dynamic uniform buffer of fixed capacity shared by all stages.
#[derive(Debug)]
pub struct UniformBlockBuffer {
    buffer: BufferId,
    data: Vec<u8>,
    head: u32,
    alignment: u32,
    exhausted: bool,
}

impl UniformBlockBuffer {
    /// Creates the GPU buffer and its CPU staging copy.
    pub fn new(device: &dyn GraphicsDevice, capacity: u32) -> Result<Self, ResourceError> {
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(Cow::Borrowed("Uniform Block Buffer")),
            size: capacity,
            usage: BufferUsage::Uniform,
            dynamic: true,
            data: None,
        })?;
        Ok(Self {
            buffer,
            data: vec![0; capacity as usize],
            head: 0,
            alignment: device.limits().uniform_buffer_offset_alignment.max(1),
            exhausted: false,
        })
    }

    /// The GPU buffer backing every placement.
    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    /// Number of bytes handed out since the last reset.
    pub fn used(&self) -> u32 {
        self.head
    }

    /// Whether a placement was refused since the last reset.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Rewinds the write head. Called once at frame start.
    pub fn reset(&mut self) {
        self.head = 0;
        self.exhausted = false;
    }

    /// Reserves `size` bytes, returning where they live.
    ///
    /// Returns `None` when the reservation does not fit in the remaining
    /// capacity. The head is left untouched so smaller blocks may still fit,
    /// and the first refusal of a frame is logged.
    pub fn placement(&mut self, size: u32) -> Option<UniformPlacement> {
        let offset = align_up(self.head, self.alignment);
        let size = align_up(size, PLACEMENT_PADDING);
        let end = offset as usize + size as usize;
        if end > self.data.len() {
            if !self.exhausted {
                log::warn!(
                    "Uniform block buffer exhausted: {} of {} bytes requested, skipping draws for this frame.",
                    end,
                    self.data.len()
                );
                self.exhausted = true;
            }
            return None;
        }
        self.head = offset + size;
        Some(UniformPlacement {
            buffer: self.buffer,
            offset,
            size,
        })
    }

    /// Returns a plotter over the bytes of `placement`.
    pub fn plotter(&mut self, placement: UniformPlacement) -> Plotter<'_> {
        let start = placement.offset as usize;
        let end = start + placement.size as usize;
        Plotter::new(&mut self.data[start..end])
    }

    /// Writes `[0, head)` to the GPU in a single call.
    pub fn upload(&self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        if self.head == 0 {
            return Ok(());
        }
        device.write_buffer(self.buffer, 0, &self.data[..self.head as usize])
    }

    /// Destroys the GPU buffer.
    pub fn release(&mut self, device: &dyn GraphicsDevice) {
        if let Err(err) = device.destroy_buffer(self.buffer) {
            log::warn!("Failed to release uniform block buffer: {}", err);
        }
        self.head = 0;
    }
}

/// A bounds-checked cursor writing little-endian data into a placement.
#[derive(Debug)]
pub struct Plotter<'a> {
    target: &'a mut [u8],
    offset: usize,
}

impl<'a> Plotter<'a> {
    /// Wraps `target`, starting at its first byte.
    pub fn new(target: &'a mut [u8]) -> Self {
        Self { target, offset: 0 }
    }

    /// Current cursor position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Moves the cursor to `offset`.
    pub fn seek(&mut self, offset: usize) {
        assert!(offset <= self.target.len(), "plotter seek out of bounds");
        self.offset = offset;
    }

    /// Advances the cursor by `count` bytes without writing.
    pub fn skip(&mut self, count: usize) {
        self.seek(self.offset + count);
    }

    /// Writes raw bytes at the cursor.
    ///
    /// # Panics
    /// Panics when the bytes extend past the end of the placement.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.offset + bytes.len();
        assert!(
            end <= self.target.len(),
            "plotter overflow: writing {} bytes at {} into {}",
            bytes.len(),
            self.offset,
            self.target.len()
        );
        self.target[self.offset..end].copy_from_slice(bytes);
        self.offset = end;
    }

    /// Writes a single float.
    pub fn write_f32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a four component vector.
    pub fn write_vec4(&mut self, value: Vec4) {
        self.write_bytes(bytemuck::bytes_of(&value));
    }

    /// Writes a column-major matrix.
    pub fn write_mat4(&mut self, value: &Mat4) {
        self.write_bytes(bytemuck::bytes_of(value));
    }
}

/// A value with an STD140 uniform block layout.
pub trait Std140 {
    /// Number of bytes [`Std140::std140_plot`] writes.
    fn std140_size(&self) -> u32;

    /// Writes exactly [`Std140::std140_size`] bytes at the plotter's cursor.
    fn std140_plot(&self, plotter: &mut Plotter<'_>);
}

/// Reserves a placement for `uniform`, plots it and returns the placement,
/// or `None` when the buffer is full.
pub fn write_uniform<U: Std140 + ?Sized>(
    buffer: &mut UniformBlockBuffer,
    uniform: &U,
) -> Option<UniformPlacement> {
    let size = uniform.std140_size();
    let placement = buffer.placement(size)?;
    let mut plotter = buffer.plotter(placement);
    uniform.std140_plot(&mut plotter);
    debug_assert_eq!(
        plotter.offset(),
        size as usize,
        "std140_plot wrote a different amount than std140_size"
    );
    Some(placement)
}

/// Implements [`Std140`] for `#[repr(C)]` [`bytemuck::Pod`] structs whose
/// field order already satisfies the STD140 rules.
macro_rules! impl_std140_pod {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::ubo::Std140 for $ty {
                fn std140_size(&self) -> u32 {
                    std::mem::size_of::<$ty>() as u32
                }

                fn std140_plot(&self, plotter: &mut $crate::ubo::Plotter<'_>) {
                    plotter.write_bytes(bytemuck::bytes_of(self));
                }
            }
        )*
    };
}

pub(crate) use impl_std140_pod;

#[cfg(test)]
mod tests {
    use super::*;
    use lacking_core::renderer::mock::MockDevice;
    use lacking_core::renderer::DeviceLimits;

    struct Raw(Vec<u8>);

    impl Std140 for Raw {
        fn std140_size(&self) -> u32 {
            self.0.len() as u32
        }

        fn std140_plot(&self, plotter: &mut Plotter<'_>) {
            plotter.write_bytes(&self.0);
        }
    }

    fn device(alignment: u32) -> MockDevice {
        MockDevice::new().with_limits(DeviceLimits {
            uniform_buffer_offset_alignment: alignment,
            ..DeviceLimits::default()
        })
    }

    #[test]
    fn placements_are_aligned_and_padded() {
        let device = device(256);
        let mut buffer = UniformBlockBuffer::new(&device, 4096).unwrap();

        let first = buffer.placement(20).unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.size, 32);

        let second = buffer.placement(64).unwrap();
        assert_eq!(second.offset, 256);
        assert_eq!(second.size, 64);

        assert_eq!(buffer.used(), 320);
        buffer.reset();
        assert_eq!(buffer.placement(4).unwrap().offset, 0);
    }

    #[test]
    fn upload_writes_the_used_range_once() {
        let device = device(64);
        let mut buffer = UniformBlockBuffer::new(&device, 1024).unwrap();
        write_uniform(&mut buffer, &Raw(vec![1; 16])).unwrap();
        write_uniform(&mut buffer, &Raw(vec![2; 40])).unwrap();
        buffer.upload(&device).unwrap();

        let writes = device.buffer_writes();
        assert_eq!(writes, vec![(buffer.buffer(), 0, 64 + 48)]);
        let stored = device.buffer(buffer.buffer()).unwrap().data;
        assert_eq!(&stored[0..16], &[1; 16]);
        assert_eq!(&stored[64..104], &[2; 40]);
    }

    #[test]
    fn empty_frames_skip_the_upload() {
        let device = device(256);
        let buffer = UniformBlockBuffer::new(&device, 1024).unwrap();
        buffer.upload(&device).unwrap();
        assert!(device.buffer_writes().is_empty());
    }

    #[test]
    fn overflowing_placements_are_refused() {
        let device = device(256);
        let mut buffer = UniformBlockBuffer::new(&device, 512).unwrap();
        assert!(buffer.placement(256).is_some());
        assert!(buffer.placement(512).is_none());
        assert!(buffer.is_exhausted());
        assert_eq!(buffer.used(), 256);

        // A smaller block still fits behind the refused one.
        let tail = buffer.placement(200).unwrap();
        assert_eq!((tail.offset, tail.size), (256, 208));

        buffer.reset();
        assert!(!buffer.is_exhausted());
        assert!(write_uniform(&mut buffer, &Raw(vec![0; 512])).is_some());
    }

    #[test]
    #[should_panic(expected = "plotter overflow")]
    fn plotter_rejects_writes_past_the_end() {
        let mut bytes = [0u8; 8];
        let mut plotter = Plotter::new(&mut bytes);
        plotter.write_f32(1.0);
        plotter.write_vec4(Vec4::ONE);
    }
}
