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

//! Per-frame debug line overlays.

use bytemuck::{Pod, Zeroable};
use lacking_core::math::Vec3;

/// A colored line segment drawn on top of the forward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Start point in world space.
    pub start: Vec3,
    /// End point in world space.
    pub end: Vec3,
    /// Linear RGB color.
    pub color: Vec3,
}

impl DebugLine {
    /// Creates a line.
    pub fn new(start: Vec3, end: Vec3, color: Vec3) -> Self {
        Self { start, end, color }
    }

    pub(crate) fn vertices(&self) -> [DebugVertex; 2] {
        let color = [
            (self.color.x.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.color.y.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.color.z.clamp(0.0, 1.0) * 255.0).round() as u8,
            255,
        ];
        [
            DebugVertex {
                position: self.start.to_array(),
                color,
            },
            DebugVertex {
                position: self.end.to_array(),
                color,
            },
        ]
    }
}

/// GPU layout of a debug line vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct DebugVertex {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

/// Bytes per debug vertex.
pub(crate) const DEBUG_VERTEX_SIZE: u32 = std::mem::size_of::<DebugVertex>() as u32;
