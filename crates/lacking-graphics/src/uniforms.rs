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

//! Fixed uniform block layouts shared with the host's shaders.

use crate::constants::{MAX_BATCH_SIZE, MAX_BONES};
use crate::ubo::{impl_std140_pod, Plotter, Std140};
use bytemuck::{Pod, Zeroable};
use lacking_core::math::{Mat4, Vec4};

/// Per-frame camera block, bound at the camera slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct CameraUniform {
    /// Projection matrix.
    pub projection: Mat4,
    /// View matrix (inverse of the camera matrix).
    pub view: Mat4,
    /// Camera world matrix.
    pub camera: Mat4,
    /// Viewport `x, y, width, height`.
    pub viewport: Vec4,
    /// Seconds since the engine started.
    pub time: f32,
    /// Exposure applied to forward passes.
    pub exposure: f32,
    _padding: [f32; 2],
}

impl CameraUniform {
    /// Builds the block from its parts.
    pub fn new(projection: Mat4, view: Mat4, camera: Mat4, viewport: Vec4, time: f32, exposure: f32) -> Self {
        Self {
            projection,
            view,
            camera,
            viewport,
            time,
            exposure,
            _padding: [0.0; 2],
        }
    }
}

/// Per-batch model matrices, one per instance.
#[derive(Debug, Clone)]
pub struct ModelUniform {
    matrices: Box<[Mat4; MAX_BATCH_SIZE]>,
    count: usize,
}

impl Default for ModelUniform {
    fn default() -> Self {
        Self {
            matrices: Box::new([Mat4::IDENTITY; MAX_BATCH_SIZE]),
            count: 0,
        }
    }
}

impl ModelUniform {
    /// Forgets all matrices.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Appends an instance matrix.
    ///
    /// # Panics
    /// Panics when the block already holds 256 matrices.
    pub fn push(&mut self, matrix: Mat4) {
        assert!(self.count < MAX_BATCH_SIZE, "model uniform block is full");
        self.matrices[self.count] = matrix;
        self.count += 1;
    }

    /// Number of matrices pushed since the last clear.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no matrix has been pushed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Std140 for ModelUniform {
    fn std140_size(&self) -> u32 {
        (MAX_BATCH_SIZE * std::mem::size_of::<Mat4>()) as u32
    }

    fn std140_plot(&self, plotter: &mut Plotter<'_>) {
        plotter.write_bytes(bytemuck::cast_slice(&self.matrices[..self.count]));
        plotter.skip((MAX_BATCH_SIZE - self.count) * std::mem::size_of::<Mat4>());
    }
}

/// Bone matrices of an armature.
#[derive(Debug, Clone)]
pub struct ArmatureUniform {
    /// Final bone matrices, already multiplied by their inverse bind matrix.
    pub bones: Box<[Mat4; MAX_BONES]>,
}

impl Default for ArmatureUniform {
    fn default() -> Self {
        Self {
            bones: Box::new([Mat4::IDENTITY; MAX_BONES]),
        }
    }
}

impl Std140 for ArmatureUniform {
    fn std140_size(&self) -> u32 {
        (MAX_BONES * std::mem::size_of::<Mat4>()) as u32
    }

    fn std140_plot(&self, plotter: &mut Plotter<'_>) {
        plotter.write_bytes(bytemuck::cast_slice(&self.bones[..]));
    }
}

/// Light matrices, bound at the light slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LightUniform {
    /// Shadow projection matrix.
    pub shadow_projection: Mat4,
    /// Shadow view matrix.
    pub shadow_view: Mat4,
    /// Light volume model matrix.
    pub model: Mat4,
    /// Cascade split distances.
    pub cascade_distances: Vec4,
}

/// Light color and shape parameters, bound at the light properties slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LightPropertiesUniform {
    /// Emitted color, with intensity premultiplied.
    pub color: Vec4,
    /// World position (`w` unused).
    pub position: Vec4,
    /// Emit range or outer radius.
    pub range: f32,
    /// Inner radius or inner cone angle.
    pub inner: f32,
    /// Outer cone angle.
    pub outer: f32,
    /// `1.0` when a shadow map is bound.
    pub shadowed: f32,
}

/// Sky parameters, bound at the skybox slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct SkyboxUniform {
    /// Background color.
    pub color: Vec4,
}

/// Tone mapping parameters, bound at the postprocess slot.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PostprocessUniform {
    /// Exposure multiplier applied before tone mapping.
    pub exposure: f32,
    /// `1.0` when a bloom texture is bound.
    pub bloom: f32,
    _padding: [f32; 2],
}

impl PostprocessUniform {
    /// Builds the block.
    pub fn new(exposure: f32, bloom: bool) -> Self {
        Self {
            exposure,
            bloom: if bloom { 1.0 } else { 0.0 },
            _padding: [0.0; 2],
        }
    }
}

/// Blur direction of one bloom pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct BloomBlurUniform {
    /// `1` for horizontal, `0` for vertical.
    pub horizontal: u32,
    _padding: [u32; 3],
}

impl BloomBlurUniform {
    /// Builds the block.
    pub fn new(horizontal: bool) -> Self {
        Self {
            horizontal: horizontal as u32,
            _padding: [0; 3],
        }
    }
}

impl_std140_pod!(
    CameraUniform,
    LightUniform,
    LightPropertiesUniform,
    SkyboxUniform,
    PostprocessUniform,
    BloomBlurUniform,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_blocks_are_multiples_of_sixteen() {
        assert_eq!(CameraUniform::default().std140_size(), 224);
        assert_eq!(LightUniform::default().std140_size(), 208);
        assert_eq!(LightPropertiesUniform::default().std140_size(), 48);
        assert_eq!(PostprocessUniform::default().std140_size(), 16);
        assert_eq!(BloomBlurUniform::new(true).std140_size(), 16);
    }

    #[test]
    fn model_block_always_spans_sixteen_kib() {
        let mut model = ModelUniform::default();
        model.push(Mat4::from_translation(lacking_core::math::Vec3::X));
        assert_eq!(model.std140_size(), 16 * 1024);

        let mut bytes = vec![0u8; 16 * 1024];
        let mut plotter = Plotter::new(&mut bytes);
        model.std140_plot(&mut plotter);
        assert_eq!(plotter.offset(), 16 * 1024);
        // Translation x of the first matrix lives in column 3.
        let x = f32::from_le_bytes([bytes[48], bytes[49], bytes[50], bytes[51]]);
        assert_eq!(x, 1.0);
    }
}
