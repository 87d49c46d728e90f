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

//! Fixed binding contracts shared with the host's shader builder.

/// Uniform block binding slots.
pub mod uniform_slot {
    /// Camera matrices and position.
    pub const CAMERA: u32 = 0;
    /// Per-instance model matrices.
    pub const MODEL: u32 = 1;
    /// Material properties.
    pub const MATERIAL: u32 = 2;
    /// Bone matrices.
    pub const ARMATURE: u32 = 3;
    /// Light matrices.
    pub const LIGHT: u32 = 4;
    /// Light color, range and cone parameters.
    pub const LIGHT_PROPERTIES: u32 = 5;
    /// Sky parameters, in passes without a model block.
    pub const SKYBOX: u32 = 1;
    /// Postprocess parameters, in passes without a camera block.
    pub const POSTPROCESS: u32 = 0;
}

/// Texture units.
pub mod texture_slot {
    /// Material albedo in geometry passes.
    pub const GEOMETRY_ALBEDO: u32 = 0;
    /// G-buffer albedo and metallic.
    pub const LIGHTING_FB_COLOR0: u32 = 0;
    /// G-buffer normal and roughness.
    pub const LIGHTING_FB_COLOR1: u32 = 1;
    /// G-buffer third attachment.
    pub const LIGHTING_FB_COLOR2: u32 = 2;
    /// Scene depth.
    pub const LIGHTING_FB_DEPTH: u32 = 3;
    /// Directional shadow map.
    pub const SHADOW_FB_DEPTH: u32 = 4;
    /// Ambient reflection cube.
    pub const LIGHTING_REFLECTION: u32 = 4;
    /// Ambient refraction cube.
    pub const LIGHTING_REFRACTION: u32 = 5;
    /// Input of postprocess passes.
    pub const POSTPROCESS_FB_COLOR0: u32 = 0;
    /// Bloom input of the tone mapping pass.
    pub const POSTPROCESS_BLOOM: u32 = 1;
    /// Sky cube texture.
    pub const SKYBOX_ALBEDO: u32 = 0;
}

/// Vertex attribute locations.
pub mod attribute {
    /// Position.
    pub const COORD: u32 = 0;
    /// Normal.
    pub const NORMAL: u32 = 1;
    /// Tangent.
    pub const TANGENT: u32 = 2;
    /// Texture coordinate.
    pub const TEX_COORD: u32 = 3;
    /// Vertex color.
    pub const COLOR: u32 = 4;
    /// Skinning weights.
    pub const WEIGHTS: u32 = 5;
    /// Skinning joint indices.
    pub const JOINTS: u32 = 6;
}

/// Maximum instances per draw call and entries in the model uniform block.
pub const MAX_BATCH_SIZE: usize = 256;

/// Maximum bones per armature.
pub const MAX_BONES: usize = 256;

/// Number of named texture slots in a material pass.
pub const TEXTURE_SET_SIZE: usize = 8;

/// Smallest size attachments are created with before the first frame.
pub const MIN_ATTACHMENT_SIZE: u32 = 32;

/// Bytes of the debug line vertex buffer, split into two halves.
pub const DEBUG_LINE_BUFFER_SIZE: u32 = 1024 * 1024;
