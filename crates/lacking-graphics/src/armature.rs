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

//! Skinning armatures.

use crate::constants::MAX_BONES;
use crate::uniforms::ArmatureUniform;
use lacking_core::math::Mat4;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Batch key of meshes without an armature.
pub const NO_ARMATURE_KEY: u32 = u32::MAX;

static NEXT_ARMATURE_KEY: AtomicU32 = AtomicU32::new(0);

/// Creation parameters of an armature.
#[derive(Debug, Clone, Default)]
pub struct ArmatureInfo {
    /// Inverse bind matrix of each bone.
    pub inverse_bind_matrices: Vec<Mat4>,
}

/// A set of bones whose final matrices are uploaded per batch.
#[derive(Debug)]
pub struct Armature {
    key: u32,
    inverse_bind_matrices: Vec<Mat4>,
    uniform: Mutex<ArmatureUniform>,
}

impl Armature {
    /// Creates an armature in bind pose. Bones past the 256th are dropped.
    pub fn new(mut info: ArmatureInfo) -> Self {
        if info.inverse_bind_matrices.len() > MAX_BONES {
            log::warn!(
                "Armature has {} bones, keeping the first {}",
                info.inverse_bind_matrices.len(),
                MAX_BONES
            );
            info.inverse_bind_matrices.truncate(MAX_BONES);
        }
        Self {
            key: NEXT_ARMATURE_KEY.fetch_add(1, Ordering::Relaxed),
            inverse_bind_matrices: info.inverse_bind_matrices,
            uniform: Mutex::new(ArmatureUniform::default()),
        }
    }

    /// Batch key of meshes using this armature.
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Number of bones.
    pub fn bone_count(&self) -> usize {
        self.inverse_bind_matrices.len()
    }

    /// Poses bone `index` with the world matrix `matrix`.
    ///
    /// # Panics
    /// Panics if `index` is not a bone of this armature.
    pub fn set_bone(&self, index: usize, matrix: Mat4) {
        assert!(
            index < self.inverse_bind_matrices.len(),
            "bone {} out of range ({} bones)",
            index,
            self.inverse_bind_matrices.len()
        );
        self.uniform().bones[index] = matrix * self.inverse_bind_matrices[index];
    }

    /// The current bone matrices.
    pub fn uniform(&self) -> MutexGuard<'_, ArmatureUniform> {
        self.uniform.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lacking_core::math::Vec3;

    #[test]
    fn bones_are_stored_relative_to_bind_pose() {
        let bind = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let armature = Armature::new(ArmatureInfo {
            inverse_bind_matrices: vec![bind.inverse()],
        });
        armature.set_bone(0, Mat4::from_translation(Vec3::new(1.0, 2.0, 0.0)));
        let bone = armature.uniform().bones[0];
        assert!(bone.abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
    }

    #[test]
    fn keys_are_unique() {
        let a = Armature::new(ArmatureInfo::default());
        let b = Armature::new(ArmatureInfo::default());
        assert_ne!(a.key(), b.key());
        assert_ne!(a.key(), NO_ARMATURE_KEY);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn unknown_bones_panic() {
        Armature::new(ArmatureInfo::default()).set_bone(0, Mat4::IDENTITY);
    }
}
