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

//! Mesh instances placed in a scene.

use crate::armature::Armature;
use crate::mesh_definition::MeshDefinition;
use crate::scene::Spatial;
use lacking_core::math::{Mat4, Vec3};
use std::sync::Arc;

fn bounding_sphere(definition: &MeshDefinition, matrix: &Mat4) -> (Vec3, f32) {
    let scale = matrix
        .x_axis
        .truncate()
        .length()
        .max(matrix.y_axis.truncate().length())
        .max(matrix.z_axis.truncate().length());
    (
        matrix.w_axis.truncate(),
        definition.geometry().bounding_radius() * scale,
    )
}

/// A movable mesh instance.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// What to draw.
    pub definition: Arc<MeshDefinition>,
    /// Model to world transform.
    pub matrix: Mat4,
    /// Optional skinning armature.
    pub armature: Option<Arc<Armature>>,
    /// Whether the mesh is drawn.
    pub active: bool,
}

impl Mesh {
    /// An active mesh at the origin.
    pub fn new(definition: Arc<MeshDefinition>) -> Self {
        Self {
            definition,
            matrix: Mat4::IDENTITY,
            armature: None,
            active: true,
        }
    }
}

impl Spatial for Mesh {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        bounding_sphere(&self.definition, &self.matrix)
    }
}

/// An immovable mesh instance, filtered by camera distance.
#[derive(Debug, Clone)]
pub struct StaticMesh {
    /// What to draw.
    pub definition: Arc<MeshDefinition>,
    /// Model to world transform.
    pub matrix: Mat4,
    /// Optional skinning armature.
    pub armature: Option<Arc<Armature>>,
    /// Whether the mesh is drawn.
    pub active: bool,
}

impl StaticMesh {
    /// An active static mesh placed at `matrix`.
    pub fn new(definition: Arc<MeshDefinition>, matrix: Mat4) -> Self {
        Self {
            definition,
            matrix,
            armature: None,
            active: true,
        }
    }

    /// Whether a camera at `camera_position` is within the geometry's
    /// distance range.
    pub fn in_range(&self, camera_position: Vec3) -> bool {
        let (min, max) = self.definition.geometry().distance_range();
        let distance = camera_position.distance(self.matrix.w_axis.truncate());
        distance >= min && distance <= max
    }
}

impl Spatial for StaticMesh {
    fn bounding_sphere(&self) -> (Vec3, f32) {
        bounding_sphere(&self.definition, &self.matrix)
    }
}
