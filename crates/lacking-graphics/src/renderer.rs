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

//! Queues mesh passes, sorts them and draws them in instanced batches.

use crate::armature::{Armature, NO_ARMATURE_KEY};
use crate::constants::{uniform_slot, MAX_BATCH_SIZE};
use crate::material::{MaterialRenderPass, PassKind};
use crate::mesh::{Mesh, StaticMesh};
use crate::ubo::{write_uniform, UniformBlockBuffer, UniformPlacement};
use crate::uniforms::ModelUniform;
use lacking_core::math::{Mat4, Vec3};
use lacking_core::renderer::{CommandBuffer, PipelineId};
use std::sync::Arc;

/// One mesh pass instance waiting to be drawn.
#[derive(Debug, Clone)]
pub struct MeshRenderItem {
    /// Sort layer.
    pub layer: i32,
    /// Batch key of the compiled pass.
    pub material_key: u32,
    /// Batch key of the armature, or [`NO_ARMATURE_KEY`].
    pub armature_key: u32,
    /// Pipeline to draw with.
    pub pipeline: PipelineId,
    /// Textures and properties.
    pub material: Arc<MaterialRenderPass>,
    /// Model to world transform.
    pub model: Mat4,
    /// Bones, when skinned.
    pub armature: Option<Arc<Armature>>,
    /// Byte offset of the first index.
    pub index_byte_offset: u32,
    /// Number of indices.
    pub index_count: u32,
}

/// Per-stage queue of mesh pass instances.
#[derive(Debug, Default)]
pub struct MeshRenderer {
    items: Vec<MeshRenderItem>,
    model: ModelUniform,
}

impl MeshRenderer {
    /// Creates an empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queues every `kind` pass of an active mesh.
    pub fn queue_mesh(&mut self, mesh: &Mesh, kind: PassKind) {
        if !mesh.active {
            return;
        }
        let armature_key = mesh
            .armature
            .as_ref()
            .map_or(NO_ARMATURE_KEY, |armature| armature.key());
        mesh.definition.with_passes(kind, |passes| {
            self.items.extend(passes.iter().map(|pass| MeshRenderItem {
                layer: pass.layer,
                material_key: pass.key,
                armature_key,
                pipeline: pass.pipeline,
                material: Arc::clone(&pass.material_pass),
                model: mesh.matrix,
                armature: mesh.armature.clone(),
                index_byte_offset: pass.index_byte_offset,
                index_count: pass.index_count,
            }));
        });
    }

    /// Queues every `kind` pass of an active static mesh within camera range.
    pub fn queue_static_mesh(&mut self, mesh: &StaticMesh, camera_position: Vec3, kind: PassKind) {
        if !mesh.active || !mesh.in_range(camera_position) {
            return;
        }
        let armature_key = mesh
            .armature
            .as_ref()
            .map_or(NO_ARMATURE_KEY, |armature| armature.key());
        mesh.definition.with_passes(kind, |passes| {
            self.items.extend(passes.iter().map(|pass| MeshRenderItem {
                layer: pass.layer,
                material_key: pass.key,
                armature_key,
                pipeline: pass.pipeline,
                material: Arc::clone(&pass.material_pass),
                model: mesh.matrix,
                armature: mesh.armature.clone(),
                index_byte_offset: pass.index_byte_offset,
                index_count: pass.index_count,
            }));
        });
    }

    /// Drops queued items without drawing.
    pub fn discard(&mut self) {
        self.items.clear();
    }

    /// Sorts, batches and draws the queue, then clears it. Returns the number
    /// of draw calls issued. Batches whose uniforms no longer fit in
    /// `uniforms` are skipped.
    pub fn render(
        &mut self,
        commands: &mut dyn CommandBuffer,
        uniforms: &mut UniformBlockBuffer,
        camera: UniformPlacement,
    ) -> usize {
        self.items
            .sort_by_key(|item| (item.layer, item.material_key, item.armature_key));

        let mut draws = 0;
        let mut start = 0;
        while start < self.items.len() {
            let first = &self.items[start];
            let mut end = start + 1;
            while end < self.items.len()
                && end - start < MAX_BATCH_SIZE
                && self.items[end].material_key == first.material_key
                && self.items[end].armature_key == first.armature_key
            {
                end += 1;
            }
            if self.render_batch(commands, uniforms, camera, start, end) {
                draws += 1;
            }
            start = end;
        }
        self.items.clear();
        draws
    }

    fn render_batch(
        &mut self,
        commands: &mut dyn CommandBuffer,
        uniforms: &mut UniformBlockBuffer,
        camera: UniformPlacement,
        start: usize,
        end: usize,
    ) -> bool {
        let batch = &self.items[start..end];
        let template = &batch[0];

        let material_placement = {
            let material_uniforms = template.material.uniform_set();
            if material_uniforms.is_empty() {
                None
            } else {
                match write_uniform(uniforms, &*material_uniforms) {
                    Some(placement) => Some(placement),
                    None => return false,
                }
            }
        };
        let armature_placement = match &template.armature {
            Some(armature) => match write_uniform(uniforms, &*armature.uniform()) {
                Some(placement) => Some(placement),
                None => return false,
            },
            None => None,
        };
        self.model.clear();
        for item in batch {
            self.model.push(item.model);
        }
        let Some(model_placement) = write_uniform(uniforms, &self.model) else {
            return false;
        };

        commands.bind_pipeline(template.pipeline);
        bind_uniform(commands, uniform_slot::CAMERA, camera);
        if let Some(placement) = material_placement {
            bind_uniform(commands, uniform_slot::MATERIAL, placement);
        }
        template.material.texture_set().bind(commands);
        if let Some(placement) = armature_placement {
            bind_uniform(commands, uniform_slot::ARMATURE, placement);
        }
        bind_uniform(commands, uniform_slot::MODEL, model_placement);

        commands.draw_indexed(
            template.index_byte_offset,
            template.index_count,
            batch.len() as u32,
        );
        true
    }
}

/// Binds a placement to a uniform block slot.
pub(crate) fn bind_uniform(commands: &mut dyn CommandBuffer, slot: u32, placement: UniformPlacement) {
    commands.uniform_buffer_unit(slot, placement.buffer, placement.offset, placement.size);
}
