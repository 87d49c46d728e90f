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

//! Geometry bound to per-fragment materials, with compiled passes cached.

use crate::error::{GraphicsError, Result};
use crate::material::{Material, MaterialRenderPass, PassKind};
use crate::mesh_geometry::{MeshFragment, MeshGeometry};
use crate::pipeline::{
    create_forward_pass_pipeline, create_geometry_pass_pipeline, create_shadow_pass_pipeline,
    mesh_uniform_bindings, PassPipelineInfo,
};
use crate::shader::{material_program, ShaderCollection};
use lacking_core::renderer::{GraphicsDevice, PipelineId, ProgramDescriptor, ProgramId};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

static NEXT_PASS_KEY: AtomicU32 = AtomicU32::new(0);

/// Pass kinds a mesh definition compiles. Sky passes belong to sky
/// definitions and postprocess passes are not drawn per mesh.
const MESH_PASS_KINDS: [PassKind; 3] = [PassKind::Geometry, PassKind::Shadow, PassKind::Forward];

/// A compiled, frame invariant pass of one mesh fragment.
#[derive(Debug, Clone)]
pub struct MeshRenderPass {
    /// Sort layer.
    pub layer: i32,
    /// Compiled program.
    pub program: ProgramId,
    /// Pipeline drawing the fragment.
    pub pipeline: PipelineId,
    /// Byte offset of the first index.
    pub index_byte_offset: u32,
    /// Number of indices.
    pub index_count: u32,
    /// Process-wide unique batch discriminator.
    pub key: u32,
    /// Textures and properties of the pass.
    pub material_pass: Arc<MaterialRenderPass>,
}

/// Creation parameters of a mesh definition.
#[derive(Debug, Clone)]
pub struct MeshDefinitionInfo {
    /// The geometry to draw.
    pub geometry: Arc<MeshGeometry>,
    /// One optional material per geometry fragment.
    pub materials: Vec<Option<Arc<Material>>>,
}

#[derive(Debug, Default)]
struct DefinitionState {
    materials: Vec<Option<Arc<Material>>>,
    fragment_passes: Vec<[Vec<MeshRenderPass>; PassKind::COUNT]>,
    passes: [Vec<MeshRenderPass>; PassKind::COUNT],
}

impl DefinitionState {
    fn refresh(&mut self) {
        for kind in PassKind::ALL {
            let flattened = self
                .fragment_passes
                .iter()
                .flat_map(|passes| passes[kind.index()].iter().cloned())
                .collect();
            self.passes[kind.index()] = flattened;
        }
    }
}

/// A mesh geometry together with the materials of its fragments.
#[derive(Debug)]
pub struct MeshDefinition {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    geometry: Arc<MeshGeometry>,
    state: RwLock<DefinitionState>,
}

impl MeshDefinition {
    /// Compiles the passes of every assigned material.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        info: MeshDefinitionInfo,
    ) -> Result<Self> {
        let fragment_count = info.geometry.fragments().len();
        if info.materials.len() > fragment_count {
            return Err(GraphicsError::MaterialSlot {
                index: info.materials.len() - 1,
                count: fragment_count,
            });
        }
        let definition = Self {
            device,
            shaders,
            geometry: info.geometry,
            state: RwLock::new(DefinitionState {
                materials: vec![None; fragment_count],
                fragment_passes: (0..fragment_count).map(|_| Default::default()).collect(),
                passes: Default::default(),
            }),
        };
        for (index, material) in info.materials.into_iter().enumerate() {
            if material.is_some() {
                if let Err(err) = definition.set_material(index, material) {
                    definition.delete();
                    return Err(err);
                }
            }
        }
        Ok(definition)
    }

    /// The drawn geometry.
    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    /// The material of fragment `index`.
    pub fn material(&self, index: usize) -> Option<Arc<Material>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .materials
            .get(index)
            .cloned()
            .flatten()
    }

    /// Replaces the material of fragment `index`, releasing the old passes and
    /// compiling the new ones.
    ///
    /// # Errors
    /// Fails when the index is out of range or the device rejects a program
    /// or pipeline. The fragment is left without a material in that case.
    pub fn set_material(&self, index: usize, material: Option<Arc<Material>>) -> Result<()> {
        let fragment = self
            .geometry
            .fragments()
            .get(index)
            .ok_or(GraphicsError::MaterialSlot {
                index,
                count: self.geometry.fragments().len(),
            })?;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old = std::mem::take(&mut state.fragment_passes[index]);
        self.release_passes(old.iter().flatten());
        state.materials[index] = None;

        let compiled = match &material {
            Some(material) => self.compile(fragment, material),
            None => Ok(Default::default()),
        };
        let result = match compiled {
            Ok(passes) => {
                state.fragment_passes[index] = passes;
                state.materials[index] = material;
                Ok(())
            }
            Err(err) => Err(err),
        };
        state.refresh();
        result
    }

    /// Runs `f` over the flattened passes of one kind.
    pub fn with_passes<R>(&self, kind: PassKind, f: impl FnOnce(&[MeshRenderPass]) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state.passes[kind.index()])
    }

    /// Number of compiled passes of one kind.
    pub fn pass_count(&self, kind: PassKind) -> usize {
        self.with_passes(kind, |passes| passes.len())
    }

    /// Releases every compiled pass. The geometry is not deleted. Also runs on
    /// drop.
    pub fn delete(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let fragment_passes = std::mem::take(&mut state.fragment_passes);
        self.release_passes(fragment_passes.iter().flatten().flatten());
        state.materials.iter_mut().for_each(|material| *material = None);
        state.fragment_passes = (0..fragment_passes.len()).map(|_| Default::default()).collect();
        state.refresh();
    }

    fn compile(
        &self,
        fragment: &MeshFragment,
        material: &Material,
    ) -> Result<[Vec<MeshRenderPass>; PassKind::COUNT]> {
        let mut compiled: [Vec<MeshRenderPass>; PassKind::COUNT] = Default::default();
        let config = self.geometry.program_config();
        for kind in MESH_PASS_KINDS {
            for (pass_index, pass) in material.passes(kind).iter().enumerate() {
                let label = format!(
                    "{}/{}/{:?}#{}",
                    self.geometry.name(),
                    material.name(),
                    kind,
                    pass_index
                );
                match self.compile_pass(&label, kind, fragment, pass, &config) {
                    Ok(render_pass) => compiled[kind.index()].push(render_pass),
                    Err(err) => {
                        self.release_passes(compiled.iter().flatten());
                        return Err(err);
                    }
                }
            }
        }
        Ok(compiled)
    }

    fn compile_pass(
        &self,
        label: &str,
        kind: PassKind,
        fragment: &MeshFragment,
        pass: &Arc<MaterialRenderPass>,
        config: &crate::shader::MeshProgramConfig,
    ) -> Result<MeshRenderPass> {
        let code = material_program(self.shaders.as_ref(), kind, config, &pass.shader);
        let program = self.device.create_program(&ProgramDescriptor {
            label: Some(Cow::Borrowed(label)),
            code,
            texture_bindings: Cow::Owned(pass.texture_set().bindings()),
            uniform_bindings: Cow::Owned(mesh_uniform_bindings()),
        })?;
        let info = PassPipelineInfo {
            label,
            program,
            vertex_array: self.geometry.vertex_array(),
            topology: fragment.topology,
            pass,
        };
        let pipeline = match kind {
            PassKind::Shadow => create_shadow_pass_pipeline(self.device.as_ref(), &info),
            PassKind::Geometry => create_geometry_pass_pipeline(self.device.as_ref(), &info),
            _ => create_forward_pass_pipeline(self.device.as_ref(), &info),
        };
        let pipeline = match pipeline {
            Ok(pipeline) => pipeline,
            Err(err) => {
                if let Err(release_err) = self.device.destroy_program(program) {
                    log::warn!("Failed to release program '{}': {}", label, release_err);
                }
                return Err(err.into());
            }
        };
        Ok(MeshRenderPass {
            layer: pass.layer,
            program,
            pipeline,
            index_byte_offset: fragment.index_byte_offset,
            index_count: fragment.index_count,
            key: NEXT_PASS_KEY.fetch_add(1, Ordering::Relaxed),
            material_pass: Arc::clone(pass),
        })
    }

    fn release_passes<'a>(&self, passes: impl Iterator<Item = &'a MeshRenderPass>) {
        for pass in passes {
            if let Err(err) = self.device.destroy_pipeline(pass.pipeline) {
                log::warn!("Failed to release mesh pipeline: {}", err);
            }
            if let Err(err) = self.device.destroy_program(pass.program) {
                log::warn!("Failed to release mesh program: {}", err);
            }
        }
    }
}

impl Drop for MeshDefinition {
    fn drop(&mut self) {
        self.delete();
    }
}
