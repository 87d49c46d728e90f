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

//! Sky backgrounds drawn on the canonical cube.

use crate::constants::texture_slot;
use crate::error::Result;
use crate::material::{Material, MaterialInfo, MaterialPassInfo, MaterialRenderPass, PassKind};
use crate::pipeline::{create_sky_pass_pipeline, sky_uniform_bindings, PassPipelineInfo};
use crate::shader::{MeshProgramConfig, ShaderCollection};
use crate::shape::ShapeSet;
use lacking_core::math::Vec3;
use lacking_core::renderer::{
    GraphicsDevice, PipelineId, ProgramDescriptor, ProgramId, SamplerId, TextureBinding, TextureId,
};
use lacking_lsl::Shader;
use std::borrow::Cow;
use std::sync::{Arc, PoisonError, RwLock};

/// Creation parameters of a sky definition.
#[derive(Debug, Clone, Default)]
pub struct SkyDefinitionInfo {
    /// Color the G-buffer is cleared to while this sky is active.
    pub background_color: Vec3,
    /// Cube texture drawn by the stock skybox program.
    pub skybox: Option<(TextureId, SamplerId)>,
    /// Material whose sky passes replace the stock programs.
    pub material: Option<Arc<Material>>,
}

/// What a sky pass samples.
#[derive(Debug, Clone)]
pub enum SkySource {
    /// A material sky pass with its own textures and properties.
    Material(Arc<MaterialRenderPass>),
    /// A cube texture.
    Texture {
        /// The cube texture.
        texture: TextureId,
        /// Its sampler.
        sampler: SamplerId,
    },
    /// The background color.
    Color,
}

/// A compiled sky pass.
#[derive(Debug, Clone)]
pub struct SkyRenderPass {
    /// Sort layer.
    pub layer: i32,
    /// Compiled program.
    pub program: ProgramId,
    /// Pipeline drawing the cube.
    pub pipeline: PipelineId,
    /// Inputs of the pass.
    pub source: SkySource,
}

/// A sky look shared by any number of [`Sky`] instances.
#[derive(Debug)]
pub struct SkyDefinition {
    device: Arc<dyn GraphicsDevice>,
    background_color: Vec3,
    passes: RwLock<Vec<SkyRenderPass>>,
}

impl SkyDefinition {
    /// Compiles the sky passes against the cube shape.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: &dyn ShaderCollection,
        shapes: &ShapeSet,
        info: SkyDefinitionInfo,
    ) -> Result<Self> {
        let definition = Self {
            device,
            background_color: info.background_color,
            passes: RwLock::new(Vec::new()),
        };
        let stock = Material::new(MaterialInfo {
            name: "Stock Sky".to_string(),
            sky_passes: vec![MaterialPassInfo::new(Arc::new(Shader::default()))],
            ..MaterialInfo::default()
        });

        let config = MeshProgramConfig::default();
        let mut sources = Vec::new();
        match (&info.material, info.skybox) {
            (Some(material), _) if !material.passes(PassKind::Sky).is_empty() => {
                for pass in material.passes(PassKind::Sky) {
                    let code = shaders.build_material_program(PassKind::Sky, &config, &pass.shader);
                    let bindings = pass.texture_set().bindings();
                    sources.push((Arc::clone(pass), code, bindings, SkySource::Material(Arc::clone(pass))));
                }
            }
            (_, Some((texture, sampler))) => sources.push((
                Arc::clone(&stock.passes(PassKind::Sky)[0]),
                shaders.skybox_set(),
                vec![TextureBinding::new("albedoCubeTexture", texture_slot::SKYBOX_ALBEDO)],
                SkySource::Texture { texture, sampler },
            )),
            _ => sources.push((
                Arc::clone(&stock.passes(PassKind::Sky)[0]),
                shaders.skycolor_set(),
                Vec::new(),
                SkySource::Color,
            )),
        }

        for (index, (pass, code, texture_bindings, source)) in sources.into_iter().enumerate() {
            let label = format!("Sky#{}", index);
            let program = match definition.device.create_program(&ProgramDescriptor {
                label: Some(Cow::Borrowed(label.as_str())),
                code,
                texture_bindings: Cow::Owned(texture_bindings),
                uniform_bindings: Cow::Owned(sky_uniform_bindings()),
            }) {
                Ok(program) => program,
                Err(err) => {
                    definition.delete();
                    return Err(err.into());
                }
            };
            let pipeline = create_sky_pass_pipeline(
                definition.device.as_ref(),
                &PassPipelineInfo {
                    label: &label,
                    program,
                    vertex_array: shapes.cube.vertex_array,
                    topology: shapes.cube.topology,
                    pass: &pass,
                },
            );
            let pipeline = match pipeline {
                Ok(pipeline) => pipeline,
                Err(err) => {
                    if let Err(release_err) = definition.device.destroy_program(program) {
                        log::warn!("Failed to release sky program: {}", release_err);
                    }
                    definition.delete();
                    return Err(err.into());
                }
            };
            definition.passes_mut().push(SkyRenderPass {
                layer: pass.layer,
                program,
                pipeline,
                source,
            });
        }
        definition.passes_mut().sort_by_key(|pass| pass.layer);
        Ok(definition)
    }

    /// Color the G-buffer is cleared to.
    pub fn background_color(&self) -> Vec3 {
        self.background_color
    }

    /// Runs `f` over the compiled passes, in layer order.
    pub fn with_passes<R>(&self, f: impl FnOnce(&[SkyRenderPass]) -> R) -> R {
        f(&self.passes.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn passes_mut(&self) -> std::sync::RwLockWriteGuard<'_, Vec<SkyRenderPass>> {
        self.passes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases every compiled pass. Also runs on drop.
    pub fn delete(&self) {
        let passes = std::mem::take(&mut *self.passes_mut());
        for pass in passes {
            if let Err(err) = self.device.destroy_pipeline(pass.pipeline) {
                log::warn!("Failed to release sky pipeline: {}", err);
            }
            if let Err(err) = self.device.destroy_program(pass.program) {
                log::warn!("Failed to release sky program: {}", err);
            }
        }
    }
}

impl Drop for SkyDefinition {
    fn drop(&mut self) {
        self.delete();
    }
}

/// A sky placed in a scene. Only the first active sky is drawn.
#[derive(Debug, Clone)]
pub struct Sky {
    /// The look of the sky.
    pub definition: Arc<SkyDefinition>,
    /// Whether the sky is drawn.
    pub active: bool,
}

impl Sky {
    /// An active sky.
    pub fn new(definition: Arc<SkyDefinition>) -> Self {
        Self {
            definition,
            active: true,
        }
    }
}
