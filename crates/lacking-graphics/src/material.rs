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

//! Materials: named collections of render passes per stage type.

use crate::texture_set::TextureSet;
use crate::uniform_set::{PropertyValue, UniformSet};
use lacking_core::renderer::{Comparison, CullMode, FaceOrientation, SamplerId, TextureId};
use lacking_lsl::{Schema, Shader};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The stage type a material pass is drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    /// G-buffer fill.
    Geometry,
    /// Shadow map depth.
    Shadow,
    /// Forward shading after lighting.
    Forward,
    /// Sky background.
    Sky,
    /// Full screen effects.
    Postprocess,
}

impl PassKind {
    /// Number of pass kinds.
    pub const COUNT: usize = 5;

    /// Every pass kind, in index order.
    pub const ALL: [PassKind; PassKind::COUNT] = [
        PassKind::Geometry,
        PassKind::Shadow,
        PassKind::Forward,
        PassKind::Sky,
        PassKind::Postprocess,
    ];

    /// Dense index used by per-kind tables.
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// The validation schema of shaders written for this kind.
    pub fn schema(&self) -> Schema {
        match self {
            PassKind::Geometry => Schema::geometry(),
            PassKind::Shadow => Schema::shadow(),
            PassKind::Forward => Schema::forward(),
            PassKind::Sky => Schema::sky(),
            PassKind::Postprocess => Schema::postprocess(),
        }
    }

    fn default_culling(&self) -> CullMode {
        match self {
            PassKind::Sky => CullMode::Front,
            PassKind::Postprocess => CullMode::None,
            _ => CullMode::Back,
        }
    }

    fn default_depth_write(&self) -> bool {
        !matches!(self, PassKind::Sky | PassKind::Postprocess)
    }

    fn default_depth_test(&self) -> bool {
        !matches!(self, PassKind::Postprocess)
    }
}

/// Creation parameters of a single material pass. Unset render states take
/// the defaults of the pass kind they are used for.
#[derive(Debug, Clone)]
pub struct MaterialPassInfo {
    /// Sort layer inside the stage.
    pub layer: i32,
    /// Face culling.
    pub culling: Option<CullMode>,
    /// Winding of front faces.
    pub front_face: Option<FaceOrientation>,
    /// Depth testing.
    pub depth_test: Option<bool>,
    /// Depth writing.
    pub depth_write: Option<bool>,
    /// Depth comparison function.
    pub depth_comparison: Option<Comparison>,
    /// Alpha blending.
    pub blending: Option<bool>,
    /// The pass's shader.
    pub shader: Arc<Shader>,
}

impl MaterialPassInfo {
    /// A pass with default render state.
    pub fn new(shader: Arc<Shader>) -> Self {
        Self {
            layer: 0,
            culling: None,
            front_face: None,
            depth_test: None,
            depth_write: None,
            depth_comparison: None,
            blending: None,
            shader,
        }
    }

    /// Sets the sort layer.
    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    /// Sets face culling.
    pub fn with_culling(mut self, culling: CullMode) -> Self {
        self.culling = Some(culling);
        self
    }

    /// Enables or disables blending.
    pub fn with_blending(mut self, blending: bool) -> Self {
        self.blending = Some(blending);
        self
    }

    /// Enables or disables depth writes.
    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = Some(depth_write);
        self
    }
}

/// Creation parameters of a material.
#[derive(Debug, Clone, Default)]
pub struct MaterialInfo {
    /// Debug name.
    pub name: String,
    /// G-buffer passes.
    pub geometry_passes: Vec<MaterialPassInfo>,
    /// Shadow map passes.
    pub shadow_passes: Vec<MaterialPassInfo>,
    /// Forward passes.
    pub forward_passes: Vec<MaterialPassInfo>,
    /// Sky passes.
    pub sky_passes: Vec<MaterialPassInfo>,
    /// Postprocess passes.
    pub postprocess_passes: Vec<MaterialPassInfo>,
}

/// A material pass with its render state resolved and its property blocks
/// laid out.
#[derive(Debug)]
pub struct MaterialRenderPass {
    /// Sort layer inside the stage.
    pub layer: i32,
    /// Face culling.
    pub culling: CullMode,
    /// Winding of front faces.
    pub front_face: FaceOrientation,
    /// Depth testing.
    pub depth_test: bool,
    /// Depth writing.
    pub depth_write: bool,
    /// Depth comparison function.
    pub depth_comparison: Comparison,
    /// Alpha blending.
    pub blending: bool,
    /// The pass's shader.
    pub shader: Arc<Shader>,
    texture_set: RwLock<TextureSet>,
    uniform_set: RwLock<UniformSet>,
}

impl MaterialRenderPass {
    fn new(kind: PassKind, info: MaterialPassInfo) -> Self {
        Self {
            layer: info.layer,
            culling: info.culling.unwrap_or_else(|| kind.default_culling()),
            front_face: info.front_face.unwrap_or_default(),
            depth_test: info.depth_test.unwrap_or_else(|| kind.default_depth_test()),
            depth_write: info.depth_write.unwrap_or_else(|| kind.default_depth_write()),
            depth_comparison: info.depth_comparison.unwrap_or(Comparison::LessOrEqual),
            blending: info.blending.unwrap_or(false),
            texture_set: RwLock::new(TextureSet::from_shader(&info.shader)),
            uniform_set: RwLock::new(UniformSet::from_shader(&info.shader)),
            shader: info.shader,
        }
    }

    /// Read access to the texture slots.
    pub fn texture_set(&self) -> RwLockReadGuard<'_, TextureSet> {
        self.texture_set.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the texture slots.
    pub fn texture_set_mut(&self) -> RwLockWriteGuard<'_, TextureSet> {
        self.texture_set.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read access to the property block.
    pub fn uniform_set(&self) -> RwLockReadGuard<'_, UniformSet> {
        self.uniform_set.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the property block.
    pub fn uniform_set_mut(&self) -> RwLockWriteGuard<'_, UniformSet> {
        self.uniform_set.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A named set of render passes, shared by every mesh that uses it.
#[derive(Debug)]
pub struct Material {
    name: String,
    passes: [Vec<Arc<MaterialRenderPass>>; PassKind::COUNT],
}

impl Material {
    /// Resolves every pass of `info`.
    pub fn new(info: MaterialInfo) -> Self {
        let resolve = |kind: PassKind, passes: Vec<MaterialPassInfo>| {
            passes
                .into_iter()
                .map(|pass| Arc::new(MaterialRenderPass::new(kind, pass)))
                .collect::<Vec<_>>()
        };
        Self {
            passes: [
                resolve(PassKind::Geometry, info.geometry_passes),
                resolve(PassKind::Shadow, info.shadow_passes),
                resolve(PassKind::Forward, info.forward_passes),
                resolve(PassKind::Sky, info.sky_passes),
                resolve(PassKind::Postprocess, info.postprocess_passes),
            ],
            name: info.name,
        }
    }

    /// The debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The passes of one kind.
    pub fn passes(&self, kind: PassKind) -> &[Arc<MaterialRenderPass>] {
        &self.passes[kind.index()]
    }

    fn all_passes(&self) -> impl Iterator<Item = &Arc<MaterialRenderPass>> {
        self.passes.iter().flatten()
    }

    /// Writes a property into every pass that declares it.
    pub fn set_property<T: PropertyValue>(&self, name: &str, value: T) {
        for pass in self.all_passes() {
            let mut uniforms = pass.uniform_set_mut();
            if uniforms.entry(name).is_some() {
                uniforms.set_property(name, value);
            }
        }
    }

    /// Binds a texture and sampler into every pass that declares `name`.
    pub fn set_texture(&self, name: &str, texture: TextureId, sampler: SamplerId) {
        for pass in self.all_passes() {
            let mut textures = pass.texture_set_mut();
            textures.set_texture(name, texture);
            textures.set_sampler(name, sampler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::load_shader;
    use lacking_core::math::Vec4;

    fn material() -> Material {
        let geometry = load_shader(
            PassKind::Geometry,
            "textures { albedo sampler2D }\nuniforms { color vec4\n metallic float\n}",
        );
        let sky = load_shader(PassKind::Sky, "uniforms { color vec4 }");
        Material::new(MaterialInfo {
            name: "Painted".to_string(),
            geometry_passes: vec![MaterialPassInfo::new(geometry).with_layer(2)],
            sky_passes: vec![MaterialPassInfo::new(sky)],
            ..MaterialInfo::default()
        })
    }

    #[test]
    fn render_state_defaults_depend_on_the_pass_kind() {
        let material = material();
        let geometry = &material.passes(PassKind::Geometry)[0];
        assert_eq!(geometry.layer, 2);
        assert_eq!(geometry.culling, CullMode::Back);
        assert!(geometry.depth_write);

        let sky = &material.passes(PassKind::Sky)[0];
        assert_eq!(sky.culling, CullMode::Front);
        assert!(sky.depth_test);
        assert!(!sky.depth_write);
        assert!(material.passes(PassKind::Shadow).is_empty());
    }

    #[test]
    fn properties_reach_every_declaring_pass() {
        let material = material();
        material.set_property("color", Vec4::new(0.5, 0.5, 0.5, 1.0));
        material.set_property("metallic", 1.0f32);

        for kind in [PassKind::Geometry, PassKind::Sky] {
            let pass = &material.passes(kind)[0];
            assert_eq!(
                pass.uniform_set().property::<Vec4>("color"),
                Some(Vec4::new(0.5, 0.5, 0.5, 1.0))
            );
        }
        let geometry = &material.passes(PassKind::Geometry)[0];
        assert_eq!(geometry.uniform_set().property::<f32>("metallic"), Some(1.0));
    }

    #[test]
    fn textures_bind_by_name() {
        let material = material();
        material.set_texture("albedo", TextureId(4), SamplerId(5));
        let pass = &material.passes(PassKind::Geometry)[0];
        let textures = pass.texture_set();
        assert_eq!(textures.slots()[0].texture, Some(TextureId(4)));
        assert_eq!(textures.slots()[0].sampler, Some(SamplerId(5)));
    }
}
