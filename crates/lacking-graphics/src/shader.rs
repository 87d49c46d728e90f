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

//! The seam between the engine and the host's shader backend.
//!
//! The engine never produces GPU code itself. Stage programs come from a
//! [`ShaderCollection`] and material passes are lowered from their LSL syntax
//! tree by the same host object, through [`ShaderBuilder`].

use crate::config::ToneMappingMode;
use crate::material::PassKind;
use lacking_core::renderer::ProgramCode;
use lacking_lsl::Shader;
use std::fmt::Debug;
use std::sync::Arc;

/// Abstract program code handed to [`GraphicsDevice::create_program`](lacking_core::renderer::GraphicsDevice::create_program).
pub type ProgramCodeRef = Arc<dyn ProgramCode>;

/// Vertex inputs and features a mesh program must account for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MeshProgramConfig {
    /// The geometry has a normal attribute.
    pub has_normals: bool,
    /// The geometry has a tangent attribute.
    pub has_tangents: bool,
    /// The geometry has a texture coordinate attribute.
    pub has_tex_coords: bool,
    /// The geometry has a vertex color attribute.
    pub has_vertex_colors: bool,
    /// The geometry has joint and weight attributes.
    pub skinned: bool,
}

/// Options of the final composite program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostprocessingConfig {
    /// The tone mapping operator.
    pub tone_mapping: ToneMappingMode,
    /// Whether a bloom texture is sampled.
    pub bloom: bool,
}

/// Lowers a material pass's LSL syntax tree to program code.
pub trait ShaderBuilder: Debug + Send + Sync {
    /// Builds the program for one material pass.
    fn build_material_program(
        &self,
        kind: PassKind,
        config: &MeshProgramConfig,
        shader: &Shader,
    ) -> ProgramCodeRef;
}

/// The fixed programs used by the engine's stages.
pub trait ShaderCollection: ShaderBuilder {
    /// Depth-only program used for shadow passes without a custom shader.
    fn shadow_mapping_set(&self, config: &MeshProgramConfig) -> ProgramCodeRef;
    /// Standard PBR G-buffer program used for geometry passes without a custom shader.
    fn pbr_geometry_set(&self, config: &MeshProgramConfig) -> ProgramCodeRef;
    /// Ambient light accumulation over a full screen quad.
    fn ambient_light_set(&self) -> ProgramCodeRef;
    /// Point light accumulation over a sphere volume.
    fn point_light_set(&self) -> ProgramCodeRef;
    /// Spot light accumulation over a cone volume.
    fn spot_light_set(&self) -> ProgramCodeRef;
    /// Directional light accumulation over a full screen quad.
    fn directional_light_set(&self) -> ProgramCodeRef;
    /// Cube textured sky.
    fn skybox_set(&self) -> ProgramCodeRef;
    /// Solid color sky.
    fn skycolor_set(&self) -> ProgramCodeRef;
    /// HDR to 1×1 luminance downsample.
    fn exposure_set(&self) -> ProgramCodeRef;
    /// HDR to half resolution downsample.
    fn bloom_downsample_set(&self) -> ProgramCodeRef;
    /// Separable Gaussian blur.
    fn bloom_blur_set(&self) -> ProgramCodeRef;
    /// Final tone mapped composite.
    fn postprocessing_set(&self, config: &PostprocessingConfig) -> ProgramCodeRef;
    /// Colored debug lines.
    fn debug_set(&self) -> ProgramCodeRef;
}

/// Returns whether the syntax tree carries no user code at all.
fn is_empty_shader(shader: &Shader) -> bool {
    shader.functions().next().is_none()
}

/// Picks the program for a material pass: shaders without functions fall
/// back to the collection's stock programs where one exists.
pub(crate) fn material_program(
    shaders: &dyn ShaderCollection,
    kind: PassKind,
    config: &MeshProgramConfig,
    shader: &Shader,
) -> ProgramCodeRef {
    match kind {
        PassKind::Shadow if is_empty_shader(shader) => shaders.shadow_mapping_set(config),
        PassKind::Geometry if is_empty_shader(shader) => shaders.pbr_geometry_set(config),
        _ => shaders.build_material_program(kind, config, shader),
    }
}

/// Parses and validates a material shader for `kind`.
///
/// Errors are logged and replaced by an empty syntax tree, so a broken
/// shader degrades the material instead of aborting its creation.
pub fn load_shader(kind: PassKind, source: &str) -> Arc<Shader> {
    match lacking_lsl::parse_and_validate(source, &kind.schema()) {
        Ok(shader) => Arc::new(shader),
        Err(err) => {
            log::error!("Invalid {:?} shader at {}: {}", kind, err.position(), err);
            Arc::new(Shader::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_shaders_become_empty() {
        let shader = load_shader(PassKind::Geometry, "uniforms { color vec4\n");
        assert!(shader.declarations.is_empty());
    }

    #[test]
    fn reserved_names_are_rejected_softly() {
        let shader = load_shader(PassKind::Forward, "uniforms { #color vec4 }");
        assert!(shader.declarations.is_empty());
    }

    #[test]
    fn valid_shaders_are_kept() {
        let shader = load_shader(
            PassKind::Forward,
            "uniforms { color vec4 }\nfunc #fragment() {\n #color = color\n}",
        );
        assert_eq!(shader.declarations.len(), 2);
    }
}
