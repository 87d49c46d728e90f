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

//! Pipeline creation helpers that pin the state each pass kind cares about.

use crate::constants::{texture_slot, uniform_slot};
use crate::material::MaterialRenderPass;
use lacking_core::renderer::{
    BlendState, ColorMask, GraphicsDevice, PipelineDescriptor, PipelineId, ProgramId,
    ResourceError, TextureBinding, Topology, UniformBinding, VertexArrayId,
};
use std::borrow::Cow;

/// Inputs shared by every material pipeline helper.
#[derive(Debug, Clone, Copy)]
pub struct PassPipelineInfo<'a> {
    /// Debug label.
    pub label: &'a str,
    /// Compiled program.
    pub program: ProgramId,
    /// Geometry vertex array.
    pub vertex_array: VertexArrayId,
    /// Fragment topology.
    pub topology: Topology,
    /// Resolved material render state.
    pub pass: &'a MaterialRenderPass,
}

impl PassPipelineInfo<'_> {
    fn descriptor(&self) -> PipelineDescriptor<'_> {
        PipelineDescriptor {
            label: Some(Cow::Borrowed(self.label)),
            program: self.program,
            vertex_array: self.vertex_array,
            topology: self.topology,
            culling: self.pass.culling,
            front_face: self.pass.front_face,
            depth_test: self.pass.depth_test,
            depth_write: self.pass.depth_write,
            depth_comparison: self.pass.depth_comparison,
            stencil_test: false,
            color_write: ColorMask::ALL,
            blend_enabled: self.pass.blending,
            blend: BlendState::ALPHA,
        }
    }
}

/// Depth-only pipeline: no color writes, no blending.
pub fn create_shadow_pass_pipeline(
    device: &dyn GraphicsDevice,
    info: &PassPipelineInfo<'_>,
) -> Result<PipelineId, ResourceError> {
    device.create_pipeline(&PipelineDescriptor {
        depth_test: true,
        depth_write: true,
        color_write: ColorMask::NONE,
        blend_enabled: false,
        ..info.descriptor()
    })
}

/// G-buffer pipeline: blending and stencil disabled.
pub fn create_geometry_pass_pipeline(
    device: &dyn GraphicsDevice,
    info: &PassPipelineInfo<'_>,
) -> Result<PipelineId, ResourceError> {
    device.create_pipeline(&PipelineDescriptor {
        stencil_test: false,
        color_write: ColorMask::ALL,
        blend_enabled: false,
        ..info.descriptor()
    })
}

/// Forward pipeline: the material's state as is.
pub fn create_forward_pass_pipeline(
    device: &dyn GraphicsDevice,
    info: &PassPipelineInfo<'_>,
) -> Result<PipelineId, ResourceError> {
    device.create_pipeline(&info.descriptor())
}

/// Sky pipeline: never writes depth.
pub fn create_sky_pass_pipeline(
    device: &dyn GraphicsDevice,
    info: &PassPipelineInfo<'_>,
) -> Result<PipelineId, ResourceError> {
    device.create_pipeline(&PipelineDescriptor {
        depth_write: false,
        color_write: ColorMask::RGB,
        ..info.descriptor()
    })
}

/// Uniform block names of mesh passes.
pub(crate) fn mesh_uniform_bindings() -> Vec<UniformBinding> {
    vec![
        UniformBinding::new("Camera", uniform_slot::CAMERA),
        UniformBinding::new("Model", uniform_slot::MODEL),
        UniformBinding::new("Material", uniform_slot::MATERIAL),
        UniformBinding::new("Armature", uniform_slot::ARMATURE),
    ]
}

/// Uniform block names of sky passes.
pub(crate) fn sky_uniform_bindings() -> Vec<UniformBinding> {
    vec![
        UniformBinding::new("Camera", uniform_slot::CAMERA),
        UniformBinding::new("Skybox", uniform_slot::SKYBOX),
        UniformBinding::new("Material", uniform_slot::MATERIAL),
    ]
}

/// Texture unit names of light passes.
pub(crate) fn lighting_texture_bindings() -> Vec<TextureBinding> {
    vec![
        TextureBinding::new("fbColor0TextureIn", texture_slot::LIGHTING_FB_COLOR0),
        TextureBinding::new("fbColor1TextureIn", texture_slot::LIGHTING_FB_COLOR1),
        TextureBinding::new("fbColor2TextureIn", texture_slot::LIGHTING_FB_COLOR2),
        TextureBinding::new("fbDepthTextureIn", texture_slot::LIGHTING_FB_DEPTH),
        TextureBinding::new("fbShadowTextureIn", texture_slot::SHADOW_FB_DEPTH),
        TextureBinding::new("reflectionTextureIn", texture_slot::LIGHTING_REFLECTION),
        TextureBinding::new("refractionTextureIn", texture_slot::LIGHTING_REFRACTION),
    ]
}

/// Uniform block names of light passes.
pub(crate) fn lighting_uniform_bindings() -> Vec<UniformBinding> {
    vec![
        UniformBinding::new("Camera", uniform_slot::CAMERA),
        UniformBinding::new("Light", uniform_slot::LIGHT),
        UniformBinding::new("LightProperties", uniform_slot::LIGHT_PROPERTIES),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, MaterialInfo, MaterialPassInfo, PassKind};
    use lacking_core::renderer::mock::MockDevice;
    use lacking_lsl::Shader;
    use std::sync::Arc;

    #[test]
    fn shadow_pipelines_never_write_color() {
        let material = Material::new(MaterialInfo {
            shadow_passes: vec![MaterialPassInfo::new(Arc::new(Shader::default())).with_blending(true)],
            ..MaterialInfo::default()
        });
        let pass = &material.passes(PassKind::Shadow)[0];

        let device = MockDevice::new();
        let shapes = crate::shape::ShapeSet::new(&device).unwrap();
        let program = device
            .create_program(&lacking_core::renderer::ProgramDescriptor {
                label: None,
                code: Arc::new(crate::testing::NamedCode("shadow")),
                texture_bindings: Cow::Borrowed(&[]),
                uniform_bindings: Cow::Owned(mesh_uniform_bindings()),
            })
            .unwrap();
        let pipeline = create_shadow_pass_pipeline(
            &device,
            &PassPipelineInfo {
                label: "Shadow",
                program,
                vertex_array: shapes.cube.vertex_array,
                topology: Topology::TriangleList,
                pass,
            },
        )
        .unwrap();

        let created = device.pipeline(pipeline).unwrap();
        assert_eq!(created.color_write, ColorMask::NONE);
        assert!(!created.blend_enabled);
        assert!(created.depth_write);
    }
}
