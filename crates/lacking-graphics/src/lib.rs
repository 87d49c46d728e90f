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

//! # Lacking Graphics
//!
//! The rendering core: a scene database indexed by loose octrees, a chain of
//! render stages (shadows, deferred geometry and lighting, forward, exposure,
//! bloom, tone mapping) and an instanced mesh batcher that packs per-frame
//! uniforms into one shared STD140 buffer.
//!
//! Everything is recorded through the abstract device of [`lacking_core`], so
//! any backend that implements [`GraphicsDevice`](lacking_core::renderer::GraphicsDevice)
//! and a [`ShaderCollection`] can drive it.

#![warn(missing_docs)]

pub mod armature;
pub mod camera;
pub mod config;
pub mod constants;
pub mod debug;
pub mod engine;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod mesh_definition;
pub mod mesh_geometry;
pub mod pipeline;
pub mod renderer;
pub mod scene;
pub mod shader;
pub mod shape;
pub mod sky;
pub mod stage;
pub mod texture_set;
pub mod ubo;
pub mod uniform_set;
pub mod uniforms;

pub use self::armature::{Armature, ArmatureInfo};
pub use self::camera::{Camera, FovMode};
pub use self::config::{BloomConfig, EngineConfig, ExposureFormat, ToneMappingMode};
pub use self::debug::DebugLine;
pub use self::engine::Engine;
pub use self::error::{GraphicsError, Result};
pub use self::light::{AmbientLight, DirectionalLight, PointLight, SpotLight};
pub use self::material::{Material, MaterialInfo, MaterialPassInfo, PassKind};
pub use self::mesh::{Mesh, StaticMesh};
pub use self::mesh_definition::{MeshDefinition, MeshDefinitionInfo};
pub use self::mesh_geometry::{MeshGeometry, MeshGeometryBuilder, MeshGeometryInfo};
pub use self::scene::{Handle, Scene};
pub use self::shader::{
    load_shader, MeshProgramConfig, PostprocessingConfig, ProgramCodeRef, ShaderBuilder,
    ShaderCollection,
};
pub use self::sky::{Sky, SkyDefinition, SkyDefinitionInfo, SkySource};
pub use self::stage::{Stage, StageBuilder, StageContext, StageProvider};

#[cfg(test)]
pub(crate) mod testing {
    use crate::material::PassKind;
    use crate::shader::{
        MeshProgramConfig, PostprocessingConfig, ProgramCodeRef, ShaderBuilder, ShaderCollection,
    };
    use lacking_core::renderer::ProgramCode;
    use lacking_lsl::Shader;
    use std::any::Any;
    use std::sync::Arc;

    /// Program code that only carries a name.
    #[derive(Debug)]
    pub(crate) struct NamedCode(pub &'static str);

    impl ProgramCode for NamedCode {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// A shader collection handing out named placeholder programs.
    #[derive(Debug, Default)]
    pub(crate) struct StubShaders;

    fn named(name: &'static str) -> ProgramCodeRef {
        Arc::new(NamedCode(name))
    }

    impl ShaderBuilder for StubShaders {
        fn build_material_program(
            &self,
            kind: PassKind,
            _config: &MeshProgramConfig,
            _shader: &Shader,
        ) -> ProgramCodeRef {
            match kind {
                PassKind::Shadow => named("custom shadow"),
                PassKind::Geometry => named("custom geometry"),
                PassKind::Forward => named("custom forward"),
                PassKind::Sky => named("custom sky"),
                PassKind::Postprocess => named("custom postprocess"),
            }
        }
    }

    impl ShaderCollection for StubShaders {
        fn shadow_mapping_set(&self, _config: &MeshProgramConfig) -> ProgramCodeRef {
            named("shadow")
        }
        fn pbr_geometry_set(&self, _config: &MeshProgramConfig) -> ProgramCodeRef {
            named("pbr geometry")
        }
        fn ambient_light_set(&self) -> ProgramCodeRef {
            named("ambient light")
        }
        fn point_light_set(&self) -> ProgramCodeRef {
            named("point light")
        }
        fn spot_light_set(&self) -> ProgramCodeRef {
            named("spot light")
        }
        fn directional_light_set(&self) -> ProgramCodeRef {
            named("directional light")
        }
        fn skybox_set(&self) -> ProgramCodeRef {
            named("skybox")
        }
        fn skycolor_set(&self) -> ProgramCodeRef {
            named("skycolor")
        }
        fn exposure_set(&self) -> ProgramCodeRef {
            named("exposure")
        }
        fn bloom_downsample_set(&self) -> ProgramCodeRef {
            named("bloom downsample")
        }
        fn bloom_blur_set(&self) -> ProgramCodeRef {
            named("bloom blur")
        }
        fn postprocessing_set(&self, _config: &PostprocessingConfig) -> ProgramCodeRef {
            named("postprocessing")
        }
        fn debug_set(&self) -> ProgramCodeRef {
            named("debug")
        }
    }
}
