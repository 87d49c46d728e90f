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

#![allow(dead_code)]

use lacking_core::math::Vec3;
use lacking_core::renderer::mock::MockDevice;
use lacking_core::renderer::{ProgramCode, Topology};
use lacking_graphics::mesh_geometry::AttributeFormat;
use lacking_graphics::{
    Engine, EngineConfig, MeshGeometry, MeshGeometryBuilder, MeshProgramConfig, PassKind,
    PostprocessingConfig, ProgramCodeRef, ShaderBuilder, ShaderCollection,
};
use lacking_lsl::Shader;
use std::any::Any;
use std::sync::Arc;

#[derive(Debug)]
pub struct NamedCode(pub &'static str);

impl ProgramCode for NamedCode {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn named(name: &'static str) -> ProgramCodeRef {
    Arc::new(NamedCode(name))
}

/// Hands out placeholder programs named after what they would draw.
#[derive(Debug, Default)]
pub struct StubShaders;

impl ShaderBuilder for StubShaders {
    fn build_material_program(
        &self,
        _kind: PassKind,
        _config: &MeshProgramConfig,
        _shader: &Shader,
    ) -> ProgramCodeRef {
        named("material")
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

/// An engine on a fresh mock device, returning both.
pub fn engine(config: EngineConfig) -> (Arc<MockDevice>, Engine) {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = Arc::new(MockDevice::new());
    let engine = Engine::new(device.clone(), Arc::new(StubShaders), config).unwrap();
    (device, engine)
}

/// A unit quad in the XY plane, made of one triangle list fragment.
pub fn quad(engine: &Engine) -> Arc<MeshGeometry> {
    let info = MeshGeometryBuilder::new("Quad")
        .coords(
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
            AttributeFormat::F32,
        )
        .normals(vec![Vec3::Z; 4], AttributeFormat::F32)
        .indices(vec![0, 1, 2, 0, 2, 3])
        .fragment("Surface", Topology::TriangleList, 0, 6)
        .build()
        .unwrap();
    engine.create_mesh_geometry(info).unwrap()
}
