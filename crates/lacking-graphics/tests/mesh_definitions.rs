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

mod common;

use common::{engine, quad};
use lacking_graphics::{
    load_shader, EngineConfig, GraphicsError, MaterialInfo, MaterialPassInfo, MeshDefinitionInfo,
    PassKind,
};
use lacking_lsl::Shader;
use std::sync::Arc;

fn plain_pass() -> MaterialPassInfo {
    MaterialPassInfo::new(Arc::new(Shader::default()))
}

#[test]
fn passes_are_compiled_per_assigned_material() {
    let (device, engine) = engine(EngineConfig::default());
    let programs_before = device.program_count();

    let material = engine.create_material(MaterialInfo {
        name: "Stone".to_string(),
        geometry_passes: vec![plain_pass()],
        shadow_passes: vec![plain_pass()],
        ..MaterialInfo::default()
    });
    let definition = engine
        .create_mesh_definition(MeshDefinitionInfo {
            geometry: quad(&engine),
            materials: vec![Some(material)],
        })
        .unwrap();

    assert_eq!(definition.pass_count(PassKind::Geometry), 1);
    assert_eq!(definition.pass_count(PassKind::Shadow), 1);
    assert_eq!(definition.pass_count(PassKind::Forward), 0);
    assert_eq!(device.program_count(), programs_before + 2);

    definition.delete();
    assert_eq!(definition.pass_count(PassKind::Geometry), 0);
    assert_eq!(device.program_count(), programs_before);
}

#[test]
fn too_many_materials_are_rejected() {
    let (_device, engine) = engine(EngineConfig::default());
    let material = engine.create_material(MaterialInfo::default());
    let result = engine.create_mesh_definition(MeshDefinitionInfo {
        geometry: quad(&engine),
        materials: vec![Some(Arc::clone(&material)), Some(material)],
    });
    assert!(matches!(
        result,
        Err(GraphicsError::MaterialSlot { index: 1, count: 1 })
    ));
}

#[test]
fn failed_material_swap_leaves_the_fragment_empty() {
    let (device, engine) = engine(EngineConfig::default());
    let stone = engine.create_material(MaterialInfo {
        name: "Stone".to_string(),
        geometry_passes: vec![plain_pass()],
        ..MaterialInfo::default()
    });
    let glass = engine.create_material(MaterialInfo {
        name: "Glass".to_string(),
        forward_passes: vec![MaterialPassInfo::new(load_shader(
            PassKind::Forward,
            "uniforms { tint vec4 }\nfunc #fragment() {\n #color = tint\n}",
        ))
        .with_blending(true)],
        ..MaterialInfo::default()
    });
    let definition = engine
        .create_mesh_definition(MeshDefinitionInfo {
            geometry: quad(&engine),
            materials: vec![Some(stone)],
        })
        .unwrap();
    let programs_with_stone = device.program_count();

    device.reject_program("Quad/Glass/Forward#0");
    let result = definition.set_material(0, Some(glass));

    assert!(matches!(result, Err(GraphicsError::Resource(_))));
    assert!(definition.material(0).is_none());
    assert_eq!(definition.pass_count(PassKind::Geometry), 0);
    assert_eq!(definition.pass_count(PassKind::Forward), 0);
    assert_eq!(device.program_count(), programs_with_stone - 1);
}

#[test]
fn material_swaps_recompile_in_place() {
    let (device, engine) = engine(EngineConfig::default());
    let stone = engine.create_material(MaterialInfo {
        name: "Stone".to_string(),
        geometry_passes: vec![plain_pass()],
        ..MaterialInfo::default()
    });
    let glass = engine.create_material(MaterialInfo {
        name: "Glass".to_string(),
        forward_passes: vec![plain_pass().with_blending(true).with_depth_write(false)],
        ..MaterialInfo::default()
    });
    let definition = engine
        .create_mesh_definition(MeshDefinitionInfo {
            geometry: quad(&engine),
            materials: vec![Some(stone)],
        })
        .unwrap();
    let programs = device.program_count();

    definition.set_material(0, Some(Arc::clone(&glass))).unwrap();

    assert_eq!(definition.pass_count(PassKind::Geometry), 0);
    assert_eq!(definition.pass_count(PassKind::Forward), 1);
    assert_eq!(device.program_count(), programs);
    assert!(Arc::ptr_eq(&definition.material(0).unwrap(), &glass));

    let pipeline = definition.with_passes(PassKind::Forward, |passes| passes[0].pipeline);
    let pipeline = device.pipeline(pipeline).unwrap();
    assert!(pipeline.blend_enabled);
    assert!(!pipeline.depth_write);
}

#[test]
fn dropping_the_last_reference_frees_device_resources() {
    let (device, engine) = engine(EngineConfig::default());
    let resources_before = device.live_resource_count();

    let material = engine.create_material(MaterialInfo {
        name: "Stone".to_string(),
        geometry_passes: vec![plain_pass()],
        ..MaterialInfo::default()
    });
    let definition = engine
        .create_mesh_definition(MeshDefinitionInfo {
            geometry: quad(&engine),
            materials: vec![Some(material)],
        })
        .unwrap();
    assert!(device.live_resource_count() > resources_before);

    drop(definition);
    assert_eq!(device.live_resource_count(), resources_before);
}

#[test]
fn explicit_delete_is_not_repeated_on_drop() {
    let (device, engine) = engine(EngineConfig::default());
    let geometry = quad(&engine);
    let resources_before = device.live_resource_count();
    geometry.delete();
    let resources_after = device.live_resource_count();
    assert_eq!(resources_after + 3, resources_before);

    drop(geometry);
    assert_eq!(device.live_resource_count(), resources_after);
}
