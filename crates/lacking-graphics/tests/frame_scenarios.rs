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
use lacking_core::math::{Mat4, Vec3, Vec4};
use lacking_core::renderer::mock::{MockDevice, MockTextureKind, RecordedCommand};
use lacking_core::renderer::{
    CullMode, DataFormat, FramebufferId, LoadOp, Operations, RenderPassDescriptor, Topology,
    Viewport,
};
use lacking_graphics::constants::texture_slot;
use lacking_graphics::mesh_geometry::AttributeFormat;
use lacking_graphics::{
    Camera, DirectionalLight, Engine, EngineConfig, ExposureFormat, MaterialInfo,
    MaterialPassInfo, Mesh, MeshDefinition, MeshDefinitionInfo, MeshGeometryBuilder, PointLight,
    Scene, SpotLight, StaticMesh,
};
use lacking_lsl::Shader;
use std::sync::Arc;
use std::time::Duration;

const SCREEN: FramebufferId = FramebufferId(0);

fn render_pass<'a>(commands: &'a [RecordedCommand], label: &str) -> &'a RenderPassDescriptor {
    commands
        .iter()
        .find_map(|command| match command {
            RecordedCommand::BeginRenderPass(pass) if pass.label == Some(label) => Some(pass),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no {} pass recorded", label))
}

/// Instance counts of the indexed draws issued inside the pass labelled `label`.
fn instanced_draws(commands: &[RecordedCommand], label: &str) -> Vec<u32> {
    let mut inside = false;
    let mut draws = Vec::new();
    for command in commands {
        match command {
            RecordedCommand::BeginRenderPass(pass) => inside = pass.label == Some(label),
            RecordedCommand::EndRenderPass => inside = false,
            RecordedCommand::DrawIndexed { instance_count, .. } if inside => {
                draws.push(*instance_count)
            }
            _ => {}
        }
    }
    draws
}

/// Labels of the pipelines bound inside the pass labelled `label`.
fn bound_pipelines(device: &MockDevice, commands: &[RecordedCommand], label: &str) -> Vec<String> {
    let mut inside = false;
    let mut labels = Vec::new();
    for command in commands {
        match command {
            RecordedCommand::BeginRenderPass(pass) => inside = pass.label == Some(label),
            RecordedCommand::EndRenderPass => inside = false,
            RecordedCommand::BindPipeline(pipeline) if inside => labels.push(
                device
                    .pipeline(*pipeline)
                    .and_then(|pipeline| pipeline.label)
                    .unwrap_or_default(),
            ),
            _ => {}
        }
    }
    labels
}

fn plain_definition(engine: &Engine, name: &str) -> Arc<MeshDefinition> {
    let material = engine.create_material(MaterialInfo {
        name: name.to_string(),
        geometry_passes: vec![MaterialPassInfo::new(Arc::new(Shader::default()))],
        ..MaterialInfo::default()
    });
    engine
        .create_mesh_definition(MeshDefinitionInfo {
            geometry: quad(engine),
            materials: vec![Some(material)],
        })
        .unwrap()
}

fn render_frame(engine: &mut Engine, scene: &mut Scene, camera: &mut Camera) {
    engine.render_with_delta(
        scene,
        camera,
        SCREEN,
        Viewport::new(0, 0, 128, 128),
        &[],
        Duration::from_millis(16),
    );
}

#[test]
fn empty_scene_clears_the_geometry_buffer() {
    let (device, mut engine) = engine(EngineConfig::default());
    let mut scene = engine.create_scene();
    let mut camera = Camera::default();

    engine.render_with_delta(
        &mut scene,
        &mut camera,
        SCREEN,
        Viewport::new(0, 0, 320, 240),
        &[],
        Duration::from_millis(16),
    );

    let commands = device.last_submission();
    let geometry = render_pass(&commands, "Geometry");
    assert_eq!(geometry.depth, Some(Operations::clear(1.0)));
    assert_eq!(geometry.stencil, Some(Operations::clear(0)));
    assert_eq!(
        geometry.color_attachments[0],
        Some(Operations::clear(Vec4::new(0.0, 0.0, 0.0, 1.0)))
    );
    assert!(instanced_draws(&commands, "Geometry").is_empty());

    let tone_mapping = render_pass(&commands, "Tone Mapping");
    assert_eq!(tone_mapping.framebuffer, SCREEN);
    assert_eq!(tone_mapping.viewport, Viewport::new(0, 0, 320, 240));
    assert!(matches!(
        tone_mapping.color_attachments[0].map(|ops| ops.load),
        Some(LoadOp::DontCare)
    ));
}

#[test]
fn auto_exposure_converges_to_middle_grey() {
    let (device, mut engine) = engine(EngineConfig {
        exposure_format: Some(ExposureFormat::Rgba16f),
        ..EngineConfig::default()
    });
    // Every channel reads back as 1.0 in half precision.
    device.set_readback_pixel([0x00, 0x3C].repeat(4));

    let mut scene = engine.create_scene();
    let mut camera = Camera {
        auto_exposure: true,
        ..Camera::default()
    };
    for _ in 0..4 {
        engine.render_with_delta(
            &mut scene,
            &mut camera,
            SCREEN,
            Viewport::new(0, 0, 64, 64),
            &[],
            Duration::from_secs(1),
        );
    }

    let expected = 1.0 / std::f32::consts::TAU;
    assert!(
        (camera.exposure - expected).abs() <= expected * 0.01,
        "exposure {} did not reach {}",
        camera.exposure,
        expected
    );
}

#[test]
fn exposure_stays_put_when_disabled() {
    let (device, mut engine) = engine(EngineConfig::default());
    device.set_readback_pixel([0x00, 0x3C].repeat(4));
    let mut scene = engine.create_scene();
    let mut camera = Camera::default();
    for _ in 0..3 {
        engine.render_with_delta(
            &mut scene,
            &mut camera,
            SCREEN,
            Viewport::new(0, 0, 64, 64),
            &[],
            Duration::from_secs(1),
        );
    }
    assert_eq!(camera.exposure, 1.0);
    assert_eq!(device.fence_count(), 0);
}

#[test]
fn bloom_targets_follow_half_the_viewport() {
    let (device, mut engine) = engine(EngineConfig::default());
    let mut scene = engine.create_scene();
    let mut camera = Camera::default();

    engine.render_with_delta(
        &mut scene,
        &mut camera,
        SCREEN,
        Viewport::new(0, 0, 100, 100),
        &[],
        Duration::ZERO,
    );

    for label in ["Bloom Ping", "Bloom Pong"] {
        let textures = device.textures_labelled(label);
        assert_eq!(textures.len(), 1, "{} should be allocated once", label);
        let (_, texture) = &textures[0];
        assert_eq!(texture.kind, MockTextureKind::Color2D);
        assert_eq!((texture.width, texture.height), (50, 50));
        assert_eq!(texture.format, DataFormat::Rgba16F);
    }

    let hdr = device.textures_labelled("Forward HDR");
    assert_eq!((hdr[0].1.width, hdr[0].1.height), (100, 100));
}

#[test]
fn identical_meshes_are_drawn_in_full_batches() {
    let (device, mut engine) = engine(EngineConfig::default());
    let material = engine.create_material(MaterialInfo {
        name: "Plain".to_string(),
        geometry_passes: vec![MaterialPassInfo::new(Arc::new(Shader::default()))],
        ..MaterialInfo::default()
    });
    let definition = engine
        .create_mesh_definition(MeshDefinitionInfo {
            geometry: quad(&engine),
            materials: vec![Some(material)],
        })
        .unwrap();

    let mut scene = engine.create_scene();
    for i in 0..300 {
        let mut mesh = Mesh::new(Arc::clone(&definition));
        mesh.matrix = Mat4::from_translation(Vec3::new(
            (i % 20) as f32 * 0.5 - 5.0,
            (i / 20) as f32 * 0.5 - 4.0,
            -20.0,
        ));
        scene.create_mesh(mesh);
    }
    let mut camera = Camera::default();

    engine.render_with_delta(
        &mut scene,
        &mut camera,
        SCREEN,
        Viewport::new(0, 0, 640, 480),
        &[],
        Duration::ZERO,
    );

    let mut draws = instanced_draws(&device.last_submission(), "Geometry");
    draws.sort_unstable();
    assert_eq!(draws, [44, 256]);
}

#[test]
fn uniform_blocks_are_uploaded_once_per_frame() {
    let (device, mut engine) = engine(EngineConfig {
        debug_lines_enabled: false,
        ..EngineConfig::default()
    });
    let mut scene = engine.create_scene();
    let mut camera = Camera::default();

    for frame in 1..=3 {
        engine.render_with_delta(
            &mut scene,
            &mut camera,
            SCREEN,
            Viewport::new(0, 0, 128, 128),
            &[],
            Duration::from_millis(16),
        );
        let uniform_writes = device
            .buffer_writes()
            .into_iter()
            .filter(|(buffer, _, _)| {
                device
                    .buffer(*buffer)
                    .and_then(|buffer| buffer.label)
                    .as_deref()
                    == Some("Uniform Block Buffer")
            })
            .count();
        assert_eq!(uniform_writes, frame);
    }
}

#[test]
fn released_engines_leave_no_resources_behind() {
    let (device, mut engine) = engine(EngineConfig::default());
    let mut scene = engine.create_scene();
    let mut camera = Camera {
        auto_exposure: true,
        ..Camera::default()
    };
    engine.render_with_delta(
        &mut scene,
        &mut camera,
        SCREEN,
        Viewport::new(0, 0, 128, 128),
        &[],
        Duration::ZERO,
    );
    let submissions = device.submissions().len();

    engine.release();
    assert_eq!(device.live_resource_count(), 0);

    engine.render_with_delta(
        &mut scene,
        &mut camera,
        SCREEN,
        Viewport::new(0, 0, 128, 128),
        &[],
        Duration::ZERO,
    );
    assert_eq!(device.submissions().len(), submissions);
}

#[test]
fn static_meshes_outside_their_distance_range_are_skipped() {
    let (device, mut engine) = engine(EngineConfig::default());
    let info = MeshGeometryBuilder::new("Billboard")
        .coords(
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
            AttributeFormat::F32,
        )
        .indices(vec![0, 1, 2, 0, 2, 3])
        .fragment("Surface", Topology::TriangleList, 0, 6)
        .distance_range(0.0, 15.0)
        .build()
        .unwrap();
    let material = engine.create_material(MaterialInfo {
        name: "Plain".to_string(),
        geometry_passes: vec![MaterialPassInfo::new(Arc::new(Shader::default()))],
        ..MaterialInfo::default()
    });
    let definition = engine
        .create_mesh_definition(MeshDefinitionInfo {
            geometry: engine.create_mesh_geometry(info).unwrap(),
            materials: vec![Some(material)],
        })
        .unwrap();

    let mut scene = engine.create_scene();
    let at = |z: f32| Mat4::from_translation(Vec3::new(0.0, 0.0, z));
    scene.create_static_mesh(StaticMesh::new(Arc::clone(&definition), at(-10.0)));
    scene.create_static_mesh(StaticMesh::new(Arc::clone(&definition), at(-30.0)));
    let mut hidden = StaticMesh::new(Arc::clone(&definition), at(-5.0));
    hidden.active = false;
    scene.create_static_mesh(hidden);

    render_frame(&mut engine, &mut scene, &mut Camera::default());

    assert_eq!(instanced_draws(&device.last_submission(), "Geometry"), [1]);
}

#[test]
fn unshadowed_directional_lights_sample_a_cleared_fallback() {
    let (device, mut engine) = engine(EngineConfig::default());
    let mut scene = engine.create_scene();
    scene.create_directional_light(DirectionalLight::default());
    let mut camera = Camera::default();

    render_frame(&mut engine, &mut scene, &mut camera);

    let fallback = device.textures_labelled("No Shadow");
    assert_eq!(fallback.len(), 1);
    let (fallback_id, texture) = &fallback[0];
    assert_eq!(texture.kind, MockTextureKind::Depth2D);
    assert_eq!((texture.width, texture.height), (1, 1));

    let commands = device.last_submission();
    let clear = render_pass(&commands, "No Shadow");
    assert_eq!(clear.viewport, Viewport::new(0, 0, 1, 1));
    assert_eq!(clear.depth, Some(Operations::clear(1.0)));
    assert!(commands.iter().any(|command| matches!(
        command,
        RecordedCommand::TextureUnit { index, texture }
            if *index == texture_slot::SHADOW_FB_DEPTH && texture == fallback_id
    )));

    // The fallback is cleared once and reused.
    render_frame(&mut engine, &mut scene, &mut camera);
    assert!(!device.last_submission().iter().any(|command| matches!(
        command,
        RecordedCommand::BeginRenderPass(pass) if pass.label == Some("No Shadow")
    )));
}

#[test]
fn point_and_spot_volumes_cull_front_faces() {
    let (device, mut engine) = engine(EngineConfig::default());
    let mut scene = engine.create_scene();
    scene.create_point_light(PointLight {
        position: Vec3::new(0.0, 0.0, -5.0),
        ..PointLight::default()
    });
    scene.create_spot_light(SpotLight {
        matrix: Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
        ..SpotLight::default()
    });

    render_frame(&mut engine, &mut scene, &mut Camera::default());

    let commands = device.last_submission();
    let mut pipelines = Vec::new();
    let mut inside = false;
    for command in &commands {
        match command {
            RecordedCommand::BeginRenderPass(pass) => inside = pass.label == Some("Lighting"),
            RecordedCommand::EndRenderPass => inside = false,
            RecordedCommand::BindPipeline(pipeline) if inside => {
                pipelines.push(device.pipeline(*pipeline).unwrap())
            }
            _ => {}
        }
    }
    let labels: Vec<_> = pipelines
        .iter()
        .map(|pipeline| pipeline.label.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(labels, ["Point Light", "Spot Light"]);
    for pipeline in &pipelines {
        assert_eq!(pipeline.culling, CullMode::Front);
        assert!(!pipeline.depth_test);
        assert!(pipeline.blend_enabled);
    }
    assert_eq!(instanced_draws(&commands, "Lighting"), [1, 1]);
}

#[test]
fn a_full_uniform_buffer_skips_batches_instead_of_failing() {
    let (device, mut engine) = engine(EngineConfig {
        uniform_buffer_size: 64 * 1024,
        ..EngineConfig::default()
    });
    let mut scene = engine.create_scene();
    let definitions: Vec<_> = (0..8)
        .map(|i| plain_definition(&engine, &format!("Material {}", i)))
        .collect();
    for definition in &definitions {
        let mut mesh = Mesh::new(Arc::clone(definition));
        mesh.matrix = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0));
        scene.create_mesh(mesh);
    }
    let mut camera = Camera::default();

    render_frame(&mut engine, &mut scene, &mut camera);

    let commands = device.last_submission();
    let draws = instanced_draws(&commands, "Geometry");
    assert!(!draws.is_empty());
    assert!(draws.len() < definitions.len(), "{} batches fit in 64 KiB", draws.len());
    assert_eq!(
        bound_pipelines(&device, &commands, "Geometry").len(),
        draws.len()
    );
    assert_eq!(render_pass(&commands, "Tone Mapping").framebuffer, SCREEN);

    // The next frame starts from an empty buffer again.
    render_frame(&mut engine, &mut scene, &mut camera);
    assert_eq!(instanced_draws(&device.last_submission(), "Geometry"), draws);
}
