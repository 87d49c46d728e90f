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

//! The host facing entry point.

use crate::armature::{Armature, ArmatureInfo};
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::debug::DebugLine;
use crate::error::{GraphicsError, Result};
use crate::material::{Material, MaterialInfo};
use crate::mesh_definition::{MeshDefinition, MeshDefinitionInfo};
use crate::mesh_geometry::{MeshGeometry, MeshGeometryInfo};
use crate::renderer::MeshRenderer;
use crate::scene::{
    AmbientLightHandle, DirectionalLightHandle, MeshHandle, PointLightHandle, Scene,
    SpotLightHandle, StaticMeshHandle,
};
use crate::shader::ShaderCollection;
use crate::shape::ShapeSet;
use crate::sky::{SkyDefinition, SkyDefinitionInfo};
use crate::stage::{default_stage_builder, Stage, StageBuilder, StageContext, StageProvider};
use crate::ubo::{write_uniform, UniformBlockBuffer};
use crate::uniforms::CameraUniform;
use lacking_core::math::{HexahedronRegion, Vec4};
use lacking_core::renderer::{CommandBuffer, FramebufferId, GraphicsDevice, Viewport};
use lacking_core::spatial::OctreeSettings;
use lacking_core::telemetry::{MetricContext, NoopMetrics};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Initial capacity of the frame command buffer, in bytes.
const COMMAND_BUFFER_CAPACITY: usize = 2 * 1024 * 1024;

/// Visibility query results, reused between frames.
#[derive(Debug, Default)]
struct Visibility {
    meshes: Vec<MeshHandle>,
    static_meshes: Vec<StaticMeshHandle>,
    ambient_lights: Vec<AmbientLightHandle>,
    point_lights: Vec<PointLightHandle>,
    spot_lights: Vec<SpotLightHandle>,
    directional_lights: Vec<DirectionalLightHandle>,
}

impl Visibility {
    fn query(&mut self, scene: &mut Scene, region: &HexahedronRegion) {
        self.meshes.clear();
        self.static_meshes.clear();
        self.ambient_lights.clear();
        self.point_lights.clear();
        self.spot_lights.clear();
        self.directional_lights.clear();
        scene.visible_meshes(region, &mut self.meshes);
        scene.visible_static_meshes(region, &mut self.static_meshes);
        scene.visible_ambient_lights(region, &mut self.ambient_lights);
        scene.visible_point_lights(region, &mut self.point_lights);
        scene.visible_spot_lights(region, &mut self.spot_lights);
        scene.visible_directional_lights(region, &mut self.directional_lights);
    }
}

/// Owns the device facing state of the renderer and runs the stage graph.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use lacking_graphics::{Camera, Engine, EngineConfig, ShaderCollection};
/// # use lacking_core::renderer::{FramebufferId, GraphicsDevice, Viewport};
/// # fn frame(device: Arc<dyn GraphicsDevice>, shaders: Arc<dyn ShaderCollection>) {
/// let mut engine = Engine::new(device, shaders, EngineConfig::default()).unwrap();
/// let mut scene = engine.create_scene();
/// let mut camera = Camera::default();
/// engine.render(&mut scene, &mut camera, FramebufferId(0), Viewport::new(0, 0, 1280, 720), &[]);
/// engine.release();
/// # }
/// ```
pub struct Engine {
    device: Arc<dyn GraphicsDevice>,
    shaders: Arc<dyn ShaderCollection>,
    config: EngineConfig,
    shapes: Arc<ShapeSet>,
    stages: Vec<Box<dyn Stage>>,
    commands: Box<dyn CommandBuffer>,
    uniforms: UniformBlockBuffer,
    renderer: MeshRenderer,
    metrics: Arc<dyn MetricContext>,
    visibility: Visibility,
    started: Instant,
    last_frame: Option<Instant>,
    released: bool,
}

impl Engine {
    /// Creates an engine running the stock stages.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        config: EngineConfig,
    ) -> Result<Self> {
        Self::with_stage_builder(device, shaders, config, Arc::new(default_stage_builder))
    }

    /// Creates an engine running the stages returned by `builder`.
    pub fn with_stage_builder(
        device: Arc<dyn GraphicsDevice>,
        shaders: Arc<dyn ShaderCollection>,
        config: EngineConfig,
        builder: StageBuilder,
    ) -> Result<Self> {
        config.validate()?;

        let shapes = Arc::new(ShapeSet::new(device.as_ref())?);
        let uniforms = match UniformBlockBuffer::new(device.as_ref(), config.uniform_buffer_size) {
            Ok(uniforms) => uniforms,
            Err(err) => {
                shapes.release(device.as_ref());
                return Err(err.into());
            }
        };

        let provider = StageProvider::new(
            Arc::clone(&device),
            Arc::clone(&shaders),
            Arc::clone(&shapes),
            config.clone(),
        );
        let mut engine = Self {
            commands: device.create_command_buffer(COMMAND_BUFFER_CAPACITY),
            device,
            shaders,
            config,
            shapes,
            stages: Vec::new(),
            uniforms,
            renderer: MeshRenderer::new(),
            metrics: Arc::new(NoopMetrics),
            visibility: Visibility::default(),
            started: Instant::now(),
            last_frame: None,
            released: false,
        };

        for mut stage in builder(&provider) {
            if let Err(err) = stage.allocate() {
                log::error!("Failed to allocate stage {}: {:#}", stage.label(), err);
                stage.release();
                engine.release();
                return Err(GraphicsError::Stage(err));
            }
            log::debug!("Allocated stage {}", stage.label());
            engine.stages.push(stage);
        }
        log::info!("Render engine ready with {} stages", engine.stages.len());
        Ok(engine)
    }

    /// Records frame metric regions into `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricContext>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The device every resource is created on.
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates an empty scene.
    pub fn create_scene(&self) -> Scene {
        Scene::new(OctreeSettings::default())
    }

    /// Creates a material. Materials hold no device resources of their own.
    pub fn create_material(&self, info: MaterialInfo) -> Arc<Material> {
        Arc::new(Material::new(info))
    }

    /// Uploads mesh geometry. The buffers are freed by
    /// [`MeshGeometry::delete`] or when the last reference is dropped.
    pub fn create_mesh_geometry(&self, info: MeshGeometryInfo) -> Result<Arc<MeshGeometry>> {
        Ok(Arc::new(MeshGeometry::new(Arc::clone(&self.device), info)?))
    }

    /// Binds materials to geometry fragments and compiles their passes.
    ///
    /// The passes live until [`MeshDefinition::delete`] or until the last
    /// reference is dropped, independently of [`Engine::release`].
    pub fn create_mesh_definition(&self, info: MeshDefinitionInfo) -> Result<Arc<MeshDefinition>> {
        Ok(Arc::new(MeshDefinition::new(
            Arc::clone(&self.device),
            Arc::clone(&self.shaders),
            info,
        )?))
    }

    /// Creates a skinning armature.
    pub fn create_armature(&self, info: ArmatureInfo) -> Arc<Armature> {
        Arc::new(Armature::new(info))
    }

    /// Compiles a sky.
    pub fn create_sky_definition(&self, info: SkyDefinitionInfo) -> Result<Arc<SkyDefinition>> {
        Ok(Arc::new(SkyDefinition::new(
            Arc::clone(&self.device),
            self.shaders.as_ref(),
            &self.shapes,
            info,
        )?))
    }

    /// Renders a frame, measuring the frame time from the previous call.
    pub fn render(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        framebuffer: FramebufferId,
        viewport: Viewport,
        debug_lines: &[DebugLine],
    ) {
        let now = Instant::now();
        let delta = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_frame = Some(now);
        self.render_with_delta(scene, camera, framebuffer, viewport, debug_lines, delta);
    }

    /// Renders a frame with an explicit frame time. Failures are logged; the
    /// frame is skipped or degraded but never aborted with an error.
    pub fn render_with_delta(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        framebuffer: FramebufferId,
        viewport: Viewport,
        debug_lines: &[DebugLine],
        delta: Duration,
    ) {
        if self.released {
            log::warn!("Render called on a released engine");
            return;
        }
        if viewport.width == 0 || viewport.height == 0 {
            log::debug!("Skipping frame with an empty viewport");
            return;
        }

        let metrics = Arc::clone(&self.metrics);
        let metrics = metrics.as_ref();
        let _frame = metrics.region("Frame");

        for stage in &mut self.stages {
            if let Err(err) = stage.pre_render(viewport.width, viewport.height) {
                log::error!("Stage {} failed to prepare: {:#}", stage.label(), err);
            }
        }

        self.uniforms.reset();
        let projection_matrix = camera.projection_matrix(viewport);
        let view_matrix = camera.view_matrix();
        let region = HexahedronRegion::from_projection_matrix(&(projection_matrix * view_matrix));
        {
            let _visibility = metrics.region("Visibility");
            self.visibility.query(scene, &region);
        }

        let Some(camera_placement) = write_uniform(
            &mut self.uniforms,
            &CameraUniform::new(
                projection_matrix,
                view_matrix,
                camera.matrix,
                Vec4::new(
                    viewport.x as f32,
                    viewport.y as f32,
                    viewport.width as f32,
                    viewport.height as f32,
                ),
                self.started.elapsed().as_secs_f32(),
                camera.exposure,
            ),
        ) else {
            log::error!("Uniform block buffer cannot hold the camera, skipping frame");
            return;
        };

        let mut ctx = StageContext {
            camera_position: camera.position(),
            scene,
            camera,
            projection_matrix,
            view_matrix,
            camera_placement,
            visible_meshes: &self.visibility.meshes,
            visible_static_meshes: &self.visibility.static_meshes,
            visible_ambient_lights: &self.visibility.ambient_lights,
            visible_point_lights: &self.visibility.point_lights,
            visible_spot_lights: &self.visibility.spot_lights,
            visible_directional_lights: &self.visibility.directional_lights,
            debug_lines,
            viewport,
            framebuffer,
            commands: self.commands.as_mut(),
            uniforms: &mut self.uniforms,
            renderer: &mut self.renderer,
            metrics,
            delta,
        };
        for stage in &mut self.stages {
            let _stage = metrics.region(stage.label());
            stage.render(&mut ctx);
        }
        drop(ctx);

        if let Err(err) = self.uniforms.upload(self.device.as_ref()) {
            log::error!("Failed to upload uniform blocks, dropping the frame: {}", err);
            self.commands.reset();
            return;
        }
        if let Err(err) = self.device.submit(self.commands.as_mut()) {
            log::error!("Failed to submit frame: {}", err);
            self.commands.reset();
        }

        for stage in &mut self.stages {
            stage.post_render();
        }
    }

    /// Releases every stage and shared resource. Rendering afterwards is a
    /// no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        for mut stage in self.stages.drain(..).rev() {
            stage.release();
        }
        self.renderer.discard();
        self.uniforms.release(self.device.as_ref());
        self.shapes.release(self.device.as_ref());
        self.released = true;
        log::info!("Render engine released");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.release();
    }
}
