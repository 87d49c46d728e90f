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

//! Stages that own shared attachments and render nothing.
//!
//! Depth is written by the geometry pass, read by lighting and depth tested
//! again by the forward pass; the G-buffer and HDR target follow the same
//! pattern. Keeping them in dedicated stages lets every consumer reference
//! the same texture through a [`StageTextureParameter`].

use anyhow::Context;
use super::{destroy_texture, Stage, StageContext, StageTextureParameter, TextureCell};
use crate::constants::MIN_ATTACHMENT_SIZE;
use lacking_core::renderer::{
    ColorTexture2DDescriptor, DataFormat, DepthTexture2DDescriptor, GraphicsDevice, ResourceError,
};
use std::borrow::Cow;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum AttachmentKind {
    Color(DataFormat),
    DepthStencil,
}

/// A size dependent texture published through a [`TextureCell`].
#[derive(Debug)]
struct Attachment {
    label: &'static str,
    kind: AttachmentKind,
    texture: Option<lacking_core::renderer::TextureId>,
    cell: TextureCell,
}

impl Attachment {
    fn new(label: &'static str, kind: AttachmentKind) -> Self {
        Self {
            label,
            kind,
            texture: None,
            cell: TextureCell::default(),
        }
    }

    fn allocate(
        &mut self,
        device: &dyn GraphicsDevice,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError> {
        self.release(device);
        let texture = match self.kind {
            AttachmentKind::Color(format) => {
                device.create_color_texture_2d(&ColorTexture2DDescriptor {
                    label: Some(Cow::Borrowed(self.label)),
                    width,
                    height,
                    mipmapping: false,
                    gamma_correction: false,
                    format,
                    data: None,
                })?
            }
            AttachmentKind::DepthStencil => {
                device.create_depth_texture_2d(&DepthTexture2DDescriptor {
                    label: Some(Cow::Borrowed(self.label)),
                    width,
                    height,
                    comparable: false,
                    stencil: true,
                })?
            }
        };
        self.texture = Some(texture);
        self.cell.set(Some(texture));
        Ok(())
    }

    fn release(&mut self, device: &dyn GraphicsDevice) {
        self.cell.set(None);
        destroy_texture(device, &mut self.texture);
    }
}

/// Shared bookkeeping of the three source stages.
#[derive(Debug)]
struct AttachmentOwner {
    device: Arc<dyn GraphicsDevice>,
    attachments: Vec<Attachment>,
    size: (u32, u32),
}

impl AttachmentOwner {
    fn new(device: Arc<dyn GraphicsDevice>, attachments: Vec<Attachment>) -> Self {
        Self {
            device,
            attachments,
            size: (0, 0),
        }
    }

    fn parameter(&self, index: usize) -> StageTextureParameter {
        self.attachments[index].cell.parameter()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), ResourceError> {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return Ok(());
        }
        for attachment in &mut self.attachments {
            attachment.allocate(self.device.as_ref(), size.0, size.1)?;
        }
        self.size = size;
        Ok(())
    }

    fn release(&mut self) {
        for attachment in self.attachments.iter_mut().rev() {
            attachment.release(self.device.as_ref());
        }
        self.size = (0, 0);
    }
}

/// Owns the depth-stencil attachment.
#[derive(Debug)]
pub struct DepthSourceStage {
    owner: AttachmentOwner,
}

impl DepthSourceStage {
    /// Creates the stage. Nothing is allocated yet.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            owner: AttachmentOwner::new(
                device,
                vec![Attachment::new("Depth Source", AttachmentKind::DepthStencil)],
            ),
        }
    }

    /// The depth-stencil texture.
    pub fn depth_texture(&self) -> StageTextureParameter {
        self.owner.parameter(0)
    }
}

/// Owns the G-buffer: albedo and metallic in RGBA8, normal and roughness in
/// RGBA16F.
#[derive(Debug)]
pub struct GeometrySourceStage {
    owner: AttachmentOwner,
}

impl GeometrySourceStage {
    /// Creates the stage. Nothing is allocated yet.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            owner: AttachmentOwner::new(
                device,
                vec![
                    Attachment::new(
                        "Geometry Albedo Metallic",
                        AttachmentKind::Color(DataFormat::Rgba8),
                    ),
                    Attachment::new(
                        "Geometry Normal Roughness",
                        AttachmentKind::Color(DataFormat::Rgba16F),
                    ),
                ],
            ),
        }
    }

    /// Albedo in RGB, metallic in A.
    pub fn albedo_metallic_texture(&self) -> StageTextureParameter {
        self.owner.parameter(0)
    }

    /// View space normal in RGB, roughness in A.
    pub fn normal_roughness_texture(&self) -> StageTextureParameter {
        self.owner.parameter(1)
    }
}

/// Owns the HDR color target lighting and forward passes accumulate into.
#[derive(Debug)]
pub struct ForwardSourceStage {
    owner: AttachmentOwner,
}

impl ForwardSourceStage {
    /// Creates the stage. Nothing is allocated yet.
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self {
            owner: AttachmentOwner::new(
                device,
                vec![Attachment::new(
                    "Forward HDR",
                    AttachmentKind::Color(DataFormat::Rgba16F),
                )],
            ),
        }
    }

    /// The HDR color texture.
    pub fn hdr_texture(&self) -> StageTextureParameter {
        self.owner.parameter(0)
    }
}

macro_rules! source_stage {
    ($ty:ty, $label:literal) => {
        impl Stage for $ty {
            fn label(&self) -> &'static str {
                $label
            }

            fn allocate(&mut self) -> anyhow::Result<()> {
                self.owner
                    .resize(MIN_ATTACHMENT_SIZE, MIN_ATTACHMENT_SIZE)
                    .with_context(|| format!("allocating {}", $label))
            }

            fn release(&mut self) {
                self.owner.release();
            }

            fn pre_render(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
                if (width.max(1), height.max(1)) != self.owner.size {
                    log::debug!("{} resized to {}x{}", $label, width, height);
                }
                self.owner
                    .resize(width, height)
                    .with_context(|| format!("resizing {}", $label))
            }

            fn render(&mut self, _ctx: &mut StageContext<'_>) {}
        }
    };
}

source_stage!(DepthSourceStage, "Depth Source");
source_stage!(GeometrySourceStage, "Geometry Source");
source_stage!(ForwardSourceStage, "Forward Source");

#[cfg(test)]
mod tests {
    use super::*;
    use lacking_core::renderer::mock::{MockDevice, MockTextureKind};

    #[test]
    fn attachments_follow_the_target_size() {
        let device = Arc::new(MockDevice::new());
        let mut stage = GeometrySourceStage::new(device.clone());
        let albedo = stage.albedo_metallic_texture();

        stage.allocate().unwrap();
        let first = albedo().unwrap();
        assert_eq!(device.texture(first).unwrap().width, MIN_ATTACHMENT_SIZE);

        stage.pre_render(640, 480).unwrap();
        let resized = albedo().unwrap();
        assert_ne!(first, resized);
        assert!(device.texture(first).is_none());
        let texture = device.texture(resized).unwrap();
        assert_eq!((texture.width, texture.height), (640, 480));
        assert_eq!(texture.format, DataFormat::Rgba8);

        stage.pre_render(640, 480).unwrap();
        assert_eq!(albedo(), Some(resized));

        stage.release();
        assert_eq!(albedo(), None);
        assert_eq!(device.live_resource_count(), 0);
    }

    #[test]
    fn depth_source_carries_stencil() {
        let device = Arc::new(MockDevice::new());
        let mut stage = DepthSourceStage::new(device.clone());
        stage.allocate().unwrap();
        let texture = device.texture(stage.depth_texture()().unwrap()).unwrap();
        assert_eq!(texture.kind, MockTextureKind::Depth2D);
        stage.release();
    }
}
