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

//! Device-level information shared by every backend.

use crate::renderer::api::resource::DataFormat;

/// The quality tier a device reports, used to pick shadow and blur budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    /// Integrated or mobile-class GPUs.
    Low,
    /// The default tier.
    #[default]
    Medium,
    /// Discrete, desktop-class GPUs.
    High,
}

/// Hard limits of the device that affect how resources are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Required alignment, in bytes, of offsets passed to
    /// [`CommandBuffer::uniform_buffer_unit`](crate::renderer::CommandBuffer::uniform_buffer_unit).
    pub uniform_buffer_offset_alignment: u32,
    /// The device quality tier.
    pub quality: Quality,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            uniform_buffer_offset_alignment: 256,
            quality: Quality::Medium,
        }
    }
}

/// The state of a GPU fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceStatus {
    /// The GPU has not reached the fence yet.
    NotReady,
    /// All work submitted before the fence has completed.
    Success,
    /// The device was lost; the fence will never signal.
    DeviceLost,
}

/// Optional features and format choices of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The format used for small HDR targets read back by the CPU, such as the
    /// 1×1 exposure probe. [`DataFormat::Unsupported`] means the device could
    /// not pick one.
    pub exposure_format: DataFormat,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            exposure_format: DataFormat::Rgba16F,
        }
    }
}
