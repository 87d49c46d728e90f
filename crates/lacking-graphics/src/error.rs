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

//! Errors raised while creating rendering resources.

use lacking_core::renderer::{RenderError, ResourceError};
use thiserror::Error;

/// An error raised while creating or configuring rendering resources.
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// The device failed to create or release a resource.
    #[error("graphics resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The device failed while executing work.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The engine configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Mesh geometry data is inconsistent.
    #[error("invalid mesh geometry: {0}")]
    InvalidGeometry(String),

    /// A material slot index is out of range.
    #[error("material slot {index} is out of range ({count} fragments)")]
    MaterialSlot {
        /// The requested slot.
        index: usize,
        /// The number of fragments in the geometry.
        count: usize,
    },

    /// A stage failed to allocate its resources.
    #[error("stage allocation failed: {0:#}")]
    Stage(anyhow::Error),
}

/// A specialized `Result` type for resource creation.
pub type Result<T> = std::result::Result<T, GraphicsError>;
