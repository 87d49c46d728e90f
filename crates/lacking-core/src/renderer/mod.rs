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

//! Provides the public, backend-agnostic rendering contracts.
//!
//! This module defines the "common language" for all rendering operations: the
//! abstract [`GraphicsDevice`] and [`CommandBuffer`] traits, the resource ids
//! and descriptors they exchange, and the error types they report.
//!
//! The renderer decides *what* to draw; a concrete backend supplied by the host
//! (an OpenGL or Vulkan implementation) decides *how*. The rendering crate only
//! ever sees these traits.

pub mod api;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{RenderError, ResourceError};
pub use self::traits::{CommandBuffer, GraphicsDevice};
