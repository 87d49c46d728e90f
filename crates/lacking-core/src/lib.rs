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

//! # Lacking Core
//!
//! Foundational crate containing the render API contracts, the math types the
//! renderer consumes, the spatial index used for visibility queries and the
//! per-frame metric context.
//!
//! Nothing in this crate talks to a real GPU. A host backend implements
//! [`renderer::GraphicsDevice`] and [`renderer::CommandBuffer`]; the rendering
//! crate records work through those traits only.

#![warn(missing_docs)]

pub mod math;
pub mod renderer;
pub mod spatial;
pub mod telemetry;
