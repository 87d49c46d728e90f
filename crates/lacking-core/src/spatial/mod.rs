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

//! Spatial partitioning for visibility queries.
//!
//! The scene keeps meshes and lights in a [`LooseOctree`]. Each frame the
//! renderer builds a [`HexahedronRegion`](crate::math::HexahedronRegion) from
//! the camera's projection-view matrix and collects everything that may be
//! visible through a [`Visitor`].

mod octree;
mod visitor;

pub use self::octree::{ItemId, LooseOctree, OctreeSettings, VisitStats};
pub use self::visitor::{Visitor, VisitorBucket};
