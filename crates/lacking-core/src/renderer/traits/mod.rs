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

//! Traits that a graphics backend implements.
//!
//! - [`GraphicsDevice`]: creates and destroys resources, submits work.
//! - [`CommandBuffer`]: records render passes, draws and transfers for a frame.

mod command_buffer;
mod graphics_device;

pub use self::command_buffer::CommandBuffer;
pub use self::graphics_device::GraphicsDevice;
