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

//! Defines the error types of the rendering API.

use std::fmt;

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// The resource referenced by the handle does not exist.
    NotFound {
        /// The resource kind, e.g. `"buffer"`.
        kind: &'static str,
        /// The raw handle value.
        id: u64,
    },
    /// The handle used to reference a resource is of the wrong kind or malformed.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds.
    OutOfBounds,
    /// A program failed to compile or link.
    CompilationFailed {
        /// A descriptive label for the program.
        label: String,
        /// Detailed error messages from the backend.
        details: String,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound { kind, id } => {
                write!(f, "Resource not found: {kind} with ID {id}.")
            }
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::CompilationFailed { label, details } => {
                write!(f, "Program compilation failed for '{label}': {details}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error raised by the graphics device or the renderer.
#[derive(Debug)]
pub enum RenderError {
    /// A critical rendering operation failed.
    RenderingFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The graphics device was lost.
    DeviceLost,
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::RenderingFailed(msg) => {
                write!(f, "A critical rendering operation failed: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::DeviceLost => write!(f, "The graphics device was lost."),
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn resource_error_display() {
        let err = ResourceError::NotFound {
            kind: "buffer",
            id: 42,
        };
        assert_eq!(format!("{err}"), "Resource not found: buffer with ID 42.");

        let err = ResourceError::CompilationFailed {
            label: "forward".to_string(),
            details: "syntax error".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Program compilation failed for 'forward': syntax error"
        );
    }

    #[test]
    fn render_error_wraps_resource_error() {
        let render_err: RenderError = ResourceError::OutOfBounds.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Resource access out of bounds."
        );
        assert!(render_err.source().is_some());
        assert!(RenderError::DeviceLost.source().is_none());
    }
}
