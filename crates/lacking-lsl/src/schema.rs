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

//! Validation of a parsed shader against the types a pass accepts.

use crate::ast::{BlockKind, Shader};
use crate::error::Error;
use std::collections::HashSet;

const SAMPLER_TYPES: &[&str] = &["sampler2D", "samplerCube"];

const UNIFORM_TYPES: &[&str] = &[
    "bool", "int", "uint", "float", "vec2", "vec3", "vec4", "bvec2", "bvec3", "bvec4", "ivec2",
    "ivec3", "ivec4", "uvec2", "uvec3", "uvec4", "mat2", "mat3", "mat4",
];

const VARYING_TYPES: &[&str] = &["float", "vec2", "vec3", "vec4"];

/// The set of type names allowed in each block kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    texture_types: HashSet<&'static str>,
    uniform_types: HashSet<&'static str>,
    varying_types: HashSet<&'static str>,
}

impl Default for Schema {
    /// Samplers in `textures`, scalars, vectors and matrices in `uniforms`,
    /// float vectors in `varyings`.
    fn default() -> Self {
        Self {
            texture_types: SAMPLER_TYPES.iter().copied().collect(),
            uniform_types: UNIFORM_TYPES.iter().copied().collect(),
            varying_types: VARYING_TYPES.iter().copied().collect(),
        }
    }
}

impl Schema {
    /// Creates a schema from explicit type lists.
    pub fn new(
        texture_types: &[&'static str],
        uniform_types: &[&'static str],
        varying_types: &[&'static str],
    ) -> Self {
        Self {
            texture_types: texture_types.iter().copied().collect(),
            uniform_types: uniform_types.iter().copied().collect(),
            varying_types: varying_types.iter().copied().collect(),
        }
    }

    /// Schema for geometry pass shaders.
    pub fn geometry() -> Self {
        Self::default()
    }

    /// Schema for shadow pass shaders.
    pub fn shadow() -> Self {
        Self::default()
    }

    /// Schema for forward pass shaders.
    pub fn forward() -> Self {
        Self::default()
    }

    /// Schema for sky pass shaders.
    pub fn sky() -> Self {
        Self::default()
    }

    /// Schema for postprocess pass shaders.
    pub fn postprocess() -> Self {
        Self::default()
    }

    /// Returns `true` if `type_name` may appear in blocks of `kind`.
    pub fn allows(&self, kind: BlockKind, type_name: &str) -> bool {
        let allowed = match kind {
            BlockKind::Textures => &self.texture_types,
            BlockKind::Uniforms => &self.uniform_types,
            BlockKind::Varyings => &self.varying_types,
        };
        allowed.contains(type_name)
    }
}

/// Checks a shader against a schema.
///
/// # Errors
/// - [`Error::DuplicateBlock`] when a block kind appears twice.
/// - [`Error::ReservedName`] when a field name starts with `#`.
/// - [`Error::UnsupportedType`] when a field type is not allowed in its block.
pub fn validate(shader: &Shader, schema: &Schema) -> Result<(), Error> {
    for kind in [BlockKind::Textures, BlockKind::Uniforms, BlockKind::Varyings] {
        let mut blocks = shader.blocks(kind);
        let Some(first) = blocks.next() else {
            continue;
        };
        if let Some(duplicate) = blocks.next() {
            return Err(Error::DuplicateBlock {
                position: duplicate.position,
                block: kind.keyword(),
            });
        }
        for field in &first.fields {
            if field.is_reserved() {
                return Err(Error::ReservedName {
                    position: field.position,
                    name: field.name.clone(),
                });
            }
            if !schema.allows(kind, &field.type_name) {
                return Err(Error::UnsupportedType {
                    position: field.position,
                    block: kind.keyword(),
                    type_name: field.type_name.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn check(source: &str) -> Result<(), Error> {
        validate(&parse(source).unwrap(), &Schema::default())
    }

    #[test]
    fn accepts_well_formed_blocks() {
        check("textures {\n albedo sampler2D\n}\nuniforms {\n color vec4\n model mat4\n}\nvaryings {\n uv vec2\n}")
            .unwrap();
    }

    #[test]
    fn rejects_second_texture_block() {
        let err = check("textures { a sampler2D }\ntextures { b sampler2D }").unwrap_err();
        assert!(matches!(err, Error::DuplicateBlock { block: "textures", .. }));
    }

    #[test]
    fn rejects_reserved_field_names() {
        let err = check("varyings { #position vec4 }").unwrap_err();
        assert!(matches!(err, Error::ReservedName { ref name, .. } if name == "#position"));
    }

    #[test]
    fn rejects_types_outside_schema() {
        let err = check("uniforms { tex sampler2D }").unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { block: "uniforms", .. }));
        let err = check("varyings { flags ivec2 }").unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { block: "varyings", .. }));
    }
}
