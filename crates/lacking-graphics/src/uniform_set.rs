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

//! Material property blocks laid out with STD140 rules.

use crate::ubo::{Plotter, Std140};
use lacking_core::math::{Mat4, Vec2, Vec3, Vec4};
use lacking_lsl::ast::BlockDeclaration;
use lacking_lsl::Shader;

/// Component type of scalars and vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`, stored as a 32 bit integer.
    Bool,
    /// `int`
    Int,
    /// `uint`
    Uint,
    /// `float`
    Float,
}

/// A uniform type recognized in `uniforms` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `bool`, `int`, `uint` or `float`.
    Scalar(ScalarKind),
    /// `vecN`, `bvecN`, `ivecN` or `uvecN` with `N` components.
    Vector(ScalarKind, u32),
    /// `matN`, an `N`×`N` float matrix.
    Matrix(u32),
}

impl UniformType {
    /// Maps an LSL type name to a uniform type.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(UniformType::Scalar(ScalarKind::Bool)),
            "int" => Some(UniformType::Scalar(ScalarKind::Int)),
            "uint" => Some(UniformType::Scalar(ScalarKind::Uint)),
            "float" => Some(UniformType::Scalar(ScalarKind::Float)),
            "mat2" => Some(UniformType::Matrix(2)),
            "mat3" => Some(UniformType::Matrix(3)),
            "mat4" => Some(UniformType::Matrix(4)),
            _ => {
                let (kind, components) = if let Some(rest) = name.strip_prefix("vec") {
                    (ScalarKind::Float, rest)
                } else if let Some(rest) = name.strip_prefix("bvec") {
                    (ScalarKind::Bool, rest)
                } else if let Some(rest) = name.strip_prefix("ivec") {
                    (ScalarKind::Int, rest)
                } else {
                    (ScalarKind::Uint, name.strip_prefix("uvec")?)
                };
                match components {
                    "2" => Some(UniformType::Vector(kind, 2)),
                    "3" => Some(UniformType::Vector(kind, 3)),
                    "4" => Some(UniformType::Vector(kind, 4)),
                    _ => None,
                }
            }
        }
    }

    /// Base alignment in bytes.
    pub const fn alignment(&self) -> u32 {
        match self {
            UniformType::Scalar(_) => 4,
            UniformType::Vector(_, 2) => 8,
            UniformType::Vector(..) | UniformType::Matrix(_) => 16,
        }
    }

    /// Size in bytes. Matrix columns are padded to a full vec4.
    pub const fn size(&self) -> u32 {
        match self {
            UniformType::Scalar(_) => 4,
            UniformType::Vector(_, n) => 4 * *n,
            UniformType::Matrix(n) => 16 * *n,
        }
    }
}

/// A typed material property value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Property {
    /// A `float` value.
    Float(f32),
    /// A `vec2` value.
    Vec2(Vec2),
    /// A `vec3` value.
    Vec3(Vec3),
    /// A `vec4` value.
    Vec4(Vec4),
    /// A `mat4` value.
    Mat4(Mat4),
}

impl Property {
    /// The uniform type this value can be written to.
    pub const fn uniform_type(&self) -> UniformType {
        match self {
            Property::Float(_) => UniformType::Scalar(ScalarKind::Float),
            Property::Vec2(_) => UniformType::Vector(ScalarKind::Float, 2),
            Property::Vec3(_) => UniformType::Vector(ScalarKind::Float, 3),
            Property::Vec4(_) => UniformType::Vector(ScalarKind::Float, 4),
            Property::Mat4(_) => UniformType::Matrix(4),
        }
    }

    fn write(&self, target: &mut [u8]) {
        match self {
            Property::Float(value) => target[..4].copy_from_slice(&value.to_le_bytes()),
            Property::Vec2(value) => target[..8].copy_from_slice(bytemuck::bytes_of(value)),
            Property::Vec3(value) => target[..12].copy_from_slice(bytemuck::bytes_of(value)),
            Property::Vec4(value) => target[..16].copy_from_slice(bytemuck::bytes_of(value)),
            Property::Mat4(value) => target[..64].copy_from_slice(bytemuck::bytes_of(value)),
        }
    }
}

/// A Rust value that maps onto a [`Property`] kind.
pub trait PropertyValue: Copy {
    /// The uniform type the value occupies.
    const TYPE: UniformType;

    /// Wraps the value.
    fn into_property(self) -> Property;

    /// Decodes the value from STD140 bytes.
    fn from_bytes(bytes: &[u8]) -> Self;
}

impl PropertyValue for f32 {
    const TYPE: UniformType = UniformType::Scalar(ScalarKind::Float);

    fn into_property(self) -> Property {
        Property::Float(self)
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..4])
    }
}

impl PropertyValue for Vec2 {
    const TYPE: UniformType = UniformType::Vector(ScalarKind::Float, 2);

    fn into_property(self) -> Property {
        Property::Vec2(self)
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..8])
    }
}

impl PropertyValue for Vec3 {
    const TYPE: UniformType = UniformType::Vector(ScalarKind::Float, 3);

    fn into_property(self) -> Property {
        Property::Vec3(self)
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..12])
    }
}

impl PropertyValue for Vec4 {
    const TYPE: UniformType = UniformType::Vector(ScalarKind::Float, 4);

    fn into_property(self) -> Property {
        Property::Vec4(self)
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..16])
    }
}

impl PropertyValue for Mat4 {
    const TYPE: UniformType = UniformType::Matrix(4);

    fn into_property(self) -> Property {
        Property::Mat4(self)
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytemuck::pod_read_unaligned(&bytes[..64])
    }
}

/// A named entry in a [`UniformSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformEntry {
    /// The field name.
    pub name: String,
    /// The field type.
    pub ty: UniformType,
    /// Byte offset inside the block.
    pub offset: u32,
}

/// The STD140 property block of one material pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSet {
    entries: Vec<UniformEntry>,
    data: Vec<u8>,
}

impl UniformSet {
    /// Lays out the shader's `uniforms` block. Shaders without one get an
    /// empty set.
    pub fn from_shader(shader: &Shader) -> Self {
        shader
            .uniform_block()
            .map(Self::from_block)
            .unwrap_or_default()
    }

    /// Lays out the fields of a `uniforms` block.
    pub fn from_block(block: &BlockDeclaration) -> Self {
        let mut entries = Vec::with_capacity(block.fields.len());
        let mut offset = 0;
        for field in &block.fields {
            let Some(ty) = UniformType::from_name(&field.type_name) else {
                log::warn!(
                    "Skipping uniform '{}' of unsupported type '{}'",
                    field.name,
                    field.type_name
                );
                continue;
            };
            offset = lacking_core::math::align_up(offset, ty.alignment());
            entries.push(UniformEntry {
                name: field.name.clone(),
                ty,
                offset,
            });
            offset += ty.size();
        }
        let size = lacking_core::math::align_up(offset, 16);
        Self {
            entries,
            data: vec![0; size as usize],
        }
    }

    /// The laid out entries, in declaration order.
    pub fn entries(&self) -> &[UniformEntry] {
        &self.entries
    }

    /// Looks up an entry by name.
    pub fn entry(&self, name: &str) -> Option<&UniformEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Total block size in bytes, a multiple of 16.
    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Whether the block has no fields.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw STD140 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Writes a property. Unknown names and kind mismatches are ignored and
    /// reported through the return value.
    pub fn set(&mut self, name: &str, property: Property) -> bool {
        let Some(entry) = self.entry(name) else {
            return false;
        };
        if entry.ty != property.uniform_type() {
            log::warn!(
                "Uniform '{}' is {:?}, refusing a {:?} value",
                name,
                entry.ty,
                property.uniform_type()
            );
            return false;
        }
        let offset = entry.offset as usize;
        property.write(&mut self.data[offset..]);
        true
    }

    /// Typed variant of [`UniformSet::set`].
    pub fn set_property<T: PropertyValue>(&mut self, name: &str, value: T) -> bool {
        self.set(name, value.into_property())
    }

    /// Reads a property back, if it exists with the requested type.
    pub fn property<T: PropertyValue>(&self, name: &str) -> Option<T> {
        let entry = self.entry(name)?;
        (entry.ty == T::TYPE).then(|| T::from_bytes(&self.data[entry.offset as usize..]))
    }
}

impl Std140 for UniformSet {
    fn std140_size(&self) -> u32 {
        self.size()
    }

    fn std140_plot(&self, plotter: &mut Plotter<'_>) {
        plotter.write_bytes(&self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(source: &str) -> UniformSet {
        UniformSet::from_shader(&lacking_lsl::parse(source).unwrap())
    }

    fn offsets(set: &UniformSet) -> Vec<(&str, u32)> {
        set.entries()
            .iter()
            .map(|entry| (entry.name.as_str(), entry.offset))
            .collect()
    }

    #[test]
    fn mixed_block_follows_std140() {
        let set = layout("uniforms {\n a float\n b vec3\n c vec2\n d vec4\n}");
        assert_eq!(offsets(&set), vec![("a", 0), ("b", 16), ("c", 32), ("d", 48)]);
        assert_eq!(set.size(), 64);
    }

    #[test]
    fn trailing_scalar_is_padded_to_sixteen() {
        let set = layout("uniforms { color vec4\n intensity float\n}");
        assert_eq!(offsets(&set), vec![("color", 0), ("intensity", 16)]);
        assert_eq!(set.size(), 32);
    }

    #[test]
    fn matrices_and_integer_vectors() {
        let set = layout("uniforms {\n flag bool\n m mat3\n i ivec2\n}");
        assert_eq!(offsets(&set), vec![("flag", 0), ("m", 16), ("i", 64)]);
        assert_eq!(set.size(), 80);
    }

    #[test]
    fn properties_are_typed() {
        let mut set = layout("uniforms { color vec4\n intensity float\n}");
        assert!(set.set_property("color", Vec4::new(1.0, 0.5, 0.25, 1.0)));
        assert!(set.set_property("intensity", 3.0f32));
        assert!(!set.set_property("intensity", Vec3::ONE));
        assert!(!set.set_property("missing", 1.0f32));

        assert_eq!(set.property::<f32>("intensity"), Some(3.0));
        assert_eq!(
            set.property::<Vec4>("color"),
            Some(Vec4::new(1.0, 0.5, 0.25, 1.0))
        );
        assert_eq!(set.property::<Vec2>("color"), None);
    }

    #[test]
    fn integer_vectors_refuse_float_values() {
        let mut set = layout("uniforms {\n i ivec2\n f vec2\n}");
        assert_eq!(
            set.entry("i").map(|entry| entry.ty),
            Some(UniformType::Vector(ScalarKind::Int, 2))
        );
        assert!(!set.set_property("i", Vec2::new(1.0, 2.0)));
        assert!(set.data()[..8].iter().all(|byte| *byte == 0));
        assert_eq!(set.property::<Vec2>("i"), None);
        assert!(set.set_property("f", Vec2::new(1.0, 2.0)));
    }

    #[test]
    fn matrices_round_trip() {
        let mut set = layout("uniforms { transform mat4 }");
        let matrix = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert!(set.set_property("transform", matrix));
        assert_eq!(set.property::<Mat4>("transform"), Some(matrix));
    }

    #[test]
    fn shaders_without_uniforms_have_an_empty_block() {
        let set = layout("textures { albedo sampler2D }");
        assert!(set.is_empty());
        assert_eq!(set.std140_size(), 0);
    }
}
