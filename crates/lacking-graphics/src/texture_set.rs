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

//! Named texture slots of a material pass.

use crate::constants::TEXTURE_SET_SIZE;
use lacking_core::renderer::{CommandBuffer, SamplerId, TextureBinding, TextureId};
use lacking_lsl::Shader;

/// One named texture unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureSlot {
    /// The sampler name declared in the shader.
    pub name: String,
    /// The bound texture.
    pub texture: Option<TextureId>,
    /// The bound sampler.
    pub sampler: Option<SamplerId>,
}

/// Up to eight texture units addressed by the names of a shader's
/// `textures` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureSet {
    slots: Vec<TextureSlot>,
}

impl TextureSet {
    /// Creates slots for the first eight fields of the `textures` block.
    pub fn from_shader(shader: &Shader) -> Self {
        let Some(block) = shader.texture_block() else {
            return Self::default();
        };
        if block.fields.len() > TEXTURE_SET_SIZE {
            log::warn!(
                "Shader declares {} textures, only the first {} are bound",
                block.fields.len(),
                TEXTURE_SET_SIZE
            );
        }
        let slots = block
            .fields
            .iter()
            .take(TEXTURE_SET_SIZE)
            .map(|field| TextureSlot {
                name: field.name.clone(),
                ..TextureSlot::default()
            })
            .collect();
        Self { slots }
    }

    /// The slots, in unit order.
    pub fn slots(&self) -> &[TextureSlot] {
        &self.slots
    }

    /// Unit index of the slot called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    /// Binds a texture by slot name. Unknown names are ignored.
    pub fn set_texture(&mut self, name: &str, texture: TextureId) {
        if let Some(index) = self.index_of(name) {
            self.slots[index].texture = Some(texture);
        }
    }

    /// Binds a sampler by slot name. Unknown names are ignored.
    pub fn set_sampler(&mut self, name: &str, sampler: SamplerId) {
        if let Some(index) = self.index_of(name) {
            self.slots[index].sampler = Some(sampler);
        }
    }

    /// Name-to-unit table for program creation.
    pub fn bindings(&self) -> Vec<TextureBinding> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| TextureBinding::new(slot.name.clone(), index as u32))
            .collect()
    }

    /// Records texture and sampler unit bindings for every filled slot.
    pub fn bind(&self, commands: &mut dyn CommandBuffer) {
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(texture) = slot.texture {
                commands.texture_unit(index as u32, texture);
            }
            if let Some(sampler) = slot.sampler {
                commands.sampler_unit(index as u32, sampler);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lacking_core::renderer::mock::{MockCommandBuffer, RecordedCommand};

    #[test]
    fn slots_follow_the_texture_block() {
        let shader = lacking_lsl::parse(
            "textures {\n albedo sampler2D\n normal sampler2D\n environment samplerCube\n}",
        )
        .unwrap();
        let mut set = TextureSet::from_shader(&shader);
        assert_eq!(set.index_of("normal"), Some(1));

        set.set_texture("normal", TextureId(9));
        set.set_sampler("normal", SamplerId(3));
        set.set_texture("missing", TextureId(1));

        let mut commands = MockCommandBuffer::with_capacity(0);
        set.bind(&mut commands);
        assert_eq!(
            commands.commands(),
            &[
                RecordedCommand::TextureUnit {
                    index: 1,
                    texture: TextureId(9)
                },
                RecordedCommand::SamplerUnit {
                    index: 1,
                    sampler: SamplerId(3)
                },
            ]
        );
    }

    #[test]
    fn only_eight_slots_are_kept() {
        let fields: String = (0..10).map(|i| format!("t{} sampler2D\n", i)).collect();
        let shader = lacking_lsl::parse(&format!("textures {{\n{}}}", fields)).unwrap();
        let set = TextureSet::from_shader(&shader);
        assert_eq!(set.slots().len(), TEXTURE_SET_SIZE);
        assert_eq!(set.bindings().last().unwrap().index, 7);
    }
}
