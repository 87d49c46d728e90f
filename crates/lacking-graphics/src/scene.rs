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

//! The scene database: entity arenas indexed by loose octrees.
//!
//! Entities are plain data stored in generational slots. A [`Handle`] names a
//! slot and the generation it was issued for, so using a handle after its
//! entity was deleted is detected and treated as a fatal contract violation.

use crate::light::{AmbientLight, DirectionalLight, PointLight, SpotLight};
use crate::mesh::{Mesh, StaticMesh};
use crate::sky::Sky;
use lacking_core::math::{HexahedronRegion, Vec3};
use lacking_core::spatial::{ItemId, LooseOctree, OctreeSettings, VisitStats};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// An entity with a bounding sphere in world space.
pub trait Spatial {
    /// Center and radius of the entity's bounding sphere.
    fn bounding_sphere(&self) -> (Vec3, f32);
}

/// A typed reference to an entity in a [`Scene`].
pub struct Handle<T> {
    index: u32,
    generation: u32,
    marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            marker: PhantomData,
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

/// Handle of a [`Mesh`].
pub type MeshHandle = Handle<Mesh>;
/// Handle of a [`StaticMesh`].
pub type StaticMeshHandle = Handle<StaticMesh>;
/// Handle of an [`AmbientLight`].
pub type AmbientLightHandle = Handle<AmbientLight>;
/// Handle of a [`PointLight`].
pub type PointLightHandle = Handle<PointLight>;
/// Handle of a [`SpotLight`].
pub type SpotLightHandle = Handle<SpotLight>;
/// Handle of a [`DirectionalLight`].
pub type DirectionalLightHandle = Handle<DirectionalLight>;
/// Handle of a [`Sky`].
pub type SkyHandle = Handle<Sky>;

struct Slot<T> {
    generation: u32,
    entry: Option<(T, ItemId)>,
}

/// Generational slots whose entries are also indexed by a loose octree.
pub struct SpatialSet<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    tree: LooseOctree<u32>,
}

impl<T: Spatial> SpatialSet<T> {
    /// Creates an empty set.
    pub fn new(settings: OctreeSettings) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            tree: LooseOctree::new(settings),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Stores `value` and indexes its bounding sphere.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let (position, radius) = value.bounding_sphere();
        let item = self.tree.insert(position, radius, index);
        let slot = &mut self.slots[index as usize];
        slot.entry = Some((value, item));
        Handle::new(index, slot.generation)
    }

    fn slot(&self, handle: Handle<T>) -> &(T, ItemId) {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
            .unwrap_or_else(|| panic!("{:?} does not refer to a live entity", handle))
    }

    /// Whether `handle` refers to a live entry.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.generation == handle.generation && slot.entry.is_some())
    }

    /// Returns the entry.
    ///
    /// # Panics
    /// Panics if the handle is stale.
    pub fn get(&self, handle: Handle<T>) -> &T {
        &self.slot(handle).0
    }

    /// Returns the entry for modification. The spatial index is refreshed
    /// when the returned guard is dropped.
    ///
    /// # Panics
    /// Panics if the handle is stale.
    pub fn get_mut(&mut self, handle: Handle<T>) -> SpatialMut<'_, T> {
        let Self { slots, tree, .. } = self;
        let (value, item) = slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
            .unwrap_or_else(|| panic!("{:?} does not refer to a live entity", handle));
        SpatialMut {
            item: *item,
            value,
            tree,
        }
    }

    /// Deletes the entry and returns it.
    ///
    /// # Panics
    /// Panics if the handle is stale, including a second delete.
    pub fn remove(&mut self, handle: Handle<T>) -> T {
        let (value, item) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.take())
            .unwrap_or_else(|| panic!("{:?} was already deleted", handle));
        self.tree.remove(item);
        let slot = &mut self.slots[handle.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        value
    }

    /// Iterates over live entries.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .map(|(value, _)| (Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Appends the handles of entries whose bounding sphere intersects
    /// `region` to `output`.
    pub fn visit(&mut self, region: &HexahedronRegion, output: &mut Vec<Handle<T>>) -> VisitStats {
        let slots = &self.slots;
        let mut collect = |index: &u32| {
            output.push(Handle::new(*index, slots[*index as usize].generation));
        };
        self.tree.visit_hexahedron_region(region, &mut collect)
    }
}

/// Mutable access to a spatial entry that re-indexes it on drop.
pub struct SpatialMut<'a, T: Spatial> {
    value: &'a mut T,
    tree: &'a mut LooseOctree<u32>,
    item: ItemId,
}

impl<T: Spatial> Deref for SpatialMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
    }
}

impl<T: Spatial> DerefMut for SpatialMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value
    }
}

impl<T: Spatial> Drop for SpatialMut<'_, T> {
    fn drop(&mut self) {
        let (position, radius) = self.value.bounding_sphere();
        self.tree.update(self.item, position, radius);
    }
}

/// Every entity of a rendered world.
pub struct Scene {
    skies: Vec<(u32, Sky)>,
    next_sky: u32,
    meshes: SpatialSet<Mesh>,
    static_meshes: SpatialSet<StaticMesh>,
    ambient_lights: SpatialSet<AmbientLight>,
    point_lights: SpatialSet<PointLight>,
    spot_lights: SpatialSet<SpotLight>,
    directional_lights: SpatialSet<DirectionalLight>,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("skies", &self.skies.len())
            .field("meshes", &self.meshes.len())
            .field("static_meshes", &self.static_meshes.len())
            .field("ambient_lights", &self.ambient_lights.len())
            .field("point_lights", &self.point_lights.len())
            .field("spot_lights", &self.spot_lights.len())
            .field("directional_lights", &self.directional_lights.len())
            .finish()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(OctreeSettings::default())
    }
}

macro_rules! spatial_entity {
    ($set:ident, $ty:ty, $create:ident, $get:ident, $get_mut:ident, $delete:ident, $visit:ident) => {
        #[doc = concat!("Adds a [`", stringify!($ty), "`].")]
        pub fn $create(&mut self, value: $ty) -> Handle<$ty> {
            self.$set.insert(value)
        }

        #[doc = concat!("Returns a [`", stringify!($ty), "`]. Panics on a stale handle.")]
        pub fn $get(&self, handle: Handle<$ty>) -> &$ty {
            self.$set.get(handle)
        }

        #[doc = concat!(
            "Modifies a [`", stringify!($ty),
            "`]; its spatial entry is refreshed when the guard drops. Panics on a stale handle."
        )]
        pub fn $get_mut(&mut self, handle: Handle<$ty>) -> SpatialMut<'_, $ty> {
            self.$set.get_mut(handle)
        }

        #[doc = concat!("Deletes a [`", stringify!($ty), "`]. Panics on a stale handle.")]
        pub fn $delete(&mut self, handle: Handle<$ty>) -> $ty {
            self.$set.remove(handle)
        }

        #[doc = concat!("Collects the [`", stringify!($ty), "`] handles intersecting `region`.")]
        pub fn $visit(
            &mut self,
            region: &HexahedronRegion,
            output: &mut Vec<Handle<$ty>>,
        ) -> VisitStats {
            self.$set.visit(region, output)
        }
    };
}

impl Scene {
    /// Creates an empty scene whose spatial sets use `settings`.
    pub fn new(settings: OctreeSettings) -> Self {
        Self {
            skies: Vec::new(),
            next_sky: 0,
            meshes: SpatialSet::new(settings),
            static_meshes: SpatialSet::new(settings),
            ambient_lights: SpatialSet::new(settings),
            point_lights: SpatialSet::new(settings),
            spot_lights: SpatialSet::new(settings),
            directional_lights: SpatialSet::new(settings),
        }
    }

    spatial_entity!(meshes, Mesh, create_mesh, mesh, mesh_mut, delete_mesh, visible_meshes);
    spatial_entity!(
        ambient_lights,
        AmbientLight,
        create_ambient_light,
        ambient_light,
        ambient_light_mut,
        delete_ambient_light,
        visible_ambient_lights
    );
    spatial_entity!(
        point_lights,
        PointLight,
        create_point_light,
        point_light,
        point_light_mut,
        delete_point_light,
        visible_point_lights
    );
    spatial_entity!(
        spot_lights,
        SpotLight,
        create_spot_light,
        spot_light,
        spot_light_mut,
        delete_spot_light,
        visible_spot_lights
    );
    spatial_entity!(
        directional_lights,
        DirectionalLight,
        create_directional_light,
        directional_light,
        directional_light_mut,
        delete_directional_light,
        visible_directional_lights
    );

    /// Moves a mesh.
    pub fn set_mesh_matrix(&mut self, handle: MeshHandle, matrix: lacking_core::math::Mat4) {
        self.mesh_mut(handle).matrix = matrix;
    }

    /// Moves a spot light.
    pub fn set_spot_light_matrix(&mut self, handle: SpotLightHandle, matrix: lacking_core::math::Mat4) {
        self.spot_light_mut(handle).matrix = matrix;
    }

    /// Orients a directional light.
    pub fn set_directional_light_matrix(
        &mut self,
        handle: DirectionalLightHandle,
        matrix: lacking_core::math::Mat4,
    ) {
        self.directional_light_mut(handle).matrix = matrix;
    }

    /// Adds a static mesh. Static meshes cannot be moved or deleted.
    pub fn create_static_mesh(&mut self, mesh: StaticMesh) -> StaticMeshHandle {
        self.static_meshes.insert(mesh)
    }

    /// Returns a static mesh. Panics on a stale handle.
    pub fn static_mesh(&self, handle: StaticMeshHandle) -> &StaticMesh {
        self.static_meshes.get(handle)
    }

    /// Collects the static mesh handles intersecting `region`.
    pub fn visible_static_meshes(
        &mut self,
        region: &HexahedronRegion,
        output: &mut Vec<StaticMeshHandle>,
    ) -> VisitStats {
        self.static_meshes.visit(region, output)
    }

    /// Number of live meshes.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Iterates over live meshes.
    pub fn meshes(&self) -> impl Iterator<Item = (MeshHandle, &Mesh)> {
        self.meshes.iter()
    }

    /// Appends a sky. Skies keep their creation order.
    pub fn create_sky(&mut self, sky: Sky) -> SkyHandle {
        let id = self.next_sky;
        self.next_sky += 1;
        self.skies.push((id, sky));
        Handle::new(id, 0)
    }

    /// Returns a sky for modification. Panics on a stale handle.
    pub fn sky_mut(&mut self, handle: SkyHandle) -> &mut Sky {
        self.skies
            .iter_mut()
            .find(|(id, _)| *id == handle.index)
            .map(|(_, sky)| sky)
            .unwrap_or_else(|| panic!("{:?} does not refer to a live sky", handle))
    }

    /// Removes a sky. Panics on a stale handle.
    pub fn delete_sky(&mut self, handle: SkyHandle) -> Sky {
        let position = self
            .skies
            .iter()
            .position(|(id, _)| *id == handle.index)
            .unwrap_or_else(|| panic!("{:?} was already deleted", handle));
        self.skies.remove(position).1
    }

    /// The sky drawn this frame: the first active one.
    pub fn active_sky(&self) -> Option<&Sky> {
        self.skies.iter().map(|(_, sky)| sky).find(|sky| sky.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lacking_core::math::Mat4;

    fn settings() -> OctreeSettings {
        OctreeSettings {
            size: 512.0,
            max_depth: 6,
            ..OctreeSettings::default()
        }
    }

    fn everything() -> HexahedronRegion {
        HexahedronRegion::from_box(Vec3::splat(-256.0), Vec3::splat(256.0))
    }

    #[test]
    fn point_lights_move_with_their_guard() {
        let mut scene = Scene::new(settings());
        let light = scene.create_point_light(PointLight {
            position: Vec3::new(100.0, 0.0, 0.0),
            emit_distance: 2.0,
            ..PointLight::default()
        });

        let near_origin = HexahedronRegion::from_box(Vec3::splat(-10.0), Vec3::splat(10.0));
        let mut visible = Vec::new();
        scene.visible_point_lights(&near_origin, &mut visible);
        assert!(visible.is_empty());

        scene.point_light_mut(light).position = Vec3::ZERO;
        scene.visible_point_lights(&near_origin, &mut visible);
        assert_eq!(visible, vec![light]);
    }

    #[test]
    fn deleted_slots_get_new_generations() {
        let mut scene = Scene::new(settings());
        let first = scene.create_spot_light(SpotLight::default());
        scene.delete_spot_light(first);
        let second = scene.create_spot_light(SpotLight::default());
        assert_ne!(first, second);

        let mut visible = Vec::new();
        scene.visible_spot_lights(&everything(), &mut visible);
        assert_eq!(visible, vec![second]);
    }

    #[test]
    #[should_panic(expected = "already deleted")]
    fn double_delete_is_fatal() {
        let mut scene = Scene::new(settings());
        let light = scene.create_ambient_light(AmbientLight::default());
        scene.delete_ambient_light(light);
        scene.delete_ambient_light(light);
    }

    #[test]
    #[should_panic(expected = "does not refer to a live entity")]
    fn use_after_delete_is_fatal() {
        let mut scene = Scene::new(settings());
        let light = scene.create_directional_light(DirectionalLight::default());
        scene.delete_directional_light(light);
        scene.set_directional_light_matrix(light, Mat4::IDENTITY);
    }
}
