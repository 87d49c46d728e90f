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

//! # Loose Octree
//!
//! A single octree serves both append-only (static) and mutable (dynamic)
//! item sets. Every node owns a cubic cell; its *loose* bounds are twice the
//! cell's edge, centered on the cell, so that an item whose center lies in a
//! cell and whose radius is small enough is fully contained in the loose cube
//! without being split across siblings.
//!
//! Items are stored in a slot array with a free list, so an [`ItemId`] stays
//! valid until the item is removed. The per-node item ranges used by queries
//! are rebuilt lazily: mutations only mark the tree dirty, and the next query
//! sorts items by node and garbage-collects empty leaves bottom-up.

use crate::math::{HexahedronRegion, Vec3, SQRT_3};
use crate::spatial::visitor::Visitor;

const NULL_NODE: u32 = u32::MAX;
const ROOT_NODE: u32 = 0;

/// A stable handle to an item stored in a [`LooseOctree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u32);

/// Construction parameters for a [`LooseOctree`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeSettings {
    /// Edge length of the root cell, centered on the origin.
    pub size: f32,
    /// Maximum depth of the tree. The root has depth 0.
    pub max_depth: u32,
    /// Radius multiplier (≥ 1.0). Larger values push items into larger nodes,
    /// trading deeper trees for fewer items tested twice.
    pub bias_ratio: f32,
    /// Number of nodes to reserve up front.
    pub initial_node_capacity: usize,
    /// Number of items to reserve up front.
    pub initial_item_capacity: usize,
}

impl Default for OctreeSettings {
    fn default() -> Self {
        Self {
            size: 32_000.0,
            max_depth: 15,
            bias_ratio: 2.0,
            initial_node_capacity: 4 * 1024,
            initial_item_capacity: 1024,
        }
    }
}

/// Counters gathered during a single region query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitStats {
    /// Nodes whose loose bounds were tested.
    pub node_count: u32,
    /// Nodes accepted (loose bounds intersect the region).
    pub node_count_accepted: u32,
    /// Nodes rejected together with their whole subtree.
    pub node_count_rejected: u32,
    /// Items individually tested inside accepted nodes.
    pub item_count: u32,
    /// Items handed to the visitor.
    pub item_count_accepted: u32,
    /// Items inside accepted nodes that failed their own test.
    pub item_count_rejected: u32,
}

#[derive(Debug, Clone)]
struct Node {
    center: Vec3,
    cell_size: f32,
    depth: u32,
    parent: u32,
    children: [u32; 8],
    item_count: u32,
    item_start: u32,
    item_end: u32,
    live: bool,
}

impl Node {
    fn new(center: Vec3, cell_size: f32, depth: u32, parent: u32) -> Self {
        Self {
            center,
            cell_size,
            depth,
            parent,
            children: [NULL_NODE; 8],
            item_count: 0,
            item_start: 0,
            item_end: 0,
            live: true,
        }
    }

    /// Radius of the sphere enclosing the loose cube (edge `2 * cell_size`).
    #[inline]
    fn loose_radius(&self) -> f32 {
        self.cell_size * SQRT_3
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.iter().all(|&child| child == NULL_NODE)
    }

    #[inline]
    fn contains_center(&self, position: Vec3) -> bool {
        let half = self.cell_size * 0.5;
        let delta = (position - self.center).abs();
        delta.x <= half && delta.y <= half && delta.z <= half
    }
}

#[derive(Debug, Clone)]
struct Item<T> {
    node: u32,
    position: Vec3,
    radius: f32,
    value: Option<T>,
    next_free: u32,
}

/// A loose octree keyed by bounding sphere.
#[derive(Debug, Clone)]
pub struct LooseOctree<T> {
    settings: OctreeSettings,
    nodes: Vec<Node>,
    free_node: u32,
    items: Vec<Item<T>>,
    free_item: u32,
    len: usize,
    order: Vec<u32>,
    dirty: bool,
    stack: Vec<u32>,
}

impl<T> LooseOctree<T> {
    /// Creates an empty octree.
    ///
    /// # Panics
    /// If `bias_ratio` is below `1.0` or `size` is not positive.
    pub fn new(settings: OctreeSettings) -> Self {
        assert!(
            settings.bias_ratio >= 1.0,
            "octree bias ratio must be at least 1.0, got {}",
            settings.bias_ratio
        );
        assert!(settings.size > 0.0, "octree size must be positive");
        let mut nodes = Vec::with_capacity(settings.initial_node_capacity.max(1));
        nodes.push(Node::new(Vec3::ZERO, settings.size, 0, NULL_NODE));
        Self {
            settings,
            nodes,
            free_node: NULL_NODE,
            items: Vec::with_capacity(settings.initial_item_capacity),
            free_item: NULL_NODE,
            len: 0,
            order: Vec::with_capacity(settings.initial_item_capacity),
            dirty: false,
            stack: Vec::new(),
        }
    }

    /// Returns the settings the tree was created with.
    pub fn settings(&self) -> &OctreeSettings {
        &self.settings
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of live nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.live).count()
    }

    /// Inserts an item with the given bounding sphere and returns its handle.
    pub fn insert(&mut self, position: Vec3, radius: f32, value: T) -> ItemId {
        let node = self.place(position, radius);
        self.nodes[node as usize].item_count += 1;
        let item = Item {
            node,
            position,
            radius,
            value: Some(value),
            next_free: NULL_NODE,
        };
        let index = if self.free_item != NULL_NODE {
            let index = self.free_item;
            self.free_item = self.items[index as usize].next_free;
            self.items[index as usize] = item;
            index
        } else {
            if self.items.len() == self.items.capacity() && !self.items.is_empty() {
                log::warn!(
                    "Octree item capacity {} exceeded, growing storage.",
                    self.items.capacity()
                );
            }
            self.items.push(item);
            (self.items.len() - 1) as u32
        };
        self.len += 1;
        self.dirty = true;
        ItemId(index)
    }

    /// Moves or resizes an item.
    ///
    /// # Panics
    /// If `id` does not refer to a live item.
    pub fn update(&mut self, id: ItemId, position: Vec3, radius: f32) {
        let old_node = self.live_item(id).node;
        let new_node = self.place(position, radius);
        let item = &mut self.items[id.0 as usize];
        item.position = position;
        item.radius = radius;
        if new_node != old_node {
            item.node = new_node;
            self.nodes[old_node as usize].item_count -= 1;
            self.nodes[new_node as usize].item_count += 1;
            self.dirty = true;
        }
    }

    /// Removes an item and returns its value. The handle may be reused afterwards.
    ///
    /// # Panics
    /// If `id` does not refer to a live item.
    pub fn remove(&mut self, id: ItemId) -> T {
        let node = self.live_item(id).node;
        self.nodes[node as usize].item_count -= 1;
        let item = &mut self.items[id.0 as usize];
        let value = item.value.take();
        item.next_free = self.free_item;
        self.free_item = id.0;
        self.len -= 1;
        self.dirty = true;
        match value {
            Some(value) => value,
            None => unreachable!("live item without a value"),
        }
    }

    /// Returns the value of a live item.
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.items.get(id.0 as usize)?.value.as_ref()
    }

    /// Returns the value of a live item mutably.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut T> {
        self.items.get_mut(id.0 as usize)?.value.as_mut()
    }

    /// Returns `true` if `id` refers to a live item.
    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Iterates over every live item in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| item.value.as_ref().map(|v| (ItemId(index as u32), v)))
    }

    /// Hands every item whose bounding sphere intersects `region` to `visitor`.
    ///
    /// Items in nodes whose loose bounds fall outside the region are skipped
    /// without being tested. The root node is always accepted, so items placed
    /// outside the root cell are never lost.
    pub fn visit_hexahedron_region(
        &mut self,
        region: &HexahedronRegion,
        visitor: &mut dyn Visitor<T>,
    ) -> VisitStats {
        self.refresh();

        let mut stats = VisitStats::default();
        let mut stack = std::mem::take(&mut self.stack);
        stack.clear();
        stack.push(ROOT_NODE);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            stats.node_count += 1;
            if index != ROOT_NODE && !region.is_sphere_visible(node.center, node.loose_radius()) {
                stats.node_count_rejected += 1;
                continue;
            }
            stats.node_count_accepted += 1;

            for &slot in &self.order[node.item_start as usize..node.item_end as usize] {
                let item = &self.items[slot as usize];
                stats.item_count += 1;
                if region.is_sphere_visible(item.position, item.radius) {
                    if let Some(value) = &item.value {
                        stats.item_count_accepted += 1;
                        visitor.visit(value);
                    }
                } else {
                    stats.item_count_rejected += 1;
                }
            }

            stack.extend(node.children.iter().copied().filter(|&c| c != NULL_NODE));
        }

        self.stack = stack;
        stats
    }

    fn live_item(&self, id: ItemId) -> &Item<T> {
        match self.items.get(id.0 as usize) {
            Some(item) if item.value.is_some() => item,
            _ => panic!("octree item {id:?} is not live"),
        }
    }

    /// Finds (creating as needed) the deepest node that fully contains the sphere.
    fn place(&mut self, position: Vec3, radius: f32) -> u32 {
        let mut current = ROOT_NODE;
        if !self.nodes[current as usize].contains_center(position) {
            return current;
        }
        let biased = radius * self.settings.bias_ratio;
        loop {
            let node = &self.nodes[current as usize];
            let child_cell = node.cell_size * 0.5;
            // The loose child cube extends `child_cell / 2` beyond its cell on
            // every side; the biased radius must fit in that margin.
            if node.depth >= self.settings.max_depth || biased > child_cell * 0.5 {
                return current;
            }
            let octant = octant_of(node.center, position);
            let existing = node.children[octant];
            current = if existing != NULL_NODE {
                existing
            } else {
                let offset = octant_offset(octant) * (child_cell * 0.5);
                let child = Node::new(node.center + offset, child_cell, node.depth + 1, current);
                let child_index = self.allocate_node(child);
                self.nodes[current as usize].children[octant] = child_index;
                child_index
            };
        }
    }

    fn allocate_node(&mut self, node: Node) -> u32 {
        if self.free_node != NULL_NODE {
            let index = self.free_node;
            // Free nodes chain through their parent field.
            self.free_node = self.nodes[index as usize].parent;
            self.nodes[index as usize] = node;
            return index;
        }
        if self.nodes.len() == self.nodes.capacity() {
            log::warn!(
                "Octree node capacity {} exceeded, growing storage.",
                self.nodes.capacity()
            );
        }
        self.nodes.push(node);
        (self.nodes.len() - 1) as u32
    }

    fn release_node(&mut self, index: u32) {
        let parent = self.nodes[index as usize].parent;
        if let Some(slot) = self.nodes[parent as usize]
            .children
            .iter_mut()
            .find(|child| **child == index)
        {
            *slot = NULL_NODE;
        }
        let node = &mut self.nodes[index as usize];
        node.live = false;
        node.parent = self.free_node;
        self.free_node = index;
    }

    /// Rebuilds per-node item ranges and drops empty leaves.
    fn refresh(&mut self) {
        if !self.dirty {
            return;
        }

        // Garbage-collect bottom-up: deeper nodes first, so a parent emptied
        // by the removal of its last child is considered afterwards.
        let mut candidates: Vec<u32> = (1..self.nodes.len() as u32)
            .filter(|&i| self.nodes[i as usize].live)
            .collect();
        candidates.sort_by_key(|&i| std::cmp::Reverse(self.nodes[i as usize].depth));
        for index in candidates {
            let node = &self.nodes[index as usize];
            if node.item_count == 0 && node.is_leaf() {
                self.release_node(index);
            }
        }

        self.order.clear();
        self.order.extend(
            self.items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.value.is_some())
                .map(|(index, _)| index as u32),
        );
        let items = &self.items;
        self.order.sort_by_key(|&slot| items[slot as usize].node);

        for node in &mut self.nodes {
            node.item_start = 0;
            node.item_end = 0;
        }
        let mut start = 0usize;
        while start < self.order.len() {
            let node = self.items[self.order[start] as usize].node;
            let mut end = start;
            while end < self.order.len() && self.items[self.order[end] as usize].node == node {
                end += 1;
            }
            let node = &mut self.nodes[node as usize];
            node.item_start = start as u32;
            node.item_end = end as u32;
            start = end;
        }

        self.dirty = false;
    }
}

#[inline]
fn octant_of(center: Vec3, position: Vec3) -> usize {
    let mut octant = 0;
    if position.x >= center.x {
        octant |= 1;
    }
    if position.y >= center.y {
        octant |= 2;
    }
    if position.z >= center.z {
        octant |= 4;
    }
    octant
}

#[inline]
fn octant_offset(octant: usize) -> Vec3 {
    let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
    Vec3::new(sign(1), sign(2), sign(4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::spatial::VisitorBucket;

    fn settings() -> OctreeSettings {
        OctreeSettings {
            size: 64.0,
            max_depth: 6,
            bias_ratio: 1.0,
            initial_node_capacity: 16,
            initial_item_capacity: 16,
        }
    }

    fn query(tree: &mut LooseOctree<u32>, region: &HexahedronRegion) -> (Vec<u32>, VisitStats) {
        let mut bucket = VisitorBucket::default();
        let stats = tree.visit_hexahedron_region(region, &mut bucket);
        let mut found = bucket.items().to_vec();
        found.sort_unstable();
        (found, stats)
    }

    #[test]
    fn small_items_descend_and_large_items_stay_high() {
        let mut tree = LooseOctree::new(settings());
        let small = tree.insert(Vec3::new(10.0, 10.0, 10.0), 0.1, 1);
        let large = tree.insert(Vec3::new(10.0, 10.0, 10.0), 30.0, 2);
        let small_depth = tree.nodes[tree.items[small.0 as usize].node as usize].depth;
        let large_depth = tree.nodes[tree.items[large.0 as usize].node as usize].depth;
        assert_eq!(small_depth, 6);
        assert_eq!(large_depth, 0);
    }

    #[test]
    fn query_returns_only_items_in_region() {
        let mut tree = LooseOctree::new(settings());
        tree.insert(Vec3::new(1.0, 1.0, 1.0), 0.5, 1);
        tree.insert(Vec3::new(-20.0, 5.0, 3.0), 0.5, 2);
        tree.insert(Vec3::new(25.0, -25.0, 25.0), 1.0, 3);

        let region = HexahedronRegion::from_box(Vec3::splat(-2.0), Vec3::splat(2.0));
        let (found, stats) = query(&mut tree, &region);
        assert_eq!(found, vec![1]);
        assert!(stats.node_count_rejected > 0);
    }

    #[test]
    fn update_moves_items_between_nodes() {
        let mut tree = LooseOctree::new(settings());
        let id = tree.insert(Vec3::new(20.0, 20.0, 20.0), 0.5, 7);
        let near_origin = HexahedronRegion::from_box(Vec3::splat(-2.0), Vec3::splat(2.0));
        assert!(query(&mut tree, &near_origin).0.is_empty());

        tree.update(id, Vec3::ZERO, 0.5);
        assert_eq!(query(&mut tree, &near_origin).0, vec![7]);
    }

    #[test]
    fn removed_slots_are_reused_and_empty_nodes_collected() {
        let mut tree = LooseOctree::new(settings());
        let a = tree.insert(Vec3::new(20.0, 20.0, 20.0), 0.5, 1);
        assert!(tree.node_count() > 1);
        assert_eq!(tree.remove(a), 1);
        assert!(!tree.contains(a));

        let everything = HexahedronRegion::from_box(Vec3::splat(-64.0), Vec3::splat(64.0));
        assert!(query(&mut tree, &everything).0.is_empty());
        assert_eq!(tree.node_count(), 1);

        let b = tree.insert(Vec3::ZERO, 0.5, 2);
        assert_eq!(a, b);
        assert_eq!(tree.get(b), Some(&2));
    }

    #[test]
    fn items_outside_root_are_still_found() {
        let mut tree = LooseOctree::new(settings());
        tree.insert(Vec3::new(500.0, 0.0, 0.0), 1.0, 9);
        let region =
            HexahedronRegion::from_box(Vec3::new(490.0, -5.0, -5.0), Vec3::new(510.0, 5.0, 5.0));
        assert_eq!(query(&mut tree, &region).0, vec![9]);
    }

    #[test]
    fn frustum_query_matches_brute_force() {
        let mut tree = LooseOctree::new(settings());
        let mut spheres = Vec::new();
        for i in 0..500u32 {
            let f = i as f32;
            let position = Vec3::new(
                (f * 7.31).sin() * 30.0,
                (f * 3.17).cos() * 30.0,
                (f * 1.93).sin() * 30.0,
            );
            let radius = 0.1 + (i % 7) as f32 * 0.4;
            spheres.push((position, radius));
            tree.insert(position, radius, i);
        }

        let projection = Mat4::perspective_rh_gl(1.0, 1.5, 0.5, 40.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 35.0), Vec3::ZERO, Vec3::Y);
        let region = HexahedronRegion::from_projection_matrix(&(projection * view));

        let expected: Vec<u32> = spheres
            .iter()
            .enumerate()
            .filter(|(_, (p, r))| region.is_sphere_visible(*p, *r))
            .map(|(i, _)| i as u32)
            .collect();
        let (found, _) = query(&mut tree, &region);
        assert_eq!(found, expected);
    }

    #[test]
    #[should_panic(expected = "is not live")]
    fn double_remove_panics() {
        let mut tree = LooseOctree::new(settings());
        let id = tree.insert(Vec3::ZERO, 1.0, 0u32);
        tree.remove(id);
        tree.remove(id);
    }
}
