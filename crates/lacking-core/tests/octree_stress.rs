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

use lacking_core::math::{HexahedronRegion, Mat4, Vec3};
use lacking_core::spatial::{LooseOctree, OctreeSettings, VisitorBucket};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ITEM_COUNT: u32 = 10_000;
const HALF_EXTENT: f32 = 100.0;

fn populated_tree(rng: &mut StdRng) -> LooseOctree<u32> {
    let mut tree = LooseOctree::new(OctreeSettings {
        size: 4.0 * HALF_EXTENT,
        max_depth: 8,
        bias_ratio: 2.0,
        initial_node_capacity: 64,
        initial_item_capacity: 64,
    });
    for i in 0..ITEM_COUNT {
        let position = Vec3::new(
            rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
            rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
            rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
        );
        tree.insert(position, rng.gen_range(0.05..2.0), i);
    }
    tree
}

#[test]
fn whole_volume_query_returns_every_item() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut tree = populated_tree(&mut rng);
    assert_eq!(tree.len(), ITEM_COUNT as usize);

    let region = HexahedronRegion::from_box(
        Vec3::splat(-2.0 * HALF_EXTENT),
        Vec3::splat(2.0 * HALF_EXTENT),
    );
    let mut bucket = VisitorBucket::with_capacity(ITEM_COUNT as usize);
    let stats = tree.visit_hexahedron_region(&region, &mut bucket);

    assert_eq!(bucket.len(), ITEM_COUNT as usize);
    assert_eq!(stats.item_count_rejected, 0);
    assert_eq!(stats.item_count_accepted, ITEM_COUNT);

    let mut seen: Vec<u32> = bucket.items().to_vec();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), ITEM_COUNT as usize);
}

#[test]
fn churned_tree_never_misses_visible_items() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut tree = populated_tree(&mut rng);

    // Move a third of the items and remove another third.
    let ids: Vec<_> = tree.iter().map(|(id, value)| (id, *value)).collect();
    let mut expected = Vec::new();
    for (id, value) in ids {
        match value % 3 {
            0 => {
                let position = Vec3::new(
                    rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
                    rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
                    rng.gen_range(-HALF_EXTENT..HALF_EXTENT),
                );
                tree.update(id, position, 0.5);
                expected.push((value, position, 0.5));
            }
            1 => {
                tree.remove(id);
            }
            _ => {}
        }
    }

    let projection = Mat4::perspective_rh_gl(1.2, 1.0, 1.0, 150.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 20.0, 120.0), Vec3::ZERO, Vec3::Y);
    let region = HexahedronRegion::from_projection_matrix(&(projection * view));

    let mut bucket = VisitorBucket::default();
    tree.visit_hexahedron_region(&region, &mut bucket);
    let found: std::collections::HashSet<u32> = bucket.items().iter().copied().collect();

    for (value, position, radius) in expected {
        assert_eq!(
            found.contains(&value),
            region.is_sphere_visible(position, radius),
            "item {value} visibility mismatch"
        );
    }
    assert!(found.iter().all(|value| value % 3 != 1));
}
