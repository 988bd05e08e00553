//! Property-based tests of the unfolding of simple solids.

use fxhash::FxHashSet;
use papernet::paper::{Model, PriorityWeights, UnfoldOptions, unfold};
use papernet::util_3d::Vector3;
use proptest::prelude::*;

// A prism with a regular polygon as base, `n` sides of radius 1
fn prism(n: u32, height: f32) -> Model {
    let mut positions = Vec::new();
    for z in [0.0, height] {
        for i in 0..n {
            let a = std::f32::consts::TAU * i as f32 / n as f32;
            positions.push(Vector3::new(a.cos(), a.sin(), z));
        }
    }
    let mut polygons = vec![(0..n).rev().collect::<Vec<u32>>(), (n..2 * n).collect()];
    for i in 0..n {
        let j = (i + 1) % n;
        polygons.push(vec![i, j, n + j, n + i]);
    }
    Model::from_polygons(positions, &polygons).unwrap()
}

fn arb_weights() -> impl Strategy<Value = PriorityWeights> {
    (-1.0..1.0f32, -1.0..1.0f32, -1.0..1.0f32).prop_map(|(convex, concave, length)| PriorityWeights {
        convex,
        concave,
        length,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_face_lands_in_one_island(n in 3u32..9, height in 0.2f32..3.0, priority in arb_weights()) {
        let model = prism(n, height);
        let num_faces = model.num_faces();
        let options = UnfoldOptions {
            scale: 0.02,
            priority,
            ..UnfoldOptions::default()
        };
        let pc = unfold(model, &options).unwrap();

        let mut seen = FxHashSet::default();
        for (_, island) in pc.islands() {
            for &f in island.faces() {
                prop_assert!(seen.insert(f));
            }
        }
        prop_assert_eq!(seen.len(), num_faces);

        let on_pages: usize = pc.pages().iter().map(|p| p.islands().len()).sum();
        prop_assert_eq!(on_pages, pc.num_islands());
    }

    #[test]
    fn islands_fit_the_printable_area(n in 3u32..7, height in 0.5f32..4.0, page in 0.1f32..0.3) {
        let options = UnfoldOptions {
            page_size: (page, page),
            margin: 0.0,
            scale: 0.02,
            // the joins only measure the faces
            create_stickers: false,
            create_numbers: false,
            create_pour_hole: false,
            ..UnfoldOptions::default()
        };
        let pc = unfold(prism(n, height), &options).unwrap();
        for (_, island) in pc.islands() {
            let bb = island.bounding_box();
            prop_assert!(bb.x <= page + 1e-4 && bb.y <= page + 1e-4);
        }
    }
}
