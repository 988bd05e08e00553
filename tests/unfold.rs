use fxhash::FxHashSet;
use papernet::paper::{
    EdgeIndex, EdgeType, FaceIndex, IslandName, MarkerDocument, Model, Papercraft, UnfoldError, UnfoldOptions, VertexIndex,
    unfold,
};
use papernet::util_3d::{Vector2, Vector3};

const CUBE_FACES: [[u32; 4]; 6] = [
    [0, 3, 2, 1], // bottom
    [4, 5, 6, 7], // top
    [0, 1, 5, 4], // front
    [3, 7, 6, 2], // back
    [0, 4, 7, 3], // left
    [1, 2, 6, 5], // right
];

fn brick(x: f32, y: f32, z: f32) -> Model {
    let positions = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(x, 0.0, 0.0),
        Vector3::new(x, y, 0.0),
        Vector3::new(0.0, y, 0.0),
        Vector3::new(0.0, 0.0, z),
        Vector3::new(x, 0.0, z),
        Vector3::new(x, y, z),
        Vector3::new(0.0, y, z),
    ];
    let polygons: Vec<Vec<u32>> = CUBE_FACES.iter().map(|f| f.to_vec()).collect();
    Model::from_polygons(positions, &polygons).unwrap()
}

fn cube() -> Model {
    brick(1.0, 1.0, 1.0)
}

// An open fan of five triangles around the origin, with more than 360 degrees in total
fn saddle_fan() -> Model {
    let zs = [0.6, -0.6, 0.6, -0.6, 0.0];
    let mut positions = vec![Vector3::new(0.0, 0.0, 0.0)];
    for (i, z) in zs.into_iter().enumerate() {
        let a = (72.0 * i as f32).to_radians();
        positions.push(Vector3::new(a.cos(), a.sin(), z));
    }
    let polygons: Vec<Vec<u32>> = (1..=5).map(|i| vec![0, i, i % 5 + 1]).collect();
    Model::from_polygons(positions, &polygons).unwrap()
}

fn small_options() -> UnfoldOptions {
    UnfoldOptions {
        scale: 0.05,
        ..UnfoldOptions::default()
    }
}

fn edge(model: &Model, a: usize, b: usize) -> EdgeIndex {
    model.find_edge(VertexIndex::from(a), VertexIndex::from(b)).unwrap()
}

// Every face is in exactly one island, and the island of a face knows it
fn assert_partition(pc: &Papercraft) {
    let mut seen = FxHashSet::default();
    for (key, island) in pc.islands() {
        for &f in island.faces() {
            assert!(seen.insert(f), "face {f:?} is in two islands");
            assert_eq!(pc.island_by_face(f), key);
        }
    }
    assert_eq!(seen.len(), pc.model().num_faces());
}

fn count_markers(pc: &Papercraft, pred: impl Fn(&MarkerDocument) -> bool) -> usize {
    pc.to_document()
        .pages
        .iter()
        .flat_map(|p| &p.islands)
        .flat_map(|i| &i.markers)
        .filter(|m| pred(m))
        .count()
}

#[test]
fn cube_without_limit_is_a_single_island() {
    let options = UnfoldOptions {
        limit_by_page: false,
        ..UnfoldOptions::default()
    };
    let mut pc = Papercraft::new(cube(), options).unwrap();
    pc.prepare().unwrap();
    assert_eq!(pc.num_islands(), 1);
    assert_partition(&pc);
    // a tree of 6 faces joins 5 edges
    assert_eq!(pc.cut_edges().len(), 12 - 5);
    let (_, island) = pc.islands().next().unwrap();
    assert_eq!(island.number(), 1);
    assert_eq!(island.label(), "Island 1");
    assert!(!island.is_inside_out());
}

#[test]
fn small_pages_split_the_cube() {
    let options = UnfoldOptions {
        page_size: (2.5, 2.5),
        margin: 0.0,
        create_stickers: false,
        create_numbers: false,
        create_pour_hole: false,
        ..UnfoldOptions::default()
    };
    let pc = unfold(cube(), &options).unwrap();
    assert!(pc.num_islands() >= 2);
    assert_partition(&pc);

    let mut placed = 0;
    for page in pc.pages() {
        let islands: Vec<_> = page.islands().iter().map(|&k| pc.island_by_key(k).unwrap()).collect();
        for (i, a) in islands.iter().enumerate() {
            let bb = a.bounding_box();
            assert!(bb.x <= 2.5 + 1e-4 && bb.y <= 2.5 + 1e-4, "{bb:?}");
            for b in &islands[i + 1..] {
                let (pa, pb, sa, sb) = (a.pos(), b.pos(), a.bounding_box(), b.bounding_box());
                let apart = pa.x + sa.x <= pb.x + 1e-5
                    || pb.x + sb.x <= pa.x + 1e-5
                    || pa.y + sa.y <= pb.y + 1e-5
                    || pb.y + sb.y <= pa.y + 1e-5;
                assert!(apart, "islands overlap in the page");
            }
        }
        placed += islands.len();
    }
    assert_eq!(placed, pc.num_islands());
}

#[test]
fn seams_stay_cut() {
    let model = cube();
    let seam = edge(&model, 0, 1);
    let options = UnfoldOptions {
        seams: vec![usize::from(seam) as u32],
        ..small_options()
    };
    let pc = unfold(model, &options).unwrap();
    assert!(pc.edge_data(seam).force_cut());
    assert!(pc.edge_data(seam).is_main_cut());
    assert!(pc.cut_edges().contains(&seam));
    assert_partition(&pc);
}

#[test]
fn model_seams_stay_cut() {
    let mut model = cube();
    let seam = edge(&model, 2, 6);
    model.set_seam(seam, true);
    let pc = unfold(model, &small_options()).unwrap();
    assert!(pc.cut_edges().contains(&seam));
}

#[test]
fn overlapping_fan_is_split() {
    let options = UnfoldOptions {
        limit_by_page: false,
        ..small_options()
    };
    let pc = unfold(saddle_fan(), &options).unwrap();
    // any four triangles fit around the center, all five would overlap
    assert!(pc.num_islands() >= 2);
    assert_partition(&pc);
}

#[test]
fn length_weight_changes_the_cuts() {
    let long_cuts = |length: f32| {
        let mut options = UnfoldOptions {
            limit_by_page: false,
            scale: 0.02,
            ..UnfoldOptions::default()
        };
        options.priority.length = length;
        let pc = unfold(brick(1.0, 1.0, 3.0), &options).unwrap();
        assert_partition(&pc);
        pc.cut_edges()
            .into_iter()
            .filter(|&e| pc.model().edge_length(e) > 2.0)
            .count()
    };
    // positive weights join the short edges first, so the long ones get cut
    let cut_when_short_first = long_cuts(10.0);
    let cut_when_long_first = long_cuts(-10.0);
    assert_eq!(cut_when_short_first, 4);
    assert!(cut_when_long_first < cut_when_short_first);
}

#[test]
fn unfolding_is_deterministic() {
    let run = || {
        let pc = unfold(brick(1.0, 2.0, 1.5), &small_options()).unwrap();
        serde_json::to_string(&pc.to_document()).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn every_cut_edge_gets_a_glue_tab() {
    let pc = unfold(cube(), &small_options()).unwrap();
    let cuts = pc.cut_edges().len();
    assert!(cuts > 0);
    let tabs = count_markers(&pc, |m| matches!(m, MarkerDocument::Sticker { .. }));
    assert_eq!(tabs, cuts);
    let holes = count_markers(&pc, |m| matches!(m, MarkerDocument::PourHole { .. }));
    assert_eq!(holes, 1);
}

#[test]
fn pins_go_on_both_sides() {
    let model = cube();
    let all: Vec<u32> = (0..model.num_edges() as u32).collect();
    let options = UnfoldOptions {
        pin_edges: all,
        create_pour_hole: false,
        ..small_options()
    };
    let pc = unfold(model, &options).unwrap();
    let cuts = pc.cut_edges().len();
    let pins = count_markers(&pc, |m| {
        matches!(m, MarkerDocument::Sticker { edge_type: EdgeType::Pin, .. })
    });
    let reversed = count_markers(&pc, |m| matches!(m, MarkerDocument::Sticker { reversed: true, .. }));
    assert_eq!(pins, 2 * cuts);
    assert_eq!(reversed, cuts);
}

#[test]
fn numbers_without_stickers() {
    let options = UnfoldOptions {
        create_stickers: false,
        ..small_options()
    };
    let pc = unfold(cube(), &options).unwrap();
    let numbers = count_markers(&pc, |m| matches!(m, MarkerDocument::Number { .. }));
    assert_eq!(numbers, 2 * pc.cut_edges().len());
    assert_eq!(count_markers(&pc, |m| matches!(m, MarkerDocument::Sticker { .. })), 0);
}

#[test]
fn document_coordinates_are_inside_the_page() {
    let pc = unfold(brick(1.0, 2.0, 0.5), &small_options()).unwrap();
    let doc = pc.to_document();
    let [w, h] = doc.page_size;
    for island in doc.pages.iter().flat_map(|p| &p.islands) {
        for face in &island.faces {
            for &[x, y] in &face.points {
                assert!((-1e-4..=w + 1e-4).contains(&x), "{x}");
                assert!((-1e-4..=h + 1e-4).contains(&y), "{y}");
            }
        }
        // a closed net has a single boundary ring
        assert_eq!(island.boundary.len(), 1);
    }
    let json = serde_json::to_value(&doc).unwrap();
    assert!(json["pages"][0]["islands"][0]["markers"].is_array());
}

#[test]
fn oversized_island_is_an_error() {
    let options = UnfoldOptions {
        limit_by_page: false,
        ..UnfoldOptions::default()
    };
    match unfold(cube(), &options) {
        Err(e @ UnfoldError::IslandTooBig { .. }) => {
            assert!(!e.is_internal());
            let UnfoldError::IslandTooBig { faces, .. } = e else { unreachable!() };
            assert_eq!(faces.len(), 6);
        }
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("a 1 m cube cannot fit an A4 page"),
    }
}

#[test]
fn degenerate_faces_are_reported() {
    let positions = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    ];
    let model = Model::from_polygons(positions, &[vec![0, 1, 2], vec![0, 1, 3]]).unwrap();
    match unfold(model, &UnfoldOptions::default()) {
        Err(UnfoldError::InvalidGeometry {
            zero_length_edges,
            zero_area_faces,
            ..
        }) => {
            assert_eq!(zero_length_edges.len(), 1);
            assert_eq!(zero_area_faces, vec![FaceIndex::from(0)]);
        }
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("degenerate geometry accepted"),
    }
}

#[test]
fn bad_polygons_are_rejected() {
    let positions = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)];
    assert!(matches!(
        Model::from_polygons(positions.clone(), &[vec![0, 1]]),
        Err(UnfoldError::DegenerateFace { face: 0, corners: 2 })
    ));
    assert!(matches!(
        Model::from_polygons(positions, &[vec![0, 1, 5]]),
        Err(UnfoldError::InvalidVertexIndex { vertex: 5, .. })
    ));
}

fn split_cube(length: f32) -> Papercraft {
    let mut options = UnfoldOptions {
        page_size: (2.5, 2.5),
        margin: 0.0,
        create_stickers: false,
        create_numbers: false,
        create_pour_hole: false,
        ..UnfoldOptions::default()
    };
    options.priority.length = length;
    let mut pc = Papercraft::new(cube(), options).unwrap();
    pc.prepare().unwrap();
    pc
}

#[test]
fn names_follow_the_faces_into_a_new_run() {
    let first = split_cube(-0.05);
    let mut previous: Vec<IslandName> = first
        .islands()
        .map(|(_, island)| IslandName {
            faces: island.faces().to_vec(),
            label: format!("Part {}", island.number()),
            abbreviation: format!("P{}", island.number()),
        })
        .collect();
    previous.push(IslandName {
        faces: Vec::new(),
        label: "Spare".to_string(),
        abbreviation: "S".to_string(),
    });

    let mut second = split_cube(1.0);
    second.copy_island_names(&previous);
    second.layout().unwrap();

    let islands: Vec<_> = second.islands().map(|(_, island)| island).collect();
    let overlap = |i: usize, j: usize| {
        let faces = islands[i].faces();
        previous[j].faces.iter().filter(|f| faces.contains(f)).count()
    };
    // the pair sharing the most faces is always matched
    let (_, best_i, best_j) = (0..islands.len())
        .flat_map(|i| (0..previous.len()).map(move |j| (i, j)))
        .map(|(i, j)| (overlap(i, j), i, j))
        .max()
        .unwrap();
    assert_eq!(islands[best_i].label(), previous[best_j].label);
    assert_eq!(islands[best_i].abbreviation(), previous[best_j].abbreviation);

    let mut used = FxHashSet::default();
    for (i, island) in islands.iter().enumerate() {
        match previous.iter().position(|p| p.label == island.label()) {
            Some(j) => {
                assert!(used.insert(j), "{} was copied twice", island.label());
                assert!(overlap(i, j) > 0);
            }
            None => assert_eq!(island.label(), format!("Island {}", island.number())),
        }
    }
    assert!(!used.contains(&(previous.len() - 1)));
}

#[test]
fn largest_island_ratio_of_a_single_quad() {
    let positions = vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(1.0, 2.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
    ];
    let model = Model::from_polygons(positions, &[vec![0, 1, 2, 3]]).unwrap();
    let options = UnfoldOptions {
        page_size: (4.0, 4.0),
        margin: 0.0,
        scale: 1.0,
        create_stickers: false,
        create_numbers: false,
        create_pour_hole: false,
        ..UnfoldOptions::default()
    };
    let pc = unfold(model, &options).unwrap();
    let ratio = pc.largest_island_ratio(Vector2::new(4.0, 4.0));
    assert!((ratio - 0.5).abs() < 1e-4, "{ratio}");
}
