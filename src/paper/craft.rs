use std::f32::consts::PI;

use cgmath::InnerSpace;
use slotmap::{SlotMap, new_key_type};

use crate::util_3d::{Plane, Vector2};

use super::model::index_type;
use super::*;

mod boundary;
mod join;
mod layout;
mod stickers;
mod sweep;

pub use join::{JoinRejection, JoinResult};
pub use layout::cage_fit;
pub use sweep::SweepResult;

new_key_type! {
    pub struct IslandKey;
}

// Initially there is one UVVertex per loop, with the same index, but joins make them shared
index_type!(pub UVVertexIndex: u32);

#[derive(Debug, Clone)]
pub struct UVVertex {
    co: Vector2,
}

impl UVVertex {
    pub fn co(&self) -> Vector2 {
        self.co
    }
}

/// The flattened counterpart of a face corner.
///
/// There is exactly one per mesh loop, so they are indexed by `LoopIndex`.
#[derive(Debug, Clone)]
pub struct UVEdge {
    va: UVVertexIndex,
    vb: UVVertexIndex,
    neighbor_left: Option<LoopIndex>,
    neighbor_right: Option<LoopIndex>,
    sticker: Option<usize>,
    pour_hole: Option<usize>,
}

impl UVEdge {
    pub fn va(&self) -> UVVertexIndex {
        self.va
    }
    pub fn vb(&self) -> UVVertexIndex {
        self.vb
    }
    pub fn neighbor_left(&self) -> Option<LoopIndex> {
        self.neighbor_left
    }
    pub fn neighbor_right(&self) -> Option<LoopIndex> {
        self.neighbor_right
    }
    /// Index into the island markers of the sticker of this edge.
    pub fn sticker(&self) -> Option<usize> {
        self.sticker
    }
    pub fn pour_hole(&self) -> Option<usize> {
        self.pour_hole
    }
}

#[derive(Debug, Clone)]
pub struct UVFace {
    island: IslandKey,
    flipped: bool,
}

impl UVFace {
    pub fn island(&self) -> IslandKey {
        self.island
    }
    /// The face is mirrored in the island, relative to its 3D winding.
    pub fn flipped(&self) -> bool {
        self.flipped
    }
}

#[derive(Debug, Clone)]
pub struct Island {
    faces: Vec<FaceIndex>,
    boundary: Vec<LoopIndex>,
    markers: Vec<Marker>,
    pos: Vector2,
    bounding_box: Vector2,
    has_safe_geometry: bool,
    is_inside_out: bool,
    number: u32,
    label: String,
    abbreviation: String,
    title: Option<String>,
    sticker_numbering: u32,
}

impl Island {
    fn new(i_face: FaceIndex, boundary: Vec<LoopIndex>) -> Island {
        Island {
            faces: vec![i_face],
            boundary,
            markers: Vec::new(),
            pos: Vector2::new(0.0, 0.0),
            bounding_box: Vector2::new(0.0, 0.0),
            has_safe_geometry: true,
            is_inside_out: false,
            number: 0,
            label: String::new(),
            abbreviation: String::new(),
            title: None,
            sticker_numbering: 0,
        }
    }
    pub fn faces(&self) -> &[FaceIndex] {
        &self.faces
    }
    /// The cut edges of the island, in no particular order.
    pub fn boundary(&self) -> &[LoopIndex] {
        &self.boundary
    }
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
    /// Position of the island on its page, relative to the printable area.
    pub fn pos(&self) -> Vector2 {
        self.pos
    }
    pub fn bounding_box(&self) -> Vector2 {
        self.bounding_box
    }
    pub fn has_safe_geometry(&self) -> bool {
        self.has_safe_geometry
    }
    pub fn is_inside_out(&self) -> bool {
        self.is_inside_out
    }
    pub fn number(&self) -> u32 {
        self.number
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
    fn root_face(&self) -> FaceIndex {
        self.faces.iter().copied().min().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    islands: Vec<IslandKey>,
}

impl Page {
    pub fn islands(&self) -> &[IslandKey] {
        &self.islands
    }
}

/// Per-run state of a mesh edge.
#[derive(Debug, Clone)]
pub struct EdgeData {
    main_faces: Option<[LoopIndex; 2]>,
    angle: f32,
    priority: f32,
    force_cut: bool,
    is_main_cut: bool,
    edge_type: EdgeType,
    uvedges: Vec<LoopIndex>,
}

impl EdgeData {
    pub fn main_faces(&self) -> Option<[LoopIndex; 2]> {
        self.main_faces
    }
    /// Dihedral angle, positive for convex edges.
    pub fn angle(&self) -> f32 {
        self.angle
    }
    pub fn priority(&self) -> f32 {
        self.priority
    }
    pub fn force_cut(&self) -> bool {
        self.force_cut
    }
    /// The two main faces are not joined in the net.
    pub fn is_main_cut(&self) -> bool {
        self.is_main_cut
    }
    pub fn edge_type(&self) -> EdgeType {
        self.edge_type
    }
    /// The UVEdges of this edge, the two main ones first once the cuts are generated.
    pub fn uvedges(&self) -> &[LoopIndex] {
        &self.uvedges
    }
}

/// Labels of an island of a previous run, see [`Papercraft::copy_island_names`].
#[derive(Debug, Clone)]
pub struct IslandName {
    pub faces: Vec<FaceIndex>,
    pub label: String,
    pub abbreviation: String,
}

pub struct Papercraft {
    model: Model,
    options: UnfoldOptions,
    edges: Vec<EdgeData>, //parallel to EdgeIndex
    uv_vertices: Vec<UVVertex>,
    uv_edges: Vec<UVEdge>, //parallel to LoopIndex
    uv_faces: Vec<UVFace>, //parallel to FaceIndex
    islands: SlotMap<IslandKey, Island>,
    island_order: Vec<IslandKey>,
    pages: Vec<Page>,
}

impl Papercraft {
    /// Validates the model and flattens every face into its own island.
    pub fn new(model: Model, options: UnfoldOptions) -> Result<Papercraft> {
        model.check_correct()?;

        let edges = model
            .edges()
            .map(|(i_edge, edge)| {
                let main_faces = choose_main_faces(&model, i_edge);
                let angle = main_faces.map_or(0.0, |m| calculate_angle(&model, i_edge, m));
                let force_cut = edge.seam() || options.seams.contains(&(usize::from(i_edge) as u32));
                EdgeData {
                    main_faces,
                    angle,
                    priority: 0.0,
                    force_cut,
                    is_main_cut: true,
                    edge_type: options.edge_type(i_edge).unwrap_or(edge.edge_type()),
                    uvedges: edge.loops().to_vec(),
                }
            })
            .collect();

        let mut islands = SlotMap::with_key();
        let mut uv_vertices = Vec::with_capacity(model.num_loops());
        let mut uv_edges = Vec::with_capacity(model.num_loops());
        let mut uv_faces = Vec::with_capacity(model.num_faces());
        for (i_face, face) in model.faces() {
            let plane = Plane::z_up(face.normal());
            let boundary: Vec<LoopIndex> = face.loops().collect();
            for &i_loop in &boundary {
                let lp = &model[i_loop];
                uv_vertices.push(UVVertex {
                    co: plane.project(&model[lp.vertex()].pos()),
                });
                uv_edges.push(UVEdge {
                    va: UVVertexIndex::from(usize::from(i_loop)),
                    vb: UVVertexIndex::from(usize::from(lp.next())),
                    neighbor_left: None,
                    neighbor_right: None,
                    sticker: None,
                    pour_hole: None,
                });
            }
            let island = islands.insert(Island::new(i_face, boundary));
            uv_faces.push(UVFace { island, flipped: false });
        }

        Ok(Papercraft {
            model,
            options,
            edges,
            uv_vertices,
            uv_edges,
            uv_faces,
            islands,
            island_order: Vec::new(),
            pages: Vec::new(),
        })
    }

    /// Decides the cuts and gives every island its final orientation and its number.
    pub fn prepare(&mut self) -> Result<()> {
        let (w, h) = self.options.printable_size();
        let cage = Vector2::new(w, h);
        let size_limit = self.options.limit_by_page.then(|| self.faces_cage(cage) / self.options.scale);
        self.generate_cuts(size_limit)?;
        self.finalize_islands(cage, 0.0);
        self.enumerate_islands();
        Ok(())
    }

    // The room left to the faces of an island once the markers around it and its title are added
    fn faces_cage(&self, cage: Vector2) -> Vector2 {
        let width = self.options.sticker_width;
        // arrows stick out a bit more than the stickers
        let border = if self.options.create_stickers { 2.4 * width } else { 0.0 };
        let title = if self.options.create_numbers { 1.2 * width } else { 0.0 };
        let inner = Vector2::new(cage.x - border, cage.y - border - title);
        if inner.x > 0.0 && inner.y > 0.0 { inner } else { cage }
    }

    /// Scales the islands, adds the markers and packs everything into pages.
    pub fn layout(&mut self) -> Result<()> {
        self.layout_with(&DefaultStickers)
    }

    /// Like [`Papercraft::layout`], with custom shapes for the pins, teeth and pour hole.
    pub fn layout_with(&mut self, geometry: &dyn StickerGeometry) -> Result<()> {
        let width = self.options.sticker_width;
        self.scale_islands(self.options.scale);
        if self.options.create_stickers {
            self.generate_stickers_with(geometry, width, self.options.create_numbers);
        } else if self.options.create_numbers {
            self.generate_numbers_alone(width);
        }
        if self.options.create_pour_hole {
            self.add_pour_hole_with(geometry);
        }
        let title_height = if self.options.create_numbers && self.islands.len() > 1 {
            width * 1.2
        } else {
            0.0
        };
        let (w, h) = self.options.printable_size();
        let cage = Vector2::new(w, h);
        self.finalize_islands(cage, title_height);
        self.fit_islands(cage)
    }

    /// Greedily joins the islands along the edges with the lowest priority.
    pub fn generate_cuts(&mut self, size_limit: Option<Vector2>) -> Result<()> {
        let weights = self.options.priority;
        let mut candidates: Vec<EdgeIndex> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.main_faces.is_some() && !e.force_cut)
            .map(|(i, _)| EdgeIndex::from(i))
            .collect();

        if !candidates.is_empty() {
            let average_length = candidates
                .iter()
                .map(|&e| self.model.edge_length(e))
                .sum::<f32>()
                / candidates.len() as f32;
            for &i_edge in &candidates {
                let length = self.model.edge_length(i_edge);
                let edge = &mut self.edges[usize::from(i_edge)];
                edge.priority = edge_priority(edge.angle, length, average_length, &weights);
            }
            candidates.sort_by(|&a, &b| {
                let pa = self.edges[usize::from(a)].priority;
                let pb = self.edges[usize::from(b)].priority;
                pa.total_cmp(&pb).then(a.cmp(&b))
            });

            for i_edge in candidates {
                if self.model.edge_length(i_edge) == 0.0 {
                    continue;
                }
                // a previous join may have changed the main faces
                let Some([a, b]) = self.edges[usize::from(i_edge)].main_faces else { continue };
                match self.join(a, b, size_limit)? {
                    JoinResult::Joined(absorbed) => {
                        self.islands.remove(absorbed);
                        self.edges[usize::from(i_edge)].is_main_cut = false;
                    }
                    JoinResult::Rejected(reason) => {
                        log::debug!("edge {} stays cut: {reason:?}", usize::from(i_edge));
                    }
                }
            }
        }

        let mut order: Vec<IslandKey> = self.islands.keys().collect();
        order.sort_by_key(|&k| {
            let island = &self.islands[k];
            (std::cmp::Reverse(island.faces.len()), island.root_face())
        });
        self.island_order = order;

        // Some edges did not know until now whether their angle is convex or concave
        for (i, edge) in self.edges.iter_mut().enumerate() {
            let Some(main) = edge.main_faces else { continue };
            if main.iter().any(|&l| self.uv_faces[usize::from(self.model[l].face())].flipped) {
                edge.angle = calculate_angle(&self.model, EdgeIndex::from(i), main);
            }
        }

        // Main UVEdges go first, so that the stickers know what to glue
        for edge in &mut self.edges {
            if let Some(main) = edge.main_faces {
                let mut uvedges = main.to_vec();
                uvedges.extend(edge.uvedges.iter().filter(|l| !main.contains(l)));
                edge.uvedges = uvedges;
            }
        }

        for &key in &self.island_order {
            let island = &self.islands[key];
            if !island.faces.iter().any(|&f| self.uv_faces[usize::from(f)].flipped) {
                continue;
            }
            let mut balance = 0;
            for &i_face in &island.faces {
                for i_loop in self.model[i_face].loops() {
                    let edge = &self.edges[usize::from(self.model[i_loop].edge())];
                    // count every joined edge once, from its first main face
                    if !edge.is_main_cut && edge.main_faces.is_some_and(|m| m[0] == i_loop) {
                        balance += if edge.angle > 0.0 { 1 } else { -1 };
                    }
                }
            }
            self.islands[key].is_inside_out = balance < 0;
        }

        self.link_boundaries();
        log::info!(
            "{} islands, {} of {} edges cut",
            self.island_order.len(),
            self.cut_edges().len(),
            self.model.num_edges()
        );
        Ok(())
    }

    /// Numbers the islands by size and gives them their default labels.
    pub fn enumerate_islands(&mut self) {
        for (n, &key) in self.island_order.iter().enumerate() {
            let island = &mut self.islands[key];
            island.number = n as u32 + 1;
            if island.abbreviation.is_empty() {
                island.abbreviation = island.number.to_string();
                if is_upsidedown_wrong(&island.abbreviation) {
                    island.abbreviation.push('.');
                }
            }
            if island.label.is_empty() {
                island.label = format!("Island {}", island.number);
            }
        }
    }

    /// Takes the labels of the best matching islands of a previous run.
    ///
    /// Islands are matched greedily by the number of faces they share.
    pub fn copy_island_names(&mut self, previous: &[IslandName]) {
        let mut matching = Vec::new();
        for (i, &key) in self.island_order.iter().enumerate() {
            let faces = &self.islands[key].faces;
            for (j, item) in previous.iter().enumerate() {
                let count = item.faces.iter().filter(|f| faces.contains(f)).count();
                matching.push((count, i, j));
            }
        }
        matching.sort_by(|a, b| b.cmp(a));
        let mut available_new = vec![true; self.island_order.len()];
        let mut available_prev = vec![true; previous.len()];
        for (count, i, j) in matching {
            if count == 0 {
                break;
            }
            if available_new[i] && available_prev[j] {
                available_new[i] = false;
                available_prev[j] = false;
                let island = &mut self.islands[self.island_order[i]];
                island.label = previous[j].label.clone();
                island.abbreviation = previous[j].abbreviation.clone();
            }
        }
    }

    /// The edges the host should mark as seams.
    pub fn cut_edges(&self) -> Vec<EdgeIndex> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.main_faces.is_some() && e.is_main_cut)
            .map(|(i, _)| EdgeIndex::from(i))
            .collect()
    }

    /// How much the biggest island fills the cage, in its worst direction.
    pub fn largest_island_ratio(&self, cage: Vector2) -> f32 {
        self.islands
            .values()
            .map(|island| (island.bounding_box.x / cage.x).max(island.bounding_box.y / cage.y))
            .fold(0.0, f32::max)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
    pub fn options(&self) -> &UnfoldOptions {
        &self.options
    }
    /// The islands, biggest first.
    pub fn islands(&self) -> impl Iterator<Item = (IslandKey, &Island)> + '_ {
        self.island_order.iter().map(|&k| (k, &self.islands[k]))
    }
    pub fn num_islands(&self) -> usize {
        self.islands.len()
    }
    pub fn island_by_key(&self, key: IslandKey) -> Option<&Island> {
        self.islands.get(key)
    }
    pub fn island_by_face(&self, i_face: FaceIndex) -> IslandKey {
        self.uv_faces[usize::from(i_face)].island
    }
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
    pub fn edge_data(&self, i_edge: EdgeIndex) -> &EdgeData {
        &self.edges[usize::from(i_edge)]
    }
    pub fn uvedge(&self, i_loop: LoopIndex) -> &UVEdge {
        &self.uv_edges[usize::from(i_loop)]
    }
    pub fn uvface(&self, i_face: FaceIndex) -> &UVFace {
        &self.uv_faces[usize::from(i_face)]
    }
    pub fn uvvertex(&self, i_v: UVVertexIndex) -> &UVVertex {
        &self.uv_vertices[usize::from(i_v)]
    }

    /// The UVVertices of the island, each one once.
    pub fn island_vertices(&self, island: &Island) -> Vec<UVVertexIndex> {
        let mut vs: Vec<UVVertexIndex> = self.island_loops(island).map(|l| self.uvedge(l).va).collect();
        vs.sort();
        vs.dedup();
        vs
    }

    fn island_loops<'a>(&'a self, island: &'a Island) -> impl Iterator<Item = LoopIndex> + 'a {
        island.faces.iter().flat_map(|&f| self.model[f].loops())
    }
    fn co(&self, i_v: UVVertexIndex) -> Vector2 {
        self.uv_vertices[usize::from(i_v)].co
    }
    fn loop_island(&self, i_loop: LoopIndex) -> IslandKey {
        self.uv_faces[usize::from(self.model[i_loop].face())].island
    }
    fn loop_flipped(&self, i_loop: LoopIndex) -> bool {
        self.uv_faces[usize::from(self.model[i_loop].face())].flipped
    }
}

// If more than two faces share the edge, pick the pair with the most similar normals
fn choose_main_faces(model: &Model, i_edge: EdgeIndex) -> Option<[LoopIndex; 2]> {
    let loops = model[i_edge].loops();
    let main = match loops.len() {
        0 | 1 => return None,
        2 => [loops[0], loops[1]],
        _ => {
            let score = |a: LoopIndex, b: LoopIndex| {
                let na = model[model[a].face()].normal();
                let nb = model[model[b].face()].normal();
                na.dot(nb).abs()
            };
            let mut best = ([loops[0], loops[1]], f32::NEG_INFINITY);
            for (i, &a) in loops.iter().enumerate() {
                for &b in &loops[i + 1..] {
                    let s = score(a, b);
                    if s > best.1 {
                        best = ([a, b], s);
                    }
                }
            }
            best.0
        }
    };
    Some(orient_main_faces(model, i_edge, main))
}

// The first main face runs along the edge vector
fn orient_main_faces(model: &Model, i_edge: EdgeIndex, [a, b]: [LoopIndex; 2]) -> [LoopIndex; 2] {
    let (v0, _) = model[i_edge].vertices();
    if model[b].vertex() == v0 { [b, a] } else { [a, b] }
}

fn calculate_angle(model: &Model, i_edge: EdgeIndex, [la, lb]: [LoopIndex; 2]) -> f32 {
    let na = model[model[la].face()].normal();
    let nb = model[model[lb].face()].normal();
    if na.magnitude2() == 0.0 || nb.magnitude2() == 0.0 {
        // just a very sharp angle
        return -3.0;
    }
    let v = model.edge_vector(i_edge);
    let s = if v.magnitude2() > 0.0 {
        na.cross(nb).dot(v.normalize()).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let mut angle = s.asin();
    // inconsistent winding: the sign cannot be trusted
    if model[model[la].next()].vertex() != model[lb].vertex() || model[model[lb].next()].vertex() != model[la].vertex() {
        angle = angle.abs();
    }
    angle
}

fn edge_priority(angle: f32, length: f32, average_length: f32, weights: &PriorityWeights) -> f32 {
    let p = if angle > 0.0 {
        weights.convex * angle / PI
    } else {
        weights.concave * -angle / PI
    };
    p + length / average_length * weights.length
}

// Text that reads differently when rotated 180 degrees, such as "6" and "9"
pub(crate) fn is_upsidedown_wrong(name: &str) -> bool {
    const MISTAKABLE: &str = "69NZMWpbqd";
    const ROTATABLE: &str = "80oOxXIl";
    name.chars().all(|c| MISTAKABLE.contains(c) || ROTATABLE.contains(c))
        && name.chars().any(|c| MISTAKABLE.contains(c))
}
