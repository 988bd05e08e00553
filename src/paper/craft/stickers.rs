use cgmath::InnerSpace;

use crate::util_3d::{Vector2, Vector3, matrix2_rows, rotation2};

use super::*;

// Cosine of the interior angle of a face at one of its vertices
fn corner_cos(model: &Model, i_face: FaceIndex, i_vertex: VertexIndex) -> Option<f32> {
    let loops: Vec<LoopIndex> = model[i_face].loops().collect();
    let pos = loops.iter().position(|&l| model[l].vertex() == i_vertex)?;
    let here = model[i_vertex].pos();
    let next = model[model[loops[(pos + 1) % loops.len()]].vertex()].pos() - here;
    let prev = model[model[loops[(pos + loops.len() - 1) % loops.len()]].vertex()].pos() - here;
    let div = next.magnitude() * prev.magnitude();
    (div > 0.0).then(|| next.dot(prev) / div)
}

fn numbered(n: u32) -> String {
    let mut text = n.to_string();
    if is_upsidedown_wrong(&text) {
        text.push('.');
    }
    text
}

impl Papercraft {
    fn boundary_points(&self, i_loop: LoopIndex) -> (Vector2, Vector2) {
        (self.co(self.boundary_start(i_loop)), self.co(self.boundary_end(i_loop)))
    }

    // The mesh vertices at the start and the end of the UVEdge, as drawn in its island
    fn boundary_mesh_vertices(&self, i_loop: LoopIndex) -> (VertexIndex, VertexIndex) {
        let here = self.model[i_loop].vertex();
        let next = self.model[self.model[i_loop].next()].vertex();
        if self.loop_flipped(i_loop) { (next, here) } else { (here, next) }
    }

    // Faces with a better area/perimeter ratio are better to hold a sticker
    fn uvedge_priority(&self, i_loop: LoopIndex) -> f32 {
        let i_face = self.model[i_loop].face();
        self.model.face_area(i_face) / self.model.face_perimeter(i_face)
    }

    fn add_marker(&mut self, i_loop: LoopIndex, marker: Marker) -> usize {
        let key = self.loop_island(i_loop);
        let island = &mut self.islands[key];
        island.markers.push(marker);
        island.markers.len() - 1
    }

    // Whether the partner of a sticker can be found without looking at the numbers
    fn is_index_obvious(&self, uvedge: LoopIndex, target: LoopIndex) -> bool {
        let (e, t) = (self.uvedge(uvedge), self.uvedge(target));
        if t.neighbor_left == Some(uvedge) || t.neighbor_right == Some(uvedge) {
            return true;
        }
        let mesh_edge = |l: Option<LoopIndex>| l.map(|l| self.model[l].edge());
        mesh_edge(e.neighbor_left) == mesh_edge(t.neighbor_right) && mesh_edge(e.neighbor_right) == mesh_edge(t.neighbor_left)
    }

    /// Adds the glue tabs, pins and teeth to the cut edges with the built-in shapes.
    pub fn generate_stickers(&mut self, width: f32, create_numbers: bool) {
        self.generate_stickers_with(&DefaultStickers, width, create_numbers);
    }

    /// Adds the stickers to every cut edge.
    ///
    /// For every edge the face with the best area/perimeter ratio is the target,
    /// and the other one gets the sticker. `Pin` and `Tooth` edges get a sticker
    /// on both sides, the target one reversed.
    pub fn generate_stickers_with(&mut self, geometry: &dyn StickerGeometry, width: f32, create_numbers: bool) {
        for i in 0..self.edges.len() {
            let i_edge = EdgeIndex::from(i);
            let edge = &self.edges[i];
            if !edge.is_main_cut || edge.uvedges.len() < 2 || self.model.edge_length(i_edge) == 0.0 {
                continue;
            }
            let (mut target, mut source) = (edge.uvedges[0], edge.uvedges[1]);
            if self.uvedge_priority(target) < self.uvedge_priority(source) {
                std::mem::swap(&mut target, &mut source);
            }
            let extra: Vec<LoopIndex> = edge.uvedges[2..].to_vec();
            let edge_type = edge.edge_type;

            match edge_type {
                EdgeType::Pin | EdgeType::Tooth => {
                    for (uvedge, other, reversed) in [(target, source, true), (source, target, false)] {
                        let pattern = geometry.pattern(edge_type, reversed);
                        let sticker = self.pattern_sticker(uvedge, other, &pattern, edge_type, reversed);
                        let idx = self.add_marker(uvedge, Marker::Sticker(sticker));
                        self.uv_edges[usize::from(uvedge)].sticker = Some(idx);
                    }
                }
                EdgeType::Auto | EdgeType::Glue => {
                    let index = create_numbers.then(|| {
                        let key = self.loop_island(target);
                        let island = &mut self.islands[key];
                        island.sticker_numbering += 1;
                        numbered(island.sticker_numbering)
                    });
                    for uvedge in std::iter::once(source).chain(extra) {
                        let sticker = self.glue_tab(uvedge, target, width, edge_type, index.as_deref());
                        let idx = self.add_marker(uvedge, Marker::Sticker(sticker));
                        self.uv_edges[usize::from(uvedge)].sticker = Some(idx);
                    }
                    if let Some(text) = index {
                        if !self.is_index_obvious(source, target) {
                            let arrow = self.arrow(target, width, text);
                            self.add_marker(target, Marker::Arrow(arrow));
                        }
                    }
                }
            }
        }
    }

    // A trapezoid, with the sides at 60 degrees or less if the target face is sharper
    fn glue_tab(&self, uvedge: LoopIndex, target: LoopIndex, width: f32, edge_type: EdgeType, index: Option<&str>) -> Sticker {
        let (first, second) = self.boundary_points(uvedge);
        let edge = first - second;
        let len = edge.magnitude();
        let sticker_width = width.min(len / 2.0);

        let (mut cos_a, mut cos_b) = (0.5f32, 0.5f32);
        let (mut sin_a, mut sin_b) = (0.75f32.sqrt(), 0.75f32.sqrt());
        let (v_first, v_second) = self.boundary_mesh_vertices(uvedge);
        let target_face = self.model[target].face();
        if let Some(c) = corner_cos(&self.model, target_face, v_first) {
            cos_a = cos_a.max(c);
        }
        if let Some(c) = corner_cos(&self.model, target_face, v_second) {
            cos_b = cos_b.max(c);
        }

        let mut len_a = sticker_width / sin_a;
        let mut len_b = len_a;
        sin_a = (1.0 - cos_a * cos_a).abs().sqrt();
        let sin_sum = |sin_a: f32, sin_b: f32| sin_a * cos_b + sin_b * cos_a;
        len_b = len_b.min(len * sin_a / sin_sum(sin_a, sin_b));
        len_a = if sin_a == 0.0 { 0.0 } else { (sticker_width / sin_a).min((len - len_b * cos_b) / cos_a) };
        sin_b = (1.0 - cos_b * cos_b).abs().sqrt();
        len_a = len_a.min(len * sin_b / sin_sum(sin_a, sin_b));
        len_b = if sin_b == 0.0 { 0.0 } else { (sticker_width / sin_b).min((len - len_a * cos_a) / cos_b) };

        let v3 = second + rotation2(cos_b, sin_b) * edge * (len_b / len);
        let v4 = first + matrix2_rows(-cos_a, -sin_a, sin_a, -cos_a) * edge * (len_a / len);
        let outline = if v3 != v4 { vec![second, v3, v4, first] } else { vec![second, v3, first] };

        let text_dir = edge / len;
        let text_size = sticker_width * 0.9;
        let text = index.map(|index| {
            if self.loop_island(uvedge) != self.loop_island(target) {
                let other = &self.islands[self.loop_island(target)];
                format!("{}:{}", other.abbreviation, index)
            } else {
                index.to_owned()
            }
        });
        let up = Vector2::new(-text_dir.y, text_dir.x);
        Sticker {
            uvedge,
            target,
            outline,
            edge_type,
            reversed: false,
            text,
            center: (first + second) / 2.0 + up * (text_size * 0.2),
            text_dir,
            text_size,
        }
    }

    fn pattern_sticker(&self, uvedge: LoopIndex, target: LoopIndex, pattern: &TilePattern, edge_type: EdgeType, reversed: bool) -> Sticker {
        let (first, second) = self.boundary_points(uvedge);
        let along = second - first;
        let len = along.magnitude();
        let dir = along / len;
        let outward = Vector2::new(dir.y, -dir.x);
        // the outline goes backwards, like the glue tabs
        let mut outline = pattern.stamp(first, dir, outward, len);
        outline.reverse();
        Sticker {
            uvedge,
            target,
            outline,
            edge_type,
            reversed,
            text: None,
            center: (first + second) / 2.0,
            text_dir: -dir,
            text_size: 0.0,
        }
    }

    fn arrow(&self, target: LoopIndex, size: f32, text: String) -> Arrow {
        let (first, second) = self.boundary_points(target);
        Arrow {
            uvedge: target,
            text,
            center: (first + second) / 2.0,
            tangent: (second - first).normalize(),
            size,
        }
    }

    /// Numbers every cut edge inside its faces, for models built without stickers.
    pub fn generate_numbers_alone(&mut self, size: f32) {
        let mut numbering = 0;
        for i in 0..self.edges.len() {
            let edge = &self.edges[i];
            if !edge.is_main_cut || edge.uvedges.len() < 2 {
                continue;
            }
            numbering += 1;
            let text = numbered(numbering);
            for uvedge in edge.uvedges.clone() {
                let (first, second) = self.boundary_points(uvedge);
                let back = first - second;
                if back.magnitude2() == 0.0 {
                    continue;
                }
                let text_dir = back.normalize();
                let up = Vector2::new(-text_dir.y, text_dir.x);
                let marker = NumberAlone {
                    uvedge,
                    text: text.clone(),
                    center: (first + second) / 2.0 - up * (size * 1.2),
                    text_dir,
                    size,
                };
                self.add_marker(uvedge, Marker::NumberAlone(marker));
            }
        }
    }

    /// Adds the pour hole to the face that looks up the most.
    pub fn add_pour_hole(&mut self) {
        self.add_pour_hole_with(&DefaultStickers);
    }

    pub fn add_pour_hole_with(&mut self, geometry: &dyn StickerGeometry) {
        let up = Vector3::new(0.0, 0.0, 1.0);
        let mut best: Option<(FaceIndex, f32)> = None;
        for (i_face, face) in self.model.faces() {
            let n = face.normal();
            if n.magnitude2() == 0.0 {
                continue;
            }
            let d = (n.normalize() - up).magnitude();
            if best.is_none_or(|(_, b)| d < b) {
                best = Some((i_face, d));
            }
        }
        let Some((i_face, _)) = best else { return };
        let Some(uvedge) = self.model[i_face].loops().nth(1) else { return };

        let (first, second) = self.boundary_points(uvedge);
        let along = second - first;
        let len = along.magnitude();
        if len == 0.0 {
            return;
        }
        let dir = along / len;
        // inside the face
        let inward = Vector2::new(-dir.y, dir.x);
        let pattern = geometry.pour_hole();
        let mut outline = pattern.stamp(first, dir, inward, len);
        // only the hole itself, not the edge
        outline.pop();
        outline.remove(0);
        log::debug!("pour hole on face {}", usize::from(i_face));
        let idx = self.add_marker(uvedge, Marker::PourHole(PourHole { uvedge, outline }));
        self.uv_edges[usize::from(uvedge)].pour_hole = Some(idx);
    }
}
