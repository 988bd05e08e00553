use cgmath::InnerSpace;
use fxhash::{FxHashMap, FxHashSet};

use crate::util_3d::{MIRROR_X, Vector2, bounding_box_2d, exact_key, fitting_matrix, pairs};

use super::layout::cage_fit;
use super::sweep::{BruteSweepline, QuickSweepline, Segment, SweepResult, sweep};
use super::*;

// Relative to the edge length, squared distance below which two UVVertices are welded
const EPSILON: f32 = 1.0e-6;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinRejection {
    /// Both edges already belong to the same island.
    SameIsland,
    /// The merged island would not fit in the size limit.
    TooBig,
    /// The islands would touch at a vertex in an invalid way.
    FanOut,
    /// The islands would overlap.
    Overlap,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinResult {
    /// The islands were merged, the returned one is now empty and must be dropped.
    Joined(IslandKey),
    Rejected(JoinRejection),
}

/// Union-find over UVVertices, only the ones that get merged are in the table.
#[derive(Default)]
struct UnionFind {
    parent: FxHashMap<UVVertexIndex, UVVertexIndex>,
}

impl UnionFind {
    fn find(&mut self, v: UVVertexIndex) -> UVVertexIndex {
        let mut root = v;
        while let Some(&p) = self.parent.get(&root) {
            root = p;
        }
        // path compression
        let mut v = v;
        while let Some(&p) = self.parent.get(&v) {
            if p == root {
                break;
            }
            self.parent.insert(v, root);
            v = p;
        }
        root
    }
    fn link(&mut self, child: UVVertexIndex, root: UVVertexIndex) {
        if child != root {
            self.parent.insert(child, root);
        }
    }
    fn is_merged(&self, v: UVVertexIndex) -> bool {
        self.parent.contains_key(&v)
    }
    // After this every vertex points directly to its root
    fn flatten(&mut self) {
        let keys: Vec<UVVertexIndex> = self.parent.keys().copied().collect();
        for k in keys {
            self.find(k);
        }
    }
    fn root(&self, v: UVVertexIndex) -> UVVertexIndex {
        self.parent.get(&v).copied().unwrap_or(v)
    }
}

// The box of the points cannot fit into `limit`, not even rotated
fn is_too_big(points: &[Vector2], limit: Vector2) -> bool {
    let (lo, hi) = bounding_box_2d(points.iter().copied());
    let size = hi - lo;
    if size.x.min(size.y).powi(2) > limit.magnitude2() {
        return true;
    }
    if (size.x > limit.x || size.y > limit.y) && (size.y > limit.x || size.x > limit.y) {
        let (_, height) = cage_fit(points, limit.y / limit.x);
        return height > limit.y;
    }
    false
}

// Sorting key of a segment by its direction when leaving `pos`
fn slope_from(seg: &Segment, pos: (u32, u32)) -> f32 {
    let vec = if exact_key(seg.va) == pos { seg.vb - seg.va } else { seg.va - seg.vb };
    let len = vec.magnitude();
    if vec.x > 0.0 || (vec.x == 0.0 && vec.y > 0.0) {
        vec.y / len + 1.0
    } else {
        -1.0 - vec.y / len
    }
}

impl Papercraft {
    /// Tries to join the islands of two UVEdges of the same mesh edge.
    ///
    /// The smaller island is moved so that both edges coincide. If the result
    /// is valid it is merged into the bigger one, otherwise nothing changes.
    pub(super) fn join(&mut self, uvedge_a: LoopIndex, uvedge_b: LoopIndex, size_limit: Option<Vector2>) -> Result<JoinResult> {
        let (mut uvedge_a, mut uvedge_b) = (uvedge_a, uvedge_b);
        let mut island_a = self.loop_island(uvedge_a);
        let mut island_b = self.loop_island(uvedge_b);
        if island_a == island_b {
            return Ok(JoinResult::Rejected(JoinRejection::SameIsland));
        }
        // A is the bigger one, B is merged into it
        if self.islands[island_b].faces.len() > self.islands[island_a].faces.len() {
            std::mem::swap(&mut uvedge_a, &mut uvedge_b);
            std::mem::swap(&mut island_a, &mut island_b);
        }

        let verts_flipped = self.model[uvedge_a].vertex() == self.model[uvedge_b].vertex();
        let flipped = verts_flipped ^ self.loop_flipped(uvedge_a) ^ self.loop_flipped(uvedge_b);

        let ea = self.uvedge(uvedge_a).clone();
        let eb = self.uvedge(uvedge_b).clone();
        let (first_b, second_b) = if verts_flipped { (eb.vb, eb.va) } else { (eb.va, eb.vb) };
        let source = self.co(first_b) - self.co(second_b);
        let target = self.co(ea.vb) - self.co(ea.va);
        let rot = if flipped {
            fitting_matrix(MIRROR_X * source, target) * MIRROR_X
        } else {
            fitting_matrix(source, target)
        };
        let trans = self.co(ea.vb) - rot * self.co(first_b);

        let loops_a: Vec<LoopIndex> = self.island_loops(&self.islands[island_a]).collect();
        let loops_b: Vec<LoopIndex> = self.island_loops(&self.islands[island_b]).collect();
        let vertices_a = self.island_vertices(&self.islands[island_a]);
        let vertices_b = self.island_vertices(&self.islands[island_b]);

        // Where the vertices of B would be if the join succeeds
        let phantoms: FxHashMap<UVVertexIndex, Vector2> = vertices_b
            .iter()
            .map(|&v| (v, rot * self.co(v) + trans))
            .collect();

        if let Some(limit) = size_limit {
            let points: Vec<Vector2> = vertices_a
                .iter()
                .map(|&v| self.co(v))
                .chain(vertices_b.iter().map(|v| phantoms[v]))
                .collect();
            if is_too_big(&points, limit) {
                return Ok(JoinResult::Rejected(JoinRejection::TooBig));
            }
        }

        // Weld the vertices of B to the close enough vertices of A, and the vertices of A between them
        let distance_limit = self.model.edge_length(self.model[uvedge_a].edge()) * EPSILON;
        let mut uf = UnionFind::default();
        let mut is_merged_mine = false;
        let mut shared_vertices: Vec<VertexIndex> = loops_a
            .iter()
            .chain(&loops_b)
            .map(|&l| self.model[l].vertex())
            .collect();
        shared_vertices.sort();
        shared_vertices.dedup();
        for i_vertex in shared_vertices {
            let mut uvs_a: Vec<UVVertexIndex> = Vec::new();
            let mut uvs_b: Vec<UVVertexIndex> = Vec::new();
            for &l in self.model[i_vertex].loops() {
                let island = self.loop_island(l);
                let uvs = if island == island_a {
                    &mut uvs_a
                } else if island == island_b {
                    &mut uvs_b
                } else {
                    continue;
                };
                let v = self.uvedge(l).va;
                if !uvs.contains(&v) {
                    uvs.push(v);
                }
            }
            for &a in &uvs_a {
                for &b in &uvs_b {
                    if (self.co(a) - phantoms[&b]).magnitude2() < distance_limit {
                        let root = uf.find(a);
                        uf.link(b, root);
                    }
                }
            }
            for (i, &a1) in uvs_a.iter().enumerate() {
                for &a2 in &uvs_a[i + 1..] {
                    if (self.co(a1) - self.co(a2)).magnitude2() < distance_limit {
                        let (r1, r2) = (uf.find(a1), uf.find(a2));
                        if r1 != r2 {
                            uf.link(r2, r1);
                            is_merged_mine = true;
                        }
                    }
                }
            }
        }
        uf.flatten();

        // Position of a vertex after the join, it must be a root
        let resolved_co = |v: UVVertexIndex| phantoms.get(&v).copied().unwrap_or_else(|| self.co(v));
        // The face winding as seen in the joined island
        let effective_flip = |l: LoopIndex| self.loop_flipped(l) ^ (flipped && self.loop_island(l) == island_b);

        // Find the pairs of UVEdges that become a single interior edge
        let mut merged: FxHashSet<LoopIndex> = FxHashSet::default();
        let mut merged_pairs: Vec<(LoopIndex, LoopIndex)> = Vec::new();
        let candidates: Vec<LoopIndex> = if is_merged_mine {
            self.islands[island_a].boundary.iter().chain(&self.islands[island_b].boundary).copied().collect()
        } else {
            self.islands[island_b].boundary.clone()
        };
        for uvedge in candidates {
            let i_edge = self.model[uvedge].edge();
            // seams are never welded
            if self.edges[usize::from(i_edge)].force_cut {
                continue;
            }
            for &partner in self.model[i_edge].loops() {
                if partner == uvedge {
                    continue;
                }
                let island = self.loop_island(partner);
                if island != island_a && island != island_b {
                    continue;
                }
                let ep = self.uvedge(partner);
                let (mut paired_a, mut paired_b) = (uf.root(ep.vb), uf.root(ep.va));
                if effective_flip(partner) != effective_flip(uvedge) {
                    std::mem::swap(&mut paired_a, &mut paired_b);
                }
                let eu = self.uvedge(uvedge);
                if uf.root(eu.va) == paired_a && uf.root(eu.vb) == paired_b {
                    merged.insert(uvedge);
                    merged.insert(partner);
                    merged_pairs.push((uvedge, partner));
                    break;
                }
            }
        }
        if !merged.contains(&uvedge_b) {
            let edge = self.model[uvedge_b].edge();
            log::error!("edge {} was not welded to its own partner", usize::from(edge));
            return Err(UnfoldError::Internal { edge });
        }

        // The segments of both boundaries, B first
        let mut segments: Vec<Segment> = self.islands[island_b]
            .boundary
            .iter()
            .filter(|l| !merged.contains(l))
            .map(|&l| {
                let e = self.uvedge(l);
                let (ia, ib) = (uf.root(e.va), uf.root(e.vb));
                Segment {
                    va: resolved_co(ia),
                    vb: resolved_co(ib),
                    ia,
                    ib,
                    flipped: flipped ^ self.loop_flipped(l),
                    phantom: true,
                    uvedge: l,
                }
            })
            .collect();
        segments.extend(self.islands[island_a].boundary.iter().map(|&l| {
            let e = self.uvedge(l);
            // vertices of A only move to another vertex of A, when welded to themselves
            let (ia, ib) = (uf.root(e.va), uf.root(e.vb));
            Segment {
                va: self.co(ia),
                vb: self.co(ib),
                ia,
                ib,
                flipped: self.loop_flipped(l),
                phantom: false,
                uvedge: l,
            }
        }));

        if !self.check_fan_out(&segments, &vertices_a, &vertices_b, &uf, &merged, resolved_co) {
            return Ok(JoinResult::Rejected(JoinRejection::FanOut));
        }

        let mut safe_geometry = self.islands[island_a].has_safe_geometry && self.islands[island_b].has_safe_geometry;
        let mut result = if safe_geometry {
            sweep(QuickSweepline::default(), &segments)
        } else {
            sweep(BruteSweepline::default(), &segments)
        };
        if result == SweepResult::Ambiguous {
            safe_geometry = false;
            result = sweep(BruteSweepline::default(), &segments);
        }
        if result != SweepResult::Clear {
            return Ok(JoinResult::Rejected(JoinRejection::Overlap));
        }

        // Everything is fine, commit the changes
        for (&v, &co) in &phantoms {
            self.uv_vertices[usize::from(v)].co = co;
        }
        let mut rewrite = loops_b;
        if is_merged_mine {
            rewrite.extend(loops_a);
        }
        for l in rewrite {
            let e = &mut self.uv_edges[usize::from(l)];
            e.va = uf.root(e.va);
            e.vb = uf.root(e.vb);
        }
        for &l in &merged {
            self.edges[usize::from(self.model[l].edge())].is_main_cut = false;
        }
        for &(uvedge, partner) in &merged_pairs {
            let i_edge = self.model[uvedge].edge();
            let main = super::orient_main_faces(&self.model, i_edge, [uvedge, partner]);
            self.edges[usize::from(i_edge)].main_faces = Some(main);
        }

        let faces_b = std::mem::take(&mut self.islands[island_b].faces);
        let boundary_b = std::mem::take(&mut self.islands[island_b].boundary);
        for &f in &faces_b {
            let uvface = &mut self.uv_faces[usize::from(f)];
            uvface.island = island_a;
            uvface.flipped ^= flipped;
        }
        let island = &mut self.islands[island_a];
        island.faces.extend(faces_b);
        let boundary_a = std::mem::take(&mut island.boundary);
        island.boundary = boundary_a
            .into_iter()
            .chain(boundary_b)
            .filter(|l| !merged.contains(l))
            .collect();
        island.has_safe_geometry = safe_geometry;
        Ok(JoinResult::Joined(island_b))
    }

    // At every position shared by both islands, the boundary segments must alternate
    // between going in and going out of the island
    fn check_fan_out(
        &self,
        segments: &[Segment],
        vertices_a: &[UVVertexIndex],
        vertices_b: &[UVVertexIndex],
        uf: &UnionFind,
        merged: &FxHashSet<LoopIndex>,
        resolved_co: impl Fn(UVVertexIndex) -> Vector2,
    ) -> bool {
        let keys_a: FxHashSet<(u32, u32)> = vertices_a.iter().map(|&v| exact_key(self.co(v))).collect();
        let mut sites: FxHashMap<(u32, u32), Vec<usize>> = FxHashMap::default();
        let merged_a = vertices_a.iter().filter(|&&v| uf.is_merged(v));
        for &v in vertices_b.iter().chain(merged_a) {
            let key = exact_key(resolved_co(uf.root(v)));
            if keys_a.contains(&key) {
                sites.entry(key).or_default();
            }
        }
        for (i, seg) in segments.iter().enumerate() {
            if seg.va == seg.vb {
                continue;
            }
            for p in [seg.va, seg.vb] {
                if let Some(site) = sites.get_mut(&exact_key(p)) {
                    site.push(i);
                }
            }
        }

        for (&pos, site) in &mut sites {
            if site.len() <= 2 {
                continue;
            }
            site.sort_by(|&a, &b| slope_from(&segments[a], pos).total_cmp(&slope_from(&segments[b], pos)));
            let is_ccw = |s: &Segment| s.is_upwards() ^ (exact_key(s.max().0) == pos);
            for (right, left) in pairs(site) {
                let (right, left) = (&segments[right], &segments[left]);
                let right_merged = merged.contains(&right.uvedge);
                let left_merged = merged.contains(&left.uvedge);
                let (right_ccw, left_ccw) = (is_ccw(right), is_ccw(left));
                if right_ccw && !left_ccw && right.phantom != left.phantom && !right_merged && !left_merged {
                    return false;
                }
                if (!right_ccw && !right_merged) ^ (left_ccw && !left_merged) {
                    return false;
                }
            }
        }
        true
    }
}
