use cgmath::InnerSpace;
use fxhash::FxHashMap;

use crate::util_3d::Vector2;

use super::*;

// Monotonic with the angle of the vector, from -2 to 2
fn direction_to_float(v: Vector2) -> f32 {
    let len = v.magnitude();
    if v.y > 0.0 { 1.0 - v.x / len } else { v.x / len - 1.0 }
}

impl Papercraft {
    // The boundary of an island runs counter-clockwise: forward is `vb`, or `va` for flipped faces
    pub(super) fn boundary_start(&self, i_loop: LoopIndex) -> UVVertexIndex {
        let e = self.uvedge(i_loop);
        if self.loop_flipped(i_loop) { e.vb } else { e.va }
    }
    pub(super) fn boundary_end(&self, i_loop: LoopIndex) -> UVVertexIndex {
        let e = self.uvedge(i_loop);
        if self.loop_flipped(i_loop) { e.va } else { e.vb }
    }

    /// Links every boundary UVEdge with its neighbors, forming a ring per island.
    ///
    /// `neighbor_right` is the boundary edge that ends where this one starts.
    pub(super) fn link_boundaries(&mut self) {
        for key in self.island_order.clone() {
            let boundary = self.islands[key].boundary.clone();
            let mut links: Vec<(LoopIndex, LoopIndex)> = Vec::new();

            // More than one edge ending at the same vertex is a pinch between two parts of the island
            let mut ending_at: FxHashMap<UVVertexIndex, LoopIndex> = FxHashMap::default();
            let mut conflicts: FxHashMap<UVVertexIndex, Vec<LoopIndex>> = FxHashMap::default();
            for &l in &boundary {
                let end = self.boundary_end(l);
                match ending_at.get(&end) {
                    None => {
                        ending_at.insert(end, l);
                    }
                    Some(&first) => conflicts.entry(end).or_insert_with(|| vec![first]).push(l),
                }
            }
            for &l in &boundary {
                let start = self.boundary_start(l);
                match conflicts.get_mut(&start) {
                    Some(site) => site.push(l),
                    None => links.push((l, ending_at.get(&start).copied().unwrap_or(l))),
                }
            }

            // Iterate the pinches in a stable order
            let mut conflicts: Vec<(UVVertexIndex, Vec<LoopIndex>)> = conflicts.into_iter().collect();
            conflicts.sort_by_key(|(v, _)| *v);
            for (v, mut site) in conflicts {
                let is_inwards = |l: LoopIndex| self.boundary_end(l) == v;
                let angle_of = |l: LoopIndex| {
                    let e = self.uvedge(l);
                    let other = if e.va == v { e.vb } else { e.va };
                    direction_to_float(self.co(other) - self.co(v))
                };
                site.sort_by(|&a, &b| angle_of(a).total_cmp(&angle_of(b)).then(a.cmp(&b)));
                if site.len() < 2 {
                    continue;
                }
                if is_inwards(site[0]) {
                    for pair in site.chunks_exact(2) {
                        links.push((pair[1], pair[0]));
                    }
                } else {
                    let last = site[site.len() - 1];
                    let rights = std::iter::once(last).chain(site.iter().skip(1).step_by(2).copied());
                    let lefts = site[..site.len() - 1].iter().step_by(2).copied();
                    for (right, left) in rights.zip(lefts) {
                        links.push((left, right));
                    }
                }
            }

            for (edge, right) in links {
                self.uv_edges[usize::from(edge)].neighbor_right = Some(right);
                self.uv_edges[usize::from(right)].neighbor_left = Some(edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_sort_by_angle() {
        let dirs = [
            Vector2::new(1.0, -0.1),
            Vector2::new(1.0, 0.1),
            Vector2::new(0.0, 1.0),
            Vector2::new(-1.0, 0.1),
        ];
        let ks: Vec<f32> = dirs.iter().map(|&d| direction_to_float(d)).collect();
        // counter-clockwise from +x the keys grow, except when crossing the negative x axis
        assert!(ks[1] < ks[2] && ks[2] < ks[3]);
        assert!(ks[0] < 0.0 && ks[1] > 0.0);
        assert_eq!(direction_to_float(Vector2::new(-1.0, 0.0)), -2.0);
    }
}
