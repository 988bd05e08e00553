//! Overlap detection between island boundaries.
//!
//! Segments are swept in lexicographic `(x, y)` order of their endpoints. The
//! optimistic sweep line keeps its segments sorted and checks only neighbors,
//! which is only sound when no two segments are collinear and overlapping;
//! when that is suspected it reports `Ambiguous` and the pairwise sweep line is
//! used instead.

use crate::util_3d::{Vector2, cross2, tup_cmp, tup_le, tup_lt};

use super::{LoopIndex, UVVertexIndex};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SweepResult {
    /// No two segments cross.
    Clear,
    /// At least two segments cross.
    Crossing,
    /// The optimistic sweep could not decide, try again with the pairwise one.
    Ambiguous,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Overlap {
    Crossing,
    Ambiguous,
}

/// A boundary edge as seen by the sweep line.
///
/// `phantom` segments come from the island being merged, already transformed
/// and with their welded vertices resolved.
#[derive(Debug, Clone)]
pub(super) struct Segment {
    pub va: Vector2,
    pub vb: Vector2,
    pub ia: UVVertexIndex,
    pub ib: UVVertexIndex,
    pub flipped: bool,
    pub phantom: bool,
    pub uvedge: LoopIndex,
}

impl Segment {
    pub fn is_upwards(&self) -> bool {
        tup_lt(self.va, self.vb) ^ self.flipped
    }
    pub fn min(&self) -> (Vector2, UVVertexIndex) {
        if tup_lt(self.va, self.vb) { (self.va, self.ia) } else { (self.vb, self.ib) }
    }
    pub fn max(&self) -> (Vector2, UVVertexIndex) {
        if tup_lt(self.va, self.vb) { (self.vb, self.ib) } else { (self.va, self.ia) }
    }
    fn bottom(&self) -> f32 {
        self.va.y.min(self.vb.y)
    }
    fn top(&self) -> f32 {
        self.va.y.max(self.vb.y)
    }
}

fn sorted(a: f32, b: f32) -> (f32, f32) {
    if b < a { (b, a) } else { (a, b) }
}

/// Whether segment `i` lies below segment `j` where both overlap in `x`.
///
/// With `correct_geometry` collinear overlapping segments are `Ambiguous`,
/// otherwise they are considered crossing if both faces look the same way.
pub(super) fn is_below(segs: &[Segment], i: usize, j: usize, correct_geometry: bool) -> Result<bool, Overlap> {
    if i == j {
        return Ok(false);
    }
    let (this, other) = (&segs[i], &segs[j]);
    if this.top() < other.bottom() {
        return Ok(true);
    }
    if other.top() < this.bottom() {
        return Ok(false);
    }
    let (this_min, _) = this.min();
    let (this_max, _) = this.max();
    let (other_min, _) = other.min();
    let (other_max, _) = other.max();
    if tup_le(this_max, other_min) {
        return Ok(true);
    }
    if tup_le(other_max, this_min) {
        return Ok(false);
    }

    let this_vector = this_max - this_min;
    let min_to_min = other_min - this_min;
    let (cross_b1, cross_b2) = sorted(cross2(this_vector, min_to_min), cross2(this_vector, other_max - this_min));
    if cross_b2 > 0.0 && (cross_b1 > 0.0 || (cross_b1 == 0.0 && !this.is_upwards())) {
        return Ok(true);
    }
    if cross_b1 < 0.0 && (cross_b2 < 0.0 || (cross_b2 == 0.0 && this.is_upwards())) {
        return Ok(false);
    }

    let other_vector = other_max - other_min;
    let (cross_a1, cross_a2) = sorted(cross2(other_vector, -min_to_min), cross2(other_vector, this_max - other_min));
    if cross_a2 > 0.0 && (cross_a1 > 0.0 || (cross_a1 == 0.0 && !other.is_upwards())) {
        return Ok(false);
    }
    if cross_a1 < 0.0 && (cross_a2 < 0.0 || (cross_a2 == 0.0 && other.is_upwards())) {
        return Ok(true);
    }

    if cross_a1 == 0.0 && cross_b1 == 0.0 && cross_a2 == 0.0 && cross_b2 == 0.0 {
        if correct_geometry {
            return Err(Overlap::Ambiguous);
        }
        if this.is_upwards() == other.is_upwards() {
            return Err(Overlap::Crossing);
        }
        return Ok(false);
    }
    if this_min == other_min || this_max == other_max {
        return Ok(cross_a2 > cross_b2);
    }
    Err(Overlap::Crossing)
}

pub(super) trait Sweepline {
    fn add(&mut self, segs: &[Segment], item: usize) -> Result<(), Overlap>;
    fn remove(&mut self, segs: &[Segment], item: usize) -> Result<(), Overlap>;
}

/// Keeps the active segments sorted bottom to top.
#[derive(Default)]
pub(super) struct QuickSweepline {
    children: Vec<usize>,
}

impl Sweepline for QuickSweepline {
    fn add(&mut self, segs: &[Segment], item: usize) -> Result<(), Overlap> {
        let (mut low, mut high) = (0, self.children.len());
        while low < high {
            let mid = (low + high) / 2;
            if is_below(segs, self.children[mid], item, true)? {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        self.children.insert(low, item);
        Ok(())
    }
    fn remove(&mut self, segs: &[Segment], item: usize) -> Result<(), Overlap> {
        let Some(index) = self.children.iter().position(|&c| c == item) else {
            return Ok(());
        };
        self.children.remove(index);
        // the two segments that become neighbors must still be in order
        if index > 0 && index < self.children.len() && is_below(segs, self.children[index], self.children[index - 1], true)? {
            return Err(Overlap::Ambiguous);
        }
        Ok(())
    }
}

/// Compares every new segment with all the active ones.
#[derive(Default)]
pub(super) struct BruteSweepline {
    children: Vec<usize>,
}

impl Sweepline for BruteSweepline {
    fn add(&mut self, segs: &[Segment], item: usize) -> Result<(), Overlap> {
        let (_, item_min) = segs[item].min();
        let (_, item_max) = segs[item].max();
        for &child in &self.children {
            let (_, child_min) = segs[child].min();
            let (_, child_max) = segs[child].max();
            if child_min != item_min && child_max != item_max {
                is_below(segs, item, child, false)?;
            }
        }
        self.children.push(item);
        Ok(())
    }
    fn remove(&mut self, _segs: &[Segment], item: usize) -> Result<(), Overlap> {
        self.children.retain(|&c| c != item);
        Ok(())
    }
}

pub(super) fn sweep(mut sweepline: impl Sweepline, segs: &[Segment]) -> SweepResult {
    match sweep_events(&mut sweepline, segs) {
        Ok(()) => SweepResult::Clear,
        Err(Overlap::Crossing) => SweepResult::Crossing,
        Err(Overlap::Ambiguous) => SweepResult::Ambiguous,
    }
}

fn sweep_events(sweepline: &mut impl Sweepline, segs: &[Segment]) -> Result<(), Overlap> {
    // Both lists are popped from the back, so they are sorted backwards
    let mut events_add: Vec<usize> = (0..segs.len()).collect();
    events_add.sort_by(|&a, &b| tup_cmp(segs[b].min().0, segs[a].min().0));
    let mut events_remove = events_add.clone();
    events_remove.sort_by(|&a, &b| tup_cmp(segs[b].max().0, segs[a].max().0));

    while let Some(remove) = events_remove.pop() {
        while let Some(&add) = events_add.last() {
            if !tup_le(segs[add].min().0, segs[remove].max().0) {
                break;
            }
            events_add.pop();
            sweepline.add(segs, add)?;
        }
        sweepline.remove(segs, remove)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: usize, a: (f32, f32), b: (f32, f32)) -> Segment {
        Segment {
            va: Vector2::new(a.0, a.1),
            vb: Vector2::new(b.0, b.1),
            ia: UVVertexIndex::from(2 * id),
            ib: UVVertexIndex::from(2 * id + 1),
            flipped: false,
            phantom: false,
            uvedge: LoopIndex::from(id),
        }
    }

    // Closed counter-clockwise polygon with shared vertex ids
    fn polygon(points: &[(f32, f32)], first_id: usize) -> Vec<Segment> {
        let n = points.len();
        (0..n)
            .map(|i| {
                let (a, b) = (points[i], points[(i + 1) % n]);
                Segment {
                    va: Vector2::new(a.0, a.1),
                    vb: Vector2::new(b.0, b.1),
                    ia: UVVertexIndex::from(first_id + i),
                    ib: UVVertexIndex::from(first_id + (i + 1) % n),
                    flipped: false,
                    phantom: false,
                    uvedge: LoopIndex::from(first_id + i),
                }
            })
            .collect()
    }

    #[test]
    fn crossing_segments_are_found() {
        let segs = vec![seg(0, (0.0, 0.0), (2.0, 2.0)), seg(1, (0.0, 2.0), (2.0, 0.0))];
        assert_eq!(sweep(QuickSweepline::default(), &segs), SweepResult::Crossing);
        assert_eq!(sweep(BruteSweepline::default(), &segs), SweepResult::Crossing);
    }

    #[test]
    fn disjoint_squares_are_clear() {
        let mut segs = polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], 0);
        segs.extend(polygon(&[(2.0, 0.0), (3.0, 0.0), (3.0, 1.0), (2.0, 1.0)], 10));
        assert_eq!(sweep(QuickSweepline::default(), &segs), SweepResult::Clear);
        assert_eq!(sweep(BruteSweepline::default(), &segs), SweepResult::Clear);
    }

    #[test]
    fn overlapping_squares_cross() {
        let mut segs = polygon(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)], 0);
        segs.extend(polygon(&[(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)], 10));
        assert_eq!(sweep(BruteSweepline::default(), &segs), SweepResult::Crossing);
    }

    #[test]
    fn collinear_overlap_is_ambiguous_for_the_quick_sweep() {
        let segs = vec![seg(0, (0.0, 0.0), (2.0, 0.0)), seg(1, (1.0, 0.0), (3.0, 0.0))];
        assert_eq!(sweep(QuickSweepline::default(), &segs), SweepResult::Ambiguous);
        // same direction, same side: the faces overlap
        assert_eq!(sweep(BruteSweepline::default(), &segs), SweepResult::Crossing);
    }

    #[test]
    fn segments_touching_at_an_endpoint_are_ordered() {
        let segs = vec![seg(0, (0.0, 0.0), (1.0, 0.0)), seg(1, (1.0, 0.0), (2.0, 1.0))];
        assert_eq!(is_below(&segs, 0, 1, true), Ok(true));
        assert_eq!(is_below(&segs, 1, 0, true), Ok(false));
        assert_eq!(is_below(&segs, 0, 0, true), Ok(false));
    }
}
