use cgmath::InnerSpace;

use crate::util_3d::{Matrix2, Vector2};

use super::{EdgeType, LoopIndex};

/// A polyline drawn along an edge, repeated as many times as it fits.
///
/// The `x` coordinate of the points runs along the edge from `0` to `width`,
/// the `y` coordinate away from the face.
#[derive(Debug, Clone, PartialEq)]
pub struct TilePattern {
    pub width: f32,
    pub points: Vec<Vector2>,
}

impl TilePattern {
    fn tile(width: f32, points: &[(f32, f32)]) -> TilePattern {
        TilePattern {
            width,
            points: points.iter().map(|&(x, y)| Vector2::new(x, y)).collect(),
        }
    }

    /// Joins several tiles side by side into a single one.
    pub fn concat(tiles: &[TilePattern]) -> TilePattern {
        let mut width = 0.0;
        let mut points: Vec<Vector2> = Vec::new();
        for tile in tiles {
            for p in &tile.points {
                let p = Vector2::new(p.x + width, p.y);
                if points.last() != Some(&p) {
                    points.push(p);
                }
            }
            width += tile.width;
        }
        TilePattern { width, points }
    }

    /// Repeats the pattern along the segment from `origin` with length `len`.
    ///
    /// The tiles are centered, and shrunk if not even one fits. The returned
    /// polyline starts at `origin` and ends at the other end of the segment.
    pub fn stamp(&self, origin: Vector2, dir: Vector2, normal: Vector2, len: f32) -> Vec<Vector2> {
        let end = origin + dir * len;
        if self.width <= 0.0 || self.points.is_empty() {
            return vec![origin, end];
        }
        let count = (len / self.width).floor().max(1.0);
        let s = (len / (count * self.width)).min(1.0);
        let offset = (len - count * self.width * s) / 2.0;
        let mut res = vec![origin];
        for k in 0..count as usize {
            let base = offset + k as f32 * self.width * s;
            for p in &self.points {
                let q = origin + dir * (base + p.x * s) + normal * (p.y * s);
                if res.last() != Some(&q) {
                    res.push(q);
                }
            }
        }
        if res.last() != Some(&end) {
            res.push(end);
        }
        res
    }
}

/// Provides the shapes of the stickers that are not plain glue tabs.
pub trait StickerGeometry {
    /// The pattern for an edge of the given type. The `reversed` side is the
    /// one that receives the other, such as the holes for the pins.
    fn pattern(&self, edge_type: EdgeType, reversed: bool) -> TilePattern;
    /// The outline of the hole used to pour a filling into the model.
    fn pour_hole(&self) -> TilePattern;
}

/// Simple built-in shapes: a sawtooth for `Tooth` edges and pins and holes for `Pin` edges.
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultStickers;

impl DefaultStickers {
    pub const TOOTH: f32 = 0.005;
    pub const GAP: f32 = 0.003;
    pub const PIN: f32 = 0.003;
    pub const HOLE: f32 = 0.003;
    pub const CONNECTOR: f32 = 0.003;
    pub const POUR_HOLE: f32 = 0.003;

    fn tooth() -> TilePattern {
        let w = Self::TOOTH;
        TilePattern::tile(w, &[(0.0, 0.0), (0.2 * w, 0.8 * w), (0.8 * w, 0.8 * w), (w, 0.0)])
    }
    fn gap() -> TilePattern {
        TilePattern::tile(Self::GAP, &[(0.0, 0.0), (Self::GAP, 0.0)])
    }
    fn pin() -> TilePattern {
        let w = Self::PIN;
        TilePattern::tile(w, &[(0.0, 0.0), (0.15 * w, w), (0.85 * w, w), (w, 0.0)])
    }
    fn hole() -> TilePattern {
        let w = Self::HOLE;
        TilePattern::tile(w, &[
            (0.0, 0.0),
            (0.0, 1.4 * w),
            (0.15 * w, 1.4 * w),
            (0.15 * w, 0.3 * w),
            (0.85 * w, 0.3 * w),
            (0.85 * w, 1.4 * w),
            (w, 1.4 * w),
            (w, 0.0),
        ])
    }
    fn connector() -> TilePattern {
        let w = Self::CONNECTOR;
        TilePattern::tile(w, &[(0.0, 0.0), (0.0, 1.4 * w), (w, 1.4 * w), (w, 0.0)])
    }
}

impl StickerGeometry for DefaultStickers {
    fn pattern(&self, edge_type: EdgeType, reversed: bool) -> TilePattern {
        match (edge_type, reversed) {
            (EdgeType::Tooth, false) => TilePattern::concat(&[Self::gap(), Self::tooth()]),
            (EdgeType::Tooth, true) => TilePattern::concat(&[Self::tooth(), Self::gap()]),
            (EdgeType::Pin, false) => TilePattern::concat(&[Self::pin(), Self::gap()]),
            (EdgeType::Pin, true) => TilePattern::concat(&[Self::hole(), Self::connector()]),
            // glue tabs are computed from the faces, the edge stays straight
            (EdgeType::Auto | EdgeType::Glue, _) => TilePattern::concat(&[Self::gap()]),
        }
    }
    fn pour_hole(&self) -> TilePattern {
        let w = Self::POUR_HOLE;
        TilePattern::tile(w, &[(0.0, 0.0), (0.0, w), (w, w), (w, 0.0)])
    }
}

/// A tab of paper along a cut edge.
#[derive(Debug, Clone)]
pub struct Sticker {
    /// The edge this sticker hangs from.
    pub uvedge: LoopIndex,
    /// The edge where this sticker is glued.
    pub target: LoopIndex,
    /// From the end of the edge, around the tab, to its start.
    pub outline: Vec<Vector2>,
    pub edge_type: EdgeType,
    pub reversed: bool,
    pub text: Option<String>,
    pub center: Vector2,
    /// Direction of the baseline of the text.
    pub text_dir: Vector2,
    pub text_size: f32,
}

/// The hole cut in a face to fill the model.
#[derive(Debug, Clone)]
pub struct PourHole {
    pub uvedge: LoopIndex,
    pub outline: Vec<Vector2>,
}

/// Edge number drawn inside the face, when there are no stickers.
#[derive(Debug, Clone)]
pub struct NumberAlone {
    pub uvedge: LoopIndex,
    pub text: String,
    pub center: Vector2,
    pub text_dir: Vector2,
    pub size: f32,
}

/// Points from the target edge of a sticker outwards, with the sticker number.
#[derive(Debug, Clone)]
pub struct Arrow {
    pub uvedge: LoopIndex,
    pub text: String,
    pub center: Vector2,
    /// Unit vector along the edge.
    pub tangent: Vector2,
    pub size: f32,
}

impl Arrow {
    // The right side of the tangent points out of the face
    fn normal(&self) -> Vector2 {
        Vector2::new(self.tangent.y, -self.tangent.x)
    }
}

#[derive(Debug, Clone)]
pub enum Marker {
    Sticker(Sticker),
    PourHole(PourHole),
    NumberAlone(NumberAlone),
    Arrow(Arrow),
}

impl Marker {
    pub fn uvedge(&self) -> LoopIndex {
        match self {
            Marker::Sticker(s) => s.uvedge,
            Marker::PourHole(h) => h.uvedge,
            Marker::NumberAlone(n) => n.uvedge,
            Marker::Arrow(a) => a.uvedge,
        }
    }

    /// The points that must be inside the bounding box of the island.
    pub fn bounds(&self) -> Vec<Vector2> {
        match self {
            Marker::Sticker(s) => {
                let mut res = s.outline.clone();
                res.push(s.center);
                res
            }
            Marker::PourHole(h) => h.outline.clone(),
            Marker::NumberAlone(n) => vec![n.center],
            Marker::Arrow(a) => {
                let n = a.normal() * 1.2;
                vec![
                    a.center,
                    a.center + (n + a.tangent) * a.size,
                    a.center + (n - a.tangent) * a.size,
                ]
            }
        }
    }

    /// Rotates the marker around the origin.
    pub fn rotate(&mut self, rot: Matrix2) {
        self.map_points(|p| rot * p);
        match self {
            Marker::Sticker(s) => s.text_dir = rot * s.text_dir,
            Marker::NumberAlone(n) => n.text_dir = rot * n.text_dir,
            Marker::Arrow(a) => a.tangent = (rot * a.tangent).normalize(),
            Marker::PourHole(_) => {}
        }
    }

    pub fn translate(&mut self, offset: Vector2) {
        self.map_points(|p| p + offset);
    }

    pub fn scale(&mut self, scale: f32) {
        self.map_points(|p| p * scale);
        match self {
            Marker::Sticker(s) => s.text_size *= scale,
            Marker::NumberAlone(n) => n.size *= scale,
            Marker::Arrow(a) => a.size *= scale,
            Marker::PourHole(_) => {}
        }
    }

    // Positions only, not directions nor sizes
    fn map_points(&mut self, f: impl Fn(Vector2) -> Vector2) {
        match self {
            Marker::Sticker(s) => {
                for p in &mut s.outline {
                    *p = f(*p);
                }
                s.center = f(s.center);
            }
            Marker::PourHole(h) => {
                for p in &mut h.outline {
                    *p = f(*p);
                }
            }
            Marker::NumberAlone(n) => n.center = f(n.center),
            Marker::Arrow(a) => a.center = f(a.center),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_are_centered_along_the_edge() {
        let pattern = DefaultStickers.pattern(EdgeType::Tooth, false);
        assert_eq!(pattern.width, DefaultStickers::GAP + DefaultStickers::TOOTH);
        let len = 2.5 * pattern.width;
        let pts = pattern.stamp(Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(0.0, -1.0), len);
        assert_eq!(pts[0], Vector2::new(0.0, 0.0));
        assert_eq!(*pts.last().unwrap(), Vector2::new(len, 0.0));
        // two tiles, a quarter of a tile of margin on each side
        let teeth = pts.iter().filter(|p| p.y < 0.0).count();
        assert_eq!(teeth, 4);
        let first_tooth = pts.iter().find(|p| p.y < 0.0).unwrap();
        assert!(first_tooth.x > 0.25 * pattern.width);
        // the teeth stick out along the normal
        assert!(pts.iter().all(|p| p.y <= 0.0));
    }

    #[test]
    fn short_edges_get_one_smaller_tile() {
        let pattern = DefaultStickers.pattern(EdgeType::Pin, false);
        let len = pattern.width / 2.0;
        let pts = pattern.stamp(Vector2::new(0.0, 0.0), Vector2::new(0.0, 1.0), Vector2::new(1.0, 0.0), len);
        assert!(pts.iter().all(|p| p.y >= 0.0 && p.y <= len + 1e-7));
        let height = pts.iter().map(|p| p.x).fold(0.0, f32::max);
        assert!((height - DefaultStickers::PIN / 2.0).abs() < 1e-6);
    }

    #[test]
    fn markers_keep_their_shape_when_moved() {
        let mut m = Marker::Arrow(Arrow {
            uvedge: LoopIndex::from(0),
            text: "1".into(),
            center: Vector2::new(1.0, 0.0),
            tangent: Vector2::new(1.0, 0.0),
            size: 0.5,
        });
        let before = m.bounds();
        m.rotate(crate::util_3d::rotation2(0.0, 1.0));
        m.translate(Vector2::new(0.0, 2.0));
        let after = m.bounds();
        for (b, a) in before.iter().zip(&after) {
            let expected = Vector2::new(-b.y, b.x + 2.0);
            assert!((expected - a).magnitude() < 1e-6);
        }
        m.scale(2.0);
        assert_eq!(m.bounds()[0], Vector2::new(0.0, 6.0));
    }
}
