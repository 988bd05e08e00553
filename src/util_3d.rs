use std::cmp::Ordering;

use cgmath::{InnerSpace, Zero};

pub type Vector2 = cgmath::Vector2<f32>;
pub type Vector3 = cgmath::Vector3<f32>;
pub type Matrix2 = cgmath::Matrix2<f32>;
pub type Rad = cgmath::Rad<f32>;

// Newell's method: robust for non planar n-gons, returns a zero vector for degenerate polygons
pub fn polygon_normal(ps: &[Vector3]) -> Vector3 {
    let mut normal = Vector3::zero();
    for (a, b) in pairs(ps) {
        normal += a.cross(b);
    }
    normal
}

// Half the magnitude of the Newell vector is the area of the (planar) polygon
pub fn polygon_area(ps: &[Vector3]) -> f32 {
    polygon_normal(ps).magnitude() / 2.0
}

/// A 2D coordinate system embedded in 3D, orthogonal to a face normal.
///
/// The axes are chosen so that a polygon wound counter-clockwise around the
/// normal stays counter-clockwise once projected.
#[derive(Debug, Copy, Clone)]
pub struct Plane {
    u: Vector3,
    v: Vector3,
}

impl Plane {
    pub fn z_up(n: Vector3) -> Plane {
        let b = (n.x * n.x + n.y * n.y).sqrt();
        let s = n.magnitude();
        if b > 0.0 {
            Plane {
                u: Vector3::new(n.x * n.z / (b * s), n.y * n.z / (b * s), -b / s),
                v: Vector3::new(-n.y / b, n.x / b, 0.0),
            }
        } else {
            // no need for rotation
            Plane {
                u: Vector3::new(1.0, 0.0, 0.0),
                v: Vector3::new(0.0, if n.z < 0.0 { -1.0 } else { 1.0 }, 0.0),
            }
        }
    }
    pub fn project(&self, p: &Vector3) -> Vector2 {
        Vector2::new(self.u.dot(*p), self.v.dot(*p))
    }
}

// cgmath matrices are column-major, this builds one from its rows
pub fn matrix2_rows(a: f32, b: f32, c: f32, d: f32) -> Matrix2 {
    Matrix2::new(a, c, b, d)
}

pub fn rotation2(cos: f32, sin: f32) -> Matrix2 {
    matrix2_rows(cos, -sin, sin, cos)
}

pub const MIRROR_X: Matrix2 = Matrix2::new(-1.0, 0.0, 0.0, 1.0);

/// Returns the matrix that rotates (and uniformly scales) `v1` onto `v2`.
pub fn fitting_matrix(v1: Vector2, v2: Vector2) -> Matrix2 {
    let k = 1.0 / v1.magnitude2();
    let dot = v1.x * v2.x + v1.y * v2.y;
    matrix2_rows(
        k * dot, k * (v1.y * v2.x - v1.x * v2.y),
        k * (v1.x * v2.y - v1.y * v2.x), k * dot,
    )
}

pub fn cross2(a: Vector2, b: Vector2) -> f32 {
    a.x * b.y - a.y * b.x
}

// Lexicographic order of the coordinates, the same order used by the sweep lines
pub fn tup_lt(a: Vector2, b: Vector2) -> bool {
    (a.x, a.y) < (b.x, b.y)
}
pub fn tup_le(a: Vector2, b: Vector2) -> bool {
    (a.x, a.y) <= (b.x, b.y)
}
// Adding 0.0 turns -0.0 into 0.0, so that both compare as equal
pub fn tup_cmp(a: Vector2, b: Vector2) -> Ordering {
    (a.x + 0.0).total_cmp(&(b.x + 0.0)).then_with(|| (a.y + 0.0).total_cmp(&(b.y + 0.0)))
}

// f32 does not implement Eq nor Hash, but the bit pattern does
pub fn exact_key(v: Vector2) -> (u32, u32) {
    ((v.x + 0.0).to_bits(), (v.y + 0.0).to_bits())
}

pub fn bounding_box_2d(vs: impl IntoIterator<Item = Vector2>) -> (Vector2, Vector2) {
    let mut vs = vs.into_iter();
    let (mut a, mut b) = match vs.next() {
        Some(v) => (v, v),
        None => return (Vector2::zero(), Vector2::zero()),
    };
    for v in vs {
        a.x = a.x.min(v.x);
        a.y = a.y.min(v.y);
        b.x = b.x.max(v.x);
        b.y = b.y.max(v.y);
    }
    (a, b)
}

// Andrew's monotone chain, counter-clockwise, without collinear points
pub fn convex_hull_2d(points: &[Vector2]) -> Vec<Vector2> {
    let mut ps = points.to_vec();
    ps.sort_by(|a, b| tup_cmp(*a, *b));
    ps.dedup();
    if ps.len() < 3 {
        return ps;
    }
    let mut hull: Vec<Vector2> = Vec::with_capacity(2 * ps.len());
    for pass in 0..2 {
        let start = hull.len();
        let iter: Box<dyn Iterator<Item = &Vector2>> = if pass == 0 {
            Box::new(ps.iter())
        } else {
            Box::new(ps.iter().rev())
        };
        for &p in iter {
            while hull.len() >= start + 2 {
                let a = hull[hull.len() - 2];
                let b = hull[hull.len() - 1];
                if cross2(b - a, p - a) <= 0.0 {
                    hull.pop();
                } else {
                    break;
                }
            }
            hull.push(p);
        }
        // the last point of each chain is the first of the other one
        hull.pop();
    }
    hull
}

/// Consecutive pairs of the slice, closing with `(last, first)`.
pub fn pairs<T: Copy>(xs: &[T]) -> impl Iterator<Item = (T, T)> + '_ {
    xs.iter()
        .enumerate()
        .map(move |(i, &a)| (a, xs[(i + 1) % xs.len()]))
}
