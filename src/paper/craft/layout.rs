use cgmath::{InnerSpace, Rad};
use fxhash::FxHashSet;

use crate::util_3d::{self, Matrix2, Vector2, convex_hull_2d, pairs, rotation2};

use super::*;

/// Finds the rotation of the points that fits them best in a box of the given aspect ratio.
///
/// Returns the angle and the resulting `max(aspect * width, height)`, so with
/// `aspect = cage.y / cage.x` it tells how tall the cage must be.
pub fn cage_fit(points: &[Vector2], aspect: f32) -> (Rad<f32>, f32) {
    let polygon = convex_hull_2d(points);
    let mut best: Option<(f32, f32, f32)> = None;
    let mut consider = |height: f32, sin: f32, cos: f32| {
        let better = match best {
            None => true,
            Some((h, s, c)) => height.total_cmp(&h).then(sin.total_cmp(&s)).then(cos.total_cmp(&c)).is_lt(),
        };
        if better {
            best = Some((height, sin, cos));
        }
    };

    for (a, b) in pairs(&polygon) {
        if a == b {
            continue;
        }
        let direction = (b - a).normalize();
        let (sinx, cosx) = (-direction.y, direction.x);
        let rot = rotation2(cosx, sinx);
        let mut rot_polygon: Vec<Vector2> = polygon.iter().map(|p| rot * p).collect();
        let extremes = |ps: &[Vector2]| {
            let by_xy = |i: &usize, j: &usize| util_3d::tup_cmp(ps[*i], ps[*j]);
            let by_yx = |i: &usize, j: &usize| util_3d::tup_cmp(yx(ps[*i]), yx(ps[*j]));
            let idx = 0..ps.len();
            (
                idx.clone().min_by(by_xy).unwrap_or(0),
                idx.clone().max_by(by_xy).unwrap_or(0),
                idx.clone().min_by(by_yx).unwrap_or(0),
                idx.max_by(by_yx).unwrap_or(0),
            )
        };
        let (left, right, bottom, top) = extremes(&rot_polygon);
        let horz = rot_polygon[right] - rot_polygon[left];
        let vert = rot_polygon[top] - rot_polygon[bottom];
        consider((aspect * horz.x).max(vert.y), sinx, cosx);
        consider(horz.x.max(aspect * vert.y), -cosx, sinx);

        // the rotation where the width and the height, both scaled, are the same
        let q = aspect * horz.x - vert.y;
        let r = vert.x + aspect * horz.y;
        let mut t = if q != 0.0 { ((r * r + q * q).sqrt() - r) / q } else { 0.0 };
        if t.abs() > 1.0 {
            t = -1.0 / t;
        }
        let (siny, cosy) = (2.0 * t / (1.0 + t * t), (1.0 - t * t) / (1.0 + t * t));
        let rot = rotation2(cosy, siny);
        for p in &mut rot_polygon {
            *p = rot * *p;
        }
        let (l, r, b, t) = (rot_polygon[left], rot_polygon[right], rot_polygon[bottom], rot_polygon[top]);
        // only valid if the extremes are still the extremes
        if l.x < r.x && b.y < t.y && rot_polygon.iter().all(|p| l.x <= p.x && p.x <= r.x && b.y <= p.y && p.y <= t.y) {
            consider(
                (aspect * (r - l).x).max((t - b).y),
                sinx * cosy + cosx * siny,
                cosx * cosy - sinx * siny,
            );
        }
    }

    match best {
        Some((height, sin, cos)) => (Rad(sin.atan2(cos)), height),
        None => {
            // a single point, or nothing at all
            let (lo, hi) = util_3d::bounding_box_2d(points.iter().copied());
            let size = hi - lo;
            (Rad(0.0), (aspect * size.x).max(size.y))
        }
    }
}

fn yx(v: Vector2) -> Vector2 {
    Vector2::new(v.y, v.x)
}

// Keeps only the stops that are far enough from their next-but-one neighbor
fn drop_portion(stops: &mut Vec<f32>, border: f32, divisor: usize) {
    stops.sort_by(f32::total_cmp);
    if stops.len() < 3 {
        return;
    }
    let n = stops.len();
    let mut distances: Vec<f32> = (0..n - 2).map(|i| stops[i + 2] - stops[i]).collect();
    distances.push(border - stops[n - 2]);
    let mut sorted = distances.clone();
    sorted.sort_by(f32::total_cmp);
    let quantile = sorted[sorted.len() / divisor];
    let mut kept = vec![stops[0]];
    kept.extend((1..n).filter(|&i| distances[i - 1] >= quantile).map(|i| stops[i]));
    *stops = kept;
}

impl Papercraft {
    /// Rotates every island to its best fitting orientation and moves it to the origin.
    ///
    /// Leaves room for the title of the island under it if `title_height > 0`.
    pub fn finalize_islands(&mut self, cage: Vector2, title_height: f32) {
        let aspect = (cage.y - title_height) / cage.x;
        let keys: Vec<IslandKey> = self.island_order.clone();
        for key in keys {
            let island = &self.islands[key];
            let vertices = self.island_vertices(island);
            let mut points: Vec<Vector2> = vertices.iter().map(|&v| self.co(v)).collect();
            points.extend(island.markers.iter().flat_map(|m| m.bounds()));

            let (angle, _) = cage_fit(&points, aspect);
            let rot = Matrix2::from_angle(angle);
            for p in &mut points {
                *p = rot * *p;
            }
            let (lo, _) = util_3d::bounding_box_2d(points.iter().copied());
            let bottom_left = Vector2::new(lo.x, lo.y - title_height);
            let (_, hi) = util_3d::bounding_box_2d(points.iter().map(|p| p - bottom_left));

            for &v in &vertices {
                let co = &mut self.uv_vertices[usize::from(v)].co;
                *co = rot * *co - bottom_left;
            }
            let island = &mut self.islands[key];
            for marker in &mut island.markers {
                marker.rotate(rot);
                marker.translate(-bottom_left);
            }
            island.bounding_box = hi;
            if title_height > 0.0 {
                island.title = Some(format!("[{}] {}", island.abbreviation, island.label));
            }
        }
    }

    /// Scales all the geometry of the islands, markers included.
    pub fn scale_islands(&mut self, scale: f32) {
        let keys: Vec<IslandKey> = self.island_order.clone();
        for key in keys {
            for v in self.island_vertices(&self.islands[key]) {
                self.uv_vertices[usize::from(v)].co *= scale;
            }
            let island = &mut self.islands[key];
            for marker in &mut island.markers {
                marker.scale(scale);
            }
            island.bounding_box *= scale;
        }
    }

    /// Packs the islands into as few pages as possible.
    ///
    /// Every island is tried at every combination of the right and top sides
    /// of the islands already in the page, lowest first.
    pub fn fit_islands(&mut self, cage: Vector2) -> Result<()> {
        // written so that a NaN size does not fit either
        if let Some(&key) = self.island_order.iter().find(|&&k| {
            let bb = self.islands[k].bounding_box;
            !(bb.x <= cage.x && bb.y <= cage.y)
        }) {
            let island = &self.islands[key];
            return Err(UnfoldError::IslandTooBig {
                island: island.number,
                faces: island.faces.clone(),
                cage: (cage.x, cage.y),
            });
        }

        let mut remaining: Vec<IslandKey> = self.island_order.clone();
        // biggest first, the sort is stable so ties keep their order
        remaining.sort_by(|&a, &b| {
            let (a, b) = (self.islands[a].bounding_box, self.islands[b].bounding_box);
            b.magnitude2().total_cmp(&a.magnitude2())
        });

        let total = self.island_order.len();
        let mut pages = Vec::new();
        while !remaining.is_empty() {
            let mut page = Page::default();
            // obstacles, the last one that blocked a position goes first
            let mut obstacles: Vec<IslandKey> = Vec::new();
            let mut stops_x = vec![0.0f32];
            let mut stops_y = vec![0.0f32];
            let mut occupied: FxHashSet<(u32, u32)> = FxHashSet::default();
            let n_before = remaining.len();

            remaining.retain(|&key| {
                let size = self.islands[key].bounding_box;
                let Some(pos) = try_emplace(&self.islands, size, cage, &stops_x, &stops_y, &mut obstacles, &mut occupied) else {
                    return true;
                };
                self.islands[key].pos = pos;
                obstacles.push(key);
                page.islands.push(key);
                stops_x.push(pos.x + size.x);
                stops_y.push(pos.y + size.y);
                if stops_x.len().pow(2) > 4 * total + 100 {
                    drop_portion(&mut stops_x, cage.x, 4);
                    drop_portion(&mut stops_y, cage.y, 4);
                }
                false
            });
            if remaining.len() == n_before {
                let islands: Vec<u32> = remaining.iter().map(|&k| self.islands[k].number).collect();
                log::error!("no island fits in an empty page: {islands:?}");
                return Err(UnfoldError::IslandsNotPlaced { islands });
            }
            log::debug!("page {} gets {} islands", pages.len() + 1, page.islands.len());
            pages.push(page);
        }
        self.pages = pages;
        Ok(())
    }
}

fn try_emplace(
    islands: &SlotMap<IslandKey, Island>,
    size: Vector2,
    cage: Vector2,
    stops_x: &[f32],
    stops_y: &[f32],
    obstacles: &mut Vec<IslandKey>,
    occupied: &mut FxHashSet<(u32, u32)>,
) -> Option<Vector2> {
    for &x in stops_x {
        if x + size.x > cage.x {
            continue;
        }
        'y: for &y in stops_y {
            if y + size.y > cage.y || occupied.contains(&(x.to_bits(), y.to_bits())) {
                continue;
            }
            for i in 0..obstacles.len() {
                let other = &islands[obstacles[i]];
                let (o, os) = (other.pos, other.bounding_box);
                if x + size.x > o.x && o.x + os.x > x && y + size.y > o.y && o.y + os.y > y {
                    if x >= o.x && y >= o.y {
                        occupied.insert((x.to_bits(), y.to_bits()));
                    }
                    let blocker = obstacles.remove(i);
                    obstacles.insert(0, blocker);
                    continue 'y;
                }
            }
            return Some(Vector2::new(x, y));
        }
    }
    None
}
