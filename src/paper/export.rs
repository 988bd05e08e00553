//! A flat description of the unfolded net, ready to be drawn.
//!
//! All the coordinates are in page space: the origin is the corner of the
//! page, including the margin, and the units are those of the options.

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::util_3d::Vector2;

use super::*;

type Point = [f32; 2];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDocument {
    pub page_size: Point,
    pub margin: f32,
    /// The mesh edges that are cut, to be marked as seams.
    pub cut_edges: Vec<EdgeIndex>,
    pub pages: Vec<PageDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument {
    pub islands: Vec<IslandDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandDocument {
    pub number: u32,
    pub label: String,
    pub abbreviation: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    pub pos: Point,
    pub size: Point,
    pub inside_out: bool,
    pub faces: Vec<FaceDocument>,
    /// One closed polyline per boundary ring.
    pub boundary: Vec<Vec<Point>>,
    pub folds: Vec<FoldDocument>,
    pub markers: Vec<MarkerDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDocument {
    pub face: FaceIndex,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldDocument {
    pub edge: EdgeIndex,
    pub points: [Point; 2],
    pub convex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerDocument {
    Sticker {
        edge: EdgeIndex,
        edge_type: EdgeType,
        reversed: bool,
        outline: Vec<Point>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        text: Option<String>,
        center: Point,
        angle: f32,
        size: f32,
    },
    PourHole {
        edge: EdgeIndex,
        outline: Vec<Point>,
    },
    Number {
        edge: EdgeIndex,
        text: String,
        center: Point,
        angle: f32,
        size: f32,
    },
    Arrow {
        edge: EdgeIndex,
        text: String,
        center: Point,
        angle: f32,
        size: f32,
    },
}

fn angle_of(v: Vector2) -> f32 {
    v.y.atan2(v.x)
}

impl Papercraft {
    pub fn to_document(&self) -> NetDocument {
        let margin = self.options().margin;
        let (pw, ph) = self.options().page_size;
        let pages = self
            .pages()
            .iter()
            .map(|page| PageDocument {
                islands: page
                    .islands()
                    .iter()
                    .filter_map(|&key| self.island_by_key(key))
                    .map(|island| self.island_document(island, margin))
                    .collect(),
            })
            .collect();
        NetDocument {
            page_size: [pw, ph],
            margin,
            cut_edges: self.cut_edges(),
            pages,
        }
    }

    fn island_document(&self, island: &Island, margin: f32) -> IslandDocument {
        let offset = island.pos() + Vector2::new(margin, margin);
        let pt = |p: Vector2| -> Point { [p.x + offset.x, p.y + offset.y] };
        let uv = |v: UVVertexIndex| pt(self.uvvertex(v).co());
        let model = self.model();

        let faces = island
            .faces()
            .iter()
            .map(|&i_face| FaceDocument {
                face: i_face,
                points: model[i_face].loops().map(|l| uv(self.uvedge(l).va())).collect(),
            })
            .collect();

        let mut boundary = Vec::new();
        let mut visited: FxHashSet<LoopIndex> = FxHashSet::default();
        for &start in island.boundary() {
            let mut ring = Vec::new();
            let mut current = start;
            while visited.insert(current) {
                let e = self.uvedge(current);
                let from = if self.uvface(model[current].face()).flipped() { e.vb() } else { e.va() };
                ring.push(uv(from));
                match e.neighbor_left() {
                    Some(next) => current = next,
                    None => break,
                }
            }
            if !ring.is_empty() {
                boundary.push(ring);
            }
        }

        let mut folds = Vec::new();
        for &i_face in island.faces() {
            for l in model[i_face].loops() {
                let i_edge = model[l].edge();
                let data = self.edge_data(i_edge);
                if data.is_main_cut() || data.main_faces().is_none_or(|m| m[0] != l) {
                    continue;
                }
                let e = self.uvedge(l);
                folds.push(FoldDocument {
                    edge: i_edge,
                    points: [uv(e.va()), uv(e.vb())],
                    convex: data.angle() > 0.0,
                });
            }
        }

        let markers = island
            .markers()
            .iter()
            .map(|m| {
                let edge = model[m.uvedge()].edge();
                match m {
                    Marker::Sticker(s) => MarkerDocument::Sticker {
                        edge,
                        edge_type: s.edge_type,
                        reversed: s.reversed,
                        outline: s.outline.iter().map(|&p| pt(p)).collect(),
                        text: s.text.clone(),
                        center: pt(s.center),
                        angle: angle_of(s.text_dir),
                        size: s.text_size,
                    },
                    Marker::PourHole(h) => MarkerDocument::PourHole {
                        edge,
                        outline: h.outline.iter().map(|&p| pt(p)).collect(),
                    },
                    Marker::NumberAlone(n) => MarkerDocument::Number {
                        edge,
                        text: n.text.clone(),
                        center: pt(n.center),
                        angle: angle_of(n.text_dir),
                        size: n.size,
                    },
                    Marker::Arrow(a) => MarkerDocument::Arrow {
                        edge,
                        text: a.text.clone(),
                        center: pt(a.center),
                        angle: angle_of(a.tangent),
                        size: a.size,
                    },
                }
            })
            .collect();

        let size = island.bounding_box();
        IslandDocument {
            number: island.number(),
            label: island.label().to_owned(),
            abbreviation: island.abbreviation().to_owned(),
            title: island.title().map(str::to_owned),
            pos: pt(Vector2::new(0.0, 0.0)),
            size: [size.x, size.y],
            inside_out: island.is_inside_out(),
            faces,
            boundary,
            folds,
            markers,
        }
    }
}
