use cgmath::{InnerSpace, Matrix, SquareMatrix, Zero};
use fxhash::FxHashMap;

use crate::util_3d::{self, Vector3};

use super::EdgeType;
use super::error::{Result, UnfoldError};

pub type Matrix3 = cgmath::Matrix3<f32>;

// We use u32 where usize should be used to save some memory in 64-bit systems.
// 32-bit indices should be enough for everybody ;-)
macro_rules! index_type {
    ($vis:vis $name:ident : $inner:ty) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[derive(::serde::Serialize, ::serde::Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        $vis struct $name($inner);

        impl From<$name> for usize {
            fn from(idx: $name) -> usize {
                idx.0 as usize
            }
        }

        impl From<usize> for $name {
            fn from(idx: usize) -> $name {
                $name(idx as $inner)
            }
        }
    }
}
pub(crate) use index_type;

index_type!(pub VertexIndex: u32);
index_type!(pub EdgeIndex: u32);
index_type!(pub FaceIndex: u32);
// A face corner: the pair of a face and one of its vertices, and the edge leaving it
index_type!(pub LoopIndex: u32);

const EPSILON: f32 = 1.0e-6;

#[derive(Debug)]
pub struct Vertex {
    pos: Vector3,
    loops: Vec<LoopIndex>,
}

#[derive(Debug)]
pub struct Edge {
    v0: VertexIndex,
    v1: VertexIndex,
    loops: Vec<LoopIndex>,
    seam: bool,
    edge_type: EdgeType,
}

#[derive(Debug)]
pub struct Face {
    first_loop: u32,
    num_loops: u32,
    normal: Vector3,
}

// Loop `i` of a face goes from `vertex` to the vertex of loop `i + 1`, along `edge`
#[derive(Debug)]
pub struct Loop {
    face: FaceIndex,
    vertex: VertexIndex,
    edge: EdgeIndex,
    next: LoopIndex,
}

/// Immutable arena of the mesh to be unfolded.
#[derive(Debug)]
pub struct Model {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    loops: Vec<Loop>,
}

impl Model {
    /// Builds the mesh from a polygon soup.
    ///
    /// Every polygon is a list of indices into `positions`, wound
    /// counter-clockwise when seen from outside. Edges are shared by all the
    /// polygons that use the same pair of vertices, in any direction.
    pub fn from_polygons(positions: Vec<Vector3>, polygons: &[Vec<u32>]) -> Result<Model> {
        let num_loops = polygons.iter().map(|p| p.len()).sum();
        let mut vertices: Vec<Vertex> = positions
            .into_iter()
            .map(|pos| Vertex { pos, loops: Vec::new() })
            .collect();
        let mut edges: Vec<Edge> = Vec::with_capacity(num_loops / 2);
        let mut faces: Vec<Face> = Vec::with_capacity(polygons.len());
        let mut loops: Vec<Loop> = Vec::with_capacity(num_loops);
        let mut edge_map: FxHashMap<(VertexIndex, VertexIndex), EdgeIndex> = FxHashMap::default();

        for (i_face, poly) in polygons.iter().enumerate() {
            if poly.len() < 3 {
                return Err(UnfoldError::DegenerateFace { face: i_face, corners: poly.len() });
            }
            if let Some(&bad) = poly.iter().find(|&&v| v as usize >= vertices.len()) {
                return Err(UnfoldError::InvalidVertexIndex {
                    face: i_face,
                    vertex: bad as usize,
                    count: vertices.len(),
                });
            }
            let first_loop = loops.len();
            for (i, &v0) in poly.iter().enumerate() {
                let v1 = poly[(i + 1) % poly.len()];
                let (v0, v1) = (VertexIndex(v0), VertexIndex(v1));
                let key = if v0 <= v1 { (v0, v1) } else { (v1, v0) };
                let i_edge = *edge_map.entry(key).or_insert_with(|| {
                    edges.push(Edge {
                        v0,
                        v1,
                        loops: Vec::new(),
                        seam: false,
                        edge_type: EdgeType::Auto,
                    });
                    EdgeIndex::from(edges.len() - 1)
                });
                let i_loop = LoopIndex::from(loops.len());
                let edge = &mut edges[usize::from(i_edge)];
                if edge.loops.len() == 2 {
                    log::warn!("edge {}-{} has more than two faces", v0.0, v1.0);
                }
                edge.loops.push(i_loop);
                vertices[usize::from(v0)].loops.push(i_loop);
                loops.push(Loop {
                    face: FaceIndex::from(i_face),
                    vertex: v0,
                    edge: i_edge,
                    next: LoopIndex::from(first_loop + (i + 1) % poly.len()),
                });
            }
            faces.push(Face {
                first_loop: first_loop as u32,
                num_loops: poly.len() as u32,
                normal: Vector3::zero(),
            });
        }

        let mut model = Model { vertices, edges, faces, loops };
        model.update_normals();
        Ok(model)
    }

    fn update_normals(&mut self) {
        for i in 0..self.faces.len() {
            let ps: Vec<Vector3> = self.face_positions(FaceIndex::from(i)).collect();
            let n = util_3d::polygon_normal(&ps);
            self.faces[i].normal = if n.magnitude2() > 0.0 { n.normalize() } else { n };
        }
    }

    /// Applies the object transform to every vertex.
    ///
    /// A transform that mirrors the mesh would turn it inside out, so it is rejected.
    pub fn apply_transform(&mut self, mx: &Matrix3) -> Result<()> {
        if mx.determinant() <= 0.0 {
            return Err(UnfoldError::InvertedScale);
        }
        for v in &mut self.vertices {
            v.pos = mx * v.pos;
        }
        self.update_normals();
        Ok(())
    }

    pub fn set_seam(&mut self, i_edge: EdgeIndex, seam: bool) {
        self.edges[usize::from(i_edge)].seam = seam;
    }
    pub fn set_edge_type(&mut self, i_edge: EdgeIndex, edge_type: EdgeType) {
        self.edges[usize::from(i_edge)].edge_type = edge_type;
    }

    /// Looks for the edge joining two vertices, in any direction.
    pub fn find_edge(&self, v0: VertexIndex, v1: VertexIndex) -> Option<EdgeIndex> {
        self[v0]
            .loops
            .iter()
            .chain(&self[v1].loops)
            .map(|&l| self[l].edge)
            .find(|&e| {
                let e = &self[e];
                (e.v0, e.v1) == (v0, v1) || (e.v0, e.v1) == (v1, v0)
            })
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexIndex, &Vertex)> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (VertexIndex::from(i), v))
    }
    pub fn faces(&self) -> impl Iterator<Item = (FaceIndex, &Face)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .map(|(i, f)| (FaceIndex::from(i), f))
    }
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeIndex::from(i), e))
    }
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }
    pub fn num_loops(&self) -> usize {
        self.loops.len()
    }

    pub fn face_positions(&self, i_face: FaceIndex) -> impl Iterator<Item = Vector3> + '_ {
        self[i_face].loops().map(|l| self[self[l].vertex].pos)
    }
    pub fn edge_vector(&self, i_edge: EdgeIndex) -> Vector3 {
        let e = &self[i_edge];
        self[e.v1].pos - self[e.v0].pos
    }
    pub fn edge_length(&self, i_edge: EdgeIndex) -> f32 {
        self.edge_vector(i_edge).magnitude()
    }
    pub fn face_area(&self, i_face: FaceIndex) -> f32 {
        let ps: Vec<Vector3> = self.face_positions(i_face).collect();
        util_3d::polygon_area(&ps)
    }
    pub fn face_perimeter(&self, i_face: FaceIndex) -> f32 {
        self[i_face].loops().map(|l| self.edge_length(self[l].edge)).sum()
    }

    /// Checks that the mesh can be unfolded.
    ///
    /// All the defects found are reported at once, so that the host can highlight them.
    pub fn check_correct(&self) -> Result<()> {
        let zero_length_edges: Vec<EdgeIndex> = self
            .edges()
            .filter(|(i_edge, e)| !e.loops.is_empty() && self.edge_length(*i_edge) < EPSILON)
            .map(|(i_edge, _)| i_edge)
            .collect();
        let zero_area_faces: Vec<FaceIndex> = self
            .faces()
            .map(|(i_face, _)| i_face)
            .filter(|&i_face| self.face_area(i_face) < EPSILON)
            .collect();
        let twisted_faces: Vec<FaceIndex> = self
            .faces()
            .filter(|(i_face, f)| f.num_loops > 3 && self.is_twisted(*i_face))
            .map(|(i_face, _)| i_face)
            .collect();

        if zero_length_edges.is_empty() && zero_area_faces.is_empty() && twisted_faces.is_empty() {
            return Ok(());
        }
        Err(UnfoldError::InvalidGeometry {
            zero_length_edges,
            zero_area_faces,
            twisted_faces,
        })
    }

    // A polygon is twisted if any of its vertices is farther from its plane than 1% of its size
    fn is_twisted(&self, i_face: FaceIndex) -> bool {
        let face = &self[i_face];
        let ps: Vec<Vector3> = self.face_positions(i_face).collect();
        let center = ps.iter().fold(Vector3::zero(), |a, p| a + p) / ps.len() as f32;
        let plane_d = center.dot(face.normal);
        let diameter = ps
            .iter()
            .map(|p| (p - center).magnitude())
            .fold(0.0, f32::max);
        let threshold = 0.01 * diameter;
        ps.iter().any(|p| (p.dot(face.normal) - plane_d).abs() > threshold)
    }
}

impl std::ops::Index<VertexIndex> for Model {
    type Output = Vertex;

    fn index(&self, index: VertexIndex) -> &Vertex {
        &self.vertices[index.0 as usize]
    }
}

impl std::ops::Index<EdgeIndex> for Model {
    type Output = Edge;

    fn index(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index.0 as usize]
    }
}

impl std::ops::Index<FaceIndex> for Model {
    type Output = Face;

    fn index(&self, index: FaceIndex) -> &Face {
        &self.faces[index.0 as usize]
    }
}

impl std::ops::Index<LoopIndex> for Model {
    type Output = Loop;

    fn index(&self, index: LoopIndex) -> &Loop {
        &self.loops[index.0 as usize]
    }
}

impl Vertex {
    pub fn pos(&self) -> Vector3 {
        self.pos
    }
    /// The face corners at this vertex.
    pub fn loops(&self) -> &[LoopIndex] {
        &self.loops
    }
}

impl Edge {
    pub fn vertices(&self) -> (VertexIndex, VertexIndex) {
        (self.v0, self.v1)
    }
    /// The face corners running along this edge, one per incident face.
    pub fn loops(&self) -> &[LoopIndex] {
        &self.loops
    }
    pub fn seam(&self) -> bool {
        self.seam
    }
    pub fn edge_type(&self) -> EdgeType {
        self.edge_type
    }
}

impl Face {
    pub fn loops(&self) -> impl Iterator<Item = LoopIndex> + use<> {
        (self.first_loop..self.first_loop + self.num_loops).map(LoopIndex)
    }
    pub fn num_loops(&self) -> usize {
        self.num_loops as usize
    }
    /// The unit normal, or zero for a degenerate face.
    pub fn normal(&self) -> Vector3 {
        self.normal
    }
}

impl Loop {
    pub fn face(&self) -> FaceIndex {
        self.face
    }
    pub fn vertex(&self) -> VertexIndex {
        self.vertex
    }
    pub fn edge(&self) -> EdgeIndex {
        self.edge
    }
    pub fn next(&self) -> LoopIndex {
        self.next
    }
}

// The matrix must be transposed to apply it to row vectors, but cgmath only multiplies column vectors
pub fn transform_from_rows(rows: [[f32; 3]; 3]) -> Matrix3 {
    Matrix3::from(rows).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Model {
        let ps = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        Model::from_polygons(ps, &[vec![0, 1, 2], vec![0, 2, 3]]).unwrap()
    }

    #[test]
    fn shared_edges_are_merged() {
        let m = square();
        assert_eq!(m.num_faces(), 2);
        assert_eq!(m.num_loops(), 6);
        assert_eq!(m.num_edges(), 5);
        let diagonal = m.find_edge(VertexIndex::from(2), VertexIndex::from(0)).unwrap();
        assert_eq!(m[diagonal].loops().len(), 2);
        let normal = m[FaceIndex::from(0)].normal();
        assert!((normal - Vector3::new(0.0, 0.0, 1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn loops_are_chained_per_face() {
        let m = square();
        let face = &m[FaceIndex::from(1)];
        let ls: Vec<_> = face.loops().collect();
        assert_eq!(m[ls[2]].next(), ls[0]);
        assert_eq!(m[ls[0]].vertex(), VertexIndex::from(0));
        assert_eq!(m[ls[1]].face(), FaceIndex::from(1));
    }

    #[test]
    fn bad_indices_are_rejected() {
        let err = Model::from_polygons(vec![Vector3::zero(); 3], &[vec![0, 1, 7]]).unwrap_err();
        assert!(matches!(err, UnfoldError::InvalidVertexIndex { vertex: 7, .. }));
        let err = Model::from_polygons(vec![Vector3::zero(); 3], &[vec![0, 1]]).unwrap_err();
        assert!(matches!(err, UnfoldError::DegenerateFace { corners: 2, .. }));
    }

    #[test]
    fn zero_area_faces_are_reported() {
        let ps = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ];
        let m = Model::from_polygons(ps, &[vec![0, 1, 2]]).unwrap();
        match m.check_correct() {
            Err(UnfoldError::InvalidGeometry { zero_area_faces, zero_length_edges, .. }) => {
                assert_eq!(zero_area_faces, vec![FaceIndex::from(0)]);
                assert!(zero_length_edges.is_empty());
            }
            r => panic!("unexpected {r:?}"),
        }
    }

    #[test]
    fn twisted_quads_are_reported() {
        let ps = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.5),
            Vector3::new(0.0, 1.0, 0.0),
        ];
        let m = Model::from_polygons(ps, &[vec![0, 1, 2, 3]]).unwrap();
        assert!(matches!(
            m.check_correct(),
            Err(UnfoldError::InvalidGeometry { ref twisted_faces, .. }) if twisted_faces.len() == 1
        ));
    }

    #[test]
    fn mirroring_transform_is_rejected() {
        let mut m = square();
        let mirror = transform_from_rows([[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(m.apply_transform(&mirror), Err(UnfoldError::InvertedScale)));
        let scale = transform_from_rows([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]);
        m.apply_transform(&scale).unwrap();
        assert!((m.face_area(FaceIndex::from(0)) - 2.0).abs() < 1e-5);
    }
}
