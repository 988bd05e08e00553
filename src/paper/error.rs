use thiserror::Error;

use super::model::{EdgeIndex, FaceIndex};

/// Errors that abort an unfolding run.
///
/// Rejected joins are not errors, see [`super::JoinResult`].
#[derive(Error, Debug)]
pub enum UnfoldError {
    /// A polygon references a vertex that does not exist.
    #[error("face {face} references vertex {vertex}, but the mesh has only {count} vertices")]
    InvalidVertexIndex { face: usize, vertex: usize, count: usize },

    /// A polygon with fewer than three corners.
    #[error("face {face} has only {corners} corners")]
    DegenerateFace { face: usize, corners: usize },

    /// The object transform mirrors the mesh.
    #[error("The object is flipped inside-out. Apply its scale to fix it")]
    InvertedScale,

    /// The mesh has geometry that cannot be unfolded.
    ///
    /// The index lists are meant to be highlighted by the host so the user can fix them.
    #[error("{}", geometry_message(.zero_length_edges, .zero_area_faces, .twisted_faces))]
    InvalidGeometry {
        zero_length_edges: Vec<EdgeIndex>,
        zero_area_faces: Vec<FaceIndex>,
        twisted_faces: Vec<FaceIndex>,
    },

    /// An island does not fit in the printable area of a page.
    #[error("island {island} ({} faces) is too big to fit onto a page of {}x{}: scale the model down or disable the page size limit",
        .faces.len(), .cage.0, .cage.1)]
    IslandTooBig {
        island: u32,
        faces: Vec<FaceIndex>,
        cage: (f32, f32),
    },

    /// An internal invariant was broken while joining islands.
    #[error("internal error while joining along edge {}: please report it, including the model if you can", usize::from(*.edge))]
    Internal { edge: EdgeIndex },

    /// The packer could not place these islands, by number, not even on an empty page.
    #[error("islands {islands:?} could not be placed on any page: please report it")]
    IslandsNotPlaced { islands: Vec<u32> },
}

impl UnfoldError {
    /// `true` for bugs in this crate, `false` for problems the user can fix.
    pub fn is_internal(&self) -> bool {
        matches!(self, UnfoldError::Internal { .. } | UnfoldError::IslandsNotPlaced { .. })
    }
}

fn geometry_message(edges: &[EdgeIndex], faces: &[FaceIndex], twisted: &[FaceIndex]) -> String {
    let mut parts = Vec::new();
    if !edges.is_empty() {
        parts.push(format!("{} edge(s) of zero length", edges.len()));
    }
    if !faces.is_empty() {
        parts.push(format!("{} face(s) of zero area", faces.len()));
    }
    if !twisted.is_empty() {
        parts.push(format!("{} twisted polygon(s)", twisted.len()));
    }
    format!("The model contains {}. Please fix them before unfolding", parts.join(", "))
}

pub type Result<T> = std::result::Result<T, UnfoldError>;
