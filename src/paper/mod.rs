use serde::{Deserialize, Serialize};

mod craft;
mod error;
mod export;
mod markers;
mod model;

pub use craft::*;
pub use error::{Result, UnfoldError};
pub use export::*;
pub use markers::*;
pub use model::*;

/// How two flaps of paper are held together along a cut edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    #[default]
    Auto,
    Pin,
    Tooth,
    Glue,
}

/// Weights of the cut priority of every edge, lower priority edges are joined first.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub convex: f32,
    pub concave: f32,
    pub length: f32,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        PriorityWeights {
            convex: 0.5,
            concave: 1.0,
            length: -0.05,
        }
    }
}

/// Everything that drives a single unfolding run.
///
/// Lengths are in the units of the printed output (meters by default), the
/// model coordinates are multiplied by `scale` to get there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnfoldOptions {
    pub page_size: (f32, f32),
    pub margin: f32,
    /// Do not create islands bigger than the printable area.
    pub limit_by_page: bool,
    pub priority: PriorityWeights,
    pub scale: f32,
    pub sticker_width: f32,
    pub create_stickers: bool,
    pub create_numbers: bool,
    pub create_pour_hole: bool,
    /// Edges that must be cut, besides the seams of the model.
    pub seams: Vec<u32>,
    pub pin_edges: Vec<u32>,
    pub tooth_edges: Vec<u32>,
    pub glue_edges: Vec<u32>,
}

impl Default for UnfoldOptions {
    fn default() -> Self {
        UnfoldOptions {
            // A4
            page_size: (0.210, 0.297),
            margin: 0.005,
            limit_by_page: true,
            priority: PriorityWeights::default(),
            scale: 1.0,
            sticker_width: 0.005,
            create_stickers: true,
            create_numbers: true,
            create_pour_hole: true,
            seams: Vec::new(),
            pin_edges: Vec::new(),
            tooth_edges: Vec::new(),
            glue_edges: Vec::new(),
        }
    }
}

impl UnfoldOptions {
    /// The page size minus the margins.
    pub fn printable_size(&self) -> (f32, f32) {
        (
            self.page_size.0 - 2.0 * self.margin,
            self.page_size.1 - 2.0 * self.margin,
        )
    }
    /// The edge type requested for an edge, if any of the edge sets names it.
    pub fn edge_type(&self, i_edge: EdgeIndex) -> Option<EdgeType> {
        let i = usize::from(i_edge) as u32;
        [
            (&self.pin_edges, EdgeType::Pin),
            (&self.tooth_edges, EdgeType::Tooth),
            (&self.glue_edges, EdgeType::Glue),
        ]
        .into_iter()
        .find(|(set, _)| set.contains(&i))
        .map(|(_, t)| t)
    }
}

/// Unfolds the model and lays the resulting islands out onto pages.
pub fn unfold(model: Model, options: &UnfoldOptions) -> Result<Papercraft> {
    let mut papercraft = Papercraft::new(model, options.clone())?;
    papercraft.prepare()?;
    papercraft.layout()?;
    log::info!(
        "unfolded {} faces into {} islands on {} pages",
        papercraft.model().num_faces(),
        papercraft.num_islands(),
        papercraft.pages().len()
    );
    Ok(papercraft)
}
