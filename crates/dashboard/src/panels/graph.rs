//! Knowledge graph panel
//!
//! Fetches the graph once per case id and builds the options object handed
//! to the network renderer. Directed graphs are laid out hierarchically,
//! left to right, with arrows toward the relation target; graphs without
//! edges fall back to plain force-directed physics.

use casedesk_common::errors::AppError;
use casedesk_common::models::{CaseId, Graph};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Hierarchical,
    ForceDirected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOptions {
    pub shape: &'static str,
    pub size: u32,
    pub border_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothOptions {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub roundness: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeOptions {
    pub width: u32,
    pub arrows: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smooth: Option<SmoothOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepulsionOptions {
    pub node_distance: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsOptions {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchical_repulsion: Option<RepulsionOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalOptions {
    pub enabled: bool,
    pub sort_method: &'static str,
    pub direction: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchical: Option<HierarchicalOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOptions {
    pub hover: bool,
    pub tooltip_delay: u32,
}

/// Options object for the network renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutOptions {
    pub nodes: NodeOptions,
    pub edges: EdgeOptions,
    pub physics: PhysicsOptions,
    pub layout: LayoutSection,
    pub interaction: InteractionOptions,
}

impl LayoutOptions {
    pub fn for_graph(graph: &Graph) -> Self {
        if graph.has_edges() {
            Self::hierarchical()
        } else {
            Self::force_directed()
        }
    }

    pub fn hierarchical() -> Self {
        Self {
            nodes: node_options(),
            edges: EdgeOptions {
                width: 2,
                arrows: "to",
                smooth: Some(SmoothOptions { kind: "curvedCW", roundness: 0.2 }),
            },
            physics: PhysicsOptions {
                enabled: true,
                hierarchical_repulsion: Some(RepulsionOptions { node_distance: 150 }),
            },
            layout: LayoutSection {
                hierarchical: Some(HierarchicalOptions {
                    enabled: true,
                    sort_method: "directed",
                    direction: "LR",
                }),
            },
            interaction: interaction_options(),
        }
    }

    pub fn force_directed() -> Self {
        Self {
            nodes: node_options(),
            edges: EdgeOptions { width: 2, arrows: "to", smooth: None },
            physics: PhysicsOptions { enabled: true, hierarchical_repulsion: None },
            layout: LayoutSection { hierarchical: None },
            interaction: interaction_options(),
        }
    }

    pub fn mode(&self) -> LayoutMode {
        if self.layout.hierarchical.is_some() {
            LayoutMode::Hierarchical
        } else {
            LayoutMode::ForceDirected
        }
    }
}

fn node_options() -> NodeOptions {
    NodeOptions { shape: "dot", size: 18, border_width: 2 }
}

fn interaction_options() -> InteractionOptions {
    InteractionOptions { hover: true, tooltip_delay: 200 }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphState {
    Idle,
    Loading,
    Ready(Graph),
    Failed,
}

#[derive(Debug, Clone)]
pub struct GraphPanel {
    case_id: Option<CaseId>,
    state: GraphState,
}

impl Default for GraphPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphPanel {
    pub fn new() -> Self {
        Self { case_id: None, state: GraphState::Idle }
    }

    /// Point the panel at a case. Returns true when a fetch must be issued,
    /// which happens only when the case id changes.
    pub fn show(&mut self, case_id: CaseId) -> bool {
        if self.case_id == Some(case_id) {
            return false;
        }
        self.case_id = Some(case_id);
        self.state = GraphState::Loading;
        true
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    /// Apply a fetch result; results for another case id are ignored
    pub fn loaded(&mut self, case_id: CaseId, result: Result<Graph, AppError>) -> Result<(), AppError> {
        if self.case_id != Some(case_id) {
            return Ok(());
        }
        match result {
            Ok(graph) => {
                self.state = GraphState::Ready(graph);
                Ok(())
            }
            Err(err) => {
                self.state = GraphState::Failed;
                Err(err)
            }
        }
    }

    pub fn layout(&self) -> Option<LayoutOptions> {
        match &self.state {
            GraphState::Ready(graph) => Some(LayoutOptions::for_graph(graph)),
            _ => None,
        }
    }
}
