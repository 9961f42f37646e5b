//! Panels shown inside the case detail view

pub mod chat;
pub mod graph;
pub mod suspect;

pub use chat::ChatPanel;
pub use graph::{GraphPanel, GraphState, LayoutMode, LayoutOptions};
pub use suspect::SuspectPanel;
