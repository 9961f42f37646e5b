//! CaseDesk Dashboard
//!
//! Client-side view logic for the case-analysis backend:
//! - Case list and selection state machine
//! - Detail view with graph, chat and suspect panels
//! - Runtime that executes backend commands as tokio tasks
//! - Text rendering and console commands for the host binary

pub mod console;
pub mod detail;
pub mod panels;
pub mod render;
pub mod runtime;
pub mod state;

pub use detail::{DetailSession, DetailView, Evidence};
pub use runtime::{Completions, Dashboard};
pub use state::{Banner, Command, Event, Generation, ViewState};
