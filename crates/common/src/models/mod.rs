//! Data model shared by the client and the dashboard
//!
//! Cases and graphs are read from the backend; chat transcripts only ever
//! live in memory.

mod case;
mod chat;
mod graph;
mod wire;

pub use case::{parse_timestamp, Case, CaseId, CaseKind, CasePatch, CaseStatus};
pub use chat::{ChatEntry, ChatRole, ChatTranscript};
pub use graph::{Graph, GraphEdge, GraphNode};
pub use wire::{
    AskRequest, AskResponse, SimulationResponse, SuspectImageRequest, SuspectImageResponse,
    UploadFile, UploadReceipt, MISSING_DESCRIPTION, MISSING_FILE, MISSING_QUESTION,
};
