//! Case detail session and its view composition

use casedesk_common::errors::AppError;
use casedesk_common::models::{Case, CaseId, CaseKind, CaseStatus, ChatEntry, Graph};
use tracing::debug;

use crate::panels::{ChatPanel, GraphPanel, GraphState, LayoutOptions, SuspectPanel};
use crate::state::{Command, Generation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationState {
    /// Image cases have no simulation
    NotApplicable,
    Loading,
    Ready(String),
    Failed,
}

/// Everything shown while one case is open
///
/// Holds a working copy of the case. The case list is never touched from
/// here; changes to the copy go through `Case::merge`.
#[derive(Debug, Clone)]
pub struct DetailSession {
    generation: Generation,
    case: Case,
    simulation: SimulationState,
    graph: GraphPanel,
    chat: ChatPanel,
    suspect: SuspectPanel,
}

impl DetailSession {
    /// Open a session and return the fetches it needs
    pub fn open(case: Case, generation: Generation) -> (Self, Vec<Command>) {
        let mut session = Self {
            generation,
            simulation: SimulationState::NotApplicable,
            graph: GraphPanel::new(),
            chat: ChatPanel::new(),
            suspect: SuspectPanel::new(),
            case,
        };

        let mut commands = Vec::new();
        if session.case.kind() == CaseKind::Text {
            let case_id = session.case.id;
            session.simulation = SimulationState::Loading;
            commands.push(Command::RequestSimulation { generation, case_id });
            if session.graph.show(case_id) {
                commands.push(Command::FetchGraph { generation, case_id });
            }
        }
        (session, commands)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn case(&self) -> &Case {
        &self.case
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.simulation
    }

    pub fn graph(&self) -> &GraphPanel {
        &self.graph
    }

    pub fn chat(&self) -> &ChatPanel {
        &self.chat
    }

    pub fn suspect(&self) -> &SuspectPanel {
        &self.suspect
    }

    pub fn send_chat(&mut self, input: &str) -> Option<Command> {
        let question = self.chat.send(input)?;
        Some(Command::AskDetective {
            generation: self.generation,
            case_id: self.case.id,
            question,
        })
    }

    pub fn generate_suspect(&mut self, input: &str) -> Result<Command, AppError> {
        let description = self.suspect.submit(input)?;
        Ok(Command::GenerateSuspectImage {
            generation: self.generation,
            case_id: self.case.id,
            description,
        })
    }

    pub fn simulation_loaded(&mut self, case_id: CaseId, result: Result<String, AppError>) -> Result<(), AppError> {
        if !self.owns(case_id) {
            return Ok(());
        }
        match result {
            Ok(text) => {
                self.simulation = SimulationState::Ready(text);
                Ok(())
            }
            Err(err) => {
                self.simulation = SimulationState::Failed;
                Err(err)
            }
        }
    }

    pub fn graph_loaded(&mut self, case_id: CaseId, result: Result<Graph, AppError>) -> Result<(), AppError> {
        if !self.owns(case_id) {
            return Ok(());
        }
        self.graph.loaded(case_id, result)
    }

    pub fn chat_answered(&mut self, case_id: CaseId, result: Result<String, AppError>) -> Result<(), AppError> {
        if !self.owns(case_id) {
            return Ok(());
        }
        self.chat.answered(result)
    }

    pub fn suspect_generated(&mut self, case_id: CaseId, result: Result<String, AppError>) -> Result<(), AppError> {
        if !self.owns(case_id) {
            return Ok(());
        }
        self.suspect.generated(&mut self.case, result)
    }

    fn owns(&self, case_id: CaseId) -> bool {
        if case_id != self.case.id {
            debug!(expected = %self.case.id, got = %case_id, "Ignoring completion for another case");
            return false;
        }
        true
    }

    /// Compose the view; `file_url` resolves a stored file path
    pub fn view<F>(&self, file_url: F) -> DetailView<'_>
    where
        F: Fn(&str) -> Option<String>,
    {
        let evidence = match self.case.kind() {
            CaseKind::Image => Evidence::Image {
                file_url: self.case.file_path.as_deref().and_then(&file_url),
                analysis: self.case.image_analysis.as_deref().unwrap_or_default(),
            },
            CaseKind::Text => Evidence::Narrative {
                graph: match self.graph.state() {
                    GraphState::Idle | GraphState::Loading => GraphView::Loading,
                    GraphState::Ready(graph) => GraphView::Ready {
                        graph,
                        layout: LayoutOptions::for_graph(graph),
                    },
                    GraphState::Failed => GraphView::Unavailable,
                },
                simulation: match &self.simulation {
                    SimulationState::Ready(text) => SimulationView::Ready(text),
                    SimulationState::Failed => SimulationView::Unavailable,
                    SimulationState::Loading | SimulationState::NotApplicable => SimulationView::Pending,
                },
            },
        };

        DetailView {
            case_id: self.case.id,
            filename: &self.case.filename,
            status: &self.case.status,
            evidence,
            transcript: self.chat.transcript().entries(),
            chat_waiting: self.chat.is_waiting(),
            suspect_image: self.case.suspect_image.as_deref().and_then(|u| resolve_image(u, &file_url)),
            suspect_generating: self.suspect.is_generating(),
        }
    }
}

/// Absolute URLs pass through; anything else is a stored file path
fn resolve_image<F>(url: &str, file_url: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:") {
        Some(url.to_string())
    } else {
        file_url(url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphView<'a> {
    Loading,
    Ready { graph: &'a Graph, layout: LayoutOptions },
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationView<'a> {
    Pending,
    Ready(&'a str),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evidence<'a> {
    Image { file_url: Option<String>, analysis: &'a str },
    Narrative { graph: GraphView<'a>, simulation: SimulationView<'a> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView<'a> {
    pub case_id: CaseId,
    pub filename: &'a str,
    pub status: &'a CaseStatus,
    pub evidence: Evidence<'a>,
    pub transcript: &'a [ChatEntry],
    pub chat_waiting: bool,
    pub suspect_image: Option<String>,
    pub suspect_generating: bool,
}
