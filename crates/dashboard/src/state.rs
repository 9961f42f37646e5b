//! Case lifecycle and selection state machine
//!
//! `ViewState::update` is pure: it changes state and returns the commands
//! the runtime must execute. Every backend completion comes back as an
//! `Event`. Detail completions carry the `Generation` of the session that
//! issued them and are dropped once that session is gone.

use casedesk_common::client::Operation;
use casedesk_common::errors::{AppError, ErrorCode};
use casedesk_common::metrics::record_stale_completion;
use casedesk_common::models::{Case, CaseId, Graph, UploadFile, UploadReceipt, MISSING_FILE};
use std::fmt;
use tracing::{debug, info, warn};

use crate::detail::DetailSession;

pub const DETAILS_COMPLETE_ONLY: &str = "Details are only available for complete cases.";
pub const BACK_TO_LIST: &str = "Go back to the case list first.";
pub const OPEN_A_CASE: &str = "Open a case first.";

/// Identifies one detail session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User actions and backend completions
#[derive(Debug)]
pub enum Event {
    Refresh,
    Upload(Option<UploadFile>),
    Select(CaseId),
    Back,
    SendChat(String),
    GenerateSuspect(String),
    DismissBanner,

    CasesLoaded {
        seq: u64,
        result: Result<Vec<Case>, AppError>,
    },
    UploadFinished(Result<UploadReceipt, AppError>),
    SimulationLoaded {
        generation: Generation,
        case_id: CaseId,
        result: Result<String, AppError>,
    },
    GraphLoaded {
        generation: Generation,
        case_id: CaseId,
        result: Result<Graph, AppError>,
    },
    ChatAnswered {
        generation: Generation,
        case_id: CaseId,
        result: Result<String, AppError>,
    },
    SuspectGenerated {
        generation: Generation,
        case_id: CaseId,
        result: Result<String, AppError>,
    },
}

/// Effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    RefreshCases {
        seq: u64,
    },
    UploadCase(UploadFile),
    RequestSimulation {
        generation: Generation,
        case_id: CaseId,
    },
    FetchGraph {
        generation: Generation,
        case_id: CaseId,
    },
    AskDetective {
        generation: Generation,
        case_id: CaseId,
        question: String,
    },
    GenerateSuspectImage {
        generation: Generation,
        case_id: CaseId,
        description: String,
    },
}

impl Command {
    pub fn operation(&self) -> Operation {
        match self {
            Command::RefreshCases { .. } => Operation::ListCases,
            Command::UploadCase(_) => Operation::UploadCase,
            Command::RequestSimulation { .. } => Operation::RequestSimulation,
            Command::FetchGraph { .. } => Operation::FetchGraph,
            Command::AskDetective { .. } => Operation::AskDetective,
            Command::GenerateSuspectImage { .. } => Operation::GenerateSuspectImage,
        }
    }
}

/// The single user-visible message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub code: ErrorCode,
}

impl Banner {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: ErrorCode::ValidationError,
        }
    }

    /// Validation errors keep their own text; anything else shows the
    /// operation's failure string
    pub fn from_error(operation: Operation, err: &AppError) -> Self {
        let message = if err.is_validation() {
            err.to_string()
        } else {
            operation.failure_message().to_string()
        };
        Self {
            message,
            code: err.code(),
        }
    }
}

/// Known cases, newest first
#[derive(Debug, Clone, Default)]
pub struct CaseList {
    cases: Vec<Case>,
}

impl CaseList {
    /// Replace the whole collection with a fresh listing
    pub fn replace(&mut self, mut cases: Vec<Case>) {
        for case in &cases {
            if let Some(previous) = self.get(case.id) {
                if !previous.status.can_advance_to(&case.status) {
                    warn!(
                        case_id = %case.id,
                        from = %previous.status,
                        to = %case.status,
                        "Case status moved backwards"
                    );
                }
            }
        }
        cases.sort_by(|a, b| b.id.cmp(&a.id));
        self.cases = cases;
    }

    pub fn get(&self, id: CaseId) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Case> {
        self.cases.iter()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Screen {
    Listing,
    Detail(Box<DetailSession>),
}

#[derive(Debug, Clone)]
pub struct ViewState {
    cases: CaseList,
    screen: Screen,
    banner: Option<Banner>,
    generation: Generation,
    refresh_seq: u64,
    refreshing: bool,
    uploads_in_flight: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            cases: CaseList::default(),
            screen: Screen::Listing,
            banner: None,
            generation: Generation::default(),
            refresh_seq: 0,
            refreshing: false,
            uploads_in_flight: 0,
        }
    }

    pub fn cases(&self) -> &CaseList {
        &self.cases
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn detail(&self) -> Option<&DetailSession> {
        match &self.screen {
            Screen::Detail(session) => Some(&**session),
            Screen::Listing => None,
        }
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads_in_flight > 0
    }

    /// Apply one event and return the commands it requests
    pub fn update(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Refresh => {
                if self.detail().is_some() {
                    self.banner = Some(Banner::validation(BACK_TO_LIST));
                    return Vec::new();
                }
                self.banner = None;
                vec![self.issue_refresh()]
            }

            Event::Upload(file) => self.upload(file),

            Event::Select(case_id) => self.select(case_id),

            Event::Back => {
                if self.detail().is_none() {
                    return Vec::new();
                }
                self.generation = self.generation.next();
                self.screen = Screen::Listing;
                self.banner = None;
                debug!(generation = %self.generation, "Left case detail");
                Vec::new()
            }

            Event::SendChat(text) => {
                let Screen::Detail(session) = &mut self.screen else {
                    self.banner = Some(Banner::validation(OPEN_A_CASE));
                    return Vec::new();
                };
                match session.send_chat(&text) {
                    Some(command) => {
                        self.banner = None;
                        vec![command]
                    }
                    None => Vec::new(),
                }
            }

            Event::GenerateSuspect(description) => {
                let Screen::Detail(session) = &mut self.screen else {
                    self.banner = Some(Banner::validation(OPEN_A_CASE));
                    return Vec::new();
                };
                match session.generate_suspect(&description) {
                    Ok(command) => {
                        self.banner = None;
                        vec![command]
                    }
                    Err(err) => {
                        self.show_error(Operation::GenerateSuspectImage, &err);
                        Vec::new()
                    }
                }
            }

            Event::DismissBanner => {
                self.banner = None;
                Vec::new()
            }

            Event::CasesLoaded { seq, result } => {
                if seq != self.refresh_seq {
                    debug!(seq, latest = self.refresh_seq, "Dropping superseded case listing");
                    return Vec::new();
                }
                self.refreshing = false;
                match result {
                    Ok(cases) => {
                        info!(count = cases.len(), "Case list refreshed");
                        self.cases.replace(cases);
                    }
                    Err(err) => self.show_error(Operation::ListCases, &err),
                }
                Vec::new()
            }

            Event::UploadFinished(result) => {
                self.uploads_in_flight = self.uploads_in_flight.saturating_sub(1);
                match result {
                    Ok(receipt) => {
                        info!(
                            case_id = ?receipt.case_id,
                            message = receipt.message.as_deref().unwrap_or(""),
                            "Upload accepted"
                        );
                        vec![self.issue_refresh()]
                    }
                    Err(err) => {
                        self.show_error(Operation::UploadCase, &err);
                        Vec::new()
                    }
                }
            }

            Event::SimulationLoaded { generation, case_id, result } => {
                let outcome = match self.session_for(generation, Operation::RequestSimulation) {
                    Some(session) => session.simulation_loaded(case_id, result),
                    None => return Vec::new(),
                };
                self.report(Operation::RequestSimulation, outcome);
                Vec::new()
            }

            Event::GraphLoaded { generation, case_id, result } => {
                let outcome = match self.session_for(generation, Operation::FetchGraph) {
                    Some(session) => session.graph_loaded(case_id, result),
                    None => return Vec::new(),
                };
                self.report(Operation::FetchGraph, outcome);
                Vec::new()
            }

            Event::ChatAnswered { generation, case_id, result } => {
                let outcome = match self.session_for(generation, Operation::AskDetective) {
                    Some(session) => session.chat_answered(case_id, result),
                    None => return Vec::new(),
                };
                self.report(Operation::AskDetective, outcome);
                Vec::new()
            }

            Event::SuspectGenerated { generation, case_id, result } => {
                let outcome = match self.session_for(generation, Operation::GenerateSuspectImage) {
                    Some(session) => session.suspect_generated(case_id, result),
                    None => return Vec::new(),
                };
                self.report(Operation::GenerateSuspectImage, outcome);
                Vec::new()
            }
        }
    }

    fn upload(&mut self, file: Option<UploadFile>) -> Vec<Command> {
        if self.detail().is_some() {
            self.banner = Some(Banner::validation(BACK_TO_LIST));
            return Vec::new();
        }
        let Some(file) = file else {
            self.banner = Some(Banner::validation(MISSING_FILE));
            return Vec::new();
        };
        if let Err(err) = file.validate() {
            self.show_error(Operation::UploadCase, &err);
            return Vec::new();
        }

        self.uploads_in_flight += 1;
        self.banner = None;
        vec![Command::UploadCase(file)]
    }

    fn select(&mut self, case_id: CaseId) -> Vec<Command> {
        if self.detail().is_some() {
            self.banner = Some(Banner::validation(BACK_TO_LIST));
            return Vec::new();
        }
        let Some(case) = self.cases.get(case_id) else {
            self.banner = Some(Banner::validation(format!("Case #{} is not in the list.", case_id)));
            return Vec::new();
        };
        if !case.is_complete() {
            self.banner = Some(Banner::validation(DETAILS_COMPLETE_ONLY));
            return Vec::new();
        }

        let case = case.clone();
        self.generation = self.generation.next();
        let (session, commands) = DetailSession::open(case, self.generation);
        info!(case_id = %case_id, generation = %self.generation, "Opened case detail");

        self.screen = Screen::Detail(Box::new(session));
        self.banner = None;
        commands
    }

    fn issue_refresh(&mut self) -> Command {
        self.refresh_seq += 1;
        self.refreshing = true;
        Command::RefreshCases { seq: self.refresh_seq }
    }

    /// The live session a completion belongs to, if it is still open
    fn session_for(&mut self, generation: Generation, operation: Operation) -> Option<&mut DetailSession> {
        match &mut self.screen {
            Screen::Detail(session) if session.generation() == generation => Some(&mut **session),
            _ => {
                debug!(
                    operation = %operation,
                    generation = %generation,
                    current = %self.generation,
                    "Dropping stale completion"
                );
                record_stale_completion(operation.as_str());
                None
            }
        }
    }

    fn report(&mut self, operation: Operation, outcome: Result<(), AppError>) {
        if let Err(err) = outcome {
            self.show_error(operation, &err);
        }
    }

    fn show_error(&mut self, operation: Operation, err: &AppError) {
        if !err.is_validation() {
            warn!(operation = %operation, error = %err, "Backend operation failed");
        }
        self.banner = Some(Banner::from_error(operation, err));
    }
}
