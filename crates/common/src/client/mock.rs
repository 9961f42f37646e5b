//! Scripted in-memory backend for tests and offline runs

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Semaphore;

use super::{CaseBackend, Operation};
use crate::errors::{AppError, Result};
use crate::models::{
    AskRequest, Case, CaseId, CaseStatus, Graph, SuspectImageRequest, UploadFile, UploadReceipt,
};

/// A request as the mock backend received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListCases,
    UploadCase { filename: String },
    RequestSimulation(CaseId),
    FetchGraph(CaseId),
    AskDetective { case_id: CaseId, question: String },
    GenerateSuspectImage { case_id: CaseId, description: String },
    FetchCaseFile(String),
}

impl BackendCall {
    pub fn operation(&self) -> Operation {
        match self {
            BackendCall::ListCases => Operation::ListCases,
            BackendCall::UploadCase { .. } => Operation::UploadCase,
            BackendCall::RequestSimulation(_) => Operation::RequestSimulation,
            BackendCall::FetchGraph(_) => Operation::FetchGraph,
            BackendCall::AskDetective { .. } => Operation::AskDetective,
            BackendCall::GenerateSuspectImage { .. } => Operation::GenerateSuspectImage,
            BackendCall::FetchCaseFile(_) => Operation::FetchCaseFile,
        }
    }
}

#[derive(Default)]
struct MockState {
    cases: Vec<Case>,
    simulations: HashMap<CaseId, String>,
    graphs: HashMap<CaseId, Graph>,
    answers: VecDeque<String>,
    suspect_urls: VecDeque<String>,
    files: HashMap<String, Vec<u8>>,
    failing: HashSet<Operation>,
    offline: bool,
    calls: Vec<BackendCall>,
}

/// Mock backend with scripted responses and a call log
///
/// `hold` makes every later call wait until `release` hands out a permit,
/// so tests can interleave user events with in-flight requests.
pub struct MockCaseBackend {
    state: Mutex<MockState>,
    gate: Semaphore,
    gated: AtomicBool,
}

impl Default for MockCaseBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaseBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            gate: Semaphore::new(0),
            gated: AtomicBool::new(false),
        }
    }

    pub fn with_cases(cases: Vec<Case>) -> Self {
        let backend = Self::new();
        backend.set_cases(cases);
        backend
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_cases(&self, cases: Vec<Case>) {
        self.state().cases = cases;
    }

    pub fn set_simulation(&self, case_id: CaseId, text: impl Into<String>) {
        self.state().simulations.insert(case_id, text.into());
    }

    pub fn set_graph(&self, case_id: CaseId, graph: Graph) {
        self.state().graphs.insert(case_id, graph);
    }

    pub fn push_answer(&self, answer: impl Into<String>) {
        self.state().answers.push_back(answer.into());
    }

    pub fn push_suspect_url(&self, url: impl Into<String>) {
        self.state().suspect_urls.push_back(url.into());
    }

    pub fn set_file(&self, file_path: impl Into<String>, bytes: Vec<u8>) {
        self.state().files.insert(file_path.into(), bytes);
    }

    /// Make an operation answer with a 500 until `recover`
    pub fn fail(&self, operation: Operation) {
        self.state().failing.insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.state().failing.remove(&operation);
    }

    /// Make every operation fail as if the backend were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Move a case one step along pending -> processing -> complete
    pub fn advance(&self, case_id: CaseId) {
        let mut state = self.state();
        if let Some(case) = state.cases.iter_mut().find(|c| c.id == case_id) {
            case.status = match case.status {
                CaseStatus::Pending | CaseStatus::Unknown(_) => CaseStatus::Processing,
                CaseStatus::Processing | CaseStatus::Complete => CaseStatus::Complete,
            };
        }
    }

    /// Hold all later calls until permits are released
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let `n` held calls complete
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls for an operation
    pub fn count(&self, operation: Operation) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Record the call, wait at the gate, then apply failure scripting
    async fn enter(&self, call: BackendCall) -> Result<()> {
        let operation = call.operation();
        self.state().calls.push(call);

        if self.gated.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        let state = self.state();
        if state.offline {
            return Err(AppError::Network {
                message: "connection refused".to_string(),
            });
        }
        if state.failing.contains(&operation) {
            return Err(AppError::Backend {
                status: 500,
                message: format!("scripted failure for {}", operation),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CaseBackend for MockCaseBackend {
    async fn list_cases(&self) -> Result<Vec<Case>> {
        self.enter(BackendCall::ListCases).await?;
        Ok(self.state().cases.clone())
    }

    async fn upload_case(&self, file: UploadFile) -> Result<UploadReceipt> {
        file.validate()?;
        self.enter(BackendCall::UploadCase { filename: file.filename.clone() }).await?;

        let mut state = self.state();
        let next = state.cases.iter().map(|c| c.id.0).max().unwrap_or(0) + 1;
        let case_id = CaseId(next);
        state.cases.push(Case {
            id: case_id,
            filename: file.filename.clone(),
            status: CaseStatus::Pending,
            file_path: Some(format!("uploads/{}", file.filename)),
            image_analysis: None,
            suspect_image: None,
            created_at: None,
        });
        state.files.insert(format!("uploads/{}", file.filename), file.bytes);

        Ok(UploadReceipt {
            message: Some("File uploaded and is being processed in the background.".to_string()),
            case_id: Some(case_id),
        })
    }

    async fn request_simulation(&self, case_id: CaseId) -> Result<String> {
        self.enter(BackendCall::RequestSimulation(case_id)).await?;
        Ok(self
            .state()
            .simulations
            .get(&case_id)
            .cloned()
            .unwrap_or_else(|| format!("Simulated narrative for case {}.", case_id)))
    }

    async fn fetch_graph(&self, case_id: CaseId) -> Result<Graph> {
        self.enter(BackendCall::FetchGraph(case_id)).await?;
        Ok(self.state().graphs.get(&case_id).cloned().unwrap_or_default())
    }

    async fn ask_detective(&self, case_id: CaseId, question: &str) -> Result<String> {
        let request = AskRequest::new(question)?;
        self.enter(BackendCall::AskDetective {
            case_id,
            question: request.question,
        })
        .await?;
        Ok(self
            .state()
            .answers
            .pop_front()
            .unwrap_or_else(|| format!("No further leads on case {}.", case_id)))
    }

    async fn generate_suspect_image(&self, case_id: CaseId, description: &str) -> Result<String> {
        let request = SuspectImageRequest::new(description)?;
        self.enter(BackendCall::GenerateSuspectImage {
            case_id,
            description: request.description,
        })
        .await?;
        Ok(self
            .state()
            .suspect_urls
            .pop_front()
            .unwrap_or_else(|| format!("http://mock.local/suspects/{}.png", case_id)))
    }

    async fn fetch_case_file(&self, file_path: &str) -> Result<Vec<u8>> {
        self.enter(BackendCall::FetchCaseFile(file_path.to_string())).await?;
        self.state()
            .files
            .get(file_path.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| AppError::Backend {
                status: 404,
                message: format!("no stored file at {}", file_path),
            })
    }

    fn file_url(&self, file_path: &str) -> Option<String> {
        if file_path.trim().is_empty() {
            return None;
        }
        Some(format!("http://mock.local/{}", file_path.trim_start_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upload_then_advance() {
        let backend = MockCaseBackend::new();
        let receipt = backend
            .upload_case(UploadFile::new("statement.txt", b"I saw him".to_vec()))
            .await
            .unwrap();
        let case_id = receipt.case_id.unwrap();

        let cases = backend.list_cases().await.unwrap();
        assert_eq!(cases[0].status, CaseStatus::Pending);

        backend.advance(case_id);
        backend.advance(case_id);
        backend.advance(case_id);
        let cases = backend.list_cases().await.unwrap();
        assert_eq!(cases[0].status, CaseStatus::Complete);
        assert_eq!(backend.count(Operation::ListCases), 2);
    }

    #[tokio::test]
    async fn test_validation_is_not_recorded() {
        let backend = MockCaseBackend::new();
        assert!(backend.generate_suspect_image(CaseId(1), "").await.is_err());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let backend = MockCaseBackend::new();
        backend.fail(Operation::FetchGraph);
        let err = backend.fetch_graph(CaseId(2)).await.unwrap_err();
        assert!(matches!(err, AppError::Backend { status: 500, .. }));
        backend.recover(Operation::FetchGraph);
        assert!(backend.fetch_graph(CaseId(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hold_and_release() {
        let backend = Arc::new(MockCaseBackend::new());
        backend.hold();

        let task = tokio::spawn({
            let backend = backend.clone();
            async move { backend.request_simulation(CaseId(5)).await }
        });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        backend.release(1);
        let text = task.await.unwrap().unwrap();
        assert_eq!(text, "Simulated narrative for case 5.");
    }
}
