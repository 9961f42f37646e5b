//! Event loop plumbing
//!
//! Commands run as spawned tokio tasks against the shared backend. Each
//! completion is sent back over an unbounded channel and applied on the
//! owning loop, in arrival order.

use casedesk_common::CaseBackend;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::state::{Command, Event, ViewState};

/// Receiving end for completions of spawned commands
pub struct Completions {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Completions {
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

pub struct Dashboard {
    state: ViewState,
    backend: Arc<dyn CaseBackend>,
    tx: mpsc::UnboundedSender<Event>,
    in_flight: usize,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn CaseBackend>) -> (Self, Completions) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dashboard = Self {
            state: ViewState::new(),
            backend,
            tx,
            in_flight: 0,
        };
        (dashboard, Completions { rx })
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn backend(&self) -> &dyn CaseBackend {
        self.backend.as_ref()
    }

    /// Commands spawned but not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply a user event and start whatever it requests
    pub fn dispatch(&mut self, event: Event) {
        for command in self.state.update(event) {
            self.spawn(command);
        }
    }

    /// Apply an event received from `Completions`
    pub fn apply_completion(&mut self, event: Event) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.dispatch(event);
    }

    /// Apply completions until nothing is in flight
    pub async fn settle(&mut self, completions: &mut Completions) {
        while self.in_flight > 0 {
            match completions.next().await {
                Some(event) => self.apply_completion(event),
                None => break,
            }
        }
    }

    fn spawn(&mut self, command: Command) {
        debug!(operation = %command.operation(), "Starting command");
        self.in_flight += 1;

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = execute(backend.as_ref(), command).await;
            // The receiver is gone only during shutdown
            let _ = tx.send(event);
        });
    }
}

/// Run one command against the backend and wrap the outcome as an event
pub async fn execute(backend: &dyn CaseBackend, command: Command) -> Event {
    match command {
        Command::RefreshCases { seq } => Event::CasesLoaded {
            seq,
            result: backend.list_cases().await,
        },
        Command::UploadCase(file) => Event::UploadFinished(backend.upload_case(file).await),
        Command::RequestSimulation { generation, case_id } => Event::SimulationLoaded {
            generation,
            case_id,
            result: backend.request_simulation(case_id).await,
        },
        Command::FetchGraph { generation, case_id } => Event::GraphLoaded {
            generation,
            case_id,
            result: backend.fetch_graph(case_id).await,
        },
        Command::AskDetective { generation, case_id, question } => Event::ChatAnswered {
            generation,
            case_id,
            result: backend.ask_detective(case_id, &question).await,
        },
        Command::GenerateSuspectImage { generation, case_id, description } => Event::SuspectGenerated {
            generation,
            case_id,
            result: backend.generate_suspect_image(case_id, &description).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casedesk_common::models::CaseId;
    use casedesk_common::MockCaseBackend;
    use crate::state::Generation;

    #[tokio::test]
    async fn test_execute_wraps_result() {
        let backend = MockCaseBackend::new();
        backend.set_simulation(CaseId(7), "Seen at the docks.");

        let event = execute(
            &backend,
            Command::RequestSimulation { generation: Generation(4), case_id: CaseId(7) },
        )
        .await;

        match event {
            Event::SimulationLoaded { generation, case_id, result } => {
                assert_eq!(generation, Generation(4));
                assert_eq!(case_id, CaseId(7));
                assert_eq!(result.unwrap(), "Seen at the docks.");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_settle_drains_in_flight() {
        let backend = Arc::new(MockCaseBackend::new());
        let (mut dashboard, mut completions) = Dashboard::new(backend.clone());

        dashboard.dispatch(Event::Refresh);
        assert_eq!(dashboard.in_flight(), 1);
        dashboard.settle(&mut completions).await;
        assert_eq!(dashboard.in_flight(), 0);
        assert!(!dashboard.state().is_refreshing());
    }
}
