//! End-to-end dashboard scenarios against the scripted backend

use casedesk_common::client::{BackendCall, Operation};
use casedesk_common::models::{
    Case, CaseId, CaseStatus, ChatRole, Graph, UploadFile, MISSING_DESCRIPTION,
};
use casedesk_common::MockCaseBackend;
use casedesk_dashboard::detail::SimulationState;
use casedesk_dashboard::panels::graph::GraphState;
use casedesk_dashboard::state::DETAILS_COMPLETE_ONLY;
use casedesk_dashboard::{Completions, Dashboard, Event};
use serde_json::json;
use std::sync::Arc;
use tokio_test::{assert_pending, assert_ready, task};

fn case(id: u64, status: CaseStatus, analysis: Option<&str>) -> Case {
    Case {
        id: CaseId(id),
        filename: format!("case-{}.txt", id),
        status,
        file_path: Some(format!("uploads/case-{}.txt", id)),
        image_analysis: analysis.map(str::to_string),
        suspect_image: None,
        created_at: None,
    }
}

fn backend(cases: Vec<Case>) -> Arc<MockCaseBackend> {
    Arc::new(MockCaseBackend::with_cases(cases))
}

async fn loaded(backend: &Arc<MockCaseBackend>) -> (Dashboard, Completions) {
    let (mut dashboard, mut completions) = Dashboard::new(backend.clone());
    dashboard.dispatch(Event::Refresh);
    dashboard.settle(&mut completions).await;
    (dashboard, completions)
}

fn listed_ids(dashboard: &Dashboard) -> Vec<u64> {
    dashboard.state().cases().iter().map(|c| c.id.0).collect()
}

#[tokio::test]
async fn test_listing_is_newest_first() {
    let backend = backend(vec![
        case(1, CaseStatus::Pending, None),
        case(3, CaseStatus::Complete, None),
        case(2, CaseStatus::Complete, None),
    ]);
    let (dashboard, _) = loaded(&backend).await;

    assert_eq!(listed_ids(&dashboard), vec![3, 2, 1]);
    assert!(dashboard.state().banner().is_none());
}

#[tokio::test]
async fn test_unreachable_backend_on_refresh() {
    let backend = backend(Vec::new());
    backend.set_offline(true);
    let (dashboard, _) = loaded(&backend).await;

    assert_eq!(
        dashboard.state().banner().unwrap().message,
        "Failed to fetch cases. Is the backend server running?"
    );
}

#[tokio::test]
async fn test_selecting_incomplete_case_never_enters_detail() {
    let backend = backend(vec![
        case(1, CaseStatus::Pending, None),
        case(4, CaseStatus::Processing, None),
    ]);
    let (mut dashboard, _) = loaded(&backend).await;

    for id in [1, 4] {
        dashboard.dispatch(Event::Select(CaseId(id)));
        assert!(dashboard.state().detail().is_none());
        assert_eq!(dashboard.state().banner().unwrap().message, DETAILS_COMPLETE_ONLY);
    }
    assert_eq!(backend.count(Operation::RequestSimulation), 0);
    assert_eq!(backend.count(Operation::FetchGraph), 0);
}

#[tokio::test]
async fn test_text_case_fetches_simulation_and_graph_once() {
    let backend = backend(vec![case(2, CaseStatus::Complete, None)]);
    backend.set_simulation(CaseId(2), "The courier left at midnight.");
    let (mut dashboard, mut completions) = loaded(&backend).await;

    dashboard.dispatch(Event::Select(CaseId(2)));
    dashboard.settle(&mut completions).await;

    let calls = backend.calls();
    assert_eq!(backend.count(Operation::RequestSimulation), 1);
    assert_eq!(backend.count(Operation::FetchGraph), 1);
    assert!(calls.contains(&BackendCall::RequestSimulation(CaseId(2))));
    assert!(calls.contains(&BackendCall::FetchGraph(CaseId(2))));

    let session = dashboard.state().detail().unwrap();
    assert_eq!(
        session.simulation(),
        &SimulationState::Ready("The courier left at midnight.".into())
    );
}

#[tokio::test]
async fn test_image_case_fetches_nothing() {
    let backend = backend(vec![case(3, CaseStatus::Complete, Some("Glove print on the sill."))]);
    let (mut dashboard, mut completions) = loaded(&backend).await;

    dashboard.dispatch(Event::Select(CaseId(3)));
    dashboard.settle(&mut completions).await;

    assert!(dashboard.state().detail().is_some());
    assert_eq!(backend.count(Operation::RequestSimulation), 0);
    assert_eq!(backend.count(Operation::FetchGraph), 0);
}

#[tokio::test]
async fn test_chat_flow() {
    let backend = backend(vec![case(2, CaseStatus::Complete, None)]);
    let (mut dashboard, mut completions) = loaded(&backend).await;
    dashboard.dispatch(Event::Select(CaseId(2)));
    dashboard.settle(&mut completions).await;

    dashboard.dispatch(Event::SendChat("   ".into()));
    assert_eq!(dashboard.in_flight(), 0);
    assert_eq!(backend.count(Operation::AskDetective), 0);

    backend.fail(Operation::AskDetective);
    dashboard.dispatch(Event::SendChat("Who had a key?".into()));
    {
        let transcript = dashboard.state().detail().unwrap().chat().transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].text, "Who had a key?");
    }
    dashboard.settle(&mut completions).await;
    assert_eq!(
        dashboard.state().banner().unwrap().message,
        "Failed to get a response from the detective agent."
    );
    assert_eq!(dashboard.state().detail().unwrap().chat().transcript().len(), 1);

    backend.recover(Operation::AskDetective);
    backend.push_answer("Only the landlord.");
    dashboard.dispatch(Event::SendChat("Try again: who had a key?".into()));
    dashboard.settle(&mut completions).await;

    let transcript = dashboard.state().detail().unwrap().chat().transcript();
    assert_eq!(transcript.len(), 3);
    let last = transcript.last().unwrap();
    assert_eq!(last.role, ChatRole::Agent);
    assert_eq!(last.text, "Only the landlord.");
}

#[tokio::test]
async fn test_suspect_image_flow() {
    let backend = backend(vec![case(2, CaseStatus::Complete, None)]);
    let (mut dashboard, mut completions) = loaded(&backend).await;
    dashboard.dispatch(Event::Select(CaseId(2)));
    dashboard.settle(&mut completions).await;

    dashboard.dispatch(Event::GenerateSuspect("  ".into()));
    assert_eq!(dashboard.state().banner().unwrap().message, MISSING_DESCRIPTION);
    assert_eq!(backend.count(Operation::GenerateSuspectImage), 0);

    backend.push_suspect_url("http://img.local/suspect-2a.png");
    dashboard.dispatch(Event::GenerateSuspect("tall, grey coat".into()));
    dashboard.settle(&mut completions).await;

    let session = dashboard.state().detail().unwrap();
    assert_eq!(session.case().suspect_image.as_deref(), Some("http://img.local/suspect-2a.png"));
    // The list entry is not the working copy
    assert_eq!(dashboard.state().cases().get(CaseId(2)).unwrap().suspect_image, None);

    backend.fail(Operation::GenerateSuspectImage);
    dashboard.dispatch(Event::GenerateSuspect("short, beard".into()));
    dashboard.settle(&mut completions).await;

    let session = dashboard.state().detail().unwrap();
    assert_eq!(session.case().suspect_image.as_deref(), Some("http://img.local/suspect-2a.png"));
    assert_eq!(
        dashboard.state().banner().unwrap().message,
        "Failed to generate suspect image."
    );
}

#[tokio::test]
async fn test_upload_then_refresh_moves_status_forward() {
    let backend = backend(vec![case(1, CaseStatus::Complete, None)]);
    let (mut dashboard, mut completions) = loaded(&backend).await;

    dashboard.dispatch(Event::Upload(None));
    assert_eq!(backend.count(Operation::UploadCase), 0);

    let file = UploadFile::new("witness.txt", b"I heard two shots.".to_vec());
    dashboard.dispatch(Event::Upload(Some(file)));
    assert!(dashboard.state().is_uploading());
    dashboard.settle(&mut completions).await;

    assert_eq!(backend.count(Operation::ListCases), 2);
    let uploaded = dashboard.state().cases().get(CaseId(2)).unwrap();
    assert_eq!(uploaded.filename, "witness.txt");
    assert_eq!(uploaded.status, CaseStatus::Pending);
    assert_eq!(listed_ids(&dashboard), vec![2, 1]);

    let mut seen = vec![CaseStatus::Pending];
    for _ in 0..2 {
        backend.advance(CaseId(2));
        dashboard.dispatch(Event::Refresh);
        dashboard.settle(&mut completions).await;
        seen.push(dashboard.state().cases().get(CaseId(2)).unwrap().status.clone());
    }
    assert_eq!(seen, vec![CaseStatus::Pending, CaseStatus::Processing, CaseStatus::Complete]);
    assert!(seen.windows(2).all(|w| w[0].can_advance_to(&w[1])));
}

#[tokio::test]
async fn test_completions_for_abandoned_case_are_dropped() {
    let backend = backend(vec![case(2, CaseStatus::Complete, None)]);
    let (mut dashboard, mut completions) = loaded(&backend).await;

    backend.hold();
    backend.fail(Operation::RequestSimulation);
    dashboard.dispatch(Event::Select(CaseId(2)));
    dashboard.dispatch(Event::Back);
    assert!(dashboard.state().detail().is_none());

    backend.release(2);
    dashboard.settle(&mut completions).await;
    assert!(dashboard.state().detail().is_none());
    assert!(dashboard.state().banner().is_none());

    // A fresh session is unaffected by the old one
    backend.recover(Operation::RequestSimulation);
    dashboard.dispatch(Event::Select(CaseId(2)));
    backend.release(2);
    dashboard.settle(&mut completions).await;
    let session = dashboard.state().detail().unwrap();
    assert!(matches!(session.simulation(), SimulationState::Ready(_)));
}

fn single_node_graph(label: &str) -> Graph {
    serde_json::from_value(json!({ "nodes": [{ "id": 1, "label": label }], "edges": [] })).unwrap()
}

#[tokio::test]
async fn test_late_results_from_previous_case_leave_new_case_alone() {
    let backend = backend(vec![
        case(2, CaseStatus::Complete, None),
        case(5, CaseStatus::Complete, None),
    ]);
    backend.set_simulation(CaseId(2), "Case two narrative");
    backend.set_simulation(CaseId(5), "Case five narrative");
    backend.set_graph(CaseId(2), single_node_graph("Warehouse"));
    backend.set_graph(CaseId(5), single_node_graph("Harbor"));
    let (mut dashboard, mut completions) = loaded(&backend).await;

    backend.hold();
    dashboard.dispatch(Event::Select(CaseId(2)));
    dashboard.dispatch(Event::Back);
    dashboard.dispatch(Event::Select(CaseId(5)));
    assert_eq!(dashboard.in_flight(), 4);

    backend.release(4);
    let mut arrived = Vec::new();
    for _ in 0..4 {
        arrived.push(completions.next().await.unwrap());
    }
    // Case 2 results land after case 5 has already been filled in
    arrived.reverse();
    for event in arrived {
        dashboard.apply_completion(event);
    }

    assert_eq!(dashboard.in_flight(), 0);
    assert!(dashboard.state().banner().is_none());
    let session = dashboard.state().detail().unwrap();
    assert_eq!(session.case().id, CaseId(5));
    assert_eq!(
        session.simulation(),
        &SimulationState::Ready("Case five narrative".into())
    );
    assert_eq!(
        session.graph().state(),
        &GraphState::Ready(single_node_graph("Harbor"))
    );
}

#[tokio::test]
async fn test_completions_wait_for_backend() {
    let backend = backend(vec![case(1, CaseStatus::Pending, None)]);
    let (mut dashboard, mut completions) = Dashboard::new(backend.clone());

    backend.hold();
    dashboard.dispatch(Event::Refresh);
    {
        let mut next = task::spawn(completions.next());
        assert_pending!(next.poll());

        backend.release(1);
        // The spawned command needs a turn of the runtime to finish
        while !next.is_woken() {
            tokio::task::yield_now().await;
        }
        let event = assert_ready!(next.poll());
        dashboard.apply_completion(event.unwrap());
    }
    assert_eq!(listed_ids(&dashboard), vec![1]);
    assert_eq!(dashboard.in_flight(), 0);
}
