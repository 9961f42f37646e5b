//! Plain-text rendering of the current view

use casedesk_common::models::{Case, ChatRole, Graph};
use casedesk_common::CaseBackend;
use std::fmt::{self, Write};

use crate::detail::{DetailView, Evidence, GraphView, SimulationView};
use crate::state::ViewState;

pub fn render(state: &ViewState, backend: &dyn CaseBackend) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_view(&mut out, state, backend);
    out
}

fn write_view(out: &mut String, state: &ViewState, backend: &dyn CaseBackend) -> fmt::Result {
    if let Some(banner) = state.banner() {
        writeln!(out, "[!] {}", banner.message)?;
    }

    match state.detail() {
        Some(session) => write_detail(out, &session.view(|path| backend.file_url(path))),
        None => write_listing(out, state),
    }
}

fn write_listing(out: &mut String, state: &ViewState) -> fmt::Result {
    write!(out, "== Cases ({}) ==", state.cases().len())?;
    if state.is_refreshing() {
        write!(out, " refreshing...")?;
    }
    if state.is_uploading() {
        write!(out, " uploading...")?;
    }
    writeln!(out)?;

    if state.cases().is_empty() {
        return writeln!(out, "  No cases yet. Upload a file to start.");
    }
    for case in state.cases().iter() {
        write_case_row(out, case)?;
    }
    Ok(())
}

fn write_case_row(out: &mut String, case: &Case) -> fmt::Result {
    let created = case
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let marker = if case.is_complete() { ">" } else { " " };
    writeln!(
        out,
        "{} #{:<5} {:<32} {:<11} {}",
        marker,
        case.id.0,
        case.filename,
        case.status.as_str(),
        created
    )
}

fn write_detail(out: &mut String, view: &DetailView<'_>) -> fmt::Result {
    writeln!(out, "== Case #{}: {} [{}] ==", view.case_id, view.filename, view.status)?;

    match &view.evidence {
        Evidence::Image { file_url, analysis } => {
            writeln!(out, "-- Evidence image --")?;
            writeln!(out, "  {}", file_url.as_deref().unwrap_or("(no stored file)"))?;
            writeln!(out, "-- Image analysis --")?;
            writeln!(out, "  {}", analysis)?;
        }
        Evidence::Narrative { graph, simulation } => {
            writeln!(out, "-- Knowledge graph --")?;
            match graph {
                GraphView::Loading => writeln!(out, "  Loading graph...")?,
                GraphView::Unavailable => writeln!(out, "  Graph unavailable.")?,
                GraphView::Ready { graph, .. } => write_graph(out, graph)?,
            }
            writeln!(out, "-- Crime simulation --")?;
            match simulation {
                SimulationView::Pending => writeln!(out, "  Generating simulation...")?,
                SimulationView::Unavailable => writeln!(out, "  Simulation unavailable.")?,
                SimulationView::Ready(text) => writeln!(out, "  {}", text)?,
            }
        }
    }

    writeln!(out, "-- Detective --")?;
    for entry in view.transcript {
        let who = match entry.role {
            ChatRole::User => "you",
            ChatRole::Agent => "detective",
        };
        writeln!(out, "  {}: {}", who, entry.text)?;
    }
    if view.chat_waiting {
        writeln!(out, "  detective is thinking...")?;
    }

    writeln!(out, "-- Suspect --")?;
    if view.suspect_generating {
        writeln!(out, "  Generating suspect image...")?;
    }
    match &view.suspect_image {
        Some(url) => writeln!(out, "  {}", url),
        None => writeln!(out, "  No suspect image yet."),
    }
}

fn write_graph(out: &mut String, graph: &Graph) -> fmt::Result {
    if graph.is_empty() {
        return writeln!(out, "  (empty graph)");
    }
    writeln!(out, "  {} nodes, {} edges", graph.node_count(), graph.edge_count())?;
    for edge in &graph.edges {
        writeln!(
            out,
            "  {} -[{}]-> {}",
            graph.node_label(&edge.from),
            edge.label.as_deref().unwrap_or(""),
            graph.node_label(&edge.to)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Command, Event};
    use casedesk_common::models::{CaseId, CaseStatus};
    use casedesk_common::MockCaseBackend;

    fn case(id: u64, status: CaseStatus, analysis: Option<&str>) -> Case {
        Case {
            id: CaseId(id),
            filename: format!("evidence{}.jpg", id),
            status,
            file_path: Some(format!("uploads/evidence{}.jpg", id)),
            image_analysis: analysis.map(str::to_string),
            suspect_image: None,
            created_at: None,
        }
    }

    fn with_cases(cases: Vec<Case>) -> ViewState {
        let mut state = ViewState::new();
        let commands = state.update(Event::Refresh);
        let Command::RefreshCases { seq } = commands[0].clone() else {
            panic!("expected refresh");
        };
        state.update(Event::CasesLoaded { seq, result: Ok(cases) });
        state
    }

    #[test]
    fn test_listing_rows() {
        let backend = MockCaseBackend::new();
        let state = with_cases(vec![case(1, CaseStatus::Pending, None), case(2, CaseStatus::Complete, None)]);
        let text = render(&state, &backend);

        assert!(text.starts_with("== Cases (2) =="));
        let two = text.find("#2").unwrap();
        let one = text.find("#1").unwrap();
        assert!(two < one);
        assert!(text.contains("pending"));
    }

    #[test]
    fn test_empty_listing() {
        let backend = MockCaseBackend::new();
        let text = render(&ViewState::new(), &backend);
        assert!(text.contains("No cases yet"));
    }

    #[test]
    fn test_image_detail() {
        let backend = MockCaseBackend::new();
        let mut state = with_cases(vec![case(3, CaseStatus::Complete, Some("A red scarf on the bench."))]);
        state.update(Event::Select(CaseId(3)));

        let text = render(&state, &backend);
        assert!(text.contains("== Case #3: evidence3.jpg [complete] =="));
        assert!(text.contains("http://mock.local/uploads/evidence3.jpg"));
        assert!(text.contains("A red scarf on the bench."));
        assert!(text.contains("No suspect image yet."));
    }

    #[test]
    fn test_banner_shown_first() {
        let backend = MockCaseBackend::new();
        let mut state = ViewState::new();
        state.update(Event::Upload(None));
        assert!(render(&state, &backend).starts_with("[!] Please select a file first."));
    }
}
