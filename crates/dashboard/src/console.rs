//! Line-oriented console host
//!
//! Reads one command per line, feeds it to the dashboard and writes the
//! re-rendered view after every event and every completion.

use casedesk_common::client::Operation;
use casedesk_common::models::{CaseId, UploadFile};
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::render::render;
use crate::runtime::{Completions, Dashboard};
use crate::state::Event;

pub const HELP: &str = "\
Commands:
  refresh               reload the case list
  upload <path>         upload a case file
  open <id>             open a complete case
  back                  return to the case list
  ask <question>        ask the detective about the open case
  suspect <description> generate a suspect composite for the open case
  dismiss               clear the message banner
  layout                print the graph layout options as JSON
  save <path>           save the open case's stored file to <path>
  show                  print the current view
  help                  print this help
  quit                  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Refresh,
    Upload(Option<PathBuf>),
    Open(CaseId),
    Back,
    Ask(String),
    Suspect(String),
    Dismiss,
    Layout,
    Save(PathBuf),
    Show,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "refresh" | "r" => ConsoleCommand::Refresh,
            "upload" | "u" => {
                ConsoleCommand::Upload((!rest.is_empty()).then(|| PathBuf::from(rest)))
            }
            "open" | "o" => {
                let id = rest
                    .parse::<CaseId>()
                    .map_err(|_| format!("Not a case id: '{}'", rest))?;
                ConsoleCommand::Open(id)
            }
            "back" | "b" => ConsoleCommand::Back,
            // Empty text is passed on; the panels decide what it means
            "ask" | "a" => ConsoleCommand::Ask(rest.to_string()),
            "suspect" | "s" => ConsoleCommand::Suspect(rest.to_string()),
            "dismiss" | "d" => ConsoleCommand::Dismiss,
            "layout" => ConsoleCommand::Layout,
            "save" => {
                if rest.is_empty() {
                    return Err("Usage: save <path>".to_string());
                }
                ConsoleCommand::Save(PathBuf::from(rest))
            }
            "show" => ConsoleCommand::Show,
            "help" | "h" | "?" => ConsoleCommand::Help,
            "quit" | "q" | "exit" => ConsoleCommand::Quit,
            other => return Err(format!("Unknown command '{}'. Type 'help'.", other)),
        };
        Ok(Some(command))
    }
}

/// Drive the dashboard from `input` until it closes, `quit` is read or
/// `shutdown` resolves. When input closes, in-flight commands are finished
/// and the final view is written before returning.
pub async fn run<R, W, S>(
    dashboard: &mut Dashboard,
    completions: &mut Completions,
    input: R,
    out: &mut W,
    shutdown: S,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    write_view(out, dashboard)?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!(in_flight = dashboard.in_flight(), "Input closed");
                    let settled = tokio::select! {
                        _ = dashboard.settle(completions) => true,
                        _ = &mut shutdown => false,
                    };
                    if settled {
                        write_view(out, dashboard)?;
                    }
                    break;
                };
                if !handle_line(dashboard, &line, out).await? {
                    break;
                }
            }
            Some(event) = completions.next() => {
                dashboard.apply_completion(event);
                write_view(out, dashboard)?;
            }
            _ = &mut shutdown => break,
        }
    }
    Ok(())
}

/// Returns false when the user asked to quit
async fn handle_line<W: Write>(dashboard: &mut Dashboard, line: &str, out: &mut W) -> io::Result<bool> {
    let command = match ConsoleCommand::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(true),
        Err(message) => {
            writeln!(out, "{}", message)?;
            return Ok(true);
        }
    };

    let event = match command {
        ConsoleCommand::Refresh => Event::Refresh,
        ConsoleCommand::Upload(None) => Event::Upload(None),
        ConsoleCommand::Upload(Some(path)) => Event::Upload(read_upload(&path).await),
        ConsoleCommand::Open(case_id) => Event::Select(case_id),
        ConsoleCommand::Back => Event::Back,
        ConsoleCommand::Ask(question) => Event::SendChat(question),
        ConsoleCommand::Suspect(description) => Event::GenerateSuspect(description),
        ConsoleCommand::Dismiss => Event::DismissBanner,
        ConsoleCommand::Layout => {
            write_layout(out, dashboard)?;
            return Ok(true);
        }
        ConsoleCommand::Save(dest) => {
            save_stored_file(dashboard, &dest, out).await?;
            return Ok(true);
        }
        ConsoleCommand::Show => {
            write_view(out, dashboard)?;
            return Ok(true);
        }
        ConsoleCommand::Help => {
            writeln!(out, "{}", HELP)?;
            return Ok(true);
        }
        ConsoleCommand::Quit => return Ok(false),
    };

    dashboard.dispatch(event);
    write_view(out, dashboard)?;
    Ok(true)
}

/// An unreadable path is treated like no file at all
async fn read_upload(path: &Path) -> Option<UploadFile> {
    let filename = path.file_name()?.to_string_lossy().into_owned();
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let mut file = UploadFile::new(filename.as_str(), bytes);
            if let Some(mime) = guess_mime(&filename) {
                file = file.with_mime(mime);
            }
            Some(file)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read upload");
            None
        }
    }
}

/// Download the open case's stored original to `dest`
async fn save_stored_file<W: Write>(dashboard: &Dashboard, dest: &Path, out: &mut W) -> io::Result<()> {
    let Some(file_path) = dashboard
        .state()
        .detail()
        .and_then(|session| session.case().file_path.clone())
    else {
        return writeln!(out, "Open a case with a stored file first.");
    };

    let bytes = match dashboard.backend().fetch_case_file(&file_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(file_path = %file_path, error = %e, "Cannot fetch stored file");
            return writeln!(out, "{}", Operation::FetchCaseFile.failure_message());
        }
    };

    match tokio::fs::write(dest, &bytes).await {
        Ok(()) => writeln!(out, "Saved {} bytes to {}", bytes.len(), dest.display()),
        Err(e) => writeln!(out, "Cannot write {}: {}", dest.display(), e),
    }
}

fn write_view<W: Write>(out: &mut W, dashboard: &Dashboard) -> io::Result<()> {
    writeln!(out, "{}", render(dashboard.state(), dashboard.backend()))?;
    out.flush()
}

fn write_layout<W: Write>(out: &mut W, dashboard: &Dashboard) -> io::Result<()> {
    let layout = dashboard
        .state()
        .detail()
        .and_then(|session| session.graph().layout());

    match layout {
        Some(options) => {
            let json = serde_json::to_string_pretty(&options).map_err(io::Error::from)?;
            writeln!(out, "{}", json)
        }
        None => writeln!(out, "No graph is loaded."),
    }
}

/// Best-effort MIME type from a file extension
pub fn guess_mime(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("  "), Ok(None));
        assert_eq!(ConsoleCommand::parse("refresh"), Ok(Some(ConsoleCommand::Refresh)));
        assert_eq!(ConsoleCommand::parse("open #12"), Ok(Some(ConsoleCommand::Open(CaseId(12)))));
        assert_eq!(
            ConsoleCommand::parse("ask   who drove the van?"),
            Ok(Some(ConsoleCommand::Ask("who drove the van?".into())))
        );
        assert_eq!(
            ConsoleCommand::parse("upload ./evidence/scene.jpg"),
            Ok(Some(ConsoleCommand::Upload(Some(PathBuf::from("./evidence/scene.jpg")))))
        );
        assert_eq!(ConsoleCommand::parse("upload"), Ok(Some(ConsoleCommand::Upload(None))));
        assert_eq!(ConsoleCommand::parse("Q"), Ok(Some(ConsoleCommand::Quit)));
        assert_eq!(
            ConsoleCommand::parse("save /tmp/scene.jpg"),
            Ok(Some(ConsoleCommand::Save(PathBuf::from("/tmp/scene.jpg"))))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConsoleCommand::parse("open abc").is_err());
        assert!(ConsoleCommand::parse("fly away").unwrap_err().contains("fly"));
        assert_eq!(ConsoleCommand::parse("save"), Err("Usage: save <path>".to_string()));
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("scene.JPG"), Some("image/jpeg"));
        assert_eq!(guess_mime("statement.txt"), Some("text/plain"));
        assert_eq!(guess_mime("archive"), None);
    }
}
