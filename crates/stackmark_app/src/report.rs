use std::io::Write;

use stackmark_engine::{EngineEvent, ProgressSink};

/// One line per final outcome; stage and retry events only go to the log.
pub fn format_event(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::Written { url, path } => Some(format!("[ok] {url} -> {}", path.display())),
        EngineEvent::Skipped { path, .. } => Some(format!("[skip] Exists: {}", path.display())),
        EngineEvent::Failed { url, error } => Some(format!("[fail] {url}: {error}")),
        EngineEvent::Stage { .. } | EngineEvent::Retrying { .. } => None,
    }
}

/// Prints outcomes to stderr so stdout stays clean for archive listings.
#[derive(Debug, Default)]
pub struct TerminalReporter;

impl ProgressSink for TerminalReporter {
    fn emit(&self, event: EngineEvent) {
        if let Some(line) = format_event(&event) {
            let _ = writeln!(std::io::stderr(), "{line}");
        }
    }
}
