// ABOUTME: Ordered step log for session setup and command execution.
// ABOUTME: Each entry carries a human-readable message and an OK/NG marker.

use serde::Serialize;
use std::fmt;

/// Outcome marker for a single transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Ok,
    Failed,
}

/// One step in the session's operation trail.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub message: String,
    pub status: StepStatus,
}

impl Entry {
    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Ok
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.status {
            StepStatus::Ok => "[ OK ]",
            StepStatus::Failed => "[ NG ]",
        };
        write!(f, "{}\t{}", self.message, marker)
    }
}

/// Append-only log of setup and execution steps, in chronological order.
///
/// Returned from [`Session::connect`](super::Session::connect) so callers can
/// show the step trail even when the connection attempt fails partway.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&mut self, message: impl Into<String>) {
        self.entries.push(Entry {
            message: message.into(),
            status: StepStatus::Ok,
        });
    }

    pub fn push_failed(&mut self, message: impl Into<String>) {
        self.entries.push(Entry {
            message: message.into(),
            status: StepStatus::Failed,
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_append_order() {
        let mut transcript = Transcript::new();
        transcript.push_ok("first");
        transcript.push_failed("second");
        transcript.push_ok("third");

        let messages: Vec<_> = transcript.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
    }

    #[test]
    fn display_renders_ok_and_ng_markers() {
        let mut transcript = Transcript::new();
        transcript.push_ok("Loading SSH private key");
        transcript.push_failed("Connecting to example:22");

        let rendered = transcript.to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[ OK ]"));
        assert!(lines[1].ends_with("[ NG ]"));
    }

    #[test]
    fn empty_transcript_renders_nothing() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.to_string(), "");
    }
}
