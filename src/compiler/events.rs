//! Change tracking for the optimization passes.
//!
//! Every rewrite a pass makes is recorded as an [`Event`] in an [`EventLog`],
//! which is handed back to the caller with the translation. Hosts and tests
//! can inspect what happened without parsing log output.
//!
//! ```rust
//! use filterc::compiler::{EventKind, EventLog};
//!
//! let mut log = EventLog::new();
//! log.record(EventKind::CopyPropagated)
//!     .pass("copy-propagation")
//!     .message("v3 -> v1 (2 uses)");
//! log.info("optimization finished");
//!
//! assert_eq!(log.count_kind(EventKind::CopyPropagated), 1);
//! assert_eq!(log.summary(), "1 copy propagated");
//! ```

use std::{collections::HashMap, fmt};

use crate::ir::StmtId;

/// Categories of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A copy was propagated into its uses.
    CopyPropagated,
    /// A dead assignment or phi was removed.
    StatementRemoved,
    /// A color rebuilt from its own channels was replaced by the original color.
    ColorFused,
    /// A pass finished a run.
    PassCompleted,

    /// Informational message.
    Info,
    /// Something unexpected but harmless.
    Warning,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::CopyPropagated => "copy propagated",
            Self::StatementRemoved => "statement removed",
            Self::ColorFused => "color fused",
            Self::PassCompleted => "pass completed",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }

    /// Returns true if this event represents a change to the program.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::CopyPropagated | Self::StatementRemoved | Self::ColorFused
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// The statement the event concerns, if any.
    pub stmt: Option<StmtId>,
    /// Human-readable description.
    pub message: String,
    /// Name of the pass that recorded the event.
    pub pass: Option<&'static str>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            stmt: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind)?;
        if let Some(stmt) = self.stmt {
            write!(f, "{stmt}: ")?;
        }
        f.write_str(&self.message)
    }
}

/// Builder for events, created by [`EventLog::record`].
///
/// The event is added to the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a mut EventLog,
    kind: EventKind,
    stmt: Option<StmtId>,
    message: Option<String>,
    pass: Option<&'static str>,
}

impl EventBuilder<'_> {
    /// Sets the statement the event concerns.
    pub fn at(mut self, stmt: StmtId) -> Self {
        self.stmt = Some(stmt);
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates the event with a pass.
    pub fn pass(mut self, pass_name: &'static str) -> Self {
        self.pass = Some(pass_name);
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.events.push(Event {
            kind: self.kind,
            stmt: self.stmt.take(),
            message,
            pass: self.pass.take(),
        });
    }
}

/// Events of one compilation, in the order they were recorded.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Starts building a new event of the given kind.
    pub fn record(&mut self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            kind,
            stmt: None,
            message: None,
            pass: None,
        }
    }

    /// Records an informational message.
    pub fn info(&mut self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Appends the events of another log.
    pub fn merge(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// Returns the number of transformation events.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.kind.is_transformation())
            .count()
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for event in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Generates a human-readable summary of the transformations.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let mut parts: Vec<String> = self
            .count_by_kind()
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl Extend<Event> for EventLog {
    fn extend<T: IntoIterator<Item = Event>>(&mut self, iter: T) {
        self.events.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_records_on_drop() {
        let mut log = EventLog::new();
        log.record(EventKind::StatementRemoved)
            .at(StmtId::new(4))
            .pass("dead-code-elimination");
        log.record(EventKind::CopyPropagated).message("v1 -> 3");

        assert_eq!(log.len(), 2);
        let removed = log.filter_kind(EventKind::StatementRemoved).next().unwrap();
        assert_eq!(removed.message, "statement removed");
        assert_eq!(removed.to_string(), "[statement removed] s4: statement removed");
        assert_eq!(removed.pass, Some("dead-code-elimination"));
    }

    #[test]
    fn test_summary_counts_transformations_only() {
        let mut log = EventLog::new();
        assert_eq!(log.summary(), "no events");

        log.info("starting");
        assert_eq!(log.summary(), "1 events");

        log.record(EventKind::StatementRemoved);
        log.record(EventKind::StatementRemoved);
        log.record(EventKind::ColorFused);
        assert_eq!(log.summary(), "1 color fused, 2 statement removed");
        assert_eq!(log.transformation_count(), 3);
    }
}
