//! Run log sinks.
//!
//! Each run is handed a [`LogSink`]; nothing is stored globally. Every event
//! is also mirrored to `tracing` so headless runs keep a trace.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{error, info};

use contentforge_shared::{LogEvent, Severity};

use crate::pipeline::RunState;

/// Receives the events of one run.
pub trait LogSink: Send + Sync {
    /// Called for every event, in emission order.
    fn emit(&self, event: LogEvent);

    /// Called on every pipeline state transition.
    fn state_changed(&self, _state: RunState) {}
}

/// No-op sink for headless/test usage.
pub struct SilentLog;

impl LogSink for SilentLog {
    fn emit(&self, _event: LogEvent) {}
}

// ---------------------------------------------------------------------------
// MemoryLog
// ---------------------------------------------------------------------------

/// Append-only in-memory log, cleared by its owner between runs.
#[derive(Default)]
pub struct MemoryLog {
    events: Mutex<Vec<LogEvent>>,
    states: Mutex<Vec<RunState>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events so far.
    pub fn events(&self) -> Vec<LogEvent> {
        lock(&self.events).clone()
    }

    /// Snapshot of the state transitions so far.
    pub fn states(&self) -> Vec<RunState> {
        lock(&self.states).clone()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
        lock(&self.states).clear();
    }
}

impl LogSink for MemoryLog {
    fn emit(&self, event: LogEvent) {
        lock(&self.events).push(event);
    }

    fn state_changed(&self, state: RunState) {
        lock(&self.states).push(state);
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

/// Emitting front end over a sink: builds the event and mirrors it to `tracing`.
#[derive(Clone, Copy)]
pub(crate) struct RunLog<'a> {
    sink: &'a dyn LogSink,
}

impl<'a> RunLog<'a> {
    pub(crate) fn new(sink: &'a dyn LogSink) -> Self {
        Self { sink }
    }

    pub(crate) fn info(&self, message: impl Into<String>, details: Option<Value>) {
        self.emit(Severity::Info, message.into(), details);
    }

    pub(crate) fn success(&self, message: impl Into<String>, details: Option<Value>) {
        self.emit(Severity::Success, message.into(), details);
    }

    pub(crate) fn error(&self, message: impl Into<String>, details: Option<Value>) {
        self.emit(Severity::Error, message.into(), details);
    }

    pub(crate) fn state(&self, state: RunState) {
        self.sink.state_changed(state);
    }

    fn emit(&self, severity: Severity, message: String, details: Option<Value>) {
        let details_str = details.as_ref().map(Value::to_string).unwrap_or_default();
        match severity {
            Severity::Error => error!(details = %details_str, "{message}"),
            Severity::Info | Severity::Success => {
                info!(severity = severity.as_str(), details = %details_str, "{message}")
            }
        }
        self.sink.emit(LogEvent::new(severity, message, details));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_records_and_clears() {
        let log = MemoryLog::new();
        let run = RunLog::new(&log);
        run.info("one", None);
        run.success("two", Some(serde_json::json!({ "n": 2 })));
        run.state(RunState::FetchingSource);

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].severity, Severity::Info);
        assert_eq!(events[1].details, Some(serde_json::json!({ "n": 2 })));
        assert_ne!(events[0].id, events[1].id);
        assert_eq!(log.states(), vec![RunState::FetchingSource]);

        log.clear();
        assert!(log.events().is_empty());
        assert!(log.states().is_empty());
    }
}
