//! Structured execution trace.
//!
//! A trace is a pure observer: it must never alter program behavior,
//! so `VmTracer` methods take `&self` (interior mutability is the
//! implementor's business, as with [`RecordingTracer`]) and return
//! nothing for the evaluator to branch on.

use serde_json::Value;
use std::cell::RefCell;

/// One observed point in a program's execution.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    Start,
    StmtStart { path: String },
    StmtEnd { path: String },
    Op { path: String, name: String },
    CallStart { path: String, target: String },
    Return { path: String, value: Value },
}

/// Implemented by anything that wants to observe evaluation as it
/// happens. The no-op implementation costs nothing at the call sites
/// that invoke it (the default methods all do nothing).
pub trait VmTracer {
    fn start(&self) {}
    fn stmt_start(&self, _path: &str) {}
    fn stmt_end(&self, _path: &str) {}
    fn op(&self, _path: &str, _name: &str) {}
    fn call_start(&self, _path: &str, _target: &str) {}
    fn on_return(&self, _path: &str, _value: &Value) {}
}

/// The default tracer: does nothing, costs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Writes a terse human-readable line per event to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl VmTracer for StderrTracer {
    fn start(&self) {
        eprintln!("[trace] start");
    }
    fn stmt_start(&self, path: &str) {
        eprintln!("[trace] stmt_start {path}");
    }
    fn stmt_end(&self, path: &str) {
        eprintln!("[trace] stmt_end {path}");
    }
    fn op(&self, path: &str, name: &str) {
        eprintln!("[trace] op {name} at {path}");
    }
    fn call_start(&self, path: &str, target: &str) {
        eprintln!("[trace] call_start {target} at {path}");
    }
    fn on_return(&self, path: &str, value: &Value) {
        eprintln!("[trace] return {value} at {path}");
    }
}

/// Captures the full event stream for later inspection (tests, the
/// `bench` collaborator). Uses a `RefCell` because `VmTracer` methods
/// take `&self`.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: RefCell<Vec<TraceEvent>>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.borrow().clone()
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events.into_inner()
    }
}

impl VmTracer for RecordingTracer {
    fn start(&self) {
        self.events.borrow_mut().push(TraceEvent::Start);
    }
    fn stmt_start(&self, path: &str) {
        self.events.borrow_mut().push(TraceEvent::StmtStart {
            path: path.to_string(),
        });
    }
    fn stmt_end(&self, path: &str) {
        self.events.borrow_mut().push(TraceEvent::StmtEnd {
            path: path.to_string(),
        });
    }
    fn op(&self, path: &str, name: &str) {
        self.events.borrow_mut().push(TraceEvent::Op {
            path: path.to_string(),
            name: name.to_string(),
        });
    }
    fn call_start(&self, path: &str, target: &str) {
        self.events.borrow_mut().push(TraceEvent::CallStart {
            path: path.to_string(),
            target: target.to_string(),
        });
    }
    fn on_return(&self, path: &str, value: &Value) {
        self.events.borrow_mut().push(TraceEvent::Return {
            path: path.to_string(),
            value: value.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recording_tracer_captures_in_order() {
        let t = RecordingTracer::new();
        t.start();
        t.stmt_start("$[0]");
        t.op("$[0]/value", "add");
        t.on_return("$[0]", &json!(3));
        let events = t.into_events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], TraceEvent::Start);
    }
}
