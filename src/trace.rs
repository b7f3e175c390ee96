//! TraceLogger (C13): append-only-while-active execution traces.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

pub type ContextId = String;

/// One logged verb invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub dsl_statement: String,
    pub subject_ref: String,
    pub verb: String,
    pub object_ref: String,
    pub result_ref: String,
    pub output: String,
}

/// A trace: append-only while active, immutable once `endTrace` completes it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
    pub completed: bool,
}

impl Trace {
    pub fn push_comment(&mut self, comment: impl Into<String>) {
        self.steps.push(TraceStep {
            dsl_statement: comment.into(),
            subject_ref: String::new(),
            verb: String::new(),
            object_ref: String::new(),
            result_ref: String::new(),
            output: String::new(),
        });
    }
}

/// Process-wide table of active/completed traces, keyed by context id.
#[derive(Default)]
pub struct TraceLogger {
    active: DashMap<ContextId, Trace>,
}

impl TraceLogger {
    pub fn new() -> Self {
        TraceLogger::default()
    }

    pub fn start_trace(&self, id: ContextId) {
        self.active.insert(id, Trace::default());
    }

    /// Appends a step. No-op if the trace is missing or already completed.
    pub fn log_step(&self, id: &str, step: TraceStep) {
        if let Some(mut trace) = self.active.get_mut(id) {
            if !trace.completed {
                trace.steps.push(step);
            }
        }
    }

    pub fn log_comment(&self, id: &str, comment: impl Into<String>) {
        if let Some(mut trace) = self.active.get_mut(id) {
            if !trace.completed {
                trace.push_comment(comment);
            }
        }
    }

    /// Completes the trace and returns its immutable snapshot. Idempotent:
    /// a second call returns the same snapshot without mutating it further.
    pub fn end_trace(&self, id: &str) -> Option<Trace> {
        let mut entry = self.active.get_mut(id)?;
        entry.completed = true;
        Some(entry.clone())
    }

    pub fn get(&self, id: &str) -> Option<Trace> {
        self.active.get(id).map(|t| t.clone())
    }
}

/// Joins every step's `dslStatement` in insertion order. `detailed` appends
/// a `#` comment with the verb and resolved refs after each step.
pub fn trace_to_script(trace: &Trace, detailed: bool) -> String {
    let mut lines = Vec::with_capacity(trace.steps.len() * 2);
    for step in &trace.steps {
        if step.verb.is_empty() {
            lines.push(step.dsl_statement.clone());
            continue;
        }
        lines.push(step.dsl_statement.clone());
        if detailed {
            lines.push(format!(
                "# {} {} {} -> {} = {}",
                step.subject_ref, step.verb, step.object_ref, step.result_ref, step.output
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(decl: &str) -> TraceStep {
        TraceStep {
            dsl_statement: format!("@{decl} x Is y"),
            subject_ref: "x".into(),
            verb: "Is".into(),
            object_ref: "y".into(),
            result_ref: format!("@{decl}"),
            output: "Vector[8]".into(),
        }
    }

    #[test]
    fn end_trace_is_idempotent() {
        let logger = TraceLogger::new();
        logger.start_trace("ctx1".into());
        logger.log_step("ctx1", step("a"));
        let first = logger.end_trace("ctx1").unwrap();
        logger.log_step("ctx1", step("b"));
        let second = logger.end_trace("ctx1").unwrap();
        assert_eq!(first.steps.len(), 1);
        assert_eq!(second.steps.len(), 1);
    }

    #[test]
    fn trace_to_script_joins_statements_in_order() {
        let mut trace = Trace::default();
        trace.steps.push(step("a"));
        trace.steps.push(step("b"));
        let script = trace_to_script(&trace, false);
        assert_eq!(script, "@a x Is y\n@b x Is y");
    }

    #[test]
    fn detailed_variant_appends_comments() {
        let mut trace = Trace::default();
        trace.steps.push(step("a"));
        let script = trace_to_script(&trace, true);
        assert_eq!(script.lines().count(), 2);
        assert!(script.lines().nth(1).unwrap().starts_with('#'));
    }

    #[test]
    fn missing_trace_operations_are_harmless() {
        let logger = TraceLogger::new();
        logger.log_step("ghost", step("a"));
        assert!(logger.end_trace("ghost").is_none());
    }
}
