//! ResultTheory (C14): assembles the clean-result DSL macro from the final
//! symbol state plus the execution trace, and recovers the same summary
//! back out of its rendered text.

use crate::trace::TraceStep;
use crate::value::TypedValue;
use std::collections::HashMap;

/// Verbs whose trace steps are surfaced as `@fact` statements.
const SEMANTIC_VERBS: &[&str] = &[
    "Is", "Has", "Implies", "Causes", "Before", "After", "Contains", "HasNumericValue",
];

/// Kernel verbs that denote a relation worth surfacing when both operands
/// are user-named (not a verb macro's internal `$subject`/`$object`).
const KERNEL_RELATION_VERBS: &[&str] = &["Add", "Bind", "Move"];

fn is_user_named(token: &str) -> bool {
    !token.starts_with('$')
}

fn escape(message: &str) -> String {
    message.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Recovered structure of a rendered result theory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    pub success: bool,
    pub facts: Vec<(String, String, String)>,
    pub truth: Option<f64>,
    pub confidence: Option<f64>,
    pub error_message: Option<String>,
}

/// Builds the clean result theory for a successful run.
pub fn build_success(
    symbols: &HashMap<String, TypedValue>,
    steps: &[TraceStep],
    score: f64,
) -> String {
    let mut lines = Vec::new();
    let mut fact_idx = 0usize;
    let mut rel_idx = 0usize;

    for step in steps {
        if step.verb.is_empty() {
            continue;
        }
        if SEMANTIC_VERBS.contains(&step.verb.as_str()) {
            lines.push(format!(
                "@fact{fact_idx} {} {} {}",
                step.subject_ref, step.verb, step.object_ref
            ));
            fact_idx += 1;
        } else if KERNEL_RELATION_VERBS.contains(&step.verb.as_str())
            && is_user_named(&step.subject_ref)
            && is_user_named(&step.object_ref)
        {
            lines.push(format!(
                "@rel{rel_idx} {} {} {}",
                step.subject_ref, step.verb, step.object_ref
            ));
            rel_idx += 1;
        }
    }

    if let Some(result) = symbols.get("result") {
        match result {
            TypedValue::Scalar(s) => lines.push(format!("@scalar result HasValue {s:.4}")),
            TypedValue::Numeric(n) => lines.push(format!("@scalar result HasValue {}", n.value)),
            TypedValue::Fact(f) => lines.push(format!("@fact_result {} {} {}", f.subject, f.verb, f.object)),
            other => lines.push(format!("@fact_result result Is {}", other.summarize())),
        }
        lines.push(format!("@confidence result HasTruth {:.4}", score));
    }

    lines.join("\n")
}

/// Builds the `@Error` macro for a failed run.
pub fn build_error(message: &str) -> String {
    format!(
        "@Error theory begin\n  @error message HasValue \"{}\"\n  @success result HasValue false\nend",
        escape(message)
    )
}

/// Recovers `{success, facts, truth, confidence}` from rendered result
/// theory text. Tolerant of either the success form (bare `@fact*`/
/// `@scalar`/`@confidence` statements) or the `@Error` macro form.
///
/// The `@Error` form is scanned by hand rather than through the tokenizer:
/// an escaped error message may contain spaces, which the whitespace-
/// delimited grammar can't round-trip as a single token.
pub fn parse_result_theory(text: &str) -> ResultSummary {
    let mut summary = ResultSummary {
        success: true,
        ..Default::default()
    };
    if text.trim().is_empty() {
        return summary;
    }

    if text.contains("@Error theory begin") {
        summary.success = false;
        summary.error_message = text
            .lines()
            .find(|l| l.trim_start().starts_with("@error "))
            .and_then(extract_quoted);
        return summary;
    }

    let Ok(script) = crate::dsl::parser::parse_script(text) else {
        return ResultSummary {
            success: false,
            error_message: Some("unparseable result theory".to_string()),
            ..Default::default()
        };
    };

    for stmt in &script.statements {
        if stmt.declaration.starts_with("fact") || stmt.declaration == "fact_result" {
            summary
                .facts
                .push((stmt.subject.clone(), stmt.verb.clone(), stmt.object.clone()));
        } else if stmt.declaration == "scalar" && stmt.object.parse::<f64>().is_ok() {
            summary.truth = stmt.object.parse::<f64>().ok();
        } else if stmt.declaration == "confidence" {
            summary.confidence = stmt.object.parse::<f64>().ok();
        }
    }

    summary
}

fn extract_quoted(line: &str) -> Option<String> {
    let first = line.find('"')?;
    let last = line.rfind('"')?;
    (last > first).then(|| line[first + 1..last].to_string())
}
