//! AST nodes: `Statement`, `Macro`, `Script` (spec.md §3).

use serde::{Deserialize, Serialize};

/// A single `@declaration subject verb object` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Always stored without the leading `@`.
    pub declaration: String,
    pub subject: String,
    pub verb: String,
    pub object: String,
    pub line: usize,
}

impl Statement {
    /// The literal source line this statement was parsed from, used
    /// verbatim as `TraceStep::dslStatement`.
    pub fn to_source(&self) -> String {
        format!("@{} {} {} {}", self.declaration, self.subject, self.verb, self.object)
    }
}

/// Macro kind, one of `theory`, `verb`, `session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacroKind {
    Theory,
    Verb,
    Session,
}

impl MacroKind {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "theory" => Some(MacroKind::Theory),
            "verb" => Some(MacroKind::Verb),
            "session" => Some(MacroKind::Session),
            _ => None,
        }
    }
}

/// A named `begin ... end` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    /// Always stored without the leading `@`.
    pub name: String,
    pub kind: MacroKind,
    pub body: Vec<Statement>,
    pub nested_macros: Vec<Macro>,
    pub line: usize,
}

impl Macro {
    /// `verb` macros must declare `@result` (or `result`) somewhere in
    /// their body (spec.md §4.5).
    pub fn declares_result(&self) -> bool {
        self.body
            .iter()
            .any(|s| s.declaration == "result")
    }
}

/// A whole parsed program: top-level statements plus top-level macros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub statements: Vec<Statement>,
    pub macros: Vec<Macro>,
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Macro {
    /// Render this macro back to DSL text. Used when assembling merged or
    /// generated theories, and by the trace logger's replayable output.
    pub fn to_dsl(&self) -> String {
        let kind = match self.kind {
            MacroKind::Theory => "theory",
            MacroKind::Verb => "verb",
            MacroKind::Session => "session",
        };
        let mut lines = vec![format!("@{} {} begin", self.name, kind)];
        for stmt in &self.body {
            lines.push(indent(&stmt.to_source()));
        }
        for m in &self.nested_macros {
            lines.push(indent(&m.to_dsl()));
        }
        lines.push("end".to_string());
        lines.join("\n")
    }
}

impl Script {
    /// Render the whole script back to DSL text, statements first, then
    /// macros, in declaration order.
    pub fn to_dsl(&self) -> String {
        let mut parts: Vec<String> = self.statements.iter().map(Statement::to_source).collect();
        parts.extend(self.macros.iter().map(Macro::to_dsl));
        parts.join("\n")
    }
}
