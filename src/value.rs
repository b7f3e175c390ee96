//! TypedValue (spec.md §3): the tagged union every resolved symbol and
//! verb result carries.

use crate::dsl::ast::Macro;
use crate::planner::{PlanResult, SolutionResult};
use crate::vector::numeric::NumericValue;
use crate::vector::space::Hypervector;
use serde::{Deserialize, Serialize};

/// A derived semantic fact: `subject verb object`, with an optional
/// truth projection attached once `Evaluate` has scored it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub subject: String,
    pub verb: String,
    pub object: String,
    pub truth: Option<f64>,
}

/// An opaque handle to a persisted or in-memory theory, named by value so
/// `TypedValue` can carry it without borrowing the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheoryHandle {
    pub name: String,
    pub version_id: String,
}

/// Every value a statement's `@declaration` can be bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypedValue {
    Vector(Hypervector),
    Scalar(f64),
    Numeric(NumericValue),
    Macro(Box<Macro>),
    Plan(Box<PlanResult>),
    Solution(Box<SolutionResult>),
    String(String),
    Fact(Box<Fact>),
    Theory(TheoryHandle),
}

impl TypedValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Vector(_) => "VECTOR",
            TypedValue::Scalar(_) => "SCALAR",
            TypedValue::Numeric(_) => "NUMERIC",
            TypedValue::Macro(_) => "MACRO",
            TypedValue::Plan(_) => "PLAN",
            TypedValue::Solution(_) => "SOLUTION",
            TypedValue::String(_) => "STRING",
            TypedValue::Fact(_) => "FACT",
            TypedValue::Theory(_) => "THEORY",
        }
    }

    pub fn as_vector(&self) -> Option<&Hypervector> {
        match self {
            TypedValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            TypedValue::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// A short one-line rendering used in trace step summaries.
    pub fn summarize(&self) -> String {
        match self {
            TypedValue::Vector(v) => format!("Vector[{}]", v.dim()),
            TypedValue::Scalar(s) => format!("{s:.4}"),
            TypedValue::Numeric(n) => match &n.unit {
                Some(u) => format!("{} {}", n.value, u),
                None => format!("{}", n.value),
            },
            TypedValue::Macro(m) => format!("Macro(@{})", m.name),
            TypedValue::Plan(p) => format!("Plan(success={}, steps={})", p.success, p.total_steps),
            TypedValue::Solution(s) => format!("Solution(success={})", s.success),
            TypedValue::String(s) => s.clone(),
            TypedValue::Fact(f) => format!("{} {} {}", f.subject, f.verb, f.object),
            TypedValue::Theory(t) => format!("Theory({}@{})", t.name, t.version_id),
        }
    }
}
