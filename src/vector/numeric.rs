//! NumericKernel (C4): measured numeric values with unit algebra.
//!
//! Addition and subtraction require matching units. Multiplication and
//! division compose units through a small canonical rewrite table; any
//! composition outside the table is kept as an opaque formal product or
//! quotient string rather than invented (spec.md §9, Open Questions).

use crate::error::{SpockError, SpockResult};
use serde::{Deserialize, Serialize};

/// A measured quantity: a real value with an optional symbolic unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
    pub value: f64,
    pub unit: Option<String>,
}

impl NumericValue {
    pub fn make(value: f64) -> Self {
        NumericValue { value, unit: None }
    }

    pub fn with_unit(value: f64, unit: impl Into<String>) -> Self {
        NumericValue {
            value,
            unit: Some(unit.into()),
        }
    }

    pub fn attach_unit(&self, unit: impl Into<String>) -> Self {
        NumericValue {
            value: self.value,
            unit: Some(unit.into()),
        }
    }

    /// Project onto a unit, returning the bare numeric value if it matches;
    /// otherwise fails with `UnitIncompatibility`.
    pub fn project_unit(&self, unit: &str) -> SpockResult<f64> {
        match &self.unit {
            Some(u) if u == unit => Ok(self.value),
            Some(u) => Err(SpockError::UnitIncompatibility {
                left: u.clone(),
                right: unit.to_string(),
            }),
            None => Err(SpockError::UnitIncompatibility {
                left: "<dimensionless>".to_string(),
                right: unit.to_string(),
            }),
        }
    }

    pub fn add(&self, other: &NumericValue) -> SpockResult<NumericValue> {
        self.require_same_unit(other)?;
        Ok(NumericValue {
            value: self.value + other.value,
            unit: self.unit.clone(),
        })
    }

    pub fn sub(&self, other: &NumericValue) -> SpockResult<NumericValue> {
        self.require_same_unit(other)?;
        Ok(NumericValue {
            value: self.value - other.value,
            unit: self.unit.clone(),
        })
    }

    pub fn mul(&self, other: &NumericValue) -> NumericValue {
        NumericValue {
            value: self.value * other.value,
            unit: compose_unit(self.unit.as_deref(), other.unit.as_deref(), Op::Mul),
        }
    }

    pub fn div(&self, other: &NumericValue) -> SpockResult<NumericValue> {
        if other.value == 0.0 {
            return Err(SpockError::Arithmetic("division by zero".into()));
        }
        let value = self.value / other.value;
        if !value.is_finite() {
            return Err(SpockError::Arithmetic("non-finite result".into()));
        }
        Ok(NumericValue {
            value,
            unit: compose_unit(self.unit.as_deref(), other.unit.as_deref(), Op::Div),
        })
    }

    fn require_same_unit(&self, other: &NumericValue) -> SpockResult<()> {
        if self.unit != other.unit {
            return Err(SpockError::UnitIncompatibility {
                left: self.unit.clone().unwrap_or_else(|| "<dimensionless>".into()),
                right: other.unit.clone().unwrap_or_else(|| "<dimensionless>".into()),
            });
        }
        Ok(())
    }
}

enum Op {
    Mul,
    Div,
}

/// Table-driven unit composition. Canonical rewrites:
/// `m·m=m²`, `m/s=m_per_s`, `kg·m/s²=N`, `N·m=J`, `J/s=W`. Anything else is
/// stored as a formal `a·b` or `a/b` product string.
fn compose_unit(left: Option<&str>, right: Option<&str>, op: Op) -> Option<String> {
    match (left, right) {
        (None, None) => None,
        (Some(u), None) | (None, Some(u)) => Some(u.to_string()),
        (Some(a), Some(b)) => match op {
            Op::Mul => Some(canonical_mul(a, b)),
            Op::Div => {
                if a == b {
                    None
                } else {
                    Some(canonical_div(a, b))
                }
            }
        },
    }
}

fn canonical_mul(a: &str, b: &str) -> String {
    match (a, b) {
        ("m", "m") => "m²".to_string(),
        ("kg", "m/s²") | ("m/s²", "kg") => "N".to_string(),
        ("N", "m") | ("m", "N") => "J".to_string(),
        _ => format!("{a}·{b}"),
    }
}

fn canonical_div(a: &str, b: &str) -> String {
    match (a, b) {
        ("m", "s") => "m_per_s".to_string(),
        ("J", "s") => "W".to_string(),
        _ => format!("{a}/{b}"),
    }
}
