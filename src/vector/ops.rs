//! PrimitiveOps (C3): the eight kernel verbs.
//!
//! | Verb | Arity | Result | Contract |
//! |------|-------|--------|----------|
//! | `Add` | v,v | vector | element-wise sum; commutative |
//! | `Bind` | v,v | vector | element-wise (Hadamard) product; commutative |
//! | `Negate` | v | vector | element-wise sign flip; involution |
//! | `Distance` | v,v | scalar | cosine mapped `[-1,1] -> [0,1]` |
//! | `Move` | v,v | vector | same as `Add`, denotes state transition |
//! | `Modulate` | v, scalar\|v | vector | scale or Hadamard depending on operand |
//! | `Identity` | v | vector | fresh copy |
//! | `Normalise` | v,_ | vector | divide by norm; zero preserved |

use crate::error::SpockResult;
use crate::vector::space::{Hypervector, VectorSpace};

/// The second operand of `Modulate`, which is polymorphic by design.
pub enum Moduland<'a> {
    Scalar(f64),
    Vector(&'a Hypervector),
}

pub fn add(a: &Hypervector, b: &Hypervector) -> SpockResult<Hypervector> {
    VectorSpace::add(a, b)
}

pub fn bind(a: &Hypervector, b: &Hypervector) -> SpockResult<Hypervector> {
    VectorSpace::hadamard(a, b)
}

pub fn negate(a: &Hypervector) -> Hypervector {
    Hypervector::from_values(a.kind, a.as_slice().iter().map(|x| -x).collect())
}

/// Cosine similarity remapped from `[-1,1]` to `[0,1]` via `(c+1)/2`.
///
/// This is a similarity in disguise, not a metric: callers that need a
/// true distance compute `1 - (2*distance - 1)`.
pub fn distance(a: &Hypervector, b: &Hypervector) -> SpockResult<f64> {
    let cos = VectorSpace::cosine_similarity(a, b)?;
    Ok((cos + 1.0) / 2.0)
}

pub fn move_to(a: &Hypervector, b: &Hypervector) -> SpockResult<Hypervector> {
    VectorSpace::add(a, b)
}

pub fn modulate(a: &Hypervector, operand: Moduland<'_>) -> SpockResult<Hypervector> {
    match operand {
        Moduland::Scalar(s) => Ok(VectorSpace::scale(a, s)),
        Moduland::Vector(v) => VectorSpace::hadamard(a, v),
    }
}

pub fn identity(a: &Hypervector) -> Hypervector {
    VectorSpace::clone_vec(a)
}

pub fn normalise(a: &Hypervector) -> Hypervector {
    VectorSpace::normalise(a)
}

/// Canonical kernel verb names, used by the executor's dispatch table.
pub const KERNEL_VERBS: &[&str] = &[
    "Add", "Bind", "Negate", "Distance", "Move", "Modulate", "Identity", "Normalise",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumericType;

    fn v(values: &[f64]) -> Hypervector {
        Hypervector::from_values(NumericType::Float64, values.to_vec())
    }

    #[test]
    fn kernel_arithmetic_matches_spec_scenario_1() {
        let a = v(&[1.0, 2.0]);
        let b = v(&[3.0, 4.0]);
        assert_eq!(add(&a, &b).unwrap().as_slice(), &[4.0, 6.0]);
        assert_eq!(bind(&a, &b).unwrap().as_slice(), &[3.0, 8.0]);
        assert_eq!(negate(&a).as_slice(), &[-1.0, -2.0]);
    }

    #[test]
    fn distance_matches_spec_scenario_2() {
        let a = v(&[1.0, 0.0]);
        let b = v(&[0.0, 1.0]);
        assert!((distance(&a, &b).unwrap() - 0.5).abs() < 1e-9);

        let c = v(&[1.0, 0.0]);
        assert!((distance(&a, &c).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negate_is_an_involution() {
        let a = v(&[1.0, -2.0, 3.5]);
        assert_eq!(negate(&negate(&a)), a);
    }

    #[test]
    fn add_and_bind_are_commutative() {
        let a = v(&[1.0, -2.0, 3.0]);
        let b = v(&[4.0, 5.0, -6.0]);
        assert_eq!(add(&a, &b).unwrap(), add(&b, &a).unwrap());
        assert_eq!(bind(&a, &b).unwrap(), bind(&b, &a).unwrap());
    }

    #[test]
    fn bind_of_bipolar_vector_with_itself_is_all_ones() {
        let a = v(&[1.0, -1.0, 1.0, -1.0]);
        let ones = bind(&a, &a).unwrap();
        assert!(ones.as_slice().iter().all(|x| (*x - 1.0).abs() < 1e-9));
    }

    #[test]
    fn modulate_scalar_scales_elementwise() {
        let a = v(&[1.0, 2.0, 3.0]);
        let result = modulate(&a, Moduland::Scalar(2.0)).unwrap();
        assert_eq!(result.as_slice(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn modulate_vector_is_hadamard() {
        let a = v(&[1.0, 2.0]);
        let b = v(&[3.0, 4.0]);
        let result = modulate(&a, Moduland::Vector(&b)).unwrap();
        assert_eq!(result.as_slice(), bind(&a, &b).unwrap().as_slice());
    }

    #[test]
    fn identity_is_a_fresh_copy() {
        let a = v(&[1.0, 2.0]);
        let b = identity(&a);
        assert_eq!(a, b);
    }
}
