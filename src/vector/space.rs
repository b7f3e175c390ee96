//! VectorSpace (C2): allocation, generation, norm, dot, Hadamard, cosine.

use crate::config::{NumericType, VectorGeneration};
use crate::error::{SpockError, SpockResult};
use crate::vector::rng::Mulberry32;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A fixed-length, element-typed numeric vector.
///
/// Values are carried internally as `f64` and clamped to the configured
/// element type whenever they are written (construction, arithmetic
/// results). `dim` is immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypervector {
    pub kind: NumericType,
    data: Vec<f64>,
}

impl Hypervector {
    pub fn zero(dim: usize, kind: NumericType) -> Self {
        Hypervector {
            kind,
            data: vec![0.0; dim],
        }
    }

    /// Build from raw values, clamping each to `kind`'s representable range.
    pub fn from_values(kind: NumericType, values: Vec<f64>) -> Self {
        let data = values.into_iter().map(|v| clamp_to(kind, v)).collect();
        Hypervector { kind, data }
    }

    pub fn dim(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn set(&mut self, index: usize, value: f64) {
        self.data[index] = clamp_to(self.kind, value);
    }

    fn check_dims(&self, other: &Hypervector) -> SpockResult<()> {
        if self.dim() != other.dim() {
            return Err(SpockError::DimensionMismatch {
                expected: self.dim(),
                got: other.dim(),
            });
        }
        Ok(())
    }

    fn elementwise(
        &self,
        other: &Hypervector,
        f: impl Fn(f64, f64) -> f64,
    ) -> SpockResult<Hypervector> {
        self.check_dims(other)?;
        let data: Vec<f64> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| clamp_to(self.kind, f(a, b)))
            .collect();
        Ok(Hypervector {
            kind: self.kind,
            data,
        })
    }
}

/// Round/clamp a raw real value to the representable range of `kind`.
fn clamp_to(kind: NumericType, v: f64) -> f64 {
    match kind {
        NumericType::Int8 => v.round().clamp(f64::from(i8::MIN), f64::from(i8::MAX)),
        NumericType::Int16 => v.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)),
        NumericType::Int32 => v.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)),
        NumericType::Uint8 => v.round().clamp(0.0, f64::from(u8::MAX)),
        NumericType::Uint16 => v.round().clamp(0.0, f64::from(u16::MAX)),
        NumericType::Uint32 => v.round().clamp(0.0, f64::from(u32::MAX)),
        NumericType::Float32 => f64::from(v as f32),
        NumericType::Float64 => v,
    }
}

/// Owns the process/engine-scoped PRNG and the default element kind/
/// generation mode used for fresh random hypervectors.
pub struct VectorSpace {
    pub dim: usize,
    pub kind: NumericType,
    pub generation: VectorGeneration,
    rng: Mutex<Mulberry32>,
}

impl VectorSpace {
    pub fn new(dim: usize, kind: NumericType, generation: VectorGeneration, seed: Option<u32>) -> Self {
        VectorSpace {
            dim,
            kind,
            generation,
            rng: Mutex::new(Mulberry32::new(seed.unwrap_or(0x5eed_5eed))),
        }
    }

    /// Replace the PRNG seed. Concurrent callers relying on determinism must
    /// serialize this themselves (spec.md §5).
    pub fn set_random_seed(&self, seed: u32) {
        self.rng.lock().reseed(seed);
    }

    pub fn create(&self) -> Hypervector {
        Hypervector::zero(self.dim, self.kind)
    }

    pub fn create_random(&self) -> Hypervector {
        let mut rng = self.rng.lock();
        let signed = self.kind.is_signed();
        let values: Vec<f64> = match self.generation {
            VectorGeneration::Gaussian => {
                let stddev = 1.0 / (self.dim as f64).sqrt();
                (0..self.dim)
                    .map(|_| rng.next_gaussian() * stddev)
                    .collect()
            }
            VectorGeneration::Bipolar => (0..self.dim).map(|_| rng.next_bipolar(signed)).collect(),
        };
        Hypervector::from_values(self.kind, values)
    }

    pub fn clone_vec(v: &Hypervector) -> Hypervector {
        v.clone()
    }

    pub fn dot(a: &Hypervector, b: &Hypervector) -> SpockResult<f64> {
        a.check_dims(b)?;
        Ok(a.data.iter().zip(b.data.iter()).map(|(x, y)| x * y).sum())
    }

    pub fn norm(a: &Hypervector) -> f64 {
        a.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Normalise to unit length. The zero vector maps to a fresh zero
    /// vector, never `NaN`.
    pub fn normalise(a: &Hypervector) -> Hypervector {
        let n = Self::norm(a);
        if n == 0.0 {
            return Hypervector::zero(a.dim(), a.kind);
        }
        Hypervector::from_values(a.kind, a.data.iter().map(|x| x / n).collect())
    }

    /// Cosine similarity in `[-1, 1]`. Zero vectors yield `0.0` similarity
    /// rather than dividing by zero.
    pub fn cosine_similarity(a: &Hypervector, b: &Hypervector) -> SpockResult<f64> {
        a.check_dims(b)?;
        let denom = Self::norm(a) * Self::norm(b);
        if denom == 0.0 {
            return Ok(0.0);
        }
        Ok((Self::dot(a, b)? / denom).clamp(-1.0, 1.0))
    }

    pub fn scale(a: &Hypervector, s: f64) -> Hypervector {
        Hypervector::from_values(a.kind, a.data.iter().map(|x| x * s).collect())
    }

    pub fn add(a: &Hypervector, b: &Hypervector) -> SpockResult<Hypervector> {
        a.elementwise(b, |x, y| x + y)
    }

    pub fn hadamard(a: &Hypervector, b: &Hypervector) -> SpockResult<Hypervector> {
        a.elementwise(b, |x, y| x * y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> VectorSpace {
        VectorSpace::new(64, NumericType::Float32, VectorGeneration::Gaussian, Some(1))
    }

    #[test]
    fn normalise_of_zero_is_zero() {
        let z = Hypervector::zero(8, NumericType::Float32);
        let n = VectorSpace::normalise(&z);
        assert!(n.as_slice().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn normalise_has_unit_norm() {
        let v = Hypervector::from_values(NumericType::Float32, vec![3.0, 4.0]);
        let n = VectorSpace::normalise(&v);
        assert!((VectorSpace::norm(&n) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let a = Hypervector::zero(4, NumericType::Float32);
        let b = Hypervector::zero(5, NumericType::Float32);
        assert!(VectorSpace::add(&a, &b).is_err());
        assert!(VectorSpace::dot(&a, &b).is_err());
    }

    #[test]
    fn integer_kind_clamps_on_construction() {
        let v = Hypervector::from_values(NumericType::Int8, vec![500.0, -500.0]);
        assert_eq!(v.as_slice(), &[127.0, -128.0]);
    }

    #[test]
    fn random_gaussian_vectors_are_nearly_orthogonal() {
        let space = VectorSpace::new(256, NumericType::Float64, VectorGeneration::Gaussian, Some(99));
        let a = space.create_random();
        let b = space.create_random();
        let cos = VectorSpace::cosine_similarity(&a, &b).unwrap();
        assert!(cos.abs() < 0.2, "cos={cos}");
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let s1 = space();
        let s2 = space();
        let a = s1.create_random();
        let b = s2.create_random();
        assert_eq!(a, b);
    }
}
