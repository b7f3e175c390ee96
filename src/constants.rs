//! Canonical constants (C16): `Truth`, `False`, `Zero`.
//!
//! `Truth` is generated once per engine and persisted as a raw little-
//! endian dump under `<workingFolder>/truth.bin`, sized exactly
//! `dimensions * bytesPerElement`; later starts load it back so every
//! trace stays comparable. A dimension or byte-length mismatch triggers
//! regeneration and an overwrite.

use crate::config::{Config, NumericType};
use crate::error::SpockResult;
use crate::vector::ops;
use crate::vector::space::{Hypervector, VectorSpace};

/// The three global vectors every session sees.
pub struct Constants {
    pub truth: Hypervector,
    pub false_: Hypervector,
    pub zero: Hypervector,
}

fn encode_element(kind: NumericType, value: f64) -> Vec<u8> {
    match kind {
        NumericType::Int8 => vec![value as i8 as u8],
        NumericType::Uint8 => vec![value as u8],
        NumericType::Int16 => (value as i16).to_le_bytes().to_vec(),
        NumericType::Uint16 => (value as u16).to_le_bytes().to_vec(),
        NumericType::Int32 => (value as i32).to_le_bytes().to_vec(),
        NumericType::Uint32 => (value as u32).to_le_bytes().to_vec(),
        NumericType::Float32 => (value as f32).to_le_bytes().to_vec(),
        NumericType::Float64 => value.to_le_bytes().to_vec(),
    }
}

fn decode_element(kind: NumericType, bytes: &[u8]) -> f64 {
    match kind {
        NumericType::Int8 => f64::from(bytes[0] as i8),
        NumericType::Uint8 => f64::from(bytes[0]),
        NumericType::Int16 => f64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        NumericType::Uint16 => f64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
        NumericType::Int32 => f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        NumericType::Uint32 => f64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        NumericType::Float32 => f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        NumericType::Float64 => f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
    }
}

fn encode_vector(v: &Hypervector) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.dim() * v.kind.bytes_per_element());
    for value in v.as_slice() {
        out.extend(encode_element(v.kind, *value));
    }
    out
}

fn decode_vector(kind: NumericType, bytes: &[u8]) -> Hypervector {
    let stride = kind.bytes_per_element();
    let values = bytes.chunks_exact(stride).map(|chunk| decode_element(kind, chunk)).collect();
    Hypervector::from_values(kind, values)
}

/// Loads `Truth` from disk if present and correctly sized, otherwise
/// generates a fresh unit vector and persists it; then derives `False`
/// and `Zero`.
pub fn load_or_generate(config: &Config, space: &VectorSpace) -> SpockResult<Constants> {
    let path = config.truth_path();
    let expected_bytes = config.dimensions * config.numeric_type.bytes_per_element();

    let truth = match std::fs::read(&path) {
        Ok(bytes) if bytes.len() == expected_bytes => decode_vector(config.numeric_type, &bytes),
        _ => {
            let fresh = VectorSpace::normalise(&space.create_random());
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, encode_vector(&fresh))?;
            fresh
        }
    };

    let false_ = ops::negate(&truth);
    let zero = Hypervector::zero(truth.dim(), truth.kind);
    Ok(Constants { truth, false_, zero })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorGeneration;
    use tempfile::tempdir;

    fn space() -> VectorSpace {
        VectorSpace::new(64, NumericType::Float32, VectorGeneration::Gaussian, Some(3))
    }

    #[test]
    fn generates_and_persists_then_reloads_identically() {
        let dir = tempdir().unwrap();
        let mut config = Config {
            dimensions: 64,
            numeric_type: NumericType::Float32,
            working_folder: dir.path().to_path_buf(),
            ..Config::default()
        };
        config.validate().unwrap();
        let space = space();
        let first = load_or_generate(&config, &space).unwrap();
        let second = load_or_generate(&config, &space).unwrap();
        assert_eq!(first.truth, second.truth);
        config.working_folder = dir.path().to_path_buf();
    }

    #[test]
    fn false_is_negated_truth_and_zero_is_zero() {
        let dir = tempdir().unwrap();
        let config = Config {
            dimensions: 64,
            numeric_type: NumericType::Float32,
            working_folder: dir.path().to_path_buf(),
            ..Config::default()
        };
        let space = space();
        let constants = load_or_generate(&config, &space).unwrap();
        assert_eq!(constants.false_, ops::negate(&constants.truth));
        assert!(constants.zero.as_slice().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn dimension_mismatch_triggers_regeneration() {
        let dir = tempdir().unwrap();
        let mut config = Config {
            dimensions: 64,
            numeric_type: NumericType::Float32,
            working_folder: dir.path().to_path_buf(),
            ..Config::default()
        };
        let space64 = space();
        load_or_generate(&config, &space64).unwrap();

        config.dimensions = 128;
        let space128 = VectorSpace::new(128, NumericType::Float32, VectorGeneration::Gaussian, Some(3));
        let regenerated = load_or_generate(&config, &space128).unwrap();
        assert_eq!(regenerated.truth.dim(), 128);
    }
}
