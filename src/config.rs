//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - `spock.toml` (default configuration)
//! - `spock.local.toml` (git-ignored local overrides)
//! - Environment variables (`SPOCK_*` prefix)
//!
//! ## Example
//!
//! ```toml
//! # spock.toml
//! dimensions = 512
//! numericType = "float32"
//! vectorGeneration = "gaussian"
//! workingFolder = ".spock"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! SPOCK_DIMENSIONS=1024
//! SPOCK_LOG_LEVEL=full
//! SPOCK_WORKING_FOLDER=/var/lib/spock
//! ```

use crate::error::{SpockError, SpockResult};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Element type backing every hypervector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float32,
    Float64,
}

impl NumericType {
    pub fn bytes_per_element(self) -> usize {
        match self {
            NumericType::Int8 | NumericType::Uint8 => 1,
            NumericType::Int16 | NumericType::Uint16 => 2,
            NumericType::Int32 | NumericType::Uint32 | NumericType::Float32 => 4,
            NumericType::Float64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, NumericType::Float32 | NumericType::Float64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            NumericType::Int8
                | NumericType::Int16
                | NumericType::Int32
                | NumericType::Float32
                | NumericType::Float64
        )
    }
}

/// Vector generation mode for fresh random hypervectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorGeneration {
    Gaussian,
    Bipolar,
}

/// Engine log verbosity. Controls which `tracing` events the REPL surfaces;
/// the library itself always emits the full set of spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Summary,
    Full,
}

/// Plateau handling strategy for the semantic gradient-descent planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateauStrategy {
    Fail,
    RandomRestart,
    ProceduralFallback,
}

/// Engine-wide configuration. Every field has a spec-mandated default.
///
/// Fields are renamed to the camelCase spelling spec.md §6 documents for
/// TOML (`numericType`, `workingFolder`, ...), with a snake_case `alias` so
/// the `SPOCK_*` env overrides below — which figment lowercases but does
/// not re-case to camelCase — still bind to the same field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(rename = "numericType", alias = "numeric_type", default = "default_numeric_type")]
    pub numeric_type: NumericType,

    #[serde(rename = "vectorGeneration", alias = "vector_generation", default = "default_vector_generation")]
    pub vector_generation: VectorGeneration,

    #[serde(rename = "workingFolder", alias = "working_folder", default = "default_working_folder")]
    pub working_folder: PathBuf,

    #[serde(rename = "theoriesPath", alias = "theories_path", default)]
    pub theories_path: Option<PathBuf>,

    #[serde(rename = "logLevel", alias = "log_level", default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(rename = "traceEnabled", alias = "trace_enabled", default = "default_true")]
    pub trace_enabled: bool,

    #[serde(rename = "planningEpsilon", alias = "planning_epsilon", default = "default_epsilon")]
    pub planning_epsilon: f64,

    #[serde(rename = "maxPlanningSteps", alias = "max_planning_steps", default = "default_max_steps")]
    pub max_planning_steps: usize,

    #[serde(rename = "plateauStrategy", alias = "plateau_strategy", default = "default_plateau_strategy")]
    pub plateau_strategy: PlateauStrategy,

    #[serde(rename = "candidateLimit", alias = "candidate_limit", default = "default_candidate_limit")]
    pub candidate_limit: usize,

    #[serde(rename = "maxRecursion", alias = "max_recursion", default = "default_max_recursion")]
    pub max_recursion: usize,

    #[serde(rename = "randomSeed", alias = "random_seed", default)]
    pub random_seed: Option<u32>,
}

fn default_dimensions() -> usize {
    512
}
fn default_numeric_type() -> NumericType {
    NumericType::Float32
}
fn default_vector_generation() -> VectorGeneration {
    VectorGeneration::Gaussian
}
fn default_working_folder() -> PathBuf {
    PathBuf::from(".spock")
}
fn default_log_level() -> LogLevel {
    LogLevel::Summary
}
fn default_true() -> bool {
    true
}
fn default_epsilon() -> f64 {
    0.05
}
fn default_max_steps() -> usize {
    100
}
fn default_plateau_strategy() -> PlateauStrategy {
    PlateauStrategy::Fail
}
fn default_candidate_limit() -> usize {
    1000
}
fn default_max_recursion() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dimensions: default_dimensions(),
            numeric_type: default_numeric_type(),
            vector_generation: default_vector_generation(),
            working_folder: default_working_folder(),
            theories_path: None,
            log_level: default_log_level(),
            trace_enabled: default_true(),
            planning_epsilon: default_epsilon(),
            max_planning_steps: default_max_steps(),
            plateau_strategy: default_plateau_strategy(),
            candidate_limit: default_candidate_limit(),
            max_recursion: default_max_recursion(),
            random_seed: None,
        }
    }
}

impl Config {
    /// Load configuration from default locations, merging in order:
    /// 1. `spock.toml` (base configuration)
    /// 2. `spock.local.toml` (local overrides, git-ignored)
    /// 3. Environment variables (`SPOCK_*` prefix, `__` nested separator)
    pub fn load() -> SpockResult<Self> {
        let config: Config = Figment::from(figment::providers::Serialized::defaults(
            Config::default(),
        ))
        .merge(Toml::file("spock.toml"))
        .merge(Toml::file("spock.local.toml"))
        .merge(Env::prefixed("SPOCK_").split("__"))
        .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, still honouring env overrides.
    pub fn from_file(path: &str) -> SpockResult<Self> {
        let config: Config = Figment::from(figment::providers::Serialized::defaults(
            Config::default(),
        ))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SPOCK_").split("__"))
        .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved path for persisted theories.
    pub fn theories_dir(&self) -> PathBuf {
        self.theories_path
            .clone()
            .unwrap_or_else(|| self.working_folder.join("theories"))
    }

    /// Path of the canonical Truth vector dump.
    pub fn truth_path(&self) -> PathBuf {
        self.working_folder.join("truth.bin")
    }

    /// Validate invariants spec.md §6 requires before any disk I/O happens.
    pub fn validate(&self) -> SpockResult<()> {
        if self.dimensions < 64 || !self.dimensions.is_power_of_two() {
            return Err(SpockError::Configuration(format!(
                "dimensions must be a power of two >= 64, got {}",
                self.dimensions
            )));
        }
        if !(0.0..1.0).contains(&self.planning_epsilon) || self.planning_epsilon <= 0.0 {
            return Err(SpockError::Configuration(format!(
                "planningEpsilon must be in (0,1), got {}",
                self.planning_epsilon
            )));
        }
        if self.max_planning_steps == 0 {
            return Err(SpockError::Configuration(
                "maxPlanningSteps must be positive".into(),
            ));
        }
        if self.candidate_limit == 0 {
            return Err(SpockError::Configuration(
                "candidateLimit must be positive".into(),
            ));
        }
        if self.max_recursion == 0 {
            return Err(SpockError::Configuration(
                "maxRecursion must be positive".into(),
            ));
        }
        Ok(())
    }
}
