//! # SPOCK — a Geometric Operating System
//!
//! SPOCK reasons over hypervectors instead of symbols. Facts, relations,
//! and plans are all points (or compositions of points) in a fixed-
//! dimension vector space; truth is a projection (cosine similarity)
//! against a single canonical `Truth` vector rather than a boolean.
//!
//! ## Pipeline
//! ```text
//! DSL source
//!     ↓
//! [tokenizer]            → Token stream
//!     ↓
//! [parser]                → Script (declarations + macros), SSA-checked
//!     ↓
//! [dependency graph]      → topological execution order (Kahn, line-tiebroken)
//!     ↓
//! [executor]              → dispatches verbs against a Session's symbol table
//!     ↓
//! [trace] + [result_theory] → execution trace, rendered result theory, score
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use spock::config::Config;
//! use spock::engine::EngineFactory;
//!
//! let engine = EngineFactory::create(Config::default())?;
//! let mut session = engine.create_session(&["BaseLogic".to_string()])?;
//!
//! let result = session.ask("@result cat Is mammal")?;
//! println!("score = {}", result.score);
//! ```
//!
//! ## Module organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `config` | Layered configuration (figment: defaults → file → env) |
//! | `error` | `SpockError` taxonomy and `SpockResult` alias |
//! | `vector` | Hypervectors, vector-space ops, unit-aware numerics, PRNG |
//! | `dsl` | Tokenizer, recursive-descent parser, AST, dependency graph |
//! | `value` | The runtime `TypedValue` tagged union |
//! | `session` | Per-session symbol table with theory/snapshot overlays |
//! | `theory` | Theory descriptors, directory-backed store, branch/merge |
//! | `planner` | Semantic gradient-descent planning and constraint solving |
//! | `executor` | Verb dispatch: kernel, numeric, planning, theory, user macros |
//! | `trace` | Append-only execution traces, process-wide trace table |
//! | `result_theory` | Renders/parses the clean result theory a call returns |
//! | `constants` | Canonical `Truth`/`False`/`Zero`, generate-once-then-persist |
//! | `engine` | `EngineFactory` + `SessionApi`: the surface callers drive |

pub mod config;
pub mod constants;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod executor;
pub mod planner;
pub mod result_theory;
pub mod session;
pub mod theory;
pub mod trace;
pub mod value;
pub mod vector;

pub use config::Config;
pub use engine::{ApiResult, Engine, EngineFactory, SessionApi};
pub use error::{SpockError, SpockResult};
pub use session::{Session, SessionId, SessionManager};
pub use value::TypedValue;
pub use vector::space::{Hypervector, VectorSpace};
