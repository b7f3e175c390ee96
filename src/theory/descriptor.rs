//! TheoryDescriptor (spec.md §3): a persisted, named theory.

use crate::dsl::ast::Script;
use crate::dsl::parser::parse_script;
use crate::error::SpockResult;
use crate::value::TypedValue;
use crate::vector::space::Hypervector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata sidecar persisted next to a theory's DSL source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheoryMetadata {
    pub version_id: String,
    pub parent_version_id: Option<String>,
    /// `(target_version_id, source_version_id)` when this descriptor is the
    /// result of a merge.
    pub merged_from: Option<(String, String)>,
    pub created_at: DateTime<Utc>,
}

/// An in-memory theory: its DSL source, parsed AST, any symbols bound so
/// far, and version lineage.
#[derive(Debug, Clone)]
pub struct TheoryDescriptor {
    pub name: String,
    pub source: String,
    pub ast: Script,
    pub symbols: HashMap<String, TypedValue>,
    pub vectors: HashMap<String, Hypervector>,
    pub metadata: TheoryMetadata,
}

impl TheoryDescriptor {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> SpockResult<Self> {
        let source = source.into();
        let ast = parse_script(&source)?;
        Ok(TheoryDescriptor {
            name: name.into(),
            source,
            ast,
            symbols: HashMap::new(),
            vectors: HashMap::new(),
            metadata: TheoryMetadata {
                version_id: fresh_version_id(),
                parent_version_id: None,
                merged_from: None,
                created_at: Utc::now(),
            },
        })
    }

    pub fn version_id(&self) -> &str {
        &self.metadata.version_id
    }
}

/// Monotonic version identifiers: a millisecond timestamp plus a random
/// suffix, ordered first by timestamp.
pub fn fresh_version_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::random();
    format!("{millis:013}-{suffix:08x}")
}
