//! TheoryVersioning (C10): branch/merge with conflict policies.

use crate::dsl::ast::{Macro, Script, Statement};
use crate::dsl::parser::parse_script;
use crate::error::{SpockError, SpockResult};
use crate::theory::descriptor::{fresh_version_id, TheoryDescriptor, TheoryMetadata};
use crate::vector::space::{Hypervector, VectorSpace};
use chrono::Utc;
use std::collections::HashMap;

/// Conflict-resolution strategy for `MergeTheory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Target,
    Source,
    Both,
    Consensus,
    Fail,
}

/// Splits a branch name on the *first* `__` only, so `base__a__b` parses
/// to `(base, a__b)`.
pub fn parse_branch_name(full: &str) -> Option<(&str, &str)> {
    full.find("__").map(|idx| (&full[..idx], &full[idx + 2..]))
}

pub fn branch_name(base: &str, branch: &str) -> String {
    format!("{base}__{branch}")
}

/// Deep-copies `source`'s AST into a new descriptor recording
/// `parentVersionId`.
pub fn branch_theory(source: &TheoryDescriptor, branch: &str) -> TheoryDescriptor {
    let name = branch_name(&source.name, branch);
    TheoryDescriptor {
        name,
        source: source.source.clone(),
        ast: source.ast.clone(),
        symbols: source.symbols.clone(),
        vectors: source.vectors.clone(),
        metadata: TheoryMetadata {
            version_id: fresh_version_id(),
            parent_version_id: Some(source.metadata.version_id.clone()),
            merged_from: None,
            created_at: Utc::now(),
        },
    }
}

fn resolve_conflict<T: Clone>(
    name: &str,
    target_item: &T,
    source_item: &T,
    equal: impl Fn(&T, &T) -> bool,
    rename: impl Fn(&T, &str) -> T,
    strategy: MergeStrategy,
    extra: &mut Vec<T>,
) -> SpockResult<T> {
    if equal(target_item, source_item) {
        return Ok(target_item.clone());
    }
    match strategy {
        MergeStrategy::Target | MergeStrategy::Consensus => Ok(target_item.clone()),
        MergeStrategy::Source => Ok(source_item.clone()),
        MergeStrategy::Both => {
            extra.push(rename(source_item, &format!("{name}_merged")));
            Ok(target_item.clone())
        }
        MergeStrategy::Fail => Err(SpockError::MergeConflict(name.to_string())),
    }
}

/// Merge `source` into `target`, producing a new descriptor containing the
/// union of statements and macros from both sides.
pub fn merge_theories(
    target: &TheoryDescriptor,
    source: &TheoryDescriptor,
    strategy: MergeStrategy,
) -> SpockResult<TheoryDescriptor> {
    let (statements, vectors) = merge_statements(
        &target.ast.statements,
        &source.ast.statements,
        &target.vectors,
        &source.vectors,
        strategy,
    )?;
    let macros = merge_macros(&target.ast.macros, &source.ast.macros, strategy)?;

    let merged_script = Script { statements, macros };
    let dsl_text = merged_script.to_dsl();
    let ast = parse_script(&dsl_text)?;

    Ok(TheoryDescriptor {
        name: target.name.clone(),
        source: dsl_text,
        ast,
        symbols: HashMap::new(),
        vectors,
        metadata: TheoryMetadata {
            version_id: fresh_version_id(),
            parent_version_id: Some(target.metadata.version_id.clone()),
            merged_from: Some((
                target.metadata.version_id.clone(),
                source.metadata.version_id.clone(),
            )),
            created_at: Utc::now(),
        },
    })
}

fn merge_statements(
    target: &[Statement],
    source: &[Statement],
    target_vectors: &HashMap<String, Hypervector>,
    source_vectors: &HashMap<String, Hypervector>,
    strategy: MergeStrategy,
) -> SpockResult<(Vec<Statement>, HashMap<String, Hypervector>)> {
    let target_map: HashMap<&str, &Statement> =
        target.iter().map(|s| (s.declaration.as_str(), s)).collect();
    let source_map: HashMap<&str, &Statement> =
        source.iter().map(|s| (s.declaration.as_str(), s)).collect();

    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut merged = Vec::new();
    let mut extra = Vec::new();
    let mut vectors: HashMap<String, Hypervector> = target_vectors.clone();

    for stmt in target {
        if seen.contains(stmt.declaration.as_str()) {
            continue;
        }
        seen.insert(stmt.declaration.as_str());
        match source_map.get(stmt.declaration.as_str()) {
            None => merged.push(stmt.clone()),
            Some(&source_stmt) => {
                let resolved = resolve_conflict(
                    &stmt.declaration,
                    stmt,
                    source_stmt,
                    |a, b| a.subject == b.subject && a.verb == b.verb && a.object == b.object,
                    |s, new_name| Statement {
                        declaration: new_name.to_string(),
                        ..s.clone()
                    },
                    strategy,
                    &mut extra,
                )?;
                merged.push(resolved);

                if strategy == MergeStrategy::Consensus {
                    if let (Some(a), Some(b)) = (
                        target_vectors.get(&stmt.declaration),
                        source_vectors.get(&stmt.declaration),
                    ) {
                        let sum = VectorSpace::add(a, b)?;
                        vectors.insert(stmt.declaration.clone(), VectorSpace::normalise(&sum));
                    }
                }
            }
        }
    }
    for stmt in source {
        if !seen.contains(stmt.declaration.as_str()) {
            seen.insert(stmt.declaration.as_str());
            merged.push(stmt.clone());
            if let Some(v) = source_vectors.get(&stmt.declaration) {
                vectors.entry(stmt.declaration.clone()).or_insert_with(|| v.clone());
            }
        }
    }
    merged.extend(extra);
    Ok((merged, vectors))
}

fn merge_macros(
    target: &[Macro],
    source: &[Macro],
    strategy: MergeStrategy,
) -> SpockResult<Vec<Macro>> {
    let source_map: HashMap<&str, &Macro> = source.iter().map(|m| (m.name.as_str(), m)).collect();
    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut merged = Vec::new();
    let mut extra = Vec::new();

    for m in target {
        seen.insert(m.name.as_str());
        match source_map.get(m.name.as_str()) {
            None => merged.push(m.clone()),
            Some(&source_macro) => {
                let resolved = resolve_conflict(
                    &m.name,
                    m,
                    source_macro,
                    |a, b| a.to_dsl() == b.to_dsl(),
                    |mac, new_name| Macro {
                        name: new_name.to_string(),
                        ..mac.clone()
                    },
                    strategy,
                    &mut extra,
                )?;
                merged.push(resolved);
            }
        }
    }
    for m in source {
        if !seen.contains(m.name.as_str()) {
            merged.push(m.clone());
        }
    }
    merged.extend(extra);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_name_splits_on_first_double_underscore() {
        assert_eq!(parse_branch_name("base__branch"), Some(("base", "branch")));
        assert_eq!(parse_branch_name("base__a__b"), Some(("base", "a__b")));
        assert_eq!(parse_branch_name("nobranch"), None);
    }

    #[test]
    fn branch_theory_records_parent_version() {
        let source = TheoryDescriptor::new("Base", "@a x Is y").unwrap();
        let branched = branch_theory(&source, "feature");
        assert_eq!(branched.name, "Base__feature");
        assert_eq!(
            branched.metadata.parent_version_id.as_deref(),
            Some(source.metadata.version_id.as_str())
        );
        assert_eq!(branched.ast, source.ast);
    }

    #[test]
    fn merge_with_source_strategy_after_branch_equals_source() {
        let base = TheoryDescriptor::new("Base", "@a x Is y").unwrap();
        let mut branched = branch_theory(&base, "feature");
        branched.ast.statements[0].object = "z".to_string();
        branched.source = branched.ast.to_dsl();

        let merged = merge_theories(&base, &branched, MergeStrategy::Source).unwrap();
        assert_eq!(merged.ast.statements, branched.ast.statements);
    }

    #[test]
    fn merge_consensus_averages_vectors_per_spec_scenario_8() {
        use crate::config::NumericType;
        let mut target = TheoryDescriptor::new("T", "@shared x Is y").unwrap();
        let mut source = TheoryDescriptor::new("T", "@shared x Is y").unwrap();
        target.ast.statements[0].object = "u".to_string();
        source.ast.statements[0].object = "v".to_string();

        let u = VectorSpace::normalise(&Hypervector::from_values(
            NumericType::Float64,
            vec![1.0, 0.0],
        ));
        let v = VectorSpace::normalise(&Hypervector::from_values(
            NumericType::Float64,
            vec![0.0, 1.0],
        ));
        target.vectors.insert("shared".to_string(), u.clone());
        source.vectors.insert("shared".to_string(), v.clone());

        let merged = merge_theories(&target, &source, MergeStrategy::Consensus).unwrap();
        let expected = VectorSpace::normalise(&VectorSpace::add(&u, &v).unwrap());
        assert_eq!(merged.vectors.get("shared"), Some(&expected));
    }

    #[test]
    fn merge_fail_strategy_raises_conflict() {
        let mut target = TheoryDescriptor::new("T", "@a x Is y").unwrap();
        let mut source = TheoryDescriptor::new("T", "@a x Is y").unwrap();
        target.ast.statements[0].object = "p".to_string();
        source.ast.statements[0].object = "q".to_string();
        let err = merge_theories(&target, &source, MergeStrategy::Fail).unwrap_err();
        assert!(matches!(err, SpockError::MergeConflict(_)));
    }

    #[test]
    fn merge_both_strategy_renames_source_declaration() {
        let mut target = TheoryDescriptor::new("T", "@a x Is y").unwrap();
        let mut source = TheoryDescriptor::new("T", "@a x Is y").unwrap();
        target.ast.statements[0].object = "p".to_string();
        source.ast.statements[0].object = "q".to_string();
        let merged = merge_theories(&target, &source, MergeStrategy::Both).unwrap();
        let names: Vec<&str> = merged.ast.statements.iter().map(|s| s.declaration.as_str()).collect();
        assert!(names.contains(&"a"));
        assert!(names.contains(&"a_merged"));
    }
}
