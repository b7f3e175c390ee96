//! DependencyGraph (C7): per-macro DAG and deterministic topological sort.
//!
//! References to symbols outside the macro body (theories, globals,
//! undeclared identifiers) are ignored here; they are resolved at run time
//! through the session.

use crate::dsl::ast::Statement;
use crate::error::{SpockError, SpockResult};
use std::collections::{BTreeSet, HashMap};

/// Dependency DAG over one macro body's declarations.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// declaration name -> line number (for deterministic tie-breaking)
    nodes: HashMap<String, usize>,
    /// declaration name -> set of declarations it depends on
    edges: HashMap<String, BTreeSet<String>>,
}

fn normalize_ref(token: &str) -> String {
    token.trim_start_matches(['@', '$']).to_string()
}

impl DependencyGraph {
    /// Build the graph for one macro body. Nodes are the body's own
    /// declarations; an edge `A -> B` exists iff `A`'s subject or object
    /// names declaration `B`.
    pub fn build(body: &[Statement]) -> Self {
        let mut nodes = HashMap::new();
        for stmt in body {
            nodes.insert(stmt.declaration.clone(), stmt.line);
        }
        let mut edges: HashMap<String, BTreeSet<String>> =
            nodes.keys().map(|k| (k.clone(), BTreeSet::new())).collect();
        for stmt in body {
            for token in [&stmt.subject, &stmt.object] {
                let name = normalize_ref(token);
                if name != stmt.declaration && nodes.contains_key(&name) {
                    edges.get_mut(&stmt.declaration).unwrap().insert(name);
                }
            }
        }
        DependencyGraph { nodes, edges }
    }

    /// Kahn's algorithm; ties broken by ascending source line number so the
    /// order is stable across runs and implementations.
    pub fn topological_order(&self) -> SpockResult<Vec<String>> {
        // in_degree[n] = number of unresolved dependencies of n
        let mut in_degree: HashMap<String, usize> = self
            .nodes
            .keys()
            .map(|n| (n.clone(), self.edges[n].len()))
            .collect();
        // reverse_edges[dep] = nodes that depend on `dep`
        let mut dependents: HashMap<String, Vec<String>> =
            self.nodes.keys().map(|n| (n.clone(), Vec::new())).collect();
        for (node, deps) in &self.edges {
            for dep in deps {
                dependents.get_mut(dep).unwrap().push(node.clone());
            }
        }

        let mut ready: Vec<String> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(n, _)| n.clone())
            .collect();
        sort_by_line(&mut ready, &self.nodes);

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = pop_smallest_line(&mut ready, &self.nodes) {
            order.push(node.clone());
            for dependent in dependents[&node].clone() {
                let deg = in_degree.get_mut(&dependent).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.push(dependent);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let cycle = self.find_one_cycle(&order);
            return Err(SpockError::Cycle { cycle });
        }
        Ok(order)
    }

    /// Report one offending cycle among nodes that never reached in-degree
    /// zero, by walking dependency edges from an unresolved node.
    fn find_one_cycle(&self, resolved: &[String]) -> String {
        let resolved: BTreeSet<&String> = resolved.iter().collect();
        let Some(start) = self.nodes.keys().find(|n| !resolved.contains(n)) else {
            return "<unknown>".to_string();
        };
        let mut path = vec![start.clone()];
        let mut visited = BTreeSet::new();
        let mut current = start.clone();
        loop {
            if !visited.insert(current.clone()) {
                break;
            }
            let Some(next) = self.edges[&current].iter().find(|d| !resolved.contains(d)) else {
                break;
            };
            current = next.clone();
            path.push(current.clone());
            if path.iter().filter(|n| **n == current).count() > 1 {
                break;
            }
        }
        path.push(start.clone());
        path.join(" -> ")
    }
}

fn sort_by_line(names: &mut [String], nodes: &HashMap<String, usize>) {
    names.sort_by_key(|n| nodes[n]);
}

fn pop_smallest_line(ready: &mut Vec<String>, nodes: &HashMap<String, usize>) -> Option<String> {
    if ready.is_empty() {
        return None;
    }
    let (idx, _) = ready
        .iter()
        .enumerate()
        .min_by_key(|(_, n)| nodes[*n])
        .unwrap();
    Some(ready.remove(idx))
}
