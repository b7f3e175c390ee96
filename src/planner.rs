//! Planner (C12): semantic gradient-descent `Plan` and `Solve`.
//!
//! Both loops are synchronous and bound themselves by `maxSteps` rather
//! than an external cancellation mechanism; callers that need to interrupt
//! a long-running plan pass a [`CancelToken`], checked once per iteration
//! (spec.md §9, "Cooperative suspension").

use crate::config::PlateauStrategy;
use crate::error::{SpockError, SpockResult};
use crate::vector::ops;
use crate::vector::space::{Hypervector, VectorSpace};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative cancellation flag, checked once per planner iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One accepted step of a `Plan` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub verb: String,
    pub object_name: String,
    pub distance_before: f64,
    pub distance_after: f64,
}

/// Result of `Plan(current, goal)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResult {
    pub success: bool,
    pub steps: Vec<PlanStep>,
    pub trace: Vec<String>,
    pub final_distance: f64,
    pub total_steps: usize,
    pub final_state: Hypervector,
}

/// A named candidate action: binding `object_name` via `verb` moves the
/// state toward `vector`.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub verb: String,
    pub object_name: String,
    pub vector: Hypervector,
}

struct Scored<'a> {
    candidate: &'a Candidate,
    next: Hypervector,
    score: f64,
}

fn best_candidate<'a>(state: &Hypervector, goal: &Hypervector, candidates: &'a [Candidate]) -> SpockResult<Option<Scored<'a>>> {
    let mut best: Option<Scored<'a>> = None;
    for candidate in candidates {
        let next = VectorSpace::normalise(&VectorSpace::add(state, &candidate.vector)?);
        let cos = VectorSpace::cosine_similarity(&next, goal)?;
        let score = 1.0 - cos;
        if best.as_ref().is_none_or(|b| score < b.score) {
            best = Some(Scored { candidate, next, score });
        }
    }
    Ok(best)
}

/// `Plan(current, goal)` via semantic gradient descent.
#[allow(clippy::too_many_arguments)]
pub fn plan(
    current: &Hypervector,
    goal: &Hypervector,
    candidates: &[Candidate],
    epsilon: f64,
    max_steps: usize,
    strategy: PlateauStrategy,
    mut random_unit: impl FnMut() -> Hypervector,
    mut procedural_fallback: Option<&mut dyn FnMut(&Hypervector, &Hypervector) -> Option<Hypervector>>,
    cancel: Option<&CancelToken>,
) -> SpockResult<PlanResult> {
    let mut state = VectorSpace::clone_vec(current);
    let mut steps = Vec::new();
    let mut trace = Vec::new();
    let mut current_dist = 1.0 - VectorSpace::cosine_similarity(&state, goal)?;
    let mut plateau_count = 0usize;
    let mut step = 0usize;

    while current_dist >= epsilon && step < max_steps {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            trace.push("# cancelled".to_string());
            break;
        }
        let Some(best) = best_candidate(&state, goal, candidates)? else {
            trace.push("# no candidates available".to_string());
            break;
        };
        let improvement = current_dist - best.score;

        if improvement <= 0.0 {
            match strategy {
                PlateauStrategy::Fail => {
                    trace.push("# plateau: failing".to_string());
                    return Err(SpockError::PlanFailure {
                        reason: "plateau".to_string(),
                    });
                }
                PlateauStrategy::RandomRestart => {
                    let nudge = random_unit();
                    state = VectorSpace::normalise(&VectorSpace::add(
                        &state,
                        &VectorSpace::scale(&nudge, 0.1),
                    )?);
                    trace.push("# plateau: random_restart".to_string());
                }
                PlateauStrategy::ProceduralFallback => {
                    let fallback = procedural_fallback
                        .as_deref_mut()
                        .and_then(|f| f(&state, goal));
                    match fallback {
                        Some(next) => {
                            state = next;
                            trace.push("# plateau: procedural_fallback".to_string());
                        }
                        None => {
                            trace.push("# plateau: no fallback registered, failing".to_string());
                            return Err(SpockError::PlanFailure {
                                reason: "plateau".to_string(),
                            });
                        }
                    }
                }
            }
        } else {
            state = best.next;
            steps.push(PlanStep {
                verb: best.candidate.verb.clone(),
                object_name: best.candidate.object_name.clone(),
                distance_before: current_dist,
                distance_after: best.score,
            });
            trace.push(format!(
                "# step {}: {} {} -> distance {:.4}",
                step + 1,
                best.candidate.verb,
                best.candidate.object_name,
                best.score
            ));
        }

        let new_dist = 1.0 - VectorSpace::cosine_similarity(&state, goal)?;
        if (current_dist - new_dist).abs() < epsilon / 10.0 {
            plateau_count += 1;
        } else {
            plateau_count = 0;
        }
        current_dist = new_dist;
        step += 1;
        if plateau_count >= 3 && strategy == PlateauStrategy::Fail {
            trace.push("# plateau: 3 consecutive near-zero deltas".to_string());
            return Err(SpockError::PlanFailure {
                reason: "plateau".to_string(),
            });
        }
    }

    Ok(PlanResult {
        success: current_dist < epsilon,
        steps,
        trace,
        final_distance: current_dist,
        total_steps: step,
        final_state: state,
    })
}

/// One constraint `Solve` relaxes toward.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub vector: Hypervector,
    pub min_similarity: f64,
}

/// Result of `Solve(state, constraints)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionResult {
    pub success: bool,
    pub solution: Hypervector,
    pub trace: Vec<String>,
    pub violations: Vec<(String, f64)>,
    pub total_steps: usize,
}

fn violation(state: &Hypervector, constraint: &Constraint) -> SpockResult<f64> {
    let cos = VectorSpace::cosine_similarity(state, &constraint.vector)?;
    Ok(constraint.min_similarity - cos)
}

/// `Solve(state, constraints)` via iterative constraint relaxation.
pub fn solve(
    state: &Hypervector,
    constraints: &[Constraint],
    epsilon: f64,
    max_steps: usize,
    cancel: Option<&CancelToken>,
) -> SpockResult<SolutionResult> {
    let mut current = VectorSpace::clone_vec(state);
    let mut trace = Vec::new();
    let mut step = 0usize;

    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            trace.push("# cancelled".to_string());
            break;
        }
        let mut violations = Vec::with_capacity(constraints.len());
        let mut max_violation = 0.0f64;
        for constraint in constraints {
            let v = violation(&current, constraint)?;
            violations.push((constraint.name.clone(), v));
            if v > max_violation {
                max_violation = v;
            }
        }
        if max_violation <= epsilon || step >= max_steps {
            let success = max_violation <= epsilon;
            return Ok(SolutionResult {
                success,
                solution: current,
                trace,
                violations,
                total_steps: step,
            });
        }
        for constraint in constraints {
            let v = violation(&current, constraint)?;
            if v > 0.0 {
                let push = VectorSpace::scale(&constraint.vector, 0.5 * v);
                current = VectorSpace::normalise(&VectorSpace::add(&current, &push)?);
                trace.push(format!(
                    "# step {}: relax '{}' (violation {:.4})",
                    step + 1,
                    constraint.name,
                    v
                ));
            }
        }
        step += 1;
    }

    let violations: Result<Vec<(String, f64)>, SpockError> = constraints
        .iter()
        .map(|c| violation(&current, c).map(|v| (c.name.clone(), v)))
        .collect();
    let violations = violations?;
    Ok(SolutionResult {
        success: false,
        solution: current,
        trace,
        violations,
        total_steps: step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumericType;

    fn v(values: &[f64]) -> Hypervector {
        Hypervector::from_values(NumericType::Float64, values.to_vec())
    }

    #[test]
    fn plan_happy_path_terminates_in_one_step() {
        let current = VectorSpace::normalise(&v(&[1.0, 0.0, 0.0]));
        let goal = VectorSpace::normalise(&v(&[0.0, 1.0, 0.0]));
        let action = VectorSpace::add(&goal, &VectorSpace::scale(&current, -1.0)).unwrap();
        let candidates = vec![
            Candidate {
                verb: "Move".into(),
                object_name: "toward_goal".into(),
                vector: action,
            },
            Candidate {
                verb: "Move".into(),
                object_name: "orthogonal".into(),
                vector: v(&[0.0, 0.0, 1.0]),
            },
        ];
        let result = plan(
            &current,
            &goal,
            &candidates,
            0.05,
            100,
            PlateauStrategy::Fail,
            || v(&[1.0, 1.0, 1.0]),
            None,
            None,
        )
        .unwrap();
        assert!(result.success);
        assert_eq!(result.total_steps, 1);
        assert!(result.final_distance < 0.05);
    }

    #[test]
    fn plan_fails_on_plateau_with_fail_strategy() {
        let current = VectorSpace::normalise(&v(&[1.0, 0.0]));
        let goal = VectorSpace::normalise(&v(&[-1.0, 0.0]));
        // every candidate pushes orthogonally, so distance never improves
        let candidates = vec![Candidate {
            verb: "Move".into(),
            object_name: "noop".into(),
            vector: v(&[0.0, 0.0]),
        }];
        let result = plan(
            &current,
            &goal,
            &candidates,
            0.01,
            10,
            PlateauStrategy::Fail,
            || v(&[0.0, 1.0]),
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn solve_converges_when_constraint_already_satisfied() {
        let state = VectorSpace::normalise(&v(&[1.0, 0.0]));
        let constraints = vec![Constraint {
            name: "c1".into(),
            vector: VectorSpace::normalise(&v(&[1.0, 0.0])),
            min_similarity: 0.5,
        }];
        let result = solve(&state, &constraints, 0.05, 50, None).unwrap();
        assert!(result.success);
        assert_eq!(result.total_steps, 0);
    }

    #[test]
    fn solve_relaxes_toward_unmet_constraint() {
        let state = VectorSpace::normalise(&v(&[1.0, 0.0]));
        let constraints = vec![Constraint {
            name: "c1".into(),
            vector: VectorSpace::normalise(&v(&[0.0, 1.0])),
            min_similarity: 0.9,
        }];
        let result = solve(&state, &constraints, 0.05, 200, None).unwrap();
        assert!(result.success);
        let cos = VectorSpace::cosine_similarity(&result.solution, &constraints[0].vector).unwrap();
        assert!(cos >= 0.9 - 1e-6);
    }
}
