//! Executor (C11): dispatch over a script AST against a session.
//!
//! Verb resolution precedence: kernel verbs, numeric verbs, planning verbs
//! (`Plan`, `Solve`), theory verbs (`UseTheory`, `Remember`, `BranchTheory`,
//! `MergeTheory`), special verbs (`Evaluate`, `Persist`), then user-defined
//! verb macros found in the session/overlays. Tiers are tried in order;
//! a tier that doesn't recognise the verb name (or whose operands don't
//! fit its contract) falls through to the next.

use crate::config::Config;
use crate::dsl::ast::{MacroKind, Script, Statement};
use crate::dsl::dependency::DependencyGraph;
use crate::error::{SpockError, SpockResult};
use crate::planner::{self, Candidate, Constraint};
use crate::session::Session;
use crate::theory::descriptor::TheoryDescriptor;
use crate::theory::store::TheoryStore;
use crate::theory::versioning::{self, MergeStrategy};
use crate::trace::{Trace, TraceStep};
use crate::value::{Fact, TheoryHandle, TypedValue};
use crate::vector::ops::{self, Moduland};
use crate::vector::space::VectorSpace;
use std::collections::HashMap;
use tracing::debug_span;

/// Everything the executor needs beyond the session and the trace: a
/// vector space for fresh/auto-generated vectors, the theory store for
/// theory verbs, and the resolved config.
pub struct ExecutionContext<'a> {
    pub space: &'a VectorSpace,
    pub theory_store: &'a TheoryStore,
    pub config: &'a Config,
}

/// Runs a whole script against `session`, logging every statement into
/// `trace`. Macros are registered first (in source order), then top-level
/// statements run as their own single-statement bodies.
pub fn execute_script(
    ctx: &ExecutionContext,
    session: &mut Session,
    script: &Script,
    trace: &mut Trace,
) -> SpockResult<()> {
    for macro_def in &script.macros {
        register_macro(ctx, session, macro_def, trace)?;
    }
    for stmt in &script.statements {
        run_body(ctx, session, std::slice::from_ref(stmt), trace)?;
    }
    Ok(())
}

fn register_macro(
    ctx: &ExecutionContext,
    session: &mut Session,
    macro_def: &crate::dsl::ast::Macro,
    trace: &mut Trace,
) -> SpockResult<()> {
    match macro_def.kind {
        MacroKind::Verb => {
            session.set_symbol(&macro_def.name, TypedValue::Macro(Box::new(macro_def.clone())));
        }
        MacroKind::Theory => {
            let descriptor = TheoryDescriptor::new(&macro_def.name, macro_def.to_dsl())?;
            session.overlay_theory(std::sync::Arc::new(descriptor));
        }
        MacroKind::Session => {
            let mut child = session.nested_scope();
            run_body(ctx, &mut child, &macro_def.body, trace)?;
            // Discarded at `end`: the child's locals never propagate back.
        }
    }
    Ok(())
}

fn run_body(
    ctx: &ExecutionContext,
    session: &mut Session,
    body: &[Statement],
    trace: &mut Trace,
) -> SpockResult<()> {
    let graph = DependencyGraph::build(body);
    let order = graph.topological_order()?;
    let by_decl: HashMap<&str, &Statement> =
        body.iter().map(|s| (s.declaration.as_str(), s)).collect();

    for decl in order {
        let stmt = by_decl[decl.as_str()];
        let span = debug_span!("statement", declaration = %stmt.declaration, verb = %stmt.verb);
        let _guard = span.enter();

        let subject = resolve_operand(ctx, session, &stmt.subject, trace)?;
        let object = resolve_operand(ctx, session, &stmt.object, trace)?;
        let result = dispatch(ctx, session, &stmt.verb, &stmt.subject, &stmt.object, subject, object, trace)?;

        trace.steps.push(TraceStep {
            dsl_statement: stmt.to_source(),
            subject_ref: stmt.subject.clone(),
            verb: stmt.verb.clone(),
            object_ref: stmt.object.clone(),
            result_ref: format!("@{}", stmt.declaration),
            output: result.summarize(),
        });
        session.set_symbol(&stmt.declaration, result);
    }
    Ok(())
}

/// Resolves a subject/object token through the session, auto-generating a
/// fresh random unit vector for unknown *bare* identifiers (no `@`/`$`
/// prefix) and recording the replay-faithful `# auto-generated: <name>`
/// trace comment. An unresolved `@`-declaration or `$`-magic-var reference
/// is a genuine symbol resolution failure, not a name to mint.
fn resolve_operand(
    ctx: &ExecutionContext,
    session: &mut Session,
    token: &str,
    trace: &mut Trace,
) -> SpockResult<TypedValue> {
    if let Some(value) = session.resolve(token) {
        return Ok(value);
    }
    if token.starts_with(['@', '$']) {
        return Err(SpockError::SymbolResolution(token.to_string()));
    }
    let fresh = VectorSpace::normalise(&ctx.space.create_random());
    session.set_symbol(token, TypedValue::Vector(fresh.clone()));
    trace.push_comment(format!("# auto-generated: {token}"));
    Ok(TypedValue::Vector(fresh))
}

#[allow(clippy::too_many_arguments)]
fn dispatch(
    ctx: &ExecutionContext,
    session: &mut Session,
    verb: &str,
    subject_tok: &str,
    object_tok: &str,
    subject: TypedValue,
    object: TypedValue,
    trace: &mut Trace,
) -> SpockResult<TypedValue> {
    if let Some(result) = try_kernel(verb, &subject, &object)? {
        return Ok(result);
    }
    if let Some(result) = try_numeric(verb, &subject, &object, object_tok)? {
        return Ok(result);
    }
    if let Some(result) = try_planning(ctx, verb, session, &subject, &object)? {
        return Ok(result);
    }
    if let Some(result) = try_theory(ctx, session, verb, subject_tok, object_tok)? {
        return Ok(result);
    }
    if let Some(result) = try_special(ctx, verb, session, subject_tok, &subject, &object)? {
        return Ok(result);
    }
    if let Some(macro_def) = session.resolve(verb).and_then(|v| match v {
        TypedValue::Macro(m) if m.kind == MacroKind::Verb => Some(*m),
        _ => None,
    }) {
        return invoke_verb_macro(ctx, session, &macro_def, subject, object, trace);
    }
    Err(SpockError::VerbNotFound(verb.to_string()))
}

fn try_kernel(verb: &str, subject: &TypedValue, object: &TypedValue) -> SpockResult<Option<TypedValue>> {
    let (Some(a), maybe_b) = (subject.as_vector(), object.as_vector()) else {
        return Ok(None);
    };
    let result = match verb {
        "Add" => maybe_b.map(|b| ops::add(a, b)).transpose()?.map(TypedValue::Vector),
        "Bind" => maybe_b.map(|b| ops::bind(a, b)).transpose()?.map(TypedValue::Vector),
        "Negate" => Some(TypedValue::Vector(ops::negate(a))),
        "Distance" => maybe_b
            .map(|b| ops::distance(a, b))
            .transpose()?
            .map(TypedValue::Scalar),
        "Move" => maybe_b.map(|b| ops::move_to(a, b)).transpose()?.map(TypedValue::Vector),
        "Modulate" => {
            let operand = match object {
                TypedValue::Scalar(s) => Moduland::Scalar(*s),
                TypedValue::Vector(v) => Moduland::Vector(v),
                _ => return Ok(None),
            };
            Some(TypedValue::Vector(ops::modulate(a, operand)?))
        }
        "Identity" => Some(TypedValue::Vector(ops::identity(a))),
        "Normalise" => Some(TypedValue::Vector(ops::normalise(a))),
        _ => None,
    };
    Ok(result)
}

fn try_numeric(
    verb: &str,
    subject: &TypedValue,
    object: &TypedValue,
    object_tok: &str,
) -> SpockResult<Option<TypedValue>> {
    if verb == "AttachUnit" {
        let TypedValue::Numeric(n) = subject else { return Ok(None) };
        return Ok(Some(TypedValue::Numeric(n.attach_unit(object_tok))));
    }
    if verb == "ProjectUnit" {
        let TypedValue::Numeric(n) = subject else { return Ok(None) };
        return Ok(Some(TypedValue::Scalar(n.project_unit(object_tok)?)));
    }
    let (TypedValue::Numeric(a), TypedValue::Numeric(b)) = (subject, object) else {
        return Ok(None);
    };
    let result = match verb {
        "Add" => Some(a.add(b)?),
        "Sub" => Some(a.sub(b)?),
        "Mul" => Some(a.mul(b)),
        "Div" => Some(a.div(b)?),
        _ => None,
    };
    Ok(result.map(TypedValue::Numeric))
}

fn try_planning(
    ctx: &ExecutionContext,
    verb: &str,
    session: &Session,
    subject: &TypedValue,
    object: &TypedValue,
) -> SpockResult<Option<TypedValue>> {
    match verb {
        "Plan" => {
            let (Some(current), Some(goal)) = (subject.as_vector(), object.as_vector()) else {
                return Ok(None);
            };
            let candidates: Vec<Candidate> = session
                .local_symbols()
                .iter()
                .filter_map(|(name, value)| {
                    value.as_vector().map(|v| Candidate {
                        verb: "Move".to_string(),
                        object_name: name.clone(),
                        vector: v.clone(),
                    })
                })
                .collect();
            let result = planner::plan(
                current,
                goal,
                &candidates,
                ctx.config.planning_epsilon,
                ctx.config.max_planning_steps,
                ctx.config.plateau_strategy,
                || ctx.space.create_random(),
                None,
                None,
            )?;
            Ok(Some(TypedValue::Plan(Box::new(result))))
        }
        "Solve" => {
            let (Some(state), Some(target)) = (subject.as_vector(), object.as_vector()) else {
                return Ok(None);
            };
            let constraints = vec![Constraint {
                name: "object".to_string(),
                vector: target.clone(),
                min_similarity: 0.9,
            }];
            let result = planner::solve(
                state,
                &constraints,
                ctx.config.planning_epsilon,
                ctx.config.max_planning_steps,
                None,
            )?;
            Ok(Some(TypedValue::Solution(Box::new(result))))
        }
        _ => Ok(None),
    }
}

/// `MergeTheory`'s object token may carry `"<sourceName>:<strategy>"` to
/// select a non-default conflict policy within the fixed three-token
/// statement grammar.
fn parse_merge_object(object_tok: &str) -> (&str, MergeStrategy) {
    match object_tok.split_once(':') {
        Some((name, "source")) => (name, MergeStrategy::Source),
        Some((name, "both")) => (name, MergeStrategy::Both),
        Some((name, "consensus")) => (name, MergeStrategy::Consensus),
        Some((name, "fail")) => (name, MergeStrategy::Fail),
        Some((name, _)) => (name, MergeStrategy::Target),
        None => (object_tok, MergeStrategy::Target),
    }
}

fn try_theory(
    ctx: &ExecutionContext,
    session: &mut Session,
    verb: &str,
    subject_tok: &str,
    object_tok: &str,
) -> SpockResult<Option<TypedValue>> {
    let result = match verb {
        "UseTheory" => {
            let descriptor = std::sync::Arc::new(ctx.theory_store.load(object_tok)?);
            let handle = handle_of(&descriptor);
            session.overlay_theory(descriptor);
            Some(handle)
        }
        "Remember" => {
            let source = format!("@{object_tok} {subject_tok} Is {subject_tok}");
            let descriptor = TheoryDescriptor::new(object_tok, source)?;
            ctx.theory_store.save(&descriptor)?;
            Some(handle_of(&descriptor))
        }
        "BranchTheory" => {
            let base = ctx.theory_store.load(subject_tok)?;
            let branched = versioning::branch_theory(&base, object_tok);
            ctx.theory_store.save(&branched)?;
            Some(handle_of(&branched))
        }
        "MergeTheory" => {
            let target = ctx.theory_store.load(subject_tok)?;
            let (source_name, strategy) = parse_merge_object(object_tok);
            let source = ctx.theory_store.load(source_name)?;
            let merged = versioning::merge_theories(&target, &source, strategy)?;
            ctx.theory_store.save(&merged)?;
            Some(handle_of(&merged))
        }
        _ => None,
    };
    Ok(result)
}

fn handle_of(descriptor: &TheoryDescriptor) -> TypedValue {
    TypedValue::Theory(TheoryHandle {
        name: descriptor.name.clone(),
        version_id: descriptor.version_id().to_string(),
    })
}

fn try_special(
    ctx: &ExecutionContext,
    verb: &str,
    session: &Session,
    subject_tok: &str,
    subject: &TypedValue,
    object: &TypedValue,
) -> SpockResult<Option<TypedValue>> {
    match verb {
        "Evaluate" => {
            let (Some(a), Some(b)) = (subject.as_vector(), object.as_vector()) else {
                return Ok(None);
            };
            Ok(Some(TypedValue::Scalar(ops::distance(a, b)?)))
        }
        "Persist" => {
            let Some(overlay) = session.overlays().iter().rev().find_map(|o| match o {
                crate::session::Overlay::Theory(t) if t.name == subject_tok => Some(t.clone()),
                _ => None,
            }) else {
                return Err(SpockError::TheoryNotFound(subject_tok.to_string()));
            };
            ctx.theory_store.save(&overlay)?;
            Ok(Some(handle_of(&overlay)))
        }
        _ => Ok(None),
    }
}

fn invoke_verb_macro(
    ctx: &ExecutionContext,
    session: &mut Session,
    macro_def: &crate::dsl::ast::Macro,
    subject: TypedValue,
    object: TypedValue,
    trace: &mut Trace,
) -> SpockResult<TypedValue> {
    let mut scope = session.nested_scope();
    scope.set_symbol("subject", subject);
    scope.set_symbol("object", object);
    run_body(ctx, &mut scope, &macro_def.body, trace)?;
    scope
        .resolve("result")
        .ok_or_else(|| SpockError::MissingResult(macro_def.name.clone()))
}

/// Builds a `Fact` TypedValue, used by callers assembling semantic facts
/// directly rather than through `Is`/`Has`/etc. dispatch.
pub fn fact(subject: impl Into<String>, verb: impl Into<String>, object: impl Into<String>) -> TypedValue {
    TypedValue::Fact(Box::new(Fact {
        subject: subject.into(),
        verb: verb.into(),
        object: object.into(),
        truth: None,
    }))
}
