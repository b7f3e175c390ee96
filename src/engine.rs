//! EngineFactory + SessionApi (C15, C16): wires every component together
//! and exposes the seven-method surface real callers drive.
//!
//! `score` resolution prefers `@result`, then falls back to the last
//! statement in execution order whose declared symbol resolves to a
//! vector (covering both a bare trailing vector declaration and a verb
//! macro's internal `$result` reference, since both land in the same
//! symbol table once resolved).

use crate::config::Config;
use crate::constants::{self, Constants};
use crate::dsl::parser::parse_script;
use crate::error::{SpockError, SpockResult};
use crate::executor::{self, ExecutionContext};
use crate::result_theory;
use crate::session::{Session, SessionId, SessionManager};
use crate::theory::descriptor::TheoryDescriptor;
use crate::theory::store::TheoryStore;
use crate::trace::{trace_to_script, Trace, TraceLogger};
use crate::value::TypedValue;
use crate::vector::ops;
use crate::vector::space::VectorSpace;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome every `SessionApi` method returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    pub success: bool,
    pub score: f64,
    /// `2 * |score - 0.5|`: how far the truth projection sits from the
    /// undecided midpoint, independent of which side it lands on.
    pub confidence: f64,
    pub result_theory: String,
    pub execution_trace: String,
}

fn confidence_of(score: f64) -> f64 {
    2.0 * (score - 0.5).abs()
}

/// A running engine: shared configuration, vector space, theory store,
/// canonical constants, session bookkeeping, and the trace table.
pub struct Engine {
    config: Config,
    space: VectorSpace,
    theory_store: TheoryStore,
    globals: Arc<HashMap<String, TypedValue>>,
    sessions: SessionManager,
    traces: TraceLogger,
}

pub struct EngineFactory;

impl EngineFactory {
    /// Validates `config`, ensures the working folder exists, loads or
    /// generates `Truth`/`False`/`Zero`, and seeds the built-in theories.
    pub fn create(config: Config) -> SpockResult<Engine> {
        config.validate()?;
        std::fs::create_dir_all(&config.working_folder)
            .map_err(|e| SpockError::FolderAccess(format!("{}: {e}", config.working_folder.display())))?;

        let space = VectorSpace::new(
            config.dimensions,
            config.numeric_type,
            config.vector_generation,
            config.random_seed,
        );
        let Constants { truth, false_, zero } = constants::load_or_generate(&config, &space)?;

        let mut globals = HashMap::new();
        globals.insert("Truth".to_string(), TypedValue::Vector(truth));
        globals.insert("False".to_string(), TypedValue::Vector(false_));
        globals.insert("Zero".to_string(), TypedValue::Vector(zero));

        let theory_store = TheoryStore::new(config.theories_dir());
        theory_store.seed_builtins()?;

        Ok(Engine {
            config,
            space,
            theory_store,
            globals: Arc::new(globals),
            sessions: SessionManager::default(),
            traces: TraceLogger::new(),
        })
    }
}

impl Engine {
    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn get_global_symbols(&self) -> &HashMap<String, TypedValue> {
        &self.globals
    }

    pub fn list_theories(&self) -> SpockResult<Vec<String>> {
        self.theory_store.list()
    }

    pub fn load_theory(&self, name: &str) -> SpockResult<TheoryDescriptor> {
        self.theory_store.load(name)
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.active_session_count()
    }

    pub fn reap_idle_sessions(&self) -> usize {
        self.sessions.reap_expired()
    }

    /// Builds a fresh session, overlaying `initial_theories` in the order
    /// given — later names sit higher on the overlay stack and shadow
    /// earlier ones, per the session's normal LIFO resolution order.
    pub fn create_session(&self, initial_theories: &[String]) -> SpockResult<SessionApi<'_>> {
        let id: SessionId = Uuid::new_v4().to_string();
        self.sessions.register(id.clone());
        let mut session = Session::new(id.clone(), Arc::clone(&self.globals));
        for name in initial_theories {
            let descriptor = self.theory_store.load(name)?;
            session.overlay_theory(Arc::new(descriptor));
        }
        Ok(SessionApi { engine: self, session, id })
    }

    /// No persistent connections or background threads to release; present
    /// to close out the `createEngine`/`shutdown` lifecycle pair callers
    /// expect.
    pub fn shutdown(&self) {}
}

enum Mode {
    /// Success tracks execution outcome only; `score` is informational.
    Bare,
    /// Success additionally requires `score >= threshold`.
    Threshold(f64),
}

/// A session bound to its owning engine, exposing the seven reasoning
/// entry points over DSL text.
pub struct SessionApi<'a> {
    engine: &'a Engine,
    session: Session,
    id: SessionId,
}

impl<'a> SessionApi<'a> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Executes `script` against this session. Conventionally used to add
    /// facts/macros without asserting anything about the outcome's truth.
    pub fn learn(&mut self, script: &str) -> SpockResult<ApiResult> {
        self.run(script, Mode::Bare, false)
    }

    /// Executes `script` and reports its truth-projected `score`.
    pub fn ask(&mut self, script: &str) -> SpockResult<ApiResult> {
        self.run(script, Mode::Bare, false)
    }

    /// Like `ask`, but only succeeds when `score` clears a high bar.
    pub fn prove(&mut self, script: &str) -> SpockResult<ApiResult> {
        self.run(script, Mode::Threshold(0.9), false)
    }

    /// Like `ask`, but the returned trace carries per-step comments.
    pub fn explain(&mut self, script: &str) -> SpockResult<ApiResult> {
        self.run(script, Mode::Bare, true)
    }

    pub fn plan(&mut self, script: &str) -> SpockResult<ApiResult> {
        self.run(script, Mode::Bare, false)
    }

    pub fn solve(&mut self, script: &str) -> SpockResult<ApiResult> {
        self.run(script, Mode::Bare, false)
    }

    /// Like `ask`, but never asserts a threshold — used when the caller
    /// only wants the rendered `resultTheory`/`executionTrace` pair.
    pub fn summarise(&mut self, script: &str) -> SpockResult<ApiResult> {
        self.run(script, Mode::Bare, false)
    }

    fn run(&mut self, text: &str, mode: Mode, detailed: bool) -> SpockResult<ApiResult> {
        self.engine.sessions.touch(&self.id);
        let call_id = Uuid::new_v4().to_string();
        self.engine.traces.start_trace(call_id.clone());

        let ctx = ExecutionContext {
            space: &self.engine.space,
            theory_store: &self.engine.theory_store,
            config: &self.engine.config,
        };

        let run_result = parse_script(text).and_then(|script| {
            let mut trace = Trace::default();
            executor::execute_script(&ctx, &mut self.session, &script, &mut trace)?;
            Ok(trace)
        });

        let local_trace = match run_result {
            Ok(trace) => trace,
            Err(err) => {
                self.engine.traces.end_trace(&call_id);
                return Ok(ApiResult {
                    success: false,
                    score: 0.0,
                    confidence: confidence_of(0.0),
                    result_theory: result_theory::build_error(&err.to_string()),
                    execution_trace: String::new(),
                });
            }
        };

        for step in &local_trace.steps {
            self.engine.traces.log_step(&call_id, step.clone());
        }
        let completed = self.engine.traces.end_trace(&call_id).unwrap_or_default();

        let score = self.score(&local_trace)?;
        let success = match mode {
            Mode::Bare => true,
            Mode::Threshold(threshold) => score >= threshold,
        };
        let result_theory = result_theory::build_success(self.session.local_symbols(), &local_trace.steps, score);
        let execution_trace = trace_to_script(&completed, detailed);

        Ok(ApiResult {
            success,
            score,
            confidence: confidence_of(score),
            result_theory,
            execution_trace,
        })
    }

    fn score(&self, trace: &Trace) -> SpockResult<f64> {
        let vector = self
            .session
            .resolve("result")
            .and_then(|v| v.as_vector().cloned())
            .or_else(|| {
                trace
                    .steps
                    .iter()
                    .rev()
                    .filter(|step| !step.result_ref.is_empty())
                    .find_map(|step| self.session.resolve(&step.result_ref).and_then(|v| v.as_vector().cloned()))
            });
        let Some(vector) = vector else { return Ok(0.0) };
        let Some(truth) = self.engine.globals.get("Truth").and_then(TypedValue::as_vector) else {
            return Ok(0.0);
        };
        ops::distance(&vector, truth)
    }
}

impl Drop for SessionApi<'_> {
    fn drop(&mut self) {
        self.engine.sessions.close(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn engine(dir: &std::path::Path, seed: u32) -> Engine {
        let config = Config {
            dimensions: 64,
            working_folder: dir.to_path_buf(),
            random_seed: Some(seed),
            ..Config::default()
        };
        EngineFactory::create(config).unwrap()
    }

    #[test]
    fn truth_projection_of_truth_is_near_one_and_false_near_zero() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), 42);
        let mut session = engine.create_session(&[]).unwrap();

        let truth = session.ask("@result Truth Identity Truth").unwrap();
        assert!(truth.success);
        assert!((truth.score - 1.0).abs() < 1e-6, "score={}", truth.score);
        assert!((truth.confidence - 1.0).abs() < 1e-6);

        let falsy = session.ask("@result False Identity False").unwrap();
        assert!((falsy.score - 0.0).abs() < 1e-6, "score={}", falsy.score);
        assert!((falsy.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn prove_fails_below_threshold_but_ask_still_succeeds() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), 7);
        let mut session = engine.create_session(&[]).unwrap();

        let asked = session.ask("@result False Identity False").unwrap();
        assert!(asked.success);

        let proved = session.prove("@result False Identity False").unwrap();
        assert!(!proved.success);
        assert!((proved.score - 0.0).abs() < 1e-6);
    }

    #[test]
    fn explain_emits_a_detailed_trace() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), 3);
        let mut session = engine.create_session(&[]).unwrap();
        let result = session.explain("@a x Identity x").unwrap();
        assert!(result.execution_trace.lines().any(|l| l.starts_with('#')));
    }

    #[test]
    fn create_session_overlays_initial_theories() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), 11);
        let mut session = engine.create_session(&["BaseLogic".to_string()]).unwrap();
        let result = session.learn("@result cat Is mammal").unwrap();
        assert!(result.success);
        assert!(result.result_theory.contains("@confidence"));
    }

    #[test]
    fn parse_errors_surface_as_an_error_macro_without_failing_the_call() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), 5);
        let mut session = engine.create_session(&[]).unwrap();
        let result = session.ask("not a valid statement at all").unwrap();
        assert!(!result.success);
        assert!(result.result_theory.contains("@Error theory begin"));
    }

    #[test]
    fn dropping_a_session_closes_it_in_the_session_manager() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path(), 13);
        {
            let _session = engine.create_session(&[]).unwrap();
            assert_eq!(engine.active_session_count(), 1);
        }
        assert_eq!(engine.active_session_count(), 0);
    }
}
