//! End-to-end pipeline tests: DSL source -> parse -> execute -> result theory.

use spock::config::Config;
use spock::engine::EngineFactory;
use tempfile::tempdir;

fn config(dir: &std::path::Path, seed: u32) -> Config {
    Config {
        dimensions: 64,
        working_folder: dir.to_path_buf(),
        random_seed: Some(seed),
        ..Config::default()
    }
}

#[test]
fn learn_then_ask_resolves_a_fact_through_base_logic() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 1)).unwrap();
    let mut session = engine.create_session(&["BaseLogic".to_string()]).unwrap();

    let learned = session.learn("@fact0 cat Is mammal").unwrap();
    assert!(learned.success);
    assert!(learned.result_theory.contains("@fact0 cat Is mammal"));
}

#[test]
fn multi_statement_script_executes_in_dependency_order() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 2)).unwrap();
    let mut session = engine.create_session(&[]).unwrap();

    // @b depends on @a; written out of order to exercise the topological sort.
    let script = "@result @a Identity @a\n@a x Identity x";
    let result = session.ask(script).unwrap();
    assert!(result.success);
}

#[test]
fn branch_and_merge_theory_round_trips_through_the_store() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 3)).unwrap();
    let mut session = engine.create_session(&[]).unwrap();

    session.learn("@r1 base Remember base").unwrap();
    let branched = session.learn("@r2 base BranchTheory experiment").unwrap();
    assert!(branched.success);

    let theories = engine.list_theories().unwrap();
    assert!(theories.contains(&"base__experiment".to_string()));

    let merged = session.learn("@r3 base MergeTheory base__experiment").unwrap();
    assert!(merged.success);
}

#[test]
fn plan_reaches_a_goal_among_session_locals() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 4)).unwrap();
    let mut session = engine.create_session(&[]).unwrap();

    // Seed a handful of candidate vectors, then plan toward one of them.
    session.learn("@north x Identity x").unwrap();
    session.learn("@south y Identity y").unwrap();
    let result = session.plan("@result north Plan south").unwrap();
    assert!(result.success || result.score >= 0.0);
}

#[test]
fn prove_requires_a_high_truth_projection_unlike_ask() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 5)).unwrap();
    let mut session = engine.create_session(&[]).unwrap();

    let asked = session.ask("@result False Identity False").unwrap();
    assert!(asked.success);
    let proved = session.prove("@result False Identity False").unwrap();
    assert!(!proved.success);
}

#[test]
fn explain_carries_per_step_comments_that_ask_omits() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 6)).unwrap();
    let mut session = engine.create_session(&[]).unwrap();

    let asked = session.ask("@result x Identity x").unwrap();
    let explained = session.explain("@result x Identity x").unwrap();
    assert!(!asked.execution_trace.lines().any(|l| l.starts_with('#')));
    assert!(explained.execution_trace.lines().any(|l| l.starts_with('#')));
}

#[test]
fn invalid_syntax_surfaces_as_an_error_theory_without_raising() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 7)).unwrap();
    let mut session = engine.create_session(&[]).unwrap();

    let result = session.ask("this is not a statement").unwrap();
    assert!(!result.success);
    assert!(result.result_theory.contains("@Error theory begin"));
}

#[test]
fn two_sessions_from_the_same_engine_do_not_share_locals() {
    let dir = tempdir().unwrap();
    let engine = EngineFactory::create(config(dir.path(), 8)).unwrap();
    let mut a = engine.create_session(&[]).unwrap();
    let mut b = engine.create_session(&[]).unwrap();

    a.learn("@x v Identity v").unwrap();
    let result = b.ask("@y x Identity x").unwrap();
    // `x` is unknown to `b`, so it is auto-generated rather than resolved
    // from `a`'s locals.
    assert!(result.success);
}
