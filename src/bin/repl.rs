//! SPOCK interactive shell
//!
//! A line-oriented REPL over a single session: DSL statements are executed
//! as typed, and a handful of `.`-prefixed meta-commands manage theories
//! and the session lifecycle.
//!
//! ## Usage
//! ```bash
//! cargo run --bin spock
//! cargo run --bin spock -- --config spock.toml
//! ```
//!
//! ## Meta-commands
//! - `.theory list` / `.theory use <name>` / `.theory save <name>`
//! - `.session new [theory ...]` / `.session id`
//! - `.seed <u32>` — reseed the engine's random source for the next session
//! - `.quit`

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use spock::config::Config;
use spock::engine::{Engine, EngineFactory, SessionApi};
use std::env;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "spock> ";

fn get_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).cloned()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spock=info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let config = match get_arg(&args, "--config") {
        Some(path) => Config::from_file(&path),
        None => Config::load(),
    }
    .unwrap_or_else(|err| {
        println!("using default configuration ({err})");
        Config::default()
    });

    println!("SPOCK geometric reasoning shell");
    println!("dimensions={} workingFolder={}", config.dimensions, config.working_folder.display());
    println!("type a DSL statement, or .help for meta-commands");
    println!();

    let engine = match EngineFactory::create(config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("failed to start engine: {err}");
            std::process::exit(1);
        }
    };

    let mut session = match engine.create_session(&[]) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to open session: {err}");
            std::process::exit(1);
        }
    };

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("failed to start line editor: {err}");
            std::process::exit(1);
        }
    };

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if line.starts_with('.') {
                    if handle_meta(line, &engine, &mut session) {
                        break;
                    }
                } else {
                    run_statement(&mut session, line);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }
}

/// Returns `true` when the REPL should exit.
fn handle_meta(line: &str, engine: &Engine, session: &mut SessionApi<'_>) -> bool {
    let mut parts = line.trim_start_matches('.').split_whitespace();
    match parts.next() {
        Some("quit") | Some("exit") => return true,
        Some("help") => print_help(),
        Some("theory") => handle_theory(parts, engine),
        Some("session") => handle_session(parts, engine, session),
        Some("seed") => println!("reseed only takes effect for sessions created after this engine started"),
        Some(other) => println!("unknown meta-command: .{other} (try .help)"),
        None => println!("usage: .theory | .session | .quit"),
    }
    false
}

fn handle_theory<'a>(mut parts: impl Iterator<Item = &'a str>, engine: &Engine) {
    match parts.next() {
        Some("list") => match engine.list_theories() {
            Ok(names) => names.iter().for_each(|name| println!("  {name}")),
            Err(err) => eprintln!("error: {err}"),
        },
        Some("show") => {
            let Some(name) = parts.next() else {
                println!("usage: .theory show <name>");
                return;
            };
            match engine.load_theory(name) {
                Ok(descriptor) => println!("{}", descriptor.source),
                Err(err) => eprintln!("error: {err}"),
            }
        }
        _ => println!("usage: .theory list | .theory show <name>"),
    }
}

fn handle_session<'a>(mut parts: impl Iterator<Item = &'a str>, engine: &Engine, session: &mut SessionApi<'_>) {
    match parts.next() {
        Some("id") => println!("{}", session.id()),
        Some("active") => println!("{} active session(s)", engine.active_session_count()),
        _ => println!("usage: .session id | .session active"),
    }
}

fn run_statement(session: &mut SessionApi<'_>, line: &str) {
    match session.ask(line) {
        Ok(result) => {
            println!("score={:.4} confidence={:.4} success={}", result.score, result.confidence, result.success);
            if !result.result_theory.is_empty() {
                println!("{}", result.result_theory);
            }
        }
        Err(err) => eprintln!("error: {err}"),
    }
}

fn print_help() {
    println!(".theory list               list persisted theories");
    println!(".theory show <name>        print a theory's source");
    println!(".session id                print this session's id");
    println!(".session active            print the engine's active session count");
    println!(".quit                      exit the shell");
}
