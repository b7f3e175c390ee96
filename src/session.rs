//! SessionManager (C8): local/overlay/global symbol table and typed
//! values.
//!
//! Resolution order for a name is local -> overlays (newest first) ->
//! global. `setSymbol` always writes to the local map, shadowing overlays.

use crate::theory::descriptor::TheoryDescriptor;
use crate::value::TypedValue;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type SessionId = String;

/// One entry on a session's overlay stack: either a persisted/in-memory
/// theory, or a snapshot of a parent session's locals (for child
/// sessions, per spec.md §3 "Lifecycles").
#[derive(Clone)]
pub enum Overlay {
    Theory(Arc<TheoryDescriptor>),
    Snapshot(Arc<HashMap<String, TypedValue>>),
}

impl Overlay {
    fn lookup(&self, name: &str) -> Option<TypedValue> {
        match self {
            Overlay::Theory(theory) => {
                if let Some(v) = theory.symbols.get(name) {
                    return Some(v.clone());
                }
                if let Some(v) = theory.vectors.get(name) {
                    return Some(TypedValue::Vector(v.clone()));
                }
                theory
                    .ast
                    .macros
                    .iter()
                    .find(|m| m.name == name)
                    .map(|m| TypedValue::Macro(Box::new(m.clone())))
            }
            Overlay::Snapshot(locals) => locals.get(name).cloned(),
        }
    }
}

fn strip_prefix(name: &str) -> &str {
    name.trim_start_matches(['@', '$'])
}

/// A running execution context: local symbols, an overlay stack (LIFO),
/// and the global symbols (`Truth`, `False`, `Zero`).
#[derive(Clone)]
pub struct Session {
    pub id: SessionId,
    local_symbols: HashMap<String, TypedValue>,
    overlays: Vec<Overlay>,
    globals: Arc<HashMap<String, TypedValue>>,
}

impl Session {
    pub fn new(id: SessionId, globals: Arc<HashMap<String, TypedValue>>) -> Self {
        Session {
            id,
            local_symbols: HashMap::new(),
            overlays: Vec::new(),
            globals,
        }
    }

    /// Resolve a name (with or without `@`/`$` prefix) through local,
    /// overlay, then global scope.
    pub fn resolve(&self, name: &str) -> Option<TypedValue> {
        let bare = strip_prefix(name);
        if let Some(v) = self.local_symbols.get(bare) {
            return Some(v.clone());
        }
        for overlay in self.overlays.iter().rev() {
            if let Some(v) = overlay.lookup(bare) {
                return Some(v);
            }
        }
        self.globals.get(bare).cloned()
    }

    /// Writes always land in the local map, shadowing overlays.
    pub fn set_symbol(&mut self, name: &str, value: TypedValue) {
        self.local_symbols.insert(strip_prefix(name).to_string(), value);
    }

    pub fn overlay_theory(&mut self, theory: Arc<TheoryDescriptor>) {
        self.overlays.push(Overlay::Theory(theory));
    }

    pub fn pop_overlay(&mut self) -> Option<Overlay> {
        self.overlays.pop()
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn local_symbols(&self) -> &HashMap<String, TypedValue> {
        &self.local_symbols
    }

    /// Builds a child session: overlays and globals are shared, and the
    /// parent's current locals are inserted as the topmost overlay
    /// snapshot (immutable from the child's perspective).
    pub fn child(&self, id: SessionId) -> Session {
        let mut overlays = self.overlays.clone();
        overlays.push(Overlay::Snapshot(Arc::new(self.local_symbols.clone())));
        Session {
            id,
            local_symbols: HashMap::new(),
            overlays,
            globals: Arc::clone(&self.globals),
        }
    }

    /// A fresh scope that shares this session's overlays/globals but has
    /// its own local symbol table — used by the executor to run a
    /// user-defined verb macro body without polluting the caller's scope.
    pub fn nested_scope(&self) -> Session {
        Session {
            id: format!("{}::nested", self.id),
            local_symbols: HashMap::new(),
            overlays: self.overlays.clone(),
            globals: Arc::clone(&self.globals),
        }
    }
}

struct SessionMeta {
    created_at: Instant,
    last_touched: Instant,
}

/// Process-wide tracker for active sessions: idle reap and basic stats.
/// The actual `Session` value (local symbols, overlays) is owned by
/// whoever created it (typically `SessionApi`); this only tracks
/// lifecycle metadata by id.
pub struct SessionManager {
    sessions: DashMap<SessionId, SessionMeta>,
    idle_timeout: Duration,
    created_total: AtomicU64,
    reaped_total: AtomicU64,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        SessionManager {
            sessions: DashMap::new(),
            idle_timeout,
            created_total: AtomicU64::new(0),
            reaped_total: AtomicU64::new(0),
        }
    }

    pub fn register(&self, id: SessionId) {
        let now = Instant::now();
        self.sessions.insert(
            id,
            SessionMeta {
                created_at: now,
                last_touched: now,
            },
        );
        self.created_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn touch(&self, id: &SessionId) {
        if let Some(mut meta) = self.sessions.get_mut(id) {
            meta.last_touched = Instant::now();
        }
    }

    pub fn close(&self, id: &SessionId) {
        self.sessions.remove(id);
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Removes sessions untouched for longer than the configured idle
    /// timeout, returning how many were reaped.
    pub fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| now.duration_since(entry.last_touched) > self.idle_timeout)
            .map(|entry| entry.key().clone())
            .collect();
        for id in &expired {
            self.sessions.remove(id);
        }
        self.reaped_total.fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    pub fn created_total(&self) -> u64 {
        self.created_total.load(Ordering::Relaxed)
    }

    pub fn reaped_total(&self) -> u64 {
        self.reaped_total.load(Ordering::Relaxed)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        SessionManager::new(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumericType;
    use crate::vector::space::Hypervector;

    fn globals() -> Arc<HashMap<String, TypedValue>> {
        let mut g = HashMap::new();
        g.insert(
            "Truth".to_string(),
            TypedValue::Vector(Hypervector::zero(8, NumericType::Float32)),
        );
        Arc::new(g)
    }

    #[test]
    fn local_shadows_overlay_shadows_global() {
        let mut session = Session::new("s1".into(), globals());
        session.set_symbol("@Truth", TypedValue::Scalar(0.5));
        assert_eq!(session.resolve("Truth").unwrap().as_scalar(), Some(0.5));
    }

    #[test]
    fn overlays_consulted_newest_first() {
        let mut session = Session::new("s1".into(), globals());
        let older = TheoryDescriptor::new("Older", "@a x Is y").unwrap();
        let mut newer = TheoryDescriptor::new("Newer", "@b x Is y").unwrap();
        newer
            .symbols
            .insert("shared".to_string(), TypedValue::String("newer".into()));
        let mut older2 = older;
        older2
            .symbols
            .insert("shared".to_string(), TypedValue::String("older".into()));
        session.overlay_theory(Arc::new(older2));
        session.overlay_theory(Arc::new(newer));
        match session.resolve("shared") {
            Some(TypedValue::String(s)) => assert_eq!(s, "newer"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn child_session_sees_parent_locals_as_overlay() {
        let mut parent = Session::new("parent".into(), globals());
        parent.set_symbol("@x", TypedValue::String("from-parent".into()));
        let child = parent.child("child".into());
        match child.resolve("x") {
            Some(TypedValue::String(s)) => assert_eq!(s, "from-parent"),
            other => panic!("unexpected {other:?}"),
        }
        // Child writes do not leak back to parent.
        let mut child = child;
        child.set_symbol("@x", TypedValue::String("from-child".into()));
        assert!(matches!(parent.resolve("x"), Some(TypedValue::String(s)) if s == "from-parent"));
    }

    #[test]
    fn session_manager_tracks_and_reaps() {
        let manager = SessionManager::new(Duration::from_millis(0));
        manager.register("a".into());
        assert_eq!(manager.active_session_count(), 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(manager.reap_expired(), 1);
        assert_eq!(manager.active_session_count(), 0);
    }
}
