//! TheoryStore (C9): directory-backed persistence for theory descriptors.

use crate::error::{SpockError, SpockResult};
use crate::theory::descriptor::{TheoryDescriptor, TheoryMetadata};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The shipped `BaseLogic` theory: `Is`, `And`, `Or`, `Implies`, `Not`,
/// `Evaluate` expressed as verb macros over the kernel primitives.
pub const BASE_LOGIC_SOURCE: &str = r"
@Is verb begin
  @result $subject Identity $object
end
@And verb begin
  @result $subject Bind $object
end
@Or verb begin
  @result $subject Add $object
end
@Not verb begin
  @result $subject Negate $subject
end
@Implies verb begin
  @antecedent $subject Negate $subject
  @result @antecedent Add $object
end
@Evaluate verb begin
  @result $subject Distance $object
end
";

/// Directory-backed store for named theory descriptors, with a per-name
/// write lock so concurrent saves to the same theory fail fast rather than
/// interleaving (spec.md §5).
pub struct TheoryStore {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TheoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TheoryStore {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    fn theory_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn source_path(&self, name: &str) -> PathBuf {
        self.theory_dir(name).join("theory.dsl")
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.theory_dir(name).join("metadata.json")
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn ensure_directory(&self) -> SpockResult<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| SpockError::FolderAccess(format!("{}: {e}", self.root.display())))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.source_path(name).is_file()
    }

    pub fn list(&self) -> SpockResult<Vec<String>> {
        self.ensure_directory()?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Persist `descriptor` under its own name. Fails fast with
    /// `TheoryBusy` if another caller is already saving the same name.
    pub fn save(&self, descriptor: &TheoryDescriptor) -> SpockResult<()> {
        let lock = self.lock_for(&descriptor.name);
        let Some(_guard) = lock.try_lock() else {
            return Err(SpockError::TheoryBusy(descriptor.name.clone()));
        };
        let dir = self.theory_dir(&descriptor.name);
        std::fs::create_dir_all(&dir)
            .map_err(|e| SpockError::FolderAccess(format!("{}: {e}", dir.display())))?;
        std::fs::write(self.source_path(&descriptor.name), &descriptor.source)?;
        std::fs::write(
            self.metadata_path(&descriptor.name),
            serde_json::to_vec_pretty(&descriptor.metadata)?,
        )?;
        Ok(())
    }

    pub fn load(&self, name: &str) -> SpockResult<TheoryDescriptor> {
        if !self.exists(name) {
            return Err(SpockError::TheoryNotFound(name.to_string()));
        }
        let source = std::fs::read_to_string(self.source_path(name))?;
        let metadata: TheoryMetadata = match std::fs::read(self.metadata_path(name)) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(_) => TheoryMetadata {
                version_id: crate::theory::descriptor::fresh_version_id(),
                parent_version_id: None,
                merged_from: None,
                created_at: chrono::Utc::now(),
            },
        };
        let mut descriptor = TheoryDescriptor::new(name, source)?;
        descriptor.metadata = metadata;
        Ok(descriptor)
    }

    pub fn delete(&self, name: &str) -> SpockResult<()> {
        if !self.exists(name) {
            return Err(SpockError::TheoryNotFound(name.to_string()));
        }
        std::fs::remove_dir_all(self.theory_dir(name))?;
        Ok(())
    }

    /// Bootstraps the shipped theories. Idempotent: existing theories are
    /// left untouched.
    pub fn seed_builtins(&self) -> SpockResult<()> {
        self.ensure_directory()?;
        if !self.exists("BaseLogic") {
            let descriptor = TheoryDescriptor::new("BaseLogic", BASE_LOGIC_SOURCE)?;
            self.save(&descriptor)?;
        }
        Ok(())
    }
}

/// Used by tests that want an in-memory (non-persisted) theory map, e.g.
/// for versioning scenarios that never touch disk.
pub type InMemoryTheories = HashMap<String, TheoryDescriptor>;

pub fn theories_root_under(working_folder: &Path) -> PathBuf {
    working_folder.join("theories")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = TheoryStore::new(dir.path());
        let descriptor = TheoryDescriptor::new("Foo", "@a x Is y").unwrap();
        store.save(&descriptor).unwrap();
        let loaded = store.load("Foo").unwrap();
        assert_eq!(loaded.source, descriptor.source);
        assert_eq!(loaded.metadata.version_id, descriptor.metadata.version_id);
    }

    #[test]
    fn load_missing_theory_errors() {
        let dir = tempdir().unwrap();
        let store = TheoryStore::new(dir.path());
        assert!(matches!(store.load("Nope"), Err(SpockError::TheoryNotFound(_))));
    }

    #[test]
    fn seed_builtins_installs_base_logic() {
        let dir = tempdir().unwrap();
        let store = TheoryStore::new(dir.path());
        store.seed_builtins().unwrap();
        assert!(store.exists("BaseLogic"));
        let loaded = store.load("BaseLogic").unwrap();
        assert_eq!(loaded.ast.macros.len(), 6);
    }

    #[test]
    fn concurrent_save_to_same_name_is_busy() {
        let dir = tempdir().unwrap();
        let store = TheoryStore::new(dir.path());
        let descriptor = TheoryDescriptor::new("Foo", "@a x Is y").unwrap();
        let lock = store.lock_for("Foo");
        let _guard = lock.lock();
        assert!(matches!(store.save(&descriptor), Err(SpockError::TheoryBusy(_))));
    }

    #[test]
    fn list_returns_sorted_names() {
        let dir = tempdir().unwrap();
        let store = TheoryStore::new(dir.path());
        store.save(&TheoryDescriptor::new("Zeta", "@a x Is y").unwrap()).unwrap();
        store.save(&TheoryDescriptor::new("Alpha", "@a x Is y").unwrap()).unwrap();
        assert_eq!(store.list().unwrap(), vec!["Alpha".to_string(), "Zeta".to_string()]);
    }
}
