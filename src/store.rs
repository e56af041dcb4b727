//! Persistence of the latest spec per `(project, module)`.
//!
//! Writes are last-write-wins upserts; there is no history.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::types::{DashboardSpec, Module};

const DEFAULT_PROJECT: &str = "_default";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecKey {
    pub project: Option<String>,
    pub module: Module,
}

impl SpecKey {
    pub fn new(project: Option<&str>, module: Module) -> Self {
        SpecKey {
            project: project.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string),
            module,
        }
    }

    fn project_dir(&self) -> &str {
        self.project.as_deref().unwrap_or(DEFAULT_PROJECT)
    }
}

pub trait SpecStore {
    /// Insert or replace the dashboard stored under `key`.
    fn upsert(&self, key: &SpecKey, spec: &DashboardSpec) -> StoreResult<()>;

    /// The stored spec for `key`, if any.
    fn latest(&self, key: &SpecKey) -> StoreResult<Option<DashboardSpec>>;
}

/// One JSON file per key: `<root>/<project|_default>/<module>.json`.
#[derive(Debug, Clone)]
pub struct FileSpecStore {
    root: PathBuf,
}

impl FileSpecStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSpecStore { root: root.into() }
    }

    pub fn path_for(&self, key: &SpecKey) -> PathBuf {
        self.root
            .join(sanitize(key.project_dir()))
            .join(format!("{}.json", key.module.as_str()))
    }
}

// Project ids end up as directory names.
fn sanitize(project: &str) -> String {
    project
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl SpecStore for FileSpecStore {
    fn upsert(&self, key: &SpecKey, spec: &DashboardSpec) -> StoreResult<()> {
        let path = self.path_for(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;
        }
        let json = serde_json::to_string_pretty(spec)?;
        // Write then rename so a reader never sees a half-written file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        info!(path = %path.display(), module = %key.module, "stored dashboard spec");
        Ok(())
    }

    fn latest(&self, key: &SpecKey) -> StoreResult<Option<DashboardSpec>> {
        let path = self.path_for(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored spec");
                return Ok(None);
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let spec = serde_json::from_str(&text).map_err(|source| StoreError::Corrupt { path, source })?;
        Ok(Some(spec))
    }
}

/// Process-local store, used by tests and one-shot pipelines.
#[derive(Debug, Default)]
pub struct MemorySpecStore {
    specs: Mutex<HashMap<SpecKey, DashboardSpec>>,
}

impl MemorySpecStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.specs.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpecStore for MemorySpecStore {
    fn upsert(&self, key: &SpecKey, spec: &DashboardSpec) -> StoreResult<()> {
        // A poisoned lock only means another writer panicked mid-insert;
        // the map itself is still usable.
        let mut specs = self.specs.lock().unwrap_or_else(|e| e.into_inner());
        specs.insert(key.clone(), spec.clone());
        Ok(())
    }

    fn latest(&self, key: &SpecKey) -> StoreResult<Option<DashboardSpec>> {
        let specs = self.specs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(specs.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn spec_at(hour: u32) -> DashboardSpec {
        aggregate(Module::Cost, &[], Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap())
    }

    #[test]
    fn file_store_upserts_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSpecStore::new(dir.path());
        let key = SpecKey::new(Some("tower-a"), Module::Cost);

        assert_eq!(store.latest(&key).unwrap(), None);
        store.upsert(&key, &spec_at(1)).unwrap();
        store.upsert(&key, &spec_at(2)).unwrap();

        assert_eq!(store.latest(&key).unwrap(), Some(spec_at(2)));
        assert!(dir.path().join("tower-a").join("cost.json").is_file());
        assert!(!dir.path().join("tower-a").join("cost.json.tmp").exists());
    }

    #[test]
    fn missing_project_uses_default_dir() {
        let store = FileSpecStore::new("/srv/argus");
        let key = SpecKey::new(Some("  "), Module::Manpower);
        assert_eq!(key.project, None);
        assert_eq!(store.path_for(&key), PathBuf::from("/srv/argus/_default/manpower.json"));
        let odd = SpecKey::new(Some("../etc"), Module::Cost);
        assert_eq!(store.path_for(&odd), PathBuf::from("/srv/argus/___etc/cost.json"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSpecStore::new(dir.path());
        let key = SpecKey::new(None, Module::Progress);
        let path = store.path_for(&key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(store.latest(&key), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn memory_store_keys_by_project_and_module() {
        let store = MemorySpecStore::new();
        store.upsert(&SpecKey::new(None, Module::Cost), &spec_at(1)).unwrap();
        store.upsert(&SpecKey::new(Some("p1"), Module::Cost), &spec_at(2)).unwrap();
        store.upsert(&SpecKey::new(None, Module::Cost), &spec_at(3)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.latest(&SpecKey::new(None, Module::Cost)).unwrap(), Some(spec_at(3)));
        assert_eq!(store.latest(&SpecKey::new(None, Module::Equipment)).unwrap(), None);
    }
}
