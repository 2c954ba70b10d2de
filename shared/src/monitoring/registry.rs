//! Hierarchical registry of named counters and report functions.

use super::visitor::{report_int, Mode, Reporting, Visitor};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Errors that can occur while building a registry tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitoringError {
    /// The name is already taken in the target registry.
    #[error("monitoring name already registered: '{0}'")]
    DuplicateName(String),

    /// A path segment resolves to a value instead of a registry.
    #[error("monitoring name '{0}' is not a registry")]
    NotARegistry(String),

    /// Empty names and empty path segments are rejected.
    #[error("monitoring name cannot be empty")]
    EmptyName,
}

/// A monotonically increasing integer counter.
///
/// Counts are monotonic for the process lifetime; overflow is out of scope.
#[derive(Debug, Default)]
pub struct Int(AtomicI64);

impl Int {
    /// Increments the counter by one.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `n` to the counter.
    pub fn add(&self, n: i64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

type ReportFn = dyn Fn(Mode, &mut dyn Visitor) + Send + Sync;

#[derive(Clone)]
enum Entry {
    Int(Arc<Int>),
    Registry(Arc<Registry>),
    Func(Arc<ReportFn>),
}

/// A named node in the monitoring tree.
///
/// Entries are visited in name order. Registries are shared through `Arc`,
/// so a registry handed to a component stays attached to the tree.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<BTreeMap<String, (Entry, Reporting)>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Registry")
            .field("entries", &entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Creates an empty root registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registry at the dotted `path`, creating missing segments.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment is empty or already names a value.
    pub fn new_registry(&self, path: &str) -> Result<Arc<Registry>, MonitoringError> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = self.child_registry(first)?;
        for segment in segments {
            current = current.child_registry(segment)?;
        }
        Ok(current)
    }

    /// Looks up an existing registry by dotted path.
    #[must_use]
    pub fn get_registry(&self, path: &str) -> Option<Arc<Registry>> {
        let mut segments = path.split('.');
        let mut current = self.lookup_registry(segments.next()?)?;
        for segment in segments {
            current = current.lookup_registry(segment)?;
        }
        Some(current)
    }

    /// Registers a new counter under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::DuplicateName`] if `name` is taken.
    pub fn new_int(&self, name: &str) -> Result<Arc<Int>, MonitoringError> {
        let counter = Arc::new(Int::default());
        self.insert(name, Entry::Int(Arc::clone(&counter)), Reporting::Report)?;
        Ok(counter)
    }

    /// Registers a report function.
    ///
    /// The function is invoked on every visit and writes its keys directly
    /// into this registry's level of the report; `name` only identifies the
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`MonitoringError::DuplicateName`] if `name` is taken.
    pub fn add_func<F>(&self, name: &str, reporting: Reporting, f: F) -> Result<(), MonitoringError>
    where
        F: Fn(Mode, &mut dyn Visitor) + Send + Sync + 'static,
    {
        self.insert(name, Entry::Func(Arc::new(f)), reporting)
    }

    /// Walks this registry, bracketed by start/finish markers.
    pub fn visit(&self, mode: Mode, v: &mut dyn Visitor) {
        // Clone the entries out so report functions run without the lock held.
        let entries: Vec<(String, Entry)> = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter(|(_, (_, reporting))| reporting.visible_in(mode))
                .map(|(name, (entry, _))| (name.clone(), entry.clone()))
                .collect()
        };

        v.on_registry_start();
        for (name, entry) in entries {
            match entry {
                Entry::Int(counter) => report_int(v, &name, counter.get()),
                Entry::Registry(registry) => {
                    v.on_key(&name);
                    registry.visit(mode, v);
                }
                Entry::Func(f) => f(mode, v),
            }
        }
        v.on_registry_finished();
    }

    fn insert(&self, name: &str, entry: Entry, reporting: Reporting) -> Result<(), MonitoringError> {
        if name.is_empty() {
            return Err(MonitoringError::EmptyName);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(name) {
            return Err(MonitoringError::DuplicateName(name.to_string()));
        }
        entries.insert(name.to_string(), (entry, reporting));
        Ok(())
    }

    fn child_registry(&self, name: &str) -> Result<Arc<Registry>, MonitoringError> {
        if name.is_empty() {
            return Err(MonitoringError::EmptyName);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(name) {
            Some((Entry::Registry(registry), _)) => Ok(Arc::clone(registry)),
            Some(_) => Err(MonitoringError::NotARegistry(name.to_string())),
            None => {
                let registry = Arc::new(Registry::new());
                entries.insert(
                    name.to_string(),
                    (Entry::Registry(Arc::clone(&registry)), Reporting::Report),
                );
                Ok(registry)
            }
        }
    }

    fn lookup_registry(&self, name: &str) -> Option<Arc<Registry>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(name) {
            Some((Entry::Registry(registry), _)) => Some(Arc::clone(registry)),
            _ => None,
        }
    }
}
