//! Instance Registry
//!
//! Hands out one shared engine per storage path so that every caller in
//! the process sees the same in-memory state. The registry is an explicit
//! object: callers own it and pass it around, there is no global.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;

/// Path → engine cache
#[derive(Default)]
pub struct Registry {
    /// Live engines keyed by normalized data directory
    instances: Mutex<HashMap<PathBuf, Engine>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the engine for `config.data_dir`, opening it on first use.
    ///
    /// Only the first open of a path applies `config`; later opens return
    /// the existing engine unchanged.
    pub fn open(&self, config: Config) -> Result<Engine> {
        let path = normalize(&config.data_dir)?;

        // Held across construction so one path is never opened twice
        let mut instances = self.instances.lock();
        if let Some(engine) = instances.get(&path) {
            tracing::debug!("Reusing open index at {}", path.display());
            return Ok(engine.clone());
        }

        let engine = Engine::open(config)?;
        instances.insert(path, engine.clone());
        Ok(engine)
    }

    /// Open a path with default config
    pub fn open_path(&self, path: &Path) -> Result<Engine> {
        self.open(Config::builder().data_dir(path).build())
    }

    /// The engine registered for `path`, if any
    pub fn get(&self, path: &Path) -> Option<Engine> {
        let path = normalize(path).ok()?;
        self.instances.lock().get(&path).cloned()
    }

    /// Number of registered engines
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }

    /// Force-flush every engine and forget them all.
    ///
    /// Every engine is flushed even if an earlier one fails; the first
    /// error is returned.
    pub fn close_all(&self) -> Result<()> {
        let engines: Vec<(PathBuf, Engine)> = self.instances.lock().drain().collect();

        let mut first_error = None;
        for (path, engine) in engines {
            if let Err(e) = engine.flush(true) {
                tracing::error!("Failed to flush {} on close: {}", path.display(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Absolute, symlink-resolved form of `path`.
///
/// Paths that do not exist yet resolve through their parent so the result
/// stays stable once the directory is created.
fn normalize(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Ok(canonical);
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    let absolute: PathBuf = absolute.components().collect();

    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent) {
            Ok(parent) => Ok(parent.join(name)),
            Err(_) => Ok(absolute),
        },
        _ => Ok(absolute),
    }
}
