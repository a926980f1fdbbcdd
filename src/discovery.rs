#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::{Path, PathBuf};

use crate::constants::{MODULES_DIR, RUBRIC_PATH};

/// Failures to find what the operator asked to grade. Reported before any
/// grading starts.
#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    /// `<root>/modules` does not exist.
    #[error("modules directory {} does not exist", .0.display())]
    MissingModulesDir(PathBuf),
    /// No module matched the selector.
    #[error("Module {0} not found")]
    NotFound(String),
    /// The modules directory could not be listed.
    #[error("could not list {}: {source}", path.display())]
    Io {
        /// Directory being listed.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Which modules an invocation grades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSelector {
    /// Every discovered module.
    All,
    /// A module directory path, or a prefix of a module's directory name
    /// (`01` selects `01_foundations`).
    One(String),
}

/// `<root>/modules`.
pub fn modules_dir(root: &Path) -> PathBuf {
    root.join(MODULES_DIR)
}

/// Lists module directories under `<root>/modules` that carry a rubric,
/// sorted by name.
pub fn discover_modules(root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let dir = modules_dir(root);
    if !dir.is_dir() {
        return Err(DiscoveryError::MissingModulesDir(dir));
    }

    let entries = std::fs::read_dir(&dir).map_err(|source| DiscoveryError::Io {
        path: dir.clone(),
        source,
    })?;

    let mut modules: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join(RUBRIC_PATH).is_file())
        .collect();
    modules.sort();

    tracing::debug!(count = modules.len(), dir = %dir.display(), "discovered modules");
    Ok(modules)
}

/// Resolves a selector to the module directories to grade, in discovery
/// order.
pub fn resolve(root: &Path, selector: &ModuleSelector) -> Result<Vec<PathBuf>, DiscoveryError> {
    let wanted = match selector {
        ModuleSelector::All => return discover_modules(root),
        ModuleSelector::One(wanted) => wanted,
    };

    let as_path = Path::new(wanted);
    if as_path.is_dir() {
        return Ok(vec![as_path.to_path_buf()]);
    }

    discover_modules(root)?
        .into_iter()
        .find(|module| {
            module
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(wanted.as_str()))
        })
        .map(|module| vec![module])
        .ok_or_else(|| DiscoveryError::NotFound(wanted.clone()))
}
