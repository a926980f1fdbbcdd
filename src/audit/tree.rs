#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use anyhow::{Context, Result};

use super::AuditReport;
use crate::discovery::modules_dir;

/// Entries every module directory needs.
const MODULE_FILES: &[&str] = &[
    "README.md",
    "overview.md",
    "troubleshooting.md",
    "references.md",
    "artifacts/README.md",
    "checklists/mastery.md",
    "checklists/validation.md",
    "checklists/review.md",
];

/// Entries every exercise directory needs.
const EXERCISE_ENTRIES: &[&str] = &[
    "README.md",
    "troubleshooting.md",
    "references.md",
    "learner/CMakeLists.txt",
    "learner/include",
    "learner/src",
    "learner/tests",
    "learner/artifacts",
    "solution/CMakeLists.txt",
    "solution/include",
    "solution/src",
    "solution/tests",
    "solution/artifacts",
    "grading/rubric.json",
    "grading/expected",
    "grading/checks",
];

/// Sorted subdirectories of `dir`.
fn subdirs(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut dirs: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Could not list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Checks that every module and exercise has the files the curriculum
/// layout requires.
pub fn audit_tree(root: &Path) -> Result<AuditReport> {
    let modules = modules_dir(root);
    if !modules.is_dir() {
        anyhow::bail!("modules directory {} does not exist", modules.display());
    }

    let mut issues = Vec::new();
    for module in subdirs(&modules)? {
        let module_name = module
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        issues.extend(
            MODULE_FILES
                .iter()
                .filter(|rel| !module.join(rel).exists())
                .map(|rel| format!("{module_name} missing {rel}")),
        );

        let exercises = module.join("exercises");
        if !exercises.is_dir() {
            issues.push(format!("{module_name} missing exercises/"));
            continue;
        }

        for exercise in subdirs(&exercises)? {
            let exercise_name = exercise
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            issues.extend(
                EXERCISE_ENTRIES
                    .iter()
                    .filter(|rel| !exercise.join(rel).exists())
                    .map(|rel| format!("{module_name}/{exercise_name} missing {rel}")),
            );
        }
    }

    tracing::debug!(issues = issues.len(), "tree audit finished");
    Ok(AuditReport::new(
        "Missing files",
        "modules and exercises have all required files",
        issues,
    ))
}
