#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use super::AuditReport;

/// Link targets that point off the repository.
const REMOTE_PREFIXES: &[&str] = &["http://", "https://", "mailto:"];

/// The local part of a link target, or `None` when there is nothing to check.
fn local_target(target: &str) -> Option<&str> {
    let target = target.trim();
    if REMOTE_PREFIXES.iter().any(|p| target.starts_with(p)) {
        return None;
    }
    let path = target.split('#').next().unwrap_or_default();
    (!path.is_empty()).then_some(path)
}

/// Finds relative links in markdown files under `root` whose target exists
/// neither beside the file nor relative to `root`.
pub fn audit_links(root: &Path) -> Result<AuditReport> {
    let link = Regex::new(r"\[[^\]]+\]\(([^)]+)\)").context("link pattern")?;
    let mut issues = Vec::new();

    let markdown = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "md")
        });

    for entry in markdown {
        let path = entry.path();
        let Ok(text) = std::fs::read_to_string(path) else {
            tracing::debug!(file = %path.display(), "skipping unreadable markdown");
            continue;
        };
        let base = path.parent().unwrap_or(root);
        let rel = path.strip_prefix(root).unwrap_or(path).display().to_string();

        for caps in link.captures_iter(&text) {
            let Some(target) = caps.get(1).and_then(|m| local_target(m.as_str())) else {
                continue;
            };
            if !base.join(target).exists() && !root.join(target).exists() {
                issues.push(format!("{rel} -> {target}"));
            }
        }
    }

    tracing::debug!(issues = issues.len(), "link audit finished");
    Ok(AuditReport::new("Broken links", "no broken relative links", issues))
}
