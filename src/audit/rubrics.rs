#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::HashSet, path::Path};

use anyhow::Result;
use serde_json::Value;
use walkdir::WalkDir;

use super::AuditReport;
use crate::constants::{CHECK_TYPES, EXPECTED_TOTAL_POINTS};

/// Checks every `rubric.json` under `root`: points must total exactly
/// [`EXPECTED_TOTAL_POINTS`], check types must be known, ids must be unique.
///
/// The documents are read as loose JSON so that one bad check does not hide
/// the others.
pub fn audit_rubrics(root: &Path) -> Result<AuditReport> {
    let mut issues = Vec::new();

    let rubric_files = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == "rubric.json");

    for entry in rubric_files {
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .display()
            .to_string();

        let document = std::fs::read_to_string(entry.path())
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_json::from_str::<Value>(&text).map_err(anyhow::Error::from));
        let document = match document {
            Ok(document) => document,
            Err(e) => {
                issues.push(format!("{rel} unreadable: {e}"));
                continue;
            }
        };

        issues.extend(rubric_issues(&rel, &document));
    }

    tracing::debug!(issues = issues.len(), "rubric audit finished");
    Ok(AuditReport::new("Rubric issues", "rubrics valid and sum to 100", issues))
}

/// Problems with one parsed rubric document.
fn rubric_issues(rel: &str, document: &Value) -> Vec<String> {
    let mut issues = Vec::new();
    let checks = document
        .get("checks")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let total: u64 = checks
        .iter()
        .filter_map(|c| c.get("points").and_then(Value::as_u64))
        .sum();
    if total != u64::from(EXPECTED_TOTAL_POINTS) {
        issues.push(format!("{rel} points={total}"));
    }

    let mut seen = HashSet::new();
    for check in checks {
        let kind = check.get("type").and_then(Value::as_str);
        if !kind.is_some_and(|k| CHECK_TYPES.contains(&k)) {
            issues.push(format!("{rel} unknown type {}", kind.unwrap_or("<none>")));
        }
        if let Some(id) = check.get("id").and_then(Value::as_str)
            && !seen.insert(id)
        {
            issues.push(format!("{rel} duplicate id {id}"));
        }
    }

    issues
}
