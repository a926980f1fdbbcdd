#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Standalone pass/fail audits over a curriculum repository. They share no
//! state with grading and never run external tools.

/// Broken relative links in markdown files.
pub mod links;
/// Rubric totals, check types and identifiers.
pub mod rubrics;
/// Required module and exercise files.
pub mod tree;

use std::fmt::{self, Display};

pub use links::audit_links;
pub use rubrics::audit_rubrics;
pub use tree::audit_tree;

/// Findings of one audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// Heading printed above the issue list.
    heading: &'static str,
    /// Line printed when nothing was found.
    ok_line: &'static str,
    /// One line per problem.
    issues:  Vec<String>,
}

impl AuditReport {
    /// Creates a report from its findings.
    pub fn new(heading: &'static str, ok_line: &'static str, issues: Vec<String>) -> Self {
        Self {
            heading,
            ok_line,
            issues,
        }
    }

    /// Whether the audit found nothing.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Returns the findings.
    pub fn issues(&self) -> &[String] {
        &self.issues
    }
}

impl Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "OK: {}", self.ok_line);
        }
        writeln!(f, "{}:", self.heading)?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}
