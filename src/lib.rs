//! # modgrade
//!
//! A rubric-driven grader for module-based exercise curricula. Every module
//! ships a `grading/rubric.json` listing typed checks worth a number of
//! points; `modgrade` runs each check against external build, test and
//! formatting tools, folds the results into a score, and reports what to fix
//! first.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Repository-level auditors for rubrics, module trees and markdown links.
pub mod audit;
/// Run configuration shared by every check of a grading invocation.
pub mod config;
/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Locating gradable modules on disk.
pub mod discovery;
/// For all things related to grading
pub mod grade;
/// Spawning external tools with deadlines and cancellation.
pub mod process;
/// Rendering reports for terminals and machines.
pub mod render;
/// The rubric document and its load-time validation.
pub mod rubric;
/// Tool discovery on `PATH` and the environment snapshot.
pub mod tools;

pub use config::{Capabilities, GraderConfig};
pub use grade::{Grader, ModuleReport, Outcome, Status};
pub use rubric::{Check, CheckKind, Rubric, RubricError};
