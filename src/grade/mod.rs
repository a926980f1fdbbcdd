#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Check executors, one per check type.
pub mod executors;
/// The skip/deny policy applied before executors.
pub mod gate;
/// Outcome and verdict types.
pub mod outcome;
/// Report building and score arithmetic.
pub mod report;

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use futures::{FutureExt, StreamExt, TryStreamExt, stream};
pub use gate::GateDecision;
pub use outcome::{Outcome, Status, Verdict};
pub use report::{ModuleReport, overall_mean};

use self::executors::ExecContext;
use crate::{
    config::GraderConfig,
    constants::EXPECTED_TOTAL_POINTS,
    process::CancelToken,
    rubric::{Check, Rubric},
    tools::{EnvSnapshot, ToolProbe},
};

/// Interprets rubrics. One grader serves one invocation: its tool cache and
/// environment snapshot are never reused by a later run.
#[derive(Debug)]
pub struct Grader {
    /// Run configuration.
    config:    GraderConfig,
    /// Tool presence cache for this run.
    probe:     ToolProbe,
    /// Environment snapshot attached to every report.
    env:       EnvSnapshot,
    /// Run-wide cancellation.
    cancel:    CancelToken,
    /// Serializes external processes, which all share the grading root as
    /// working directory and therefore its build trees.
    root_lock: tokio::sync::Mutex<()>,
}

impl Grader {
    /// Creates a grader and captures the environment snapshot.
    pub fn new(config: GraderConfig) -> Self {
        let probe = ToolProbe::new();
        let env = EnvSnapshot::capture(&probe);
        Self {
            config,
            probe,
            env,
            cancel: CancelToken::new(),
            root_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the cancellation token, e.g. with one wired to Ctrl-C.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the run configuration.
    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Returns the environment snapshot shared by all reports of this run.
    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// Returns a handle to this run's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Grades the module rooted at `module_dir`.
    ///
    /// Only configuration problems (unreadable or invalid rubric) are errors;
    /// every check-level problem ends up in an outcome.
    pub async fn grade(&self, module_dir: &Path) -> Result<ModuleReport> {
        let module = module_name(module_dir);
        let rubric = Rubric::for_module(module_dir)
            .with_context(|| format!("Could not load rubric for module {module}"))?;

        let possible = rubric.possible();
        if possible != EXPECTED_TOTAL_POINTS {
            tracing::warn!(
                module = %module,
                possible,
                "rubric points do not add up to {EXPECTED_TOTAL_POINTS}"
            );
        }
        if possible == 0 {
            tracing::warn!(module = %module, "rubric has no points to earn, score will be 0.0");
        }

        tracing::info!(module = %module, checks = rubric.checks().len(), "grading");
        let start = Instant::now();
        let mut results = Vec::with_capacity(rubric.checks().len());
        for check in rubric.checks() {
            results.push(self.grade_check(check, module_dir).await);
        }
        let runtime = start.elapsed();

        let report = ModuleReport::build(module, results, possible, runtime, self.env.clone());
        tracing::info!(
            module = report.module(),
            score = report.score(),
            earned = report.earned(),
            possible = report.possible(),
            "graded"
        );
        Ok(report)
    }

    /// Grades several modules, at most [`GraderConfig::jobs`] at a time.
    /// Reports come back in the order of `module_dirs`. File checks overlap
    /// freely; external processes still run one at a time.
    pub async fn grade_all(&self, module_dirs: &[PathBuf]) -> Result<Vec<ModuleReport>> {
        stream::iter(module_dirs.iter().map(|dir| self.grade(dir)))
            .buffered(self.config.jobs())
            .try_collect()
            .await
    }

    /// Runs one check through the policy gate and, if allowed, its executor.
    /// Executor errors and panics become failed outcomes.
    pub async fn grade_check(&self, check: &Check, module_dir: &Path) -> Outcome {
        let verdict = match gate::evaluate(check, self.config.capabilities(), &self.probe) {
            GateDecision::Settle(verdict) => verdict,
            GateDecision::Execute => {
                let ctx = ExecContext {
                    module_dir,
                    config: &self.config,
                    probe: &self.probe,
                    cancel: &self.cancel,
                    root_lock: &self.root_lock,
                };
                let run = AssertUnwindSafe(executors::execute(&check.kind, &ctx));
                match run.catch_unwind().await {
                    Ok(Ok(verdict)) => verdict,
                    Ok(Err(e)) => {
                        tracing::warn!(check = %check.id, error = %format!("{e:#}"), "check errored");
                        Verdict::Fail(format!("exception {e:#}"))
                    }
                    Err(panic) => {
                        let reason = panic_message(panic.as_ref());
                        tracing::warn!(check = %check.id, %reason, "check panicked");
                        Verdict::Fail(format!("exception {reason}"))
                    }
                }
            }
        };

        let outcome = Outcome::new(check, verdict);
        tracing::debug!(
            check = outcome.id(),
            kind = check.kind.type_name(),
            status = %outcome.status(),
            earned = outcome.earned(),
            "checked"
        );
        outcome
    }
}

/// The directory name of a module, or the whole path when it has none.
pub fn module_name(module_dir: &Path) -> String {
    module_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| module_dir.display().to_string())
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "executor panicked".to_string()
    }
}
