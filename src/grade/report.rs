#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use itertools::{Either, Itertools};
use serde::{Serialize, Serializer};

use super::outcome::{Outcome, Status};
use crate::{constants::MAX_RECOMMENDATIONS, tools::EnvSnapshot};

/// Everything known about one graded module. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    /// Module directory name.
    module:          String,
    /// `earned / possible * 100`, one decimal; 0.0 when nothing is possible.
    score:           f64,
    /// Points earned across all checks.
    earned:          u32,
    /// Points declared across all checks.
    possible:        u32,
    /// Outcomes in rubric order.
    results:         Vec<Outcome>,
    /// At most [`MAX_RECOMMENDATIONS`] things to fix, failures first.
    recommendations: Vec<String>,
    /// Wall-clock time spent grading the module.
    #[serde(rename = "runtime_sec", serialize_with = "serialize_secs")]
    runtime:         Duration,
    /// Machine the run happened on.
    env:             EnvSnapshot,
}

impl ModuleReport {
    /// Aggregates outcomes into a report.
    pub fn build(
        module: impl Into<String>,
        results: Vec<Outcome>,
        possible: u32,
        runtime: Duration,
        env: EnvSnapshot,
    ) -> Self {
        let earned = results.iter().map(Outcome::earned).sum();
        let recommendations = recommendations(&results);

        Self {
            module: module.into(),
            score: score(earned, possible),
            earned,
            possible,
            results,
            recommendations,
            runtime,
            env,
        }
    }

    /// Returns the module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Returns the percentage score.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Returns the points earned.
    pub fn earned(&self) -> u32 {
        self.earned
    }

    /// Returns the points possible.
    pub fn possible(&self) -> u32 {
        self.possible
    }

    /// Returns the outcomes in rubric order.
    pub fn results(&self) -> &[Outcome] {
        &self.results
    }

    /// Returns the recommendations.
    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Returns the grading wall-clock time.
    pub fn runtime(&self) -> Duration {
        self.runtime
    }

    /// Returns the environment snapshot.
    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// Failed outcomes, in rubric order.
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.results.iter().filter(|o| o.status() == Status::Fail)
    }

    /// Skipped outcomes, in rubric order.
    pub fn skipped(&self) -> impl Iterator<Item = &Outcome> {
        self.results.iter().filter(|o| o.status() == Status::Skipped)
    }
}

/// Percentage rounded to one decimal; 0.0 when `possible` is 0.
pub fn score(earned: u32, possible: u32) -> f64 {
    if possible == 0 {
        return 0.0;
    }
    (f64::from(earned) / f64::from(possible) * 1000.0).round() / 10.0
}

/// Failures become recommendations; skips only do when nothing failed.
pub fn recommendations(results: &[Outcome]) -> Vec<String> {
    let (failed, skipped): (Vec<&Outcome>, Vec<&Outcome>) =
        results.iter().partition_map(|o| match o.status() {
            Status::Fail => Either::Left(o),
            _ => Either::Right(o),
        });
    let skipped = skipped.into_iter().filter(|o| o.status() == Status::Skipped);

    if !failed.is_empty() {
        return failed
            .into_iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|o| format!("{}: {} -> {}", o.id(), o.description(), o.message()))
            .collect();
    }

    skipped
        .take(MAX_RECOMMENDATIONS)
        .map(|o| format!("{}: skipped ({})", o.id(), o.message()))
        .collect()
}

/// Unweighted mean of module scores; every module counts once regardless of
/// its possible points. 0.0 for no modules.
pub fn overall_mean(reports: &[ModuleReport]) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    reports.iter().map(ModuleReport::score).sum::<f64>() / reports.len() as f64
}

/// Serializes a duration as seconds rounded to two decimals.
fn serialize_secs<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64((duration.as_secs_f64() * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grade::outcome::Verdict,
        rubric::{Check, CheckKind},
    };

    fn check(id: &str, points: u32, skip_points: u32) -> Check {
        Check {
            id: id.to_string(),
            description: format!("check {id}"),
            points,
            tool: None,
            skip_if_missing_tool: false,
            skip_points,
            requires_flag: None,
            kind: CheckKind::FileExists {
                pattern: "*".to_string(),
            },
        }
    }

    fn env() -> EnvSnapshot {
        EnvSnapshot {
            platform: "test".into(),
            runtime:  "test".into(),
            wsl:      false,
            tools:    Default::default(),
        }
    }

    #[test]
    fn score_rounds_to_one_decimal() {
        assert_eq!(score(2, 3), 66.7);
        assert_eq!(score(40, 100), 40.0);
        assert_eq!(score(0, 0), 0.0);
    }

    #[test]
    fn recommendations_are_capped_and_prefer_failures() {
        let mut results: Vec<Outcome> = (0..7)
            .map(|i| Outcome::new(&check(&format!("f{i}"), 10, 0), Verdict::Fail("no".into())))
            .collect();
        results.insert(0, Outcome::new(&check("s", 10, 5), Verdict::Skipped("off".into())));

        let recs = recommendations(&results);
        assert_eq!(recs.len(), MAX_RECOMMENDATIONS);
        assert_eq!(recs[0], "f0: check f0 -> no");
        assert!(recs.iter().all(|r| !r.starts_with("s:")));
    }

    #[test]
    fn skips_surface_only_without_failures() {
        let results = vec![
            Outcome::new(&check("p", 50, 0), Verdict::Pass("ok".into())),
            Outcome::new(&check("s", 50, 20), Verdict::Skipped("cuda flag not enabled".into())),
        ];

        assert_eq!(recommendations(&results), vec![
            "s: skipped (cuda flag not enabled)".to_string()
        ]);

        let report = ModuleReport::build("m", results, 100, Duration::from_millis(1234), env());
        assert_eq!(report.earned(), 70);
        assert_eq!(report.score(), 70.0);
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.failures().count(), 0);

        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["runtime_sec"], 1.23);
        assert_eq!(json["results"][1]["status"], "skipped");
        assert_eq!(json["results"][1]["earned"], 20);
    }

    #[test]
    fn mean_is_unweighted() {
        let full = ModuleReport::build(
            "a",
            vec![Outcome::new(&check("x", 10, 0), Verdict::Pass("ok".into()))],
            10,
            Duration::ZERO,
            env(),
        );
        let half = ModuleReport::build(
            "b",
            vec![
                Outcome::new(&check("y", 100, 0), Verdict::Pass("ok".into())),
                Outcome::new(&check("z", 100, 0), Verdict::Fail("no".into())),
            ],
            200,
            Duration::ZERO,
            env(),
        );

        assert_eq!(overall_mean(&[full, half]), 75.0);
        assert_eq!(overall_mean(&[]), 0.0);
    }
}
