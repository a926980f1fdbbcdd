#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Write;

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use crate::grade::{ModuleReport, Status, overall_mean};

/// Pretty-printed JSON array with one record per module.
pub fn to_json(reports: &[ModuleReport]) -> Result<String> {
    serde_json::to_string_pretty(reports).context("Could not serialize grading reports")
}

/// One row of the multi-module summary table.
#[derive(Tabled)]
struct SummaryRow {
    /// Module name.
    #[tabled(rename = "Module")]
    module:  String,
    /// Percentage score.
    #[tabled(rename = "Score")]
    score:   String,
    /// `earned/possible`.
    #[tabled(rename = "Points")]
    points:  String,
    /// Grading time.
    #[tabled(rename = "Runtime")]
    runtime: String,
}

/// `[status]`, colored when `color` is set.
fn status_tag(status: Status, color: bool) -> String {
    let tag = format!("[{status}]");
    if !color {
        return tag;
    }
    match status {
        Status::Pass => tag.green().to_string(),
        Status::Fail => tag.red().bold().to_string(),
        Status::Skipped => tag.yellow().to_string(),
    }
}

/// Human-readable rendering of a run: per-module summary, one line per
/// outcome, recommendations, and the overall mean.
pub fn to_text(reports: &[ModuleReport], color: bool) -> String {
    let mut out = String::new();

    for report in reports {
        let _ = writeln!(
            out,
            "== {} : {:.1} ({}/{}) runtime {:.2}s",
            report.module(),
            report.score(),
            report.earned(),
            report.possible(),
            report.runtime().as_secs_f64()
        );
        for outcome in report.results() {
            let _ = writeln!(
                out,
                "  {} {} ({}/{}) - {} :: {}",
                status_tag(outcome.status(), color),
                outcome.id(),
                outcome.earned(),
                outcome.points(),
                outcome.description(),
                outcome.message()
            );
        }
        if !report.recommendations().is_empty() {
            let _ = writeln!(out, "  Recommendations:");
            for recommendation in report.recommendations() {
                let _ = writeln!(out, "   - {recommendation}");
            }
        }
        out.push('\n');
    }

    if reports.len() > 1 {
        let rows = reports.iter().map(|r| SummaryRow {
            module:  r.module().to_string(),
            score:   format!("{:.1}", r.score()),
            points:  format!("{}/{}", r.earned(), r.possible()),
            runtime: format!("{:.2}s", r.runtime().as_secs_f64()),
        });
        let table = Table::new(rows)
            .with(Style::modern())
            .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
            .to_string();
        let _ = writeln!(out, "{table}");
    }

    let _ = writeln!(
        out,
        "Overall score: {:.1} across {} modules",
        overall_mean(reports),
        reports.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        grade::Verdict,
        grade::outcome::Outcome,
        rubric::{Check, CheckKind},
        tools::EnvSnapshot,
    };

    fn report(name: &str, pass_a: bool) -> ModuleReport {
        let check = |id: &str, points| Check {
            id: id.to_string(),
            description: format!("{id} works"),
            points,
            tool: None,
            skip_if_missing_tool: false,
            skip_points: 0,
            requires_flag: None,
            kind: CheckKind::FileExists {
                pattern: "README.md".to_string(),
            },
        };
        let a = if pass_a {
            Verdict::Pass("found 1 files".into())
        } else {
            Verdict::Fail("missing pattern README.md".into())
        };
        ModuleReport::build(
            name,
            vec![
                Outcome::new(&check("a", 60), a),
                Outcome::new(&check("b", 40), Verdict::Pass("rc=0 (0.0s)".into())),
            ],
            100,
            Duration::from_millis(50),
            EnvSnapshot {
                platform: "linux".into(),
                runtime:  "modgrade".into(),
                wsl:      false,
                tools:    Default::default(),
            },
        )
    }

    #[test]
    fn text_lists_outcomes_and_recommendations() {
        let text = to_text(&[report("01_foundations", false)], false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "== 01_foundations : 40.0 (40/100) runtime 0.05s");
        assert_eq!(
            lines[1],
            "  [fail] a (0/60) - a works :: missing pattern README.md"
        );
        assert_eq!(lines[2], "  [pass] b (40/40) - b works :: rc=0 (0.0s)");
        assert_eq!(lines[3], "  Recommendations:");
        assert_eq!(lines[4], "   - a: a works -> missing pattern README.md");
        assert_eq!(lines.last(), Some(&"Overall score: 40.0 across 1 modules"));
    }

    #[test]
    fn text_adds_summary_table_for_several_modules() {
        let text = to_text(&[report("01_a", true), report("02_b", false)], false);
        assert!(text.contains("│ 01_a"));
        assert!(text.ends_with("Overall score: 70.0 across 2 modules\n"));
    }

    #[test]
    fn json_keeps_documented_field_names() {
        let json = to_json(&[report("01_a", true)]).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse json");
        let record = &value[0];
        for key in [
            "module",
            "score",
            "earned",
            "possible",
            "results",
            "recommendations",
            "runtime_sec",
            "env",
        ] {
            assert!(record.get(key).is_some(), "missing {key}");
        }
        assert_eq!(record["score"], 100.0);
        assert_eq!(record["results"][0]["status"], "pass");
        assert_eq!(record["results"][0]["id"], "a");
    }
}
