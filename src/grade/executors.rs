#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! One executor per check type. Executors only interpret exit codes, output
//! and timing of external tools, plus plain file inspection.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tokio::sync::{Mutex, MutexGuard};

use super::outcome::Verdict;
use crate::{
    config::GraderConfig,
    process::{self, CancelToken, Invocation},
    rubric::CheckKind,
    tools::ToolProbe,
};

/// Everything an executor needs besides the check itself.
#[derive(Debug, Clone, Copy)]
pub struct ExecContext<'a> {
    /// Directory of the module being graded.
    pub module_dir: &'a Path,
    /// Run configuration.
    pub config:     &'a GraderConfig,
    /// Tool presence cache for this run.
    pub probe:      &'a ToolProbe,
    /// Run-wide cancellation.
    pub cancel:     &'a CancelToken,
    /// Held while an external process runs in the shared grading root.
    pub root_lock:  &'a Mutex<()>,
}

impl<'a> ExecContext<'a> {
    /// Waits until no other module is running a process in the grading
    /// root. Hold the guard across every invocation of one check.
    async fn exclusive(&self) -> MutexGuard<'a, ()> {
        self.root_lock.lock().await
    }

    /// Runs `argv` from the grading root.
    async fn run(&self, argv: &[String], deadline: Duration) -> Result<Invocation> {
        process::run_command(argv, Some(self.config.root_dir()), deadline, self.cancel).await
    }
}

/// Runs the executor matching `kind`.
///
/// An `Err` means the executor itself broke (spawn failure, unreadable file,
/// invalid regex); the caller turns it into a failed outcome.
pub async fn execute(kind: &CheckKind, ctx: &ExecContext<'_>) -> Result<Verdict> {
    match kind {
        CheckKind::CmakeBuild { preset } => cmake_build(preset, ctx).await,
        CheckKind::Ctest { preset, regex } => ctest(preset, regex.as_deref(), ctx).await,
        CheckKind::FileExists { pattern } => file_exists(pattern, ctx.module_dir),
        CheckKind::FileContains {
            file,
            regex,
            invert,
        } => file_contains(file, regex, *invert, ctx.module_dir),
        CheckKind::ToolPresent { name } => Ok(tool_present(name, ctx.probe)),
        CheckKind::Command {
            cmd,
            timeout,
            regex,
        } => command(cmd, *timeout, regex.as_deref(), ctx).await,
        CheckKind::ClangFormatCheck { files } => clang_format_check(files, ctx).await,
        CheckKind::CsvSchema {
            file,
            headers,
            has_header,
            min_rows,
        } => csv_schema(file, headers.as_deref(), *has_header, *min_rows, ctx.module_dir),
        CheckKind::TimeBudget { cmd, seconds } => time_budget(cmd, *seconds, ctx).await,
    }
}

/// Builds a multi-line regex, naming the pattern on failure.
fn multi_line_regex(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .with_context(|| format!("invalid regex `{pattern}`"))
}

/// Converts string slices to an owned argument vector.
fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

/// Configures then builds a CMake preset. A failed configure step skips the
/// build.
async fn cmake_build(preset: &str, ctx: &ExecContext<'_>) -> Result<Verdict> {
    let deadline = ctx.config.command_timeout();
    let _root = ctx.exclusive().await;

    let configure = ctx.run(&argv(["cmake", "--preset", preset]), deadline).await?;
    if !configure.success() {
        return Ok(Verdict::Fail(format!(
            "cmake preset {preset} failed: {}",
            configure.stderr.trim()
        )));
    }

    let build = ctx
        .run(&argv(["cmake", "--build", "--preset", preset]), deadline)
        .await?;
    if build.success() {
        Ok(Verdict::Pass(format!("build ok ({:.1}s)", build.duration.as_secs_f64())))
    } else {
        Ok(Verdict::Fail(format!("build failed: {}", build.stderr.trim())))
    }
}

/// Runs a CTest preset, optionally filtered by test name.
async fn ctest(preset: &str, regex: Option<&str>, ctx: &ExecContext<'_>) -> Result<Verdict> {
    let mut cmd = argv(["ctest", "--preset", preset, "--output-on-failure"]);
    if let Some(regex) = regex {
        cmd.extend(argv(["-R", regex]));
    }

    let _root = ctx.exclusive().await;
    let run = ctx.run(&cmd, ctx.config.command_timeout()).await?;
    if run.success() {
        Ok(Verdict::Pass(format!("{} passed", regex.unwrap_or("all"))))
    } else {
        Ok(Verdict::Fail(run.stderr.trim().to_string()))
    }
}

/// Passes when the glob, taken relative to the module, matches anything.
fn file_exists(pattern: &str, module_dir: &Path) -> Result<Verdict> {
    let base = module_dir
        .to_str()
        .context("module path is not valid UTF-8")?;
    let full = format!("{}/{}", glob::Pattern::escape(base), pattern);

    let matches = glob::glob(&full)
        .with_context(|| format!("invalid glob `{pattern}`"))?
        .filter_map(Result::ok)
        .count();

    if matches > 0 {
        Ok(Verdict::Pass(format!("found {matches} files")))
    } else {
        Ok(Verdict::Fail(format!("missing pattern {pattern}")))
    }
}

/// Searches a module file for a regex; `invert` passes on no match.
fn file_contains(file: &str, regex: &str, invert: bool, module_dir: &Path) -> Result<Verdict> {
    let target = module_dir.join(file);
    if !target.exists() {
        return Ok(Verdict::Fail(format!("{file} missing")));
    }

    let bytes =
        std::fs::read(&target).with_context(|| format!("could not read {}", target.display()))?;
    let content = String::from_utf8_lossy(&bytes);
    let found = multi_line_regex(regex)?.is_match(&content);

    let observed = if found { "match" } else { "no match" };
    Ok(Verdict::from_bool(found != invert, format!("{observed} / regex {regex}")))
}

/// Passes when `name` resolves on `PATH`.
fn tool_present(name: &str, probe: &ToolProbe) -> Verdict {
    let present = probe.is_present(name);
    Verdict::from_bool(present, format!("{name} {}", if present { "ok" } else { "missing" }))
}

/// Runs an arbitrary command; optionally requires its output to match.
async fn command(
    cmd: &[String],
    timeout: Option<u64>,
    regex: Option<&str>,
    ctx: &ExecContext<'_>,
) -> Result<Verdict> {
    let deadline = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.command_timeout());

    let _root = ctx.exclusive().await;
    let run = ctx.run(cmd, deadline).await?;
    if !run.success() {
        return Ok(Verdict::Fail(format!("rc={} stderr={}", run.code, run.stderr.trim())));
    }

    if let Some(regex) = regex
        && !multi_line_regex(regex)?.is_match(&run.combined_output())
    {
        return Ok(Verdict::Fail(format!("output missing {regex}")));
    }

    Ok(Verdict::Pass(format!("rc=0 ({:.1}s)", run.duration.as_secs_f64())))
}

/// Runs `clang-format --dry-run -Werror` over module files without touching
/// them.
async fn clang_format_check(files: &[String], ctx: &ExecContext<'_>) -> Result<Verdict> {
    let mut cmd = argv(["clang-format", "--dry-run", "-Werror"]);
    cmd.extend(
        files
            .iter()
            .map(|f| ctx.module_dir.join(f).display().to_string()),
    );

    let _root = ctx.exclusive().await;
    let run = ctx.run(&cmd, ctx.config.format_timeout()).await?;
    if run.success() {
        return Ok(Verdict::Pass("clang-format clean".to_string()));
    }

    let output = match (run.stderr.trim(), run.stdout.trim()) {
        ("", "") => format!("clang-format failed (rc={})", run.code),
        ("", stdout) => stdout.to_string(),
        (stderr, _) => stderr.to_string(),
    };
    Ok(Verdict::Fail(output))
}

/// Checks a CSV file's header and data row count.
fn csv_schema(
    file: &str,
    headers: Option<&[String]>,
    has_header: bool,
    min_rows: usize,
    module_dir: &Path,
) -> Result<Verdict> {
    let target = module_dir.join(file);
    if !target.exists() {
        return Ok(Verdict::Fail("csv missing".to_string()));
    }

    let bytes =
        std::fs::read(&target).with_context(|| format!("could not read {}", target.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("malformed csv {file}"))?;
        records.push(record.iter().map(str::to_string).collect::<Vec<String>>());
    }

    // The reader drops blank lines; each one still counts as an empty row.
    let record_lines: usize = records
        .iter()
        .map(|r| 1 + r.iter().map(|f| f.matches('\n').count()).sum::<usize>())
        .sum();
    let blank_rows = text.lines().count().saturating_sub(record_lines);
    let total_rows = records.len() + blank_rows;

    let data_rows = if has_header {
        if total_rows == 0 {
            return Ok(Verdict::Fail("csv empty".to_string()));
        }
        let starts_blank = text.lines().next().is_some_and(str::is_empty);
        let header: &[String] = match records.first() {
            Some(first) if !starts_blank => first,
            _ => &[],
        };
        if let Some(expected) = headers
            && header != expected
        {
            return Ok(Verdict::Fail(format!("header mismatch {header:?} vs {expected:?}")));
        }
        total_rows - 1
    } else {
        total_rows
    };

    if data_rows < min_rows {
        return Ok(Verdict::Fail(format!("rows {data_rows} < {min_rows}")));
    }
    Ok(Verdict::Pass(format!("rows {data_rows}")))
}

/// Runs a command that must exit 0 within `seconds`; it is killed once the
/// budget plus the configured grace has elapsed.
async fn time_budget(cmd: &[String], seconds: f64, ctx: &ExecContext<'_>) -> Result<Verdict> {
    let budget = Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("invalid time budget {seconds}"))?;

    let _root = ctx.exclusive().await;
    let run = ctx.run(cmd, budget + ctx.config.budget_grace()).await?;
    let observed = run.duration.as_secs_f64();
    if !run.success() {
        return Ok(Verdict::Fail(format!("rc {} after {observed:.2}s", run.code)));
    }

    if run.duration <= budget {
        Ok(Verdict::Pass(format!("{observed:.2}s <= {seconds}")))
    } else {
        Ok(Verdict::Fail(format!("{observed:.2}s > {seconds}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_exists_escapes_module_path() {
        let dir = std::env::temp_dir().join(format!("modgrade [exec] {}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        std::fs::write(dir.join("README.md"), "# hi\n").expect("write readme");

        let verdict = file_exists("*.md", &dir).expect("glob");
        assert_eq!(verdict, Verdict::Pass("found 1 files".to_string()));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn invalid_regex_is_an_executor_error() {
        let dir = std::env::temp_dir().join(format!("modgrade-regex-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        std::fs::write(dir.join("a.txt"), "text").expect("write file");

        assert!(file_contains("a.txt", "(unclosed", false, &dir).is_err());

        let _ = std::fs::remove_dir_all(dir);
    }
}
