#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The rubric document: an ordered list of typed, independently scored
//! checks for one module.

use std::{
    collections::HashSet,
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::constants::RUBRIC_PATH;

/// Errors raised while loading a rubric. These are configuration problems and
/// abort grading of the affected module.
#[derive(thiserror::Error, Debug)]
pub enum RubricError {
    /// The rubric file could not be read.
    #[error("could not read rubric {}: {source}", path.display())]
    Read {
        /// Path that was read.
        path:   PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The rubric is not valid JSON or does not match the check schema.
    #[error("could not parse rubric {origin}: {source}")]
    Parse {
        /// Where the document came from, usually a path.
        origin: String,
        /// Underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },
    /// Two checks share an identifier, which would make recommendations
    /// ambiguous.
    #[error("duplicate check id `{0}`")]
    DuplicateId(String),
    /// A check would award more on skip than on pass.
    #[error("check `{id}` grants {skip_points} skip points but is only worth {points}")]
    SkipCreditExceedsPoints {
        /// Offending check.
        id:          String,
        /// Declared skip credit.
        skip_points: u32,
        /// Declared value of the check.
        points:      u32,
    },
}

/// Operator-controlled capability a check may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityFlag {
    /// Checks that need real hardware counters or devices.
    Hardware,
    /// Checks that need a CUDA-capable accelerator.
    Cuda,
}

impl Display for CapabilityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityFlag::Hardware => write!(f, "hardware"),
            CapabilityFlag::Cuda => write!(f, "cuda"),
        }
    }
}

/// A single scored verification unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Check {
    /// Identifier, unique within its rubric.
    pub id:                   String,
    /// Human-readable description used in reports.
    pub description:          String,
    /// Points awarded on pass.
    pub points:               u32,
    /// External tool that must be on `PATH` before the check runs.
    #[serde(default)]
    pub tool:                 Option<String>,
    /// Skip instead of failing when `tool` is missing.
    #[serde(default)]
    pub skip_if_missing_tool: bool,
    /// Credit granted when the check is skipped.
    #[serde(default)]
    pub skip_points:          u32,
    /// Capability that must be enabled for the check to run.
    #[serde(default)]
    pub requires_flag:        Option<CapabilityFlag>,
    /// What the check actually verifies.
    #[serde(flatten)]
    pub kind:                 CheckKind,
}

/// The check-type taxonomy, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckKind {
    /// `cmake --preset <preset>` followed by `cmake --build --preset <preset>`.
    CmakeBuild {
        /// CMake configure/build preset.
        preset: String,
    },
    /// `ctest --preset <preset> --output-on-failure [-R <regex>]`.
    Ctest {
        /// CTest preset.
        preset: String,
        /// Optional test-name filter.
        #[serde(default)]
        regex:  Option<String>,
    },
    /// A glob relative to the module matches at least one path.
    FileExists {
        /// Glob pattern.
        pattern: String,
    },
    /// A file's contents match (or, inverted, do not match) a regex.
    FileContains {
        /// File relative to the module.
        file:   String,
        /// Multi-line regular expression.
        regex:  String,
        /// Pass when the regex does not match.
        #[serde(default)]
        invert: bool,
    },
    /// A tool is resolvable on `PATH`.
    ToolPresent {
        /// Tool name.
        name: String,
    },
    /// An arbitrary command exits 0 and optionally prints something.
    Command {
        /// Program and arguments.
        cmd:     Vec<String>,
        /// Deadline in seconds.
        #[serde(default)]
        timeout: Option<u64>,
        /// Regex that stdout + stderr must match.
        #[serde(default)]
        regex:   Option<String>,
    },
    /// `clang-format --dry-run -Werror` over a list of files.
    ClangFormatCheck {
        /// Files relative to the module.
        files: Vec<String>,
    },
    /// A CSV file has the expected header and enough data rows.
    CsvSchema {
        /// File relative to the module.
        file:       String,
        /// Exact header row to expect.
        #[serde(default)]
        headers:    Option<Vec<String>>,
        /// Whether the first row is a header.
        #[serde(default = "default_has_header")]
        has_header: bool,
        /// Minimum number of data rows.
        #[serde(default = "default_min_rows")]
        min_rows:   usize,
    },
    /// A command exits 0 within a wall-clock budget.
    TimeBudget {
        /// Program and arguments.
        cmd:     Vec<String>,
        /// Budget in seconds.
        seconds: f64,
    },
}

/// Default for [`CheckKind::CsvSchema::has_header`].
fn default_has_header() -> bool {
    true
}

/// Default for [`CheckKind::CsvSchema::min_rows`].
fn default_min_rows() -> usize {
    1
}

impl CheckKind {
    /// The `type` discriminator as written in rubric documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            CheckKind::CmakeBuild { .. } => "cmake_build",
            CheckKind::Ctest { .. } => "ctest",
            CheckKind::FileExists { .. } => "file_exists",
            CheckKind::FileContains { .. } => "file_contains",
            CheckKind::ToolPresent { .. } => "tool_present",
            CheckKind::Command { .. } => "command",
            CheckKind::ClangFormatCheck { .. } => "clang_format_check",
            CheckKind::CsvSchema { .. } => "csv_schema",
            CheckKind::TimeBudget { .. } => "time_budget",
        }
    }
}

/// All checks for one module, in declared order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Rubric {
    /// Checks in the order they are graded and reported.
    checks: Vec<Check>,
}

impl Rubric {
    /// Loads and validates the rubric of the module rooted at `module_dir`.
    pub fn for_module(module_dir: &Path) -> Result<Self, RubricError> {
        Self::load(&module_dir.join(RUBRIC_PATH))
    }

    /// Loads and validates a rubric file.
    pub fn load(path: &Path) -> Result<Self, RubricError> {
        let text = std::fs::read_to_string(path).map_err(|source| RubricError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parses and validates a rubric document. `origin` names the document in
    /// error messages.
    pub fn parse(text: &str, origin: &str) -> Result<Self, RubricError> {
        let rubric: Rubric = serde_json::from_str(text).map_err(|source| RubricError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        rubric.validate()?;
        Ok(rubric)
    }

    /// Builds a rubric from already constructed checks.
    pub fn from_checks(checks: Vec<Check>) -> Result<Self, RubricError> {
        let rubric = Self { checks };
        rubric.validate()?;
        Ok(rubric)
    }

    /// Enforces identifier uniqueness and bounded skip credit.
    fn validate(&self) -> Result<(), RubricError> {
        let mut seen = HashSet::new();
        for check in &self.checks {
            if !seen.insert(check.id.as_str()) {
                return Err(RubricError::DuplicateId(check.id.clone()));
            }
            if check.skip_points > check.points {
                return Err(RubricError::SkipCreditExceedsPoints {
                    id:          check.id.clone(),
                    skip_points: check.skip_points,
                    points:      check.points,
                });
            }
        }
        Ok(())
    }

    /// Returns the checks in declared order.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Sum of all declared points.
    pub fn possible(&self) -> u32 {
        self.checks.iter().map(|c| c.points).sum()
    }
}
