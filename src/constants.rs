#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Directory under the grading root that holds one sub-directory per module.
pub const MODULES_DIR: &str = "modules";

/// Location of a module's rubric, relative to the module directory.
pub const RUBRIC_PATH: &str = "grading/rubric.json";

/// Points every rubric is expected to add up to.
pub const EXPECTED_TOTAL_POINTS: u32 = 100;

/// Upper bound on the number of recommendations attached to a report.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Exit code reported for invocations killed at their deadline, mirroring
/// coreutils `timeout`.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Optional tools whose presence is recorded in every environment snapshot.
pub const KNOWN_TOOLS: [&str; 7] = [
    "clang-format",
    "cmake",
    "ctest",
    "perf",
    "heaptrack",
    "nsys",
    "nvidia-smi",
];

/// Every `type` a rubric check may declare.
pub const CHECK_TYPES: [&str; 9] = [
    "cmake_build",
    "ctest",
    "file_exists",
    "file_contains",
    "tool_present",
    "command",
    "clang_format_check",
    "csv_schema",
    "time_budget",
];
