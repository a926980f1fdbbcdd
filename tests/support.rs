#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use modgrade::{Capabilities, Grader, GraderConfig};
use serde_json::Value;
use uuid::Uuid;

/// A throwaway curriculum root under the system temp dir.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("modgrade-{tag}-{}", Uuid::new_v4()));
        fs::create_dir_all(root.join("modules")).expect("create modules dir");
        Self { root }
    }

    /// A root with no `modules/` directory at all.
    pub fn bare(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("modgrade-{tag}-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).expect("create root");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates `modules/<name>` with the given rubric checks.
    pub fn module(&self, name: &str, checks: Value) -> PathBuf {
        let dir = self.root.join("modules").join(name);
        fs::create_dir_all(dir.join("grading")).expect("create grading dir");
        let rubric = serde_json::json!({ "checks": checks });
        fs::write(
            dir.join("grading/rubric.json"),
            serde_json::to_string_pretty(&rubric).expect("serialize rubric"),
        )
        .expect("write rubric");
        dir
    }

    /// Writes `contents` to `rel` under the root, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn config(&self) -> GraderConfig {
        GraderConfig::builder().root_dir(self.root.clone()).build()
    }

    pub fn grader(&self) -> Grader {
        Grader::new(self.config())
    }

    pub fn grader_with(&self, capabilities: Capabilities) -> Grader {
        Grader::new(
            GraderConfig::builder()
                .root_dir(self.root.clone())
                .capabilities(capabilities)
                .build(),
        )
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

/// A tool name nobody has on `PATH`.
pub const MISSING_TOOL: &str = "modgrade-test-tool-that-does-not-exist";
