use modgrade::{
    audit,
    discovery::{self, DiscoveryError, ModuleSelector},
};
use serde_json::json;

#[path = "support.rs"]
mod support;

use support::Workspace;

fn one_check(points: u32) -> serde_json::Value {
    json!([{"id": "r", "description": "readme", "points": points,
            "type": "file_exists", "pattern": "README.md"}])
}

#[test]
fn discovery_lists_only_modules_with_rubrics() {
    let ws = Workspace::new("discover");
    ws.module("02_build", one_check(100));
    ws.module("01_foundations", one_check(100));
    ws.write("modules/03_draft/README.md", "# no rubric yet\n");

    let modules = discovery::discover_modules(ws.root()).expect("discover");
    let names: Vec<String> = modules
        .iter()
        .map(|m| m.file_name().expect("name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["01_foundations", "02_build"]);
}

#[test]
fn selector_matches_name_prefix_or_path() {
    let ws = Workspace::new("select");
    let foundations = ws.module("01_foundations", one_check(100));
    ws.module("02_build", one_check(100));

    let by_prefix =
        discovery::resolve(ws.root(), &ModuleSelector::One("01".into())).expect("resolve");
    assert_eq!(by_prefix, [foundations.clone()]);

    let by_path = discovery::resolve(
        ws.root(),
        &ModuleSelector::One(foundations.display().to_string()),
    )
    .expect("resolve");
    assert_eq!(by_path, [foundations]);

    let all = discovery::resolve(ws.root(), &ModuleSelector::All).expect("resolve");
    assert_eq!(all.len(), 2);
}

#[test]
fn unknown_module_and_missing_dir_are_errors() {
    let ws = Workspace::new("unknown");
    ws.module("01_foundations", one_check(100));

    let err = discovery::resolve(ws.root(), &ModuleSelector::One("99".into()))
        .expect_err("no such module");
    assert!(matches!(err, DiscoveryError::NotFound(ref s) if s == "99"));
    assert_eq!(err.to_string(), "Module 99 not found");

    let bare = Workspace::bare("bare");
    let err = discovery::resolve(bare.root(), &ModuleSelector::All).expect_err("no modules dir");
    assert!(matches!(err, DiscoveryError::MissingModulesDir(_)));
}

#[test]
fn rubric_audit_flags_totals_off_by_one() {
    let ws = Workspace::new("audit-rubrics");
    ws.module("01_under", one_check(99));
    ws.module("02_over", one_check(101));
    ws.module("03_exact", one_check(100));

    let report = audit::audit_rubrics(ws.root()).expect("audit");
    assert!(!report.is_clean());
    assert_eq!(report.issues(), [
        "modules/01_under/grading/rubric.json points=99".to_string(),
        "modules/02_over/grading/rubric.json points=101".to_string(),
    ]);
    assert!(report.to_string().starts_with("Rubric issues:\n"));
}

#[test]
fn rubric_audit_passes_clean_tree() {
    let ws = Workspace::new("audit-clean");
    ws.module("01_exact", one_check(100));

    let report = audit::audit_rubrics(ws.root()).expect("audit");
    assert!(report.is_clean());
    assert_eq!(report.to_string(), "OK: rubrics valid and sum to 100\n");
}

#[test]
fn link_audit_reports_broken_relative_links() {
    let ws = Workspace::new("audit-links");
    ws.write("docs/setup.md", "# Setup\n");
    ws.write(
        "README.md",
        "See [setup](docs/setup.md#linux), [site](https://example.com), \
         [top](#intro) and [gone](docs/missing.md).\n",
    );
    ws.write("modules/01_a/README.md", "Back to [root](../../README.md) or [setup](docs/setup.md).\n");

    let report = audit::audit_links(ws.root()).expect("audit");
    assert_eq!(report.issues(), ["README.md -> docs/missing.md".to_string()]);
}

#[test]
fn tree_audit_lists_missing_files() {
    let ws = Workspace::new("audit-tree");
    for file in [
        "README.md",
        "overview.md",
        "troubleshooting.md",
        "references.md",
        "artifacts/README.md",
        "checklists/mastery.md",
        "checklists/validation.md",
        "checklists/review.md",
    ] {
        ws.write(&format!("modules/01_a/{file}"), "x\n");
    }
    ws.write("modules/01_a/exercises/ex1/README.md", "x\n");
    ws.write("modules/02_b/README.md", "x\n");

    let report = audit::audit_tree(ws.root()).expect("audit");
    let issues = report.issues();

    assert!(issues.contains(&"01_a/ex1 missing learner/CMakeLists.txt".to_string()));
    assert!(issues.contains(&"01_a/ex1 missing grading/rubric.json".to_string()));
    assert!(!issues.iter().any(|i| i == "01_a/ex1 missing README.md"));
    assert!(!issues.iter().any(|i| i.starts_with("01_a missing")));
    assert!(issues.contains(&"02_b missing overview.md".to_string()));
    assert!(issues.contains(&"02_b missing exercises/".to_string()));
}
