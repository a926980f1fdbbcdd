#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # modgrade
//!
//! Grades modules of an exercise curriculum against their rubrics and audits
//! the curriculum tree.
//!
//! `modgrade grade --module 01` grades one module, `modgrade grade` grades all
//! of them, and `modgrade audit rubrics|tree|links` checks the repository
//! itself.

use std::{io::IsTerminal, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use modgrade::{
    Capabilities, Grader, GraderConfig,
    audit::{self, AuditReport},
    discovery::{self, ModuleSelector},
    process::CancelToken,
    render,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, util::SubscriberInitExt};

/// Exit status of a grading pass cut short by Ctrl-C.
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Options of the `grade` subcommand.
#[derive(Debug, Clone)]
struct GradeOpts {
    /// Module path or name prefix; `None` grades every module.
    module:          Option<String>,
    /// Emit JSON instead of text.
    json:            bool,
    /// Enable checks that need real hardware.
    enable_hardware: bool,
    /// Enable checks that need a CUDA device.
    enable_cuda:     bool,
    /// Modules graded at once.
    jobs:            usize,
    /// Repository root.
    root:            PathBuf,
}

/// Which repository audit to run.
#[derive(Debug, Clone, Copy)]
enum AuditKind {
    /// Rubric totals, types and ids.
    Rubrics,
    /// Required module and exercise files.
    Tree,
    /// Relative markdown links.
    Links,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade one or all modules
    Grade(GradeOpts),
    /// Audit the repository
    Audit(AuditKind, PathBuf),
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Cli {
    /// Log at debug level.
    verbose: bool,
    /// What to do.
    cmd:     Cmd,
}

/// Parse the command line arguments into a [`Cli`]
fn options() -> Cli {
    /// parses the repository root
    fn root() -> impl Parser<PathBuf> {
        long("root")
            .help("Repository root containing modules/")
            .argument::<PathBuf>("DIR")
            .fallback(PathBuf::from("."))
    }

    /// one audit subcommand
    fn audit_cmd(kind: AuditKind, name: &'static str, help: &'static str) -> impl Parser<Cmd> {
        let kind = pure(kind);
        let dir = root();
        construct!(Cmd::Audit(kind, dir))
            .to_options()
            .command(name)
            .help(help)
    }

    let module = long("module")
        .short('m')
        .help("Module directory or id prefix, e.g. 01")
        .argument::<String>("SELECTOR")
        .map(Some);
    let all = long("all")
        .help("Grade every module (the default)")
        .req_flag(None::<String>);
    let module = construct!([module, all]).fallback(None);
    let json = long("json").help("Print JSON instead of text").switch();
    let enable_hardware = long("enable-hardware")
        .help("Allow checks that need real hardware")
        .switch();
    let enable_cuda = long("enable-cuda")
        .help("Allow checks that need a CUDA device")
        .switch();
    let jobs = long("jobs")
        .short('j')
        .help("Number of modules graded at once")
        .argument::<usize>("N")
        .guard(|n| *n > 0, "jobs must be at least 1")
        .fallback(1);
    let root = root();

    let grade = construct!(GradeOpts {
        module,
        json,
        enable_hardware,
        enable_cuda,
        jobs,
        root,
    })
    .to_options()
    .command("grade")
    .help("Grade modules against their rubrics")
    .map(Cmd::Grade);

    let rubrics = audit_cmd(
        AuditKind::Rubrics,
        "rubrics",
        "Check that rubrics are valid and total 100 points",
    );
    let tree = audit_cmd(
        AuditKind::Tree,
        "tree",
        "Check that modules and exercises have their required files",
    );
    let links = audit_cmd(AuditKind::Links, "links", "Check relative links in markdown files");

    let audit = construct!([rubrics, tree, links])
        .to_options()
        .command("audit")
        .help("Audit the curriculum repository");

    let verbose = short('v')
        .long("verbose")
        .help("Log debug output")
        .switch();
    let cmd = construct!([grade, audit]);

    construct!(Cli { verbose, cmd })
        .to_options()
        .descr("Rubric-driven grader for module curricula")
        .run()
}

/// Installs the stderr log subscriber.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry().with(fmt).with(filter).init();
}

/// Grades the selected modules and prints the reports.
async fn grade(opts: GradeOpts) -> Result<ExitCode> {
    let selector = match opts.module {
        Some(module) => ModuleSelector::One(module),
        None => ModuleSelector::All,
    };
    let modules = discovery::resolve(&opts.root, &selector)?;

    let config = GraderConfig::builder()
        .root_dir(opts.root)
        .capabilities(Capabilities {
            hardware: opts.enable_hardware,
            cuda:     opts.enable_cuda,
        })
        .jobs(opts.jobs)
        .build()
        .with_env_overrides();

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping running checks");
            on_interrupt.cancel();
        }
    });

    let grader = Grader::new(config).with_cancel_token(cancel.clone());
    let reports = grader.grade_all(&modules).await?;

    if opts.json {
        println!("{}", render::to_json(&reports)?);
    } else {
        print!("{}", render::to_text(&reports, std::io::stdout().is_terminal()));
    }

    if cancel.is_cancelled() {
        return Ok(ExitCode::from(INTERRUPTED_EXIT_CODE));
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs one audit and prints its findings.
fn run_audit(kind: AuditKind, root: PathBuf) -> Result<ExitCode> {
    let report: AuditReport = match kind {
        AuditKind::Rubrics => audit::audit_rubrics(&root),
        AuditKind::Tree => audit::audit_tree(&root),
        AuditKind::Links => audit::audit_links(&root),
    }
    .with_context(|| format!("Audit of {} failed", root.display()))?;

    print!("{report}");
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();

    let cli = options();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Grade(opts) => grade(opts).await,
        Cmd::Audit(kind, root) => run_audit(kind, root),
    }
}
