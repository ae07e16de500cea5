use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use rpm_tagger::config::{self, Config, SourceKind};
use rpm_tagger::git::{Git2Repository, Repository};
use rpm_tagger::metadata::{discover_spec, MetadataStore};
use rpm_tagger::source::detect_source;
use rpm_tagger::ui;
use rpm_tagger::workflow::{self, TagOptions, TagPlan, TagWorkflow, WorkflowFailure};

#[derive(clap::Parser)]
#[command(
    name = "rpm-tagger",
    version,
    about = "Bump an RPM spec file to the package's version, commit it and tag the release"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        default_value = ".",
        help = "Package directory containing the .spec file"
    )]
    project: PathBuf,

    #[arg(
        long,
        conflicts_with = "source",
        help = "Keep the spec's version and only bump the release"
    )]
    keep_version: bool,

    #[arg(long, help = "Version source: auto, gemspec, helper, spec or file")]
    source: Option<SourceKind>,

    #[arg(long, help = "Skip the remote tag lookup")]
    offline: bool,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(long, help = "Remove the tag and commit of the release at HEAD")]
    undo: bool,

    #[arg(short, long, help = "Skip confirmation prompts")]
    force: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More log output (-v, -vv, -vvv)")]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        match e.downcast_ref::<WorkflowFailure>() {
            Some(failure) => ui::display_failure(failure),
            None => ui::display_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

/// `RUST_LOG` applies unless `-v` is given; the default level is `warn`.
fn init_logging(verbosity: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbosity > 0 {
        let level = match verbosity {
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        builder.filter_level(level);
    }
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn run(args: Args) -> Result<()> {
    let project = args
        .project
        .canonicalize()
        .with_context(|| format!("cannot open project directory {}", args.project.display()))?;

    let config = load_config(&args, &project)?;
    let spec_path = discover_spec(&project)?;
    let repo = Git2Repository::open(&project).context("not inside a git repository")?;
    let workdir = repo.workdir();
    let store = workflow::open_store(&spec_path, workdir.as_deref(), &config.tagger)?;

    if args.undo {
        return undo_release(&repo, &store, &config, args.force);
    }

    let source = detect_source(&project, &spec_path, &config)?;
    let options = TagOptions::from_config(&config.tagger)?;
    let mut workflow = TagWorkflow::new(source, &repo, store, options);

    if args.dry_run {
        let plan = workflow.plan()?;
        ui::display_plan(&plan);
        warn_on_downgrade(&plan);
        ui::display_status("Dry run: nothing was written");
        return Ok(());
    }

    ui::display_status(&format!("Tagging {}", spec_path.display()));
    let outcome = workflow.run()?;
    ui::display_plan(&outcome.plan);
    warn_on_downgrade(&outcome.plan);

    let branch = repo.current_branch()?;
    ui::display_tagged(&outcome, &config.tagger.remote, branch.as_deref());
    Ok(())
}

fn warn_on_downgrade(plan: &TagPlan) {
    if plan.is_downgrade() {
        ui::display_warning(&format!(
            "{} is older than the previous release {}-{}",
            plan.version, plan.previous_version, plan.previous_release
        ));
    }
}

/// Configuration file plus the command-line overrides
fn load_config(args: &Args, project: &Path) -> Result<Config> {
    let mut config = config::load_config(args.config.as_deref(), project)?;
    if args.offline {
        config.tagger.offline = true;
    }
    if let Some(kind) = args.source {
        config.tagger.version_source = kind;
    }
    if args.keep_version {
        config.tagger.version_source = SourceKind::Spec;
    }
    log::debug!("effective configuration: {:?}", config);
    Ok(config)
}

fn undo_release(
    repo: &Git2Repository,
    store: &MetadataStore,
    config: &Config,
    force: bool,
) -> Result<()> {
    let format = config.tagger.tag_format()?;
    let current = store.current();
    let tag = format.render(&current.package_name(), current.version(), current.release());

    if !force && !ui::confirm_action(&format!("Delete tag {} and its release commit?", tag))? {
        println!("Operation cancelled by user.");
        return Ok(());
    }

    let removed = workflow::undo_tagged_release(repo, store, &format)?;
    ui::display_success(&format!("Removed tag {} and reset HEAD to its parent", removed));
    Ok(())
}
