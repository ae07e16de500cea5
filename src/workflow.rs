//! Release tagging workflow
//!
//! [TagWorkflow] drives one tagging run through a fixed sequence of states:
//!
//! ```text
//! Start -> VersionResolved -> Validated -> MetadataStaged -> MetadataFlushed -> Committed -> Tagged
//! ```
//!
//! Any state may move to `Failed(stage)`. Once the spec file has been written,
//! a failure is rolled back before it is reported, so an unsuccessful run
//! leaves the working tree and the history as they were before it started.
//!
//! The version comes from a [VersionSource] injected at construction; the
//! workflow itself does not know which package ecosystem it is tagging.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::config::{ChangelogOrder, TaggerConfig};
use crate::error::{ErrorKind, Result, TaggerError};
use crate::git::Repository;
use crate::guard::TagGuard;
use crate::metadata::store::next_release;
use crate::metadata::{ChangelogEntry, MetadataStore};
use crate::source::VersionSource;
use crate::version::{TagFormat, Version};

/// Subject prefix of commits made by this tool; they never show up in changelogs
const COMMIT_PREFIX: &str = "Automatic commit of package";

/// The step a run was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveVersion,
    Validate,
    StageMetadata,
    FlushMetadata,
    Commit,
    Tag,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResolveVersion => "version resolution",
            Stage::Validate => "tag validation",
            Stage::StageMetadata => "metadata staging",
            Stage::FlushMetadata => "metadata write",
            Stage::Commit => "commit",
            Stage::Tag => "tag creation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Start,
    VersionResolved,
    Validated,
    MetadataStaged,
    MetadataFlushed,
    Committed,
    Tagged,
    Failed(Stage),
}

/// What happened to partial work when a run failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
    /// Nothing had been written yet
    NotNeeded,
    Completed,
    /// The rollback itself failed; the working tree needs manual attention
    Failed(String),
}

/// A failed run: the stage, its cause, and the rollback outcome
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct WorkflowFailure {
    pub stage: Stage,
    pub error: TaggerError,
    pub rollback: Rollback,
}

impl WorkflowFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Tagging knobs taken from [TaggerConfig]
#[derive(Debug, Clone, PartialEq)]
pub struct TagOptions {
    pub tag_format: TagFormat,
    pub changelog_order: ChangelogOrder,
    pub changelog_from_commits: bool,
    pub remote: String,
    pub offline: bool,
}

impl TagOptions {
    pub fn from_config(config: &TaggerConfig) -> Result<Self> {
        Ok(TagOptions {
            tag_format: config.tag_format()?,
            changelog_order: config.changelog_order,
            changelog_from_commits: config.changelog_from_commits,
            remote: config.remote.clone(),
            offline: config.offline,
        })
    }
}

impl Default for TagOptions {
    fn default() -> Self {
        let config = TaggerConfig::default();
        TagOptions {
            tag_format: TagFormat::default(),
            changelog_order: config.changelog_order,
            changelog_from_commits: config.changelog_from_commits,
            remote: config.remote,
            offline: config.offline,
        }
    }
}

/// Everything a run will do, computed before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPlan {
    pub package: String,
    /// Description of the version source that produced `version`
    pub source: String,
    pub previous_version: Version,
    pub previous_release: u32,
    pub version: Version,
    pub release: u32,
    pub tag: String,
    pub changelog: Vec<String>,
}

impl TagPlan {
    /// Same version as before, only the release counter moves
    pub fn is_zstream(&self) -> bool {
        self.version == self.previous_version
    }

    /// The resolved version sorts before the one already in the spec
    pub fn is_downgrade(&self) -> bool {
        self.version < self.previous_version
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOutcome {
    pub plan: TagPlan,
    /// Hex id of the release commit
    pub commit: String,
}

/// One tagging run over a single package.
///
/// # Example
///
/// ```rust,no_run
/// use rpm_tagger::git::Git2Repository;
/// use rpm_tagger::metadata::MetadataStore;
/// use rpm_tagger::source::SpecFileSource;
/// use rpm_tagger::workflow::{TagOptions, TagWorkflow};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = Git2Repository::open(".")?;
/// let store = MetadataStore::open("pkg.spec")?;
/// let source = Box::new(SpecFileSource::new("pkg.spec"));
///
/// let mut workflow = TagWorkflow::new(source, &repo, store, TagOptions::default());
/// let outcome = workflow.run()?;
/// println!("created {}", outcome.plan.tag);
/// # Ok(())
/// # }
/// ```
pub struct TagWorkflow<'a, R: Repository + ?Sized> {
    source: Box<dyn VersionSource + 'a>,
    repo: &'a R,
    store: MetadataStore,
    options: TagOptions,
    state: WorkflowState,
    plan: Option<TagPlan>,
    commit: Option<String>,
}

impl<'a, R: Repository + ?Sized> TagWorkflow<'a, R> {
    pub fn new(
        source: Box<dyn VersionSource + 'a>,
        repo: &'a R,
        store: MetadataStore,
        options: TagOptions,
    ) -> Self {
        TagWorkflow {
            source,
            repo,
            store,
            options,
            state: WorkflowState::Start,
            plan: None,
            commit: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Resolve the version and check the tag is free, without writing anything.
    ///
    /// Leaves the workflow in [WorkflowState::Validated]; a later [TagWorkflow::run]
    /// reuses the plan instead of resolving again.
    pub fn plan(&mut self) -> std::result::Result<TagPlan, WorkflowFailure> {
        match self.state {
            WorkflowState::Start => {}
            WorkflowState::Validated => {
                if let Some(plan) = &self.plan {
                    return Ok(plan.clone());
                }
            }
            other => return Err(invalid_state(Stage::ResolveVersion, other)),
        }

        let version = match self.source.resolve() {
            Ok(version) => version,
            Err(e) => return Err(self.fail(Stage::ResolveVersion, e)),
        };
        log::info!("{} resolved version {}", self.source.describe(), version);
        self.transition(WorkflowState::VersionResolved);

        let plan = match self.validate(version) {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(Stage::Validate, e)),
        };
        self.plan = Some(plan.clone());
        self.transition(WorkflowState::Validated);
        Ok(plan)
    }

    /// Run every step through to the tag.
    ///
    /// On failure after the spec file was written, the run is rolled back
    /// before the error is returned; see [WorkflowFailure::rollback].
    pub fn run(&mut self) -> std::result::Result<TagOutcome, WorkflowFailure> {
        let plan = self.plan()?;

        if let Err(e) = self.stage_metadata(&plan) {
            return Err(self.fail(Stage::StageMetadata, e));
        }
        self.transition(WorkflowState::MetadataStaged);

        if let Err(e) = self.store.flush() {
            return Err(self.fail(Stage::FlushMetadata, e));
        }
        self.transition(WorkflowState::MetadataFlushed);

        let message = format!(
            "{} [{}] release [{}-{}].",
            COMMIT_PREFIX, plan.package, plan.version, plan.release
        );
        let commit = match self.repo.commit(&self.store.paths(), &message) {
            Ok(id) => id,
            Err(e) => return Err(self.fail(Stage::Commit, e)),
        };
        self.commit = Some(commit.clone());
        self.transition(WorkflowState::Committed);

        let tag_message = format!("Tagging package [{}] version [{}].", plan.package, plan.tag);
        if let Err(e) = self.repo.create_tag(&plan.tag, &tag_message) {
            return Err(self.fail(Stage::Tag, e));
        }
        self.transition(WorkflowState::Tagged);
        log::info!("created tag {} at {}", plan.tag, commit);

        Ok(TagOutcome { plan, commit })
    }

    /// Put the working tree and history back to how they were before the run.
    ///
    /// Calling it more than once, or before anything was written, is harmless.
    /// A finished run is not undone here; use [undo_tagged_release].
    pub fn undo(&mut self) -> Result<()> {
        if self.state == WorkflowState::Tagged {
            return Err(TaggerError::InvalidState(
                "the release is already tagged".to_string(),
            ));
        }
        self.rollback()?;
        if !matches!(self.state, WorkflowState::Failed(_)) {
            self.plan = None;
            self.transition(WorkflowState::Start);
        }
        Ok(())
    }

    fn validate(&self, version: Version) -> Result<TagPlan> {
        let current = self.store.current();
        let previous_version = current.version().clone();
        let previous_release = current.release();
        if version < previous_version {
            log::warn!(
                "resolved version {} is older than the spec's {}",
                version,
                previous_version
            );
        }

        let release = if version == previous_version {
            next_release(previous_release)?
        } else {
            1
        };
        let package = current.package_name();
        let tag = self.options.tag_format.render(&package, &version, release);

        TagGuard::new(self.repo, self.options.remote.clone())
            .offline(self.options.offline)
            .check_available(&tag)?;

        let changelog = self.changelog_lines(&package, &version)?;
        Ok(TagPlan {
            package,
            source: self.source.describe(),
            previous_version,
            previous_release,
            version,
            release,
            tag,
            changelog,
        })
    }

    /// Commit subjects since the package's previous tag, or a generic line
    fn changelog_lines(&self, package: &str, version: &Version) -> Result<Vec<String>> {
        if self.options.changelog_from_commits {
            let prefix = self.options.tag_format.prefix_for(package);
            if let Some(previous) = self.repo.latest_tag_with_prefix(&prefix)? {
                let subjects: Vec<String> = self
                    .repo
                    .commit_subjects_since(Some(&previous))?
                    .into_iter()
                    .filter(|subject| !subject.starts_with(COMMIT_PREFIX))
                    .collect();
                if !subjects.is_empty() {
                    return Ok(subjects);
                }
            }
        }
        Ok(vec![format!("Release {}", version)])
    }

    fn stage_metadata(&mut self, plan: &TagPlan) -> Result<()> {
        let identity = self.repo.identity()?;
        if plan.is_zstream() {
            self.store.bump_release()?;
        } else {
            self.store.set_version(plan.version.clone());
        }
        let entry = ChangelogEntry::today(
            identity.name,
            identity.email,
            plan.version.clone(),
            plan.release,
            plan.changelog.clone(),
        );
        self.store.append_changelog(&entry, self.options.changelog_order);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.commit.is_some() {
            self.repo.revert_commit(&self.store.paths())?;
            self.commit = None;
            log::debug!("reverted release commit");
        }
        // Also discards staged edits that never reached disk
        self.store.restore()
    }

    fn fail(&mut self, stage: Stage, error: TaggerError) -> WorkflowFailure {
        let rollback = if self.commit.is_some() || self.store.is_flushed() {
            match self.rollback() {
                Ok(()) => Rollback::Completed,
                Err(e) => {
                    log::error!("rollback after failed {} did not complete: {}", stage, e);
                    Rollback::Failed(e.to_string())
                }
            }
        } else {
            Rollback::NotNeeded
        };
        self.transition(WorkflowState::Failed(stage));
        WorkflowFailure {
            stage,
            error,
            rollback,
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        log::debug!("workflow {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn invalid_state(stage: Stage, state: WorkflowState) -> WorkflowFailure {
    WorkflowFailure {
        stage,
        error: TaggerError::InvalidState(format!("cannot start a run from {:?}", state)),
        rollback: Rollback::NotNeeded,
    }
}

/// Remove a release made by an earlier run: delete its tag, drop the release
/// commit, and put the spec file back to the previous commit's content.
///
/// Refuses unless HEAD carries the tag for the spec's current version and
/// release, so unrelated history is never rewritten.
///
/// # Returns
/// * `Ok(String)` - The deleted tag
/// * `Err(InvalidState)` - HEAD is not at the release tag
pub fn undo_tagged_release<R: Repository + ?Sized>(
    repo: &R,
    store: &MetadataStore,
    format: &TagFormat,
) -> Result<String> {
    let current = store.current();
    let tag = format.render(&current.package_name(), current.version(), current.release());
    if !repo.head_points_to_tag(&tag)? {
        return Err(TaggerError::InvalidState(format!(
            "HEAD is not at tag {}, nothing to undo",
            tag
        )));
    }

    let paths = store.paths();
    repo.delete_tag(&tag)?;
    repo.revert_commit(&paths)?;
    repo.checkout_paths(&paths)?;
    log::info!("removed tag {} and its release commit", tag);
    Ok(tag)
}

/// Open the package's [MetadataStore], attaching the package record under
/// `package_metadata_dir` when the repository has that directory.
pub fn open_store(
    spec_path: &Path,
    workdir: Option<&Path>,
    config: &TaggerConfig,
) -> Result<MetadataStore> {
    let store = MetadataStore::open(spec_path)?;
    let Some(workdir) = workdir else {
        return Ok(store);
    };
    let records = workdir.join(&config.package_metadata_dir);
    if !records.is_dir() {
        return Ok(store);
    }

    let package_dir = spec_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let relative = relative_dir(workdir, package_dir);
    let record = records.join(store.current().package_name());
    log::debug!("tracking package record {}", record.display());
    store.with_package_record(record, relative)
}

/// `dir` relative to `workdir` with a trailing slash; `./` for the root
fn relative_dir(workdir: &Path, dir: &Path) -> String {
    let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    match canonical(dir).strip_prefix(canonical(workdir)) {
        Ok(rel) if !rel.as_os_str().is_empty() => format!("{}/", rel.display()),
        _ => "./".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TagLocation;
    use crate::git::MockRepository;
    use crate::source::HelperSource;
    use chrono::Local;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    const SPEC: &str = "\
Name:           pkg
Version:        2.2.0
Release:        3%{?dist}
Summary:        Example package

%description
Example.

%changelog
* Mon Feb 02 2015 Ken <ken@example.org> - 2.2.0-3
- Old release
";

    struct Fixed(&'static str);

    impl VersionSource for Fixed {
        fn resolve(&self) -> Result<Version> {
            Version::parse(self.0)
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn setup() -> (TempDir, PathBuf, MockRepository) {
        let dir = TempDir::new().unwrap();
        let spec = dir.path().join("pkg.spec");
        fs::write(&spec, SPEC).unwrap();
        let repo = MockRepository::new().with_workdir(dir.path());
        repo.add_commit("Initial import");
        (dir, spec, repo)
    }

    fn workflow<'a>(
        source: Box<dyn VersionSource + 'a>,
        repo: &'a MockRepository,
        spec: &Path,
        options: TagOptions,
    ) -> TagWorkflow<'a, MockRepository> {
        let store = MetadataStore::open(spec).unwrap();
        TagWorkflow::new(source, repo, store, options)
    }

    #[test]
    fn test_new_version_end_to_end() {
        let (_dir, spec, repo) = setup();
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());

        let outcome = wf.run().unwrap();
        assert_eq!(outcome.plan.tag, "pkg-2.3.0");
        assert_eq!(outcome.plan.release, 1);
        assert_eq!(wf.state(), WorkflowState::Tagged);
        assert_eq!(repo.local_tags(), vec!["pkg-2.3.0".to_string()]);

        let commits = repo.commits();
        let last = commits.last().unwrap();
        assert_eq!(last.id, outcome.commit);
        assert_eq!(
            last.message,
            "Automatic commit of package [pkg] release [2.3.0-1]."
        );
        assert_eq!(last.paths, vec![spec.clone()]);

        let written = fs::read_to_string(&spec).unwrap();
        let today = Local::now().date_naive().format("%a %b %d %Y").to_string();
        assert!(written.contains("Version:        2.3.0\n"));
        assert!(written.contains("Release:        1%{?dist}\n"));
        assert!(written.contains(&format!(
            "%changelog\n* {} Mock Packager <packager@example.com> - 2.3.0-1\n- Release 2.3.0\n\n* Mon Feb 02 2015",
            today
        )));
    }

    #[test]
    fn test_remote_collision_leaves_metadata_untouched() {
        let (_dir, spec, repo) = setup();
        repo.add_remote_tag("pkg-2.3.0");
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());

        let failure = wf.run().unwrap_err();
        assert_eq!(failure.stage, Stage::Validate);
        assert_eq!(failure.kind(), ErrorKind::TagAlreadyExists(TagLocation::Remote));
        assert_eq!(failure.rollback, Rollback::NotNeeded);
        assert_eq!(wf.state(), WorkflowState::Failed(Stage::Validate));
        assert_eq!(fs::read_to_string(&spec).unwrap(), SPEC);
        assert_eq!(repo.commits().len(), 1);
    }

    #[test]
    fn test_commit_failure_restores_spec() {
        let (_dir, spec, repo) = setup();
        repo.fail_on_commit();
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());

        let failure = wf.run().unwrap_err();
        assert_eq!(failure.stage, Stage::Commit);
        assert_eq!(failure.kind(), ErrorKind::Commit);
        assert_eq!(failure.rollback, Rollback::Completed);
        assert_eq!(fs::read_to_string(&spec).unwrap(), SPEC);

        wf.undo().unwrap();
        wf.undo().unwrap();
        assert_eq!(fs::read_to_string(&spec).unwrap(), SPEC);
        assert!(failure.to_string().starts_with("commit failed: "));
    }

    #[test]
    fn test_tag_failure_reverts_commit_and_spec() {
        let (_dir, spec, repo) = setup();
        repo.fail_on_tag();
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());

        let failure = wf.run().unwrap_err();
        assert_eq!(failure.stage, Stage::Tag);
        assert_eq!(failure.kind(), ErrorKind::TagCreation);
        assert_eq!(failure.rollback, Rollback::Completed);
        assert_eq!(repo.commits().len(), 1);
        assert!(repo.local_tags().is_empty());
        assert_eq!(fs::read_to_string(&spec).unwrap(), SPEC);
    }

    #[test]
    fn test_same_version_bumps_release() {
        let (_dir, spec, repo) = setup();
        let options = TagOptions {
            tag_format: TagFormat::new("{name}-{version}-{release}").unwrap(),
            ..TagOptions::default()
        };
        let mut wf = workflow(Box::new(Fixed("2.2.0")), &repo, &spec, options);

        let outcome = wf.run().unwrap();
        assert!(outcome.plan.is_zstream());
        assert_eq!(outcome.plan.release, 4);
        assert_eq!(outcome.plan.tag, "pkg-2.2.0-4");
        assert_eq!(wf.store().current().release(), 4);
        assert!(fs::read_to_string(&spec)
            .unwrap()
            .contains("Release:        4%{?dist}\n"));
    }

    #[test]
    fn test_release_counter_overflow_fails_validation() {
        let (_dir, spec, repo) = setup();
        let written = SPEC.replace("3%{?dist}", "4294967295");
        fs::write(&spec, &written).unwrap();
        let mut wf = workflow(Box::new(Fixed("2.2.0")), &repo, &spec, TagOptions::default());

        let failure = wf.plan().unwrap_err();
        assert_eq!(failure.stage, Stage::Validate);
        assert_eq!(failure.kind(), ErrorKind::Metadata);
        assert_eq!(failure.rollback, Rollback::NotNeeded);
        assert_eq!(fs::read_to_string(&spec).unwrap(), written);
    }

    #[test]
    fn test_point_release_under_default_format_gets_release_suffix() {
        let (_dir, spec, repo) = setup();
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());
        assert_eq!(wf.run().unwrap().plan.tag, "pkg-2.3.0");
        repo.add_commit("Fix packaging");

        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());
        let outcome = wf.run().unwrap();
        assert!(outcome.plan.is_zstream());
        assert_eq!(outcome.plan.release, 2);
        assert_eq!(outcome.plan.tag, "pkg-2.3.0-2");
        assert_eq!(
            repo.local_tags(),
            vec!["pkg-2.3.0".to_string(), "pkg-2.3.0-2".to_string()]
        );
    }

    #[test]
    fn test_changelog_uses_subjects_since_previous_tag() {
        let (_dir, spec, repo) = setup();
        repo.add_local_tag("pkg-2.2.0");
        repo.add_commit("Fix log rotation");
        repo.add_commit("Automatic commit of package [pkg] release [2.2.0-3].");
        repo.add_commit("Add seek-to-eof option");
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());

        let plan = wf.plan().unwrap();
        assert_eq!(
            plan.changelog,
            vec![
                "Add seek-to-eof option".to_string(),
                "Fix log rotation".to_string()
            ]
        );
    }

    #[test]
    fn test_plan_writes_nothing() {
        let (_dir, spec, repo) = setup();
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());

        let plan = wf.plan().unwrap();
        assert_eq!(plan.previous_version.as_str(), "2.2.0");
        assert_eq!(plan.previous_release, 3);
        assert_eq!(plan.source, "fixed");
        assert!(!plan.is_downgrade());
        assert_eq!(wf.state(), WorkflowState::Validated);
        assert_eq!(fs::read_to_string(&spec).unwrap(), SPEC);

        let outcome = wf.run().unwrap();
        assert_eq!(outcome.plan, plan);
    }

    #[test]
    fn test_older_version_is_planned_as_downgrade() {
        let (_dir, spec, repo) = setup();
        let mut wf = workflow(Box::new(Fixed("2.1.0")), &repo, &spec, TagOptions::default());

        let plan = wf.plan().unwrap();
        assert!(plan.is_downgrade());
        assert_eq!(plan.release, 1);
        assert_eq!(plan.tag, "pkg-2.1.0");
    }

    #[test]
    fn test_unavailable_helper_fails_identically_twice() {
        let (dir, spec, repo) = setup();
        fs::write(dir.path().join("pkg.gemspec"), "Gem::Specification.new\n").unwrap();

        let mut kinds = Vec::new();
        for _ in 0..2 {
            let source = HelperSource::new(
                dir.path(),
                ".gemspec",
                "/nonexistent/rpm-tagger-helper",
                vec!["{manifest}".to_string()],
                Duration::from_secs(1),
            );
            let mut wf = workflow(Box::new(source), &repo, &spec, TagOptions::default());
            let failure = wf.run().unwrap_err();
            assert_eq!(failure.stage, Stage::ResolveVersion);
            kinds.push(failure.kind());
            assert_eq!(fs::read_to_string(&spec).unwrap(), SPEC);
        }
        assert_eq!(kinds, vec![ErrorKind::SourceUnavailable; 2]);
        assert_eq!(repo.commits().len(), 1);
    }

    #[test]
    fn test_failed_workflow_cannot_rerun() {
        let (_dir, spec, repo) = setup();
        repo.add_remote_tag("pkg-2.3.0");
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());

        wf.run().unwrap_err();
        let failure = wf.run().unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_undo_refused_after_tag() {
        let (_dir, spec, repo) = setup();
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());
        wf.run().unwrap();

        let err = wf.undo().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_undo_tagged_release() {
        let (_dir, spec, repo) = setup();
        let mut wf = workflow(Box::new(Fixed("2.3.0")), &repo, &spec, TagOptions::default());
        wf.run().unwrap();

        let store = MetadataStore::open(&spec).unwrap();
        let tag = undo_tagged_release(&repo, &store, &TagFormat::default()).unwrap();
        assert_eq!(tag, "pkg-2.3.0");
        assert!(repo.local_tags().is_empty());
        assert_eq!(repo.commits().len(), 1);

        let err = undo_tagged_release(&repo, &store, &TagFormat::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_open_store_attaches_package_record() {
        let (dir, spec, _repo) = setup();
        let config = TaggerConfig::default();

        let store = open_store(&spec, Some(dir.path()), &config).unwrap();
        assert_eq!(store.paths().len(), 1);

        fs::create_dir_all(dir.path().join("rel-eng/packages")).unwrap();
        let store = open_store(&spec, Some(dir.path()), &config).unwrap();
        assert_eq!(
            store.paths()[1],
            dir.path().join("rel-eng/packages").join("pkg")
        );
    }

    #[test]
    fn test_relative_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("gems/logger")).unwrap();
        assert_eq!(relative_dir(dir.path(), dir.path()), "./");
        assert_eq!(
            relative_dir(dir.path(), &dir.path().join("gems/logger")),
            "gems/logger/"
        );
    }
}
