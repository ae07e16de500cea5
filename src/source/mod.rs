//! Version sources
//!
//! A [VersionSource] turns some external fact about the working tree into a
//! canonical [Version]. Every package ecosystem gets its own strategy and the
//! tag workflow only ever sees the trait.
//!
//! The concrete strategies are:
//!
//! - [GemspecSource]: reads the version declaration out of a `.gemspec` natively
//! - [HelperSource]: asks an external evaluator (by default `ruby`) to print it
//! - [SpecFileSource]: keeps whatever version the spec file already carries
//! - [VersionFileSource]: reads a plain `VERSION` file
//!
//! [detect_source] picks one by looking at the project directory.

pub mod file;
pub mod gemspec;
pub mod helper;
pub mod spec;

pub use file::VersionFileSource;
pub use gemspec::GemspecSource;
pub use helper::HelperSource;
pub use spec::SpecFileSource;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, SourceKind};
use crate::error::{Result, TaggerError};
use crate::version::Version;

/// Produces a canonical version string for the current working tree state.
///
/// Implementations must not have side effects on the working tree.
///
/// ## Errors
///
/// * [TaggerError::SourceUnavailable] - the fact cannot be read
/// * [TaggerError::AmbiguousVersion] - more than one candidate manifest exists
pub trait VersionSource {
    fn resolve(&self) -> Result<Version>;

    /// Short human-readable name, used in logs and plans
    fn describe(&self) -> String;
}

impl<T: VersionSource + ?Sized> VersionSource for Box<T> {
    fn resolve(&self) -> Result<Version> {
        (**self).resolve()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Tries `primary`, and only when it reports [TaggerError::SourceUnavailable]
/// consults `fallback`. Ambiguity is never papered over.
pub struct FallbackSource<P, F> {
    primary: P,
    fallback: F,
}

impl<P: VersionSource, F: VersionSource> FallbackSource<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        FallbackSource { primary, fallback }
    }
}

impl<P: VersionSource, F: VersionSource> VersionSource for FallbackSource<P, F> {
    fn resolve(&self) -> Result<Version> {
        match self.primary.resolve() {
            Err(TaggerError::SourceUnavailable(reason)) => {
                log::info!(
                    "{} unavailable ({}), falling back to {}",
                    self.primary.describe(),
                    reason,
                    self.fallback.describe()
                );
                self.fallback.resolve()
            }
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!("{} (fallback: {})", self.primary.describe(), self.fallback.describe())
    }
}

/// Locates the single file in `dir` whose name ends with `suffix`.
///
/// # Returns
/// * `Ok(PathBuf)` - The only matching file
/// * `Err(SourceUnavailable)` - No file matches or the directory is unreadable
/// * `Err(AmbiguousVersion)` - More than one file matches
pub fn find_single_file_with_extension(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|e| {
        TaggerError::source_unavailable(format!("cannot list {}: {}", dir.display(), e))
    })?;

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix))
        })
        .collect();
    matches.sort();

    match matches.len() {
        0 => Err(TaggerError::source_unavailable(format!(
            "no *{} file found in {}",
            suffix,
            dir.display()
        ))),
        1 => Ok(matches.remove(0)),
        _ => Err(TaggerError::AmbiguousVersion {
            pattern: format!("*{}", suffix),
            candidates: matches
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        }),
    }
}

/// Select a version source by package type.
///
/// With [SourceKind::Auto]: a `.gemspec` means a Ruby gem (native parsing with the
/// external helper as fallback), a `VERSION` file means a plain file source, and
/// anything else keeps the spec file's own version.
pub fn detect_source(
    project_dir: &Path,
    spec_path: &Path,
    config: &Config,
) -> Result<Box<dyn VersionSource>> {
    let kind = match config.tagger.version_source {
        SourceKind::Auto => detect_kind(project_dir)?,
        explicit => explicit,
    };
    log::debug!("using {:?} version source", kind);

    let source: Box<dyn VersionSource> = match kind {
        SourceKind::Gemspec | SourceKind::Auto => Box::new(FallbackSource::new(
            GemspecSource::new(project_dir),
            HelperSource::from_config(project_dir, ".gemspec", &config.helper),
        )),
        SourceKind::Helper => Box::new(HelperSource::from_config(
            project_dir,
            ".gemspec",
            &config.helper,
        )),
        SourceKind::Spec => Box::new(SpecFileSource::new(spec_path)),
        SourceKind::File => Box::new(VersionFileSource::new(project_dir)),
    };
    Ok(source)
}

fn detect_kind(project_dir: &Path) -> Result<SourceKind> {
    match find_single_file_with_extension(project_dir, ".gemspec") {
        Ok(_) => return Ok(SourceKind::Gemspec),
        // Several gemspecs is still a gem; let resolve() report the ambiguity
        Err(TaggerError::AmbiguousVersion { .. }) => return Ok(SourceKind::Gemspec),
        Err(_) => {}
    }
    if project_dir.join(file::VERSION_FILE_NAME).is_file() {
        return Ok(SourceKind::File);
    }
    Ok(SourceKind::Spec)
}
