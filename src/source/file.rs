use std::fs;
use std::path::PathBuf;

use crate::error::{Result, TaggerError};
use crate::source::VersionSource;
use crate::version::Version;

pub const VERSION_FILE_NAME: &str = "VERSION";

/// Reads the version from a `VERSION` file at the project root.
///
/// The first non-empty, non-comment line is the version.
pub struct VersionFileSource {
    project_dir: PathBuf,
}

impl VersionFileSource {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        VersionFileSource {
            project_dir: project_dir.into(),
        }
    }
}

impl VersionSource for VersionFileSource {
    fn resolve(&self) -> Result<Version> {
        let path = self.project_dir.join(VERSION_FILE_NAME);
        let content = fs::read_to_string(&path).map_err(|e| {
            TaggerError::source_unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;

        let line = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .ok_or_else(|| {
                TaggerError::source_unavailable(format!("{} is empty", path.display()))
            })?;
        Version::parse(line)
    }

    fn describe(&self) -> String {
        "VERSION file".to_string()
    }
}
