use std::fs;
use std::path::PathBuf;

use crate::error::{Result, TaggerError};
use crate::metadata::SpecDocument;
use crate::source::VersionSource;
use crate::version::Version;

/// Keeps the version the spec file already declares.
///
/// Tagging with this source always takes the point-release path: the version
/// is unchanged, so only the release counter moves.
pub struct SpecFileSource {
    spec_path: PathBuf,
}

impl SpecFileSource {
    pub fn new(spec_path: impl Into<PathBuf>) -> Self {
        SpecFileSource {
            spec_path: spec_path.into(),
        }
    }
}

impl VersionSource for SpecFileSource {
    fn resolve(&self) -> Result<Version> {
        let content = fs::read_to_string(&self.spec_path).map_err(|e| {
            TaggerError::source_unavailable(format!(
                "cannot read {}: {}",
                self.spec_path.display(),
                e
            ))
        })?;
        let document = SpecDocument::parse(&content)
            .map_err(|e| TaggerError::source_unavailable(e.to_string()))?;
        Ok(document.version().clone())
    }

    fn describe(&self) -> String {
        "spec file".to_string()
    }
}
