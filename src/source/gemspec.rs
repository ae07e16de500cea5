use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, TaggerError};
use crate::source::{find_single_file_with_extension, VersionSource};
use crate::version::Version;

/// `s.version = "1.0.2"`
static LITERAL_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*\w+\.version\s*=\s*["']([^"']+)["']"#).expect("literal version pattern")
});

/// `s.version = Foo::Bar::VERSION`
static CONSTANT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\w+\.version\s*=\s*((?:[A-Z]\w*::)+VERSION)\b")
        .expect("constant version pattern")
});

/// `VERSION = '1.0.2'` in a version.rb
static VERSION_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*VERSION\s*=\s*["']([^"']+)["']"#).expect("version assignment pattern")
});

/// Reads a gem's version without executing any Ruby.
///
/// Understands the two declarations found in practice:
///
/// ```text
/// s.version = "1.0.2"
/// s.version = DumbLogger::VERSION    # resolved from lib/**/version.rb
/// ```
///
/// Anything computed at load time is reported as unavailable so a fallback can take over.
pub struct GemspecSource {
    project_dir: PathBuf,
}

impl GemspecSource {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        GemspecSource {
            project_dir: project_dir.into(),
        }
    }

    fn resolve_constant(&self, constant: &str) -> Result<Version> {
        let lib_dir = self.project_dir.join("lib");
        let mut version_files = Vec::new();
        collect_version_files(&lib_dir, &mut version_files)?;

        let mut found: Vec<(PathBuf, String)> = Vec::new();
        for path in version_files {
            let content = fs::read_to_string(&path).map_err(|e| {
                TaggerError::source_unavailable(format!("cannot read {}: {}", path.display(), e))
            })?;
            if let Some(caps) = VERSION_ASSIGNMENT.captures(&content) {
                found.push((path, caps[1].to_string()));
            }
        }

        match found.len() {
            0 => Err(TaggerError::source_unavailable(format!(
                "{} is not a literal string in any lib/**/version.rb",
                constant
            ))),
            1 => Version::parse(&found[0].1),
            _ => Err(TaggerError::AmbiguousVersion {
                pattern: "lib/**/version.rb".to_string(),
                candidates: found.iter().map(|(p, _)| p.display().to_string()).collect(),
            }),
        }
    }
}

impl VersionSource for GemspecSource {
    fn resolve(&self) -> Result<Version> {
        let manifest = find_single_file_with_extension(&self.project_dir, ".gemspec")?;
        let content = fs::read_to_string(&manifest).map_err(|e| {
            TaggerError::source_unavailable(format!("cannot read {}: {}", manifest.display(), e))
        })?;
        log::debug!("parsing version declaration in {}", manifest.display());

        if let Some(caps) = LITERAL_VERSION.captures(&content) {
            return Version::parse(&caps[1]);
        }

        if let Some(caps) = CONSTANT_VERSION.captures(&content) {
            return self.resolve_constant(&caps[1]);
        }

        Err(TaggerError::source_unavailable(format!(
            "no literal version declaration in {}",
            manifest.display()
        )))
    }

    fn describe(&self) -> String {
        "gemspec".to_string()
    }
}

fn collect_version_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let entries = fs::read_dir(dir).map_err(|e| {
        TaggerError::source_unavailable(format!("cannot list {}: {}", dir.display(), e))
    })?;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            collect_version_files(&path, out)?;
        } else if path.file_name().is_some_and(|n| n == "version.rb") {
            out.push(path);
        }
    }
    out.sort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(gemspec: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pkg.gemspec"), gemspec).unwrap();
        dir
    }

    #[test]
    fn test_literal_version() {
        let dir = project(
            "Gem::Specification.new do |s|\n  s.name = 'pkg'\n  s.version = \"2.3.0\"\nend\n",
        );
        let version = GemspecSource::new(dir.path()).resolve().unwrap();
        assert_eq!(version.as_str(), "2.3.0");
    }

    #[test]
    fn test_constant_version() {
        let dir = project(
            "Gem::Specification.new do |spec|\n  spec.version = Pkg::VERSION\nend\n",
        );
        fs::create_dir_all(dir.path().join("lib/pkg")).unwrap();
        fs::write(
            dir.path().join("lib/pkg/version.rb"),
            "module Pkg\n  VERSION = '1.4.2'.freeze\nend\n",
        )
        .unwrap();

        let version = GemspecSource::new(dir.path()).resolve().unwrap();
        assert_eq!(version.as_str(), "1.4.2");
    }

    #[test]
    fn test_computed_constant_is_unavailable() {
        let dir = project("Gem::Specification.new do |s|\n  s.version = Pkg::VERSION\nend\n");
        fs::create_dir_all(dir.path().join("lib/pkg")).unwrap();
        fs::write(
            dir.path().join("lib/pkg/version.rb"),
            "class Pkg\n  VERSION = @version.to_s.freeze\nend\n",
        )
        .unwrap();

        let err = GemspecSource::new(dir.path()).resolve().unwrap_err();
        assert!(matches!(err, TaggerError::SourceUnavailable(_)));
    }

    #[test]
    fn test_missing_gemspec() {
        let dir = TempDir::new().unwrap();
        let err = GemspecSource::new(dir.path()).resolve().unwrap_err();
        assert!(matches!(err, TaggerError::SourceUnavailable(_)));
    }

    #[test]
    fn test_two_gemspecs_are_ambiguous() {
        let dir = project("s.version = '1.0'\n");
        fs::write(dir.path().join("other.gemspec"), "s.version = '2.0'\n").unwrap();

        let err = GemspecSource::new(dir.path()).resolve().unwrap_err();
        assert!(matches!(err, TaggerError::AmbiguousVersion { .. }));
    }
}
