use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ChangelogOrder;
use crate::error::{Result, TaggerError};
use crate::metadata::atomic::write_atomic;
use crate::metadata::{ChangelogEntry, SpecDocument};
use crate::version::Version;

/// Per-package `<version>-<release> <relative dir>/` record kept next to the spec
#[derive(Debug, Clone)]
struct PackageRecord {
    path: PathBuf,
    /// Content before this run; `None` when the file did not exist
    original: Option<String>,
    relative_dir: String,
}

impl PackageRecord {
    fn render(&self, version: &Version, release: u32) -> String {
        format!("{}-{} {}\n", version, release, self.relative_dir)
    }
}

/// Staged view of a package's build metadata.
///
/// All mutations act on an in-memory copy; [MetadataStore::flush] is the only
/// call that writes, and [MetadataStore::restore] puts back the snapshot taken
/// at [MetadataStore::open].
pub struct MetadataStore {
    spec_path: PathBuf,
    original: String,
    staged: SpecDocument,
    record: Option<PackageRecord>,
    flushed: bool,
}

impl MetadataStore {
    /// Read and parse the spec file at `spec_path`
    pub fn open(spec_path: impl Into<PathBuf>) -> Result<Self> {
        let spec_path = spec_path.into();
        let original = fs::read_to_string(&spec_path).map_err(|e| {
            TaggerError::metadata(format!("cannot read {}: {}", spec_path.display(), e))
        })?;
        let staged = SpecDocument::parse(&original)?;
        log::debug!(
            "opened {} at {}-{}",
            spec_path.display(),
            staged.version(),
            staged.release()
        );

        Ok(MetadataStore {
            spec_path,
            original,
            staged,
            record: None,
            flushed: false,
        })
    }

    /// Also maintain the package record at `path` (tito's `rel-eng/packages/<name>`).
    pub fn with_package_record(
        mut self,
        path: impl Into<PathBuf>,
        relative_dir: impl Into<String>,
    ) -> Result<Self> {
        let path = path.into();
        let original = match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(TaggerError::metadata(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        self.record = Some(PackageRecord {
            path,
            original,
            relative_dir: relative_dir.into(),
        });
        Ok(self)
    }

    pub fn spec_path(&self) -> &Path {
        &self.spec_path
    }

    /// Paths this store writes on flush
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.spec_path.clone()];
        if let Some(record) = &self.record {
            paths.push(record.path.clone());
        }
        paths
    }

    /// Whether staged edits have been written and not yet restored
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// The staged document, including unflushed edits
    pub fn current(&self) -> &SpecDocument {
        &self.staged
    }

    /// Overwrite the version and reset the release counter to 1
    pub fn set_version(&mut self, version: Version) {
        self.staged.set_version(version);
        self.staged.set_release(1);
    }

    /// Increment the release counter, leaving the version alone.
    ///
    /// Returns the new counter.
    pub fn bump_release(&mut self) -> Result<u32> {
        let next = next_release(self.staged.release())?;
        self.staged.set_release(next);
        Ok(next)
    }

    pub fn append_changelog(&mut self, entry: &ChangelogEntry, order: ChangelogOrder) {
        self.staged.add_changelog_entry(entry, order);
    }

    /// Write the staged metadata to disk.
    ///
    /// The spec file is replaced atomically; if the package record cannot be
    /// written afterwards the spec file is put back before the error is returned.
    pub fn flush(&mut self) -> Result<()> {
        write_atomic(&self.spec_path, &self.staged.render()).map_err(|source| {
            TaggerError::MetadataWrite {
                path: self.spec_path.clone(),
                source,
            }
        })?;

        if let Some(record) = &self.record {
            let contents = record.render(self.staged.version(), self.staged.release());
            if let Err(source) = write_atomic(&record.path, &contents) {
                write_atomic(&self.spec_path, &self.original).map_err(|e| {
                    TaggerError::Rollback(format!(
                        "cannot restore {}: {}",
                        self.spec_path.display(),
                        e
                    ))
                })?;
                return Err(TaggerError::MetadataWrite {
                    path: record.path.clone(),
                    source,
                });
            }
        }

        self.flushed = true;
        log::debug!("flushed {}", self.spec_path.display());
        Ok(())
    }

    /// Put every file back to its state at [MetadataStore::open] and discard
    /// staged edits. Safe to call repeatedly.
    pub fn restore(&mut self) -> Result<()> {
        if self.flushed {
            write_atomic(&self.spec_path, &self.original).map_err(|e| {
                TaggerError::Rollback(format!(
                    "cannot restore {}: {}",
                    self.spec_path.display(),
                    e
                ))
            })?;

            if let Some(record) = &self.record {
                let result = match &record.original {
                    Some(content) => write_atomic(&record.path, content),
                    None => match fs::remove_file(&record.path) {
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                        other => other,
                    },
                };
                result.map_err(|e| {
                    TaggerError::Rollback(format!(
                        "cannot restore {}: {}",
                        record.path.display(),
                        e
                    ))
                })?;
            }
            self.flushed = false;
            log::debug!("restored {}", self.spec_path.display());
        }

        self.staged = SpecDocument::parse(&self.original)?;
        Ok(())
    }
}

/// The release counter after `release`
pub fn next_release(release: u32) -> Result<u32> {
    release
        .checked_add(1)
        .ok_or_else(|| TaggerError::metadata("release counter overflow"))
}

/// Find the single `*.spec` file in `dir`
pub fn discover_spec(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir)
        .map_err(|e| TaggerError::metadata(format!("cannot list {}: {}", dir.display(), e)))?;
    let mut specs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "spec"))
        .collect();
    specs.sort();

    match specs.len() {
        1 => Ok(specs.remove(0)),
        0 => Err(TaggerError::metadata(format!(
            "no .spec file found in {}",
            dir.display()
        ))),
        _ => Err(TaggerError::metadata(format!(
            "multiple .spec files found in {}: {}",
            dir.display(),
            specs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
