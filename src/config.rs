use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TaggerError};
use crate::version::TagFormat;

/// File name searched for in the project and the user config directory.
pub const CONFIG_FILE_NAME: &str = "rpm-tagger.toml";

/// Represents the complete configuration for rpm-tagger.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub tagger: TaggerConfig,

    #[serde(default)]
    pub helper: HelperConfig,
}

/// Where new changelog entries are inserted
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChangelogOrder {
    /// Most recent entry first (RPM convention)
    #[default]
    Head,
    /// Most recent entry last
    Tail,
}

/// Which version source to use; `Auto` detects by package type
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Auto,
    Gemspec,
    Helper,
    Spec,
    File,
}

impl std::str::FromStr for SourceKind {
    type Err = TaggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(SourceKind::Auto),
            "gemspec" => Ok(SourceKind::Gemspec),
            "helper" => Ok(SourceKind::Helper),
            "spec" => Ok(SourceKind::Spec),
            "file" => Ok(SourceKind::File),
            other => Err(TaggerError::config(format!(
                "unknown version source '{}'",
                other
            ))),
        }
    }
}

fn default_tag_format() -> String {
    "{name}-{version}".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_changelog_from_commits() -> bool {
    true
}

fn default_package_metadata_dir() -> String {
    "rel-eng/packages".to_string()
}

/// Tagging behaviour.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TaggerConfig {
    #[serde(default = "default_tag_format")]
    pub tag_format: String,

    #[serde(default)]
    pub changelog_order: ChangelogOrder,

    #[serde(default = "default_changelog_from_commits")]
    pub changelog_from_commits: bool,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Skip the remote tag namespace lookup
    #[serde(default)]
    pub offline: bool,

    #[serde(default)]
    pub version_source: SourceKind,

    /// Directory holding per-package `<version>-<release> <path>` records
    #[serde(default = "default_package_metadata_dir")]
    pub package_metadata_dir: String,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        TaggerConfig {
            tag_format: default_tag_format(),
            changelog_order: ChangelogOrder::default(),
            changelog_from_commits: default_changelog_from_commits(),
            remote: default_remote(),
            offline: false,
            version_source: SourceKind::default(),
            package_metadata_dir: default_package_metadata_dir(),
        }
    }
}

impl TaggerConfig {
    pub fn tag_format(&self) -> Result<TagFormat> {
        TagFormat::new(self.tag_format.clone())
    }
}

fn default_helper_program() -> String {
    "ruby".to_string()
}

/// The manifest path is passed as its own argument, never spliced into the script.
fn default_helper_args() -> Vec<String> {
    vec![
        "-e".to_string(),
        "print(Gem::Specification.load(ARGV[0]).version)".to_string(),
        "{manifest}".to_string(),
    ]
}

fn default_helper_timeout_secs() -> u64 {
    30
}

/// External evaluator used when a manifest cannot be parsed natively.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HelperConfig {
    #[serde(default = "default_helper_program")]
    pub program: String,

    #[serde(default = "default_helper_args")]
    pub args: Vec<String>,

    #[serde(default = "default_helper_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        HelperConfig {
            program: default_helper_program(),
            args: default_helper_args(),
            timeout_secs: default_helper_timeout_secs(),
        }
    }
}

impl HelperConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `rel-eng/rpm-tagger.toml` in the project directory
/// 3. `rpm-tagger.toml` in the project directory
/// 4. `rpm-tagger.toml` in the user config directory
/// 5. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
/// * `project_dir` - Root of the package being tagged
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>, project_dir: &Path) -> Result<Config> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => candidate_paths(project_dir).into_iter().find(|p| p.exists()),
    };

    let Some(path) = path else {
        log::debug!("no configuration file found, using defaults");
        return Ok(Config::default());
    };

    log::debug!("loading configuration from {}", path.display());
    let config_str = fs::read_to_string(&path)
        .map_err(|e| TaggerError::config(format!("cannot read {}: {}", path.display(), e)))?;
    let config: Config = toml::from_str(&config_str)
        .map_err(|e| TaggerError::config(format!("cannot parse {}: {}", path.display(), e)))?;

    config.tagger.tag_format()?;
    Ok(config)
}

fn candidate_paths(project_dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![
        project_dir.join("rel-eng").join(CONFIG_FILE_NAME),
        project_dir.join(CONFIG_FILE_NAME),
    ];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(CONFIG_FILE_NAME));
    }
    paths
}
