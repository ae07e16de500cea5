//! Version tokens and tag-name derivation.
//!
//! A [Version] is whatever the package's source of truth declares. It is never
//! decomposed into semantic components; ordering follows RPM's segment-wise
//! comparison so that `1.10` sorts after `1.9` and `1.0~rc1` before `1.0`.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, TaggerError};

/// Opaque version identifier sourced from a package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    /// Creates a version from a raw token, trimming surrounding whitespace.
    ///
    /// # Returns
    /// * `Ok(Version)` - A non-empty token without whitespace or `-`
    /// * `Err` - If the token is empty, contains whitespace, or contains `-`
    ///   (RPM reserves the dash as the version/release separator)
    pub fn parse(raw: &str) -> Result<Self> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(TaggerError::source_unavailable("empty version string"));
        }
        if token.chars().any(|c| c.is_whitespace() || c == '-') {
            return Err(TaggerError::source_unavailable(format!(
                "'{}' is not a valid package version",
                token
            )));
        }
        Ok(Version(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        rpm_vercmp(&self.0, &other.0)
    }
}

/// Segment-wise comparison in the manner of `rpmvercmp`.
fn rpm_vercmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        a = skip_separators(a);
        b = skip_separators(b);

        // Tilde sorts before everything, even the end of the string
        match (a.first() == Some(&b'~'), b.first() == Some(&b'~')) {
            (true, true) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if a.is_empty() || b.is_empty() {
            return a.len().cmp(&b.len());
        }

        let numeric = a[0].is_ascii_digit();
        let (seg_a, rest_a) = take_segment(a, numeric);
        let (seg_b, rest_b) = take_segment(b, numeric);

        // Numeric segments are newer than alphabetic ones
        if seg_b.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ordering = if numeric {
            let seg_a = trim_leading_zeros(seg_a);
            let seg_b = trim_leading_zeros(seg_b);
            seg_a.len().cmp(&seg_b.len()).then_with(|| seg_a.cmp(seg_b))
        } else {
            seg_a.cmp(seg_b)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }

        a = rest_a;
        b = rest_b;
    }
}

fn skip_separators(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|c| c.is_ascii_alphanumeric() || *c == b'~')
        .unwrap_or(s.len());
    &s[start..]
}

fn take_segment(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|c| {
            if numeric {
                !c.is_ascii_digit()
            } else {
                !c.is_ascii_alphabetic()
            }
        })
        .unwrap_or(s.len());
    s.split_at(end)
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|c| *c != b'0').unwrap_or(s.len());
    &s[start..]
}

/// Tag naming pattern (e.g., "{name}-{version}", "{name}-{version}-{release}")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFormat {
    pattern: String,
}

impl TagFormat {
    /// Create a tag format, requiring a `{version}` placeholder.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.contains("{version}") {
            return Err(TaggerError::config(format!(
                "tag format '{}' must contain a {{version}} placeholder",
                pattern
            )));
        }
        Ok(TagFormat { pattern })
    }

    /// Whether the release counter participates in the tag name
    pub fn includes_release(&self) -> bool {
        self.pattern.contains("{release}")
    }

    /// Render the tag name for a package at a given version and release.
    ///
    /// Example: pattern="{name}-{version}", name="pkg", version="2.3.0" -> "pkg-2.3.0"
    ///
    /// A pattern without `{release}` gets a `-<release>` suffix once the release
    /// counter moves past 1, so point releases of one version get distinct tags:
    /// "pkg-2.3.0", then "pkg-2.3.0-2".
    pub fn render(&self, name: &str, version: &Version, release: u32) -> String {
        let tag = self
            .pattern
            .replace("{name}", name)
            .replace("{version}", version.as_str())
            .replace("{release}", &release.to_string());
        if self.includes_release() || release <= 1 {
            tag
        } else {
            format!("{}-{}", tag, release)
        }
    }

    /// The literal text preceding `{version}` once `{name}` is substituted.
    ///
    /// Used to recognise earlier tags of the same package.
    pub fn prefix_for(&self, name: &str) -> String {
        let head = self
            .pattern
            .split("{version}")
            .next()
            .unwrap_or_default();
        head.replace("{name}", name)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl Default for TagFormat {
    fn default() -> Self {
        TagFormat {
            pattern: "{name}-{version}".to_string(),
        }
    }
}
