//! RPM changelog entries.
//!
//! ```text
//! * Mon Oct 19 2026 Jane Packager <jane@example.com> - 2.3.0-1
//! - Fix log rotation
//! - Add seek-to-eof option
//! ```

use std::fmt;

use chrono::{Local, NaiveDate};

use crate::version::Version;

const DATE_FORMAT: &str = "%a %b %d %Y";

/// A single changelog block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub author: String,
    pub email: String,
    pub date: NaiveDate,
    pub version: Version,
    pub release: u32,
    /// Summary lines, without the leading "- "
    pub lines: Vec<String>,
}

impl ChangelogEntry {
    /// Create an entry stamped with today's date
    pub fn today(
        author: impl Into<String>,
        email: impl Into<String>,
        version: Version,
        release: u32,
        lines: Vec<String>,
    ) -> Self {
        ChangelogEntry {
            author: author.into(),
            email: email.into(),
            date: Local::now().date_naive(),
            version,
            release,
            lines,
        }
    }

    pub fn header(&self) -> String {
        format!(
            "* {} {} <{}> - {}-{}",
            self.date.format(DATE_FORMAT),
            self.author,
            self.email,
            self.version,
            self.release
        )
    }

    /// Rendered lines, header first, without a trailing blank line
    pub fn render_lines(&self) -> Vec<String> {
        let mut out = vec![self.header()];
        out.extend(self.lines.iter().map(|line| format!("- {}", line)));
        out
    }
}

impl fmt::Display for ChangelogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_lines().join("\n"))
    }
}
