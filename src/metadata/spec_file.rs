//! Line-preserving reader/writer for RPM spec files.
//!
//! Only the `Name`, `Version` and `Release` tags and the `%changelog` section are
//! interpreted. Every other line is carried through untouched, so a document
//! that is parsed and rendered without edits is byte-identical to its input.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::ChangelogOrder;
use crate::error::{Result, TaggerError};
use crate::metadata::ChangelogEntry;
use crate::version::Version;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(name|version|release)(\s*:\s*)(\S.*?)\s*$").expect("tag line pattern")
});

/// Leading counter and the suffix after it, e.g. `3` and `%{?dist}`
static RELEASE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(.*)$").expect("release pattern"));

static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^%(?:global|define)\s+(\w+)\s+(\S.*?)\s*$").expect("macro definition pattern")
});

/// A tag line split into the part we rewrite and the parts we keep
#[derive(Debug, Clone, PartialEq, Eq)]
struct TagLine {
    index: usize,
    /// Everything up to and including the whitespace after the colon
    lead: String,
}

/// Parsed spec file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDocument {
    lines: Vec<String>,
    trailing_newline: bool,
    name: String,
    version: Version,
    version_line: TagLine,
    release: u32,
    /// Text after the release counter, e.g. `%{?dist}`
    release_suffix: String,
    release_line: TagLine,
    changelog_line: Option<usize>,
    /// `%global` / `%define` values seen before `%changelog`
    macros: HashMap<String, String>,
}

impl SpecDocument {
    pub fn parse(content: &str) -> Result<Self> {
        let trailing_newline = content.ends_with('\n');
        let lines: Vec<String> = content.lines().map(str::to_string).collect();

        let mut name = None;
        let mut version = None;
        let mut release = None;
        let mut changelog_line = None;
        let mut macros = HashMap::new();

        for (index, line) in lines.iter().enumerate() {
            if line.trim_end() == "%changelog" {
                changelog_line = Some(index);
                break;
            }
            if let Some(caps) = DEFINITION.captures(line) {
                macros.insert(caps[1].to_string(), caps[2].to_string());
                continue;
            }
            let Some(caps) = TAG.captures(line) else {
                continue;
            };
            let lead = format!("{}{}", &caps[1], &caps[2]);
            let value = caps[3].to_string();
            match caps[1].to_lowercase().as_str() {
                "name" if name.is_none() => name = Some(value),
                "version" if version.is_none() => {
                    version = Some((value, TagLine { index, lead }));
                }
                "release" if release.is_none() => {
                    release = Some((value, TagLine { index, lead }));
                }
                _ => {}
            }
        }

        let name = name.ok_or_else(|| TaggerError::metadata("spec file has no Name tag"))?;
        let (version_text, version_line) =
            version.ok_or_else(|| TaggerError::metadata("spec file has no Version tag"))?;
        let (release_text, release_line) =
            release.ok_or_else(|| TaggerError::metadata("spec file has no Release tag"))?;

        let version = Version::parse(&version_text)
            .map_err(|e| TaggerError::metadata(format!("invalid Version tag: {}", e)))?;
        let caps = RELEASE_VALUE.captures(&release_text).ok_or_else(|| {
            TaggerError::metadata(format!(
                "Release tag '{}' does not start with a counter",
                release_text
            ))
        })?;
        let release = caps[1]
            .parse::<u32>()
            .map_err(|e| TaggerError::metadata(format!("invalid release counter: {}", e)))?;

        Ok(SpecDocument {
            lines,
            trailing_newline,
            name,
            version,
            version_line,
            release,
            release_suffix: caps[2].to_string(),
            release_line,
            changelog_line,
            macros,
        })
    }

    /// The `Name` tag as written, macros unexpanded
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `Name` tag with `%{macro}` references to `%global`/`%define`
    /// values substituted. Unknown macros are left as written.
    pub fn package_name(&self) -> String {
        let mut name = self.name.clone();
        // Bounded so self-referencing definitions cannot loop forever
        for _ in 0..8 {
            let mut changed = false;
            for (key, value) in &self.macros {
                for pattern in [format!("%{{{}}}", key), format!("%{{?{}}}", key)] {
                    if name.contains(&pattern) {
                        name = name.replace(&pattern, value);
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn release(&self) -> u32 {
        self.release
    }

    pub fn set_version(&mut self, version: Version) {
        self.lines[self.version_line.index] = format!("{}{}", self.version_line.lead, version);
        self.version = version;
    }

    pub fn set_release(&mut self, release: u32) {
        self.lines[self.release_line.index] = format!(
            "{}{}{}",
            self.release_line.lead, release, self.release_suffix
        );
        self.release = release;
    }

    /// Insert an entry at the head or the tail of the `%changelog` section,
    /// creating the section if the file has none.
    pub fn add_changelog_entry(&mut self, entry: &ChangelogEntry, order: ChangelogOrder) {
        let mut block = entry.render_lines();

        let section = match self.changelog_line {
            Some(index) => index,
            None => {
                if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.push("%changelog".to_string());
                self.trailing_newline = true;
                let index = self.lines.len() - 1;
                self.changelog_line = Some(index);
                index
            }
        };

        let section_end = self.changelog_end(section);
        let has_entries = self.lines[section + 1..section_end]
            .iter()
            .any(|l| !l.trim().is_empty());

        let at = match order {
            ChangelogOrder::Head => {
                if has_entries {
                    block.push(String::new());
                }
                section + 1
            }
            ChangelogOrder::Tail => {
                let mut last = section_end;
                while last > section + 1 && self.lines[last - 1].trim().is_empty() {
                    last -= 1;
                }
                if has_entries {
                    block.insert(0, String::new());
                }
                last
            }
        };

        self.lines.splice(at..at, block);
    }

    /// One past the last line of the changelog section
    fn changelog_end(&self, section: usize) -> usize {
        self.lines[section + 1..]
            .iter()
            .position(|l| is_section_header(l))
            .map(|offset| section + 1 + offset)
            .unwrap_or(self.lines.len())
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}

fn is_section_header(line: &str) -> bool {
    const SECTIONS: &[&str] = &[
        "%package", "%description", "%prep", "%build", "%install", "%check", "%clean",
        "%files", "%pre", "%post", "%preun", "%postun", "%changelog",
    ];
    let word = line.split_whitespace().next().unwrap_or_default();
    SECTIONS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SPEC: &str = "\
%global gem_name dumb-logger

Name:           rubygem-%{gem_name}
Version:        1.0.1
Release:        2%{?dist}
Summary:        Simple logger

%description
Logs things.

%changelog
* Tue Feb 03 2015 Ken <ken@example.org> 1.0.1-2
- Rebuilt

* Mon Feb 02 2015 Ken <ken@example.org> 1.0.1-1
- New upstream
";

    fn entry(version: &str, release: u32) -> ChangelogEntry {
        ChangelogEntry {
            author: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            version: Version::parse(version).unwrap(),
            release,
            lines: vec!["Release 2.3.0".to_string()],
        }
    }

    #[test]
    fn test_parse_fields() {
        let doc = SpecDocument::parse(SPEC).unwrap();
        assert_eq!(doc.name(), "rubygem-%{gem_name}");
        assert_eq!(doc.version().as_str(), "1.0.1");
        assert_eq!(doc.release(), 2);
    }

    #[test]
    fn test_package_name_expands_globals() {
        let doc = SpecDocument::parse(SPEC).unwrap();
        assert_eq!(doc.package_name(), "rubygem-dumb-logger");
    }

    #[test]
    fn test_render_unchanged_is_identical() {
        let doc = SpecDocument::parse(SPEC).unwrap();
        assert_eq!(doc.render(), SPEC);
    }

    #[test]
    fn test_set_version_and_release_keep_layout() {
        let mut doc = SpecDocument::parse(SPEC).unwrap();
        doc.set_version(Version::parse("2.3.0").unwrap());
        doc.set_release(1);

        let out = doc.render();
        assert!(out.contains("Version:        2.3.0\n"));
        assert!(out.contains("Release:        1%{?dist}\n"));
    }

    #[test]
    fn test_head_insertion() {
        let mut doc = SpecDocument::parse(SPEC).unwrap();
        doc.add_changelog_entry(&entry("2.3.0", 1), ChangelogOrder::Head);

        assert!(doc.render().contains(
            "%changelog\n* Mon Oct 19 2026 Jane <jane@example.com> - 2.3.0-1\n- Release 2.3.0\n\n* Tue Feb 03"
        ));
    }

    #[test]
    fn test_tail_insertion() {
        let mut doc = SpecDocument::parse(SPEC).unwrap();
        doc.add_changelog_entry(&entry("2.3.0", 1), ChangelogOrder::Tail);

        assert!(doc.render().ends_with("- New upstream\n\n* Mon Oct 19 2026 Jane <jane@example.com> - 2.3.0-1\n- Release 2.3.0\n"));
    }

    #[test]
    fn test_missing_changelog_section_is_created() {
        let mut doc = SpecDocument::parse("Name: pkg\nVersion: 1.0\nRelease: 1\n").unwrap();
        doc.add_changelog_entry(&entry("1.0", 2), ChangelogOrder::Head);
        assert_eq!(
            doc.render(),
            "Name: pkg\nVersion: 1.0\nRelease: 1\n\n%changelog\n* Mon Oct 19 2026 Jane <jane@example.com> - 1.0-2\n- Release 2.3.0\n"
        );
    }

    #[test]
    fn test_missing_tags_are_errors() {
        assert!(SpecDocument::parse("Name: pkg\nRelease: 1\n").is_err());
        assert!(SpecDocument::parse("Name: pkg\nVersion: 1\n").is_err());
        assert!(SpecDocument::parse("Name: pkg\nVersion: 1\nRelease: %{rel}\n").is_err());
    }
}
