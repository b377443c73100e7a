//! Exclusion patterns.
//!
//! Patterns come from the `.fimignore` file at the monitored root, an
//! optional comma-separated override string, and an implicit entry for the
//! baseline file so it never monitors itself.
//!
//! Matching uses [`glob::Pattern`] with default options: case sensitive on
//! every platform, `*` and `?` may match `/`, and `[...]` / `[!...]` classes
//! are supported. A path is excluded when its final segment or its full
//! root-relative path matches any pattern. Runs of `*` are collapsed to a
//! single `*` before compiling, so `**.tmp` behaves like `*.tmp`.

use crate::store::DEFAULT_BASELINE_NAME;
use glob::Pattern;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the per-root ignore rule file.
pub const IGNORE_FILE_NAME: &str = ".fimignore";

#[derive(Debug, Clone)]
enum Matcher {
    Glob(Pattern),
    /// Pattern text that is not a valid glob; compared verbatim.
    Literal(String),
    /// Exact root-relative path; never compared against the final segment.
    Path(String),
}

impl Matcher {
    fn compile(raw: &str) -> Self {
        match Pattern::new(&collapse_stars(raw)) {
            Ok(p) => Matcher::Glob(p),
            Err(e) => {
                warn!(pattern = raw, error = %e, "invalid glob pattern, matching literally");
                Matcher::Literal(raw.to_string())
            }
        }
    }

    fn matches(&self, name: &str, relpath: &str) -> bool {
        match self {
            Matcher::Glob(p) => p.matches(name) || p.matches(relpath),
            Matcher::Literal(s) => s == name || s == relpath,
            Matcher::Path(s) => s == relpath,
        }
    }
}

fn collapse_stars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Ordered set of exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    raw: Vec<String>,
    matchers: Vec<Matcher>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a glob pattern. Empty patterns are ignored.
    pub fn push(&mut self, pattern: &str) {
        if pattern.is_empty() {
            return;
        }
        self.raw.push(pattern.to_string());
        self.matchers.push(Matcher::compile(pattern));
    }

    /// Append a pattern that matches `name` exactly, even if it contains
    /// glob metacharacters.
    pub fn exclude_name(&mut self, name: &str) {
        if name.is_empty() || self.raw.iter().any(|p| p == name) {
            return;
        }
        self.raw.push(name.to_string());
        self.matchers.push(Matcher::Literal(name.to_string()));
    }

    /// Exclude exactly one root-relative path. Files elsewhere in the tree
    /// with the same name are still tracked.
    pub fn exclude_path(&mut self, relpath: &str) {
        if relpath.is_empty()
            || self
                .matchers
                .iter()
                .any(|m| matches!(m, Matcher::Path(p) if p == relpath))
        {
            return;
        }
        self.raw.push(relpath.to_string());
        self.matchers.push(Matcher::Path(relpath.to_string()));
    }

    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for p in patterns {
            self.push(p.as_ref().trim());
        }
    }

    /// Pattern texts in insertion order.
    pub fn patterns(&self) -> &[String] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// True if `relpath` (slash separated, root relative) should be skipped.
    pub fn matches(&self, relpath: &str) -> bool {
        let name = relpath.rsplit('/').next().unwrap_or(relpath);
        self.matchers
            .iter()
            .any(|m| m.matches(name, relpath))
    }
}

/// Build the pattern set for `root`.
///
/// Order: `.fimignore` lines, then the comma-separated `override_csv`
/// segments, then the default baseline name. An unreadable ignore file is
/// logged and treated as empty.
pub fn load_ignore_patterns(root: &Path, override_csv: Option<&str>) -> PatternSet {
    let mut set = PatternSet::new();

    let ignore_file = root.join(IGNORE_FILE_NAME);
    match fs::read(&ignore_file) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            for line in parse_ignore_lines(&text) {
                set.push(line);
            }
            debug!(path = %ignore_file.display(), patterns = set.len(), "loaded ignore file");
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(path = %ignore_file.display(), error = %e, "cannot read ignore file, skipping");
        }
    }

    if let Some(csv) = override_csv {
        set.extend(csv.split(','));
    }

    set.exclude_name(DEFAULT_BASELINE_NAME);
    set
}

/// Pattern lines of an ignore file: trimmed, skipping blanks and `#` comments.
pub fn parse_ignore_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// True if `relpath` matches any pattern in `patterns`.
pub fn is_ignored(relpath: &str, patterns: &PatternSet) -> bool {
    patterns.matches(relpath)
}
