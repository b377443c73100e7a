//! Human-readable console output.

use fim_core::{ChangeSet, ReportMode};
use std::fmt::Write as _;
use std::path::Path;

/// Render the change summary for `root`.
pub fn render_summary(changes: &ChangeSet, root: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== File Integrity Monitor @ {} ===", root.display());

    if changes.is_empty() {
        out.push_str("No changes detected.\n");
        return out;
    }

    let sections: [(&str, &str, &[String]); 4] = [
        ("[ADDED]", "+", changes.added.as_slice()),
        ("[REMOVED]", "-", changes.removed.as_slice()),
        ("[MODIFIED] (content changed)", "*", changes.modified.as_slice()),
        (
            "[METADATA CHANGED] (mtime/size changed, content unchanged)",
            "~",
            changes.metadata_changed.as_slice(),
        ),
    ];
    for (title, marker, paths) in sections {
        if paths.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}");
        for p in paths {
            let _ = writeln!(out, "  {marker} {p}");
        }
    }
    out
}

pub fn print_summary(changes: &ChangeSet, root: &Path) {
    print!("{}", render_summary(changes, root));
}

pub fn print_saved(path: &Path, mode: ReportMode) {
    println!("\nSaved -> {} ({})", path.display(), mode.describe());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_changes_say_so() {
        let text = render_summary(&ChangeSet::default(), Path::new("/w"));
        assert!(text.contains("=== File Integrity Monitor @ /w ==="));
        assert!(text.ends_with("No changes detected.\n"));
    }

    #[test]
    fn only_non_empty_sections_are_printed() {
        let changes = ChangeSet {
            added: vec!["new.txt".into()],
            metadata_changed: vec!["touched.txt".into()],
            ..Default::default()
        };
        let text = render_summary(&changes, Path::new("/w"));
        assert!(text.contains("[ADDED]\n  + new.txt\n"));
        assert!(text.contains("  ~ touched.txt\n"));
        assert!(!text.contains("[REMOVED]"));
        assert!(!text.contains("[MODIFIED]"));
        assert!(!text.contains("No changes detected."));
    }
}
