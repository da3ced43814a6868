use serde::Serialize;

/// Per-file ceiling on the diff excerpt carried into the prompt.
pub const MAX_EXCERPT_LINES: usize = 200;
pub const TRUNCATION_MARKER: &str = "... [diff truncated]";
const UNTRACKED_PLACEHOLDER: &str = "(new file, not yet tracked)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed => "renamed",
            ChangeKind::Untracked => "untracked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    StagedOnly,
    AllChanges,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub kind: ChangeKind,
    pub diff_excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub files: Vec<FileChange>,
    pub mode: DiffMode,
}

impl ChangeSet {
    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Turn raw diff text plus untracked paths into a structured change set.
/// Returns `None` when there is nothing at all to analyze. Deterministic:
/// identical input always yields an identical change set.
pub fn summarize(diff_text: &str, untracked_paths: &[String], mode: DiffMode) -> Option<ChangeSet> {
    let mut files = Vec::new();
    let trimmed = diff_text.trim();

    if !trimmed.is_empty() {
        match parse_unified_diff(trimmed) {
            Some(parsed) => files.extend(parsed),
            // Unparsable diff output is kept as one opaque record rather
            // than dropped, so the prompt still sees the changes.
            None => files.push(FileChange {
                path: "(unparsed changes)".to_string(),
                kind: ChangeKind::Modified,
                diff_excerpt: truncate_excerpt(trimmed),
            }),
        }
    }

    for path in untracked_paths {
        files.push(FileChange {
            path: path.clone(),
            kind: ChangeKind::Untracked,
            diff_excerpt: UNTRACKED_PLACEHOLDER.to_string(),
        });
    }

    if files.is_empty() {
        None
    } else {
        Some(ChangeSet { files, mode })
    }
}

/// Split a unified diff on `diff --git` boundaries. Returns `None` when the
/// text does not look like git diff output at all.
fn parse_unified_diff(diff: &str) -> Option<Vec<FileChange>> {
    if !diff.starts_with("diff --git ") && !diff.contains("\ndiff --git ") {
        return None;
    }

    let mut files = Vec::new();
    let mut current: Option<(String, ChangeKind, Vec<&str>)> = None;

    for line in diff.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            if let Some((path, kind, lines)) = current.take() {
                files.push(file_change(path, kind, &lines));
            }
            current = Some((path_from_header(header), ChangeKind::Modified, vec![line]));
        } else if let Some((_, kind, lines)) = current.as_mut() {
            if line.starts_with("new file mode") {
                *kind = ChangeKind::Added;
            } else if line.starts_with("deleted file mode") {
                *kind = ChangeKind::Deleted;
            } else if line.starts_with("rename from") {
                *kind = ChangeKind::Renamed;
            }
            lines.push(line);
        }
    }

    if let Some((path, kind, lines)) = current.take() {
        files.push(file_change(path, kind, &lines));
    }

    Some(files)
}

fn file_change(path: String, kind: ChangeKind, lines: &[&str]) -> FileChange {
    FileChange {
        path,
        kind,
        diff_excerpt: truncate_excerpt(&lines.join("\n")),
    }
}

/// `header` is the `a/<path> b/<path>` part of a `diff --git` line; the
/// post-image path is the one worth reporting (it survives renames).
fn path_from_header(header: &str) -> String {
    header
        .split(" b/")
        .last()
        .unwrap_or(header)
        .trim()
        .to_string()
}

fn truncate_excerpt(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.len() <= MAX_EXCERPT_LINES {
        return text.to_string();
    }
    lines.truncate(MAX_EXCERPT_LINES);
    format!("{}\n{}", lines.join("\n"), TRUNCATION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_FILE_DIFF: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
+pub mod extra;
 pub mod core;
diff --git a/README.md b/README.md
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/README.md
@@ -0,0 +1 @@
+# readme
";

    #[test]
    fn file_count_matches_diff_markers() {
        let set = summarize(TWO_FILE_DIFF, &[], DiffMode::StagedOnly).unwrap();
        assert_eq!(set.files.len(), 2);
        assert_eq!(set.files[0].path, "src/lib.rs");
        assert_eq!(set.files[0].kind, ChangeKind::Modified);
        assert_eq!(set.files[1].path, "README.md");
        assert_eq!(set.files[1].kind, ChangeKind::Added);
    }

    #[test]
    fn summarize_is_deterministic() {
        let untracked = vec!["notes.txt".to_string()];
        let first = summarize(TWO_FILE_DIFF, &untracked, DiffMode::AllChanges).unwrap();
        let second = summarize(TWO_FILE_DIFF, &untracked, DiffMode::AllChanges).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn deleted_and_renamed_files_are_classified() {
        let diff = "\
diff --git a/old.rs b/old.rs
deleted file mode 100644
index 1111111..0000000
--- a/old.rs
+++ /dev/null
diff --git a/before.rs b/after.rs
similarity index 95%
rename from before.rs
rename to after.rs
";
        let set = summarize(diff, &[], DiffMode::StagedOnly).unwrap();
        assert_eq!(set.files[0].kind, ChangeKind::Deleted);
        assert_eq!(set.files[1].kind, ChangeKind::Renamed);
        assert_eq!(set.files[1].path, "after.rs");
    }

    #[test]
    fn unparsable_diff_becomes_single_opaque_record() {
        let set = summarize("some random output\nwith no markers", &[], DiffMode::StagedOnly).unwrap();
        assert_eq!(set.files.len(), 1);
        assert_eq!(set.files[0].kind, ChangeKind::Modified);
        assert!(set.files[0].diff_excerpt.contains("random output"));
    }

    #[test]
    fn long_excerpts_carry_truncation_marker() {
        let mut diff = String::from("diff --git a/big.rs b/big.rs\n");
        for i in 0..(MAX_EXCERPT_LINES * 2) {
            diff.push_str(&format!("+line {}\n", i));
        }
        let set = summarize(&diff, &[], DiffMode::StagedOnly).unwrap();
        let excerpt = &set.files[0].diff_excerpt;
        assert!(excerpt.ends_with(TRUNCATION_MARKER));
        assert_eq!(excerpt.lines().count(), MAX_EXCERPT_LINES + 1);
    }

    #[test]
    fn untracked_paths_append_as_untracked_records() {
        let untracked = vec!["a.txt".to_string(), "b.txt".to_string()];
        let set = summarize("", &untracked, DiffMode::StagedOnly).unwrap();
        assert_eq!(set.files.len(), 2);
        assert!(set.files.iter().all(|f| f.kind == ChangeKind::Untracked));
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(summarize("", &[], DiffMode::StagedOnly).is_none());
        assert!(summarize("   \n  ", &[], DiffMode::AllChanges).is_none());
    }
}
