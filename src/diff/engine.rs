//! Tree-level diff: decides each path's status and assembles the result.

use std::collections::BTreeSet;

use log::debug;

use crate::archive::{FileEntry, FileTree};
use crate::config::DiffOptions;
use crate::registry::PackageType;

use super::hunk::{compute_hunks, split_lines};
use super::{DiffFile, DiffHunk, DiffLine, DiffResult, DiffStats, FileStatus};

/// Diffs two [`FileTree`]s with fixed [`DiffOptions`].
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    options: DiffOptions,
}

impl DiffEngine {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Compare `old` against `new`. Files come out sorted by path; unchanged
    /// paths are omitted.
    pub fn compute(
        &self,
        old: &FileTree,
        new: &FileTree,
        package_type: PackageType,
        package_name: &str,
        from_version: &str,
        to_version: &str,
    ) -> DiffResult {
        let paths: BTreeSet<&str> = old.paths().chain(new.paths()).collect();

        let mut files = Vec::new();
        for path in paths {
            let file = match (old.get(path), new.get(path)) {
                (None, Some(added)) => Some(self.added(added)),
                (Some(deleted), None) => Some(self.deleted(deleted)),
                (Some(before), Some(after)) => self.modified(before, after),
                (None, None) => None,
            };
            if let Some(file) = file {
                debug!(
                    "{path}: {:?}, {} hunk(s)",
                    file.status,
                    file.hunks.len()
                );
                files.push(file);
            }
        }

        let stats = DiffStats {
            files: files.len(),
            insertions: files.iter().map(DiffFile::insertions).sum(),
            deletions: files.iter().map(DiffFile::deletions).sum(),
        };

        DiffResult {
            package_type,
            package_name: package_name.to_string(),
            from_version: from_version.to_string(),
            to_version: to_version.to_string(),
            files,
            stats,
        }
    }

    fn added(&self, entry: &FileEntry) -> DiffFile {
        let hunks = match text_of(entry) {
            Some(content) => whole_file_hunk(content, |n, line| DiffLine::add(n, line))
                .map(|mut hunk| {
                    hunk.old_start = 0;
                    hunk.new_start = 1;
                    hunk
                })
                .into_iter()
                .collect(),
            None => Vec::new(),
        };

        DiffFile {
            path: entry.path.clone(),
            status: FileStatus::Added,
            is_binary: entry.is_binary,
            is_minified: entry.is_minified,
            hunks,
            old_content: None,
            new_content: entry.content.clone(),
        }
    }

    fn deleted(&self, entry: &FileEntry) -> DiffFile {
        let hunks = match text_of(entry) {
            Some(content) => whole_file_hunk(content, |n, line| DiffLine::delete(n, line))
                .map(|mut hunk| {
                    hunk.old_start = 1;
                    hunk.new_start = 0;
                    hunk
                })
                .into_iter()
                .collect(),
            None => Vec::new(),
        };

        DiffFile {
            path: entry.path.clone(),
            status: FileStatus::Deleted,
            is_binary: entry.is_binary,
            is_minified: entry.is_minified,
            hunks,
            old_content: entry.content.clone(),
            new_content: None,
        }
    }

    fn modified(&self, old: &FileEntry, new: &FileEntry) -> Option<DiffFile> {
        if old.is_binary || new.is_binary {
            // Binary equality is judged on size alone.
            if old.size == new.size {
                return None;
            }
            return Some(DiffFile {
                path: new.path.clone(),
                status: FileStatus::Modified,
                is_binary: true,
                is_minified: old.is_minified || new.is_minified,
                hunks: Vec::new(),
                old_content: None,
                new_content: None,
            });
        }

        let before = old.content.as_deref().unwrap_or_default();
        let after = new.content.as_deref().unwrap_or_default();
        if before == after {
            return None;
        }

        let hunks = compute_hunks(before, after, &self.options);
        if hunks.is_empty() {
            debug!("{}: differs only in a trailing newline", new.path);
            return None;
        }

        Some(DiffFile {
            path: new.path.clone(),
            status: FileStatus::Modified,
            is_binary: false,
            is_minified: old.is_minified || new.is_minified,
            hunks,
            old_content: old.content.clone(),
            new_content: new.content.clone(),
        })
    }
}

/// Text content of a non-binary entry.
fn text_of(entry: &FileEntry) -> Option<&str> {
    if entry.is_binary {
        return None;
    }
    entry.content.as_deref()
}

/// One hunk holding every line of `content`, numbered from 1. `None` for an
/// empty file.
fn whole_file_hunk(
    content: &str,
    line: impl Fn(usize, &str) -> DiffLine,
) -> Option<DiffHunk> {
    let lines: Vec<DiffLine> = split_lines(content)
        .into_iter()
        .enumerate()
        .map(|(i, text)| line(i + 1, text))
        .collect();
    if lines.is_empty() {
        return None;
    }

    let mut hunk = DiffHunk {
        old_start: 0,
        old_count: 0,
        new_start: 0,
        new_count: 0,
        lines,
    };
    hunk.update_counts();
    Some(hunk)
}

/// Diff two trees with default options.
pub fn compute_diff(
    old: &FileTree,
    new: &FileTree,
    package_type: PackageType,
    package_name: &str,
    from_version: &str,
    to_version: &str,
) -> DiffResult {
    DiffEngine::default().compute(
        old,
        new,
        package_type,
        package_name,
        from_version,
        to_version,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChangeKind, LineKind, WordChange};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn tree(files: &[(&str, &str)]) -> FileTree {
        files
            .iter()
            .map(|(path, content)| FileEntry::text(*path, *content))
            .collect()
    }

    fn diff(old: &FileTree, new: &FileTree) -> DiffResult {
        compute_diff(old, new, PackageType::Npm, "pkg", "1.0.0", "1.0.1")
    }

    /// Rebuild the new side of a modified file from its hunks, filling the
    /// gaps between hunks from `new`.
    fn reconstruct_new(file: &DiffFile, new: &str) -> String {
        let new_lines = split_lines(new);
        let mut out: Vec<String> = Vec::new();
        let mut next = 1;
        for hunk in &file.hunks {
            while next < hunk.new_start {
                out.push(new_lines[next - 1].to_string());
                next += 1;
            }
            for line in hunk.lines.iter().filter(|l| l.kind != LineKind::Delete) {
                let text = match &line.word_diff {
                    Some(spans) => spans.iter().map(|s| s.text.as_str()).collect(),
                    None => line.content.clone(),
                };
                out.push(text);
                next += 1;
            }
        }
        while next <= new_lines.len() {
            out.push(new_lines[next - 1].to_string());
            next += 1;
        }
        let mut text = out.join("\n");
        if new.ends_with('\n') {
            text.push('\n');
        }
        text
    }

    #[test]
    fn identical_trees_produce_nothing() {
        let t = tree(&[("a.js", "one\ntwo\n"), ("b.js", "three\n")]);
        let result = diff(&t, &t);
        assert!(result.files.is_empty());
        assert_eq!(result.stats, DiffStats::default());
    }

    #[test]
    fn single_line_modification() {
        let result = diff(&tree(&[("a.txt", "x\n")]), &tree(&[("a.txt", "y\n")]));

        assert_eq!(result.files.len(), 1);
        let file = &result.files[0];
        assert_eq!(file.status, FileStatus::Modified);
        assert_eq!(file.hunks.len(), 1);
        let hunk = &file.hunks[0];
        assert_eq!(
            (hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count),
            (1, 1, 1, 1)
        );
        assert_eq!(
            hunk.lines[0].word_diff,
            Some(vec![WordChange::new(ChangeKind::Delete, "x")])
        );
        assert_eq!(
            hunk.lines[1].word_diff,
            Some(vec![WordChange::new(ChangeKind::Insert, "y")])
        );
        assert_eq!(
            result.stats,
            DiffStats {
                files: 1,
                insertions: 1,
                deletions: 1
            }
        );
    }

    #[test]
    fn added_file_is_one_whole_file_hunk() {
        let result = diff(&FileTree::new(), &tree(&[("b.txt", "l1\nl2\n")]));

        let file = &result.files[0];
        assert_eq!(file.status, FileStatus::Added);
        assert_eq!(file.hunks.len(), 1);
        let hunk = &file.hunks[0];
        assert_eq!(
            (hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count),
            (0, 0, 1, 2)
        );
        assert!(hunk.lines.iter().all(|l| l.kind == LineKind::Add));
        assert_eq!(file.new_content.as_deref(), Some("l1\nl2\n"));
        assert_eq!(result.stats.insertions, 2);
    }

    #[test]
    fn deleted_file_mirrors_added() {
        let result = diff(&tree(&[("gone.js", "a\nb\nc")]), &FileTree::new());

        let file = &result.files[0];
        assert_eq!(file.status, FileStatus::Deleted);
        let hunk = &file.hunks[0];
        assert_eq!(
            (hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count),
            (1, 3, 0, 0)
        );
        assert_eq!(hunk.lines[2].old_number, Some(3));
        assert_eq!(result.stats.deletions, 3);
    }

    #[test]
    fn empty_added_file_has_no_hunks() {
        let result = diff(&FileTree::new(), &tree(&[("empty.js", "")]));
        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].hunks.is_empty());
        assert_eq!(result.stats.files, 1);
    }

    #[rstest]
    #[case(100, 100, false)]
    #[case(100, 101, true)]
    fn binary_changes_are_judged_by_size(
        #[case] old_size: u64,
        #[case] new_size: u64,
        #[case] reported: bool,
    ) {
        let old: FileTree = [FileEntry::binary("logo.png", old_size)].into_iter().collect();
        let new: FileTree = [FileEntry::binary("logo.png", new_size)].into_iter().collect();
        let result = diff(&old, &new);

        assert_eq!(result.files.len(), usize::from(reported));
        if let Some(file) = result.files.first() {
            assert!(file.is_binary);
            assert!(file.hunks.is_empty());
        }
    }

    #[test]
    fn binary_change_keeps_minified_flag_from_either_side() {
        let old: FileTree = [FileEntry {
            is_minified: true,
            ..FileEntry::binary("bundle.min.js", 10)
        }]
        .into_iter()
        .collect();
        let new: FileTree = [FileEntry::binary("bundle.min.js", 20)].into_iter().collect();

        let file = &diff(&old, &new).files[0];
        assert!(file.is_binary);
        assert!(file.is_minified);
    }

    #[test]
    fn text_turning_binary_counts_as_binary_change() {
        let old = tree(&[("data.bin.txt", "plain")]);
        let new: FileTree = [FileEntry::binary("data.bin.txt", 42)].into_iter().collect();
        let file = &diff(&old, &new).files[0];
        assert_eq!(file.status, FileStatus::Modified);
        assert!(file.is_binary);
        assert!(file.hunks.is_empty());
    }

    #[test]
    fn added_binary_has_no_hunks() {
        let new: FileTree = [FileEntry::binary("font.woff2", 9000)].into_iter().collect();
        let file = &diff(&FileTree::new(), &new).files[0];
        assert_eq!(file.status, FileStatus::Added);
        assert!(file.hunks.is_empty());
        assert_eq!(file.new_content, None);
    }

    #[test]
    fn trailing_newline_only_difference_is_omitted() {
        let result = diff(&tree(&[("a.js", "a\nb")]), &tree(&[("a.js", "a\nb\n")]));
        assert!(result.files.is_empty());
    }

    #[test]
    fn crlf_conversion_is_reported() {
        let result = diff(&tree(&[("a.php", "a\nb\n")]), &tree(&[("a.php", "a\r\nb\r\n")]));
        let file = &result.files[0];
        assert_eq!(file.status, FileStatus::Modified);
        assert_eq!((file.insertions(), file.deletions()), (2, 2));
    }

    #[test]
    fn carriage_returns_stay_in_line_content() {
        let result = diff(&tree(&[("a.php", "x\r\n")]), &tree(&[("a.php", "y\r\n")]));
        let lines = &result.files[0].hunks[0].lines;
        assert_eq!(lines[0].content, "x\r");
        assert_eq!(lines[1].content, "y\r");

        let added = diff(&FileTree::new(), &tree(&[("b.php", "one\r\ntwo\r\n")]));
        let contents: Vec<&str> = added.files[0].hunks[0]
            .lines
            .iter()
            .map(|l| l.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one\r", "two\r"]);
    }

    #[test]
    fn files_are_sorted_by_path() {
        let old = tree(&[("z.js", "1"), ("m.js", "1")]);
        let new = tree(&[("a.js", "1"), ("m.js", "2"), ("z.js", "1")]);
        let paths: Vec<_> = diff(&old, &new)
            .files
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(paths, vec!["a.js", "m.js"]);
    }

    #[test]
    fn metadata_is_carried_through() {
        let result = compute_diff(
            &FileTree::new(),
            &FileTree::new(),
            PackageType::Wp,
            "akismet",
            "5.0",
            "5.1",
        );
        assert_eq!(result.package_type, PackageType::Wp);
        assert_eq!(result.package_name, "akismet");
        assert_eq!((result.from_version.as_str(), result.to_version.as_str()), ("5.0", "5.1"));
    }

    #[rstest]
    #[case("a\nb\nc\n", "a\nB\nc\n")]
    #[case("1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12\n", "0\n1\n2\n3\n4\n5\nsix\n7\n8\n9\n10\n11\n")]
    #[case("fn a() {\n    x();\n}\n", "fn a() {\n    y(1);\n    z();\n}\n\nfn b() {}\n")]
    #[case("same\nsame\nsame\nold\n", "new\nsame\nsame\nsame\n")]
    #[case("a\r\nb\r\nc\r\n", "a\r\nB\r\nc\r\nd\r\n")]
    #[case("a\nb\n", "a\r\nb\r\n")]
    fn hunks_reconstruct_new_content(#[case] old: &str, #[case] new: &str) {
        let result = diff(&tree(&[("f.js", old)]), &tree(&[("f.js", new)]));
        let file = &result.files[0];

        assert_eq!(reconstruct_new(file, new), new);
        for hunk in &file.hunks {
            assert!(hunk.has_changes());
        }
    }
}
