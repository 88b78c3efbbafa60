//! Structured, hunked diffs between two [`FileTree`](crate::archive::FileTree)s.
//!
//! - [`word`]: intraline word-level diff with semantic cleanup
//! - [`hunk`]: line-level diff and git-style hunking with 3 lines of context
//! - [`engine`]: per-file status, hunks, word annotations and totals
//!
//! Every type here serializes losslessly (camelCase field names) so a
//! presentation layer can ship a [`DiffResult`] as JSON.

pub mod engine;
pub mod hunk;
pub mod word;

pub use engine::compute_diff;
pub use word::{diff_words, has_significant_changes};

use serde::{Deserialize, Serialize};

use crate::registry::PackageType;

/// Kind of an intraline span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Equal,
    Insert,
    Delete,
}

/// A contiguous span of a word diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub text: String,
}

impl WordChange {
    pub fn new(kind: ChangeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Context,
    Add,
    Delete,
}

/// One line of a hunk.
///
/// Context lines carry both numbers, added lines only `new_number`, deleted
/// lines only `old_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: LineKind,
    pub old_number: Option<usize>,
    pub new_number: Option<usize>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_diff: Option<Vec<WordChange>>,
}

impl DiffLine {
    pub fn context(old_number: usize, new_number: usize, content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Context,
            old_number: Some(old_number),
            new_number: Some(new_number),
            content: content.into(),
            word_diff: None,
        }
    }

    pub fn add(new_number: usize, content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Add,
            old_number: None,
            new_number: Some(new_number),
            content: content.into(),
            word_diff: None,
        }
    }

    pub fn delete(old_number: usize, content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Delete,
            old_number: Some(old_number),
            new_number: None,
            content: content.into(),
            word_diff: None,
        }
    }
}

/// A contiguous region of changes, in unified-diff coordinates (1-based;
/// a start of 0 with a count of 0 stands for an empty side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// Recompute the counts from the lines: `old_count` covers every
    /// non-added line, `new_count` every non-deleted line.
    pub fn update_counts(&mut self) {
        self.old_count = self
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Add)
            .count();
        self.new_count = self
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Delete)
            .count();
    }

    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.kind != LineKind::Context)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffFile {
    pub path: String,
    pub status: FileStatus,
    pub is_binary: bool,
    pub is_minified: bool,
    /// Empty for binary changes.
    pub hunks: Vec<DiffHunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
}

impl DiffFile {
    pub fn insertions(&self) -> usize {
        self.count_lines(LineKind::Add)
    }

    pub fn deletions(&self) -> usize {
        self.count_lines(LineKind::Delete)
    }

    fn count_lines(&self, kind: LineKind) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.kind == kind)
            .count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub files: usize,
    pub insertions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub package_type: PackageType,
    pub package_name: String,
    pub from_version: String,
    pub to_version: String,
    /// Sorted by path.
    pub files: Vec<DiffFile>,
    pub stats: DiffStats,
}
