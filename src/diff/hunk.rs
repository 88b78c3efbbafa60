//! Line-level diff and hunk construction.
//!
//! Lines are interned to integer tokens (repeated lines share a token) and
//! the token sequences are diffed with Myers, so the diff engine only ever
//! compares integers. The tagged line sequence is then walked once to cut
//! hunks:
//!
//! - Equal lines outside a hunk sit in a leading-context buffer capped at
//!   the context size.
//! - The first changed line opens a hunk, taking the buffer as its leading
//!   context.
//! - Inside a hunk every line is appended. Once more than `context` equal
//!   lines trail the last change, the hunk is trimmed back to `context`
//!   trailing lines and closed; the next hunk starts with an empty buffer.
//!
//! Afterwards, adjacent delete/add runs are paired positionally and
//! annotated with word diffs.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use similar::{Algorithm, DiffTag};

use crate::config::DiffOptions;

use super::word::diff_words_within;
use super::{ChangeKind, DiffHunk, DiffLine, LineKind};

/// One line of a line-level diff.
pub type LineChange<'a> = (ChangeKind, &'a str);

/// Diff two line sequences, returning every line tagged equal, insert or
/// delete in output order.
pub fn diff_lines<'a>(old: &[&'a str], new: &[&'a str], timeout: Duration) -> Vec<LineChange<'a>> {
    let mut tokens: HashMap<&str, u32> = HashMap::new();
    let old_tokens = tokenize(old, &mut tokens);
    let new_tokens = tokenize(new, &mut tokens);

    let deadline = Instant::now().checked_add(timeout);
    let ops = similar::capture_diff_slices_deadline(
        Algorithm::Myers,
        &old_tokens,
        &new_tokens,
        deadline,
    );

    let mut changes = Vec::with_capacity(old.len().max(new.len()));
    for op in ops {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                changes.extend(old[old_range].iter().map(|&l| (ChangeKind::Equal, l)));
            }
            DiffTag::Delete => {
                changes.extend(old[old_range].iter().map(|&l| (ChangeKind::Delete, l)));
            }
            DiffTag::Insert => {
                changes.extend(new[new_range].iter().map(|&l| (ChangeKind::Insert, l)));
            }
            DiffTag::Replace => {
                changes.extend(old[old_range].iter().map(|&l| (ChangeKind::Delete, l)));
                changes.extend(new[new_range].iter().map(|&l| (ChangeKind::Insert, l)));
            }
        }
    }
    changes
}

fn tokenize<'a>(lines: &[&'a str], table: &mut HashMap<&'a str, u32>) -> Vec<u32> {
    lines
        .iter()
        .map(|&line| {
            let next = table.len() as u32;
            *table.entry(line).or_insert(next)
        })
        .collect()
}

/// Cut a tagged line sequence into hunks with `context` lines of context.
pub fn build_hunks(changes: &[LineChange<'_>], context: usize) -> Vec<DiffHunk> {
    let mut hunks = Vec::new();
    let mut old_line = 1usize;
    let mut new_line = 1usize;
    let mut current: Option<DiffHunk> = None;
    let mut leading: VecDeque<DiffLine> = VecDeque::with_capacity(context + 1);
    let mut trailing = 0usize;

    for &(kind, text) in changes {
        match kind {
            ChangeKind::Equal => {
                let line = DiffLine::context(old_line, new_line, text);
                old_line += 1;
                new_line += 1;

                let Some(hunk) = current.as_mut() else {
                    leading.push_back(line);
                    if leading.len() > context {
                        leading.pop_front();
                    }
                    continue;
                };

                hunk.lines.push(line);
                trailing += 1;
                if trailing > context {
                    let excess = trailing - context;
                    hunk.lines.truncate(hunk.lines.len() - excess);
                    if let Some(hunk) = current.take() {
                        push_hunk(&mut hunks, hunk);
                    }
                    trailing = 0;
                }
            }
            ChangeKind::Delete | ChangeKind::Insert => {
                let hunk = current.get_or_insert_with(|| DiffHunk {
                    old_start: old_line.saturating_sub(leading.len()).max(1),
                    old_count: 0,
                    new_start: new_line.saturating_sub(leading.len()).max(1),
                    new_count: 0,
                    lines: leading.drain(..).collect(),
                });
                trailing = 0;

                if kind == ChangeKind::Delete {
                    hunk.lines.push(DiffLine::delete(old_line, text));
                    old_line += 1;
                } else {
                    hunk.lines.push(DiffLine::add(new_line, text));
                    new_line += 1;
                }
            }
        }
    }

    if let Some(hunk) = current {
        push_hunk(&mut hunks, hunk);
    }
    hunks
}

/// Finalize counts and keep the hunk only if it still holds a change.
fn push_hunk(hunks: &mut Vec<DiffHunk>, mut hunk: DiffHunk) {
    if hunk.has_changes() {
        hunk.update_counts();
        hunks.push(hunk);
    }
}

/// Pair each run of deleted lines with the run of added lines right after
/// it, position by position up to the shorter run, and attach word diffs.
/// Deleted lines get the equal+delete spans, added lines the equal+insert
/// spans. Unpaired lines are left alone.
pub fn annotate_word_diffs(hunks: &mut [DiffHunk], timeout: Duration) {
    for hunk in hunks {
        let lines = &mut hunk.lines;
        let mut i = 0;
        while i < lines.len() {
            if lines[i].kind != LineKind::Delete {
                i += 1;
                continue;
            }

            let deletes = i;
            while i < lines.len() && lines[i].kind == LineKind::Delete {
                i += 1;
            }
            let adds = i;
            while i < lines.len() && lines[i].kind == LineKind::Add {
                i += 1;
            }

            let pairs = (adds - deletes).min(i - adds);
            for j in 0..pairs {
                let spans =
                    diff_words_within(&lines[deletes + j].content, &lines[adds + j].content, timeout);
                lines[deletes + j].word_diff = Some(
                    spans
                        .iter()
                        .filter(|s| s.kind != ChangeKind::Insert)
                        .cloned()
                        .collect(),
                );
                lines[adds + j].word_diff = Some(
                    spans
                        .into_iter()
                        .filter(|s| s.kind != ChangeKind::Delete)
                        .collect(),
                );
            }
        }
    }
}

/// Split on `\n` only, so a `\r` stays part of its line. A trailing newline
/// does not start another line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

/// Full pipeline for one modified text file: split, diff, hunk, annotate.
pub fn compute_hunks(old: &str, new: &str, options: &DiffOptions) -> Vec<DiffHunk> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    let changes = diff_lines(&old_lines, &new_lines, options.timeout);
    let mut hunks = build_hunks(&changes, options.context_lines);
    annotate_word_diffs(&mut hunks, options.timeout);
    hunks
}
