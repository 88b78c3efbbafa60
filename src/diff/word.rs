//! Intraline word diff.
//!
//! The two strings are split on Unicode word boundaries (words, whitespace
//! runs and punctuation each become a token) and diffed with Myers. The raw
//! edit script is then run through a semantic cleanup that trades
//! minimality for readability: short equalities sandwiched between larger
//! edits are folded into the edits, so `a b` → `c d` reads as one
//! replacement instead of two replacements around an unchanged space.
//!
//! Filtering the output to equal+insert spans reproduces the new text;
//! equal+delete spans reproduce the old text.

use std::time::Duration;

use similar::{Algorithm, ChangeTag, TextDiff};

use crate::config::DiffOptions;

use super::{ChangeKind, WordChange};

pub fn diff_words(old: &str, new: &str) -> Vec<WordChange> {
    diff_words_within(old, new, DiffOptions::default().timeout)
}

/// Like [`diff_words`], bounding the search for a minimal diff by `timeout`.
pub fn diff_words_within(old: &str, new: &str, timeout: Duration) -> Vec<WordChange> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(timeout)
        .diff_unicode_words(old, new);

    let mut spans: Vec<WordChange> = Vec::new();
    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => ChangeKind::Equal,
            ChangeTag::Insert => ChangeKind::Insert,
            ChangeTag::Delete => ChangeKind::Delete,
        };
        match spans.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(change.value()),
            _ => spans.push(WordChange::new(kind, change.value())),
        }
    }

    cleanup_merge(&mut spans);
    cleanup_semantic(&mut spans);
    spans
}

/// True iff any span is an insertion or deletion.
pub fn has_significant_changes(spans: &[WordChange]) -> bool {
    spans.iter().any(|span| span.kind != ChangeKind::Equal)
}

/// Fold equalities that are no longer than the edits on both sides of them
/// into those edits.
fn cleanup_semantic(diffs: &mut Vec<WordChange>) {
    let mut changed = false;
    // Indices of equalities seen so far that may still be eliminated.
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<usize> = None;
    // Edit volume before and after the last equality, in chars.
    let (mut inserted_before, mut deleted_before) = (0usize, 0usize);
    let (mut inserted_after, mut deleted_after) = (0usize, 0usize);

    let mut pointer = 0usize;
    while pointer < diffs.len() {
        let span = &diffs[pointer];
        if span.kind == ChangeKind::Equal {
            equalities.push(pointer);
            inserted_before = inserted_after;
            deleted_before = deleted_after;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = Some(span.text.chars().count());
            pointer += 1;
            continue;
        }

        let len = span.text.chars().count();
        if span.kind == ChangeKind::Insert {
            inserted_after += len;
        } else {
            deleted_after += len;
        }

        let eliminate = last_equality.is_some_and(|eq_len| {
            eq_len <= inserted_before.max(deleted_before)
                && eq_len <= inserted_after.max(deleted_after)
        });
        if let (true, Some(&index)) = (eliminate, equalities.last()) {
            // Replace the equality with a delete+insert of the same text.
            let text = diffs[index].text.clone();
            diffs.insert(index, WordChange::new(ChangeKind::Delete, text));
            diffs[index + 1].kind = ChangeKind::Insert;

            // The equality is gone, and the one before it must be
            // re-evaluated against the now larger edit.
            equalities.pop();
            equalities.pop();
            pointer = equalities.last().map_or(0, |&i| i + 1);

            inserted_before = 0;
            deleted_before = 0;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = None;
            changed = true;
            continue;
        }

        pointer += 1;
    }

    if changed {
        cleanup_merge(diffs);
    }
}

/// Coalesce each run of edits into one delete followed by one insert,
/// moving any text common to both into the neighbouring equalities.
fn cleanup_merge(diffs: &mut Vec<WordChange>) {
    let mut merged: Vec<WordChange> = Vec::with_capacity(diffs.len());
    let mut deleted = String::new();
    let mut inserted = String::new();

    for span in diffs.drain(..) {
        match span.kind {
            ChangeKind::Delete => deleted.push_str(&span.text),
            ChangeKind::Insert => inserted.push_str(&span.text),
            ChangeKind::Equal => {
                let suffix = flush_edits(&mut merged, &mut deleted, &mut inserted);
                push_equal(&mut merged, suffix + &span.text);
            }
        }
    }
    let suffix = flush_edits(&mut merged, &mut deleted, &mut inserted);
    push_equal(&mut merged, suffix);

    *diffs = merged;
}

/// Emit the pending edit run. Returns the common suffix, which belongs at
/// the start of the following equality.
fn flush_edits(out: &mut Vec<WordChange>, deleted: &mut String, inserted: &mut String) -> String {
    let mut suffix = String::new();

    if !deleted.is_empty() && !inserted.is_empty() {
        let prefix_len = common_prefix_len(deleted, inserted);
        if prefix_len > 0 {
            push_equal(out, deleted[..prefix_len].to_string());
            deleted.drain(..prefix_len);
            inserted.drain(..prefix_len);
        }

        let suffix_len = common_suffix_len(deleted, inserted);
        if suffix_len > 0 {
            suffix = inserted[inserted.len() - suffix_len..].to_string();
            deleted.truncate(deleted.len() - suffix_len);
            inserted.truncate(inserted.len() - suffix_len);
        }
    }

    if !deleted.is_empty() {
        out.push(WordChange::new(ChangeKind::Delete, std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        out.push(WordChange::new(ChangeKind::Insert, std::mem::take(inserted)));
    }
    suffix
}

fn push_equal(out: &mut Vec<WordChange>, text: String) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.kind == ChangeKind::Equal => last.text.push_str(&text),
        _ => out.push(WordChange::new(ChangeKind::Equal, text)),
    }
}

/// Length in bytes of the longest common prefix (always a char boundary in
/// both strings).
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}
