//! Version strings: ordering, `from...to` ranges and error wording.

use std::cmp::Ordering;

/// Compare dotted version strings numerically, part by part.
///
/// Each part contributes its leading decimal digits (`"0-beta"` is 0,
/// `"rc"` is 0); missing parts count as 0, so `1.0` equals `1.0.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a: Vec<u64> = a.split('.').map(leading_number).collect();
    let parts_b: Vec<u64> = b.split('.').map(leading_number).collect();

    for i in 0..parts_a.len().max(parts_b.len()) {
        let num_a = parts_a.get(i).copied().unwrap_or(0);
        let num_b = parts_b.get(i).copied().unwrap_or(0);
        match num_a.cmp(&num_b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn leading_number(part: &str) -> u64 {
    let digits = part.trim_start();
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().unwrap_or(0)
}

/// Sort versions newest first. The sort is stable, so versions comparing
/// equal keep their relative order.
pub fn sort_newest_first(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}

/// Split `"1.0.0...2.0.0"` into its two endpoints.
pub fn parse_version_range(range: &str) -> Option<(String, String)> {
    let (from, to) = range.split_once("...")?;
    if from.is_empty() || to.is_empty() {
        return None;
    }
    Some((from.to_string(), to.to_string()))
}

pub fn format_invalid_versions(missing: &[String]) -> String {
    format!(
        "Invalid version{}: {}",
        if missing.len() > 1 { "s" } else { "" },
        missing.join(", ")
    )
}
