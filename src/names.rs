//! Validation of candidate defined names.
//!
//! The rules mirror what the Excel name box enforces for the characters this
//! tool cares about: length 1..=255, no spaces, no reserved R1C1 tokens, a
//! restricted first character. The tail check deliberately runs a
//! *non-anchored* character-class match, so a name whose tail contains at
//! least one allowed character passes even if other tail characters would
//! not. Downstream behavior depends on that lenient check, so it is pinned
//! by a regression test rather than tightened.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_NAME_LEN: usize = 255;

/// Single-token names Excel reserves for R1C1-style references.
const RESERVED_NAMES: &[&str] = &["R", "C", r"\?", r"\\"];

static FIRST_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_\\]$").expect("valid regex"));
static TAIL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9?._\\]+").expect("valid regex"));

pub fn is_valid_name(candidate: &str) -> bool {
    let length = candidate.chars().count();
    if length == 0 || length > MAX_NAME_LEN {
        return false;
    }
    if RESERVED_NAMES.contains(&candidate) {
        return false;
    }
    if candidate.contains(' ') {
        return false;
    }

    let mut chars = candidate.chars();
    let first = chars.next().map(String::from).unwrap_or_default();
    if !FIRST_CHAR.is_match(&first) {
        return false;
    }

    let tail: String = chars.collect();
    tail.is_empty() || TAIL_CHARS.is_match(&tail)
}
