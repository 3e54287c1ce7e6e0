//! Typo-tolerant text matching.
//!
//! Document text usually comes from OCR or manual entry, so rule values are
//! allowed a few edits before they stop matching. The number of edits grows
//! with the pattern length:
//!
//! | Pattern length (chars) | Max typos |
//! |------------------------|-----------|
//! | 0–10                   | 0         |
//! | 11–20                  | 1         |
//! | 21–30                  | 2         |
//! | over 30                | 3         |
//!
//! With zero tolerance the comparison is exact. Otherwise a single greedy
//! forward scan is used. It is a heuristic, not an edit distance: it never
//! backtracks, it does not compare the final pattern character, and a run
//! that exceeds the tolerance restarts from the current text position.

use vpaper_core::TextMatch;

/// Maximum number of typos allowed for a pattern.
pub fn max_typos(pattern: &str) -> usize {
    match pattern.chars().count() {
        n if n > 30 => 3,
        n if n > 20 => 2,
        n if n > 10 => 1,
        _ => 0,
    }
}

/// Match `pattern` against `text`, allowing typos scaled by pattern length.
///
/// Case folding, if wanted, is the caller's job.
pub fn match_text_allow_typo(pattern: &str, text: &str, matching: TextMatch) -> bool {
    let typos = max_typos(pattern);
    if typos == 0 {
        return match matching {
            TextMatch::Starts => text.starts_with(pattern),
            TextMatch::Is => text == pattern,
            TextMatch::Contains => text.contains(pattern),
        };
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_by_distance(&pattern, &text, typos, matching)
}

fn match_by_distance(pattern: &[char], text: &[char], max_typos: usize, matching: TextMatch) -> bool {
    if pattern.len() < 2 || text.len() < 2 || pattern.len() > text.len() {
        return false;
    }

    let last = pattern.len() - 1;
    let text_end = text.len() - 1;
    let mut cursor = 0;
    let mut typos = 0;

    for (i, &c) in text.iter().enumerate() {
        if matching == TextMatch::Is && cursor == last && i < text_end {
            // pattern consumed but text continues
            return false;
        }
        if cursor >= last {
            return true;
        }

        if cursor > 0 {
            if pattern[cursor] == c {
                cursor += 1;
            } else {
                typos += 1;
                if pattern[cursor + 1] == c {
                    // text is missing a character: skip it in the pattern too
                    cursor += 1;
                    typos -= 1;
                } else if i < text_end && pattern[cursor] == text[i + 1] {
                    // text has one extra character
                    typos -= 1;
                }
                cursor += 1;

                if typos > max_typos {
                    cursor = 0;
                    typos = 0;
                }
            }
        } else if pattern[0] == c {
            cursor += 1;
        }

        if matching == TextMatch::Starts && cursor == 0 && i > 0 {
            return false;
        }
    }
    false
}
