//! Free-text date extraction.
//!
//! A date condition carries a regular expression that finds candidate
//! strings and a chrono format that parses them. Candidates are collected
//! from the document name first, then the content. The date that occurs
//! most often wins, preferring dates after `now` over dates that already
//! passed:
//!
//! 1. the most frequent upcoming date
//! 2. otherwise the most frequent passed date
//! 3. otherwise no date
//!
//! Equal frequencies go to the date seen first.

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use tracing::debug;

use vpaper_core::defaults::RULE_TRACE_MAX_MATCHES;
use vpaper_core::{Error, Result};

use crate::trace::{self, Trace};

/// Parse `text` with a chrono format string.
///
/// Tries a timezone-aware datetime, then a naive datetime taken as UTC,
/// then a plain date at UTC midnight. Formats that leave out the month or
/// day (`%m/%Y`, `%B %Y`, `%Y`) default them to the first.
pub fn parse_date(text: &str, fmt: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
        return Some(d.and_time(NaiveTime::MIN).and_utc());
    }
    parse_partial(text, fmt)
}

fn parse_partial(text: &str, fmt: &str) -> Option<DateTime<Utc>> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, text, StrftimeItems::new(fmt)).ok()?;
    // setters refuse to overwrite a field the text already set
    let _ = parsed.set_month(1);
    let _ = parsed.set_day(1);

    let date = parsed.to_naive_date().ok()?;
    let naive = date.and_time(parsed.to_naive_time().unwrap_or(NaiveTime::MIN));
    match parsed.to_fixed_offset() {
        Ok(offset) => naive
            .and_local_timezone(offset)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        Err(_) => Some(naive.and_utc()),
    }
}

/// Occurrence counter that remembers first-seen order.
#[derive(Default)]
struct Tally {
    counts: Vec<(DateTime<Utc>, usize)>,
}

impl Tally {
    fn add(&mut self, date: DateTime<Utc>) {
        match self.counts.iter_mut().find(|(d, _)| *d == date) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((date, 1)),
        }
    }

    fn most_frequent(&self) -> Option<DateTime<Utc>> {
        let mut best: Option<(DateTime<Utc>, usize)> = None;
        for &(date, n) in &self.counts {
            if best.map_or(true, |(_, top)| n > top) {
                best = Some((date, n));
            }
        }
        best.map(|(date, _)| date)
    }

    fn len(&self) -> usize {
        self.counts.len()
    }
}

/// Extract the best-guess date from a document's name and content.
///
/// Returns `Ok(None)` when no candidate parses. An invalid `pattern` is
/// `Error::InvalidInput`.
pub fn extract_date(
    pattern: &str,
    fmt: &str,
    name: &str,
    content: &str,
    now: DateTime<Utc>,
    mut trace: Option<&mut Trace>,
) -> Result<Option<DateTime<Utc>>> {
    let re = Regex::new(pattern)
        .map_err(|e| Error::InvalidInput(format!("date regex '{}': {}", pattern, e)))?;

    let matches: Vec<&str> = re
        .find_iter(name)
        .chain(re.find_iter(content))
        .map(|m| m.as_str())
        .collect();

    trace::info(&mut trace, || {
        format!("regex resulted in total of {} matches", matches.len())
    });
    trace::info(&mut trace, || {
        if matches.len() > RULE_TRACE_MAX_MATCHES {
            format!(
                "regex matches (first {}): {:?}",
                RULE_TRACE_MAX_MATCHES,
                &matches[..RULE_TRACE_MAX_MATCHES]
            )
        } else {
            format!("regex matches: {:?}", matches)
        }
    });

    let mut upcoming = Tally::default();
    let mut passed = Tally::default();
    for text in &matches {
        match parse_date(text, fmt) {
            Some(date) if date > now => upcoming.add(date),
            Some(date) => passed.add(date),
            None => {
                debug!(text = %text, date_fmt = %fmt, "Text does not match date format");
                trace::warn(&mut trace, || {
                    format!(
                        "matched text '{}' does not match date format '{}', skipping",
                        text, fmt
                    )
                });
            }
        }
    }

    let valid = upcoming.len() + passed.len();
    if valid == 0 {
        return Ok(None);
    }
    trace::info(&mut trace, || format!("found total of {} valid dates", valid));

    let picked = upcoming.most_frequent().or_else(|| passed.most_frequent());
    if let Some(date) = picked {
        trace::info(&mut trace, || format!("selected date {}", date.format("%Y-%m-%d")));
    }
    Ok(picked)
}
