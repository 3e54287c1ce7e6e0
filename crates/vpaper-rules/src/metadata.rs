//! Automatic metadata assignment from document content.

use regex::Regex;
use tracing::debug;

use vpaper_core::{Document, Error, MetadataMatchType, MetadataValue, Result, TextMatch};

use crate::typo::match_text_allow_typo;

/// Test a metadata value's filter against document content.
///
/// Returns the matched text, or `None` when the filter does not match.
/// - `Exact` lower-cases both sides and allows typos; the lower-cased filter
///   is returned on a match.
/// - `Regex` returns the first capture group if the pattern has one,
///   otherwise the whole match.
pub fn document_matches_filter(
    content: &str,
    match_type: MetadataMatchType,
    filter: &str,
) -> Result<Option<String>> {
    match match_type {
        MetadataMatchType::Exact => {
            let filter = filter.to_lowercase();
            let matched =
                match_text_allow_typo(&filter, &content.to_lowercase(), TextMatch::Contains);
            Ok(matched.then_some(filter))
        }
        MetadataMatchType::Regex => {
            let re = Regex::new(filter)
                .map_err(|e| Error::InvalidInput(format!("invalid regex '{}': {}", filter, e)))?;

            if re.captures_len() > 1 {
                if re.captures_len() > 2 {
                    debug!(filter, groups = re.captures_len() - 1, "Filter has several groups, using the first");
                }
                Ok(re
                    .captures(content)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .filter(|s| !s.is_empty()))
            } else {
                Ok(re
                    .find(content)
                    .map(|m| m.as_str().to_string())
                    .filter(|s| !s.is_empty()))
            }
        }
    }
}

/// Add every auto-matching metadata value whose filter matches the content.
///
/// Values with `match_documents` unset are ignored. Filter errors are
/// logged and skipped. Returns the number of pairs newly added.
pub fn match_metadata(document: &mut Document, values: &[MetadataValue]) -> usize {
    debug!(document_id = %document.id, values = values.len(), "Match metadata values");
    let mut added = 0;
    for value in values.iter().filter(|v| v.match_documents) {
        match document_matches_filter(&document.content, value.match_type, &value.match_filter) {
            Ok(Some(_)) => {
                if document.metadata.add(value.key_id, value.id) {
                    added += 1;
                }
            }
            Ok(None) => {}
            Err(e) => {
                debug!(value_id = value.id, error = %e, "Metadata filter error, skipping");
            }
        }
    }
    if added > 0 {
        document.touch();
    }
    added
}
