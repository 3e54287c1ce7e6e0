//! Evaluation of a single rule condition against a document.

use chrono::{DateTime, Utc};

use vpaper_core::{
    ConditionKind, CountComparison, Document, Error, Result, RuleCondition, TextField, TextMatch,
};

use crate::dates::extract_date;
use crate::trace::Trace;
use crate::typo::match_text_allow_typo;

/// Result of evaluating one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    /// Final result, after inversion.
    pub matched: bool,
    /// Date found by a date condition, before inversion is considered.
    pub date: Option<DateTime<Utc>>,
}

/// Evaluate `condition` against `document`.
///
/// The caller is responsible for skipping disabled conditions. `now` is the
/// reference point for date extraction.
pub fn evaluate(
    condition: &RuleCondition,
    document: &Document,
    now: DateTime<Utc>,
    trace: Option<&mut Trace>,
) -> Result<Evaluation> {
    let mut date = None;
    let raw = match &condition.kind {
        ConditionKind::Text { field, matching } => {
            let text = match field {
                TextField::Name => &document.name,
                TextField::Description => &document.description,
                TextField::Content => &document.content,
            };
            match_text(condition, text, *matching)
        }
        ConditionKind::MetadataHasKey => document.metadata.has_key(metadata_key(condition)?),
        ConditionKind::MetadataHasKeyValue => {
            let key = metadata_key(condition)?;
            let value = condition.metadata_value.ok_or_else(|| {
                Error::InvalidInput(format!("condition {} has no metadata value", condition.id))
            })?;
            document.metadata.has_key_value(key, value)
        }
        ConditionKind::MetadataCount(comparison) => {
            let limit = count_limit(condition)?;
            let count = document.metadata.len();
            match comparison {
                CountComparison::Equal => count == limit,
                CountComparison::LessThan => count < limit,
                CountComparison::MoreThan => count > limit,
            }
        }
        ConditionKind::Date => {
            date = extract_date(
                &condition.value,
                &condition.date_fmt,
                &document.name,
                &document.content,
                now,
                trace,
            )?;
            date.is_some()
        }
        ConditionKind::Unrecognized(raw) => {
            return Err(Error::Internal(format!("unknown condition type: {}", raw)));
        }
    };

    Ok(Evaluation {
        matched: raw != condition.inverted,
        date,
    })
}

fn match_text(condition: &RuleCondition, text: &str, matching: TextMatch) -> bool {
    if condition.case_insensitive {
        match_text_allow_typo(
            &condition.value.to_lowercase(),
            &text.to_lowercase(),
            matching,
        )
    } else {
        match_text_allow_typo(&condition.value, text, matching)
    }
}

fn metadata_key(condition: &RuleCondition) -> Result<i64> {
    condition.metadata_key.ok_or_else(|| {
        Error::InvalidInput(format!("condition {} has no metadata key", condition.id))
    })
}

fn count_limit(condition: &RuleCondition) -> Result<usize> {
    condition.value.trim().parse::<usize>().map_err(|_| {
        Error::InvalidInput(format!(
            "condition {}: metadata count '{}' must be a non-negative number",
            condition.id, condition.value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc() -> Document {
        let mut doc = Document::ingested(1, "Invoice 2024.pdf", "h");
        doc.content = "Your Electricity Bill for May".to_string();
        doc.description = "monthly".to_string();
        doc.metadata.add(1, 10);
        doc.metadata.add(2, 20);
        doc
    }

    fn eval(condition: &RuleCondition) -> Result<bool> {
        evaluate(condition, &doc(), Utc::now(), None).map(|e| e.matched)
    }

    fn text(field: TextField, matching: TextMatch) -> ConditionKind {
        ConditionKind::Text { field, matching }
    }

    #[test]
    fn test_text_conditions_pick_their_field() {
        let name = RuleCondition::new(1, text(TextField::Name, TextMatch::Starts), "Invoice");
        let desc = RuleCondition::new(2, text(TextField::Description, TextMatch::Is), "monthly");
        let content = RuleCondition::new(
            3,
            text(TextField::Content, TextMatch::Contains),
            "Electricity Bill",
        );
        assert!(eval(&name).unwrap());
        assert!(eval(&desc).unwrap());
        assert!(eval(&content).unwrap());
    }

    #[test]
    fn test_case_insensitive_folds_both_sides() {
        let kind = text(TextField::Content, TextMatch::Contains);
        let sensitive = RuleCondition::new(1, kind.clone(), "electricity bill");
        assert!(!eval(&sensitive).unwrap());
        assert!(eval(&sensitive.case_insensitive()).unwrap());
    }

    #[test]
    fn test_inverted_flips_result() {
        let cond = RuleCondition::new(1, text(TextField::Name, TextMatch::Is), "Receipt").inverted();
        assert!(eval(&cond).unwrap());
    }

    #[test]
    fn test_metadata_key_conditions() {
        let has_key = RuleCondition::new(1, ConditionKind::MetadataHasKey, "");
        assert!(eval(&has_key.clone().with_metadata(1, None)).unwrap());
        assert!(!eval(&has_key.with_metadata(3, None)).unwrap());

        let kv = RuleCondition::new(2, ConditionKind::MetadataHasKeyValue, "");
        assert!(eval(&kv.clone().with_metadata(2, Some(20))).unwrap());
        assert!(!eval(&kv.with_metadata(2, Some(10))).unwrap());
    }

    #[test]
    fn test_metadata_condition_requires_key() {
        let cond = RuleCondition::new(1, ConditionKind::MetadataHasKey, "");
        assert!(matches!(eval(&cond), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_metadata_count_comparisons() {
        let count = |cmp, value: &str| {
            eval(&RuleCondition::new(1, ConditionKind::MetadataCount(cmp), value)).unwrap()
        };
        assert!(count(CountComparison::Equal, "2"));
        assert!(!count(CountComparison::Equal, "1"));
        assert!(count(CountComparison::LessThan, "3"));
        assert!(!count(CountComparison::LessThan, "2"));
        assert!(count(CountComparison::MoreThan, "1"));
        assert!(!count(CountComparison::MoreThan, "2"));
    }

    #[test]
    fn test_metadata_count_rejects_bad_value() {
        for value in ["-1", "two", ""] {
            let cond = RuleCondition::new(
                1,
                ConditionKind::MetadataCount(CountComparison::Equal),
                value,
            );
            assert!(matches!(eval(&cond), Err(Error::InvalidInput(_))), "{value}");
        }
    }

    #[test]
    fn test_date_condition_returns_date() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let cond = RuleCondition::new(1, ConditionKind::Date, r"\d{4}").with_date_fmt("%d.%m.%Y");
        let eval = evaluate(&cond, &doc(), now, None).unwrap();
        assert!(!eval.matched);
        assert_eq!(eval.date, None);

        // a year alone is January 1st
        let cond = RuleCondition::new(3, ConditionKind::Date, r"\d{4}").with_date_fmt("%Y");
        let eval = evaluate(&cond, &doc(), now, None).unwrap();
        assert!(eval.matched);
        assert_eq!(
            eval.date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );

        let mut dated = doc();
        dated.content = "paid 2024-05-01".to_string();
        let cond =
            RuleCondition::new(2, ConditionKind::Date, r"\d{4}-\d{2}-\d{2}").with_date_fmt("%Y-%m-%d");
        let eval = evaluate(&cond, &dated, now, None).unwrap();
        assert!(eval.matched);
        assert_eq!(
            eval.date,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_unrecognized_kind_is_internal_error() {
        let cond = RuleCondition::new(1, ConditionKind::from("colour_is"), "red");
        let err = eval(&cond).unwrap_err();
        assert!(matches!(err, Error::Internal(msg) if msg.contains("colour_is")));
    }
}
