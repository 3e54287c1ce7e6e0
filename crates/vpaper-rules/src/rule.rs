//! A rule bound to the document it is evaluated against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vpaper_core::{Document, Error, Result, Rule, RuleMode};

use crate::actions;
use crate::conditions::{self, Evaluation};
use crate::trace::{self, Trace};

/// Result of one evaluated condition in a test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub condition_id: i64,
    pub matched: bool,
}

/// Outcome of [`match_test`].
///
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTestResult {
    pub rule_id: i64,
    pub matched: bool,
    pub conditions: Vec<ConditionResult>,
    pub log: Trace,
    pub error: Option<String>,
    pub started_at: i64,
    pub stopped_at: i64,
    pub took_ms: i64,
}

/// Evaluates a rule against a document and applies its actions.
///
/// The document is borrowed mutably for one pass. Persisting it afterwards
/// is up to the caller.
///
/// ```rust
/// use vpaper_core::{ActionKind, ConditionKind, Document, Rule, RuleAction, RuleCondition, RuleMode};
/// use vpaper_rules::DocumentRule;
///
/// let rule = Rule::new(1, "bills", RuleMode::MatchAll)
///     .with_condition(RuleCondition::new(1, ConditionKind::from("content_contains"), "bill"))
///     .with_action(RuleAction::new(1, ActionKind::SetName, "Bill"));
/// let mut doc = Document::ingested(1, "scan.pdf", "h");
/// doc.content = "your bill".to_string();
///
/// let mut bound = DocumentRule::new(&rule, &mut doc);
/// if bound.matches().unwrap() {
///     bound.run_actions().unwrap();
/// }
/// assert_eq!(doc.name, "Bill");
/// ```
pub struct DocumentRule<'a> {
    rule: &'a Rule,
    document: &'a mut Document,
    date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
}

impl<'a> DocumentRule<'a> {
    pub fn new(rule: &'a Rule, document: &'a mut Document) -> Self {
        Self {
            rule,
            document,
            date: None,
            now: Utc::now(),
        }
    }

    /// Use `now` as the reference point for date conditions.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn document(&self) -> &Document {
        &*self.document
    }

    /// Date captured by the last date condition that found one.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    /// Evaluate the rule's conditions against the document.
    ///
    /// A date found by a date condition is kept for a later `date_set`
    /// action in [`run_actions`](Self::run_actions).
    pub fn matches(&mut self) -> Result<bool> {
        debug!(rule_id = self.rule.id, document_id = %self.document.id, "Match document");
        let (matched, date) = evaluate(self.rule, &*self.document, self.now, None, None)?;
        if date.is_some() {
            self.date = date;
        }
        Ok(matched)
    }

    /// Traced dry run of [`matches`](Self::matches). See [`match_test`].
    pub fn match_test(&self) -> RuleTestResult {
        match_test(self.rule, &*self.document, self.now)
    }

    /// Run the rule's enabled actions in order.
    ///
    /// A failing action does not stop the ones after it. The last failure is
    /// returned wrapped in [`Error::Action`].
    pub fn run_actions(&mut self) -> Result<()> {
        debug!(rule_id = self.rule.id, document_id = %self.document.id, "Run rule actions");
        let mut last_error = None;
        let mut changed = false;

        for (i, action) in self.rule.actions.iter().enumerate() {
            if !action.enabled {
                info!(rule_id = self.rule.id, position = i, action_id = action.id, kind = %action.kind, "Action disabled");
                continue;
            }
            info!(rule_id = self.rule.id, position = i, action_id = action.id, kind = %action.kind, "Run action");
            match actions::execute(action, &mut *self.document, self.date) {
                Ok(c) => changed |= c,
                Err(e) => {
                    warn!(rule_id = self.rule.id, action_id = action.id, error = %e, "Action failed");
                    last_error = Some(Error::action(action.id, e));
                }
            }
        }

        if changed {
            self.document.touch();
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Traced dry run of a rule against a shared document.
///
/// Evaluates exactly like [`DocumentRule::matches`] but needs no exclusive
/// access and captures no date. Evaluation errors are reported in the
/// result instead of returned.
pub fn match_test(rule: &Rule, document: &Document, now: DateTime<Utc>) -> RuleTestResult {
    let started_at = Utc::now().timestamp_millis();
    let mut log = Trace::new();
    let mut conditions = Vec::new();

    log.info(format!(
        "try to match document: {}, rule: id: {}, name: {}",
        document.id, rule.id, rule.name
    ));
    let (matched, error) = match evaluate(rule, document, now, Some(&mut log), Some(&mut conditions)) {
        Ok((matched, _)) => (matched, None),
        Err(e) => {
            log.warn(format!("evaluate condition: {}", e));
            (false, Some(e.to_string()))
        }
    };

    let stopped_at = Utc::now().timestamp_millis();
    RuleTestResult {
        rule_id: rule.id,
        matched,
        conditions,
        log,
        error,
        started_at,
        stopped_at,
        took_ms: stopped_at - started_at,
    }
}

/// Shared condition loop for `matches` and `match_test`.
///
/// Returns the match result and the last date found by a date condition.
fn evaluate(
    rule: &Rule,
    document: &Document,
    now: DateTime<Utc>,
    mut trace: Option<&mut Trace>,
    mut records: Option<&mut Vec<ConditionResult>>,
) -> Result<(bool, Option<DateTime<Utc>>)> {
    let mut has_match = false;
    let mut date = None;

    for (i, condition) in rule.conditions.iter().enumerate() {
        let position = i + 1;
        if !condition.enabled {
            debug!(rule_id = rule.id, condition_id = condition.id, position, kind = %condition.kind, "Condition disabled");
            trace::warn(&mut trace, || {
                format!(
                    "rule {} - condition: {} (#{}), {} is disabled, skipping condition",
                    rule.id, condition.id, position, condition.kind
                )
            });
            continue;
        }

        debug!(rule_id = rule.id, condition_id = condition.id, position, kind = %condition.kind, "Evaluate condition");
        trace::info(&mut trace, || {
            format!(
                "evaluate rule {} - condition: {} (#{}), type: '{}'",
                rule.id, condition.id, position, condition.kind
            )
        });

        let Evaluation { matched, date: found } =
            conditions::evaluate(condition, document, now, trace.as_deref_mut())?;
        if let Some(found) = found {
            trace::info(&mut trace, || format!("found date {}", found.format("%Y-%m-%d")));
            date = Some(found);
        }
        if let Some(records) = records.as_deref_mut() {
            records.push(ConditionResult {
                condition_id: condition.id,
                matched,
            });
        }

        if matched {
            has_match = true;
            trace::info(&mut trace, || format!("condition {} matched", condition.id));
            if rule.mode == RuleMode::MatchAny {
                trace::info(&mut trace, || {
                    "document matches and mode is set to 'match any', skip rest conditions".to_string()
                });
                break;
            }
        } else if rule.mode == RuleMode::MatchAll {
            trace::info(&mut trace, || {
                format!("condition {} didn't match, skip rest", condition.id)
            });
            return Ok((false, date));
        } else {
            trace::info(&mut trace, || {
                format!("condition {} didn't match, continuing", condition.id)
            });
        }
    }
    Ok((has_match, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vpaper_core::{ActionKind, ConditionKind, RuleAction, RuleCondition, TextField, TextMatch};

    fn contains(id: i64, value: &str) -> RuleCondition {
        RuleCondition::new(
            id,
            ConditionKind::Text {
                field: TextField::Content,
                matching: TextMatch::Contains,
            },
            value,
        )
    }

    fn doc(content: &str) -> Document {
        let mut doc = Document::ingested(1, "scan.pdf", "h");
        doc.content = content.to_string();
        doc
    }

    #[test]
    fn test_match_all_requires_every_enabled_condition() {
        let rule = Rule::new(1, "r", RuleMode::MatchAll)
            .with_condition(contains(1, "foo"))
            .with_condition(contains(2, "missing").disabled())
            .with_condition(contains(3, "bar"));
        let mut d = doc("foo bar");
        assert!(DocumentRule::new(&rule, &mut d).matches().unwrap());

        let mut d = doc("foo only");
        assert!(!DocumentRule::new(&rule, &mut d).matches().unwrap());
    }

    #[test]
    fn test_match_all_without_enabled_conditions_does_not_match() {
        let rule = Rule::new(1, "r", RuleMode::MatchAll).with_condition(contains(1, "x").disabled());
        let mut d = doc("x");
        assert!(!DocumentRule::new(&rule, &mut d).matches().unwrap());
    }

    #[test]
    fn test_match_any_stops_at_first_match() {
        let rule = Rule::new(1, "r", RuleMode::MatchAny)
            .with_condition(contains(1, "foo"))
            .with_condition(contains(2, "bar"))
            .with_condition(RuleCondition::new(3, ConditionKind::from("bogus"), ""));
        let mut d = doc("bar");
        // the unrecognized condition is never reached
        assert!(DocumentRule::new(&rule, &mut d).matches().unwrap());
    }

    #[test]
    fn test_unrecognized_condition_aborts_rule() {
        let rule = Rule::new(1, "r", RuleMode::MatchAll)
            .with_condition(RuleCondition::new(1, ConditionKind::from("bogus"), ""));
        let mut d = doc("");
        let err = DocumentRule::new(&rule, &mut d).matches().unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_match_test_reports_error_and_leaves_document() {
        let rule = Rule::new(7, "r", RuleMode::MatchAll)
            .with_condition(contains(1, "foo"))
            .with_condition(RuleCondition::new(2, ConditionKind::from("bogus"), ""));
        let mut d = doc("foo");
        let before = d.clone();

        let bound = DocumentRule::new(&rule, &mut d);
        let result = bound.match_test();
        assert_eq!(result.rule_id, 7);
        assert!(!result.matched);
        assert!(result.error.as_deref().is_some_and(|e| e.contains("bogus")));
        assert_eq!(result.conditions.len(), 1);
        assert!(result.took_ms >= 0);
        assert_eq!(result.stopped_at - result.started_at, result.took_ms);
        assert_eq!(bound.date(), None);
        drop(bound);
        assert_eq!(d, before);
    }

    #[test]
    fn test_match_test_on_shared_document() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rule = Rule::new(3, "r", RuleMode::MatchAny)
            .with_condition(contains(1, "foo"))
            .with_condition(
                RuleCondition::new(2, ConditionKind::Date, r"\d{4}-\d{2}-\d{2}")
                    .with_date_fmt("%Y-%m-%d"),
            );
        let d = doc("paid 2024-05-01");
        let shared = &d;

        let result = match_test(&rule, shared, now);
        assert!(result.matched);
        assert_eq!(
            result.conditions,
            vec![
                ConditionResult { condition_id: 1, matched: false },
                ConditionResult { condition_id: 2, matched: true },
            ]
        );
        assert!(result.log.render().contains("found date 2024-05-01"));
        assert_eq!(shared.date, d.date);
    }

    #[test]
    fn test_match_test_warns_about_disabled_conditions() {
        let rule = Rule::new(1, "r", RuleMode::MatchAll)
            .with_condition(contains(1, "foo").disabled())
            .with_condition(contains(2, "foo"));
        let mut d = doc("foo");
        let result = DocumentRule::new(&rule, &mut d).match_test();

        assert!(result.matched);
        assert_eq!(
            result.conditions,
            vec![ConditionResult {
                condition_id: 2,
                matched: true
            }]
        );
        assert!(result.log.render().contains("warning - rule 1 - condition: 1 (#1)"));
    }

    #[test]
    fn test_date_condition_feeds_set_date_action() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rule = Rule::new(1, "r", RuleMode::MatchAll)
            .with_condition(
                RuleCondition::new(1, ConditionKind::Date, r"\d{2}\.\d{2}\.\d{4}")
                    .with_date_fmt("%d.%m.%Y"),
            )
            .with_action(RuleAction::new(1, ActionKind::SetDate, ""));
        let mut d = doc("due 15.02.2024");

        let mut bound = DocumentRule::new(&rule, &mut d).at(now);
        assert!(bound.matches().unwrap());
        bound.run_actions().unwrap();
        assert_eq!(d.date, Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_run_actions_continues_after_failure_and_returns_last_error() {
        let rule = Rule::new(1, "r", RuleMode::MatchAll)
            .with_action(RuleAction::new(10, ActionKind::from("first_bad"), ""))
            .with_action(RuleAction::new(11, ActionKind::SetName, "renamed"))
            .with_action(RuleAction::new(12, ActionKind::AddMetadata, ""))
            .with_action(RuleAction::new(13, ActionKind::AppendName, "!").disabled());
        let mut d = doc("");
        let before = d.updated_at;

        let err = DocumentRule::new(&rule, &mut d).run_actions().unwrap_err();
        match err {
            Error::Action { action_id, source } => {
                assert_eq!(action_id, 12);
                assert!(matches!(*source, Error::InvalidInput(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(d.name, "renamed");
        assert!(d.updated_at >= before);
    }

    #[test]
    fn test_run_actions_without_changes_keeps_updated_at() {
        let rule = Rule::new(1, "r", RuleMode::MatchAll)
            .with_action(RuleAction::new(1, ActionKind::SetName, "scan.pdf"));
        let mut d = doc("");
        let before = d.updated_at;
        DocumentRule::new(&rule, &mut d).run_actions().unwrap();
        assert_eq!(d.updated_at, before);
    }
}
