//! Processing rule models: rules, their conditions and actions, and
//! auto-matching metadata values.
//!
//! Condition and action kinds travel as snake_case strings (`"content_contains"`,
//! `"metadata_add"`). Strings that do not name a known kind deserialize into
//! the `Unrecognized` variants so that evaluation, not parsing, reports them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// How a rule combines the results of its conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Every enabled condition must match.
    #[default]
    MatchAll,
    /// At least one enabled condition must match.
    MatchAny,
}

/// Document text field inspected by a text condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Name,
    Description,
    Content,
}

/// How a text condition compares its value against the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMatch {
    Is,
    Starts,
    Contains,
}

/// Comparison used by metadata count conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountComparison {
    Equal,
    LessThan,
    MoreThan,
}

/// Kind of a rule condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionKind {
    Text { field: TextField, matching: TextMatch },
    MetadataHasKey,
    MetadataHasKeyValue,
    MetadataCount(CountComparison),
    Date,
    /// A kind this build does not know. Evaluating it is an internal error.
    Unrecognized(String),
}

impl ConditionKind {
    pub fn as_str(&self) -> &str {
        use CountComparison::*;
        use TextField::*;
        use TextMatch::*;

        match self {
            ConditionKind::Text { field, matching } => match (field, matching) {
                (Name, Is) => "name_is",
                (Name, Starts) => "name_starts",
                (Name, Contains) => "name_contains",
                (Description, Is) => "description_is",
                (Description, Starts) => "description_starts",
                (Description, Contains) => "description_contains",
                (Content, Is) => "content_is",
                (Content, Starts) => "content_starts",
                (Content, Contains) => "content_contains",
            },
            ConditionKind::MetadataHasKey => "metadata_has_key",
            ConditionKind::MetadataHasKeyValue => "metadata_has_key_value",
            ConditionKind::MetadataCount(Equal) => "metadata_count",
            ConditionKind::MetadataCount(LessThan) => "metadata_count_less_than",
            ConditionKind::MetadataCount(MoreThan) => "metadata_count_more_than",
            ConditionKind::Date => "date",
            ConditionKind::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl From<&str> for ConditionKind {
    fn from(s: &str) -> Self {
        let text = |field, matching| ConditionKind::Text { field, matching };
        match s {
            "name_is" => text(TextField::Name, TextMatch::Is),
            "name_starts" => text(TextField::Name, TextMatch::Starts),
            "name_contains" => text(TextField::Name, TextMatch::Contains),
            "description_is" => text(TextField::Description, TextMatch::Is),
            "description_starts" => text(TextField::Description, TextMatch::Starts),
            "description_contains" => text(TextField::Description, TextMatch::Contains),
            "content_is" => text(TextField::Content, TextMatch::Is),
            "content_starts" => text(TextField::Content, TextMatch::Starts),
            "content_contains" => text(TextField::Content, TextMatch::Contains),
            "metadata_has_key" => ConditionKind::MetadataHasKey,
            "metadata_has_key_value" => ConditionKind::MetadataHasKeyValue,
            "metadata_count" => ConditionKind::MetadataCount(CountComparison::Equal),
            "metadata_count_less_than" => ConditionKind::MetadataCount(CountComparison::LessThan),
            "metadata_count_more_than" => ConditionKind::MetadataCount(CountComparison::MoreThan),
            "date" => ConditionKind::Date,
            other => ConditionKind::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for ConditionKind {
    fn from(s: String) -> Self {
        ConditionKind::from(s.as_str())
    }
}

impl From<ConditionKind> for String {
    fn from(kind: ConditionKind) -> Self {
        match kind {
            ConditionKind::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single predicate over a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub id: i64,
    pub enabled: bool,
    /// Invert the raw result before it is combined.
    pub inverted: bool,
    pub case_insensitive: bool,
    #[serde(rename = "condition_type")]
    pub kind: ConditionKind,
    /// Text to match, count limit, or date regex depending on the kind.
    pub value: String,
    /// chrono format string used by date conditions, e.g. `%Y-%m-%d`.
    #[serde(default)]
    pub date_fmt: String,
    #[serde(default)]
    pub metadata_key: Option<i64>,
    #[serde(default)]
    pub metadata_value: Option<i64>,
}

impl RuleCondition {
    /// An enabled, non-inverted, case-sensitive condition.
    pub fn new(id: i64, kind: ConditionKind, value: impl Into<String>) -> Self {
        Self {
            id,
            enabled: true,
            inverted: false,
            case_insensitive: false,
            kind,
            value: value.into(),
            date_fmt: String::new(),
            metadata_key: None,
            metadata_value: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn with_date_fmt(mut self, fmt: impl Into<String>) -> Self {
        self.date_fmt = fmt.into();
        self
    }

    pub fn with_metadata(mut self, key: i64, value: Option<i64>) -> Self {
        self.metadata_key = Some(key);
        self.metadata_value = value;
        self
    }
}

/// Kind of a rule action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    SetName,
    AppendName,
    SetDescription,
    AppendDescription,
    AddMetadata,
    RemoveMetadata,
    SetDate,
    /// A kind this build does not know. Executing it fails that action only.
    Unrecognized(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::SetName => "name_set",
            ActionKind::AppendName => "name_append",
            ActionKind::SetDescription => "description_set",
            ActionKind::AppendDescription => "description_append",
            ActionKind::AddMetadata => "metadata_add",
            ActionKind::RemoveMetadata => "metadata_remove",
            ActionKind::SetDate => "date_set",
            ActionKind::Unrecognized(raw) => raw.as_str(),
        }
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        match s {
            "name_set" => ActionKind::SetName,
            "name_append" => ActionKind::AppendName,
            "description_set" => ActionKind::SetDescription,
            "description_append" => ActionKind::AppendDescription,
            "metadata_add" => ActionKind::AddMetadata,
            "metadata_remove" => ActionKind::RemoveMetadata,
            "date_set" => ActionKind::SetDate,
            other => ActionKind::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for ActionKind {
    fn from(s: String) -> Self {
        ActionKind::from(s.as_str())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document mutation applied after a successful match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    pub id: i64,
    pub enabled: bool,
    #[serde(rename = "action")]
    pub kind: ActionKind,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub metadata_key: Option<i64>,
    /// For `metadata_remove`, `None` removes every value of the key.
    #[serde(default)]
    pub metadata_value: Option<i64>,
}

impl RuleAction {
    pub fn new(id: i64, kind: ActionKind, value: impl Into<String>) -> Self {
        Self {
            id,
            enabled: true,
            kind,
            value: value.into(),
            metadata_key: None,
            metadata_value: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_metadata(mut self, key: i64, value: Option<i64>) -> Self {
        self.metadata_key = Some(key);
        self.metadata_value = value;
        self
    }
}

/// A named, ordered set of conditions plus the actions applied on match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
    pub mode: RuleMode,
    pub conditions: Vec<RuleCondition>,
    pub actions: Vec<RuleAction>,
}

impl Rule {
    pub fn new(id: i64, name: impl Into<String>, mode: RuleMode) -> Self {
        Self {
            id,
            user_id: 0,
            name: name.into(),
            description: String::new(),
            enabled: true,
            mode,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: RuleAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// How a metadata value decides that a document implies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataMatchType {
    /// Case-folded, typo-tolerant substring of the content.
    Exact,
    /// Regular expression over the content.
    Regex,
}

/// A metadata value that can be assigned automatically from document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
    pub id: i64,
    pub key_id: i64,
    pub value: String,
    /// Whether the value takes part in automatic matching.
    pub match_documents: bool,
    pub match_type: MetadataMatchType,
    pub match_filter: String,
}
