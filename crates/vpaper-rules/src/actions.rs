//! Rule action execution.

use chrono::{DateTime, Utc};

use vpaper_core::{ActionKind, Document, Error, Result, RuleAction};

/// Apply one action to `document`.
///
/// `date` is the date captured by a date condition earlier in the same pass,
/// if any. Returns whether the document changed.
pub fn execute(action: &RuleAction, document: &mut Document, date: Option<DateTime<Utc>>) -> Result<bool> {
    let changed = match &action.kind {
        ActionKind::SetName => set(&mut document.name, &action.value),
        ActionKind::AppendName => append(&mut document.name, &action.value),
        ActionKind::SetDescription => set(&mut document.description, &action.value),
        ActionKind::AppendDescription => append(&mut document.description, &action.value),
        ActionKind::AddMetadata => {
            let key = metadata_key(action)?;
            let value = action.metadata_value.ok_or_else(|| {
                Error::InvalidInput(format!("action {} has no metadata value", action.id))
            })?;
            document.metadata.add(key, value)
        }
        ActionKind::RemoveMetadata => {
            let key = metadata_key(action)?;
            document.metadata.remove(key, action.metadata_value) > 0
        }
        ActionKind::SetDate => match date {
            Some(date) if document.date != date => {
                document.date = date;
                true
            }
            _ => false,
        },
        ActionKind::Unrecognized(raw) => {
            return Err(Error::Internal(format!("unknown action type: {}", raw)));
        }
    };
    Ok(changed)
}

fn set(target: &mut String, value: &str) -> bool {
    if target == value {
        return false;
    }
    target.clear();
    target.push_str(value);
    true
}

fn append(target: &mut String, value: &str) -> bool {
    if target.ends_with(value) {
        return false;
    }
    target.push_str(value);
    true
}

fn metadata_key(action: &RuleAction) -> Result<i64> {
    action
        .metadata_key
        .ok_or_else(|| Error::InvalidInput(format!("action {} has no metadata key", action.id)))
}
