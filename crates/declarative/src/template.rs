//! Command template expansion
//!
//! Templates are shell command strings with `$`-prefixed variables:
//!
//! | Variable       | Meaning                                            |
//! |----------------|----------------------------------------------------|
//! | `$key`         | first key of the path (same as `$key0`)            |
//! | `$keyN`        | N-th key of the path, zero-based                   |
//! | `$value`       | the action's value                                 |
//! | `$new_value`   | value being written (add, update)                  |
//! | `$old_value`   | value being replaced or removed (update, remove)   |
//!
//! Variables match whole identifiers only: `$values` or `$key1x` are left
//! alone. A variable with nothing to bind to (an out-of-range key index, or
//! `$old_value` on an add) is left in the command literally, as are `${...}`
//! shell expansions. Substituted text is not quoted.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::diff::DomainAction;
use crate::types::{ActionKind, ValueFormat};

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(key[0-9]*|old_value|new_value|value)\b").expect("variable pattern is valid")
});

/// Expand a template for one action
pub fn expand(template: &str, action: &DomainAction, format: ValueFormat) -> String {
    VARIABLE
        .replace_all(template, |caps: &Captures<'_>| {
            bind(&caps[1], action, format).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Value bound to a variable name, if any
fn bind(name: &str, action: &DomainAction, format: ValueFormat) -> Option<String> {
    match name {
        "value" => Some(action.value.render(format)),
        "new_value" => match action.kind {
            ActionKind::Add | ActionKind::Update => Some(action.value.render(format)),
            ActionKind::Remove => None,
        },
        "old_value" => match action.kind {
            ActionKind::Update => action.previous.as_ref().map(|v| v.render(format)),
            ActionKind::Remove => Some(action.value.render(format)),
            ActionKind::Add => None,
        },
        key => {
            let index = match &key["key".len()..] {
                "" => 0,
                digits => digits.parse::<usize>().ok()?,
            };
            action.key_path.get(index).cloned()
        }
    }
}

/// Variable names referenced by a template, in order of appearance
pub fn variables(template: &str) -> Vec<&str> {
    VARIABLE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}
