use std::{borrow::Cow, str::FromStr};

use serde_json::Value;

use crate::{
    error::{StoreError, StoreResult},
    expiry,
    store::Member,
    wildcard::Pattern,
};

/// How the items of a multi-field filter are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    #[default]
    And,
    Or,
}

impl FromStr for Condition {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Condition::And),
            "or" => Ok(Condition::Or),
            _ => Err(StoreError::InvalidFilterFormat),
        }
    }
}

/// One `{"field": ..., "value": ...}` item of a multi-field filter. The value
/// is compared by exact equality.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn parse(item: &Value) -> StoreResult<Self> {
        let object = item.as_object().ok_or(StoreError::InvalidFilterFormat)?;
        let field = match object.get("field") {
            Some(Value::String(field)) => field.clone(),
            _ => return Err(StoreError::InvalidFilterFormat),
        };
        let value = object
            .get("value")
            .cloned()
            .ok_or(StoreError::InvalidFilterFormat)?;
        Ok(Filter { field, value })
    }

    fn accepts(&self, member: &Member) -> bool {
        member.get(&self.field) == Some(&self.value)
    }
}

/// Canonical string form used for wildcard matching: strings verbatim,
/// everything else as compact JSON.
pub fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}

pub fn field_exists(members: &[Member], field: &str) -> bool {
    members.iter().any(|m| m.contains_key(field))
}

/// Members whose `field` matches `pattern` and that have not expired at `now`.
pub fn by_field(
    members: &[Member],
    field: &str,
    pattern: &str,
    now: i64,
) -> StoreResult<Vec<Member>> {
    if !field_exists(members, field) {
        return Err(StoreError::FieldNotFound);
    }
    let pattern = Pattern::new(pattern);
    Ok(members
        .iter()
        .filter(|m| {
            m.get(field)
                .map(|v| pattern.matches(&stringify(v)))
                .unwrap_or(false)
                && expiry::is_valid(m, now)
        })
        .cloned()
        .collect())
}

/// Members with any field value matching `pattern`. Expiry is not applied.
pub fn by_value(members: &[Member], pattern: &str) -> Vec<Member> {
    let pattern = Pattern::new(pattern);
    members
        .iter()
        .filter(|m| m.values().any(|v| pattern.matches(&stringify(v))))
        .cloned()
        .collect()
}

pub fn multi(
    members: &[Member],
    filters: &[Value],
    condition: Condition,
) -> StoreResult<Vec<Member>> {
    let filters = filters
        .iter()
        .map(Filter::parse)
        .collect::<StoreResult<Vec<_>>>()?;
    if filters.iter().any(|f| !field_exists(members, &f.field)) {
        return Err(StoreError::InvalidFilterFormat);
    }

    let selected = match condition {
        Condition::And => {
            let mut selected: Vec<usize> = (0..members.len()).collect();
            for filter in &filters {
                selected.retain(|&i| filter.accepts(&members[i]));
                if selected.is_empty() {
                    break;
                }
            }
            selected
        }
        Condition::Or => {
            let mut selected: Vec<usize> = Vec::new();
            for filter in &filters {
                for (i, member) in members.iter().enumerate() {
                    if filter.accepts(member) && !selected.contains(&i) {
                        selected.push(i);
                    }
                }
            }
            selected
        }
    };

    Ok(selected.into_iter().map(|i| members[i].clone()).collect())
}
