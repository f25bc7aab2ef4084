use serde_json::{Map, Value};

use crate::path::DottedPath;
use crate::predicate::WhereClause;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split<'a> {
    pub matched: Vec<&'a Value>,
    pub unmatched: Vec<&'a Value>,
}

pub fn pluck_first<'a, I>(records: I, filter: &WhereClause) -> Option<&'a Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    records.into_iter().find(|record| filter.matches(record))
}

pub fn pluck_all<'a, I>(records: I, filter: &WhereClause) -> Vec<&'a Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    records
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect()
}

pub fn split<'a, I>(records: I, filter: &WhereClause) -> Split<'a>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut out = Split::default();
    for record in records {
        if filter.matches(record) {
            out.matched.push(record);
        } else {
            out.unmatched.push(record);
        }
    }
    out
}

/// Builds an object holding only `keys`, named by their dotted form. A path
/// with several values becomes a list. `None` when no key resolved.
pub fn project(record: &Value, keys: &[DottedPath]) -> Option<Map<String, Value>> {
    let mut out = Map::new();
    for key in keys {
        let mut values = key.resolve(record);
        let value = match values.len() {
            0 => continue,
            1 => values.remove(0).clone(),
            _ => Value::Array(values.into_iter().cloned().collect()),
        };
        out.insert(key.to_string(), value);
    }
    (!out.is_empty()).then_some(out)
}
