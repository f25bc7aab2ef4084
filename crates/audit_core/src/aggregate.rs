use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::path::DottedPath;
use crate::predicate::WhereClause;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub counts: BTreeMap<String, usize>,
    pub matched: usize,
}

impl Tally {
    pub fn add(&mut self, symbol: String) {
        *self.counts.entry(symbol).or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Descending by count, then ascending by symbol.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut rows: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(symbol, count)| (symbol.as_str(), *count))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        rows
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.counts.keys().map(String::as_str).collect()
    }
}

pub type Duplicates = BTreeMap<String, BTreeSet<String>>;

pub fn count_keys<'a, I>(records: I, filter: &WhereClause) -> Tally
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut tally = Tally::default();
    for record in records.into_iter().filter(|r| filter.matches(r)) {
        tally.matched += 1;
        if let Value::Object(map) = record {
            for key in map.keys() {
                tally.add(key.clone());
            }
        }
    }
    tally
}

/// `matched` counts the records that passed the filter and produced at
/// least one value for `key`.
pub fn count_values<'a, I>(records: I, key: &DottedPath, filter: &WhereClause) -> Tally
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut tally = Tally::default();
    for record in records.into_iter().filter(|r| filter.matches(r)) {
        let values = key.resolve(record);
        if values.is_empty() {
            continue;
        }
        tally.matched += 1;
        for value in values {
            match value {
                Value::Array(items) => {
                    for item in items {
                        tally.add(value_symbol(item));
                    }
                }
                other => tally.add(value_symbol(other)),
            }
        }
    }
    tally
}

pub fn distinct_keys<'a, I>(records: I, filter: &WhereClause) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut keys = BTreeSet::new();
    for record in records.into_iter().filter(|r| filter.matches(r)) {
        if let Value::Object(map) = record {
            keys.extend(map.keys().cloned());
        }
    }
    keys
}

/// Groups records by `(type, id)` and keeps the ids seen more than once.
/// Records without a string `type` or a scalar `id` take no part.
pub fn find_duplicates<'a, I>(records: I, filter: &WhereClause) -> Duplicates
where
    I: IntoIterator<Item = &'a Value>,
{
    // Keyed on the id's JSON text so that "5" and 5 stay distinct.
    let mut seen: HashMap<(&str, String), (usize, &Value)> = HashMap::new();
    for record in records.into_iter().filter(|r| filter.matches(r)) {
        let Some(kind) = record.get("type").and_then(Value::as_str) else {
            continue;
        };
        let id = match record.get("id") {
            Some(id @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => id,
            _ => continue,
        };
        seen.entry((kind, id.to_string())).or_insert((0, id)).0 += 1;
    }

    let mut duplicates = Duplicates::new();
    for ((kind, _), (count, id)) in seen {
        if count > 1 {
            duplicates
                .entry(kind.to_string())
                .or_default()
                .insert(value_symbol(id));
        }
    }
    duplicates
}

/// Counter symbol for a value: strings verbatim, other scalars as their JSON
/// text, containers as JSON with object keys sorted.
pub fn value_symbol(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => canonical(value).to_string(),
        scalar => scalar.to_string(),
    }
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, child) in entries {
                sorted.insert(key.clone(), canonical(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{count_keys, count_values, distinct_keys, find_duplicates, value_symbol};
    use crate::path::DottedPath;
    use crate::predicate::WhereClause;

    fn records() -> Vec<Value> {
        vec![
            json!({"type": "X", "id": "a", "flags": ["A", "B"]}),
            json!({"type": "X", "id": "b"}),
            json!({"type": "Y", "id": "a", "flags": ["A"]}),
        ]
    }

    #[test]
    fn key_totals_equal_key_occurrences() {
        let records = records();
        let tally = count_keys(&records, &WhereClause::new());
        assert_eq!(tally.matched, 3);
        assert_eq!(tally.counts["type"], 3);
        assert_eq!(tally.counts["flags"], 2);
        let occurrences: usize = records.iter().map(|r| r.as_object().map_or(0, |m| m.len())).sum();
        assert_eq!(tally.total(), occurrences);
    }

    #[test]
    fn list_values_are_counted_per_element() {
        let records = records();
        let key = DottedPath::parse("flags").expect("path");
        let tally = count_values(&records, &key, &WhereClause::new());
        assert_eq!(tally.matched, 2);
        assert_eq!(tally.counts["A"], 2);
        assert_eq!(tally.counts["B"], 1);
    }

    #[test]
    fn ranked_orders_by_count_then_symbol() {
        let records = records();
        let key = DottedPath::parse("id").expect("path");
        let tally = count_values(&records, &key, &WhereClause::new());
        assert_eq!(tally.ranked(), vec![("a", 2), ("b", 1)]);
    }

    #[test]
    fn filter_applies_before_counting() {
        let records = records();
        let filter = WhereClause::parse(["type=Y"]).expect("filter");
        let keys = distinct_keys(&records, &filter);
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["flags", "id", "type"]);
    }

    #[test]
    fn duplicates_are_keyed_by_type_and_id() {
        let mut records = records();
        assert!(find_duplicates(&records, &WhereClause::new()).is_empty());

        records.push(json!({"type": "X", "id": "a"}));
        records.push(json!({"type": "X", "id": ["a"]}));
        records.push(json!({"id": "a"}));
        let dupes = find_duplicates(&records, &WhereClause::new());
        assert_eq!(dupes.len(), 1);
        assert!(dupes["X"].contains("a"));
    }

    #[test]
    fn numeric_and_string_ids_are_distinct() {
        let records = vec![
            json!({"type": "X", "id": 5}),
            json!({"type": "X", "id": "5"}),
        ];
        assert!(find_duplicates(&records, &WhereClause::new()).is_empty());

        let repeated = vec![json!({"type": "X", "id": 5}), json!({"type": "X", "id": 5})];
        let dupes = find_duplicates(&repeated, &WhereClause::new());
        assert!(dupes["X"].contains("5"));
    }

    #[test]
    fn container_symbols_are_canonical() {
        assert_eq!(value_symbol(&json!({"b": 1, "a": [2, "x"]})), r#"{"a":[2,"x"],"b":1}"#);
        assert_eq!(value_symbol(&json!(true)), "true");
        assert_eq!(value_symbol(&json!(null)), "null");
        assert_eq!(value_symbol(&json!("plain")), "plain");
    }
}
