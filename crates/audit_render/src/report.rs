use std::fmt::Write as _;

use json_audit_core::{DottedPath, Duplicates, LoadError, Tally};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Json,
    Human,
}

/// `{symbol: count}` with symbols in ascending order.
pub fn render_tally_json(tally: &Tally) -> String {
    let mut out = Map::new();
    for (symbol, count) in &tally.counts {
        out.insert(symbol.clone(), Value::from(*count));
    }
    format!("{:#}", Value::Object(out))
}

pub fn render_tally_human(title: &str, tally: &Tally, total_records: usize) -> String {
    let subtitle = format!(
        "(Data from {} out of {} blobs)",
        tally.matched, total_records
    );
    let rule_width = title.chars().count().max(subtitle.chars().count());
    let rows = tally.ranked();
    let count_width = rows
        .iter()
        .map(|(_, count)| count.to_string().len())
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    writeln!(&mut out, "{title}").expect("writing to String cannot fail");
    writeln!(&mut out, "{subtitle}").expect("writing to String cannot fail");
    writeln!(&mut out, "{}", "-".repeat(rule_width)).expect("writing to String cannot fail");
    for (symbol, count) in rows {
        writeln!(&mut out, "{count:>count_width$}  {symbol}")
            .expect("writing to String cannot fail");
    }
    out
}

pub fn render_tally(title: &str, tally: &Tally, total_records: usize, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => render_tally_json(tally),
        OutputMode::Human => render_tally_human(title, tally, total_records),
    }
}

/// A sorted symbol list: JSON array, or one per line in human mode.
pub fn render_list<'a, I>(items: I, mode: OutputMode) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut items: Vec<&str> = items.into_iter().collect();
    items.sort_unstable();
    items.dedup();
    match mode {
        OutputMode::Json => format!(
            "{:#}",
            Value::Array(items.into_iter().map(Value::from).collect())
        ),
        OutputMode::Human => items.join("\n"),
    }
}

pub fn render_duplicates(duplicates: &Duplicates, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => {
            let mut out = Map::new();
            for (kind, ids) in duplicates {
                out.insert(
                    kind.clone(),
                    Value::Array(ids.iter().map(|id| Value::from(id.as_str())).collect()),
                );
            }
            format!("{:#}", Value::Object(out))
        }
        OutputMode::Human => {
            let mut lines = Vec::new();
            for (kind, ids) in duplicates {
                for id in ids {
                    lines.push(format!("{kind} {id}"));
                }
            }
            lines.join("\n")
        }
    }
}

/// Tab-separated projection rows, columns in `keys` order. Absent keys leave
/// an empty cell.
pub fn render_rows_human(rows: &[Map<String, Value>], keys: &[DottedPath]) -> String {
    let names: Vec<String> = keys.iter().map(DottedPath::to_string).collect();
    rows.iter()
        .map(|row| {
            names
                .iter()
                .map(|name| row.get(name).map(cell_text).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

pub fn render_load_errors(errors: &[LoadError]) -> String {
    let mut lines: Vec<String> = errors.iter().map(LoadError::to_string).collect();
    lines.sort();
    lines.join("\n")
}
