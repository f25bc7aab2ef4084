use serde_json::{Map, Value};

pub const DEFAULT_WIDTH: usize = 120;
pub const DEFAULT_INDENT: usize = 2;

/// Keys written ahead of all others, in this order, whenever present.
pub const PRIORITY_KEYS: [&str; 5] = ["type", "id", "copy-from", "abstract", "name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub width: usize,
    pub indent: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            indent: DEFAULT_INDENT,
        }
    }
}

pub fn render_record(record: &Value, options: &WriterOptions) -> String {
    let mut writer = Writer::new(options);
    writer.value(record, 0, 0);
    writer.out
}

/// Lays records out the way data files are stored: one array, each record
/// one indent level in.
pub fn render_records<'a, I>(records: I, options: &WriterOptions) -> String
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut writer = Writer::new(options);
    let mut records = records.into_iter().peekable();
    if records.peek().is_none() {
        writer.out.push_str("[ ]");
        return writer.out;
    }

    writer.out.push_str("[\n");
    while let Some(record) = records.next() {
        let comma = records.peek().is_some();
        writer.pad(1);
        writer.value(record, 1, options.indent + usize::from(comma));
        if comma {
            writer.out.push(',');
        }
        writer.out.push('\n');
    }
    writer.out.push(']');
    writer.out
}

pub fn ordered_entries(map: &Map<String, Value>) -> Vec<(&str, &Value)> {
    let mut entries = Vec::with_capacity(map.len());
    for key in PRIORITY_KEYS {
        if let Some(value) = map.get(key) {
            entries.push((key, value));
        }
    }
    entries.extend(
        map.iter()
            .map(|(k, v)| (k.as_str(), v))
            .filter(|(k, _)| !PRIORITY_KEYS.contains(k)),
    );
    entries
}

struct Writer<'o> {
    options: &'o WriterOptions,
    out: String,
}

impl<'o> Writer<'o> {
    fn new(options: &'o WriterOptions) -> Self {
        Self {
            options,
            out: String::new(),
        }
    }

    fn pad(&mut self, depth: usize) {
        for _ in 0..depth * self.options.indent {
            self.out.push(' ');
        }
    }

    /// `column` already counts a trailing comma when one follows `text`.
    fn fits(&self, column: usize, text: &str) -> bool {
        column + text.chars().count() <= self.options.width
    }

    fn value(&mut self, value: &Value, depth: usize, column: usize) {
        if is_empty_container(value) {
            self.out.push_str(&inline(value));
            return;
        }
        match value {
            Value::Object(map) => {
                if !map.values().any(holds_object) {
                    let line = inline(value);
                    if self.fits(column, &line) {
                        self.out.push_str(&line);
                        return;
                    }
                }
                self.object_block(map, depth);
            }
            Value::Array(items) => {
                if !items.iter().any(holds_object) {
                    let line = inline(value);
                    if self.fits(column, &line) {
                        self.out.push_str(&line);
                        return;
                    }
                }
                self.array_block(items, depth);
            }
            scalar => self.out.push_str(&scalar.to_string()),
        }
    }

    fn object_block(&mut self, map: &Map<String, Value>, depth: usize) {
        self.out.push_str("{\n");
        let entries = ordered_entries(map);
        let last = entries.len().saturating_sub(1);
        for (i, (key, child)) in entries.into_iter().enumerate() {
            self.pad(depth + 1);
            let label = format!("{}: ", quote(key));
            let column = (depth + 1) * self.options.indent
                + label.chars().count()
                + usize::from(i != last);
            self.out.push_str(&label);
            self.value(child, depth + 1, column);
            if i != last {
                self.out.push(',');
            }
            self.out.push('\n');
        }
        self.pad(depth);
        self.out.push('}');
    }

    fn array_block(&mut self, items: &[Value], depth: usize) {
        self.out.push_str("[\n");
        let last = items.len().saturating_sub(1);
        for (i, item) in items.iter().enumerate() {
            self.pad(depth + 1);
            let column = (depth + 1) * self.options.indent + usize::from(i != last);
            self.value(item, depth + 1, column);
            if i != last {
                self.out.push(',');
            }
            self.out.push('\n');
        }
        self.pad(depth);
        self.out.push(']');
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn holds_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(holds_object),
        _ => false,
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::Object(map) if map.is_empty() => "{ }".to_string(),
        Value::Array(items) if items.is_empty() => "[ ]".to_string(),
        Value::Object(map) => {
            let parts: Vec<String> = ordered_entries(map)
                .into_iter()
                .map(|(k, v)| format!("{}: {}", quote(k), inline(v)))
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(inline).collect();
            format!("[ {} ]", parts.join(", "))
        }
        scalar => scalar.to_string(),
    }
}

fn quote(key: &str) -> String {
    Value::from(key).to_string()
}
