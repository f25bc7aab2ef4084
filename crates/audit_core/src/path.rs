use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DottedPath {
    segments: Vec<String>,
}

impl DottedPath {
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        if text.is_empty() {
            return Err(CoreError::usage("key path must not be empty"));
        }
        let segments: Vec<String> = text.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(CoreError::usage(format!(
                "key path '{text}' has an empty segment"
            )));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Every value reachable through this path. Lists met along the way fan
    /// out: the rest of the path is applied to each element in order.
    pub fn resolve<'a>(&self, record: &'a Value) -> Vec<&'a Value> {
        let mut out = Vec::new();
        descend(record, &self.segments, &mut out);
        out
    }
}

fn descend<'a>(node: &'a Value, segments: &[String], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(node);
        return;
    };

    match node {
        Value::Object(map) => {
            if let Some(child) = map.get(head) {
                descend(child, rest, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                descend(item, segments, out);
            }
        }
        _ => {}
    }
}

impl FromStr for DottedPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
