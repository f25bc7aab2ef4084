use std::fmt;

use serde_json::Value;

use crate::error::CoreError;
use crate::path::DottedPath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Literal {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }

        let digits = raw.strip_prefix('-').unwrap_or(raw);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return Self::Int(n);
            }
        }
        Self::Str(raw.to_string())
    }

    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Bool(expected), Value::Bool(actual)) => expected == actual,
            (Self::Int(expected), Value::Number(actual)) => {
                actual.as_i64() == Some(*expected)
                    || (actual.is_f64() && actual.as_f64() == Some(*expected as f64))
            }
            (Self::Str(expected), Value::String(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereGroup {
    pub path: DottedPath,
    pub alternatives: Vec<Literal>,
}

impl WhereGroup {
    pub fn matches(&self, record: &Value) -> bool {
        self.path.resolve(record).into_iter().any(|value| match value {
            Value::Array(items) => items.iter().any(|item| self.accepts(item)),
            scalar => self.accepts(scalar),
        })
    }

    fn accepts(&self, value: &Value) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(value))
    }
}

/// Conjunction of per-key disjunctions. Repeating a key adds an alternative
/// to that key's group instead of a new condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause {
    groups: Vec<WhereGroup>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<I, S>(terms: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut clause = Self::new();
        for term in terms {
            let (path, literal) = parse_term(term.as_ref())?;
            clause.push(path, literal);
        }
        Ok(clause)
    }

    pub fn push(&mut self, path: DottedPath, literal: Literal) {
        match self.groups.iter_mut().find(|group| group.path == path) {
            Some(group) => group.alternatives.push(literal),
            None => self.groups.push(WhereGroup {
                path,
                alternatives: vec![literal],
            }),
        }
    }

    pub fn groups(&self) -> &[WhereGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches(&self, record: &Value) -> bool {
        self.groups.iter().all(|group| group.matches(record))
    }
}

impl FromIterator<(DottedPath, Literal)> for WhereClause {
    fn from_iter<I: IntoIterator<Item = (DottedPath, Literal)>>(terms: I) -> Self {
        let mut clause = Self::new();
        for (path, literal) in terms {
            clause.push(path, literal);
        }
        clause
    }
}

pub fn parse_term(term: &str) -> Result<(DottedPath, Literal), CoreError> {
    let Some((key, value)) = term.split_once('=') else {
        return Err(CoreError::usage(format!(
            "invalid filter '{term}', expected KEY=VALUE"
        )));
    };
    let path = DottedPath::parse(key)
        .map_err(|e| CoreError::usage(format!("invalid filter '{term}': {}", e.message)))?;
    Ok((path, Literal::parse(value)))
}
