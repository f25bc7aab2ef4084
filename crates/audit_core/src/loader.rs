use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use log::{debug, trace};
use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use crate::error::CoreError;

pub const DEFAULT_GLOB: &str = "*.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub glob: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            glob: DEFAULT_GLOB.to_string(),
        }
    }
}

impl LoadOptions {
    pub fn matcher(&self) -> Result<GlobMatcher, CoreError> {
        Glob::new(&self.glob)
            .map(|glob| glob.compile_matcher())
            .map_err(|e| CoreError::usage(format!("invalid file glob '{}': {e}", self.glob)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadErrorKind {
    Io,
    Parse,
    Shape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadError {
    pub path: PathBuf,
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadError {
    fn new(path: &Path, kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRecord {
    pub path: PathBuf,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Stream {
    pub records: Vec<SourcedRecord>,
    pub errors: Vec<LoadError>,
    pub files_read: usize,
}

impl Stream {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.records.iter().map(|record| &record.value)
    }
}

/// Walks `root` in lexical order and loads every file whose name matches
/// `matcher`. Failures are collected into [`Stream::errors`]; nothing here
/// aborts the walk.
pub fn load(root: &Path, matcher: &GlobMatcher) -> Stream {
    let mut stream = Stream::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                stream
                    .errors
                    .push(LoadError::new(&path, LoadErrorKind::Io, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !matcher.is_match(entry.file_name()) {
            continue;
        }

        load_file(entry.path(), &mut stream);
    }

    debug!(
        "loaded {} records from {} files under {} ({} load errors)",
        stream.records.len(),
        stream.files_read,
        root.display(),
        stream.errors.len()
    );
    stream
}

fn load_file(path: &Path, stream: &mut Stream) {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            stream
                .errors
                .push(LoadError::new(path, LoadErrorKind::Io, e.to_string()));
            return;
        }
    };
    stream.files_read += 1;

    let parsed: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            stream.errors.push(LoadError::new(
                path,
                LoadErrorKind::Parse,
                format!("malformed JSON: {e}"),
            ));
            return;
        }
    };

    match parsed {
        Value::Array(items) => {
            trace!("{}: {} top-level elements", path.display(), items.len());
            for (index, item) in items.into_iter().enumerate() {
                if item.is_object() {
                    stream.records.push(SourcedRecord {
                        path: path.to_path_buf(),
                        value: item,
                    });
                } else {
                    stream.errors.push(LoadError::new(
                        path,
                        LoadErrorKind::Shape,
                        format!("element {index} is {}, expected an object", shape_name(&item)),
                    ));
                }
            }
        }
        Value::Object(_) => stream.records.push(SourcedRecord {
            path: path.to_path_buf(),
            value: parsed,
        }),
        other => stream.errors.push(LoadError::new(
            path,
            LoadErrorKind::Shape,
            format!(
                "top-level value is {}, expected an object or an array of objects",
                shape_name(&other)
            ),
        )),
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{LoadErrorKind, LoadOptions, load};

    #[test]
    fn skips_non_object_elements_but_keeps_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("mixed.json"), r#"[{"id":"a"}, 3, {"id":"b"}]"#)
            .expect("write fixture");

        let matcher = LoadOptions::default().matcher().expect("default glob");
        let stream = load(dir.path(), &matcher);

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.errors.len(), 1);
        assert_eq!(stream.errors[0].kind, LoadErrorKind::Shape);
        assert!(stream.errors[0].message.contains("element 1"));
    }

    #[test]
    fn scalar_top_level_is_a_shape_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("scalar.json"), "42").expect("write fixture");

        let matcher = LoadOptions::default().matcher().expect("default glob");
        let stream = load(dir.path(), &matcher);

        assert!(stream.is_empty());
        assert_eq!(stream.files_read, 1);
        assert_eq!(stream.errors[0].kind, LoadErrorKind::Shape);
    }

    #[test]
    fn invalid_glob_is_a_usage_error() {
        let options = LoadOptions {
            glob: "[".to_string(),
        };
        let err = options.matcher().expect_err("unterminated class should fail");
        assert_eq!(err.code, crate::CoreErrorCode::Usage);
    }
}
