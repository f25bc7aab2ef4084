use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::GlobMatcher;
use log::info;
use serde_json::{Map, Value};

use crate::aggregate::{self, Duplicates, Tally};
use crate::error::{CoreError, CoreErrorCode};
use crate::loader::{self, LoadError, LoadOptions, SourcedRecord, Stream};
use crate::path::DottedPath;
use crate::predicate::WhereClause;
use crate::project::{self, Split};
use crate::reprice::{self, RepriceOptions, Repriced};

#[derive(Debug, Clone)]
pub struct Engine {
    options: LoadOptions,
    matcher: GlobMatcher,
}

#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    stream: Stream,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(LoadOptions::default())
            .unwrap_or_else(|e| unreachable!("default glob must compile: {e}"))
    }

    pub fn with_options(options: LoadOptions) -> Result<Self, CoreError> {
        let matcher = options.matcher()?;
        Ok(Self { options, matcher })
    }

    pub fn with_glob(glob: &str) -> Result<Self, CoreError> {
        Self::with_options(LoadOptions {
            glob: glob.to_string(),
        })
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn open_dir<P: AsRef<Path>>(&self, root: P) -> Result<Session, CoreError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CoreError::new(
                CoreErrorCode::Io,
                format!("{} is not a readable directory", root.display()),
            ));
        }

        let stream = loader::load(root, &self.matcher);
        info!(
            "{}: {} records, {} load errors (glob {})",
            root.display(),
            stream.len(),
            stream.errors.len(),
            self.options.glob
        );
        Ok(Session {
            root: root.to_path_buf(),
            stream,
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn from_records(records: Vec<Value>) -> Self {
        Self {
            root: PathBuf::new(),
            stream: Stream {
                records: records
                    .into_iter()
                    .map(|value| SourcedRecord {
                        path: PathBuf::new(),
                        value,
                    })
                    .collect(),
                ..Stream::default()
            },
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    pub fn files_read(&self) -> usize {
        self.stream.files_read
    }

    pub fn records(&self) -> impl Iterator<Item = &Value> {
        self.stream.values()
    }

    pub fn sourced_records(&self) -> &[SourcedRecord] {
        &self.stream.records
    }

    pub fn load_errors(&self) -> &[LoadError] {
        &self.stream.errors
    }

    pub fn count_keys(&self, filter: &WhereClause) -> Tally {
        aggregate::count_keys(self.records(), filter)
    }

    pub fn count_values(&self, key: &DottedPath, filter: &WhereClause) -> Tally {
        aggregate::count_values(self.records(), key, filter)
    }

    pub fn distinct_keys(&self, filter: &WhereClause) -> BTreeSet<String> {
        aggregate::distinct_keys(self.records(), filter)
    }

    pub fn duplicates(&self, filter: &WhereClause) -> Duplicates {
        aggregate::find_duplicates(self.records(), filter)
    }

    pub fn pluck_first(&self, filter: &WhereClause) -> Option<&Value> {
        project::pluck_first(self.records(), filter)
    }

    pub fn pluck_all(&self, filter: &WhereClause) -> Vec<&Value> {
        project::pluck_all(self.records(), filter)
    }

    pub fn split(&self, filter: &WhereClause) -> Split<'_> {
        project::split(self.records(), filter)
    }

    pub fn list(&self, keys: &[DottedPath], filter: &WhereClause) -> Vec<Map<String, Value>> {
        self.records()
            .filter(|record| filter.matches(record))
            .filter_map(|record| project::project(record, keys))
            .collect()
    }

    pub fn reprice(&self, filter: &WhereClause, options: &RepriceOptions) -> Repriced {
        reprice::reprice(self.records(), filter, options)
    }
}
