pub mod aggregate;
pub mod engine;
pub mod error;
pub mod loader;
pub mod path;
pub mod predicate;
pub mod project;
pub mod reprice;

pub use aggregate::{Duplicates, Tally};
pub use engine::{Engine, Session};
pub use error::{CoreError, CoreErrorCode};
pub use loader::{DEFAULT_GLOB, LoadError, LoadErrorKind, LoadOptions, SourcedRecord, Stream};
pub use path::DottedPath;
pub use predicate::{Literal, WhereClause, WhereGroup, parse_term};
pub use project::Split;
pub use reprice::{Price, RepriceOptions, Repriced};
