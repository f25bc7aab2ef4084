use std::fs;
use std::path::Path;

use json_audit_core::{
    CoreErrorCode, DottedPath, Engine, LoadErrorKind, Session, WhereClause,
};
use serde_json::json;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create fixture directory");
    }
    fs::write(&path, contents).expect("failed to write fixture");
}

fn s1_tree() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "a.json",
        r#"[{"type":"X","id":"a"},{"type":"X","id":"b"}]"#,
    );
    write(dir.path(), "b.json", r#"[{"type":"Y","id":"a"}]"#);
    dir
}

fn open(dir: &TempDir) -> Session {
    Engine::new()
        .open_dir(dir.path())
        .expect("fixture tree should open")
}

fn filter(terms: &[&str]) -> WhereClause {
    WhereClause::parse(terms.iter().copied()).expect("valid filter")
}

#[test]
fn keys_count_every_top_level_key() {
    let dir = s1_tree();
    let session = open(&dir);
    let tally = session.count_keys(&WhereClause::new());

    assert_eq!(tally.matched, 3);
    assert_eq!(tally.counts.len(), 2);
    assert_eq!(tally.counts["type"], 3);
    assert_eq!(tally.counts["id"], 3);
}

#[test]
fn values_count_by_type() {
    let dir = s1_tree();
    let session = open(&dir);
    let key = DottedPath::parse("type").expect("path");
    let tally = session.count_values(&key, &WhereClause::new());

    assert_eq!(tally.counts["X"], 2);
    assert_eq!(tally.counts["Y"], 1);
    assert_eq!(tally.total(), 3);
}

#[test]
fn pluck_returns_first_match() {
    let dir = s1_tree();
    let session = open(&dir);
    let record = session
        .pluck_first(&filter(&["type=X", "id=b"]))
        .expect("record should match");

    assert_eq!(record, &json!({"type": "X", "id": "b"}));
    assert!(session.pluck_first(&filter(&["type=Z"])).is_none());
}

#[test]
fn duplicates_only_report_repeated_pairs() {
    let dir = s1_tree();
    let session = open(&dir);
    assert!(session.duplicates(&WhereClause::new()).is_empty());

    write(dir.path(), "c.json", r#"{"type":"X","id":"a"}"#);
    let session = open(&dir);
    let dupes = session.duplicates(&WhereClause::new());
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes["X"].iter().collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn split_on_fnmatch_subset() {
    let dir = s1_tree();
    write(
        dir.path(),
        "dreams.json",
        r#"[{"type":"dream","strength":2},{"type":"dream","strength":1}]"#,
    );
    let session = Engine::with_glob("dreams.json")
        .expect("glob")
        .open_dir(dir.path())
        .expect("tree");
    assert_eq!(session.len(), 2);

    let parts = session.split(&filter(&["type=dream", "strength=2"]));
    assert_eq!(parts.matched, vec![&json!({"type": "dream", "strength": 2})]);
    assert_eq!(parts.unmatched, vec![&json!({"type": "dream", "strength": 1})]);
}

#[test]
fn dotted_values_fan_out_through_pockets() {
    let session = Session::from_records(vec![json!({
        "type": "GENERIC",
        "id": "bag",
        "pocket_data": [{"pocket_type": "MAGAZINE"}, {"pocket_type": "CONTAINER"}]
    })]);
    let key = DottedPath::parse("pocket_data.pocket_type").expect("path");
    let tally = session.count_values(&key, &WhereClause::new());

    assert_eq!(tally.counts["MAGAZINE"], 1);
    assert_eq!(tally.counts["CONTAINER"], 1);
    assert_eq!(tally.matched, 1);
}

#[test]
fn loader_walks_nested_directories_in_lexical_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "b/z.json", r#"[{"id":"b-z"}]"#);
    write(dir.path(), "a.json", r#"[{"id":"a1"},{"id":"a2"}]"#);
    write(dir.path(), "b/a.json", r#"[{"id":"b-a"}]"#);
    write(dir.path(), "notes.txt", "not json at all");

    let session = open(&dir);
    let ids: Vec<&str> = session
        .records()
        .filter_map(|r| r["id"].as_str())
        .collect();

    assert_eq!(ids, vec!["a1", "a2", "b-a", "b-z"]);
    assert!(session.load_errors().is_empty());
    assert_eq!(session.files_read(), 3);
}

#[test]
fn load_errors_never_abort_the_stream() {
    let dir = s1_tree();
    write(dir.path(), "broken.json", "[{\"type\": ");
    write(dir.path(), "number.json", "7");

    let session = open(&dir);
    assert_eq!(session.len(), 3);

    let kinds: Vec<LoadErrorKind> = session.load_errors().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![LoadErrorKind::Parse, LoadErrorKind::Shape]);
    assert!(
        session.load_errors()[0]
            .to_string()
            .contains("broken.json: malformed JSON")
    );
}

#[test]
fn missing_root_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = Engine::new()
        .open_dir(dir.path().join("absent"))
        .expect_err("missing directory should fail");
    assert_eq!(err.code, CoreErrorCode::Io);
}

#[test]
fn repeated_loads_are_identical() {
    let dir = s1_tree();
    write(dir.path(), "sub/c.json", r#"[{"type":"Z","id":"c","flags":["A"]}]"#);

    let first: Vec<_> = open(&dir).records().cloned().collect();
    let second: Vec<_> = open(&dir).records().cloned().collect();
    assert_eq!(first, second);
}

#[test]
fn lister_projects_requested_keys() {
    let dir = s1_tree();
    let session = open(&dir);
    let keys = vec![DottedPath::parse("id").expect("path")];
    let rows = session.list(&keys, &filter(&["type=X"]));

    let ids: Vec<_> = rows.iter().map(|row| row["id"].clone()).collect();
    assert_eq!(ids, vec![json!("a"), json!("b")]);
}
