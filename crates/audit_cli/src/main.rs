use std::error::Error as _;
use std::path::PathBuf;
use std::process;

use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use json_audit_core::{
    DEFAULT_GLOB, DottedPath, Engine, Literal, LoadOptions, RepriceOptions, Session, WhereClause,
    parse_term,
};
use json_audit_render::{
    DEFAULT_WIDTH, OutputMode, WriterOptions, render_duplicates, render_list, render_load_errors,
    render_record, render_records, render_rows_human, render_tally,
};
use log::{LevelFilter, debug, info};
use serde_json::Value as JsonValue;

const EXIT_EMPTY: i32 = 1;
const EXIT_USAGE: i32 = 2;

type Term = (DottedPath, Literal);

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(
        short = 'd',
        long = "dir",
        value_name = "DIR",
        default_value = "data/json",
        global = true
    )]
    dir: PathBuf,
    #[arg(
        long,
        value_name = "GLOB",
        default_value = DEFAULT_GLOB,
        value_parser = parse_glob,
        global = true
    )]
    fnmatch: String,
    #[arg(long, global = true)]
    human: bool,
    #[arg(long, value_name = "COLS", default_value_t = DEFAULT_WIDTH, global = true)]
    width: usize,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Count top-level keys across matching records
    Keys {
        #[arg(long)]
        list: bool,
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
    /// Count the values found at a dotted key path
    #[command(visible_alias = "count-values")]
    Values {
        #[arg(short, long, value_name = "PATH", value_parser = parse_key_path)]
        key: DottedPath,
        #[arg(long)]
        list: bool,
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
    /// Print the first matching record, or all of them with --all
    Pluck {
        #[arg(long)]
        all: bool,
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
    /// Matching records to stdout, the rest to stderr
    #[command(visible_alias = "splitter")]
    Split {
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
    /// Print selected key paths of each matching record
    Lister {
        #[arg(
            short = 'k',
            long = "key",
            value_name = "PATH",
            value_parser = parse_key_path,
            default_values = ["type", "id"]
        )]
        keys: Vec<DottedPath>,
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
    /// Sorted distinct top-level keys of matching records
    ListKeys {
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
    /// Report (type, id) pairs defined more than once
    ListDuplicates {
        #[arg(long)]
        json: bool,
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
    /// Print matching records with their prices multiplied by FACTOR
    Reprice {
        #[arg(long = "factor", value_name = "FACTOR", value_parser = parse_factor)]
        price: RepriceOptions,
        #[arg(value_name = "KEY=VALUE", value_parser = parse_filter_term)]
        terms: Vec<Term>,
    },
}

impl Command {
    fn terms(&self) -> &[Term] {
        match self {
            Self::Keys { terms, .. }
            | Self::Values { terms, .. }
            | Self::Pluck { terms, .. }
            | Self::Split { terms }
            | Self::Lister { terms, .. }
            | Self::ListKeys { terms }
            | Self::ListDuplicates { terms, .. }
            | Self::Reprice { terms, .. } => terms,
        }
    }
}

fn main() {
    let cli = parse_cli();
    init_logging(cli.verbose, cli.quiet);

    let engine = Engine::with_glob(&cli.fnmatch)
        .unwrap_or_else(|e| exit_with(EXIT_USAGE, &format!("Error: {}", e.message)));
    let filter: WhereClause = cli.command.terms().iter().cloned().collect();
    let mode = if cli.human {
        OutputMode::Human
    } else {
        OutputMode::Json
    };
    let writer = WriterOptions {
        width: cli.width,
        ..WriterOptions::default()
    };

    let session = engine.open_dir(&cli.dir).unwrap_or_else(|e| {
        exit_with(
            EXIT_EMPTY,
            &format!("Error reading {}: {}", cli.dir.display(), e.message),
        )
    });
    let split = matches!(cli.command, Command::Split { .. });
    if split && !session.is_empty() {
        // stderr carries the unmatched array
        for error in session.load_errors() {
            info!("skipped {error}");
        }
    } else if !session.load_errors().is_empty() {
        eprintln!("{}", render_load_errors(session.load_errors()));
    }
    if session.is_empty() {
        exit_with(
            EXIT_EMPTY,
            &format!("Error: no records loaded from {}", cli.dir.display()),
        );
    }
    debug!("filter: {:?}", filter.groups());

    let code = match &cli.command {
        Command::Keys { list, .. } => run_keys(&session, &filter, *list, mode),
        Command::Values { key, list, .. } => run_values(&session, key, &filter, *list, mode),
        Command::Pluck { all, .. } => run_pluck(&session, &filter, *all, &writer),
        Command::Split { .. } => run_split(&session, &filter, &writer),
        Command::Lister { keys, .. } => run_lister(&session, keys, &filter, mode, &writer),
        Command::ListKeys { .. } => run_list_keys(&session, &filter, mode),
        Command::ListDuplicates { json, .. } => run_list_duplicates(&session, &filter, *json),
        Command::Reprice { price, .. } => run_reprice(&session, &filter, price, &writer),
    };
    process::exit(code);
}

/// Like `Cli::parse`, but rejected values are reported with the usage line.
fn parse_cli() -> Cli {
    Cli::try_parse().unwrap_or_else(|err| {
        if err.kind() != ErrorKind::ValueValidation {
            err.exit();
        }
        let reason = err
            .source()
            .map(ToString::to_string)
            .unwrap_or_else(|| err.kind().to_string());
        Cli::command()
            .error(ErrorKind::ValueValidation, reason)
            .exit()
    })
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .init();
}

fn parse_filter_term(value: &str) -> Result<Term, String> {
    parse_term(value).map_err(|e| e.message)
}

fn parse_key_path(value: &str) -> Result<DottedPath, String> {
    DottedPath::parse(value).map_err(|e| format!("invalid key path '{value}': {}", e.message))
}

fn parse_factor(value: &str) -> Result<RepriceOptions, String> {
    let factor: f64 = value
        .parse()
        .map_err(|_| format!("invalid factor '{value}', expected a number"))?;
    RepriceOptions::new(factor).map_err(|e| e.message)
}

fn parse_glob(value: &str) -> Result<String, String> {
    let options = LoadOptions {
        glob: value.to_string(),
    };
    options
        .matcher()
        .map(|_| options.glob)
        .map_err(|e| e.message)
}

fn exit_with(code: i32, message: &str) -> ! {
    eprintln!("{message}");
    process::exit(code);
}

fn nothing_matched() -> i32 {
    eprintln!("Nothing matched.");
    EXIT_EMPTY
}

// ---------------------------------------------------------------------------
// Aggregators
// ---------------------------------------------------------------------------

fn run_keys(session: &Session, filter: &WhereClause, list: bool, mode: OutputMode) -> i32 {
    let tally = session.count_keys(filter);
    info!(
        "{} of {} records matched, {} distinct keys",
        tally.matched,
        session.len(),
        tally.counts.len()
    );
    if tally.is_empty() {
        return nothing_matched();
    }

    if list {
        println!("{}", render_list(tally.symbols(), mode));
    } else {
        print!(
            "{}",
            with_newline(render_tally("Count of keys", &tally, session.len(), mode))
        );
    }
    0
}

fn run_values(
    session: &Session,
    key: &DottedPath,
    filter: &WhereClause,
    list: bool,
    mode: OutputMode,
) -> i32 {
    let tally = session.count_values(&key, filter);
    info!(
        "{} of {} records had a value for {key}",
        tally.matched,
        session.len()
    );
    if tally.is_empty() {
        return nothing_matched();
    }

    if list {
        println!("{}", render_list(tally.symbols(), mode));
    } else {
        let title = format!("Count of values from field '{key}'");
        print!(
            "{}",
            with_newline(render_tally(&title, &tally, session.len(), mode))
        );
    }
    0
}

fn run_list_keys(session: &Session, filter: &WhereClause, mode: OutputMode) -> i32 {
    let keys = session.distinct_keys(filter);
    if keys.is_empty() {
        return nothing_matched();
    }
    println!("{}", render_list(keys.iter().map(String::as_str), mode));
    0
}

fn run_list_duplicates(session: &Session, filter: &WhereClause, json: bool) -> i32 {
    let duplicates = session.duplicates(filter);
    if duplicates.is_empty() {
        info!("no duplicate (type, id) pairs among {} records", session.len());
        return 0;
    }

    for record in session.sourced_records() {
        let kind = record.value.get("type").and_then(JsonValue::as_str);
        let id = record.value.get("id").and_then(JsonValue::as_str);
        if let (Some(kind), Some(id)) = (kind, id) {
            if duplicates.get(kind).is_some_and(|ids| ids.contains(id)) {
                info!("{kind} {id} defined in {}", record.path.display());
            }
        }
    }

    let mode = if json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    println!("{}", render_duplicates(&duplicates, mode));
    0
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

fn run_pluck(session: &Session, filter: &WhereClause, all: bool, writer: &WriterOptions) -> i32 {
    if all {
        let records = session.pluck_all(filter);
        if records.is_empty() {
            return nothing_matched();
        }
        println!("{}", render_records(records, writer));
        return 0;
    }

    match session.pluck_first(filter) {
        Some(record) => {
            println!("{}", render_record(record, writer));
            0
        }
        None => nothing_matched(),
    }
}

fn run_split(session: &Session, filter: &WhereClause, writer: &WriterOptions) -> i32 {
    let parts = session.split(filter);
    info!(
        "{} matched, {} unmatched",
        parts.matched.len(),
        parts.unmatched.len()
    );
    println!("{}", render_records(parts.matched, writer));
    eprintln!("{}", render_records(parts.unmatched, writer));
    0
}

fn run_lister(
    session: &Session,
    keys: &[DottedPath],
    filter: &WhereClause,
    mode: OutputMode,
    writer: &WriterOptions,
) -> i32 {
    let rows = session.list(keys, filter);
    if rows.is_empty() {
        return nothing_matched();
    }

    match mode {
        OutputMode::Human => println!("{}", render_rows_human(&rows, keys)),
        OutputMode::Json => {
            let values: Vec<JsonValue> = rows.into_iter().map(JsonValue::Object).collect();
            println!("{}", render_records(&values, writer));
        }
    }
    0
}

fn run_reprice(
    session: &Session,
    filter: &WhereClause,
    options: &RepriceOptions,
    writer: &WriterOptions,
) -> i32 {
    let repriced = session.reprice(filter, options);
    for skipped in &repriced.skipped {
        eprintln!("Skipped {}", skipped.message);
    }
    if repriced.records.is_empty() {
        return nothing_matched();
    }
    println!("{}", render_records(&repriced.records, writer));
    0
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
