mod report;
mod writer;

pub use report::{
    OutputMode, render_duplicates, render_list, render_load_errors, render_rows_human,
    render_tally, render_tally_human, render_tally_json,
};
pub use writer::{
    DEFAULT_INDENT, DEFAULT_WIDTH, PRIORITY_KEYS, WriterOptions, ordered_entries, render_record,
    render_records,
};
