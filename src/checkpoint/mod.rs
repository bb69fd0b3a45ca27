//! Append-only CSV checkpoints and resume filtering.
//!
//! Every stage output doubles as its resume state: a run reads the natural-key
//! column of the existing output, drops input rows whose key is already there,
//! and appends new records in batches.

pub mod batch;
pub mod store;
pub mod table;

pub use self::batch::BatchWriter;
pub use self::store::{resume_filter, CheckpointLog};
pub use self::table::{CsvTable, TableRow};

/// A record that can be appended to a checkpoint file
pub trait CsvRecord {
    /// Fixed column header, in row order
    const HEADER: &'static [&'static str];
    /// Column holding the natural key used for resume
    const KEY_COLUMN: &'static str;

    fn key(&self) -> &str;

    fn to_row(&self) -> Vec<String>;
}
