//! Error types for season record parsing and compilation

use std::path::PathBuf;

use thiserror::Error;

/// Result type for operations that build a single season record
pub type Result<T> = std::result::Result<T, RecordError>;

/// Failures raised while opening a workbook or reading its tables
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("failed to read table `{table}`: {reason}")]
    Table { table: String, reason: String },

    #[error("unsupported workbook format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Fatal per-file errors. Any of these means the file produces no record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The filename carries no recognizable season and year token
    #[error("no season and year found in filename `{filename}`")]
    FilenameParse { filename: String },

    /// Neither the record stats nor the filename identify the season
    #[error("could not resolve record season: {0}")]
    VersionUnresolvable(String),

    /// The record stats or show roster table is absent
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),

    /// Worksheets only, as in legacy `.xls` records. Roster and weeks are
    /// read from table objects.
    #[error("{} has no table objects; save it as .xlsx with its tables intact", .0.display())]
    NoTableObjects(PathBuf),

    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}

/// Non-fatal problems. The offending row or table is left out of the
/// record and the warning is kept on the record for reporting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseWarning {
    #[error("unknown table `{table}`")]
    UnknownTable { table: String },

    #[error("table `{table}` duplicates an earlier table for week {week}")]
    DuplicateWeekTable { table: String, week: u32 },

    #[error("{table} row {row}: no show matches {identity}")]
    UnknownShowReference {
        table: String,
        row: usize,
        identity: String,
    },

    #[error("{table} row {row}: no value in key column `{column}`")]
    MissingShowKey {
        table: String,
        row: usize,
        column: &'static str,
    },

    #[error("{table} row {row}: show key {key} already used by an earlier row")]
    DuplicateShowKey {
        table: String,
        row: usize,
        key: String,
    },

    #[error("week {week}: rank {rank} is shared by {count} episodes")]
    DuplicateRank { week: u32, rank: u32, count: usize },

    #[error("{table} row {row}: `{column}` holds unusable value `{value}`")]
    InvalidCell {
        table: String,
        row: usize,
        column: String,
        value: String,
    },
}

/// Warnings collected while building one record. Each warning is logged as
/// it is recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warnings(Vec<ParseWarning>);

impl Warnings {
    pub fn push(&mut self, warning: ParseWarning) {
        tracing::warn!(%warning, "Record parse warning");
        self.0.push(warning);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseWarning> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ParseWarning> {
        self.0
    }
}

/// Errors surfaced by the normalization engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankingError {
    /// Every ranked episode of the week holds the same rank
    #[error("week {week} has no rank spread: every ranked episode holds rank {rank}")]
    DivisionByZero { week: u32, rank: u32 },

    #[error("episode of `{show}` in week {week} has no rank")]
    Unranked { week: u32, show: String },

    #[error("week {0} is not part of this record")]
    UnknownWeek(u32),
}

/// Errors that stop a whole compile run (as opposed to skipping one file)
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("not a directory: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
