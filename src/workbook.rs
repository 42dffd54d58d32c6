//! Workbook access
//!
//! A workbook is seen as a set of named tables (header row plus data rows)
//! and raw worksheets. Record parsing only talks to [`TableSource`]; the
//! calamine reader and the in-memory workbook are the two implementations.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Xls, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::WorkbookError;

/// A raw worksheet: rows of cells starting at A1
pub type Grid = Vec<Vec<CellValue>>;

/// A single typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    Error(String),
}

impl CellValue {
    /// True for empty cells and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed, non-empty text form of the value
    pub fn as_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        match self {
            CellValue::Text(text) => Some(text.trim().to_string()),
            CellValue::Error(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(value) => Some(*value),
            CellValue::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(*value as i64)
            }
            CellValue::Text(text) => {
                let text = text.trim();
                text.parse::<i64>().ok().or_else(|| {
                    text.parse::<f64>()
                        .ok()
                        .filter(|value| value.fract() == 0.0 && value.is_finite())
                        .map(|value| value as i64)
                })
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(value) => Some(*value as f64),
            CellValue::Float(value) if value.is_finite() => Some(*value),
            CellValue::Text(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Spreadsheet truthiness. Blank cells are `None`, not `false`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(value) => Some(*value),
            CellValue::Int(value) => Some(*value != 0),
            CellValue::Float(value) => Some(*value != 0.0),
            CellValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "" => None,
                "true" | "yes" | "y" | "x" | "1" => Some(true),
                "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(value) => Some(*value),
            CellValue::Text(text) => parse_datetime_text(text.trim()),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(value) => write!(f, "{}", if *value { "TRUE" } else { "FALSE" }),
            CellValue::Int(value) => write!(f, "{value}"),
            CellValue::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            CellValue::Float(value) => write!(f, "{value}"),
            CellValue::Text(value) => f.write_str(value),
            CellValue::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Error(value) => f.write_str(value),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Header normalization shared by every table: case-folded, spaces removed
pub fn normalize_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// One data row of a table, keyed by normalized header
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    index: usize,
    cells: Vec<(String, CellValue)>,
}

impl Row {
    /// 1-based position of the row among the table's data rows
    pub fn index(&self) -> usize {
        self.index
    }

    /// `None` when the table has no such column, `Some(Empty)` when the
    /// column exists but the cell is blank.
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        let key = normalize_key(key);
        self.cells
            .iter()
            .find(|(column, _)| *column == key)
            .map(|(_, value)| value)
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// First of `keys` that exists as a column, with its value
    pub fn first_present<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, &CellValue)> {
        keys.iter()
            .find_map(|key| self.get(key).map(|value| (*key, value)))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(column, _)| column.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| value.is_blank())
    }
}

/// A named table: a header row plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    sheet: String,
    headers: Vec<String>,
    data: Grid,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        sheet: impl Into<String>,
        headers: Vec<String>,
        data: Grid,
    ) -> Self {
        Self {
            name: name.into(),
            sheet: sheet.into(),
            headers,
            data,
        }
    }

    /// Convenience constructor for tables whose worksheet shares their name
    pub fn build(name: &str, headers: &[&str], data: Grid) -> Self {
        Self::new(
            name,
            name,
            headers.iter().map(|header| header.to_string()).collect(),
            data,
        )
    }

    /// Carve a table out of a raw worksheet grid.
    ///
    /// The row at `header_row` supplies the headers, stopping at the first
    /// blank header cell. Data rows follow until the first fully blank row.
    pub fn from_grid(
        name: impl Into<String>,
        sheet: impl Into<String>,
        grid: &[Vec<CellValue>],
        header_row: usize,
    ) -> Option<Self> {
        let header_cells = grid.get(header_row)?;
        let headers: Vec<String> = header_cells
            .iter()
            .map_while(|cell| cell.as_text())
            .collect();
        if headers.is_empty() {
            return None;
        }

        let width = headers.len();
        let data = grid[header_row + 1..]
            .iter()
            .map(|row| {
                (0..width)
                    .map(|col| row.get(col).cloned().unwrap_or(CellValue::Empty))
                    .collect::<Vec<_>>()
            })
            .take_while(|row| !row.iter().all(CellValue::is_blank))
            .collect();

        Some(Self::new(name, sheet, headers, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Data rows keyed by normalized header
    pub fn rows(&self) -> Vec<Row> {
        let keys: Vec<String> = self.headers.iter().map(|h| normalize_key(h)).collect();
        self.data
            .iter()
            .enumerate()
            .map(|(position, cells)| Row {
                index: position + 1,
                cells: keys
                    .iter()
                    .enumerate()
                    .map(|(col, key)| {
                        (key.clone(), cells.get(col).cloned().unwrap_or(CellValue::Empty))
                    })
                    .collect(),
            })
            .collect()
    }
}

/// The workbook capability consumed by the record builder
pub trait TableSource {
    /// File the workbook was read from
    fn path(&self) -> &Path;

    /// Every named table, keyed by table display name
    fn tables(&self) -> &BTreeMap<String, Table>;

    /// Raw cells of a worksheet, for blocks that are not table objects
    fn worksheet(&mut self, name: &str) -> Option<Grid>;

    /// Release the underlying file
    fn close(self: Box<Self>);
}

/// Opens workbooks by path
pub trait WorkbookOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn TableSource>, WorkbookError>;
}

enum Book {
    Xlsx(Xlsx<BufReader<File>>),
    Xls(Xls<BufReader<File>>),
}

/// Workbook backed by calamine. Tables are read eagerly on open; the file
/// handle stays open for worksheet access until [`TableSource::close`].
pub struct CalamineWorkbook {
    path: PathBuf,
    book: Book,
    tables: BTreeMap<String, Table>,
}

impl CalamineWorkbook {
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let open_error = |reason: String| WorkbookError::Open {
            path: path.to_path_buf(),
            reason,
        };

        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => {
                let mut book: Xlsx<BufReader<File>> =
                    open_workbook(path).map_err(|err: calamine::XlsxError| open_error(err.to_string()))?;
                book.load_tables()
                    .map_err(|err| open_error(err.to_string()))?;

                let names: Vec<String> = book.table_names().into_iter().cloned().collect();
                let mut tables = BTreeMap::new();
                for name in names {
                    let table = book.table_by_name(&name).map_err(|err| WorkbookError::Table {
                        table: name.clone(),
                        reason: err.to_string(),
                    })?;
                    let converted =
                        convert_table(table.name(), table.sheet_name(), table.columns(), table.data());
                    tables.insert(name, converted);
                }
                tracing::debug!(path = %path.display(), tables = tables.len(), "Workbook opened");

                Ok(Self {
                    path: path.to_path_buf(),
                    book: Book::Xlsx(book),
                    tables,
                })
            }
            Some("xls") => {
                // Legacy binary workbooks carry no table objects
                let book: Xls<BufReader<File>> = open_workbook(path).map_err(|err: calamine::XlsError| open_error(err.to_string()))?;
                tracing::debug!(path = %path.display(), "Legacy workbook opened without tables");
                Ok(Self {
                    path: path.to_path_buf(),
                    book: Book::Xls(book),
                    tables: BTreeMap::new(),
                })
            }
            _ => Err(WorkbookError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl TableSource for CalamineWorkbook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    fn worksheet(&mut self, name: &str) -> Option<Grid> {
        let range = match &mut self.book {
            Book::Xlsx(book) => book.worksheet_range(name).map_err(|err| err.to_string()),
            Book::Xls(book) => book.worksheet_range(name).map_err(|err| err.to_string()),
        };
        match range {
            Ok(range) => Some(absolute_grid(&range)),
            Err(reason) => {
                tracing::debug!(sheet = name, %reason, "Worksheet not readable");
                None
            }
        }
    }

    fn close(self: Box<Self>) {
        tracing::trace!(path = %self.path.display(), "Workbook closed");
    }
}

/// Opens `.xlsx`/`.xls` files with calamine
#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineOpener;

impl WorkbookOpener for CalamineOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn TableSource>, WorkbookError> {
        Ok(Box::new(CalamineWorkbook::open(path)?))
    }
}

fn convert_table(name: &str, sheet: &str, columns: &[String], data: &Range<Data>) -> Table {
    let mut rows: Grid = data
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    // Some writers report the header row as part of the table body
    let header_echo = rows.first().is_some_and(|first| {
        first.len() == columns.len()
            && first
                .iter()
                .zip(columns)
                .all(|(cell, column)| cell.as_text().as_deref() == Some(column.trim()))
    });
    if header_echo {
        rows.remove(0);
    }

    Table::new(name, sheet, columns.to_vec(), rows)
}

// calamine ranges are relative to their first used cell
fn absolute_grid(range: &Range<Data>) -> Grid {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Grid = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        grid.push(cells);
    }
    grid
}

fn convert_cell(value: &Data) -> CellValue {
    match value {
        Data::Empty => CellValue::Empty,
        Data::Bool(value) => CellValue::Bool(*value),
        Data::Int(value) => CellValue::Int(*value),
        Data::Float(value) => CellValue::Float(*value),
        Data::String(value) => CellValue::Text(value.clone()),
        Data::DateTime(value) => excel_serial_to_datetime(value.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Float(value.as_f64())),
        Data::DateTimeIso(value) => parse_datetime_text(value)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(value.clone())),
        Data::DurationIso(value) => CellValue::Text(value.clone()),
        Data::Error(err) => CellValue::Error(format!("{err:?}")),
    }
}

/// Converts an Excel serial date (1900 date system) to a timestamp
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// In-memory workbook, for tests and for callers that already hold tables
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    path: PathBuf,
    tables: BTreeMap<String, Table>,
    sheets: BTreeMap<String, Grid>,
}

impl MemoryWorkbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name().to_string(), table);
        self
    }

    pub fn with_sheet(mut self, name: &str, grid: Grid) -> Self {
        self.sheets.insert(name.to_string(), grid);
        self
    }
}

impl TableSource for MemoryWorkbook {
    fn path(&self) -> &Path {
        &self.path
    }

    fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    fn worksheet(&mut self, name: &str) -> Option<Grid> {
        self.sheets.get(name).cloned()
    }

    fn close(self: Box<Self>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::from(value)
    }

    #[test]
    fn keys_are_case_folded_without_spaces() {
        assert_eq!(normalize_key("Last Normalize"), "lastnormalize");
        assert_eq!(normalize_key("OriginalID"), "originalid");
        assert_eq!(normalize_key(" Channel Homepage "), "channelhomepage");
    }

    #[test]
    fn absent_column_differs_from_blank_cell() {
        let table = Table::build(
            "Week1",
            &["Name", "Rank"],
            vec![vec![text("Show A"), CellValue::Empty]],
        );
        let rows = table.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Rank"), Some(&CellValue::Empty));
        assert_eq!(rows[0].get("Video"), None);
        assert_eq!(rows[0].index(), 1);
    }

    #[test]
    fn grid_block_stops_at_blank_header_and_blank_row() {
        let grid = vec![
            vec![text("Year"), text("Season"), text("Version"), CellValue::Empty, text("Notes")],
            vec![CellValue::Int(2016), text("Summer"), CellValue::Float(0.5), CellValue::Empty, text("x")],
            vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
            vec![text("stray"), text("cells")],
        ];
        let table = Table::from_grid("RecordStats", "Record Stats", &grid, 0).unwrap();
        assert_eq!(table.headers(), ["Year", "Season", "Version"]);
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.get("year").and_then(CellValue::as_i64), Some(2016));
        assert_eq!(row.get("notes"), None);
    }

    #[test]
    fn grid_without_headers_is_not_a_table() {
        let grid = vec![vec![CellValue::Empty, text("Year")]];
        assert!(Table::from_grid("RecordStats", "Record Stats", &grid, 0).is_none());
        assert!(Table::from_grid("RecordStats", "Record Stats", &grid, 3).is_none());
    }

    #[test]
    fn numeric_conversions_accept_integral_floats_and_text() {
        assert_eq!(CellValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(CellValue::Float(3.5).as_i64(), None);
        assert_eq!(text(" 12 ").as_i64(), Some(12));
        assert_eq!(text("4.0").as_i64(), Some(4));
        assert_eq!(text("n/a").as_i64(), None);
        assert_eq!(CellValue::Int(7).as_f64(), Some(7.0));
    }

    #[test]
    fn truthiness_leaves_blank_cells_undecided() {
        assert_eq!(CellValue::Bool(true).as_bool(), Some(true));
        assert_eq!(text("TRUE").as_bool(), Some(true));
        assert_eq!(text("false").as_bool(), Some(false));
        assert_eq!(CellValue::Int(0).as_bool(), Some(false));
        assert_eq!(CellValue::Empty.as_bool(), None);
    }

    #[test]
    fn excel_serials_convert_to_timestamps() {
        let value = excel_serial_to_datetime(43_739.5).unwrap();
        assert_eq!(value.to_string(), "2019-10-01 12:00:00");
        assert!(excel_serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn text_dates_parse_in_common_layouts() {
        assert_eq!(
            text("2019-10-01").as_datetime().map(|d| d.to_string()),
            Some("2019-10-01 00:00:00".to_string())
        );
        assert!(text("2019-10-01 23:30").as_datetime().is_some());
        assert!(text("soon").as_datetime().is_none());
    }

    #[test]
    fn integral_floats_display_without_fraction() {
        assert_eq!(CellValue::Float(101.0).to_string(), "101");
        assert_eq!(CellValue::Float(2.6).to_string(), "2.6");
        assert_eq!(CellValue::Bool(false).to_string(), "FALSE");
    }

    #[test]
    fn memory_workbook_serves_tables_and_sheets() {
        let mut book = MemoryWorkbook::new("__Record Fall 2019.xlsx")
            .with_table(Table::build("Stats", &["Name"], vec![vec![text("Show A")]]))
            .with_sheet("Record Stats", vec![vec![text("Year")]]);
        assert!(book.tables().contains_key("Stats"));
        assert!(book.worksheet("Record Stats").is_some());
        assert!(book.worksheet("Missing").is_none());
        Box::new(book).close();
    }
}
