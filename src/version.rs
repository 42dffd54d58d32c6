//! Record version and the record stats table

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseWarning, RecordError, Warnings};
use crate::models::TableRef;
use crate::season::{extract_season_from_filename, Season, SeasonIdentity};
use crate::workbook::{CellValue, Grid, Row, Table};

/// Table name of the record stats table in newer workbooks
pub const RECORD_STATS_TABLE: &str = "RecordStats";
/// Worksheet holding the unwrapped record stats block in older workbooks
pub const RECORD_STATS_SHEET: &str = "Record Stats";

/// Workbook schema revision, e.g. `2.6` or `5.3`.
///
/// Stored in thousandths so comparisons are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordVersion(u32);

impl RecordVersion {
    /// Lowest supported version, assumed when a record states none
    pub const BASE: RecordVersion = RecordVersion(0);

    /// `major.tenths`, e.g. `RecordVersion::new(2, 6)` for 2.6
    pub const fn new(major: u32, tenths: u32) -> Self {
        Self(major * 1000 + tenths * 100)
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value >= 1_000_000.0 {
            return None;
        }
        Some(Self((value * 1000.0).round() as u32))
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 1000.0
    }
}

impl fmt::Display for RecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.0 / 1000;
        let fraction = format!("{:03}", self.0 % 1000);
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            write!(f, "{major}.0")
        } else {
            write!(f, "{major}.{fraction}")
        }
    }
}

impl FromStr for RecordVersion {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<f64>()?;
        // Out-of-range values fall back to the base version
        Ok(Self::from_f64(value).unwrap_or(Self::BASE))
    }
}

/// What the record stats table says about the record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetadata {
    pub identity: SeasonIdentity,
    pub version: RecordVersion,
    /// Only recorded from version 3.1 on
    pub target_show_count: Option<u32>,
    /// `SeasonIndex` cell, when the stats table carries one
    pub stated_season_index: Option<String>,
    pub stats_table: TableRef,
}

/// The record stats table, or the equivalent block of cells at the top of
/// the `Record Stats` worksheet in workbooks that predate table objects.
pub fn record_stats_table(
    named: Option<&Table>,
    worksheet: impl FnOnce(&str) -> Option<Grid>,
) -> Option<Table> {
    if let Some(table) = named {
        return Some(table.clone());
    }
    let grid = worksheet(RECORD_STATS_SHEET)?;
    tracing::debug!("Reading record stats from worksheet block");
    Table::from_grid(RECORD_STATS_TABLE, RECORD_STATS_SHEET, &grid, 0)
}

/// Reads season, year, version and target show count.
///
/// Blank season or year cells are taken from `filename`; a missing version
/// means [`RecordVersion::BASE`].
pub fn resolve_metadata(
    table: &Table,
    filename: &str,
    warnings: &mut Warnings,
) -> Result<RecordMetadata, RecordError> {
    let rows = table.rows();
    let row = rows.first();
    if row.is_none() {
        tracing::debug!(table = table.name(), "Record stats table has no data row");
    }

    let season = row.and_then(|row| read_season(row, table.name(), warnings));
    let year = row
        .and_then(|row| row.get("year"))
        .and_then(CellValue::as_i64)
        .and_then(|year| i32::try_from(year).ok());

    let identity = match (season, year) {
        (Some(season), Some(year)) => SeasonIdentity::new(season, year),
        (season, year) => {
            let from_name = extract_season_from_filename(filename).map_err(|err| {
                RecordError::VersionUnresolvable(format!(
                    "record stats lack season or year and {err}"
                ))
            })?;
            tracing::debug!(filename, "Season backfilled from filename");
            SeasonIdentity::new(
                season.unwrap_or(from_name.season()),
                year.unwrap_or(from_name.year()),
            )
        }
    };

    let version = row
        .and_then(|row| read_version(row, table.name(), warnings))
        .unwrap_or(RecordVersion::BASE);

    let target_show_count = if version >= RecordVersion::new(3, 1) {
        row.and_then(|row| row.get("targetshows"))
            .and_then(CellValue::as_i64)
            .and_then(|count| u32::try_from(count).ok())
    } else {
        None
    };

    let stated_season_index = row
        .and_then(|row| row.get("seasonindex"))
        .and_then(CellValue::as_text);

    Ok(RecordMetadata {
        identity,
        version,
        target_show_count,
        stated_season_index,
        stats_table: TableRef::of(table),
    })
}

fn read_season(row: &Row, table: &str, warnings: &mut Warnings) -> Option<Season> {
    let text = row.get("season")?.as_text()?;
    match text.parse::<Season>() {
        Ok(season) => Some(season),
        Err(_) => {
            warnings.push(ParseWarning::InvalidCell {
                table: table.to_string(),
                row: row.index(),
                column: "season".to_string(),
                value: text,
            });
            None
        }
    }
}

fn read_version(row: &Row, table: &str, warnings: &mut Warnings) -> Option<RecordVersion> {
    let cell = row.get("version")?;
    if cell.is_blank() {
        return None;
    }
    let version = cell.as_f64().and_then(RecordVersion::from_f64);
    if version.is_none() {
        warnings.push(ParseWarning::InvalidCell {
            table: table.to_string(),
            row: row.index(),
            column: "version".to_string(),
            value: cell.to_string(),
        });
    }
    version
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(headers: &[&str], values: Vec<CellValue>) -> Table {
        Table::build(RECORD_STATS_TABLE, headers, vec![values])
    }

    #[test]
    fn versions_compare_exactly() {
        let v = RecordVersion::from_f64(2.6).unwrap();
        assert_eq!(v, RecordVersion::new(2, 6));
        assert!(v >= RecordVersion::new(2, 6));
        assert!(v < RecordVersion::new(3, 0));
        assert_eq!("5.3".parse::<RecordVersion>().unwrap(), RecordVersion::new(5, 3));
        assert_eq!(RecordVersion::new(3, 0).to_string(), "3.0");
        assert_eq!(RecordVersion::from_f64(2.55).unwrap().to_string(), "2.55");
        assert!(RecordVersion::from_f64(-1.0).is_none());
    }

    #[test]
    fn reads_complete_stats_row() {
        let table = stats(
            &["Year", "Season", "Version", "Target Shows"],
            vec![2019_i64.into(), "Fall".into(), 3.1.into(), 12_i64.into()],
        );
        let mut warnings = Warnings::default();
        let meta = resolve_metadata(&table, "__Record Fall 2019.xlsx", &mut warnings).unwrap();
        assert_eq!(meta.identity, SeasonIdentity::new(Season::Fall, 2019));
        assert_eq!(meta.version, RecordVersion::new(3, 1));
        assert_eq!(meta.target_show_count, Some(12));
        assert_eq!(meta.stats_table.name, RECORD_STATS_TABLE);
        assert!(warnings.is_empty());
    }

    #[test]
    fn target_shows_ignored_before_3_1() {
        let table = stats(
            &["Year", "Season", "Version", "Target Shows"],
            vec![2018_i64.into(), "Winter".into(), 3.0.into(), 12_i64.into()],
        );
        let mut warnings = Warnings::default();
        let meta = resolve_metadata(&table, "__Record Winter 2018.xlsx", &mut warnings).unwrap();
        assert_eq!(meta.target_show_count, None);
    }

    #[test]
    fn blank_season_and_year_come_from_filename() {
        let table = stats(
            &["Year", "Season", "Version"],
            vec![CellValue::Empty, CellValue::Empty, 2.6.into()],
        );
        let mut warnings = Warnings::default();
        let meta = resolve_metadata(&table, "__Record Spring 2017.xlsx", &mut warnings).unwrap();
        assert_eq!(meta.identity, SeasonIdentity::new(Season::Spring, 2017));
        assert_eq!(meta.version, RecordVersion::new(2, 6));
    }

    #[test]
    fn missing_version_defaults_to_base() {
        let table = stats(&["Year", "Season"], vec![2016_i64.into(), "Summer".into()]);
        let mut warnings = Warnings::default();
        let meta = resolve_metadata(&table, "__Record Summer 2016.xlsx", &mut warnings).unwrap();
        assert_eq!(meta.version, RecordVersion::BASE);
    }

    #[test]
    fn unresolvable_without_table_or_filename() {
        let table = stats(&["Version"], vec![4.0.into()]);
        let mut warnings = Warnings::default();
        let result = resolve_metadata(&table, "season.xlsx", &mut warnings);
        assert!(matches!(result, Err(RecordError::VersionUnresolvable(_))));
    }

    #[test]
    fn invalid_version_cell_is_reported() {
        let table = stats(
            &["Year", "Season", "Version"],
            vec![2019_i64.into(), "Fall".into(), "draft".into()],
        );
        let mut warnings = Warnings::default();
        let meta = resolve_metadata(&table, "__Record Fall 2019.xlsx", &mut warnings).unwrap();
        assert_eq!(meta.version, RecordVersion::BASE);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn worksheet_block_stands_in_for_missing_table() {
        let grid = vec![
            vec!["Year".into(), "Season".into(), "Version".into()],
            vec![2016_i64.into(), "Summer".into(), 0.5.into()],
        ];
        let table = record_stats_table(None, |sheet| {
            assert_eq!(sheet, RECORD_STATS_SHEET);
            Some(grid.clone())
        })
        .unwrap();
        assert_eq!(table.sheet(), RECORD_STATS_SHEET);
        let mut warnings = Warnings::default();
        let meta = resolve_metadata(&table, "__Record Summer 2016.xlsx", &mut warnings).unwrap();
        assert_eq!(meta.version, RecordVersion::from_f64(0.5).unwrap());
    }
}
