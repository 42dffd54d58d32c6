//! Season record assembly

use std::collections::BTreeMap;
use std::path::Path;

use crate::catalog::{TableCatalog, WeekTables};
use crate::error::{RecordError, Result, Warnings};
use crate::hype::build_hype_list;
use crate::models::{SeasonRecord, TableRef, WeekAttachments};
use crate::ranking::RankingSheetBuilder;
use crate::roster::build_roster;
use crate::schema::select_schema;
use crate::version::{self, RECORD_STATS_TABLE};
use crate::workbook::{TableSource, WorkbookOpener};

const ROSTER_TABLE: &str = "Stats";

fn attachments(tables: &WeekTables<'_>) -> WeekAttachments {
    WeekAttachments {
        cut: tables.cut.map(TableRef::of),
        cut_settings: tables.cut_settings.map(TableRef::of),
        cut_results: tables.cut_results.map(TableRef::of),
        roundup: tables.roundup.map(TableRef::of),
        renewal_roundup: tables.renewal_roundup.map(TableRef::of),
    }
}

fn missing_table(source: &dyn TableSource, table: &'static str) -> RecordError {
    if source.tables().is_empty() {
        RecordError::NoTableObjects(source.path().to_path_buf())
    } else {
        RecordError::MissingRequiredTable(table)
    }
}

/// Builds a season record from an open workbook
pub fn load_record(source: &mut dyn TableSource) -> Result<SeasonRecord> {
    let path = source.path().to_path_buf();
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut warnings = Warnings::default();

    let named_stats = source
        .tables()
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(RECORD_STATS_TABLE))
        .map(|(_, table)| table.clone());
    let stats = version::record_stats_table(named_stats.as_ref(), |sheet| source.worksheet(sheet))
        .ok_or_else(|| missing_table(&*source, RECORD_STATS_TABLE))?;
    let metadata = version::resolve_metadata(&stats, &filename, &mut warnings)?;
    tracing::info!(
        file = %filename,
        season = %metadata.identity,
        version = %metadata.version,
        "Reading season record"
    );

    let catalog = TableCatalog::build(source.tables(), &mut warnings);
    let roster_table = catalog
        .roster()
        .ok_or_else(|| missing_table(&*source, ROSTER_TABLE))?;
    let roster = build_roster(roster_table, metadata.version, &mut warnings);
    let schema = select_schema(metadata.version);

    let mut builder = RankingSheetBuilder::new(schema, &roster);
    let mut weeks = BTreeMap::new();
    for (week, tables) in catalog.weeks() {
        let Some(ranking) = tables.ranking else {
            tracing::debug!(week, "Week tables without a ranking table");
            continue;
        };
        let hype_list = tables
            .hype
            .map(|hype| build_hype_list(hype, tables.history, schema.hype, &mut warnings));
        let sheet = builder.build(week, ranking, hype_list, attachments(tables), &mut warnings);
        weeks.insert(week, sheet);
    }

    let extras = catalog
        .record_level()
        .iter()
        .map(|(kind, table)| (*kind, TableRef::of(table)))
        .collect();

    Ok(SeasonRecord::new(
        path,
        metadata,
        roster,
        weeks,
        extras,
        warnings.into_vec(),
    ))
}

/// Opens, reads and closes one workbook. The workbook is closed whether or
/// not the record could be built.
pub fn open_record(opener: &dyn WorkbookOpener, path: &Path) -> Result<SeasonRecord> {
    let mut source = opener.open(path)?;
    let record = load_record(source.as_mut());
    source.close();
    record
}
