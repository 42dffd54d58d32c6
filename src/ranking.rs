//! Weekly ranking table parsing

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ParseWarning, Warnings};
use crate::models::{
    CellOrigin, EpisodeRecord, Field, HypeList, ShowKey, ShowRecord, Slot, TableRef, WatchState,
    WeekAttachments, WeekRankingSheet,
};
use crate::roster::ShowRoster;
use crate::schema::{EpisodeField, Identity, SheetSchema};
use crate::workbook::{CellValue, Row, Table};

/// Computed column caching the running episode count
const CACHED_EPISODES_COLUMN: &str = "episodes";
const SEASON_RANK_COLUMN: &str = "newrank";
const HYPE_OCCURRENCE_COLUMNS: &[&str] = &["hypelistoccurences", "hypelistoccurrences"];
const ID_COLUMNS: &[&str] = &["originalid", "seriesid"];

fn origin(table: &Table, row: &Row, column: &str) -> CellOrigin {
    CellOrigin {
        table: table.name().to_string(),
        row: row.index(),
        column: column.to_string(),
    }
}

fn watch_state(cell: &CellValue) -> Option<WatchState> {
    // Finale marker, from version 4.3
    if cell.as_text().is_some_and(|text| text.eq_ignore_ascii_case("f")) {
        return Some(WatchState::Finale);
    }
    cell.as_bool().map(|watched| {
        if watched {
            WatchState::Watched
        } else {
            WatchState::Unwatched
        }
    })
}

/// Positive integer rank; anything else means the show did not air
fn parse_rank(cell: &CellValue) -> Option<u32> {
    cell.as_i64()
        .filter(|rank| *rank > 0)
        .and_then(|rank| u32::try_from(rank).ok())
}

fn invalid_cell(table: &Table, row: &Row, column: &str, cell: &CellValue) -> ParseWarning {
    ParseWarning::InvalidCell {
        table: table.name().to_string(),
        row: row.index(),
        column: column.to_string(),
        value: cell.to_string(),
    }
}

/// Season-to-date rank. Blank means unranked; other non-ranks are reported.
fn season_rank(row: &Row, table: &Table, warnings: &mut Warnings) -> Field<Option<u32>> {
    let Some(cell) = row.get(SEASON_RANK_COLUMN) else {
        return Field::new(None);
    };
    let rank = parse_rank(cell);
    if rank.is_none() && !cell.is_blank() {
        warnings.push(invalid_cell(table, row, SEASON_RANK_COLUMN, cell));
    }
    Field::with_origin(rank, origin(table, row, SEASON_RANK_COLUMN))
}

fn hype_occurrences(row: &Row, table: &Table, warnings: &mut Warnings) -> Option<i64> {
    let (column, cell) = row.first_present(HYPE_OCCURRENCE_COLUMNS)?;
    if cell.is_blank() {
        return None;
    }
    let count = cell.as_i64();
    if count.is_none() {
        warnings.push(invalid_cell(table, row, column, cell));
    }
    count
}

/// Builds every ranking table of one record with the record's schema.
///
/// Weeks must be built in ascending order: implicit episode numbers count
/// the weeks each show has aired so far.
pub struct RankingSheetBuilder<'a> {
    schema: &'static SheetSchema,
    roster: &'a ShowRoster,
    aired: HashMap<ShowKey, i64>,
}

impl<'a> RankingSheetBuilder<'a> {
    pub fn new(schema: &'static SheetSchema, roster: &'a ShowRoster) -> Self {
        Self {
            schema,
            roster,
            aired: HashMap::new(),
        }
    }

    pub fn build(
        &mut self,
        week: u32,
        table: &Table,
        hype_list: Option<HypeList>,
        attachments: WeekAttachments,
        warnings: &mut Warnings,
    ) -> WeekRankingSheet {
        if table.rows().first().is_some_and(|row| !row.has_column("rank")) {
            tracing::debug!(table = table.name(), "Ranking table has no rank column");
        }

        let mut episodes = Vec::new();
        for row in table.rows() {
            if row.is_blank() {
                tracing::trace!(table = table.name(), row = row.index(), "Blank ranking row");
                continue;
            }
            let Some(show) = self.resolve_show(&row, table, warnings) else {
                continue;
            };
            let Some(key) = self.roster.key_of(show) else {
                tracing::debug!(show = %show.name, "Roster show has no canonical key");
                continue;
            };

            let rank = match row.get("rank") {
                Some(cell) => Field::with_origin(parse_rank(cell), origin(table, &row, "rank")),
                None => Field::new(None),
            };
            if rank.value().is_none() {
                tracing::trace!(table = table.name(), show = %show.name, "Show did not air");
            }
            let episode_number = if self.schema.explicit_episode_number() {
                match self.slot(&row, table, EpisodeField::EpisodeNumber, CellValue::as_i64, warnings)
                {
                    Slot::Present(field) => field.map(Some),
                    _ => Field::new(None),
                }
            } else {
                self.implicit_episode_number(&row, table, &key, show, rank.value().is_some())
            };

            episodes.push(EpisodeRecord {
                show: Arc::clone(show),
                key,
                rank,
                season_rank: season_rank(&row, table, warnings),
                episode_number,
                hype_rank: hype_list.as_ref().and_then(|list| list.rank_of(show)),
                hype_occurrences: hype_occurrences(&row, table, warnings),
                one_liner: self.slot(&row, table, EpisodeField::OneLiner, CellValue::as_bool, warnings),
                video: self.slot(&row, table, EpisodeField::Video, CellValue::as_bool, warnings),
                air_date: self.slot(
                    &row,
                    table,
                    EpisodeField::AirDate,
                    |cell| cell.as_datetime().map(|at| at.date()),
                    warnings,
                ),
                watched: self.slot(&row, table, EpisodeField::Watched, watch_state, warnings),
            });
        }

        let sheet = WeekRankingSheet {
            week,
            table: TableRef::of(table),
            schema: self.schema.variant,
            episodes,
            hype_list,
            attachments,
        };
        for (rank, count) in sheet.duplicate_ranks() {
            warnings.push(ParseWarning::DuplicateRank { week, rank, count });
        }
        tracing::debug!(
            week,
            episodes = sheet.episodes().len(),
            ranked = sheet.ranked().count(),
            "Week built"
        );
        sheet
    }

    fn resolve_show(
        &self,
        row: &Row,
        table: &Table,
        warnings: &mut Warnings,
    ) -> Option<&'a Arc<ShowRecord>> {
        let name = row.get("name").and_then(CellValue::as_text);
        let unknown = |identity: String| ParseWarning::UnknownShowReference {
            table: table.name().to_string(),
            row: row.index(),
            identity,
        };

        match self.schema.identity {
            Identity::ShowName => {
                let Some(name) = name else {
                    warnings.push(ParseWarning::MissingShowKey {
                        table: table.name().to_string(),
                        row: row.index(),
                        column: "name",
                    });
                    return None;
                };
                let show = self.roster.by_name(&name);
                if show.is_none() {
                    warnings.push(unknown(format!("`{name}`")));
                }
                show
            }
            Identity::OriginalId => {
                let id_cell = ID_COLUMNS
                    .iter()
                    .find_map(|column| row.get(column).filter(|cell| !cell.is_blank()));
                match (id_cell, name) {
                    (Some(cell), _) => {
                        let Some(id) = cell.as_i64() else {
                            warnings.push(invalid_cell(table, row, "originalid", cell));
                            return None;
                        };
                        let show = self.roster.by_original_id(id);
                        if show.is_none() {
                            warnings.push(unknown(format!("#{id}")));
                        }
                        show
                    }
                    // Rows typed in before the id columns were filled
                    (None, Some(name)) => {
                        let show = self.roster.by_name(&name);
                        if show.is_none() {
                            warnings.push(unknown(format!("`{name}`")));
                        }
                        show
                    }
                    (None, None) => {
                        warnings.push(ParseWarning::MissingShowKey {
                            table: table.name().to_string(),
                            row: row.index(),
                            column: "originalid",
                        });
                        None
                    }
                }
            }
        }
    }

    fn slot<T>(
        &self,
        row: &Row,
        table: &Table,
        field: EpisodeField,
        parse: impl Fn(&CellValue) -> Option<T>,
        warnings: &mut Warnings,
    ) -> Slot<T> {
        if !self.schema.has(field) {
            return Slot::Absent;
        }
        let Some((column, cell)) = row.first_present(field.columns()) else {
            tracing::trace!(table = table.name(), ?field, "Declared column missing from table");
            return Slot::Null;
        };
        if cell.is_blank() {
            return Slot::Null;
        }
        match parse(cell) {
            Some(value) => Slot::Present(Field::with_origin(value, origin(table, row, column))),
            None => {
                warnings.push(invalid_cell(table, row, column, cell));
                Slot::Null
            }
        }
    }

    /// Cached `Episodes` value when present, else last season's episode
    /// count plus the weeks aired so far.
    fn implicit_episode_number(
        &mut self,
        row: &Row,
        table: &Table,
        key: &ShowKey,
        show: &ShowRecord,
        aired: bool,
    ) -> Field<Option<i64>> {
        let count = self.aired.entry(key.clone()).or_default();
        if aired {
            *count += 1;
        }
        if let Some(cached) = row.get(CACHED_EPISODES_COLUMN).and_then(CellValue::as_i64) {
            return Field::with_origin(Some(cached), origin(table, row, CACHED_EPISODES_COLUMN));
        }
        if aired {
            Field::new(Some(show.last_episode + *count))
        } else {
            Field::new(None)
        }
    }
}
