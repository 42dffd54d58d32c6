//! Show roster parsing

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{ParseWarning, Warnings};
use crate::models::{ScheduleTime, ShowKey, ShowRecord};
use crate::version::RecordVersion;
use crate::workbook::{CellValue, Row, Table};

/// Roster column holding the canonical show key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityColumn {
    Name,
    OriginalId,
}

impl IdentityColumn {
    pub fn for_version(version: RecordVersion) -> Self {
        if version < RecordVersion::new(3, 0) {
            IdentityColumn::Name
        } else {
            IdentityColumn::OriginalId
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            IdentityColumn::Name => "name",
            IdentityColumn::OriginalId => "originalid",
        }
    }
}

/// A season's shows, in table order, indexed by canonical key
#[derive(Debug, Clone)]
pub struct ShowRoster {
    identity: IdentityColumn,
    shows: Vec<Arc<ShowRecord>>,
    index: HashMap<ShowKey, usize>,
}

impl ShowRoster {
    pub fn identity(&self) -> IdentityColumn {
        self.identity
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ShowRecord>> {
        self.shows.iter()
    }

    pub fn get(&self, key: &ShowKey) -> Option<&Arc<ShowRecord>> {
        match key {
            ShowKey::Name(name) => self
                .index
                .get(&ShowKey::Name(name_key(name)))
                .map(|position| &self.shows[*position]),
            ShowKey::OriginalId(id) => self.by_original_id(*id),
        }
    }

    /// Case-insensitive lookup on display name, then original name
    pub fn by_name(&self, name: &str) -> Option<&Arc<ShowRecord>> {
        self.shows
            .iter()
            .find(|show| show.name.eq_ignore_ascii_case(name.trim()))
            .or_else(|| self.shows.iter().find(|show| show.answers_to(name)))
    }

    pub fn by_original_id(&self, id: i64) -> Option<&Arc<ShowRecord>> {
        self.shows.iter().find(|show| show.original_id == Some(id))
    }

    /// Canonical key of a show in this roster
    pub fn key_of(&self, show: &ShowRecord) -> Option<ShowKey> {
        match self.identity {
            IdentityColumn::Name => Some(ShowKey::Name(name_key(&show.name))),
            IdentityColumn::OriginalId => show.original_id.map(ShowKey::OriginalId),
        }
    }
}

// Case-folded, spaces removed
fn name_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized column names the roster understands
const KNOWN_COLUMNS: &[&str] = &[
    "originalid",
    "seasonid",
    "seriesid",
    "subseriesid",
    "name",
    "originalname",
    "channel",
    "day",
    "firstepisode",
    "group",
    "channelhomepage",
    "image",
    "rssfeedname",
    "hashtag",
    "website",
    "pv",
    "showboyid",
    "annid",
    "anilistid",
    "malid",
    "anidbid",
    "watching",
    "include",
    "renewal",
    "lastseason",
    "lastepisode",
    "totalepisodes",
    "lastnormalize",
    "lasthypelist",
    "lastaverage",
    "notes",
];

fn text(cell: &CellValue) -> Option<String> {
    cell.as_text()
}

fn flag(cell: &CellValue) -> bool {
    cell.as_bool().unwrap_or(false)
}

fn apply_column(show: &mut ShowRecord, column: &str, cell: &CellValue) {
    match column {
        "originalid" => show.original_id = cell.as_i64(),
        "seasonid" => show.season_id = cell.as_i64(),
        "seriesid" => show.series_id = cell.as_i64(),
        "subseriesid" => show.subseries_id = cell.as_i64(),
        "name" => show.name = text(cell).unwrap_or_default(),
        "originalname" => show.original_name = text(cell),
        "channel" => show.channel = text(cell),
        "day" => show.day = text(cell),
        "firstepisode" => {
            show.first_episode = cell
                .as_datetime()
                .map(ScheduleTime::At)
                .or_else(|| text(cell).map(ScheduleTime::Text))
        }
        "group" => show.group = cell.as_i64(),
        "channelhomepage" => show.channel_homepage = text(cell),
        "image" => show.image = text(cell),
        "rssfeedname" => show.rss_feed_name = text(cell),
        "hashtag" => show.hashtag = text(cell),
        "website" => show.website = text(cell),
        "pv" => show.pv = text(cell),
        "showboyid" => show.showboy_id = text(cell),
        "annid" => show.ann_id = text(cell),
        "anilistid" => show.anilist_id = text(cell),
        "malid" => show.mal_id = text(cell),
        "anidbid" => show.anidb_id = text(cell),
        "watching" => show.watching = flag(cell),
        "include" => show.include = flag(cell),
        "renewal" => show.renewal = flag(cell),
        "lastseason" => show.last_season = text(cell),
        "lastepisode" => show.last_episode = cell.as_i64().unwrap_or(0),
        "totalepisodes" => show.total_episodes = cell.as_i64().unwrap_or(-1),
        "lastnormalize" => show.last_normalize = cell.as_f64().unwrap_or(0.0),
        "lasthypelist" => show.last_hypelist = cell.as_i64().unwrap_or(0),
        "notes" => show.notes = text(cell),
        _ => {}
    }
}

fn show_from_row(row: &Row) -> ShowRecord {
    let mut show = ShowRecord::default();
    for column in KNOWN_COLUMNS {
        if let Some(cell) = row.get(column) {
            apply_column(&mut show, column, cell);
        }
    }
    show
}

/// Builds the roster from the `Stats` table.
///
/// Rows without a canonical key, and rows repeating an earlier key, are
/// dropped with a warning.
pub fn build_roster(table: &Table, version: RecordVersion, warnings: &mut Warnings) -> ShowRoster {
    let identity = IdentityColumn::for_version(version);

    let extra: BTreeSet<String> = table
        .headers()
        .iter()
        .map(|header| crate::workbook::normalize_key(header))
        .filter(|column| !KNOWN_COLUMNS.contains(&column.as_str()))
        .collect();
    if !extra.is_empty() {
        tracing::debug!(table = table.name(), columns = ?extra, "Roster has additional columns");
    }

    let mut shows = Vec::new();
    let mut index = HashMap::new();
    for row in table.rows() {
        if row.is_blank() {
            tracing::trace!(table = table.name(), row = row.index(), "Blank roster row");
            continue;
        }
        let show = show_from_row(&row);
        let key = match identity {
            IdentityColumn::Name => {
                Some(show.name.as_str())
                    .filter(|name| !name.is_empty())
                    .map(|name| ShowKey::Name(name_key(name)))
            }
            IdentityColumn::OriginalId => show.original_id.map(ShowKey::OriginalId),
        };
        let Some(key) = key else {
            warnings.push(ParseWarning::MissingShowKey {
                table: table.name().to_string(),
                row: row.index(),
                column: identity.column(),
            });
            continue;
        };
        if index.contains_key(&key) {
            warnings.push(ParseWarning::DuplicateShowKey {
                table: table.name().to_string(),
                row: row.index(),
                key: key.to_string(),
            });
            continue;
        }
        index.insert(key, shows.len());
        shows.push(Arc::new(show));
    }

    tracing::debug!(table = table.name(), shows = shows.len(), "Roster built");
    ShowRoster {
        identity,
        shows,
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_table() -> Table {
        Table::build(
            "Stats",
            &[
                "OriginalID",
                "Name",
                "Original Name",
                "Watching",
                "Last Episode",
                "Last Normalize",
                "First Episode",
                "Mystery",
            ],
            vec![
                vec![
                    101_i64.into(),
                    "Show A".into(),
                    "Shou A".into(),
                    true.into(),
                    12_i64.into(),
                    3.5.into(),
                    "TBA".into(),
                    "x".into(),
                ],
                vec![
                    CellValue::Empty,
                    "Show B".into(),
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                ],
                vec![
                    101_i64.into(),
                    "Show A again".into(),
                    CellValue::Empty,
                    false.into(),
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                ],
                vec![CellValue::Empty; 8],
                vec![
                    310_i64.into(),
                    "Show C".into(),
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                    CellValue::Empty,
                ],
            ],
        )
    }

    #[test]
    fn identity_switches_at_version_3() {
        assert_eq!(
            IdentityColumn::for_version(RecordVersion::new(2, 9)),
            IdentityColumn::Name
        );
        assert_eq!(
            IdentityColumn::for_version(RecordVersion::new(3, 0)),
            IdentityColumn::OriginalId
        );
    }

    #[test]
    fn keyed_by_original_id_from_version_3() {
        let mut warnings = Warnings::default();
        let roster = build_roster(&roster_table(), RecordVersion::new(4, 0), &mut warnings);

        assert_eq!(roster.len(), 2);
        let names: Vec<&str> = roster.iter().map(|show| show.name.as_str()).collect();
        assert_eq!(names, ["Show A", "Show C"]);

        let warnings = warnings.into_vec();
        assert!(warnings.contains(&ParseWarning::MissingShowKey {
            table: "Stats".to_string(),
            row: 2,
            column: "originalid",
        }));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::DuplicateShowKey { row: 3, .. })));
    }

    #[test]
    fn keyed_by_name_before_version_3() {
        let mut warnings = Warnings::default();
        let roster = build_roster(&roster_table(), RecordVersion::new(2, 6), &mut warnings);
        assert_eq!(roster.len(), 4);
        assert!(warnings.is_empty());
        assert!(roster.get(&ShowKey::Name("show b".to_string())).is_some());
    }

    #[test]
    fn fields_and_defaults() {
        let mut warnings = Warnings::default();
        let roster = build_roster(&roster_table(), RecordVersion::new(4, 0), &mut warnings);

        let a = roster.by_original_id(101).unwrap();
        assert!(a.watching);
        assert_eq!(a.last_episode, 12);
        assert!((a.last_normalize - 3.5).abs() < 1e-9);
        assert_eq!(a.first_episode, Some(ScheduleTime::Text("TBA".to_string())));
        assert_eq!(a.total_episodes, -1);

        let c = roster.by_original_id(310).unwrap();
        assert!(!c.watching);
        assert_eq!(c.last_episode, 0);
        assert_eq!(c.original_name, None);
    }

    #[test]
    fn lookups() {
        let mut warnings = Warnings::default();
        let roster = build_roster(&roster_table(), RecordVersion::new(4, 0), &mut warnings);
        assert_eq!(roster.by_name("show a").map(|s| s.original_id), Some(Some(101)));
        assert_eq!(roster.by_name("SHOU A").map(|s| s.original_id), Some(Some(101)));
        assert!(roster.by_name("Show Z").is_none());
        assert!(roster.get(&ShowKey::OriginalId(310)).is_some());

        let c = roster.by_original_id(310).unwrap();
        assert_eq!(roster.key_of(c), Some(ShowKey::OriginalId(310)));
    }
}
