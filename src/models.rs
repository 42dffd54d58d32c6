use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::catalog::TableKind;
use crate::error::ParseWarning;
use crate::roster::ShowRoster;
use crate::schema::{HypeLayout, SchemaVariant};
use crate::season::SeasonIdentity;
use crate::version::{RecordMetadata, RecordVersion};
use crate::workbook::Table;

/// The cell a value was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOrigin {
    pub table: String,
    /// 1-based data row
    pub row: usize,
    pub column: String,
}

/// A value read from the workbook, with optional provenance for write-back
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    value: T,
    origin: Option<CellOrigin>,
}

impl<T> Field<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            origin: None,
        }
    }

    pub fn with_origin(value: T, origin: CellOrigin) -> Self {
        Self {
            value,
            origin: Some(origin),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    pub fn origin(&self) -> Option<&CellOrigin> {
        self.origin.as_ref()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        Field {
            value: f(self.value),
            origin: self.origin,
        }
    }
}

/// A version-conditional episode column
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    /// The record version has no such column
    Absent,
    /// The column exists but this row leaves it blank
    Null,
    Present(Field<T>),
}

impl<T> Slot<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Present(field) => Some(field.value()),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Slot::Absent)
    }
}

/// Reference to a table kept but not decomposed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub sheet: String,
}

impl TableRef {
    pub fn of(table: &Table) -> Self {
        Self {
            name: table.name().to_string(),
            sheet: table.sheet().to_string(),
        }
    }
}

/// Canonical key of a show within one record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShowKey {
    /// Records before version 3
    Name(String),
    OriginalId(i64),
}

impl fmt::Display for ShowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowKey::Name(name) => write!(f, "`{name}`"),
            ShowKey::OriginalId(id) => write!(f, "#{id}"),
        }
    }
}

/// First-episode schedule cell: usually a timestamp, sometimes free text
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleTime {
    At(NaiveDateTime),
    Text(String),
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleTime::At(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S")),
            ScheduleTime::Text(text) => f.write_str(text),
        }
    }
}

/// One show of a season's roster
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRecord {
    pub original_id: Option<i64>,
    pub season_id: Option<i64>,
    pub series_id: Option<i64>,
    pub subseries_id: Option<i64>,
    pub name: String,
    pub original_name: Option<String>,
    pub channel: Option<String>,
    pub day: Option<String>,
    pub first_episode: Option<ScheduleTime>,
    pub group: Option<i64>,
    pub channel_homepage: Option<String>,
    pub image: Option<String>,
    pub rss_feed_name: Option<String>,
    pub hashtag: Option<String>,
    pub website: Option<String>,
    pub pv: Option<String>,
    pub showboy_id: Option<String>,
    pub ann_id: Option<String>,
    pub anilist_id: Option<String>,
    pub mal_id: Option<String>,
    pub anidb_id: Option<String>,
    pub watching: bool,
    pub include: bool,
    pub renewal: bool,
    pub last_season: Option<String>,
    pub last_episode: i64,
    pub total_episodes: i64,
    pub last_normalize: f64,
    pub last_hypelist: i64,
    pub notes: Option<String>,
}

impl Default for ShowRecord {
    fn default() -> Self {
        Self {
            original_id: None,
            season_id: None,
            series_id: None,
            subseries_id: None,
            name: String::new(),
            original_name: None,
            channel: None,
            day: None,
            first_episode: None,
            group: None,
            channel_homepage: None,
            image: None,
            rss_feed_name: None,
            hashtag: None,
            website: None,
            pv: None,
            showboy_id: None,
            ann_id: None,
            anilist_id: None,
            mal_id: None,
            anidb_id: None,
            watching: false,
            include: false,
            renewal: false,
            last_season: None,
            last_episode: 0,
            total_episodes: -1,
            last_normalize: 0.0,
            last_hypelist: 0,
            notes: None,
        }
    }
}

impl ShowRecord {
    /// Average normalized rank carried over from last season
    pub fn last_average(&self) -> f64 {
        if self.last_episode == 0 {
            0.0
        } else {
            self.last_normalize / self.last_episode as f64
        }
    }

    /// Case-insensitive match on display or original name
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name)
            || self
                .original_name
                .as_deref()
                .is_some_and(|original| original.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unwatched,
    Watched,
    /// Watched, and the episode was the finale
    Finale,
}

/// One show's observation in one week
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    pub(crate) show: Arc<ShowRecord>,
    pub(crate) key: ShowKey,
    pub rank: Field<Option<u32>>,
    /// Standing in the season ranking kept beside the weekly rank
    pub season_rank: Field<Option<u32>>,
    pub episode_number: Field<Option<i64>>,
    pub hype_rank: Option<u32>,
    /// Times the show has appeared on a hype list so far
    pub hype_occurrences: Option<i64>,
    pub one_liner: Slot<bool>,
    pub video: Slot<bool>,
    pub air_date: Slot<NaiveDate>,
    pub watched: Slot<WatchState>,
}

impl EpisodeRecord {
    pub fn show(&self) -> &ShowRecord {
        &self.show
    }

    pub fn key(&self) -> &ShowKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.show.name
    }

    /// `None` when the show did not air this week
    pub fn rank(&self) -> Option<u32> {
        *self.rank.value()
    }

    pub fn season_rank(&self) -> Option<u32> {
        *self.season_rank.value()
    }

    pub fn episode_number(&self) -> Option<i64> {
        *self.episode_number.value()
    }
}

/// Tables attached to a week without being parsed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekAttachments {
    pub cut: Option<TableRef>,
    pub cut_settings: Option<TableRef>,
    pub cut_results: Option<TableRef>,
    pub roundup: Option<TableRef>,
    pub renewal_roundup: Option<TableRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HypeEntry {
    /// 1-based position in the list
    pub rank: u32,
    pub key: ShowKey,
    pub occurrences: Option<i64>,
}

/// An entry of last week's hype list
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousHypeEntry {
    pub rank: u32,
    pub key: ShowKey,
    pub name: Option<String>,
    /// Where the show stands this week, when the table records it
    pub this_week_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HypeList {
    pub(crate) layout: HypeLayout,
    pub(crate) table: TableRef,
    pub(crate) history: Option<TableRef>,
    pub(crate) entries: Vec<HypeEntry>,
    pub(crate) previous: Vec<PreviousHypeEntry>,
}

impl HypeList {
    pub fn layout(&self) -> HypeLayout {
        self.layout
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// History table, only for split lists of weeks that had a prior list
    pub fn history(&self) -> Option<&TableRef> {
        self.history.as_ref()
    }

    pub fn entries(&self) -> &[HypeEntry] {
        &self.entries
    }

    pub fn previous(&self) -> &[PreviousHypeEntry] {
        &self.previous
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of `key` in the current list. Names compare case-insensitively.
    pub fn rank(&self, key: &ShowKey) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| match (&entry.key, key) {
                (ShowKey::Name(listed), ShowKey::Name(wanted)) => {
                    listed.eq_ignore_ascii_case(wanted.trim())
                }
                (listed, wanted) => listed == wanted,
            })
            .map(|entry| entry.rank)
    }

    /// Rank of a roster show, matched the way this list's layout keys shows
    pub fn rank_of(&self, show: &ShowRecord) -> Option<u32> {
        match self.layout {
            HypeLayout::Combined => self.entries.iter().find_map(|entry| match &entry.key {
                ShowKey::Name(name) if show.answers_to(name) => Some(entry.rank),
                _ => None,
            }),
            HypeLayout::Split => show
                .original_id
                .and_then(|id| self.rank(&ShowKey::OriginalId(id))),
        }
    }
}

/// One week's ranking table
#[derive(Debug, Clone, PartialEq)]
pub struct WeekRankingSheet {
    pub(crate) week: u32,
    pub(crate) table: TableRef,
    pub(crate) schema: SchemaVariant,
    pub(crate) episodes: Vec<EpisodeRecord>,
    pub(crate) hype_list: Option<HypeList>,
    pub(crate) attachments: WeekAttachments,
}

impl WeekRankingSheet {
    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Episodes in table row order
    pub fn episodes(&self) -> &[EpisodeRecord] {
        &self.episodes
    }

    /// First episode of the show keyed `key`
    pub fn episode(&self, key: &ShowKey) -> Option<&EpisodeRecord> {
        self.episodes.iter().find(|episode| &episode.key == key)
    }

    /// Every episode of a show. More than one only from version 4.1 on.
    pub fn episodes_of<'a>(
        &'a self,
        key: &'a ShowKey,
    ) -> impl Iterator<Item = &'a EpisodeRecord> + 'a {
        self.episodes.iter().filter(move |episode| &episode.key == key)
    }

    pub fn ranked(&self) -> impl Iterator<Item = &EpisodeRecord> {
        self.episodes.iter().filter(|episode| episode.rank().is_some())
    }

    pub fn has_rankings(&self) -> bool {
        self.ranked().next().is_some()
    }

    pub fn hype_list(&self) -> Option<&HypeList> {
        self.hype_list.as_ref()
    }

    pub fn attachments(&self) -> &WeekAttachments {
        &self.attachments
    }

    /// Ranks held by more than one episode, with their counts
    pub fn duplicate_ranks(&self) -> Vec<(u32, usize)> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for rank in self.ranked().filter_map(EpisodeRecord::rank) {
            *counts.entry(rank).or_default() += 1;
        }
        counts.into_iter().filter(|(_, count)| *count > 1).collect()
    }
}

/// A show's ranked episodes across the season
#[derive(Debug, Clone)]
pub struct ShowSeason<'a> {
    pub show: &'a Arc<ShowRecord>,
    pub episodes: Vec<(u32, &'a EpisodeRecord)>,
}

/// A parsed season workbook
#[derive(Debug, Clone)]
pub struct SeasonRecord {
    path: PathBuf,
    metadata: RecordMetadata,
    roster: ShowRoster,
    weeks: BTreeMap<u32, WeekRankingSheet>,
    extras: Vec<(TableKind, TableRef)>,
    warnings: Vec<ParseWarning>,
}

impl SeasonRecord {
    pub(crate) fn new(
        path: PathBuf,
        metadata: RecordMetadata,
        roster: ShowRoster,
        weeks: BTreeMap<u32, WeekRankingSheet>,
        extras: Vec<(TableKind, TableRef)>,
        warnings: Vec<ParseWarning>,
    ) -> Self {
        Self {
            path,
            metadata,
            roster,
            weeks,
            extras,
            warnings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn identity(&self) -> SeasonIdentity {
        self.metadata.identity
    }

    pub fn version(&self) -> RecordVersion {
        self.metadata.version
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    pub fn roster(&self) -> &ShowRoster {
        &self.roster
    }

    /// Weeks in ascending order
    pub fn weeks(&self) -> impl Iterator<Item = &WeekRankingSheet> {
        self.weeks.values()
    }

    pub fn week(&self, week: u32) -> Option<&WeekRankingSheet> {
        self.weeks.get(&week)
    }

    /// Highest week with at least one ranked episode
    pub fn last_week(&self) -> Option<&WeekRankingSheet> {
        self.weeks.values().rev().find(|week| week.has_rankings())
    }

    /// Chart data and awards tables
    pub fn extras(&self) -> &[(TableKind, TableRef)] {
        &self.extras
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Each roster show with its ranked episodes, in roster order
    pub fn compile_shows(&self) -> Vec<ShowSeason<'_>> {
        self.roster
            .iter()
            .map(|show| {
                let key = self.roster.key_of(show);
                let key = key.as_ref();
                let episodes = self
                    .weeks
                    .values()
                    .flat_map(move |week| {
                        week.ranked()
                            .filter(move |episode| Some(&episode.key) == key)
                            .map(move |episode| (week.week, episode))
                    })
                    .collect();
                ShowSeason { show, episodes }
            })
            .collect()
    }
}
