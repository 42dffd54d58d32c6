//! Master extracts compiled from a directory of season records

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::error::CompileError;
use crate::models::{SeasonRecord, ShowRecord};
use crate::record;
use crate::season::{is_valid_record_filename, SeasonIndex};
use crate::workbook::WorkbookOpener;

pub const DEFAULT_SHOW_FILE: &str = "master_stats.csv";
pub const DEFAULT_EPISODE_FILE: &str = "master_episodes.csv";
pub const DEFAULT_LAST_EPISODE_FILE: &str = "last_episodes.csv";

pub const SHOW_COLUMNS: [&str; 26] = [
    "originalid",
    "seasonid",
    "seriesid",
    "subseriesid",
    "watching",
    "include",
    "originalname",
    "name",
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
    "lastseason",
    "notes",
    "seasonindex",
];

pub const LAST_EPISODE_COLUMNS: [&str; 4] = ["SeasonIndex", "originalid", "name", "ranktotal"];

pub const EPISODE_COLUMNS: [&str; 7] = [
    "seasonid",
    "originalid",
    "seasonindex",
    "week",
    "rank",
    "episodenumber",
    "hypelistrank",
];

/// One show of one season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowRow {
    #[serde(rename = "originalid")]
    pub original_id: Option<i64>,
    #[serde(rename = "seasonid")]
    pub season_id: Option<i64>,
    #[serde(rename = "seriesid")]
    pub series_id: Option<i64>,
    #[serde(rename = "subseriesid")]
    pub subseries_id: Option<i64>,
    pub watching: bool,
    pub include: bool,
    #[serde(rename = "originalname")]
    pub original_name: Option<String>,
    pub name: String,
    pub channel: Option<String>,
    pub day: Option<String>,
    #[serde(rename = "firstepisode")]
    pub first_episode: Option<String>,
    pub group: Option<i64>,
    #[serde(rename = "channelhomepage")]
    pub channel_homepage: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "rssfeedname")]
    pub rss_feed_name: Option<String>,
    pub hashtag: Option<String>,
    pub website: Option<String>,
    pub pv: Option<String>,
    #[serde(rename = "showboyid")]
    pub showboy_id: Option<String>,
    #[serde(rename = "annid")]
    pub ann_id: Option<String>,
    #[serde(rename = "anilistid")]
    pub anilist_id: Option<String>,
    #[serde(rename = "malid")]
    pub mal_id: Option<String>,
    #[serde(rename = "anidbid")]
    pub anidb_id: Option<String>,
    #[serde(rename = "lastseason")]
    pub last_season: Option<String>,
    pub notes: Option<String>,
    #[serde(rename = "seasonindex")]
    pub season_index: SeasonIndex,
}

impl ShowRow {
    fn from_show(show: &ShowRecord, season_index: SeasonIndex) -> Self {
        Self {
            original_id: show.original_id,
            season_id: show.season_id,
            series_id: show.series_id,
            subseries_id: show.subseries_id,
            watching: show.watching,
            include: show.include,
            original_name: show.original_name.clone(),
            name: show.name.clone(),
            channel: show.channel.clone(),
            day: show.day.clone(),
            first_episode: show.first_episode.as_ref().map(ToString::to_string),
            group: show.group,
            channel_homepage: show.channel_homepage.clone(),
            image: show.image.clone(),
            rss_feed_name: show.rss_feed_name.clone(),
            hashtag: show.hashtag.clone(),
            website: show.website.clone(),
            pv: show.pv.clone(),
            showboy_id: show.showboy_id.clone(),
            ann_id: show.ann_id.clone(),
            anilist_id: show.anilist_id.clone(),
            mal_id: show.mal_id.clone(),
            anidb_id: show.anidb_id.clone(),
            last_season: show.last_season.clone(),
            notes: show.notes.clone(),
            season_index,
        }
    }
}

/// One ranked episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRow {
    #[serde(rename = "seasonid")]
    pub season_id: Option<i64>,
    #[serde(rename = "originalid")]
    pub original_id: Option<i64>,
    #[serde(rename = "seasonindex")]
    pub season_index: SeasonIndex,
    pub week: u32,
    pub rank: u32,
    #[serde(rename = "episodenumber")]
    pub episode_number: Option<i64>,
    #[serde(rename = "hypelistrank")]
    pub hype_list_rank: Option<u32>,
}

/// Show extract rows of one record, in roster order
pub fn show_rows(record: &SeasonRecord) -> Vec<ShowRow> {
    let index = record.identity().index();
    record
        .roster()
        .iter()
        .map(|show| ShowRow::from_show(show, index))
        .collect()
}

/// Episode extract rows of one record: ranked episodes only, by week then
/// table row. Season ids come from the roster.
pub fn episode_rows(record: &SeasonRecord) -> Vec<EpisodeRow> {
    let index = record.identity().index();
    let mut rows = Vec::new();
    for week in record.weeks() {
        for episode in week.ranked() {
            let Some(rank) = episode.rank() else { continue };
            rows.push(EpisodeRow {
                season_id: episode.show().season_id,
                original_id: episode.show().original_id,
                season_index: index,
                week: week.week(),
                rank,
                episode_number: episode.episode_number(),
                hype_list_rank: episode.hype_rank,
            });
        }
    }
    rows
}

/// A show as it stood in the last week of its latest season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastEpisodeRow {
    #[serde(rename = "SeasonIndex")]
    pub season_index: SeasonIndex,
    #[serde(rename = "originalid")]
    pub original_id: i64,
    pub name: String,
    #[serde(rename = "ranktotal")]
    pub season_rank: Option<u32>,
}

/// Episodes of the record's last week that has any. Shows without an
/// original id are left out.
pub fn last_episode_rows(record: &SeasonRecord) -> Vec<LastEpisodeRow> {
    let index = record.identity().index();
    let Some(week) = record
        .weeks()
        .filter(|week| !week.episodes().is_empty())
        .last()
    else {
        tracing::debug!(season = %record.identity(), "Record has no episodes");
        return Vec::new();
    };
    week.episodes()
        .iter()
        .filter_map(|episode| {
            Some(LastEpisodeRow {
                season_index: index,
                original_id: episode.show().original_id?,
                name: episode.name().to_string(),
                season_rank: episode.season_rank(),
            })
        })
        .collect()
}

/// One row per show, from its latest season. Within a season the first
/// row wins. Output is ordered by original id.
pub fn merge_last_episodes(rows: impl IntoIterator<Item = LastEpisodeRow>) -> Vec<LastEpisodeRow> {
    let mut latest: BTreeMap<i64, LastEpisodeRow> = BTreeMap::new();
    for row in rows {
        match latest.get(&row.original_id) {
            Some(kept) if kept.season_index >= row.season_index => {}
            _ => {
                latest.insert(row.original_id, row);
            }
        }
    }
    latest.into_values().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub season: String,
    pub version: String,
    pub shows: usize,
    pub episodes: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompileSummary {
    pub parsed: Vec<ParsedFile>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Default)]
pub struct MasterExtract {
    pub shows: Vec<ShowRow>,
    pub episodes: Vec<EpisodeRow>,
    pub last_episodes: Vec<LastEpisodeRow>,
    pub summary: CompileSummary,
}

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub recurse: bool,
    /// Workbooks parsed at once
    pub jobs: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            recurse: false,
            jobs: crate::config::default_jobs(),
        }
    }
}

/// Record files under `dir`, sorted by path
pub fn list_record_files(dir: &Path, recurse: bool) -> Result<Vec<PathBuf>, CompileError> {
    if !dir.is_dir() {
        return Err(CompileError::DirectoryNotFound(dir.to_path_buf()));
    }
    let mut walker = WalkDir::new(dir).follow_links(true);
    if !recurse {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if is_valid_record_filename(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        } else {
            tracing::trace!(path = %entry.path().display(), "Not a record file");
        }
    }
    files.sort();
    Ok(files)
}

enum FileOutcome {
    Parsed {
        shows: Vec<ShowRow>,
        episodes: Vec<EpisodeRow>,
        last_episodes: Vec<LastEpisodeRow>,
        summary: ParsedFile,
    },
    Skipped(SkippedFile),
}

fn skipped(path: &Path, reason: String) -> FileOutcome {
    tracing::error!(path = %path.display(), %reason, "Skipping record file");
    FileOutcome::Skipped(SkippedFile {
        path: path.to_path_buf(),
        reason,
    })
}

fn compile_file(opener: &dyn WorkbookOpener, path: &Path) -> FileOutcome {
    let record = match record::open_record(opener, path) {
        Ok(record) => record,
        Err(err) => return skipped(path, err.to_string()),
    };
    let shows = show_rows(&record);
    let episodes = episode_rows(&record);
    let last_episodes = last_episode_rows(&record);
    tracing::info!(
        path = %path.display(),
        season = %record.identity(),
        shows = shows.len(),
        episodes = episodes.len(),
        warnings = record.warnings().len(),
        "Record compiled"
    );
    let summary = ParsedFile {
        path: path.to_path_buf(),
        season: record.identity().to_string(),
        version: record.version().to_string(),
        shows: shows.len(),
        episodes: episodes.len(),
        warnings: record.warnings().len(),
    };
    FileOutcome::Parsed {
        shows,
        episodes,
        last_episodes,
        summary,
    }
}

/// Parses `files` on the blocking pool, at most `jobs` at a time. Output
/// keeps the order of `files` whatever order parsing finishes in; files
/// that fail are listed as skipped.
pub async fn compile_files(
    opener: Arc<dyn WorkbookOpener>,
    files: Vec<PathBuf>,
    jobs: usize,
) -> MasterExtract {
    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (position, path) in files.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        let opener = Arc::clone(&opener);
        tasks.spawn(async move {
            // The semaphore is never closed, so this always holds a permit
            let _permit = permits.acquire_owned().await.ok();
            let task_path = path.clone();
            let outcome =
                tokio::task::spawn_blocking(move || compile_file(opener.as_ref(), &task_path))
                    .await
                    .unwrap_or_else(|err| skipped(&path, format!("parser task failed: {err}")));
            (position, outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => tracing::error!(error = %err, "Compile task failed"),
        }
    }
    outcomes.sort_by_key(|(position, _)| *position);

    let mut extract = MasterExtract::default();
    let mut last_episodes = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            FileOutcome::Parsed {
                shows,
                episodes,
                last_episodes: last,
                summary,
            } => {
                extract.shows.extend(shows);
                extract.episodes.extend(episodes);
                last_episodes.extend(last);
                extract.summary.parsed.push(summary);
            }
            FileOutcome::Skipped(file) => extract.summary.skipped.push(file),
        }
    }
    extract.last_episodes = merge_last_episodes(last_episodes);
    extract
}

/// Lists and compiles every record file under `dir`
pub async fn compile_directory(
    opener: Arc<dyn WorkbookOpener>,
    dir: &Path,
    options: CompileOptions,
) -> Result<MasterExtract, CompileError> {
    let files = list_record_files(dir, options.recurse)?;
    tracing::info!(
        dir = %dir.display(),
        files = files.len(),
        jobs = options.jobs,
        "Compiling season records"
    );
    Ok(compile_files(opener, files, options.jobs).await)
}

/// Writes rows under a fixed header; the header is written even when there
/// are no rows.
pub fn write_rows<W: io::Write, T: Serialize>(
    writer: W,
    columns: &[&str],
    rows: &[T],
) -> Result<(), CompileError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(columns)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_rows<R: io::Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>, CompileError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        rows.push(result?);
    }
    Ok(rows)
}

pub fn write_show_extract(path: &Path, rows: &[ShowRow]) -> Result<(), CompileError> {
    write_rows(File::create(path)?, &SHOW_COLUMNS, rows)
}

pub fn write_episode_extract(path: &Path, rows: &[EpisodeRow]) -> Result<(), CompileError> {
    write_rows(File::create(path)?, &EPISODE_COLUMNS, rows)
}

pub fn read_show_extract(path: &Path) -> Result<Vec<ShowRow>, CompileError> {
    read_rows(File::open(path)?)
}

pub fn write_last_episode_extract(path: &Path, rows: &[LastEpisodeRow]) -> Result<(), CompileError> {
    write_rows(File::create(path)?, &LAST_EPISODE_COLUMNS, rows)
}

pub fn read_last_episode_extract(path: &Path) -> Result<Vec<LastEpisodeRow>, CompileError> {
    read_rows(File::open(path)?)
}

pub fn read_episode_extract(path: &Path) -> Result<Vec<EpisodeRow>, CompileError> {
    read_rows(File::open(path)?)
}

pub fn write_summary(path: &Path, summary: &CompileSummary) -> Result<(), CompileError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary).map_err(io::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::*;
    use crate::error::WorkbookError;
    use crate::record::fixtures;
    use crate::workbook::{CellValue, MemoryWorkbook, Table, TableSource};

    struct MemoryOpener(HashMap<PathBuf, MemoryWorkbook>);

    impl MemoryOpener {
        fn new(books: Vec<MemoryWorkbook>) -> Self {
            Self(
                books
                    .into_iter()
                    .map(|book| (book.path().to_path_buf(), book))
                    .collect(),
            )
        }
    }

    impl WorkbookOpener for MemoryOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn TableSource>, WorkbookError> {
            match self.0.get(path) {
                Some(book) => Ok(Box::new(book.clone())),
                None => Err(WorkbookError::Open {
                    path: path.to_path_buf(),
                    reason: "no such workbook".to_string(),
                }),
            }
        }
    }

    fn season(path: &str, season: &str, year: i64, last_normalize: f64) -> MemoryWorkbook {
        MemoryWorkbook::new(path)
            .with_table(Table::build(
                "RecordStats",
                &["Year", "Season", "Version"],
                vec![vec![year.into(), season.into(), 3.0.into()]],
            ))
            .with_table(Table::build(
                "Stats",
                &["OriginalID", "Name", "Last Episode", "Last Normalize"],
                vec![
                    vec![101_i64.into(), "A".into(), 12_i64.into(), last_normalize.into()],
                    vec![205_i64.into(), "B".into(), CellValue::Empty, CellValue::Empty],
                ],
            ))
            .with_table(Table::build(
                "Week1",
                &["OriginalID", "Rank", "NewRank"],
                vec![
                    vec![101_i64.into(), 1_i64.into(), 2_i64.into()],
                    vec![205_i64.into(), 2_i64.into(), 1_i64.into()],
                ],
            ))
    }

    fn last(index: &str, original_id: i64, name: &str, season_rank: Option<u32>) -> LastEpisodeRow {
        LastEpisodeRow {
            season_index: index.parse().unwrap(),
            original_id,
            name: name.to_string(),
            season_rank,
        }
    }

    fn opener(books: Vec<MemoryWorkbook>) -> Arc<dyn WorkbookOpener> {
        Arc::new(MemoryOpener::new(books))
    }

    #[test]
    fn show_and_episode_rows_from_record() {
        let record = record::load_record(&mut fixtures::fall_2019()).unwrap();
        let shows = show_rows(&record);
        assert_eq!(shows.len(), 3);
        assert!(shows.iter().all(|row| row.season_index.to_string() == "2019.3"));
        assert_eq!(shows[0].season_id, Some(9001));

        let episodes = episode_rows(&record);
        // Week 2 leaves show C unranked
        assert_eq!(episodes.len(), 5);
        let first = &episodes[0];
        assert_eq!(
            (first.original_id, first.season_id, first.week, first.rank),
            (Some(101), Some(9001), 1, 3)
        );
        assert_eq!(first.hype_list_rank, Some(2));
        assert_eq!(first.episode_number, Some(13));
        assert!(episodes.iter().all(|row| row.rank > 0));
    }

    #[test]
    fn last_episodes_come_from_last_week_with_episodes() {
        let record = record::load_record(&mut fixtures::fall_2019()).unwrap();
        let rows = last_episode_rows(&record);
        // Week 2 lists show C without a rank; it still counts
        let ids: Vec<i64> = rows.iter().map(|row| row.original_id).collect();
        assert_eq!(ids, [101, 205, 310]);
        assert!(rows.iter().all(|row| row.season_rank.is_none()));
        assert!(rows.iter().all(|row| row.season_index.to_string() == "2019.3"));
    }

    #[test]
    fn latest_season_wins_per_show() {
        let merged = merge_last_episodes([
            last("2020.1", 101, "A", Some(4)),
            last("2019.3", 101, "A", Some(1)),
            last("2019.3", 205, "B", Some(2)),
            last("2019.3", 205, "B second", Some(3)),
            last("2021.0", 310, "C", None),
        ]);
        assert_eq!(
            merged,
            [
                last("2020.1", 101, "A", Some(4)),
                last("2019.3", 205, "B", Some(2)),
                last("2021.0", 310, "C", None),
            ]
        );
    }

    #[test]
    fn headers_match_extract_columns() {
        let record = record::load_record(&mut fixtures::fall_2019()).unwrap();
        let mut buffer = Vec::new();
        write_rows(&mut buffer, &SHOW_COLUMNS, &show_rows(&record)).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().next(), Some(SHOW_COLUMNS.join(",").as_str()));
        assert_eq!(text.lines().count(), 4);

        let mut buffer = Vec::new();
        write_rows::<_, EpisodeRow>(&mut buffer, &EPISODE_COLUMNS, &[]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().trim_end(), EPISODE_COLUMNS.join(","));
    }

    #[test]
    fn extracts_read_back() {
        let record = record::load_record(&mut fixtures::fall_2019()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let shows_path = dir.path().join(DEFAULT_SHOW_FILE);
        let episodes_path = dir.path().join(DEFAULT_EPISODE_FILE);

        write_show_extract(&shows_path, &show_rows(&record)).unwrap();
        write_episode_extract(&episodes_path, &episode_rows(&record)).unwrap();

        assert_eq!(read_show_extract(&shows_path).unwrap(), show_rows(&record));
        assert_eq!(read_episode_extract(&episodes_path).unwrap(), episode_rows(&record));

        let last_path = dir.path().join(DEFAULT_LAST_EPISODE_FILE);
        write_last_episode_extract(&last_path, &last_episode_rows(&record)).unwrap();
        let text = fs::read_to_string(&last_path).unwrap();
        assert_eq!(text.lines().next(), Some("SeasonIndex,originalid,name,ranktotal"));
        assert_eq!(read_last_episode_extract(&last_path).unwrap(), last_episode_rows(&record));
    }

    #[tokio::test]
    async fn one_show_row_per_season() {
        let books = vec![
            season("__Record Fall 2019.xlsx", "Fall", 2019, 4.5),
            season("__Record Winter 2020.xlsx", "Winter", 2020, 7.25),
        ];
        let files = books.iter().map(|book| book.path().to_path_buf()).collect();
        let extract = compile_files(opener(books), files, 2).await;

        let a_rows: Vec<String> = extract
            .shows
            .iter()
            .filter(|row| row.original_id == Some(101))
            .map(|row| row.season_index.to_string())
            .collect();
        assert_eq!(a_rows, ["2019.3", "2020.0"]);
        assert_eq!(extract.shows.len(), 4);
        assert_eq!(extract.episodes.len(), 4);
        assert_eq!(
            extract.last_episodes,
            [last("2020.0", 101, "A", Some(2)), last("2020.0", 205, "B", Some(1))]
        );
        assert!(extract.summary.skipped.is_empty());
    }

    #[tokio::test]
    async fn failed_file_is_skipped_and_order_kept() {
        let books = vec![
            season("__Record Spring 2019.xlsx", "Spring", 2019, 0.0),
            season("__Record Summer 2019.xlsx", "Summer", 2019, 0.0),
            MemoryWorkbook::new("__Record Fall 2019.xlsx")
                .with_table(Table::build("Stats", &["Name"], Vec::new())),
        ];
        let files: Vec<PathBuf> = vec![
            PathBuf::from("__Record Summer 2019.xlsx"),
            PathBuf::from("__Record Missing 2019.xlsx"),
            PathBuf::from("__Record Fall 2019.xlsx"),
            PathBuf::from("__Record Spring 2019.xlsx"),
        ];
        let extract = compile_files(opener(books), files, 3).await;

        let parsed: Vec<&str> = extract
            .summary
            .parsed
            .iter()
            .map(|file| file.season.as_str())
            .collect();
        assert_eq!(parsed, ["Summer 2019", "Spring 2019"]);

        let skipped: Vec<PathBuf> = extract
            .summary
            .skipped
            .iter()
            .map(|file| file.path.clone())
            .collect();
        assert_eq!(
            skipped,
            [
                PathBuf::from("__Record Missing 2019.xlsx"),
                PathBuf::from("__Record Fall 2019.xlsx")
            ]
        );
        assert!(extract.summary.skipped[1].reason.contains("RecordStats"));
        assert_eq!(extract.shows[0].season_index.to_string(), "2019.2");
    }

    #[test]
    fn lists_record_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2020");
        fs::create_dir(&nested).unwrap();
        for name in ["__Record Fall 2019.xlsx", "~$__Record Fall 2019.xlsx", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(nested.join("__Record Winter 2020.xls"), b"").unwrap();

        let flat = list_record_files(dir.path(), false).unwrap();
        assert_eq!(flat, [dir.path().join("__Record Fall 2019.xlsx")]);

        let deep = list_record_files(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 2);

        assert!(matches!(
            list_record_files(&dir.path().join("missing"), false),
            Err(CompileError::DirectoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn compile_directory_skips_unreadable_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("__Record Fall 2019.xlsx"), b"not a workbook").unwrap();
        let extract = compile_directory(
            Arc::new(crate::workbook::CalamineOpener),
            dir.path(),
            CompileOptions {
                recurse: false,
                jobs: 1,
            },
        )
        .await
        .unwrap();
        assert!(extract.summary.parsed.is_empty());
        assert_eq!(extract.summary.skipped.len(), 1);

        let summary_path = dir.path().join("summary.json");
        write_summary(&summary_path, &extract.summary).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(json["skipped"].as_array().map(Vec::len), Some(1));
    }
}
