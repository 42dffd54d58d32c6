//! Rank normalization and season standings
//!
//! Everything here reads an already built [`SeasonRecord`]; nothing is
//! cached or mutated.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::RankingError;
use crate::models::{EpisodeRecord, SeasonRecord, ShowKey, WeekRankingSheet};

const FLOOR: f64 = 0.0;
const CEILING: f64 = 1.0;

fn rank_bounds(week: &WeekRankingSheet) -> Option<(u32, u32)> {
    let mut ranks = week.ranked().filter_map(EpisodeRecord::rank);
    let first = ranks.next()?;
    Some(ranks.fold((first, first), |(min, max), rank| {
        (min.min(rank), max.max(rank))
    }))
}

/// Min-max normalizes an episode's rank against the ranked episodes of
/// `week`: the best rank maps to 0 and the worst to 1.
pub fn normalize(episode: &EpisodeRecord, week: &WeekRankingSheet) -> Result<f64, RankingError> {
    let unranked = || RankingError::Unranked {
        week: week.week(),
        show: episode.name().to_string(),
    };
    let rank = episode.rank().ok_or_else(unranked)?;
    let (min, max) = rank_bounds(week).ok_or_else(unranked)?;
    if min == max {
        return Err(RankingError::DivisionByZero {
            week: week.week(),
            rank: min,
        });
    }
    let spread = f64::from(max) - f64::from(min);
    Ok(FLOOR + (f64::from(rank) - f64::from(min)) * (CEILING - FLOOR) / spread)
}

/// Ranked episodes of a week, best first. Ties go to the show name in
/// plain byte order, so `Zeta` sorts before `alpha`.
pub fn episode_ranking(week: &WeekRankingSheet) -> Vec<&EpisodeRecord> {
    let mut ranked: Vec<&EpisodeRecord> = week.ranked().collect();
    ranked.sort_by(|a, b| a.rank().cmp(&b.rank()).then_with(|| a.name().cmp(b.name())));
    ranked
}

/// Episodes carrying a season rank, by that rank. Ties break on name as in
/// [`episode_ranking`].
pub fn season_ranking(week: &WeekRankingSheet) -> Vec<&EpisodeRecord> {
    let mut ranked: Vec<&EpisodeRecord> = week
        .episodes()
        .iter()
        .filter(|episode| episode.season_rank().is_some())
        .collect();
    ranked.sort_by(|a, b| {
        a.season_rank()
            .cmp(&b.season_rank())
            .then_with(|| a.name().cmp(b.name()))
    });
    ranked
}

/// Every episode of a week by hype list position. Episodes off the list
/// follow the listed ones, by name.
pub fn hype_list_ranking(week: &WeekRankingSheet) -> Vec<&EpisodeRecord> {
    let mut episodes: Vec<&EpisodeRecord> = week.episodes().iter().collect();
    episodes.sort_by(|a, b| {
        let order = match (a.hype_rank, b.hype_rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        order.then_with(|| a.name().cmp(b.name()))
    });
    episodes
}

/// Normalized values of a week's ranked episodes, in ranking order
pub fn week_normalized(
    week: &WeekRankingSheet,
) -> Result<Vec<(&EpisodeRecord, f64)>, RankingError> {
    episode_ranking(week)
        .into_iter()
        .map(|episode| Ok((episode, normalize(episode, week)?)))
        .collect()
}

/// Ranking of one week of the record
pub fn week_ranking(
    record: &SeasonRecord,
    week: u32,
) -> Result<Vec<(&EpisodeRecord, f64)>, RankingError> {
    let sheet = record.week(week).ok_or(RankingError::UnknownWeek(week))?;
    week_normalized(sheet)
}

fn resolve_upto(record: &SeasonRecord, upto_week: Option<u32>) -> Option<u32> {
    upto_week.or_else(|| record.last_week().map(WeekRankingSheet::week))
}

/// Sum of normalized values per show over weeks `1..=upto_week`.
///
/// Without `upto_week` the sum runs to the last week with a ranked episode.
pub fn season_cumulative(
    record: &SeasonRecord,
    upto_week: Option<u32>,
) -> Result<BTreeMap<ShowKey, f64>, RankingError> {
    let mut totals = BTreeMap::new();
    let Some(upto) = resolve_upto(record, upto_week) else {
        return Ok(totals);
    };
    for week in record.weeks().filter(|week| week.week() <= upto) {
        for episode in week.ranked() {
            *totals.entry(episode.key().clone()).or_insert(0.0) += normalize(episode, week)?;
        }
    }
    Ok(totals)
}

/// Cumulative value of one show; 0 for shows that never ranked
pub fn show_cumulative(
    record: &SeasonRecord,
    key: &ShowKey,
    upto_week: Option<u32>,
) -> Result<f64, RankingError> {
    Ok(season_cumulative(record, upto_week)?
        .get(key)
        .copied()
        .unwrap_or(0.0))
}

/// A show's place in the season so far
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub key: ShowKey,
    pub name: String,
    pub total: f64,
    pub episodes: usize,
    pub average: f64,
}

/// Shows ordered by average normalized rank, best first
pub fn standings(
    record: &SeasonRecord,
    upto_week: Option<u32>,
) -> Result<Vec<Standing>, RankingError> {
    let Some(upto) = resolve_upto(record, upto_week) else {
        return Ok(Vec::new());
    };
    let mut by_show: BTreeMap<ShowKey, Standing> = BTreeMap::new();
    for week in record.weeks().filter(|week| week.week() <= upto) {
        for episode in week.ranked() {
            let value = normalize(episode, week)?;
            let entry = by_show
                .entry(episode.key().clone())
                .or_insert_with(|| Standing {
                    key: episode.key().clone(),
                    name: episode.name().to_string(),
                    total: 0.0,
                    episodes: 0,
                    average: 0.0,
                });
            entry.total += value;
            entry.episodes += 1;
        }
    }

    let mut values: Vec<Standing> = by_show
        .into_values()
        .map(|mut standing| {
            standing.average = standing.total / standing.episodes as f64;
            standing
        })
        .collect();
    values.sort_by(|a, b| {
        a.average
            .partial_cmp(&b.average)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(values)
}
