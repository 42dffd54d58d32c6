//! Season identity and record filename matching

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RecordError;

/// Broadcast season, in calendar order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a season: `{0}`")]
pub struct SeasonParseError(pub String);

impl FromStr for Season {
    type Err = SeasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "winter" | "0" | "w" | "wi" | "win" => Ok(Season::Winter),
            "spring" | "1" | "sp" | "spr" => Ok(Season::Spring),
            "summer" | "2" | "su" | "sum" => Ok(Season::Summer),
            "fall" | "3" | "f" | "fa" | "fal" => Ok(Season::Fall),
            _ => Err(SeasonParseError(s.to_string())),
        }
    }
}

/// A season of a specific year, e.g. `Fall 2019`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeasonIdentity {
    // Field order gives chronological ordering
    year: i32,
    season: Season,
}

impl SeasonIdentity {
    pub fn new(season: Season, year: i32) -> Self {
        Self { year, season }
    }

    pub fn season(&self) -> Season {
        self.season
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn index(&self) -> SeasonIndex {
        SeasonIndex {
            year: self.year,
            season: self.season.index(),
        }
    }

    /// Moves `steps` seasons forward (or backward when negative). `None`
    /// when the year leaves the `i32` range.
    pub fn step(&self, steps: i32) -> Option<Self> {
        let total = self
            .year
            .checked_mul(4)?
            .checked_add(i32::from(self.season.index()))?
            .checked_add(steps)?;
        let year = total.div_euclid(4);
        let season = Season::ALL[total.rem_euclid(4) as usize];
        Some(Self { year, season })
    }

    pub fn next(&self) -> Option<Self> {
        self.step(1)
    }

    pub fn previous(&self) -> Option<Self> {
        self.step(-1)
    }
}

impl fmt::Display for SeasonIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.season, self.year)
    }
}

impl FromStr for SeasonIdentity {
    type Err = SeasonParseError;

    /// Accepts `Winter 2019`, `2019 Winter`, `winter_2019`, `W-2019` and
    /// the numeric index form `2019.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<SeasonIndex>() {
            return Ok(index.identity());
        }

        let parts: Vec<&str> = trimmed
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect();
        let [first, second] = parts.as_slice() else {
            return Err(SeasonParseError(s.to_string()));
        };

        let (season, year) = match (first.parse::<i32>(), second.parse::<i32>()) {
            (Err(_), Ok(year)) => (*first, year),
            (Ok(year), Err(_)) => (*second, year),
            _ => return Err(SeasonParseError(s.to_string())),
        };
        let season = season
            .parse::<Season>()
            .map_err(|_| SeasonParseError(s.to_string()))?;
        Ok(Self::new(season, year))
    }
}

/// Numeric season index, `year.season` (e.g. `2019.3` for Fall 2019)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeasonIndex {
    year: i32,
    season: u8,
}

impl SeasonIndex {
    pub fn identity(&self) -> SeasonIdentity {
        SeasonIdentity::new(Season::ALL[usize::from(self.season)], self.year)
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.year) + f64::from(self.season) / 10.0
    }
}

impl fmt::Display for SeasonIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.year, self.season)
    }
}

impl FromStr for SeasonIndex {
    type Err = SeasonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || SeasonParseError(s.to_string());
        let (year, season) = s.trim().split_once('.').ok_or_else(error)?;
        let year = year.parse::<i32>().map_err(|_| error())?;
        let season = season.parse::<i64>().map_err(|_| error())?;
        let season = Season::from_index(season).ok_or_else(error)?;
        Ok(Self {
            year,
            season: season.index(),
        })
    }
}

impl TryFrom<String> for SeasonIndex {
    type Error = SeasonParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeasonIndex> for String {
    fn from(value: SeasonIndex) -> Self {
        value.to_string()
    }
}

const LOCK_MARKER: &str = "~$";

fn filename_regex() -> &'static Regex {
    static FILENAME_RE: OnceLock<Regex> = OnceLock::new();
    FILENAME_RE.get_or_init(|| {
        Regex::new(r"(?i)^__Record\s+.*?[a-z]+[\s_-]*\d{4}.*\.xlsx?$")
            .expect("record filename pattern is valid")
    })
}

fn season_token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| {
        Regex::new(r"(?i)(?P<season>[a-z]+)[\s_-]*(?P<year>\d{4})")
            .expect("season token pattern is valid")
    })
}

fn file_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(name)
}

/// True for `__Record <Season> <Year>...xlsx|xls` names. Spreadsheet lock
/// files (`~$...`) never match.
pub fn is_valid_record_filename(name: &str) -> bool {
    let name = file_name(name);
    !name.starts_with(LOCK_MARKER) && filename_regex().is_match(name)
}

/// Extracts the season identity from a record filename
pub fn extract_season_from_filename(name: &str) -> Result<SeasonIdentity, RecordError> {
    let base = file_name(name);
    let error = || RecordError::FilenameParse {
        filename: base.to_string(),
    };

    for captures in season_token_regex().captures_iter(base) {
        let (Some(season), Some(year)) = (captures.name("season"), captures.name("year")) else {
            continue;
        };
        if base[..season.start()].contains(LOCK_MARKER) {
            return Err(error());
        }
        let Ok(parsed) = season.as_str().parse::<Season>() else {
            continue;
        };
        let year = year.as_str().parse::<i32>().map_err(|_| error())?;
        return Ok(SeasonIdentity::new(parsed, year));
    }
    Err(error())
}
