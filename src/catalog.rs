//! Table classification by display name

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{ParseWarning, Warnings};
use crate::workbook::Table;

/// Which of the three cut tables of a week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutKind {
    Table,
    Settings,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    WeeklyRanking,
    WeeklyOverallRanking,
}

/// What a table holds, as told by its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    RecordStats,
    ShowRoster,
    Ranking(u32),
    Hype(u32),
    HypeHistory(u32),
    Cut(u32, CutKind),
    Roundup(u32),
    RenewalRoundup(u32),
    ChartData(ChartKind),
    Awards,
    Unknown,
}

impl TableKind {
    pub fn week(&self) -> Option<u32> {
        match *self {
            TableKind::Ranking(week)
            | TableKind::Hype(week)
            | TableKind::HypeHistory(week)
            | TableKind::Cut(week, _)
            | TableKind::Roundup(week)
            | TableKind::RenewalRoundup(week) => Some(week),
            _ => None,
        }
    }
}

struct Rule {
    pattern: Regex,
    kind: fn(&Captures<'_>) -> Option<TableKind>,
}

fn week_number(captures: &Captures<'_>) -> Option<u32> {
    captures
        .get(1)
        .and_then(|week| week.as_str().parse::<u32>().ok())
        .filter(|week| *week > 0)
}

// Hype lists are matched before their history tables
fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |pattern: &str, kind: fn(&Captures<'_>) -> Option<TableKind>| Rule {
            pattern: Regex::new(&format!("(?i){pattern}")).expect("table name pattern is valid"),
            kind,
        };
        vec![
            rule(r"^RecordStats\s*$", |_| Some(TableKind::RecordStats)),
            rule(r"^Stats\s*$", |_| Some(TableKind::ShowRoster)),
            rule(r"^Week[\s_]*(\d+)\s*$", |c| week_number(c).map(TableKind::Ranking)),
            rule(r"^Hype[\s_]*Week[\s_]*(\d+)\s*$", |c| {
                week_number(c).map(TableKind::Hype)
            }),
            rule(r"^Hype_Week(\d+)_PreviousWeek\s*$", |c| {
                week_number(c).map(TableKind::HypeHistory)
            }),
            rule(r"^Week[\s_]*(\d+)Cut(Settings|Results)?\s*$", |c| {
                let sub = match c.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
                    None => CutKind::Table,
                    Some(suffix) if suffix == "settings" => CutKind::Settings,
                    Some(_) => CutKind::Results,
                };
                week_number(c).map(|week| TableKind::Cut(week, sub))
            }),
            rule(r"^Week[\s_]*(\d+)Roundup\s*$", |c| {
                week_number(c).map(TableKind::Roundup)
            }),
            rule(r"^Week[\s_]*(\d+)RenewalRoundup\s*$", |c| {
                week_number(c).map(TableKind::RenewalRoundup)
            }),
            rule(r"^Chart\s*Data_(WeeklyRanking|WeeklyOverallRanking)\s*$", |c| {
                let overall = c
                    .get(1)
                    .is_some_and(|m| m.as_str().eq_ignore_ascii_case("WeeklyOverallRanking"));
                Some(TableKind::ChartData(if overall {
                    ChartKind::WeeklyOverallRanking
                } else {
                    ChartKind::WeeklyRanking
                }))
            }),
            rule(r"^AnimeAwards\s*$", |_| Some(TableKind::Awards)),
        ]
    })
}

/// Classifies a table by name. The first matching rule wins.
pub fn classify(name: &str) -> TableKind {
    rules()
        .iter()
        .find_map(|rule| {
            rule.pattern
                .captures(name)
                .and_then(|captures| (rule.kind)(&captures))
        })
        .unwrap_or(TableKind::Unknown)
}

/// Tables belonging to one week
#[derive(Debug, Default, Clone)]
pub struct WeekTables<'a> {
    pub ranking: Option<&'a Table>,
    pub hype: Option<&'a Table>,
    pub history: Option<&'a Table>,
    pub cut: Option<&'a Table>,
    pub cut_settings: Option<&'a Table>,
    pub cut_results: Option<&'a Table>,
    pub roundup: Option<&'a Table>,
    pub renewal_roundup: Option<&'a Table>,
}

impl<'a> WeekTables<'a> {
    fn slot(&mut self, kind: TableKind) -> Option<&mut Option<&'a Table>> {
        match kind {
            TableKind::Ranking(_) => Some(&mut self.ranking),
            TableKind::Hype(_) => Some(&mut self.hype),
            TableKind::HypeHistory(_) => Some(&mut self.history),
            TableKind::Cut(_, CutKind::Table) => Some(&mut self.cut),
            TableKind::Cut(_, CutKind::Settings) => Some(&mut self.cut_settings),
            TableKind::Cut(_, CutKind::Results) => Some(&mut self.cut_results),
            TableKind::Roundup(_) => Some(&mut self.roundup),
            TableKind::RenewalRoundup(_) => Some(&mut self.renewal_roundup),
            _ => None,
        }
    }
}

/// A workbook's tables sorted by kind and week
#[derive(Debug, Default)]
pub struct TableCatalog<'a> {
    record_stats: Option<&'a Table>,
    roster: Option<&'a Table>,
    weeks: BTreeMap<u32, WeekTables<'a>>,
    record_level: Vec<(TableKind, &'a Table)>,
}

impl<'a> TableCatalog<'a> {
    /// Sorts every table; unknown names and repeated week tables become
    /// warnings and are left out.
    pub fn build(tables: &'a BTreeMap<String, Table>, warnings: &mut Warnings) -> Self {
        let mut catalog = TableCatalog::default();
        for (name, table) in tables {
            let kind = classify(name);
            match kind {
                TableKind::RecordStats => catalog.record_stats = Some(table),
                TableKind::ShowRoster => catalog.roster = Some(table),
                TableKind::ChartData(_) | TableKind::Awards => {
                    catalog.record_level.push((kind, table))
                }
                TableKind::Unknown => warnings.push(ParseWarning::UnknownTable {
                    table: name.clone(),
                }),
                _ => {
                    let Some(week) = kind.week() else { continue };
                    let tables = catalog.weeks.entry(week).or_default();
                    if let Some(slot) = tables.slot(kind) {
                        if slot.is_some() {
                            warnings.push(ParseWarning::DuplicateWeekTable {
                                table: name.clone(),
                                week,
                            });
                        } else {
                            *slot = Some(table);
                        }
                    }
                }
            }
        }
        tracing::debug!(
            weeks = catalog.weeks.len(),
            extras = catalog.record_level.len(),
            "Tables catalogued"
        );
        catalog
    }

    pub fn record_stats(&self) -> Option<&'a Table> {
        self.record_stats
    }

    pub fn roster(&self) -> Option<&'a Table> {
        self.roster
    }

    /// Week tables in ascending week order
    pub fn weeks(&self) -> impl Iterator<Item = (u32, &WeekTables<'a>)> {
        self.weeks.iter().map(|(week, tables)| (*week, tables))
    }

    /// Chart data and awards tables
    pub fn record_level(&self) -> &[(TableKind, &'a Table)] {
        &self.record_level
    }
}
