//! Hype list parsing

use crate::error::{ParseWarning, Warnings};
use crate::models::{HypeEntry, HypeList, PreviousHypeEntry, ShowKey, TableRef};
use crate::schema::HypeLayout;
use crate::workbook::{CellValue, Row, Table};

const OCCURRENCE_COLUMNS: &[&str] = &["occurrences", "occurences"];
const THIS_WEEK_COLUMNS: &[&str] = &["thisweek'srank", "thisweeksrank", "thisweekrank"];

fn position(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn occurrences(row: &Row) -> Option<i64> {
    row.first_present(OCCURRENCE_COLUMNS)
        .and_then(|(_, cell)| cell.as_i64())
}

/// Builds a week's hype list. `history` is only read for split lists.
pub fn build_hype_list(
    table: &Table,
    history: Option<&Table>,
    layout: HypeLayout,
    warnings: &mut Warnings,
) -> HypeList {
    let (entries, previous) = match layout {
        HypeLayout::Combined => {
            if let Some(history) = history {
                tracing::debug!(table = history.name(), "History table ignored for combined hype list");
            }
            combined(table)
        }
        HypeLayout::Split => (
            current_by_id(table, warnings),
            history
                .map(|history| previous_by_id(history, warnings))
                .unwrap_or_default(),
        ),
    };
    tracing::debug!(
        table = table.name(),
        entries = entries.len(),
        previous = previous.len(),
        "Hype list built"
    );

    HypeList {
        layout,
        table: TableRef::of(table),
        history: match layout {
            HypeLayout::Split => history.map(TableRef::of),
            HypeLayout::Combined => None,
        },
        entries,
        previous,
    }
}

// This week's list in `Name`, last week's in `Last List`; either column may
// run shorter than the other.
fn combined(table: &Table) -> (Vec<HypeEntry>, Vec<PreviousHypeEntry>) {
    let mut entries = Vec::new();
    let mut previous = Vec::new();
    for row in table.rows() {
        if let Some(name) = row.get("name").and_then(CellValue::as_text) {
            entries.push(HypeEntry {
                rank: position(entries.len() + 1),
                key: ShowKey::Name(name),
                occurrences: occurrences(&row),
            });
        }
        if let Some(name) = row.get("lastlist").and_then(CellValue::as_text) {
            previous.push(PreviousHypeEntry {
                rank: position(previous.len() + 1),
                key: ShowKey::Name(name.clone()),
                name: Some(name),
                this_week_rank: None,
            });
        }
    }
    (entries, previous)
}

fn original_id(row: &Row, table: &Table, warnings: &mut Warnings) -> Option<i64> {
    let cell = row.get("originalid")?;
    if cell.is_blank() {
        return None;
    }
    let id = cell.as_i64();
    if id.is_none() {
        warnings.push(ParseWarning::InvalidCell {
            table: table.name().to_string(),
            row: row.index(),
            column: "originalid".to_string(),
            value: cell.to_string(),
        });
    }
    id
}

// Split lists number every row, so a row without an id still takes up its
// position.
fn current_by_id(table: &Table, warnings: &mut Warnings) -> Vec<HypeEntry> {
    let mut entries = Vec::new();
    for (index, row) in table.rows().into_iter().enumerate() {
        let Some(id) = original_id(&row, table, warnings) else {
            continue;
        };
        entries.push(HypeEntry {
            rank: position(index + 1),
            key: ShowKey::OriginalId(id),
            occurrences: occurrences(&row),
        });
    }
    entries
}

fn previous_by_id(table: &Table, warnings: &mut Warnings) -> Vec<PreviousHypeEntry> {
    let mut previous = Vec::new();
    for (index, row) in table.rows().into_iter().enumerate() {
        let Some(id) = original_id(&row, table, warnings) else {
            continue;
        };
        previous.push(PreviousHypeEntry {
            rank: position(index + 1),
            key: ShowKey::OriginalId(id),
            name: row.get("name").and_then(CellValue::as_text),
            this_week_rank: row
                .first_present(THIS_WEEK_COLUMNS)
                .and_then(|(_, cell)| cell.as_i64())
                .and_then(|rank| u32::try_from(rank).ok())
                .filter(|rank| *rank > 0),
        });
    }
    previous
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combined_table() -> Table {
        Table::build(
            "Hype_Week2",
            &["Name", "Occurences", "Last List"],
            vec![
                vec!["ShowA".into(), 3_i64.into(), "ShowC".into()],
                vec!["ShowB".into(), 2_i64.into(), "ShowA".into()],
                vec!["ShowC".into(), CellValue::Empty, CellValue::Empty],
                vec![CellValue::Empty, CellValue::Empty, "ShowD".into()],
            ],
        )
    }

    #[test]
    fn combined_list_ranks_by_named_rows() {
        let mut warnings = Warnings::default();
        let list = build_hype_list(&combined_table(), None, HypeLayout::Combined, &mut warnings);

        assert_eq!(list.len(), 3);
        assert_eq!(list.rank(&ShowKey::Name("ShowB".to_string())), Some(2));
        assert_eq!(list.rank(&ShowKey::Name("ShowZ".to_string())), None);
        assert_eq!(list.entries()[0].occurrences, Some(3));

        let previous: Vec<&ShowKey> = list.previous().iter().map(|entry| &entry.key).collect();
        assert_eq!(previous.len(), 3);
        assert_eq!(previous[2], &ShowKey::Name("ShowD".to_string()));
        assert!(list.history().is_none());
        assert!(warnings.is_empty());
    }

    #[test]
    fn split_list_ranks_by_original_id() {
        let current = Table::build(
            "Hype_Week3",
            &["OriginalID", "Name"],
            vec![
                vec![101_i64.into(), "ShowA".into()],
                vec![205_i64.into(), "ShowB".into()],
                vec![CellValue::Empty, "note".into()],
                vec![310_i64.into(), "ShowC".into()],
            ],
        );
        let history = Table::build(
            "Hype_Week3_PreviousWeek",
            &["OriginalID", "Name", "This Week's Rank"],
            vec![
                vec![205_i64.into(), "ShowB".into(), 2_i64.into()],
                vec![404_i64.into(), "ShowD".into(), CellValue::Empty],
            ],
        );
        let mut warnings = Warnings::default();
        let list = build_hype_list(&current, Some(&history), HypeLayout::Split, &mut warnings);

        assert_eq!(list.rank(&ShowKey::OriginalId(205)), Some(2));
        // The id-less third row keeps its place
        assert_eq!(list.rank(&ShowKey::OriginalId(310)), Some(4));
        assert_eq!(list.len(), 3);
        assert_eq!(list.rank(&ShowKey::OriginalId(404)), None);
        assert_eq!(list.previous().len(), 2);
        assert_eq!(list.previous()[0].this_week_rank, Some(2));
        assert_eq!(list.previous()[1].name.as_deref(), Some("ShowD"));
        assert_eq!(list.history().map(|t| t.name.as_str()), Some("Hype_Week3_PreviousWeek"));
    }

    #[test]
    fn split_list_blank_rows_keep_positions() {
        let current = Table::build(
            "Hype_Week5",
            &["OriginalID"],
            vec![
                vec![CellValue::Empty],
                vec![101_i64.into()],
                vec![CellValue::Empty],
                vec![CellValue::Empty],
                vec![205_i64.into()],
            ],
        );
        let history = Table::build(
            "Hype_Week5_PreviousWeek",
            &["OriginalID", "Name"],
            vec![vec![CellValue::Empty, CellValue::Empty], vec![310_i64.into(), "ShowC".into()]],
        );
        let mut warnings = Warnings::default();
        let list = build_hype_list(&current, Some(&history), HypeLayout::Split, &mut warnings);

        let ranks: Vec<(u32, &ShowKey)> = list.entries().iter().map(|e| (e.rank, &e.key)).collect();
        assert_eq!(
            ranks,
            [(2, &ShowKey::OriginalId(101)), (5, &ShowKey::OriginalId(205))]
        );
        assert_eq!(list.previous()[0].rank, 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn split_list_without_history() {
        let current = Table::build(
            "Hype_Week1",
            &["OriginalID"],
            vec![vec![101_i64.into()], vec!["abc".into()]],
        );
        let mut warnings = Warnings::default();
        let list = build_hype_list(&current, None, HypeLayout::Split, &mut warnings);
        assert_eq!(list.len(), 1);
        assert!(list.previous().is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
