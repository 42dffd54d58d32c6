use std::collections::HashMap;
use std::fmt::Write;

use crate::models::SeasonRecord;
use crate::normalize;

const UNLISTED_CHANNEL: &str = "unlisted";

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    pub channel: String,
    pub shows: usize,
    pub watching: usize,
}

pub fn summarize_by_channel(record: &SeasonRecord) -> Vec<ChannelSummary> {
    let mut map: HashMap<String, (usize, usize)> = HashMap::new();

    for show in record.roster().iter() {
        let channel = show
            .channel
            .clone()
            .unwrap_or_else(|| UNLISTED_CHANNEL.to_string());
        let entry = map.entry(channel).or_insert((0, 0));
        entry.0 += 1;
        if show.watching {
            entry.1 += 1;
        }
    }

    let mut summaries: Vec<ChannelSummary> = map
        .into_iter()
        .map(|(channel, (shows, watching))| ChannelSummary {
            channel,
            shows,
            watching,
        })
        .collect();

    summaries.sort_by(|a, b| b.shows.cmp(&a.shows).then_with(|| a.channel.cmp(&b.channel)));
    summaries
}

/// Markdown summary of one season. `top` caps the episodes listed per week.
pub fn build_report(record: &SeasonRecord, top: usize) -> String {
    let summaries = summarize_by_channel(record);

    let mut output = String::new();

    let _ = writeln!(output, "# Season Record Report");
    let _ = writeln!(
        output,
        "Generated for {} (record version {}, {} shows)",
        record.identity(),
        record.version(),
        record.roster().len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Channel Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No shows on the roster.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} shows ({} watching)",
                summary.channel, summary.shows, summary.watching
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Top Episodes");

    let mut ranked_weeks = 0;
    for week in record.weeks().filter(|week| week.has_rankings()) {
        ranked_weeks += 1;
        let _ = writeln!(output);
        let _ = writeln!(output, "### Week {}", week.week());
        match normalize::week_normalized(week) {
            Ok(values) => {
                for (episode, value) in values.iter().take(top) {
                    let _ = writeln!(
                        output,
                        "- #{} {} (normalized {:.2})",
                        episode.rank().unwrap_or_default(),
                        episode.name(),
                        value
                    );
                }
            }
            Err(err) => {
                let _ = writeln!(output, "Ranking unavailable: {err}.");
            }
        }
        let season_ranking: Vec<String> = normalize::season_ranking(week)
            .into_iter()
            .take(top)
            .map(|episode| {
                format!("{} (#{})", episode.name(), episode.season_rank().unwrap_or_default())
            })
            .collect();
        if !season_ranking.is_empty() {
            let _ = writeln!(output, "Season ranking: {}", season_ranking.join(", "));
        }
    }
    if ranked_weeks == 0 {
        let _ = writeln!(output, "No ranked weeks in this record.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Hype Lists");

    let mut listed_weeks = 0;
    for week in record.weeks() {
        let Some(list) = week.hype_list().filter(|list| !list.is_empty()) else {
            continue;
        };
        listed_weeks += 1;
        let names: Vec<&str> = normalize::hype_list_ranking(week)
            .into_iter()
            .filter(|episode| episode.hype_rank.is_some())
            .map(|episode| episode.name())
            .collect();
        let _ = writeln!(
            output,
            "- Week {} ({} listed): {}",
            week.week(),
            list.len(),
            names.join(", ")
        );
    }
    if listed_weeks == 0 {
        let _ = writeln!(output, "No hype lists recorded.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Season Standings");

    match normalize::standings(record, None) {
        Ok(standings) if standings.is_empty() => {
            let _ = writeln!(output, "No ranked episodes this season.");
        }
        Ok(standings) => {
            for (place, standing) in standings.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{}. {} average {:.3} across {} episodes",
                    place + 1,
                    standing.name,
                    standing.average,
                    standing.episodes
                );
            }
        }
        Err(err) => {
            let _ = writeln!(output, "Standings unavailable: {err}.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Data Quality");

    if record.warnings().is_empty() {
        let _ = writeln!(output, "No data-quality issues found.");
    } else {
        for warning in record.warnings() {
            let _ = writeln!(output, "- {warning}");
        }
    }

    output
}
