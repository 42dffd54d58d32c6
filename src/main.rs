use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use season_record::config::{self, Config};
use season_record::master::{self, CompileOptions};
use season_record::{normalize, report, CalamineOpener, SeasonRecord};

#[derive(Parser)]
#[command(name = "season-record")]
#[command(about = "Seasonal ranking record reader and master extract compiler", long_about = None)]
struct Cli {
    /// Config file (defaults to season-record.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More log output; repeat for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every record file in a directory into the master extracts
    Compile {
        #[arg(default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        recurse: bool,
        #[arg(long, conflicts_with = "no_shows")]
        shows: Option<PathBuf>,
        #[arg(long)]
        no_shows: bool,
        #[arg(long, conflicts_with = "no_episodes")]
        episodes: Option<PathBuf>,
        #[arg(long)]
        no_episodes: bool,
        /// Also write each show's last-week standing from its latest season
        #[arg(long)]
        last_episodes: Option<PathBuf>,
        #[arg(long)]
        jobs: Option<usize>,
        /// Write a JSON summary of parsed and skipped files
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Parse one record and describe it
    Inspect { file: PathBuf },
    /// Weekly episode ranking and season standings
    Rank {
        file: PathBuf,
        #[arg(long)]
        week: Option<u32>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown season report
    Report {
        file: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
}

fn init_tracing(verbose: u8, config: &Config) {
    let directive = config.log_directive(verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("Ignoring log filter `{directive}`: {err}");
        EnvFilter::new(config::DEFAULT_LOG_LEVEL)
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_record(file: &Path) -> anyhow::Result<SeasonRecord> {
    season_record::open_record(&CalamineOpener, file)
        .with_context(|| format!("failed to read record {}", file.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(cli.verbose, &config);

    match cli.command {
        Commands::Compile {
            dir,
            recurse,
            shows,
            no_shows,
            episodes,
            no_episodes,
            last_episodes,
            jobs,
            summary,
        } => {
            let options = CompileOptions {
                recurse: recurse || config.compile.recurse.unwrap_or(false),
                jobs: jobs
                    .or(config.compile.jobs)
                    .unwrap_or_else(config::default_jobs),
            };
            let shows_file = (!no_shows).then(|| {
                shows
                    .or_else(|| config.compile.shows_file.clone())
                    .unwrap_or_else(|| PathBuf::from(master::DEFAULT_SHOW_FILE))
            });
            let episodes_file = (!no_episodes).then(|| {
                episodes
                    .or_else(|| config.compile.episodes_file.clone())
                    .unwrap_or_else(|| PathBuf::from(master::DEFAULT_EPISODE_FILE))
            });
            let last_episodes_file =
                last_episodes.or_else(|| config.compile.last_episodes_file.clone());
            let summary_file = summary.or_else(|| config.compile.summary_file.clone());

            let extract = master::compile_directory(Arc::new(CalamineOpener), &dir, options)
                .await
                .with_context(|| format!("failed to compile records in {}", dir.display()))?;

            if let Some(path) = &shows_file {
                master::write_show_extract(path, &extract.shows)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Wrote {} show rows to {}.", extract.shows.len(), path.display());
            }
            if let Some(path) = &episodes_file {
                master::write_episode_extract(path, &extract.episodes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!(
                    "Wrote {} episode rows to {}.",
                    extract.episodes.len(),
                    path.display()
                );
            }
            if let Some(path) = &last_episodes_file {
                master::write_last_episode_extract(path, &extract.last_episodes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!(
                    "Wrote {} last-episode rows to {}.",
                    extract.last_episodes.len(),
                    path.display()
                );
            }
            if let Some(path) = &summary_file {
                master::write_summary(path, &extract.summary)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }

            println!(
                "Parsed {} files, skipped {}.",
                extract.summary.parsed.len(),
                extract.summary.skipped.len()
            );
            for skipped in &extract.summary.skipped {
                println!("- {}: {}", skipped.path.display(), skipped.reason);
            }
        }
        Commands::Inspect { file } => {
            let record = parse_record(&file)?;
            println!("{} (record version {})", record.identity(), record.version());
            println!("Season index: {}", record.identity().index());
            if let Some(target) = record.metadata().target_show_count {
                println!("Target shows: {target}");
            }
            println!("Shows: {}", record.roster().len());
            for week in record.weeks() {
                println!(
                    "- Week {}: {} episodes, {} ranked, hype list {}",
                    week.week(),
                    week.episodes().len(),
                    week.ranked().count(),
                    week.hype_list().map_or(0, |list| list.len())
                );
            }
            if record.warnings().is_empty() {
                println!("No warnings.");
            } else {
                println!("Warnings:");
                for warning in record.warnings() {
                    println!("- {warning}");
                }
            }
        }
        Commands::Rank { file, week, limit } => {
            let record = parse_record(&file)?;
            let Some(week) = week.or_else(|| record.last_week().map(|sheet| sheet.week())) else {
                println!("No ranked weeks in {}.", record.identity());
                return Ok(());
            };

            let ranking = normalize::week_ranking(&record, week)
                .with_context(|| format!("failed to rank week {week}"))?;
            println!("Week {week} of {}:", record.identity());
            for (episode, value) in ranking.iter().take(limit) {
                println!(
                    "- #{} {} (normalized {:.2})",
                    episode.rank().unwrap_or_default(),
                    episode.name(),
                    value
                );
            }

            let season_ranking = record
                .week(week)
                .map(normalize::season_ranking)
                .unwrap_or_default();
            if !season_ranking.is_empty() {
                println!("Season ranking after week {week}:");
                for episode in season_ranking.iter().take(limit) {
                    println!(
                        "- #{} {}",
                        episode.season_rank().unwrap_or_default(),
                        episode.name()
                    );
                }
            }

            let standings = normalize::standings(&record, Some(week))
                .with_context(|| format!("failed to compute standings through week {week}"))?;
            println!("Standings through week {week}:");
            for standing in standings.iter().take(limit) {
                println!(
                    "- {} average {:.3} across {} episodes",
                    standing.name, standing.average, standing.episodes
                );
            }
        }
        Commands::Report { file, out, top } => {
            let record = parse_record(&file)?;
            let report = report::build_report(&record, top);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
