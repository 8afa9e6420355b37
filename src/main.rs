use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lingua_srs::config::Config;
use lingua_srs::database::db::{advance_day, get_current_date};
use lingua_srs::database::{ReviewRepository, SqliteRepository};
use lingua_srs::export::json::{export_states_to_path, import_into};
use lingua_srs::models::{Clock, FixedClock, SystemClock};
use lingua_srs::{ItemId, Quality, Rating, ReviewSession, ReviewState, Scheduler, StageCounts};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

/// Spaced repetition scheduler for vocabulary practice
#[derive(Parser)]
#[command(name = "lingua-srs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SM-2 review scheduling for vocabulary items")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "LINGUA_SRS_DB")]
    db: Option<PathBuf>,

    /// Learner whose progress is read and written
    #[arg(long, global = true, env = "LINGUA_SRS_USER")]
    user: Option<String>,

    /// Use the simulated date stored in the database as "now"
    #[arg(long, global = true)]
    simulated_clock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one review of an item
    Review {
        /// Item identifier
        item: String,
        /// 0-5, or again / hard / good / easy
        quality: String,
    },

    /// List items due for review
    Due,

    /// Show the scheduling state of an item
    Show {
        item: String,
    },

    /// Count items per stage
    Stats,

    /// Review every due item interactively
    Practice,

    /// Move the simulated date forward by one day
    AdvanceDay,

    /// Write all progress to a JSON file
    Export {
        output: PathBuf,
    },

    /// Load progress from a JSON file
    Import {
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = Config::new(cli.db, cli.user, cli.simulated_clock);
    debug!(db = %config.db_path.display(), user = %config.user, "Configuration resolved");

    let mut repo = SqliteRepository::open(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let clock = FixedClock::new(current_time(&config, &repo)?);

    match cli.command {
        Commands::Review { item, quality } => run_review(&config, &mut repo, &clock, item, &quality),
        Commands::Due => run_due(&config, &repo, &clock),
        Commands::Show { item } => run_show(&config, &repo, &clock, item),
        Commands::Stats => run_stats(&config, &repo, &clock),
        Commands::Practice => run_practice(&config, &mut repo, &clock),
        Commands::AdvanceDay => {
            let today = advance_day(repo.connection())?;
            println!("Simulated date is now {}", format_date(today));
            Ok(())
        }
        Commands::Export { output } => {
            let states = repo.all(&config.user)?;
            export_states_to_path(&states, &output)?;
            println!("Exported {} items to {}", states.len(), output.display());
            Ok(())
        }
        Commands::Import { file } => {
            let count = import_into(&mut repo, &config.user, &file)?;
            println!("Imported {} items from {}", count, file.display());
            Ok(())
        }
    }
}

fn current_time(config: &Config, repo: &SqliteRepository) -> anyhow::Result<DateTime<Utc>> {
    if config.simulated_clock {
        Ok(get_current_date(repo.connection())?)
    } else {
        Ok(SystemClock.now())
    }
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn print_state(state: &ReviewState, now: DateTime<Utc>) {
    let due = if state.is_due(now) { " (due)" } else { "" };
    println!(
        "{:<24} {:<10} EF {:.2}  interval {:>4}d  reps {:>3}  next {}{}",
        state.item_id,
        state.stage(),
        state.easiness_factor,
        state.interval,
        state.repetitions,
        format_date(state.next_review_at),
        due
    );
}

fn run_review(
    config: &Config,
    repo: &mut SqliteRepository,
    clock: &FixedClock,
    item: String,
    quality: &str,
) -> anyhow::Result<()> {
    let quality: Quality = quality.parse()?;
    let item = ItemId::from(item);
    let scheduler = Scheduler::new(clock);

    let previous = repo.load(&config.user, &item)?;
    let next = scheduler.review(previous.as_ref(), &item, quality)?;
    repo.save(&config.user, &next)?;

    print_state(&next, clock.now());
    Ok(())
}

fn run_due(config: &Config, repo: &SqliteRepository, clock: &FixedClock) -> anyhow::Result<()> {
    let now = clock.now();
    let due = repo.due(&config.user, now)?;
    if due.is_empty() {
        println!("Nothing due. Come back later!");
    }
    for state in &due {
        print_state(state, now);
    }
    Ok(())
}

fn run_show(
    config: &Config,
    repo: &SqliteRepository,
    clock: &FixedClock,
    item: String,
) -> anyhow::Result<()> {
    let item = ItemId::from(item);
    match repo.load(&config.user, &item)? {
        Some(state) => print_state(&state, clock.now()),
        None => println!("{} has never been reviewed", item),
    }
    Ok(())
}

fn run_stats(config: &Config, repo: &SqliteRepository, clock: &FixedClock) -> anyhow::Result<()> {
    let states = repo.all(&config.user)?;
    let counts = StageCounts::from_states(&states, clock.now());

    println!("Progress for {}", config.user);
    println!("  New:       {}", counts.new);
    println!("  Learning:  {}", counts.learning);
    println!("  Reviewing: {}", counts.reviewing);
    println!("  Lapsed:    {}", counts.lapsed);
    println!("  Total:     {}", counts.total());
    println!("  Due now:   {}", counts.due);
    Ok(())
}

fn run_practice(
    config: &Config,
    repo: &mut SqliteRepository,
    clock: &FixedClock,
) -> anyhow::Result<()> {
    let mut session = ReviewSession::start(config.user.clone(), repo, clock)?;
    if session.is_completed() {
        println!("Nothing due. Come back later!");
        return Ok(());
    }

    let buttons = Rating::ALL
        .iter()
        .map(|r| format!("{}={}", r.label(), r.quality_value()))
        .collect::<Vec<_>>()
        .join(", ");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut round = 0;

    while let Some(state) = session.current().cloned() {
        if session.round() != round {
            round = session.round();
            println!("{}", session.phase_message());
        }

        print!("{}  [{}] > ", state.item_id, buttons);
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            println!();
            println!("Session stopped, {} items left", session.remaining_count());
            return Ok(());
        };

        match line.parse::<Quality>() {
            Ok(quality) => {
                let next = session.grade(quality)?;
                println!("  next review in {} day(s)", next.interval);
            }
            Err(e) => println!("  {}", e),
        }
    }

    println!("All items passed in {} round(s).", session.round());
    Ok(())
}
