use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use gains_core::config::{DataConfig, MAX_WINDOW_DAYS};
use gains_core::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gains")]
#[command(about = "Daily bodyweight and running progress tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Treat this day (YYYY-MM-DD) as today instead of the current UTC date
    #[arg(long, global = true)]
    date: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add to today's count for an exercise
    Inc {
        /// pushups, situps, squats or running
        exercise: ExerciseKind,

        #[arg(default_value_t = 1)]
        amount: u32,
    },

    /// Subtract from today's count for an exercise
    Dec {
        /// pushups, situps, squats or running
        exercise: ExerciseKind,

        #[arg(default_value_t = 1)]
        amount: u32,
    },

    /// Show today's progress (default)
    Today,

    /// Show progress over the last days
    Week {
        /// Window length in days (defaults to the configured window)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS)))]
        days: Option<u32>,
    },

    /// Record a run from an activity notification
    Ingest {
        /// Notification payload (JSON)
        #[arg(long)]
        event: PathBuf,

        /// Directory holding `<activity id>.json` detail documents
        #[arg(long)]
        activities: PathBuf,
    },

    /// Append the progress view to a CSV file
    Export {
        #[arg(long)]
        out: PathBuf,

        /// Window length in days (defaults to the configured window)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS)))]
        days: Option<u32>,
    },
}

fn main() -> ExitCode {
    gains_core::logging::init_with_level("warn");

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let today = cli.date.unwrap_or_else(|| Utc::now().date_naive());
    let store = JsonLedgerStore::new(DataConfig::ledger_path(&data_dir));
    tracing::debug!("Using ledger {:?} for {}", store.path(), today);

    match cli.command {
        Some(Commands::Inc { exercise, amount }) => {
            cmd_apply(store, today, exercise, i64::from(amount))
        }
        Some(Commands::Dec { exercise, amount }) => {
            cmd_apply(store, today, exercise, -i64::from(amount))
        }
        Some(Commands::Week { days }) => {
            cmd_week(&store, today, days.unwrap_or(config.analysis.window_days))
        }
        Some(Commands::Ingest { event, activities }) => {
            cmd_ingest(store, today, &event, &activities)
        }
        Some(Commands::Export { out, days }) => cmd_export(
            &store,
            today,
            &out,
            days.unwrap_or(config.analysis.window_days),
        ),
        Some(Commands::Today) | None => cmd_today(store, today),
    }
}

fn cmd_apply(store: JsonLedgerStore, today: NaiveDate, exercise: ExerciseKind, delta: i64) -> Result<()> {
    let mut reconciler = ProgressReconciler::load(store, today)?;
    let outcome = reconciler.apply_delta(exercise, delta);

    println!(
        "{}: {}/{} {}",
        exercise,
        outcome.count,
        exercise.goal(),
        exercise.unit()
    );

    if outcome.clamped() {
        let bound = if delta > 0 { "goal" } else { "zero" };
        println!("  (clamped at {})", bound);
    }
    if let SyncStatus::Updated { merged, .. } = &outcome.status {
        if !merged.is_empty() {
            println!("  (merged {} duplicate entries)", merged.len());
        }
    }
    if outcome.count >= exercise.goal() && outcome.previous < exercise.goal() {
        println!("\n✓ Daily {} goal reached!", exercise);
    }

    if let SyncStatus::Failed(e) = &outcome.status {
        eprintln!("⚠ Not saved yet: {}. Reload to resync.", e);
    }

    Ok(())
}

fn cmd_today(store: JsonLedgerStore, today: NaiveDate) -> Result<()> {
    let reconciler = ProgressReconciler::load(store, today)?;
    let progress = reconciler.progress();

    println!("\n{}", today.format("%A, %Y-%m-%d"));
    println!("─────────────────────────────────────────");
    for kind in ExerciseKind::ALL {
        print_exercise_line(progress, kind);
    }
    println!();
    Ok(())
}

fn cmd_week(store: &JsonLedgerStore, today: NaiveDate, days: u32) -> Result<()> {
    let recent = load_recent_progress(store, today, days)?;

    if recent.is_empty() {
        println!("No progress recorded in the last {} days.", days);
        return Ok(());
    }

    for day in &recent {
        let badge = if day.all_goals_met() {
            "All goals achieved!"
        } else {
            "Keep going!"
        };
        println!("\n{}  [{}]", day.date.format("%A, %d.%m.%Y"), badge);
        for kind in ExerciseKind::ALL {
            print_exercise_line(day, kind);
        }
    }

    let summary = summarize(&recent);
    println!("\nTotals");
    for kind in ExerciseKind::ALL {
        println!("  {}: {} {}", kind, summary.total(kind), kind.unit());
    }
    println!(
        "\n{} of {} tracked days hit every goal.",
        summary.days_all_goals_met, summary.days_tracked
    );
    Ok(())
}

fn cmd_ingest(mut store: JsonLedgerStore, today: NaiveDate, event: &Path, activities: &Path) -> Result<()> {
    let event = ingest::read_event(event)?;
    let source = DirActivitySource::new(activities);

    match ingest_event(&event, &source, &mut store, today)? {
        Some(entry) => println!("✓ Recorded run: {} km on {}", entry.count, entry.date),
        None => println!("Ignored {} {} notification.", event.object_type, event.aspect_type),
    }
    Ok(())
}

fn cmd_export(store: &JsonLedgerStore, today: NaiveDate, out: &Path, days: u32) -> Result<()> {
    let recent = load_recent_progress(store, today, days)?;
    let count = export_progress_csv(&recent, out)?;

    println!("✓ Exported {} days", count);
    println!("  CSV: {}", out.display());
    Ok(())
}

fn print_exercise_line(day: &DailyProgress, kind: ExerciseKind) {
    let mark = if day.goal_met(kind) { "✓" } else { "✗" };
    println!(
        "  {} {:<8} {:>4}/{:<4} {}",
        mark,
        kind,
        day.count(kind),
        kind.goal(),
        kind.unit()
    );
}
