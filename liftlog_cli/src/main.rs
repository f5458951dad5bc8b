use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use liftlog_core::schedule::{completed_on, todays_plan};
use liftlog_core::session::SessionEngine;
use liftlog_core::stats::{progress, DEFAULT_WINDOW_DAYS};
use liftlog_core::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

mod train;

use train::{describe_targets, unit_of, TrainOptions};

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Local-first workout tracker with RPE-driven progression", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage exercises
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Show the exercises planned for today
    Today {
        /// Plan for another date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Train one exercise
    Train {
        /// Exercise id
        id: u64,

        /// Run all sets without waiting and save immediately
        #[arg(long)]
        auto_complete: bool,

        /// Perceived exertion (5-10); skips the prompt
        #[arg(long)]
        rpe: Option<f64>,

        /// Target adjustment; skips the prompt
        #[arg(long, allow_negative_numbers = true)]
        delta: Option<f64>,

        /// Log the session on another date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show or set the note for a day; an empty text removes it
    Note {
        #[arg(long)]
        date: Option<NaiveDate>,

        text: Option<String>,
    },

    /// Progress over the last 30 days
    Stats {
        /// Exercise id
        id: u64,

        /// Length of the window in days
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS, allow_negative_numbers = true)]
        days: i64,
    },

    /// Write a JSON backup of all data
    Export {
        /// Defaults to fitness-backup-YYYY-MM-DD.json
        file: Option<PathBuf>,
    },

    /// Write all logs as CSV
    ExportCsv { file: PathBuf },

    /// Replace stored data with a JSON backup
    Import { file: PathBuf },

    /// Show or update the user profile
    Settings {
        #[arg(long)]
        name: Option<String>,

        /// Body weight in kg
        #[arg(long)]
        body_weight: Option<f64>,

        /// Training days, e.g. mon,wed,fri
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<Weekday>>,
    },
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// Add an exercise
    Add {
        #[arg(long)]
        name: String,

        #[arg(long, default_value_t = 3)]
        sets: u32,

        #[arg(long, default_value_t = 10)]
        reps: u32,

        /// Target weight in kg; tracks weight
        #[arg(long)]
        weight: Option<f64>,

        /// Target time in seconds; makes the exercise timed
        #[arg(long)]
        time: Option<i64>,

        /// Rest between sets in seconds
        #[arg(long, default_value_t = 60)]
        rest: i64,

        /// Training days, e.g. mon,thu
        #[arg(long, value_delimiter = ',')]
        days: Vec<Weekday>,
    },

    /// List all exercises
    List,

    /// Change fields of an exercise
    Edit {
        id: u64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        sets: Option<u32>,

        #[arg(long)]
        reps: Option<u32>,

        #[arg(long, conflicts_with = "no_weight")]
        weight: Option<f64>,

        #[arg(long, conflicts_with = "no_time")]
        time: Option<i64>,

        #[arg(long)]
        rest: Option<i64>,

        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<Weekday>>,

        /// Stop tracking weight
        #[arg(long)]
        no_weight: bool,

        /// Make the exercise rep-based
        #[arg(long)]
        no_time: bool,
    },

    /// Delete an exercise; its logs are kept
    Remove { id: u64 },
}

fn main() -> Result<()> {
    liftlog_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let mut store = FileStore::open(&data_dir)?;
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Exercise(command) => cmd_exercise(&mut store, command),
        Commands::Today { date } => cmd_today(&store, date.unwrap_or(today)),
        Commands::Train {
            id,
            auto_complete,
            rpe,
            delta,
            date,
        } => {
            let options = TrainOptions {
                date: date.unwrap_or(today),
                rpe,
                delta,
                tick: Duration::from_millis(config.timer.tick_millis),
            };
            cmd_train(&mut store, ExerciseId(id), auto_complete, &options, &config)
        }
        Commands::Note { date, text } => cmd_note(&mut store, date.unwrap_or(today), text),
        Commands::Stats { id, days } => cmd_stats(&store, ExerciseId(id), today, days),
        Commands::Export { file } => {
            let path = file.unwrap_or_else(|| PathBuf::from(backup::default_file_name(today)));
            let summary = backup::export_json(&mut store, &path)?;
            println!(
                "✓ Exported {} exercises, {} logs, {} notes to {}",
                summary.exercises,
                summary.logs,
                summary.daily_notes,
                path.display()
            );
            Ok(())
        }
        Commands::ExportCsv { file } => {
            let rows = backup::export_csv(&store, BufWriter::new(File::create(&file)?))?;
            println!("✓ Exported {} rows to {}", rows, file.display());
            Ok(())
        }
        Commands::Import { file } => {
            let summary = backup::import_json(&mut store, &file)?;
            println!(
                "✓ Imported {} exercises, {} logs, {} notes",
                summary.exercises, summary.logs, summary.daily_notes
            );
            Ok(())
        }
        Commands::Settings {
            name,
            body_weight,
            days,
        } => cmd_settings(&mut store, name, body_weight, days),
    }
}

fn cmd_exercise(store: &mut FileStore, command: ExerciseCommand) -> Result<()> {
    match command {
        ExerciseCommand::Add {
            name,
            sets,
            reps,
            weight,
            time,
            rest,
            days,
        } => {
            let exercise = store.add_exercise(NewExercise {
                name,
                days: days.into_iter().collect(),
                target_sets: sets,
                target_reps: reps,
                target_weight: weight.unwrap_or(0.0),
                target_time: time.unwrap_or(0),
                rest_time: rest,
                is_weight: weight.is_some(),
                is_time: time.is_some(),
            })?;
            println!("✓ Added exercise {}: {}", exercise.id, exercise.name);
        }
        ExerciseCommand::List => {
            let exercises = store.exercises()?;
            if exercises.is_empty() {
                println!("No exercises yet. Add one with `liftlog exercise add`.");
            }
            for exercise in exercises {
                println!(
                    "{:>4}  {:<24} {}  [{}]",
                    exercise.id,
                    exercise.name,
                    describe_targets(&exercise),
                    format_days(&exercise.days)
                );
            }
        }
        ExerciseCommand::Edit {
            id,
            name,
            sets,
            reps,
            weight,
            time,
            rest,
            days,
            no_weight,
            no_time,
        } => {
            let id = ExerciseId(id);
            let mut changes: NewExercise = store
                .get_exercise(id)?
                .ok_or(Error::ExerciseNotFound(id))?
                .into();

            if let Some(name) = name {
                changes.name = name;
            }
            if let Some(sets) = sets {
                changes.target_sets = sets;
            }
            if let Some(reps) = reps {
                changes.target_reps = reps;
            }
            if let Some(weight) = weight {
                changes.target_weight = weight;
                changes.is_weight = true;
            }
            if let Some(time) = time {
                changes.target_time = time;
                changes.is_time = true;
            }
            if let Some(rest) = rest {
                changes.rest_time = rest;
            }
            if let Some(days) = days {
                changes.days = days.into_iter().collect();
            }
            if no_weight {
                changes.is_weight = false;
            }
            if no_time {
                changes.is_time = false;
            }

            let exercise = store.update_exercise(id, changes)?;
            println!("✓ Updated exercise {}: {}", exercise.id, describe_targets(&exercise));
        }
        ExerciseCommand::Remove { id } => {
            store.delete_exercise(ExerciseId(id))?;
            println!("✓ Removed exercise {}", id);
        }
    }
    Ok(())
}

fn cmd_today(store: &FileStore, date: NaiveDate) -> Result<()> {
    let plan = todays_plan(store, date)?;
    if plan.is_empty() {
        println!("Nothing planned for {} ({}).", date, Weekday::of(date));
        return Ok(());
    }

    println!("Plan for {} ({}):", date, Weekday::of(date));
    for item in plan {
        println!(
            "  [{}] {:>3}  {}  {}",
            if item.completed { "x" } else { " " },
            item.exercise.id,
            item.exercise.name,
            describe_targets(&item.exercise)
        );
    }
    Ok(())
}

fn cmd_train(
    store: &mut FileStore,
    id: ExerciseId,
    auto_complete: bool,
    options: &TrainOptions,
    config: &Config,
) -> Result<()> {
    if completed_on(&*store, id, options.date)? {
        return Err(Error::AlreadyLogged {
            exercise: id,
            date: options.date,
        });
    }
    let mut engine = SessionEngine::open(store, id, config.progression.clone())?;
    train::print_recommendation(&engine);

    if auto_complete {
        let log_id = train::run_auto(&mut engine, options)?;
        println!("✓ Session saved (log {})", log_id);
        return Ok(());
    }

    train::run_interactive(engine, options)?;
    Ok(())
}

fn cmd_note(store: &mut FileStore, date: NaiveDate, text: Option<String>) -> Result<()> {
    match text {
        Some(text) if text.trim().is_empty() => {
            store.upsert_note(date, "")?;
            println!("✓ Note removed for {}", date);
        }
        Some(text) => {
            store.upsert_note(date, &text)?;
            println!("✓ Note saved for {}", date);
        }
        None => match store.note(date)? {
            Some(note) => println!("{}: {}", date, note.note),
            None => println!("No note for {}", date),
        },
    }
    Ok(())
}

fn cmd_stats(store: &FileStore, id: ExerciseId, today: NaiveDate, days: i64) -> Result<()> {
    let summary = progress(store, id, today, days)?;
    let name = store
        .get_exercise(id)?
        .map(|e| e.name)
        .unwrap_or_else(|| "unknown exercise".to_string());
    let unit = unit_of(Some(summary.field));

    println!("{}: last {} days", name, days);
    println!("  Sessions: {}", summary.total_sessions);
    println!("  Max:      {}{}", summary.max, unit);
    println!("  Average:  {}{}", summary.average, unit);
    for point in &summary.points {
        println!("  {}  {}{}", point.date, point.value, unit);
    }
    Ok(())
}

fn cmd_settings(
    store: &mut FileStore,
    name: Option<String>,
    body_weight: Option<f64>,
    days: Option<Vec<Weekday>>,
) -> Result<()> {
    let mut profile = UserProfile::from_settings(&store.settings()?);
    let changed = name.is_some() || body_weight.is_some() || days.is_some();

    if let Some(name) = name {
        profile.name = Some(name).filter(|n| !n.trim().is_empty());
    }
    if let Some(weight) = body_weight {
        profile.body_weight = Some(weight);
    }
    if let Some(days) = days {
        profile.training_days = days.into_iter().collect();
    }
    if changed {
        store.put_settings(profile.to_settings()?)?;
        println!("✓ Profile updated");
    }

    println!("Name:          {}", profile.name.as_deref().unwrap_or("-"));
    match profile.body_weight {
        Some(weight) => println!("Body weight:   {} kg", weight),
        None => println!("Body weight:   -"),
    }
    println!("Training days: {}", format_days(&profile.training_days));
    println!(
        "Last backup:   {}",
        backup::last_backup(store)?.as_deref().unwrap_or("never")
    );
    Ok(())
}

fn format_days(days: &std::collections::BTreeSet<Weekday>) -> String {
    if days.is_empty() {
        return "-".to_string();
    }
    days.iter()
        .map(|d| &d.as_str()[..3])
        .collect::<Vec<_>>()
        .join(",")
}
