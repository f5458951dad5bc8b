//! Terminal driver for a training session.
//!
//! Input lines arrive from a reader thread over a channel. The loop waits
//! for either the next line or the next countdown tick, whichever comes
//! first, and applies both to the engine on this thread.

use chrono::NaiveDate;
use liftlog_core::session::{Feedback, SessionEngine, SessionState};
use liftlog_core::{Error, FileStore, LogId, Result, Severity, TargetField, Ticker};
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// RPE assumed when the user accepts the default
pub const DEFAULT_RPE: f64 = 7.0;

pub struct TrainOptions {
    pub date: NaiveDate,
    pub rpe: Option<f64>,
    pub delta: Option<f64>,
    pub tick: Duration,
}

enum Event {
    Input(String),
    Tick,
    Closed,
}

pub fn print_recommendation(engine: &SessionEngine<'_, FileStore>) {
    let exercise = engine.exercise();
    println!("\n{}", exercise.name);
    println!("  {}", describe_targets(exercise));

    if let Some(rec) = engine.recommendation() {
        let marker = match rec.severity {
            Severity::Critical => "⚠",
            Severity::Info => "ℹ",
        };
        println!("\n  {} {}", marker, rec.message);
    }
}

/// Run every set without waiting: rests are skipped, work timers run out
pub fn run_auto(engine: &mut SessionEngine<'_, FileStore>, options: &TrainOptions) -> Result<LogId> {
    loop {
        match engine.state() {
            SessionState::Idle if engine.exercise().is_time => engine.start_work()?,
            SessionState::Idle => engine.complete_set()?,
            SessionState::Working(_) => {
                engine.tick()?;
            }
            SessionState::Resting(_) => engine.skip_rest()?,
            SessionState::AwaitingFeedback { .. } => break,
            SessionState::Completed { log_id } => return Ok(*log_id),
        }
    }

    let rpe = options.rpe.unwrap_or(DEFAULT_RPE);
    let delta = options
        .delta
        .unwrap_or_else(|| engine.suggested_delta(rpe));
    engine.confirm_on(options.date, Feedback { rpe, delta })
}

/// Interactive session. Returns `None` if the session was aborted.
pub fn run_interactive(
    mut engine: SessionEngine<'_, FileStore>,
    options: &TrainOptions,
) -> Result<Option<LogId>> {
    let input = spawn_input_reader();
    let mut ticker = Ticker::new(options.tick);

    print_help(&engine);
    render(&engine)?;

    loop {
        if let SessionState::AwaitingFeedback { sets_completed, .. } = *engine.state() {
            println!("\nDone: {} set(s) of {}", sets_completed, engine.exercise().name);
            let Some(feedback) = prompt_feedback(&engine, &input, options)? else {
                engine.abort();
                println!("Session discarded.");
                return Ok(None);
            };
            match engine.confirm_on(options.date, feedback) {
                Ok(log_id) => {
                    println!("✓ Session saved (log {})", log_id);
                    return Ok(Some(log_id));
                }
                Err(e @ Error::AlreadyLogged { .. }) => return Err(e),
                Err(e) if options.rpe.is_none() && options.delta.is_none() => {
                    eprintln!("✗ {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        match (engine.state().countdown().is_some(), ticker.is_running()) {
            (true, false) if !ticker.is_paused() => ticker.start(Instant::now()),
            (false, _) => ticker.stop(),
            _ => {}
        }

        let event = match ticker.until_next(Instant::now()) {
            Some(wait) => match input.recv_timeout(wait) {
                Ok(line) => Event::Input(line),
                Err(RecvTimeoutError::Timeout) => Event::Tick,
                Err(RecvTimeoutError::Disconnected) => Event::Closed,
            },
            None => match input.recv() {
                Ok(line) => Event::Input(line),
                Err(_) => Event::Closed,
            },
        };

        match event {
            Event::Tick => {
                for _ in 0..ticker.poll(Instant::now()) {
                    if engine.tick()? {
                        println!();
                    }
                }
                render(&engine)?;
            }
            Event::Input(line) if line == "p" => {
                let now = Instant::now();
                if ticker.is_paused() {
                    ticker.resume(now);
                    println!("\n  Resumed");
                } else if ticker.pause(now) {
                    println!("\n  Paused, p to resume");
                } else {
                    eprintln!("✗ No countdown running");
                }
                render(&engine)?;
            }
            Event::Input(line) => {
                let phase = engine.state().name();
                let result = match line.as_str() {
                    "d" => engine.complete_set(),
                    "w" => engine.start_work(),
                    "x" => engine.stop_work(),
                    "s" => engine.skip_rest(),
                    "f" => engine.finish_early(),
                    "q" => {
                        engine.abort();
                        println!("\nSession aborted.");
                        return Ok(None);
                    }
                    "" => Ok(()),
                    _ => {
                        print_help(&engine);
                        Ok(())
                    }
                };
                match result {
                    // A new phase starts with a fresh schedule
                    Ok(()) if ticker.is_paused() && engine.state().name() != phase => {
                        ticker.stop()
                    }
                    Ok(()) => {}
                    Err(e @ (Error::InvalidTransition { .. } | Error::Timer(_))) => {
                        eprintln!("✗ {}", e)
                    }
                    Err(e) => return Err(e),
                }
                render(&engine)?;
            }
            Event::Closed => {
                engine.abort();
                println!("\nInput closed, session aborted.");
                return Ok(None);
            }
        }
    }
}

fn spawn_input_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line.trim().to_lowercase()).is_err() {
                break;
            }
        }
    });
    rx
}

fn prompt_feedback(
    engine: &SessionEngine<'_, FileStore>,
    input: &Receiver<String>,
    options: &TrainOptions,
) -> Result<Option<Feedback>> {
    let rpe = match options.rpe {
        Some(rpe) => rpe,
        None => loop {
            prompt(&format!("How hard was it? RPE 5-10 [{}]: ", DEFAULT_RPE))?;
            let Ok(line) = input.recv() else {
                return Ok(None);
            };
            match line.as_str() {
                "q" => return Ok(None),
                "" => break DEFAULT_RPE,
                text => match text.parse::<f64>() {
                    Ok(rpe) => break rpe,
                    Err(_) => println!("  Enter a number such as 7 or 8.5"),
                },
            }
        },
    };

    let suggested = engine.suggested_delta(rpe);
    let delta = match options.delta {
        Some(delta) => delta,
        None => {
            let range = engine.delta_range();
            let unit = unit_of(engine.exercise().progression_field());
            loop {
                prompt(&format!(
                    "Adjust target by ({} to {}{}) [{}]: ",
                    range.min, range.max, unit, suggested
                ))?;
                let Ok(line) = input.recv() else {
                    return Ok(None);
                };
                match line.as_str() {
                    "q" => return Ok(None),
                    "" => break suggested,
                    text => match text.parse::<f64>() {
                        Ok(typed) => {
                            let delta = range.snap(typed);
                            if delta != typed {
                                println!(
                                    "  Adjusted to {}{} (steps of {})",
                                    delta, unit, range.step
                                );
                            }
                            break delta;
                        }
                        Err(_) => println!("  Enter a number"),
                    },
                }
            }
        }
    };

    Ok(Some(Feedback { rpe, delta }))
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    io::stdout().flush()?;
    Ok(())
}

fn render(engine: &SessionEngine<'_, FileStore>) -> Result<()> {
    let total = engine.exercise().target_sets;
    match engine.state() {
        SessionState::Idle => {
            let hint = if engine.exercise().is_time {
                "w to start"
            } else {
                "d when done"
            };
            println!("Set {}/{}: {}", engine.current_set(), total, hint);
        }
        SessionState::Working(c) => prompt(&format!("\r  Work {:>4}s ", c.remaining()))?,
        SessionState::Resting(c) => prompt(&format!("\r  Rest {:>4}s ", c.remaining()))?,
        SessionState::AwaitingFeedback { .. } | SessionState::Completed { .. } => {}
    }
    Ok(())
}

fn print_help(engine: &SessionEngine<'_, FileStore>) {
    println!();
    if engine.exercise().is_time {
        println!("  w  start work    x  stop work early");
    } else {
        println!("  d  set done");
    }
    println!("  s  skip rest     p  pause/resume     f  finish early     q  abort");
}

pub fn unit_of(field: Option<TargetField>) -> &'static str {
    match field {
        Some(TargetField::Time) => "s",
        Some(TargetField::Weight) => " kg",
        None => "",
    }
}

pub fn describe_targets(exercise: &liftlog_core::Exercise) -> String {
    let mut text = if exercise.is_time {
        format!("{} x {}s", exercise.target_sets, exercise.target_time)
    } else {
        format!("{} x {}", exercise.target_sets, exercise.target_reps)
    };
    if exercise.is_weight {
        text.push_str(&format!(" @ {} kg", exercise.target_weight));
    }
    text.push_str(&format!(", rest {}s", exercise.rest_time));
    text
}
