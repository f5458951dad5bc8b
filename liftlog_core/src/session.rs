//! Per-exercise workout session engine.
//!
//! A session walks one exercise's sets:
//!
//! ```text
//! Idle --start_work--> Working --(expiry | stop_work)--> Resting --(expiry | skip)--> Idle
//! Idle --complete_set-----------------------------------> Resting
//! last set done, or finish_early -----------------------> AwaitingFeedback --confirm--> Completed
//! ```
//!
//! Only timed exercises have a work phase. The last set never rests. The
//! engine is single-threaded: ticks, user actions and store writes are all
//! applied through `&mut self`, one at a time.

use crate::config::{DeltaRange, ProgressionConfig};
use crate::progression::{self, Recommendation};
use crate::schedule::completed_on;
use crate::store::{SortOrder, Store};
use crate::timer::Countdown;
use crate::{Error, Exercise, ExerciseId, LogId, NewLogEntry, Result};
use chrono::NaiveDate;

/// Where a session currently is; each state carries only its own data
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    /// Between sets, nothing running
    Idle,
    /// Counting down the target time of the current set
    Working(Countdown),
    /// Counting down the rest after a set
    Resting(Countdown),
    /// Sets are over; waiting for RPE and the target adjustment
    AwaitingFeedback {
        sets_completed: u32,
        /// Work seconds of the last work phase, if one ran
        work_seconds: Option<u32>,
    },
    /// Outcome persisted
    Completed { log_id: LogId },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Working(_) => "working",
            SessionState::Resting(_) => "resting",
            SessionState::AwaitingFeedback { .. } => "awaiting feedback",
            SessionState::Completed { .. } => "completed",
        }
    }

    /// The running countdown, if any
    pub fn countdown(&self) -> Option<&Countdown> {
        match self {
            SessionState::Working(c) | SessionState::Resting(c) => Some(c),
            _ => None,
        }
    }
}

/// What the user confirms after the last set
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Feedback {
    /// Rating of perceived exertion, 5.0 to 10.0 in half points
    pub rpe: f64,
    /// Change applied to the progressed target
    pub delta: f64,
}

/// State machine for one exercise session
pub struct SessionEngine<'s, S: Store + ?Sized> {
    store: &'s mut S,
    config: ProgressionConfig,
    exercise: Exercise,
    current_set: u32,
    state: SessionState,
    recommendation: Option<Recommendation>,
    last_work_seconds: Option<u32>,
}

impl<'s, S: Store + ?Sized> SessionEngine<'s, S> {
    /// Enter a session for an exercise.
    ///
    /// Fails with `ExerciseNotFound` if the exercise is gone, and refuses
    /// exercises without sets or with a negative rest time.
    pub fn open(store: &'s mut S, exercise_id: ExerciseId, config: ProgressionConfig) -> Result<Self> {
        let exercise = store
            .get_exercise(exercise_id)?
            .ok_or(Error::ExerciseNotFound(exercise_id))?;

        if exercise.target_sets == 0 {
            return Err(Error::InvalidInput(format!(
                "exercise {} has no sets",
                exercise_id
            )));
        }
        Countdown::start(exercise.rest_time)?;

        let recent = store.logs_by_exercise(
            exercise_id,
            SortOrder::Descending,
            Some(config.history_window),
        )?;
        let recommendation = progression::recommend(&exercise, &recent, &config);

        tracing::info!(
            "Session opened for {} ({} sets)",
            exercise.name,
            exercise.target_sets
        );

        Ok(Self {
            store,
            config,
            exercise,
            current_set: 1,
            state: SessionState::Idle,
            recommendation,
            last_work_seconds: None,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn exercise(&self) -> &Exercise {
        &self.exercise
    }

    /// 1-based number of the set in progress
    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    pub fn is_last_set(&self) -> bool {
        self.current_set >= self.exercise.target_sets
    }

    /// Pre-session advice, shown only before the first set starts
    pub fn recommendation(&self) -> Option<&Recommendation> {
        if self.current_set == 1 && self.state == SessionState::Idle {
            self.recommendation.as_ref()
        } else {
            None
        }
    }

    pub fn suggested_delta(&self, reported_rpe: f64) -> f64 {
        progression::suggest_delta(reported_rpe, &self.exercise, &self.config)
    }

    /// Allowed manual adjustment, widened to reach a recommended deload
    pub fn delta_range(&self) -> DeltaRange {
        let range = progression::delta_range(&self.exercise, &self.config);
        match &self.recommendation {
            Some(rec) if rec.field.is_some() => range.covering(rec.delta),
            _ => range,
        }
    }

    fn refuse(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }

    /// Start the work countdown of the current set (timed exercises)
    pub fn start_work(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(self.refuse("start work"));
        }
        if !self.exercise.is_time {
            return Err(self.refuse("start work on a rep exercise"));
        }

        let countdown = Countdown::start(self.exercise.target_time)?;
        self.last_work_seconds = None;
        self.state = SessionState::Working(countdown);
        tracing::debug!("Set {}: working {}s", self.current_set, self.exercise.target_time);
        self.settle()?;
        Ok(())
    }

    /// Mark the current set done (rep exercises)
    pub fn complete_set(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(self.refuse("complete a set"));
        }
        if self.exercise.is_time {
            return Err(self.refuse("complete a timed set without working"));
        }
        tracing::debug!("Set {} completed", self.current_set);
        self.finish_set()
    }

    /// One second passed. Returns whether the state changed.
    pub fn tick(&mut self) -> Result<bool> {
        match &mut self.state {
            SessionState::Working(c) | SessionState::Resting(c) => c.tick(),
            _ => return Ok(false),
        }
        self.settle()
    }

    /// End the rest early; equivalent to letting it run out
    pub fn skip_rest(&mut self) -> Result<()> {
        match &mut self.state {
            SessionState::Resting(c) => c.skip(),
            _ => return Err(self.refuse("skip rest")),
        }
        self.settle()?;
        Ok(())
    }

    /// Stop the work countdown early; only the elapsed time is recorded
    pub fn stop_work(&mut self) -> Result<()> {
        let elapsed = match &mut self.state {
            SessionState::Working(c) => c.stop(),
            _ => return Err(self.refuse("stop work")),
        };
        tracing::debug!("Set {}: work stopped after {}s", self.current_set, elapsed);
        self.last_work_seconds = Some(elapsed);
        self.finish_set()
    }

    /// Skip the remaining sets and go to feedback.
    ///
    /// The current set number is recorded as the sets completed. Not
    /// available on the last set, where stopping or completing the set
    /// already leads to feedback.
    pub fn finish_early(&mut self) -> Result<()> {
        match &mut self.state {
            SessionState::Idle | SessionState::Resting(_) => {}
            SessionState::Working(c) => {
                if self.current_set < self.exercise.target_sets {
                    let elapsed = c.stop();
                    self.last_work_seconds = Some(elapsed);
                }
            }
            _ => return Err(self.refuse("finish early")),
        }
        if self.is_last_set() {
            return Err(self.refuse("finish early on the last set"));
        }

        tracing::info!(
            "Finished {} early after {} of {} sets",
            self.exercise.name,
            self.current_set,
            self.exercise.target_sets
        );
        self.enter_feedback();
        Ok(())
    }

    /// Persist the outcome with today's date
    pub fn confirm(&mut self, feedback: Feedback) -> Result<LogId> {
        self.confirm_on(chrono::Local::now().date_naive(), feedback)
    }

    /// Persist the outcome: one log entry plus the adjusted target.
    ///
    /// An exercise is logged at most once per date; a second session on the
    /// same date fails with `AlreadyLogged` and changes nothing. On any
    /// failure the session stays in `AwaitingFeedback`.
    pub fn confirm_on(&mut self, date: NaiveDate, feedback: Feedback) -> Result<LogId> {
        let (sets_completed, work_seconds) = match self.state {
            SessionState::AwaitingFeedback {
                sets_completed,
                work_seconds,
            } => (sets_completed, work_seconds),
            _ => return Err(self.refuse("confirm feedback")),
        };
        validate_rpe(feedback.rpe)?;
        if !feedback.delta.is_finite() {
            return Err(Error::InvalidInput(format!(
                "delta {} is not a number",
                feedback.delta
            )));
        }
        if completed_on(&*self.store, self.exercise.id, date)? {
            return Err(Error::AlreadyLogged {
                exercise: self.exercise.id,
                date,
            });
        }

        let exercise = &self.exercise;
        let entry = NewLogEntry {
            date,
            exercise_id: exercise.id,
            weight: exercise.is_weight.then_some(exercise.target_weight),
            time: exercise
                .is_time
                .then(|| work_seconds.map(i64::from).unwrap_or(exercise.target_time)),
            reps: exercise.target_reps,
            sets: sets_completed,
            rpe: feedback.rpe,
        };

        let log_id = self.persist(entry, feedback.delta)?;
        self.state = SessionState::Completed { log_id };
        tracing::info!(
            "Logged {} on {}: {} sets at RPE {}",
            self.exercise.name,
            date,
            sets_completed,
            feedback.rpe
        );
        Ok(log_id)
    }

    /// Close without saving anything
    pub fn abort(self) {
        tracing::info!(
            "Session for {} aborted in state {}",
            self.exercise.name,
            self.state.name()
        );
    }

    /// Target first, then the log; a failed log write restores the target
    fn persist(&mut self, entry: NewLogEntry, delta: f64) -> Result<LogId> {
        let Some(field) = self.exercise.progression_field() else {
            return self.store.add_log(entry);
        };

        let id = self.exercise.id;
        let stored = self
            .store
            .get_exercise(id)?
            .ok_or(Error::ExerciseNotFound(id))?;
        let previous = stored.target_value(field);
        let updated = (previous + delta).max(0.0);

        self.store.update_exercise_target(id, field, updated)?;
        match self.store.add_log(entry) {
            Ok(log_id) => {
                self.exercise.set_target_value(field, updated);
                tracing::info!("{:?} target of {} now {}", field, self.exercise.name, updated);
                Ok(log_id)
            }
            Err(e) => {
                if let Err(revert) = self.store.update_exercise_target(id, field, previous) {
                    tracing::warn!(
                        "Could not restore {:?} target of exercise {}: {}",
                        field,
                        id,
                        revert
                    );
                }
                Err(e)
            }
        }
    }

    /// A set's work is over: rest, or go to feedback after the last set
    fn finish_set(&mut self) -> Result<()> {
        if self.is_last_set() {
            self.enter_feedback();
            return Ok(());
        }
        let rest = Countdown::start(self.exercise.rest_time)?;
        tracing::debug!("Set {}: resting {}s", self.current_set, rest.duration());
        self.state = SessionState::Resting(rest);
        self.settle()?;
        Ok(())
    }

    fn enter_feedback(&mut self) {
        self.state = SessionState::AwaitingFeedback {
            sets_completed: self.current_set,
            work_seconds: self.last_work_seconds,
        };
    }

    /// React once to a countdown that reached zero
    fn settle(&mut self) -> Result<bool> {
        let completed = match &mut self.state {
            SessionState::Working(c) | SessionState::Resting(c) => c.take_completion(),
            _ => false,
        };
        if !completed {
            return Ok(false);
        }

        match &self.state {
            SessionState::Working(c) => {
                self.last_work_seconds = Some(c.duration());
                self.finish_set()?;
            }
            SessionState::Resting(_) => {
                self.current_set += 1;
                self.state = SessionState::Idle;
                tracing::debug!("Rest over, set {} up next", self.current_set);
            }
            _ => {}
        }
        Ok(true)
    }
}

fn validate_rpe(rpe: f64) -> Result<()> {
    if (5.0..=10.0).contains(&rpe) && (rpe * 2.0).fract() == 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "RPE must be between 5 and 10 in half points, got {}",
            rpe
        )))
    }
}
