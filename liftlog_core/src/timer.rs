//! Countdown timer used for work and rest phases.
//!
//! [`Countdown`] holds the remaining seconds and is advanced one tick at a
//! time by its owner. Completion is not pushed anywhere: the owner polls
//! [`Countdown::take_completion`] after every tick and reacts once.
//!
//! [`Ticker`] is the wall-clock side. It is a repeating schedule with an
//! explicit start and stop that reports how many ticks are due; the driver
//! loop sleeps until [`Ticker::until_next`] and feeds the due ticks to the
//! session engine on its own thread. Pausing the ticker freezes whatever
//! countdown it drives without touching the countdown itself.

use crate::{Error, Result};
use std::time::{Duration, Instant};

/// Whole-second countdown
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Countdown {
    duration: u32,
    remaining: u32,
    armed: bool,
}

impl Countdown {
    /// Arm a countdown. A zero duration is complete immediately.
    pub fn start(duration_seconds: i64) -> Result<Self> {
        if duration_seconds < 0 {
            return Err(Error::Timer(format!(
                "duration must not be negative, got {}",
                duration_seconds
            )));
        }
        let duration = u32::try_from(duration_seconds)
            .map_err(|_| Error::Timer(format!("duration {} is too long", duration_seconds)))?;

        Ok(Self {
            duration,
            remaining: duration,
            armed: true,
        })
    }

    /// One second has passed
    pub fn tick(&mut self) {
        if self.armed {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    /// Jump straight to zero; completion is observed on the next poll
    pub fn skip(&mut self) {
        if self.armed {
            self.remaining = 0;
        }
    }

    /// Disarm without completing, returning the seconds that did elapse
    pub fn stop(&mut self) -> u32 {
        self.armed = false;
        self.elapsed()
    }

    /// Report completion exactly once, disarming the countdown
    pub fn take_completion(&mut self) -> bool {
        if self.armed && self.remaining == 0 {
            self.armed = false;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed(&self) -> u32 {
        self.duration - self.remaining
    }
}

/// Repeating wall-clock schedule
#[derive(Clone, Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
    /// Time that was left until the next tick when paused
    paused: Option<Duration>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
            paused: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
        self.paused = None;
    }

    /// Cancel the schedule, including a paused one
    pub fn stop(&mut self) {
        self.next_due = None;
        self.paused = None;
    }

    /// Hold the schedule. Returns false if it was not running.
    pub fn pause(&mut self, now: Instant) -> bool {
        match self.next_due.take() {
            Some(due) => {
                self.paused = Some(due.saturating_duration_since(now));
                true
            }
            None => false,
        }
    }

    /// Continue a paused schedule with the partial tick it had left
    pub fn resume(&mut self, now: Instant) {
        if let Some(left) = self.paused.take() {
            self.next_due = Some(now + left);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Time left until the next tick, `None` when stopped
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
    }

    /// Number of ticks due at `now`; advances the schedule past them
    pub fn poll(&mut self, now: Instant) -> u32 {
        let Some(mut due) = self.next_due else {
            return 0;
        };

        let mut ticks = 0;
        while due <= now {
            ticks += 1;
            due += self.interval;
        }
        self.next_due = Some(due);
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_completes_once() {
        let mut countdown = Countdown::start(3).unwrap();

        for _ in 0..2 {
            countdown.tick();
            assert!(!countdown.take_completion());
        }
        countdown.tick();
        assert!(countdown.take_completion());
        assert!(!countdown.take_completion());
        assert!(!countdown.is_armed());
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut countdown = Countdown::start(0).unwrap();
        assert!(countdown.take_completion());
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(matches!(Countdown::start(-1), Err(Error::Timer(_))));
    }

    #[test]
    fn test_skip_forces_completion() {
        let mut countdown = Countdown::start(30).unwrap();
        countdown.tick();
        countdown.skip();
        assert_eq!(countdown.remaining(), 0);
        assert!(countdown.take_completion());
    }

    #[test]
    fn test_stop_reports_elapsed_without_completion() {
        let mut countdown = Countdown::start(45).unwrap();
        for _ in 0..35 {
            countdown.tick();
        }

        assert_eq!(countdown.stop(), 35);
        assert!(!countdown.is_armed());

        // Further ticks are ignored once disarmed
        countdown.tick();
        countdown.skip();
        assert_eq!(countdown.remaining(), 10);
        assert!(!countdown.take_completion());
    }

    #[test]
    fn test_ticker_counts_due_ticks() {
        let origin = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        assert_eq!(ticker.poll(origin), 0);

        ticker.start(origin);
        assert_eq!(ticker.poll(origin + Duration::from_millis(999)), 0);
        assert_eq!(ticker.poll(origin + Duration::from_millis(1000)), 1);
        assert_eq!(ticker.poll(origin + Duration::from_millis(3500)), 2);
        assert_eq!(
            ticker.until_next(origin + Duration::from_millis(3500)),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_ticker_pause_holds_ticks() {
        let origin = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        ticker.start(origin);
        assert_eq!(ticker.poll(origin + Duration::from_millis(1300)), 1);

        assert!(ticker.pause(origin + Duration::from_millis(1300)));
        assert!(ticker.is_paused());
        assert!(!ticker.is_running());
        assert_eq!(ticker.until_next(origin + Duration::from_secs(5)), None);
        assert_eq!(ticker.poll(origin + Duration::from_secs(60)), 0);

        // 700ms were left when paused
        let later = origin + Duration::from_secs(60);
        ticker.resume(later);
        assert!(!ticker.is_paused());
        assert_eq!(ticker.until_next(later), Some(Duration::from_millis(700)));
        assert_eq!(ticker.poll(later + Duration::from_millis(700)), 1);
    }

    #[test]
    fn test_pause_requires_running_ticker() {
        let origin = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        assert!(!ticker.pause(origin));
        assert!(!ticker.is_paused());

        ticker.start(origin);
        ticker.pause(origin);
        ticker.stop();
        assert!(!ticker.is_paused());
        ticker.resume(origin);
        assert!(!ticker.is_running());
    }

    #[test]
    fn test_ticker_stop_cancels_schedule() {
        let origin = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        ticker.start(origin);
        ticker.stop();

        assert!(!ticker.is_running());
        assert_eq!(ticker.until_next(origin), None);
        assert_eq!(ticker.poll(origin + Duration::from_secs(10)), 0);
    }
}
