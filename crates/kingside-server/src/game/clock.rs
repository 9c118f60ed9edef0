//! Racing clock engine.
//!
//! Remaining time for the side to move is always `persisted - elapsed since
//! the last persisted timestamp`, so accuracy never depends on tick cadence.
//! Ticks only persist the deduction once it crosses a threshold, which keeps
//! mutation cheap at a 100ms cadence; moves persist exactly and then credit
//! the increment.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

use kingside_protocol::{ClockPair, Color, GameId, TimeControl};

use crate::config::ClockConfig;
use crate::registry::Command;

/// Outcome of a single clock tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The side to move has run out of time.
    Expired,
    /// Enough time elapsed that the deduction was written back.
    Persisted,
    /// Deduction still below the persist threshold; nothing written.
    Unchanged,
}

/// Both players' clocks plus the running-deduction timestamp.
#[derive(Clone, Debug)]
pub struct GameClock {
    pub white: f64,
    pub black: f64,
    pub increment: f64,
    /// Set while the game is live; basis for the next deduction.
    pub last_move_at: Option<Instant>,
    pub running: bool,
}

impl GameClock {
    pub fn new(tc: &TimeControl) -> Self {
        Self {
            white: tc.time,
            black: tc.time,
            increment: tc.increment,
            last_move_at: None,
            running: false,
        }
    }

    /// Start the clock when the second player arrives.
    pub fn start(&mut self) {
        self.last_move_at = Some(Instant::now());
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_move_at = None;
    }

    /// Advance the clock of `side` (the side to move). Flags when remaining
    /// time is at or below the flag threshold; otherwise persists the
    /// deduction only once it exceeds the persist threshold.
    pub fn tick(&mut self, side: Color, config: &ClockConfig) -> TickOutcome {
        let Some(last) = self.last_move_at else {
            return TickOutcome::Unchanged;
        };
        if !self.running {
            return TickOutcome::Unchanged;
        }

        let elapsed = last.elapsed().as_secs_f64();
        let remaining = self.remaining(side) - elapsed;

        if remaining <= config.flag_threshold {
            *self.remaining_mut(side) = 0.0;
            self.stop();
            return TickOutcome::Expired;
        }

        if elapsed > config.persist_threshold {
            *self.remaining_mut(side) = remaining;
            self.last_move_at = Some(Instant::now());
            trace!(side = %side, remaining, "clock persisted");
            return TickOutcome::Persisted;
        }

        TickOutcome::Unchanged
    }

    /// Settle the mover's clock after a validated move: deduct exact elapsed
    /// time, credit the increment, restart the deduction basis.
    pub fn on_move(&mut self, mover: Color) {
        if let Some(last) = self.last_move_at {
            let elapsed = last.elapsed().as_secs_f64();
            let increment = self.increment;
            let slot = self.remaining_mut(mover);
            *slot = (*slot - elapsed).max(0.0) + increment;
        }
        self.last_move_at = Some(Instant::now());
    }

    pub fn remaining(&self, side: Color) -> f64 {
        match side {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    fn remaining_mut(&mut self, side: Color) -> &mut f64 {
        match side {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Snapshot for the wire, rounded to one decimal.
    pub fn pair(&self) -> ClockPair {
        ClockPair::rounded(self.white, self.black)
    }
}

/// Spawn the per-game ticker. It only ever sends `ClockTick` commands into
/// the registry mailbox; all clock mutation happens on the registry task.
pub fn spawn_ticker(
    game: GameId,
    config: &ClockConfig,
    commands: mpsc::UnboundedSender<Command>,
) -> JoinHandle<()> {
    let period = config.tick_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if commands.send(Command::ClockTick { game }).is_err() {
                break;
            }
        }
    })
}
