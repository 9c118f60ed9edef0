//! Per-game session state machine.
//!
//! A session moves through `Waiting` -> `Playing` -> `Ended`, owns its rules
//! adapter and clock, and tracks the seat assignment and the single pending
//! draw offer. All mutation happens on the registry task; the session itself
//! is plain state.

use rand::Rng;
use tokio::task::JoinHandle;

use kingside_protocol::{Color, GameId, GameMode, PlayerId, TimeControl};

use super::clock::GameClock;
use super::rules::RulesAdapter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

pub struct GameSession {
    pub id: GameId,
    pub mode: GameMode,
    pub rules: RulesAdapter,
    pub white: Option<PlayerId>,
    pub black: Option<PlayerId>,
    pub clock: GameClock,
    /// At most one pending offer; a newer offer replaces it.
    pub draw_offer: Option<Color>,
    pub status: GameStatus,
    /// Ticker task for a playing game; aborted on end.
    pub clock_task: Option<JoinHandle<()>>,
}

impl GameSession {
    /// Create a waiting session hosted by `host`, seated on a random color.
    /// Returns the session and the host's seat.
    pub fn new<R: Rng>(
        id: GameId,
        host: PlayerId,
        mode: GameMode,
        tc: &TimeControl,
        rng: &mut R,
    ) -> (Self, Color) {
        let host_seat = if rng.gen_bool(0.5) {
            Color::White
        } else {
            Color::Black
        };
        let session = Self {
            id,
            mode,
            rules: RulesAdapter::from_start(mode, rng),
            white: (host_seat == Color::White).then_some(host),
            black: (host_seat == Color::Black).then_some(host),
            clock: GameClock::new(tc),
            draw_offer: None,
            status: GameStatus::Waiting,
            clock_task: None,
        };
        (session, host_seat)
    }

    /// The seat `player` occupies, if any.
    pub fn seat_of(&self, player: PlayerId) -> Option<Color> {
        if self.white == Some(player) {
            Some(Color::White)
        } else if self.black == Some(player) {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn occupant(&self, seat: Color) -> Option<PlayerId> {
        match seat {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// The seat still open while waiting, if any.
    pub fn open_seat(&self) -> Option<Color> {
        if self.white.is_none() {
            Some(Color::White)
        } else if self.black.is_none() {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Whichever player is already seated. During `Waiting` this is the host.
    pub fn seated_player(&self) -> Option<PlayerId> {
        self.white.or(self.black)
    }

    /// Seat the joining player on the open seat and start the game. The
    /// caller has already verified the session is joinable.
    pub fn start(&mut self, joiner: PlayerId) -> Color {
        let seat = self.open_seat().unwrap_or(Color::Black);
        match seat {
            Color::White => self.white = Some(joiner),
            Color::Black => self.black = Some(joiner),
        }
        self.status = GameStatus::Playing;
        self.clock.start();
        seat
    }

    /// Transition to `Ended`, stopping the clock and aborting the ticker.
    /// Returns false if the session had already ended.
    pub fn end(&mut self) -> bool {
        if self.status == GameStatus::Ended {
            return false;
        }
        self.status = GameStatus::Ended;
        self.clock.stop();
        if let Some(task) = self.clock_task.take() {
            task.abort();
        }
        true
    }

    /// Record a draw offer from `seat`, replacing any pending offer.
    pub fn offer_draw(&mut self, seat: Color) {
        self.draw_offer = Some(seat);
    }

    /// True if `seat` may accept or decline the pending offer: an offer
    /// exists and was made by the other side.
    pub fn can_answer_draw(&self, seat: Color) -> bool {
        matches!(self.draw_offer, Some(offerer) if offerer != seat)
    }

    pub fn clear_draw_offer(&mut self) {
        self.draw_offer = None;
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        if let Some(task) = self.clock_task.take() {
            task.abort();
        }
    }
}
