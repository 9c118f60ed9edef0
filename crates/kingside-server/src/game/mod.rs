//! Game domain: rules adapter, clock engine, session state machine, and the
//! Chess960 starting-position generator.

pub mod clock;
pub mod position;
pub mod rules;
pub mod session;

pub use clock::{spawn_ticker, GameClock, TickOutcome};
pub use rules::{AppliedMove, MoveRejected, RulesAdapter, Terminal};
pub use session::{GameSession, GameStatus};
