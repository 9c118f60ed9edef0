//! Handler-boundary errors.
//!
//! Every variant is recovered locally: it becomes a single `error` message to
//! the originating connection and never tears down the connection or a game.
//! The `Display` strings are the exact texts clients see.

use kingside_protocol::{ServerMessage, WireError};

/// Errors surfaced to the originating connection as an `error` message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid message format")]
    InvalidMessageFormat,
    #[error("Unknown message type")]
    UnknownMessageType,
    #[error("Game not found")]
    GameNotFound,
    #[error("Game is no longer available")]
    GameUnavailable,
    #[error("Game is full")]
    GameFull,
    #[error("Cannot join your own game")]
    JoinOwnGame,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Invalid move")]
    InvalidMove,
    #[error("Opponent not found")]
    OpponentNotFound,
    #[error("No valid draw offer")]
    NoValidDrawOffer,
}

impl SessionError {
    /// The wire message this error is delivered as.
    pub fn to_message(self) -> ServerMessage {
        ServerMessage::Error {
            message: self.to_string(),
        }
    }
}

impl From<WireError> for SessionError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Malformed(_) => SessionError::InvalidMessageFormat,
            WireError::UnknownType(_) => SessionError::UnknownMessageType,
        }
    }
}
