//! Kingside wire protocol.
//!
//! Types shared between the session server and its clients: opaque ids,
//! board/clock value types, and the tagged JSON message enums for both
//! directions of the connection.

pub mod ids;
pub mod types;
pub mod wire;

pub use ids::{GameId, PlayerId};
pub use types::{
    ClockPair, Color, GameMode, GlobalStats, LobbyGame, MoveDesc, PieceAt, PieceKind, Position,
    StatsUpdate, TimeControl, TimeControlName,
};
pub use wire::{decode_client_message, encode_server_message, ClientMessage, ServerMessage, WireError};
