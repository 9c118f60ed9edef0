//! Value types carried by the wire protocol.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::GameId;

/// Seat color. Serialized as `"white"` / `"black"` everywhere on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

/// Variant mode a game is created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Standard,
    Chess960,
}

/// Piece kind, serialized as the conventional single lowercase letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    #[serde(rename = "p")]
    Pawn,
    #[serde(rename = "n")]
    Knight,
    #[serde(rename = "b")]
    Bishop,
    #[serde(rename = "r")]
    Rook,
    #[serde(rename = "q")]
    Queen,
    #[serde(rename = "k")]
    King,
}

/// One occupied square in a position projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceAt {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub color: Color,
}

/// Board projection sent to clients: algebraic square name to piece.
///
/// A `BTreeMap` keeps the serialized form deterministic.
pub type Position = BTreeMap<String, PieceAt>;

/// Time control requested at game creation. Seconds for the base time,
/// seconds added to the mover's clock after each of their moves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeControl {
    pub time: f64,
    pub increment: f64,
}

/// Both clocks as delivered to clients, rounded to one decimal place for
/// display. Internal accounting keeps full precision; only this boundary
/// type rounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockPair {
    pub white: f64,
    pub black: f64,
}

impl ClockPair {
    /// Build a display pair from full-precision remaining times.
    pub fn rounded(white: f64, black: f64) -> Self {
        Self {
            white: (white * 10.0).round() / 10.0,
            black: (black * 10.0).round() / 10.0,
        }
    }
}

/// Display form of a time control, e.g. `"5+3"` for 5 minutes + 3 seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControlName {
    pub name: String,
}

impl TimeControlName {
    pub fn from_seconds(base_secs: f64, increment: f64) -> Self {
        Self {
            name: format!("{}+{}", (base_secs / 60.0).floor() as u64, increment),
        }
    }
}

/// Discovery-facing projection of a waiting game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyGame {
    pub id: GameId,
    /// Host display name; null until the host registers one.
    pub host_name: Option<String>,
    pub mode: GameMode,
    pub time_control: TimeControlName,
}

/// Process-wide aggregate counters, incremented by move outcomes only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub captured_queens: u64,
    pub captured_pawns: u64,
    pub castled_kings: u64,
}

/// Counters that changed on a single move; absent fields did not change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_queens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_pawns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub castled_kings: Option<u64>,
}

impl StatsUpdate {
    pub fn is_empty(&self) -> bool {
        self.captured_queens.is_none()
            && self.captured_pawns.is_none()
            && self.castled_kings.is_none()
    }
}

/// An applied move as broadcast to both seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDesc {
    pub from: String,
    pub to: String,
    pub piece: PieceKind,
    pub color: Color,
}
