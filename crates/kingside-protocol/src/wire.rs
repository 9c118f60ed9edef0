//! Tagged JSON message types for both directions of a connection.
//!
//! Every frame is a JSON object `{"type": ..., "data": ...}`. The `type`
//! discriminator is snake_case; payload fields are camelCase. Decoding
//! distinguishes an unparseable frame from a well-formed frame carrying an
//! unknown discriminator so the server can answer each with the right error.

use serde::{Deserialize, Serialize};

use crate::ids::GameId;
use crate::types::{
    ClockPair, Color, GameMode, GlobalStats, LobbyGame, MoveDesc, Position, StatsUpdate,
    TimeControl,
};

/// Client-to-server messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Set the display name for this connection.
    Register { name: String },
    /// Request the current lobby view.
    GetWaitingGames {},
    /// Create a game; the creator is seated on a random color.
    #[serde(rename_all = "camelCase")]
    CreateGame {
        mode: GameMode,
        time_control: TimeControl,
    },
    /// Take the open seat in a waiting game.
    #[serde(rename_all = "camelCase")]
    JoinGame { game_id: GameId },
    /// Propose a move. `player_color` is advisory; the server trusts the
    /// requester's seat, not this field.
    #[serde(rename_all = "camelCase")]
    MakeMove {
        game_id: GameId,
        from: String,
        to: String,
        player_color: Color,
    },
    #[serde(rename_all = "camelCase")]
    OfferDraw { game_id: GameId },
    #[serde(rename_all = "camelCase")]
    AcceptDraw { game_id: GameId },
    #[serde(rename_all = "camelCase")]
    DeclineDraw { game_id: GameId },
    #[serde(rename_all = "camelCase")]
    Resign { game_id: GameId },
}

/// Server-to-client messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Lobby view: all waiting games plus the process-wide counters.
    #[serde(rename_all = "camelCase")]
    WaitingGames {
        games: Vec<LobbyGame>,
        global_stats: GlobalStats,
    },
    /// Creation acknowledgment to the creator only.
    #[serde(rename_all = "camelCase")]
    GameCreated {
        game_id: GameId,
        color: Color,
        position: Position,
        time_control: ClockPair,
    },
    /// Join acknowledgment to the joiner only.
    #[serde(rename_all = "camelCase")]
    GameJoined {
        game_id: GameId,
        color: Color,
        position: Position,
        opponent: Option<String>,
        time_control: ClockPair,
    },
    /// Sent to the already-seated player when the second seat fills.
    #[serde(rename_all = "camelCase")]
    OpponentJoined {
        opponent: Option<String>,
        time_control: ClockPair,
    },
    /// An applied move, broadcast to both seats.
    #[serde(rename_all = "camelCase")]
    MoveMade {
        #[serde(rename = "move")]
        mv: MoveDesc,
        position: Position,
        time_left: ClockPair,
        next_turn: Color,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<StatsUpdate>,
    },
    DrawOffered {},
    DrawDeclined {},
    /// Terminal notice with a human-readable result string.
    GameOver { result: String },
    Error { message: String },
}

/// Decode failures, split so the server can answer each kind distinctly.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("invalid message format: {0}")]
    Malformed(String),
    #[error("unknown message type: {0}")]
    UnknownType(String),
}

/// Discriminators `decode_client_message` recognizes.
const CLIENT_TYPES: [&str; 9] = [
    "register",
    "get_waiting_games",
    "create_game",
    "join_game",
    "make_move",
    "offer_draw",
    "accept_draw",
    "decline_draw",
    "resign",
];

/// Decode an inbound text frame into a typed client message.
pub fn decode_client_message(raw: &str) -> Result<ClientMessage, WireError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| WireError::Malformed(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| WireError::Malformed("missing type discriminator".into()))?;

    if !CLIENT_TYPES.contains(&kind) {
        return Err(WireError::UnknownType(kind.to_string()));
    }

    serde_json::from_value(value).map_err(|e| WireError::Malformed(e.to_string()))
}

/// Encode an outbound message as a text frame.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
