//! Real-time session server for turn-based chess variants.
//!
//! Clients connect over WebSocket and exchange tagged JSON frames. A single
//! registry task owns all state: the player roster, the waiting-game lobby
//! with its process-wide counters, and the live game sessions with their
//! racing clocks.

pub mod config;
pub mod connection;
pub mod errors;
pub mod game;
pub mod lobby;
pub mod registry;
