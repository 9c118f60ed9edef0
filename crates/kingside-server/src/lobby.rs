//! Lobby state: the waiting-game roster and the process-wide counters.
//!
//! The roster is insertion-ordered so the lobby view lists older games
//! first. The counters only ever grow, and only from move outcomes.

use kingside_protocol::{GameId, GlobalStats, PieceKind, StatsUpdate};

use crate::game::AppliedMove;

#[derive(Debug, Default)]
pub struct Lobby {
    waiting: Vec<GameId>,
    stats: GlobalStats,
}

impl Lobby {
    pub fn add_waiting(&mut self, game: GameId) {
        self.waiting.push(game);
    }

    /// Returns true if the game was on the roster.
    pub fn remove_waiting(&mut self, game: GameId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|&id| id != game);
        self.waiting.len() != before
    }

    pub fn is_waiting(&self, game: GameId) -> bool {
        self.waiting.contains(&game)
    }

    pub fn waiting_ids(&self) -> impl Iterator<Item = GameId> + '_ {
        self.waiting.iter().copied()
    }

    pub fn stats(&self) -> GlobalStats {
        self.stats
    }

    /// Fold a move outcome into the counters. Returns the delta of changed
    /// counters (as new totals), or `None` if nothing changed.
    pub fn record_move(&mut self, applied: &AppliedMove) -> Option<StatsUpdate> {
        let mut update = StatsUpdate::default();
        match applied.captured {
            Some(PieceKind::Queen) => {
                self.stats.captured_queens += 1;
                update.captured_queens = Some(self.stats.captured_queens);
            }
            Some(PieceKind::Pawn) => {
                self.stats.captured_pawns += 1;
                update.captured_pawns = Some(self.stats.captured_pawns);
            }
            _ => {}
        }
        if applied.castled {
            self.stats.castled_kings += 1;
            update.castled_kings = Some(self.stats.castled_kings);
        }
        (!update.is_empty()).then_some(update)
    }
}
