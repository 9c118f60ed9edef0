//! Rules-engine adapter.
//!
//! Wraps the `chess` crate behind the narrow capability the session layer
//! needs: validate-and-apply a move (auto-queening promotions), report the
//! side to move, and detect terminal states. The library supplies legality,
//! checkmate and stalemate; the adapter layers threefold-repetition,
//! fifty-move and insufficient-material detection on top, plus the captured
//! piece and castling flags the global counters consume.
//!
//! The board representation never leaves this module except as the wire
//! projection (`position()`).

use std::collections::HashMap;
use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, MoveGen, Piece, Rank, Square, ALL_SQUARES};
use rand::Rng;
use tracing::warn;

use kingside_protocol::{Color, GameMode, PieceAt, PieceKind, Position};

use super::position::generate_chess960_fen;

/// A validated, applied move as reported back to the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedMove {
    pub from: String,
    pub to: String,
    pub piece: PieceKind,
    pub color: Color,
    pub captured: Option<PieceKind>,
    pub castled: bool,
}

/// Terminal states the adapter can report after a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal {
    Checkmate { winner: Color },
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMoveRule,
}

impl Terminal {
    /// Human-readable result string delivered in `game_over`.
    pub fn result_string(self) -> String {
        match self {
            Terminal::Checkmate { winner } => format!("{winner} wins by checkmate"),
            Terminal::Stalemate => "Draw by stalemate".into(),
            Terminal::ThreefoldRepetition => "Draw by threefold repetition".into(),
            Terminal::InsufficientMaterial => "Draw by insufficient material".into(),
            Terminal::FiftyMoveRule => "Draw by 50-move rule".into(),
        }
    }
}

/// Rejections from `try_move`. The session surfaces both as `InvalidMove`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejected {
    #[error("square name is not valid")]
    BadSquare,
    #[error("move is not legal in this position")]
    Illegal,
}

/// Board ownership plus the draw bookkeeping the library does not track.
pub struct RulesAdapter {
    board: Board,
    /// Plies since the last capture or pawn move.
    halfmove_clock: u32,
    /// Occurrence count per position hash since the last irreversible move.
    repetitions: HashMap<u64, u32>,
}

impl RulesAdapter {
    /// Starting adapter for the given mode. Chess960 draws a fresh back rank
    /// from `rng`; a generated position the engine cannot parse falls back to
    /// stripped castling rights, then to the standard arrangement.
    pub fn from_start<R: Rng>(mode: GameMode, rng: &mut R) -> Self {
        match mode {
            GameMode::Standard => Self::from_board(Board::default()),
            GameMode::Chess960 => {
                let fen = generate_chess960_fen(rng);
                match Self::from_fen(&fen) {
                    Ok(adapter) => adapter,
                    Err(_) => {
                        warn!("generated position rejected by engine, using standard setup");
                        Self::from_board(Board::default())
                    }
                }
            }
        }
    }

    /// Build from a FEN string. If the engine rejects the castling rights
    /// (possible for shuffled back ranks), retry with rights stripped.
    pub fn from_fen(fen: &str) -> Result<Self, chess::Error> {
        match Board::from_str(fen) {
            Ok(board) => Ok(Self::from_board(board)),
            Err(err) => {
                let fields: Vec<&str> = fen.split_whitespace().collect();
                if fields.len() != 6 || fields[2] == "-" {
                    return Err(err);
                }
                let mut stripped = fields.clone();
                stripped[2] = "-";
                let board = Board::from_str(&stripped.join(" "))?;
                Ok(Self::from_board(board))
            }
        }
    }

    fn from_board(board: Board) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(board.get_hash(), 1);
        Self {
            board,
            halfmove_clock: 0,
            repetitions,
        }
    }

    /// The color whose turn it is.
    pub fn side_to_move(&self) -> Color {
        color_from_engine(self.board.side_to_move())
    }

    /// Validate and apply a move. Pawns reaching the last rank auto-promote
    /// to a queen; the protocol has no player-chosen promotion.
    pub fn try_move(&mut self, from: &str, to: &str) -> Result<AppliedMove, MoveRejected> {
        let from_sq = Square::from_str(from).map_err(|_| MoveRejected::BadSquare)?;
        let to_sq = Square::from_str(to).map_err(|_| MoveRejected::BadSquare)?;

        let piece = self.board.piece_on(from_sq).ok_or(MoveRejected::Illegal)?;
        let mover = self.side_to_move();

        let last_rank = match mover {
            Color::White => Rank::Eighth,
            Color::Black => Rank::First,
        };
        let promotion = (piece == Piece::Pawn && to_sq.get_rank() == last_rank)
            .then_some(Piece::Queen);

        let mv = ChessMove::new(from_sq, to_sq, promotion);
        if !MoveGen::new_legal(&self.board).any(|legal| legal == mv) {
            return Err(MoveRejected::Illegal);
        }

        // Capture and castling flags come from the pre-move position. A pawn
        // landing diagonally on an empty square is an en-passant capture.
        let mut captured = self.board.piece_on(to_sq);
        if captured.is_none()
            && piece == Piece::Pawn
            && from_sq.get_file() != to_sq.get_file()
        {
            captured = Some(Piece::Pawn);
        }
        let file_shift = from_sq
            .get_file()
            .to_index()
            .abs_diff(to_sq.get_file().to_index());
        let castled = piece == Piece::King && file_shift >= 2;

        self.board = self.board.make_move_new(mv);

        if captured.is_some() || piece == Piece::Pawn {
            // Irreversible move: earlier positions can never recur.
            self.halfmove_clock = 0;
            self.repetitions.clear();
        } else {
            self.halfmove_clock += 1;
        }
        *self.repetitions.entry(self.board.get_hash()).or_insert(0) += 1;

        Ok(AppliedMove {
            from: from_sq.to_string(),
            to: to_sq.to_string(),
            piece: kind_from_engine(piece),
            color: mover,
            captured: captured.map(kind_from_engine),
            castled,
        })
    }

    /// Terminal state of the current position, if any.
    pub fn terminal(&self) -> Option<Terminal> {
        match self.board.status() {
            BoardStatus::Checkmate => Some(Terminal::Checkmate {
                // The side to move is the one mated.
                winner: self.side_to_move().opposite(),
            }),
            BoardStatus::Stalemate => Some(Terminal::Stalemate),
            BoardStatus::Ongoing => {
                if self.repetitions.values().any(|&n| n >= 3) {
                    Some(Terminal::ThreefoldRepetition)
                } else if self.insufficient_material() {
                    Some(Terminal::InsufficientMaterial)
                } else if self.halfmove_clock >= 100 {
                    Some(Terminal::FiftyMoveRule)
                } else {
                    None
                }
            }
        }
    }

    /// Wire-format projection: algebraic square name to `{type, color}`.
    pub fn position(&self) -> Position {
        let mut position = Position::new();
        for sq in ALL_SQUARES {
            if let (Some(piece), Some(color)) = (self.board.piece_on(sq), self.board.color_on(sq)) {
                position.insert(
                    sq.to_string(),
                    PieceAt {
                        kind: kind_from_engine(piece),
                        color: color_from_engine(color),
                    },
                );
            }
        }
        position
    }

    /// Neither side can force mate: bare kings, a lone minor piece, or
    /// bishops only with every bishop on the same square color.
    fn insufficient_material(&self) -> bool {
        let mut minors = 0usize;
        let mut bishop_square_colors = Vec::new();

        for sq in ALL_SQUARES {
            let Some(piece) = self.board.piece_on(sq) else {
                continue;
            };
            match piece {
                Piece::King => {}
                Piece::Pawn | Piece::Rook | Piece::Queen => return false,
                Piece::Knight => minors += 1,
                Piece::Bishop => {
                    minors += 1;
                    let shade = (sq.get_rank().to_index() + sq.get_file().to_index()) % 2;
                    bishop_square_colors.push(shade);
                }
            }
        }

        if minors <= 1 {
            return true;
        }
        // Two or more minors: drawn only if all are same-shade bishops.
        bishop_square_colors.len() == minors
            && bishop_square_colors.windows(2).all(|w| w[0] == w[1])
    }
}

fn kind_from_engine(piece: Piece) -> PieceKind {
    match piece {
        Piece::Pawn => PieceKind::Pawn,
        Piece::Knight => PieceKind::Knight,
        Piece::Bishop => PieceKind::Bishop,
        Piece::Rook => PieceKind::Rook,
        Piece::Queen => PieceKind::Queen,
        Piece::King => PieceKind::King,
    }
}

fn color_from_engine(color: chess::Color) -> Color {
    match color {
        chess::Color::White => Color::White,
        chess::Color::Black => Color::Black,
    }
}
