//! Chess960 starting-position generator.
//!
//! Produces one of the 960 legal back-rank arrangements: bishops on
//! opposite-colored files, king strictly between the rooks, everything else
//! on its conventional rank. Both sides get the mirror-identical arrangement.

use rand::Rng;

/// Generate a random Chess960 starting position as a full FEN string,
/// white to move with full castling rights for both sides.
pub fn generate_chess960_fen<R: Rng>(rng: &mut R) -> String {
    let rank = generate_back_rank(rng);
    let white: String = rank.iter().collect();
    let black = white.to_lowercase();
    format!("{black}/pppppppp/8/8/8/8/PPPPPPPP/{white} w KQkq - 0 1")
}

/// Generate the shared back rank as uppercase piece letters, file a..h.
fn generate_back_rank<R: Rng>(rng: &mut R) -> [char; 8] {
    let mut rank = ['.'; 8];

    // Bishops on opposite colors: one uniform over the even-indexed files,
    // one uniform over the odd-indexed files.
    rank[2 * rng.gen_range(0..4)] = 'B';
    rank[2 * rng.gen_range(0..4) + 1] = 'B';

    // Queen uniform over the six remaining files.
    let mut empty: Vec<usize> = (0..8).filter(|&f| rank[f] == '.').collect();
    rank[empty.remove(rng.gen_range(0..empty.len()))] = 'Q';

    // Two knights over the remaining five, then four.
    rank[empty.remove(rng.gen_range(0..empty.len()))] = 'N';
    rank[empty.remove(rng.gen_range(0..empty.len()))] = 'N';

    // The final three files, ascending: rook, king, rook. The king lands
    // strictly between the rooks by construction.
    debug_assert_eq!(empty.len(), 3);
    rank[empty[0]] = 'R';
    rank[empty[1]] = 'K';
    rank[empty[2]] = 'R';

    rank
}
