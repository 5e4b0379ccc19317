//! Compact board representation with an incrementally maintained Zobrist hash.
//!
//! The board the search driver owns: a flat `MAX_BS x MAX_BS` grid of cells
//! plus the XOR-folded position hash. Shape indexing and threat tracking live
//! in the VCF solvers; the driver fans `play`/`undo` out to them separately.

use crate::color::Color;
use crate::hash::{Hash128, ZOBRIST_KEYS};
use crate::loc::{Loc, BOARD_AREA};
use log::warn;

/// The driver-owned position: cell contents and position hash.
#[derive(Clone)]
pub struct Board {
    cells: [Color; BOARD_AREA],
    /// XOR of the stone keys of every occupied cell.
    pub pos_hash: Hash128,
    /// Number of stones on the board.
    pub stones: usize,
}

impl Board {
    pub fn new() -> Board {
        Board {
            cells: [Color::Empty; BOARD_AREA],
            pos_hash: Hash128::ZERO,
            stones: 0,
        }
    }

    pub fn get(&self, loc: Loc) -> Color {
        self.cells[loc]
    }

    pub fn cells(&self) -> &[Color; BOARD_AREA] {
        &self.cells
    }

    pub fn is_full(&self) -> bool {
        self.stones == BOARD_AREA
    }

    /// Places a stone and folds its key into the hash.
    ///
    /// Playing onto an occupied cell is a programming error on the search
    /// path; it is logged and the board is left in an undefined state.
    pub fn put(&mut self, color: Color, loc: Loc) {
        if self.cells[loc] != Color::Empty {
            warn!("illegal move: cell {} is not empty", loc);
        }
        self.cells[loc] = color;
        self.pos_hash ^= ZOBRIST_KEYS.stone(color, loc);
        self.stones += 1;
    }

    /// Removes a stone, returning its color. Inverse of `put`.
    pub fn remove(&mut self, loc: Loc) -> Color {
        let color = self.cells[loc];
        if color == Color::Empty {
            warn!("illegal undo: cell {} is empty", loc);
            return Color::Empty;
        }
        self.cells[loc] = Color::Empty;
        self.pos_hash ^= ZOBRIST_KEYS.stone(color, loc);
        self.stones -= 1;
        color
    }

    pub fn clear(&mut self) {
        self.cells = [Color::Empty; BOARD_AREA];
        self.pos_hash = Hash128::ZERO;
        self.stones = 0;
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loc::make_loc;

    #[test]
    fn test_put_remove_restores_hash() {
        let mut board = Board::new();
        let initial = board.pos_hash;
        board.put(Color::Black, make_loc(7, 7));
        board.put(Color::White, make_loc(8, 8));
        assert_ne!(board.pos_hash, initial);
        assert_eq!(board.remove(make_loc(8, 8)), Color::White);
        assert_eq!(board.remove(make_loc(7, 7)), Color::Black);
        assert_eq!(board.pos_hash, initial);
        assert_eq!(board.stones, 0);
    }

    #[test]
    fn test_hash_is_order_independent() {
        let mut a = Board::new();
        a.put(Color::Black, make_loc(1, 1));
        a.put(Color::White, make_loc(2, 2));
        let mut b = Board::new();
        b.put(Color::White, make_loc(2, 2));
        b.put(Color::Black, make_loc(1, 1));
        assert_eq!(a.pos_hash, b.pos_hash);
    }
}
