//! Zobrist Hashing Module
//!
//! This module implements 128-bit Zobrist hashing for Gomoku positions.
//! Every `(color, cell)` pair and every next-to-play color has a random
//! 128-bit key; a position hash is the XOR-fold of the keys of its stones,
//! optionally combined with the side to move. This is used for:
//!
//! - The NN transposition table (caching node priors and values)
//! - The VCF solver's result cache
//! - Detecting that `play`/`undo` pairs restore state exactly
//!
//! The keys are generated randomly at program startup and stay constant for
//! the lifetime of the process, so identical positions always hash
//! identically within a single run.

use crate::color::Color;
use crate::loc::{Loc, BOARD_AREA};
use lazy_static::lazy_static;
use rand::Rng;
use std::ops::{BitXor, BitXorAssign};

/// A 128-bit hash value combined by XOR.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Hash128 {
    pub lo: u64,
    pub hi: u64,
}

impl Hash128 {
    pub const ZERO: Hash128 = Hash128 { lo: 0, hi: 0 };

    pub fn new(lo: u64, hi: u64) -> Hash128 {
        Hash128 { lo, hi }
    }
}

impl BitXor for Hash128 {
    type Output = Hash128;

    fn bitxor(self, rhs: Hash128) -> Hash128 {
        Hash128 {
            lo: self.lo ^ rhs.lo,
            hi: self.hi ^ rhs.hi,
        }
    }
}

impl BitXorAssign for Hash128 {
    fn bitxor_assign(&mut self, rhs: Hash128) {
        self.lo ^= rhs.lo;
        self.hi ^= rhs.hi;
    }
}

/// The set of Zobrist keys used for hashing positions.
pub struct ZobristKeys {
    /// Keys per stone color (Black, White) and cell.
    stone_keys: [[Hash128; BOARD_AREA]; 2],
    /// Keys for the side to move next (Black, White).
    next_player_keys: [Hash128; 2],
    /// Keys mixed into VCF cache lookups per rule variant.
    rule_keys: [Hash128; 3],
    /// Keys mixed into VCF cache lookups per attacking color.
    attacker_keys: [Hash128; 2],
}

impl ZobristKeys {
    /// Generates a new set of random Zobrist keys.
    ///
    /// This should typically only be called once, to initialize the global
    /// `ZOBRIST_KEYS`.
    fn new() -> Self {
        let mut rng = rand::thread_rng();
        let mut gen = || Hash128::new(rng.gen(), rng.gen());

        let mut keys = ZobristKeys {
            stone_keys: [[Hash128::ZERO; BOARD_AREA]; 2],
            next_player_keys: [Hash128::ZERO; 2],
            rule_keys: [Hash128::ZERO; 3],
            attacker_keys: [Hash128::ZERO; 2],
        };
        for color in 0..2 {
            for loc in 0..BOARD_AREA {
                keys.stone_keys[color][loc] = gen();
            }
        }
        for color in 0..2 {
            keys.next_player_keys[color] = gen();
            keys.attacker_keys[color] = gen();
        }
        for rule in 0..3 {
            keys.rule_keys[rule] = gen();
        }
        keys
    }

    pub fn stone(&self, color: Color, loc: Loc) -> Hash128 {
        self.stone_keys[color.index()][loc]
    }

    pub fn next_player(&self, color: Color) -> Hash128 {
        self.next_player_keys[color.index()]
    }

    pub fn rule(&self, rule: crate::color::Rule) -> Hash128 {
        self.rule_keys[rule.index()]
    }

    pub fn attacker(&self, color: Color) -> Hash128 {
        self.attacker_keys[color.index()]
    }
}

// Create a single, global instance of ZobristKeys
lazy_static! {
    pub static ref ZOBRIST_KEYS: ZobristKeys = ZobristKeys::new();
}
