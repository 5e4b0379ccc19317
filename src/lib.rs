//! # Gomoku Engine Library
//!
//! This library implements the search core of a Gomoku/Renju engine built
//! around a neural-network position evaluator: Monte Carlo Tree Search under
//! a PUCT selection rule, with a Victory-by-Continuous-Fours solver used both
//! as a terminal-state oracle inside the tree and as a fast path at the root.
//!
//! It provides modules for:
//! - Board representation (`board`, `loc`, `color`)
//! - Incremental line-shape indexing (`shape`)
//! - Forced-win proving over four-threats (`vcf`)
//! - Neural evaluator adaptation and caching (`eval`, `transposition`)
//! - Tree search (`mcts`)
//! - Hashing (`hash`)

use thiserror::Error;

pub mod board;
pub mod color;
pub mod eval;
pub mod hash;
pub mod loc;
pub mod mcts;
pub mod shape;
pub mod transposition;
pub mod vcf;

/// Errors reported on the cold paths of the engine.
///
/// Hot-path misuse (playing onto an occupied cell during search) is a
/// programming error and is only logged; see `board::Board`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unsupported board size {0}x{1}, engine is fixed at {max}x{max}", max = loc::MAX_BS)]
    UnsupportedSize(usize, usize),
}
