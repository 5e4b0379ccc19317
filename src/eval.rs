//! Neural evaluator adapter.
//!
//! The engine consumes the network through the opaque `Accumulator` trait:
//! an incrementally updated forward pass that can absorb single stone
//! additions and removals and produce a value triple plus policy logits on
//! demand. The weights and arithmetic behind it are someone else's problem.
//!
//! Two accumulators are kept, one per side-to-move perspective. Feeding
//! every search `play`/`undo` into both would double the incremental-update
//! cost for no benefit, so updates are instead appended to two per-color
//! move caches and replayed lazily when a perspective is actually evaluated.
//! Search traffic is dominated by play/undo pairs, and an append that
//! exactly inverts the cache's newest entry cancels it instead, which keeps
//! the caches near-empty over long searches.

use crate::color::Color;
use crate::loc::{Loc, BOARD_AREA};
use log::warn;

/// Number of global feature floats fed to every evaluation.
pub const GLOBAL_FEATURE_NUM: usize = 8;

/// Quantized fixed-point policy logit.
pub type PolicyType = i32;

/// Policy value forced onto illegal (occupied) cells before sorting.
pub const MIN_POLICY: PolicyType = -(1 << 30);

/// Scale between quantized policy logits and natural-log units.
pub const POLICY_QUANT_FACTOR: f64 = 32.0;

/// A (win, loss, draw) probability triple, also used as accumulated
/// statistics inside the MCTS tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ValueSum {
    pub win: f64,
    pub loss: f64,
    pub draw: f64,
}

impl ValueSum {
    pub fn new(win: f64, loss: f64, draw: f64) -> ValueSum {
        ValueSum { win, loss, draw }
    }

    /// The same outcome seen from the other player: win and loss swap.
    pub fn inverse(self) -> ValueSum {
        ValueSum {
            win: self.loss,
            loss: self.win,
            draw: self.draw,
        }
    }
}

impl std::ops::Add for ValueSum {
    type Output = ValueSum;

    fn add(self, rhs: ValueSum) -> ValueSum {
        ValueSum {
            win: self.win + rhs.win,
            loss: self.loss + rhs.loss,
            draw: self.draw + rhs.draw,
        }
    }
}

impl std::ops::Mul<f64> for ValueSum {
    type Output = ValueSum;

    fn mul(self, rhs: f64) -> ValueSum {
        ValueSum {
            win: self.win * rhs,
            loss: self.loss * rhs,
            draw: self.draw * rhs,
        }
    }
}

/// The opaque incremental network: one perspective's accumulator.
///
/// Implementations see the board through the stream of `play`/`undo` calls
/// and answer `evaluate_full` for the position those calls have built up.
/// Colors arrive already translated so that the accumulator's own side is
/// always `Color::Black`.
pub trait Accumulator {
    fn play(&mut self, color: Color, loc: Loc);
    fn undo(&mut self, loc: Loc);
    fn clear(&mut self);
    /// Runs the forward pass: writes policy logits for every cell and
    /// returns the (win, loss, draw) triple for the side to move.
    fn evaluate_full(
        &mut self,
        global_features: &[f32; GLOBAL_FEATURE_NUM],
        policy: &mut [PolicyType; BOARD_AREA],
    ) -> ValueSum;
}

/// One deferred accumulator update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct MoveRecord {
    is_undo: bool,
    color: Color,
    loc: Loc,
}

/// True when `b` exactly inverts `a`: same stone, opposite operation.
/// Two identical non-inverse records would mean the same stone was played
/// (or removed) twice in a row, which is a logic error upstream.
fn is_contrary(a: MoveRecord, b: MoveRecord) -> bool {
    if a.loc != b.loc || a.color != b.color {
        return false;
    }
    if a.is_undo != b.is_undo {
        return true;
    }
    warn!(
        "evaluator move cache: duplicate non-inverse update at {}",
        a.loc
    );
    debug_assert!(false, "duplicate non-inverse move cache entry");
    false
}

/// Double-buffered evaluator front end owning one accumulator per
/// perspective color plus their pending-update caches.
pub struct Evaluator<A: Accumulator> {
    black: A,
    white: A,
    cache_black: Vec<MoveRecord>,
    cache_white: Vec<MoveRecord>,
}

impl<A: Accumulator> Evaluator<A> {
    pub fn new(black: A, white: A) -> Evaluator<A> {
        Evaluator {
            black,
            white,
            cache_black: Vec::new(),
            cache_white: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.cache_black.clear();
        self.cache_white.clear();
        self.black.clear();
        self.white.clear();
    }

    pub fn play(&mut self, color: Color, loc: Loc) {
        self.add_cache(MoveRecord {
            is_undo: false,
            color,
            loc,
        });
    }

    pub fn undo(&mut self, color: Color, loc: Loc) {
        self.add_cache(MoveRecord {
            is_undo: true,
            color,
            loc,
        });
    }

    fn add_cache(&mut self, rec: MoveRecord) {
        // The two caches compact independently; each is flushed before its
        // accumulator is read, so their lengths are free to diverge.
        match self.cache_black.last() {
            Some(&last) if is_contrary(last, rec) => {
                self.cache_black.pop();
            }
            _ => self.cache_black.push(rec),
        }
        match self.cache_white.last() {
            Some(&last) if is_contrary(last, rec) => {
                self.cache_white.pop();
            }
            _ => self.cache_white.push(rec),
        }
    }

    /// Replays the pending updates of one perspective into its accumulator.
    /// The white accumulator sees colors flipped, so that each accumulator
    /// evaluates as if its own side were Black.
    fn clear_cache(&mut self, color: Color) {
        if color == Color::Black {
            for rec in self.cache_black.drain(..) {
                if rec.is_undo {
                    self.black.undo(rec.loc);
                } else {
                    self.black.play(rec.color, rec.loc);
                }
            }
        } else {
            for rec in self.cache_white.drain(..) {
                if rec.is_undo {
                    self.white.undo(rec.loc);
                } else {
                    self.white.play(rec.color.opponent(), rec.loc);
                }
            }
        }
    }

    /// Synchronizes the `next_color` perspective and runs its forward pass.
    pub fn evaluate_full(
        &mut self,
        global_features: &[f32; GLOBAL_FEATURE_NUM],
        next_color: Color,
        policy: &mut [PolicyType; BOARD_AREA],
    ) -> ValueSum {
        self.clear_cache(next_color);
        if next_color == Color::Black {
            self.black.evaluate_full(global_features, policy)
        } else {
            self.white.evaluate_full(global_features, policy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loc::make_loc;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records the update stream it receives.
    struct Probe {
        log: Rc<RefCell<Vec<(bool, Color, Loc)>>>,
    }

    impl Accumulator for Probe {
        fn play(&mut self, color: Color, loc: Loc) {
            self.log.borrow_mut().push((false, color, loc));
        }
        fn undo(&mut self, loc: Loc) {
            self.log.borrow_mut().push((true, Color::Empty, loc));
        }
        fn clear(&mut self) {
            self.log.borrow_mut().clear();
        }
        fn evaluate_full(
            &mut self,
            _gf: &[f32; GLOBAL_FEATURE_NUM],
            _policy: &mut [PolicyType; BOARD_AREA],
        ) -> ValueSum {
            ValueSum::new(0.4, 0.4, 0.2)
        }
    }

    fn probe_pair() -> (
        Evaluator<Probe>,
        Rc<RefCell<Vec<(bool, Color, Loc)>>>,
        Rc<RefCell<Vec<(bool, Color, Loc)>>>,
    ) {
        let black_log = Rc::new(RefCell::new(Vec::new()));
        let white_log = Rc::new(RefCell::new(Vec::new()));
        let eval = Evaluator::new(
            Probe {
                log: black_log.clone(),
            },
            Probe {
                log: white_log.clone(),
            },
        );
        (eval, black_log, white_log)
    }

    #[test]
    fn test_play_undo_pair_cancels_without_touching_accumulator() {
        let (mut eval, black_log, _) = probe_pair();
        let loc = make_loc(7, 7);
        eval.play(Color::Black, loc);
        eval.undo(Color::Black, loc);
        let mut policy = [0; BOARD_AREA];
        eval.evaluate_full(&[0.0; GLOBAL_FEATURE_NUM], Color::Black, &mut policy);
        assert!(black_log.borrow().is_empty());
    }

    #[test]
    fn test_non_inverse_entries_replay_in_order() {
        let (mut eval, black_log, _) = probe_pair();
        eval.play(Color::Black, make_loc(1, 1));
        eval.play(Color::White, make_loc(2, 2));
        let mut policy = [0; BOARD_AREA];
        eval.evaluate_full(&[0.0; GLOBAL_FEATURE_NUM], Color::Black, &mut policy);
        let log = black_log.borrow();
        assert_eq!(
            *log,
            vec![
                (false, Color::Black, make_loc(1, 1)),
                (false, Color::White, make_loc(2, 2)),
            ]
        );
    }

    #[test]
    fn test_white_accumulator_sees_flipped_colors() {
        let (mut eval, _, white_log) = probe_pair();
        eval.play(Color::Black, make_loc(3, 3));
        let mut policy = [0; BOARD_AREA];
        eval.evaluate_full(&[0.0; GLOBAL_FEATURE_NUM], Color::White, &mut policy);
        assert_eq!(*white_log.borrow(), vec![(false, Color::White, make_loc(3, 3))]);
    }

    #[test]
    fn test_caches_flush_independently() {
        let (mut eval, black_log, white_log) = probe_pair();
        eval.play(Color::Black, make_loc(4, 4));
        let mut policy = [0; BOARD_AREA];
        eval.evaluate_full(&[0.0; GLOBAL_FEATURE_NUM], Color::Black, &mut policy);
        assert_eq!(black_log.borrow().len(), 1);
        assert!(white_log.borrow().is_empty());
        // A later white evaluation still replays the full white backlog.
        eval.play(Color::White, make_loc(5, 5));
        eval.evaluate_full(&[0.0; GLOBAL_FEATURE_NUM], Color::White, &mut policy);
        assert_eq!(white_log.borrow().len(), 2);
    }

    #[test]
    fn test_interleaved_pair_does_not_cancel() {
        // play A, play B, undo A: A and its undo are not adjacent, so the
        // cache must keep all three records.
        let (mut eval, black_log, _) = probe_pair();
        let a = make_loc(1, 2);
        let b = make_loc(3, 4);
        eval.play(Color::Black, a);
        eval.play(Color::White, b);
        eval.undo(Color::Black, a);
        let mut policy = [0; BOARD_AREA];
        eval.evaluate_full(&[0.0; GLOBAL_FEATURE_NUM], Color::Black, &mut policy);
        assert_eq!(black_log.borrow().len(), 3);
    }

    #[test]
    fn test_value_sum_inverse_and_arithmetic() {
        let v = ValueSum::new(0.6, 0.3, 0.1);
        let inv = v.inverse();
        assert_eq!(inv.win, 0.3);
        assert_eq!(inv.loss, 0.6);
        assert_eq!(inv.draw, 0.1);
        let doubled = v * 2.0;
        assert_eq!(doubled.win, 1.2);
        let sum = v + inv;
        assert!((sum.win - 0.9).abs() < 1e-12);
    }
}
