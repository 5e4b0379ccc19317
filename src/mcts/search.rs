//! The MCTS driver: PUCT selection, expansion, backup, and tree reuse.
//!
//! One driver owns the live board, the evaluator adapter, the NN summary
//! cache, and two VCF solvers (one per attacking color); every search-time
//! `play`/`undo` fans out to all of them so their incremental state stays
//! consistent. A full search first asks the mover's VCF solver for a forced
//! win and only falls back to tree search when there is none. During
//! expansion, each new edge is first probed with a capped VCF search from
//! the child position; a proven win becomes a terminal node and is never
//! recursed into.

use crate::board::Board;
use crate::color::{Color, Rule};
use crate::eval::{Accumulator, Evaluator, ValueSum, GLOBAL_FEATURE_NUM};
use crate::loc::{Loc, BOARD_AREA, MAX_BS, NULL_LOC};
use crate::mcts::node::{sure_result_wr, MctsNode, SureResult, POLICY_QUANT_INV};
use crate::mcts::params::SearchParams;
use crate::transposition::NnCache;
use crate::vcf::{self, VcfSolver};
use crate::EngineError;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Node budget and deepening limit of the root VCF fast path.
const ROOT_VCF_FACTOR: f64 = 10_000.0;
const ROOT_VCF_MAX_LAYER: u32 = 10;

/// Capped budget of the VCF probes run per expansion and per evaluation.
const PROBE_VCF_FACTOR: f64 = 5_000.0;
const PROBE_VCF_MAX_LAYER: u32 = 4;

/// What one descent (or batch of descents) reports back to its parent:
/// visits added below and the value delta in the descended node's frame.
#[derive(Clone, Copy, Debug, Default)]
struct SimResult {
    new_visits: u64,
    wr_change: ValueSum,
}

/// Everything the search mutates besides the tree itself. Kept separate so
/// a descent can hold `&mut` to both a node and the core.
pub struct SearchCore<A: Accumulator> {
    pub board: Board,
    pub evaluator: Evaluator<A>,
    pub nn_cache: NnCache,
    pub vcf: [VcfSolver; 2],
    pub params: SearchParams,
    pub rule: Rule,
    pub terminate: Arc<AtomicBool>,
}

impl<A: Accumulator> SearchCore<A> {
    /// Applies a move to the board and every incremental mirror.
    pub fn play_for_search(&mut self, color: Color, loc: Loc) {
        self.board.put(color, loc);
        self.evaluator.play(color, loc);
        self.vcf[0].play_outside(loc, color);
        self.vcf[1].play_outside(loc, color);
    }

    /// Inverse of `play_for_search`.
    pub fn undo_for_search(&mut self, loc: Loc) {
        let color = self.board.remove(loc);
        if color == Color::Empty {
            return;
        }
        self.evaluator.undo(color, loc);
        self.vcf[0].undo_outside(loc);
        self.vcf[1].undo_outside(loc);
    }

    /// Builds the global-feature vector for an evaluation with `next_color`
    /// to move. Slots 3..8 report VCF status: the mover is assumed to have
    /// none (the root fast path and expansion probes have already fired),
    /// and the opponent's solver is probed with the capped budget.
    pub fn global_features(&mut self, next_color: Color) -> [f32; GLOBAL_FEATURE_NUM] {
        let mut gf = [0f32; GLOBAL_FEATURE_NUM];
        gf[0] = self.board.stones as f32 / BOARD_AREA as f32;
        gf[1] = (self.rule == Rule::Standard) as u8 as f32;
        gf[2] = (self.rule == Rule::Renju) as u8 as f32;
        gf[3] = 1.0;
        gf[4] = 0.0;
        let opp = next_color.opponent();
        let (opp_vcf, _) = self.vcf[opp.index()].full_search(PROBE_VCF_FACTOR, PROBE_VCF_MAX_LAYER);
        match opp_vcf {
            vcf::SearchResult::Win => gf[5] = 1.0,
            vcf::SearchResult::Lose => gf[6] = 1.0,
            vcf::SearchResult::Uncertain => gf[7] = 1.0,
        }
        gf
    }

    /// Probes whether the position after `color` plays `next_move` is a
    /// proven win for the side then to move. Only the opponent-perspective
    /// VCF solver sees the temporary stone; the evaluator never does.
    fn check_sure_result(&mut self, next_move: Loc, color: Color) -> SureResult {
        let opp = color.opponent();
        self.vcf[opp.index()].play_outside(next_move, color);
        let (sr, _) = self.vcf[opp.index()].full_search(PROBE_VCF_FACTOR, PROBE_VCF_MAX_LAYER);
        self.vcf[opp.index()].undo_outside(next_move);
        if sr == vcf::SearchResult::Win {
            SureResult::Win
        } else {
            SureResult::Uncertain
        }
    }
}

fn selection_value(
    puct_factor: f64,
    value: f64,
    draw: f64,
    parent_draw: f64,
    child_visit: f64,
    child_policy: f64,
) -> f64 {
    value - 0.5 * draw * (1.0 - parent_draw) + puct_factor * child_policy / (child_visit + 1.0)
}

/// Picks the child index to descend into: expanded children compete on
/// inverted value plus exploration, and the first unexpanded edge competes
/// under first-play urgency. Returns `children_num` to request expansion.
fn select_child_id(params: &SearchParams, node: &MctsNode) -> usize {
    let children_num = node.children_num;
    if children_num == 0 {
        return 0;
    }

    let total_visit = node.visits as f64;
    let puct_factor =
        params.puct * ((total_visit + params.puct_base) / params.puct_base).powf(params.puct_pow);
    let parent_draw = node.wr_total.draw / total_visit;

    let mut best_value = f64::NEG_INFINITY;
    let mut best_id = 0;
    let mut total_child_policy = 0.0;
    for (i, edge) in node.children.iter().enumerate().take(children_num) {
        let child = edge.node.as_deref().unwrap();
        let visit = child.visits as f64;
        let value = -(child.wr_total.win - child.wr_total.loss) / visit;
        let draw = child.wr_total.draw / visit;
        let policy = edge.policy as f64 * POLICY_QUANT_INV;
        total_child_policy += policy;
        let sel = selection_value(puct_factor, value, draw, parent_draw, visit, policy);
        if sel > best_value {
            best_value = sel;
            best_id = i;
        }
    }

    if children_num < node.children.len() {
        let value = (node.wr_total.win - node.wr_total.loss) / total_visit
            - total_child_policy.sqrt() * params.fpu_reduction;
        let policy = node.children[children_num].policy as f64 * POLICY_QUANT_INV;
        let sel = selection_value(puct_factor, value, parent_draw, parent_draw, 0.0, policy);
        if sel > best_value {
            best_id = children_num;
        }
    }
    best_id
}

/// Runs up to `remain_visits` descents below `node`, which must reflect the
/// current `core.board` position. Returns the accumulated deltas in the
/// node's own frame; the caller inverts them across the parent boundary.
fn search_node<A: Accumulator>(
    core: &mut SearchCore<A>,
    node: &mut MctsNode,
    mut remain_visits: u64,
    is_root: bool,
) -> SimResult {
    if !is_root {
        let cap = (core.params.expand_factor * node.visits as f64) as u64 + 1;
        remain_visits = remain_visits.min(cap);
    }

    let mut out = SimResult::default();

    if node.sure_result != SureResult::Uncertain {
        node.visits += remain_visits;
        out.new_visits = remain_visits;
        out.wr_change = sure_result_wr(node.sure_result) * remain_visits as f64;
        node.wr_total = node.wr_total + out.wr_change;
        return out;
    }

    let color = node.next_color;
    let opp = color.opponent();
    while remain_visits > 0 && !core.terminate.load(Ordering::Relaxed) {
        let child_id = select_child_id(&core.params, node);
        let child_loc = node.children[child_id].loc;
        let child_sr;
        if child_id >= node.children_num {
            // Expansion: probe VCF from the child position first; only an
            // unproven child pays for an evaluation.
            node.children_num += 1;
            let sure = core.check_sure_result(child_loc, color);
            let child = if sure != SureResult::Uncertain {
                MctsNode::from_sure(sure, opp)
            } else {
                core.play_for_search(color, child_loc);
                let child = MctsNode::new_evaluated(core, opp);
                core.undo_for_search(child_loc);
                child
            };
            child_sr = SimResult {
                new_visits: 1,
                wr_change: child.wr_total,
            };
            node.children[child_id].node = Some(Box::new(child));
        } else {
            core.play_for_search(color, child_loc);
            let child = node.children[child_id].node.as_deref_mut().unwrap();
            child_sr = search_node(core, child, remain_visits, false);
            core.undo_for_search(child_loc);
        }

        remain_visits -= child_sr.new_visits;
        node.visits += child_sr.new_visits;
        let inverted = child_sr.wr_change.inverse();
        node.wr_total = node.wr_total + inverted;
        out.new_visits += child_sr.new_visits;
        out.wr_change = out.wr_change + inverted;
    }

    out
}

/// The public search driver.
pub struct MctsSearch<A: Accumulator> {
    core: SearchCore<A>,
    root: Option<Box<MctsNode>>,
    max_nodes: u64,
}

impl<A: Accumulator> MctsSearch<A> {
    /// Builds a driver around the two perspective accumulators. `cache_bits`
    /// sizes the NN summary cache at `1 << cache_bits` slots.
    pub fn new(black: A, white: A, rule: Rule, cache_bits: u32) -> MctsSearch<A> {
        MctsSearch {
            core: SearchCore {
                board: Board::new(),
                evaluator: Evaluator::new(black, white),
                nn_cache: NnCache::new(cache_bits),
                vcf: [
                    VcfSolver::new(rule, Color::Black),
                    VcfSolver::new(rule, Color::White),
                ],
                params: SearchParams::default(),
                rule,
                terminate: Arc::new(AtomicBool::new(false)),
            },
            root: None,
            max_nodes: 1000,
        }
    }

    /// Empties the board, frees the tree, and clears the evaluator caches.
    pub fn clear_board(&mut self) {
        self.core.evaluator.clear();
        self.core.board.clear();
        self.core.vcf[0].set_board(self.core.board.cells());
        self.core.vcf[1].set_board(self.core.board.cells());
        self.root = None;
    }

    /// Replaces the position, playing each occupied cell in row-major
    /// order. Dimensions other than `MAX_BS` are rejected.
    pub fn set_board(
        &mut self,
        cells: &[Color],
        x_size: usize,
        y_size: usize,
    ) -> Result<(), EngineError> {
        if x_size != MAX_BS || y_size != MAX_BS || cells.len() != BOARD_AREA {
            return Err(EngineError::UnsupportedSize(x_size, y_size));
        }
        self.clear_board();
        for (loc, &color) in cells.iter().enumerate() {
            if color != Color::Empty {
                self.play(color, loc);
            }
        }
        Ok(())
    }

    /// Applies a move and tries to promote the matching root subtree; the
    /// rest of the tree is freed. A missing edge, a side-to-move mismatch,
    /// or a proven root or child discards the whole tree instead.
    pub fn play(&mut self, color: Color, loc: Loc) {
        self.core.play_for_search(color, loc);
        if let Some(mut root) = self.root.take() {
            if root.sure_result == SureResult::Uncertain && root.next_color == color {
                for i in 0..root.children_num {
                    if root.children[i].loc == loc {
                        if let Some(subtree) = root.children[i].node.take() {
                            if subtree.sure_result == SureResult::Uncertain {
                                self.root = Some(subtree);
                            }
                        }
                        break;
                    }
                }
            }
        }
    }

    /// Undoes a move. The tree is always discarded.
    pub fn undo(&mut self, loc: Loc) {
        self.core.undo_for_search(loc);
        self.root = None;
    }

    /// Runs the root VCF fast path and then MCTS to `factor` total visits.
    /// Returns the value in `[-1, 1]` and the best move. On a VCF win the
    /// value is exactly `1.0` and the move is the solver's root attack.
    pub fn full_search(&mut self, color: Color, factor: f64) -> (f32, Loc) {
        self.core.vcf[0].set_board(self.core.board.cells());
        self.core.vcf[1].set_board(self.core.board.cells());

        let (vcf_result, vcf_move) =
            self.core.vcf[color.index()].full_search(ROOT_VCF_FACTOR, ROOT_VCF_MAX_LAYER);
        if vcf_result == vcf::SearchResult::Win {
            return (1.0, vcf_move);
        }

        if factor != 0.0 {
            self.max_nodes = factor as u64;
        }
        self.core.terminate.store(false, Ordering::Relaxed);

        if self
            .root
            .as_deref()
            .map_or(false, |root| root.next_color != color)
        {
            self.root = None;
        }
        if self.root.is_none() {
            self.root = Some(Box::new(MctsNode::new_evaluated(&mut self.core, color)));
        }

        let budget = self.max_nodes.saturating_sub(1);
        let MctsSearch { core, root, .. } = self;
        if let Some(node) = root.as_deref_mut() {
            search_node(core, node, budget, true);
        }

        (self.root_value(), self.best_root_move())
    }

    /// The root child with the most visits, ties broken by prior order.
    /// Falls back to the prior-top edge when nothing was expanded.
    pub fn best_root_move(&self) -> Loc {
        let root = match &self.root {
            Some(root) => root,
            None => return NULL_LOC,
        };
        if root.legal_children_num() == 0 {
            return NULL_LOC;
        }
        if root.children_num == 0 {
            return root.children[0].loc;
        }
        let mut best_visits = 0u64;
        let mut best = NULL_LOC;
        for edge in root.children.iter().take(root.children_num) {
            let visits = edge.node.as_deref().map_or(0, |n| n.visits);
            if visits > best_visits {
                best_visits = visits;
                best = edge.loc;
            }
        }
        best
    }

    pub fn root_visits(&self) -> u64 {
        self.root.as_deref().map_or(0, |root| root.visits)
    }

    /// Root value in `[-1, 1]` from the root side-to-move perspective.
    pub fn root_value(&self) -> f32 {
        match self.root.as_deref() {
            Some(root) => {
                ((root.wr_total.win - root.wr_total.loss) / root.visits as f64) as f32
            }
            None => 0.0,
        }
    }

    /// Cooperative cancellation handle: setting it true makes the search
    /// finish its current backup and return.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.core.terminate.clone()
    }

    pub fn load_param_file(&mut self, path: &Path) {
        self.core.params.load_from_file(path);
    }

    pub fn params_mut(&mut self) -> &mut SearchParams {
        &mut self.core.params
    }

    pub fn board(&self) -> &Board {
        &self.core.board
    }

    pub fn root(&self) -> Option<&MctsNode> {
        self.root.as_deref()
    }
}
