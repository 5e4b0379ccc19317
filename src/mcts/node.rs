//! Defines the node structure for the MCTS tree.

use crate::color::Color;
use crate::eval::{Accumulator, PolicyType, ValueSum, MIN_POLICY, POLICY_QUANT_FACTOR};
use crate::hash::ZOBRIST_KEYS;
use crate::loc::{Loc, BOARD_AREA};
use crate::mcts::search::SearchCore;
use crate::transposition::NodeSummary;

/// Upper bound on child edges a node keeps; the policy tail beyond this is
/// never searched.
pub const MAX_MCTS_CHILDREN: usize = 32;

/// Scale for the quantized per-child prior stored in each edge.
pub const POLICY_QUANT: f64 = 50_000.0;
pub const POLICY_QUANT_INV: f64 = 1.0 / POLICY_QUANT;

/// Proven outcome of a node, from its own side-to-move perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SureResult {
    Uncertain,
    Win,
    Lose,
    Draw,
}

/// The value triple a proven node contributes per visit.
pub fn sure_result_wr(sr: SureResult) -> ValueSum {
    match sr {
        SureResult::Win => ValueSum::new(1.0, 0.0, 0.0),
        SureResult::Lose => ValueSum::new(0.0, 1.0, 0.0),
        SureResult::Draw => ValueSum::new(0.0, 0.0, 1.0),
        SureResult::Uncertain => unreachable!("uncertain node has no fixed value"),
    }
}

/// One child edge: the move, its quantized prior, and the subtree, which
/// stays `None` until the edge is first expanded. The edge exists because
/// the policy reserved it.
#[derive(Debug)]
pub struct MctsChild {
    pub loc: Loc,
    pub policy: u16,
    pub node: Option<Box<MctsNode>>,
}

/// A node in the Monte Carlo search tree.
///
/// `wr_total` is accumulated in the node's own side-to-move frame; parents
/// invert it when folding child statistics upward. `visits` starts at 1:
/// the node's own leaf evaluation counts as its first visit.
#[derive(Debug)]
pub struct MctsNode {
    pub next_color: Color,
    pub sure_result: SureResult,
    pub visits: u64,
    pub wr_total: ValueSum,
    /// Legal child edges sorted by descending prior; ordering is fixed at
    /// creation.
    pub children: Vec<MctsChild>,
    /// How many leading edges have been expanded into subtrees.
    pub children_num: usize,
}

impl MctsNode {
    /// A terminal node with a proven result; it never grows children.
    pub fn from_sure(sure_result: SureResult, next_color: Color) -> MctsNode {
        MctsNode {
            next_color,
            sure_result,
            visits: 1,
            wr_total: sure_result_wr(sure_result),
            children: Vec::new(),
            children_num: 0,
        }
    }

    /// Creates a node for the current core position with `next_color` to
    /// move: either a copy of a cached summary or a fresh evaluation whose
    /// summary is cached for next time. A position with no legal cells
    /// becomes a `Draw` terminal (and is not cached).
    pub fn new_evaluated<A: Accumulator>(core: &mut SearchCore<A>, next_color: Color) -> MctsNode {
        let mut node = MctsNode {
            next_color,
            sure_result: SureResult::Uncertain,
            visits: 1,
            wr_total: ValueSum::default(),
            children: Vec::new(),
            children_num: 0,
        };

        let state_hash = core.board.pos_hash ^ ZOBRIST_KEYS.next_player(next_color);
        if let Some(hit) = core.nn_cache.probe(state_hash) {
            node.wr_total = hit.wr;
            node.children = hit
                .edges
                .iter()
                .map(|&(loc, policy)| MctsChild {
                    loc,
                    policy,
                    node: None,
                })
                .collect();
            return node;
        }

        let gf = core.global_features(next_color);
        let mut policy = [0 as PolicyType; BOARD_AREA];
        node.wr_total = core.evaluator.evaluate_full(&gf, next_color, &mut policy);
        for loc in 0..BOARD_AREA {
            if core.board.get(loc) != Color::Empty {
                policy[loc] = MIN_POLICY;
            }
        }

        // Top edges by raw policy; occupied cells sank to the tail, so the
        // legal prefix ends at the first occupied entry.
        let mut order: Vec<Loc> = (0..BOARD_AREA).collect();
        order.select_nth_unstable_by(MAX_MCTS_CHILDREN - 1, |&a, &b| policy[b].cmp(&policy[a]));
        order.truncate(MAX_MCTS_CHILDREN);
        order.sort_unstable_by(|&a, &b| policy[b].cmp(&policy[a]));
        let legal = order
            .iter()
            .position(|&loc| core.board.get(loc) != Color::Empty)
            .unwrap_or(MAX_MCTS_CHILDREN);

        if legal == 0 {
            node.sure_result = SureResult::Draw;
            node.wr_total = sure_result_wr(SureResult::Draw);
            return node;
        }

        let max_raw = policy[order[0]];
        let inv_q = 1.0 / (POLICY_QUANT_FACTOR * core.params.policy_temp);
        let soft: Vec<f64> = order[..legal]
            .iter()
            .map(|&loc| (((policy[loc] - max_raw) as f64) * inv_q).exp())
            .collect();
        let norm: f64 = soft.iter().sum();
        node.children = order[..legal]
            .iter()
            .zip(&soft)
            .map(|(&loc, &s)| MctsChild {
                loc,
                policy: (s / norm * POLICY_QUANT) as u16 + 1,
                node: None,
            })
            .collect();

        core.nn_cache.store(NodeSummary {
            key: state_hash,
            edges: node.children.iter().map(|c| (c.loc, c.policy)).collect(),
            wr: node.wr_total,
        });
        node
    }

    pub fn legal_children_num(&self) -> usize {
        self.children.len()
    }
}
