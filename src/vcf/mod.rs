//! Victory-by-Continuous-Fours solver.
//!
//! Decides whether the side to move can force a win using only four-threats:
//! every attacking move creates a four (a line one stone short of five), the
//! defender is forced to block the unique completion square, and the chain
//! ends when an attacking move makes five outright, a straight four, or a
//! double four. The solver serves two callers: the MCTS driver probes it
//! from candidate child positions to short-circuit proven wins into terminal
//! nodes, and the root search runs it first as a fast path.
//!
//! Each solver instance is fixed to one attacking color and keeps its own
//! padded cell grid, shape index and incrementally maintained threat list,
//! updated from the outside on every driver `play`/`undo`. Search budgets
//! are pure node counts; exceeding one degrades a would-be "no win" into
//! `Uncertain` instead.

mod table;

pub use table::VcfTable;

use crate::color::{Color, Rule};
use crate::hash::{Hash128, ZOBRIST_KEYS};
use crate::loc::{
    from_padded, to_padded, Loc, BOARD_AREA, DIR_DELTAS, NULL_LOC, PADDED_AREA,
};
use crate::shape::{analyze_placement, compute_shape, LineCell, Persp, ShapeCell};
use smallvec::{smallvec, SmallVec};

/// Outcome of a VCF search from the current position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchResult {
    /// A forced win by continuous fours was proven.
    Win,
    /// No such win exists within the layer budget.
    Lose,
    /// The node budget ran out before either could be proven.
    Uncertain,
}

/// A four-threat candidate: playing `loc1` creates a four in direction
/// `dir`, forcing the defender to answer at `loc2`. `loc2 == NULL_LOC`
/// marks a move that completes five outright. Entries are appended as
/// stones arrive and re-validated lazily when enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Threat {
    loc1: usize,
    loc2: usize,
    dir: usize,
}

/// Budget debits per forced reply, scaled by how much collateral pressure
/// the attacking four generates.
#[derive(Clone, Copy, Debug)]
enum PlayClass {
    FourWithThree,
    FourWithTwo,
    FourPlain,
}

impl PlayClass {
    fn debit(self) -> i32 {
        match self {
            PlayClass::FourWithThree => 1,
            PlayClass::FourWithTwo => 5,
            PlayClass::FourPlain => 20,
        }
    }
}

enum PlayTwo {
    /// The attacking move wins on the spot; nothing was left on the board.
    Win,
    /// The candidate is illegal, stale, or refuted; nothing was left.
    Dead,
    /// Both the four and the forced defense are on the board.
    Forced {
        loc2: usize,
        next_force: usize,
        class: PlayClass,
    },
}

fn bound_for_layer(layer: u32) -> i32 {
    if layer <= 2 {
        layer as i32
    } else {
        2 + 6 * (layer as i32 - 2)
    }
}

fn layer_factor(layer: u32) -> f64 {
    if layer <= 2 {
        1.0
    } else {
        0.6f64.powi(layer as i32 - 2)
    }
}

pub struct VcfSolver {
    attacker: Color,
    rule: Rule,
    cells: [LineCell; PADDED_AREA],
    shape: [[ShapeCell; PADDED_AREA]; 4],
    pts: Vec<Threat>,
    /// Watermarks into `pts`, one per stone currently played through
    /// `play_inner`; undo truncates back to the matching mark.
    pt_marks: Vec<usize>,
    board_hash: Hash128,
    table: VcfTable,
    pv: Vec<Loc>,
    node_num: u64,
    layer_cap: u64,
    global_cap: u64,
    aborted: bool,
}

impl VcfSolver {
    pub fn new(rule: Rule, attacker: Color) -> VcfSolver {
        let mut solver = VcfSolver {
            attacker,
            rule,
            cells: [LineCell::Border; PADDED_AREA],
            shape: [[ShapeCell::default(); PADDED_AREA]; 4],
            pts: Vec::new(),
            pt_marks: Vec::new(),
            board_hash: Hash128::ZERO,
            table: VcfTable::new(16),
            pv: Vec::new(),
            node_num: 0,
            layer_cap: 0,
            global_cap: 0,
            aborted: false,
        };
        solver.reset();
        solver
    }

    pub fn attacker(&self) -> Color {
        self.attacker
    }

    fn reset(&mut self) {
        self.cells = [LineCell::Border; PADDED_AREA];
        for loc in 0..BOARD_AREA {
            self.cells[to_padded(loc)] = LineCell::Empty;
        }
        for loc in 0..BOARD_AREA {
            let p = to_padded(loc);
            for (di, &d) in DIR_DELTAS.iter().enumerate() {
                self.shape[di][p] = compute_shape(&self.cells, p, d);
            }
        }
        self.pts.clear();
        self.pt_marks.clear();
        self.board_hash = Hash128::ZERO;
    }

    /// Resets and seeds from a compact board in absolute colors.
    pub fn set_board(&mut self, board: &[Color; BOARD_AREA]) {
        self.reset();
        for (loc, &color) in board.iter().enumerate() {
            if color != Color::Empty {
                self.cells[to_padded(loc)] = self.relative(color);
                self.board_hash ^= ZOBRIST_KEYS.stone(color, loc);
            }
        }
        for loc in 0..BOARD_AREA {
            let p = to_padded(loc);
            for (di, &d) in DIR_DELTAS.iter().enumerate() {
                self.shape[di][p] = compute_shape(&self.cells, p, d);
            }
        }
        self.rescan_threats();
    }

    /// Incremental update driven from the search driver.
    pub fn play_outside(&mut self, loc: Loc, color: Color) {
        self.play_inner(to_padded(loc), self.relative(color));
    }

    /// Inverse of `play_outside`.
    pub fn undo_outside(&mut self, loc: Loc) {
        self.undo_inner(to_padded(loc));
    }

    /// Runs an iteratively deepened VCF search. `factor` caps the total
    /// node count (and, scaled down geometrically, each layer's share);
    /// `max_layer` bounds the deepening. On `Win` the returned location is
    /// the root attacking move and `pv()` holds the attacker's line.
    pub fn full_search(&mut self, factor: f64, max_layer: u32) -> (SearchResult, Loc) {
        self.pv.clear();
        self.node_num = 0;
        self.aborted = false;
        self.global_cap = factor.max(1.0) as u64;

        let mut result = SearchResult::Lose;
        for layer in 1..=max_layer {
            self.layer_cap = self.node_num + (factor * layer_factor(layer)).max(1.0) as u64;
            match self.search(bound_for_layer(layer), NULL_LOC) {
                SearchResult::Win => return (SearchResult::Win, self.pv[0]),
                partial => {
                    result = partial;
                    if self.aborted {
                        return (SearchResult::Uncertain, NULL_LOC);
                    }
                }
            }
        }
        (result, NULL_LOC)
    }

    /// Attacker moves of the proven winning line, root first.
    pub fn pv(&self) -> &[Loc] {
        &self.pv
    }

    fn relative(&self, color: Color) -> LineCell {
        if color == self.attacker {
            LineCell::Mine
        } else {
            LineCell::Opp
        }
    }

    fn cache_key(&self) -> Hash128 {
        self.board_hash ^ ZOBRIST_KEYS.rule(self.rule) ^ ZOBRIST_KEYS.attacker(self.attacker)
    }

    fn shapes_at(&self, p: usize) -> [ShapeCell; 4] {
        [
            self.shape[0][p],
            self.shape[1][p],
            self.shape[2][p],
            self.shape[3][p],
        ]
    }

    fn play_inner(&mut self, p: usize, cell: LineCell) {
        debug_assert_eq!(self.cells[p], LineCell::Empty);
        self.pt_marks.push(self.pts.len());
        self.cells[p] = cell;
        let color = if cell == LineCell::Mine {
            self.attacker
        } else {
            self.attacker.opponent()
        };
        self.board_hash ^= ZOBRIST_KEYS.stone(color, from_padded(p));
        self.refresh_region(p, true);
    }

    fn undo_inner(&mut self, p: usize) {
        let cell = self.cells[p];
        debug_assert!(cell == LineCell::Mine || cell == LineCell::Opp);
        let color = if cell == LineCell::Mine {
            self.attacker
        } else {
            self.attacker.opponent()
        };
        self.board_hash ^= ZOBRIST_KEYS.stone(color, from_padded(p));
        self.cells[p] = LineCell::Empty;
        self.refresh_region(p, false);
        match self.pt_marks.pop() {
            Some(mark) => self.pts.truncate(mark),
            // An undo with no matching play since the last seed; rebuild.
            None => self.rescan_threats(),
        }
    }

    /// Recomputes shape values within four steps of `p` along every
    /// direction, optionally scanning the same cells for new threats.
    fn refresh_region(&mut self, p: usize, detect: bool) {
        for (di, &d) in DIR_DELTAS.iter().enumerate() {
            self.shape[di][p] = compute_shape(&self.cells, p, d);
            if detect {
                self.detect_threats(p, di);
            }
            for step in [d, -d] {
                let mut c = p as isize;
                for _ in 0..4 {
                    c += step;
                    let cu = c as usize;
                    if self.cells[cu] == LineCell::Border {
                        break;
                    }
                    self.shape[di][cu] = compute_shape(&self.cells, cu, d);
                    if detect {
                        self.detect_threats(cu, di);
                    }
                }
            }
        }
    }

    fn rescan_threats(&mut self) {
        self.pts.clear();
        self.pt_marks.clear();
        for loc in 0..BOARD_AREA {
            let p = to_padded(loc);
            if self.cells[p] == LineCell::Empty {
                for di in 0..4 {
                    self.detect_threats(p, di);
                }
            }
        }
    }

    /// Appends the four-threats (and outright five-makers) the attacker
    /// gains by playing the empty cell `c`, as seen along direction `di`.
    fn detect_threats(&mut self, c: usize, di: usize) {
        if self.cells[c] != LineCell::Empty {
            return;
        }
        let f = self.shape[di][c].fields(Persp::Mine);
        let run = 1 + f.cont[0] + f.cont[1];
        if self.rule.wins(run, self.attacker) {
            self.push_threat(Threat {
                loc1: c,
                loc2: NULL_LOC,
                dir: di,
            });
        }
        let d = DIR_DELTAS[di];
        for side in 0..2 {
            if f.open[side] && self.rule.wins(run + 1 + f.jump[side], self.attacker) {
                let step = if side == 0 { d } else { -d };
                let end = (c as isize + (f.cont[side] as isize + 1) * step) as usize;
                self.push_threat(Threat {
                    loc1: c,
                    loc2: end,
                    dir: di,
                });
            }
        }
    }

    fn push_threat(&mut self, t: Threat) {
        if !self.pts.contains(&t) {
            self.pts.push(t);
        }
    }

    fn search(&mut self, bound: i32, force: usize) -> SearchResult {
        self.node_num += 1;
        if self.node_num > self.layer_cap || self.node_num > self.global_cap {
            self.aborted = true;
            return SearchResult::Uncertain;
        }

        let key = self.cache_key();
        if force == NULL_LOC {
            if let Some(proven) = self.table.probe_lose(key) {
                if proven >= bound {
                    return SearchResult::Lose;
                }
            }
        }

        let cands: SmallVec<[usize; 16]> = if force != NULL_LOC {
            smallvec![force]
        } else {
            let mut cands: SmallVec<[usize; 16]> = SmallVec::new();
            for i in 0..self.pts.len() {
                let t = self.pts[i];
                if self.cells[t.loc1] != LineCell::Empty {
                    continue;
                }
                if t.loc2 != NULL_LOC && self.cells[t.loc2] != LineCell::Empty {
                    continue;
                }
                if !cands.contains(&t.loc1) {
                    cands.push(t.loc1);
                }
            }
            cands
        };

        let mut uncertain = false;
        for loc1 in cands {
            match self.play_two(loc1) {
                PlayTwo::Win => {
                    self.pv.clear();
                    self.pv.push(from_padded(loc1));
                    return SearchResult::Win;
                }
                PlayTwo::Dead => {}
                PlayTwo::Forced {
                    loc2,
                    next_force,
                    class,
                } => {
                    let debit = class.debit();
                    if bound < debit {
                        self.undo_two(loc1, loc2);
                        uncertain = true;
                        continue;
                    }
                    let sub = self.search(bound - debit, next_force);
                    self.undo_two(loc1, loc2);
                    match sub {
                        SearchResult::Win => {
                            self.pv.insert(0, from_padded(loc1));
                            return SearchResult::Win;
                        }
                        SearchResult::Uncertain => uncertain = true,
                        SearchResult::Lose => {}
                    }
                }
            }
        }

        if uncertain {
            SearchResult::Uncertain
        } else {
            if force == NULL_LOC {
                self.table.store_lose(key, bound);
            }
            SearchResult::Lose
        }
    }

    /// Executes an attacking four at `loc1` together with the forced
    /// defense. On `Forced` both stones are on the board; on `Win` and
    /// `Dead` the position is unchanged.
    fn play_two(&mut self, loc1: usize) -> PlayTwo {
        if self.cells[loc1] != LineCell::Empty {
            return PlayTwo::Dead;
        }
        let pl = analyze_placement(
            &self.shapes_at(loc1),
            loc1,
            Persp::Mine,
            self.rule,
            self.attacker,
        );
        if pl.five {
            return PlayTwo::Win;
        }
        if pl.forbidden {
            return PlayTwo::Dead;
        }
        match pl.completions.len() {
            0 => return PlayTwo::Dead,
            1 => {}
            // A straight four or double four cannot be parried.
            _ => return PlayTwo::Win,
        }
        let loc2 = pl.completions[0];
        let class = if pl.makes_three {
            PlayClass::FourWithThree
        } else if pl.makes_two {
            PlayClass::FourWithTwo
        } else {
            PlayClass::FourPlain
        };

        self.play_inner(loc1, LineCell::Mine);

        let defender = self.attacker.opponent();
        let dp = analyze_placement(
            &self.shapes_at(loc2),
            loc2,
            Persp::Opp,
            self.rule,
            defender,
        );
        if dp.five {
            // Blocking completes the defender's own five first.
            self.undo_inner(loc1);
            return PlayTwo::Dead;
        }
        if dp.forbidden {
            // The only blocking square is forbidden to the defender.
            self.undo_inner(loc1);
            return PlayTwo::Win;
        }
        let next_force = match dp.completions.len() {
            0 => NULL_LOC,
            1 => dp.completions[0],
            _ => {
                // The block makes a straight four against us.
                self.undo_inner(loc1);
                return PlayTwo::Dead;
            }
        };
        self.play_inner(loc2, LineCell::Opp);
        PlayTwo::Forced {
            loc2,
            next_force,
            class,
        }
    }

    fn undo_two(&mut self, loc1: usize, loc2: usize) {
        self.undo_inner(loc2);
        self.undo_inner(loc1);
    }

    #[cfg(test)]
    fn snapshot(&self) -> (Vec<LineCell>, Vec<u32>, Vec<Threat>, Hash128) {
        let mut shapes = Vec::new();
        for di in 0..4 {
            shapes.extend(self.shape[di].iter().map(|s| s.0));
        }
        (
            self.cells.to_vec(),
            shapes,
            self.pts.clone(),
            self.board_hash,
        )
    }
}
