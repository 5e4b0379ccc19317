//! Per-cell, per-direction packed line-shape index.
//!
//! For every cell and each of the four line directions, a packed integer
//! summarizes the 9-cell window centered on the cell: how many own stones sit
//! contiguously on each side, whether the cell just past each run is open,
//! and how many own stones follow after a single-cell gap. The same fields
//! are kept for the opponent in the upper half of the word, so one lookup
//! answers threat questions for either player.
//!
//! The packed value is a pure function of the window, which makes the
//! incremental update rule simple: when a stone is added or removed, the
//! cells within four steps along each direction are recomputed from their
//! current neighborhoods. Sentinel border cells outside the real board block
//! runs for both players, so scans never need bounds checks.
//!
//! All threat predicates (five / four / three / two, for self or opponent)
//! are masks and arithmetic over this encoding; `analyze_placement` bundles
//! the ones the VCF solver needs.

use crate::color::{Color, Rule};
use crate::loc::DIR_DELTAS;
use smallvec::SmallVec;

/// A padded-grid cell as seen by one solver: relative to its attacker color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineCell {
    Empty,
    Mine,
    Opp,
    Border,
}

/// Which half of a packed shape word to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persp {
    Mine,
    Opp,
}

/// Unpacked per-side fields of one perspective of a shape word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineFields {
    /// Contiguous own stones adjacent on the forward / backward side.
    pub cont: [usize; 2],
    /// Own stones following a single empty gap, per side. Zero when the
    /// corresponding side is not open.
    pub jump: [usize; 2],
    /// Whether the cell just past the contiguous run is empty, per side.
    pub open: [bool; 2],
}

/// Packed shape value for one `(cell, direction)` pair.
///
/// Layout per perspective (opponent shifted up by 16 bits):
/// bits 0-2 forward run, 3-5 backward run, 6-8 forward gap run,
/// 9-11 backward gap run, bit 12 forward open, bit 13 backward open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShapeCell(pub u32);

const OPP_SHIFT: u32 = 16;

impl ShapeCell {
    pub fn fields(self, persp: Persp) -> LineFields {
        let v = match persp {
            Persp::Mine => self.0 & 0xFFFF,
            Persp::Opp => self.0 >> OPP_SHIFT,
        };
        LineFields {
            cont: [(v & 0x7) as usize, ((v >> 3) & 0x7) as usize],
            jump: [((v >> 6) & 0x7) as usize, ((v >> 9) & 0x7) as usize],
            open: [(v >> 12) & 1 != 0, (v >> 13) & 1 != 0],
        }
    }
}

fn pack_side(cells: &[LineCell], p: usize, d: isize, own: LineCell) -> u32 {
    let mut cont = 0u32;
    let mut i = 1isize;
    while i <= 4 && cells[(p as isize + i * d) as usize] == own {
        cont += 1;
        i += 1;
    }
    let open = i <= 4 && cells[(p as isize + i * d) as usize] == LineCell::Empty;
    let mut jump = 0u32;
    if open {
        let mut j = i + 1;
        while j <= 4 && cells[(p as isize + j * d) as usize] == own {
            jump += 1;
            j += 1;
        }
    }
    cont | (jump << 6) | ((open as u32) << 12)
}

/// Recomputes the packed shape of `p` in direction `d` from its window.
///
/// Only meaningful for real cells; the caller never queries border cells.
pub fn compute_shape(cells: &[LineCell], p: usize, d: isize) -> ShapeCell {
    let mine_fwd = pack_side(cells, p, d, LineCell::Mine);
    let mine_back = pack_side(cells, p, -d, LineCell::Mine);
    let opp_fwd = pack_side(cells, p, d, LineCell::Opp);
    let opp_back = pack_side(cells, p, -d, LineCell::Opp);
    // The backward side occupies the +3 bit positions inside each field.
    let mine = mine_fwd | (mine_back & 0x7) << 3 | (mine_back >> 6 & 0x7) << 9
        | (mine_back >> 12 & 1) << 13;
    let opp = opp_fwd | (opp_back & 0x7) << 3 | (opp_back >> 6 & 0x7) << 9
        | (opp_back >> 12 & 1) << 13;
    ShapeCell(mine | opp << OPP_SHIFT)
}

/// What placing a stone on an empty cell would create, per the shape index.
#[derive(Clone, Debug, Default)]
pub struct Placement {
    /// The move completes a winning run under the current rule.
    pub five: bool,
    /// The move makes a contiguous run of six or more in some direction.
    pub overline: bool,
    /// Renju prohibition for Black: overline, double-four or double-three.
    pub forbidden: bool,
    /// Empty cells that would complete five after this move (padded locs).
    /// One entry: a simple four with a unique forced defense. Two or more:
    /// a straight four or double four.
    pub completions: SmallVec<[usize; 4]>,
    /// The move also creates an open three in a non-four direction.
    pub makes_three: bool,
    /// The move also creates an open two in a non-four direction.
    pub makes_two: bool,
}

/// Evaluates a hypothetical placement at empty cell `p` for the player whose
/// stones the `persp` half of the shape words describes. `color` is that
/// player's absolute color, used for rule checks.
pub fn analyze_placement(
    shapes: &[ShapeCell; 4],
    p: usize,
    persp: Persp,
    rule: Rule,
    color: Color,
) -> Placement {
    let mut out = Placement::default();
    let mut four_dirs = 0usize;
    let mut three_dirs = 0usize;

    for (di, &d) in DIR_DELTAS.iter().enumerate() {
        let f = shapes[di].fields(persp);
        let run = 1 + f.cont[0] + f.cont[1];
        if rule.wins(run, color) {
            out.five = true;
        }
        if run >= 6 {
            out.overline = true;
        }

        let mut dir_fours = 0usize;
        for side in 0..2 {
            if f.open[side] && rule.wins(run + 1 + f.jump[side], color) {
                let step = if side == 0 { d } else { -d };
                let end = (p as isize + (f.cont[side] as isize + 1) * step) as usize;
                out.completions.push(end);
                dir_fours += 1;
            }
        }
        if dir_fours > 0 {
            four_dirs += 1;
        } else if run == 3 && f.open[0] && f.open[1]
            || (0..2).any(|s| f.open[s] && f.jump[s] > 0 && run + f.jump[s] == 3)
        {
            three_dirs += 1;
            out.makes_three = true;
        } else if run == 2 && f.open[0] && f.open[1] {
            out.makes_two = true;
        }
    }

    if rule == Rule::Renju && color == Color::Black {
        out.forbidden = out.overline || four_dirs >= 2 || three_dirs >= 2;
    }
    out
}
