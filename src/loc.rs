//! Board geometry: cell indexing and line directions.
//!
//! Two index spaces are used. The compact index runs over the real
//! `MAX_BS x MAX_BS` grid in row-major order and is what the search driver
//! and the public API speak. The padded index lives on a
//! `(MAX_BS + 6) x (MAX_BS + 6)` grid with a three-cell sentinel border on
//! every side; the shape index and the VCF solver use it so that line scans
//! terminate on border cells instead of needing bounds checks.

/// Board side length. The engine only supports this size.
pub const MAX_BS: usize = 15;

/// Number of real cells.
pub const BOARD_AREA: usize = MAX_BS * MAX_BS;

/// Sentinel border width on each side of the padded grid.
pub const PAD: usize = 3;

/// Padded grid side length.
pub const PADDED_BS: usize = MAX_BS + 2 * PAD;

/// Number of padded cells.
pub const PADDED_AREA: usize = PADDED_BS * PADDED_BS;

/// Compact cell index, `0..BOARD_AREA`.
pub type Loc = usize;

/// Distinguished "no move" value, usable in both index spaces.
pub const NULL_LOC: Loc = usize::MAX;

/// Step deltas of the four line directions on the padded grid:
/// horizontal, vertical, diagonal, anti-diagonal.
pub const DIR_DELTAS: [isize; 4] = [
    1,
    PADDED_BS as isize,
    PADDED_BS as isize + 1,
    PADDED_BS as isize - 1,
];

pub fn make_loc(x: usize, y: usize) -> Loc {
    debug_assert!(x < MAX_BS && y < MAX_BS);
    y * MAX_BS + x
}

pub fn loc_x(loc: Loc) -> usize {
    loc % MAX_BS
}

pub fn loc_y(loc: Loc) -> usize {
    loc / MAX_BS
}

/// Compact index to padded index.
pub fn to_padded(loc: Loc) -> usize {
    (loc_y(loc) + PAD) * PADDED_BS + loc_x(loc) + PAD
}

/// Padded index back to compact. Must only be called on real cells.
pub fn from_padded(p: usize) -> Loc {
    let x = p % PADDED_BS;
    let y = p / PADDED_BS;
    debug_assert!((PAD..PAD + MAX_BS).contains(&x) && (PAD..PAD + MAX_BS).contains(&y));
    make_loc(x - PAD, y - PAD)
}

/// Whether a padded index names a real board cell.
pub fn is_real(p: usize) -> bool {
    let x = p % PADDED_BS;
    let y = p / PADDED_BS;
    (PAD..PAD + MAX_BS).contains(&x) && (PAD..PAD + MAX_BS).contains(&y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for loc in 0..BOARD_AREA {
            assert_eq!(from_padded(to_padded(loc)), loc);
            assert!(is_real(to_padded(loc)));
        }
    }

    #[test]
    fn test_corners() {
        assert_eq!(to_padded(make_loc(0, 0)), PAD * PADDED_BS + PAD);
        assert!(!is_real(0));
        assert!(!is_real(PADDED_AREA - 1));
    }

    #[test]
    fn test_direction_steps_stay_adjacent() {
        let center = to_padded(make_loc(7, 7));
        for d in DIR_DELTAS {
            let fwd = (center as isize + d) as usize;
            let back = (center as isize - d) as usize;
            assert!(is_real(fwd));
            assert!(is_real(back));
            let (cx, cy) = (loc_x(from_padded(center)), loc_y(from_padded(center)));
            let (fx, fy) = (loc_x(from_padded(fwd)), loc_y(from_padded(fwd)));
            assert!(cx.abs_diff(fx) <= 1 && cy.abs_diff(fy) <= 1);
        }
    }
}
