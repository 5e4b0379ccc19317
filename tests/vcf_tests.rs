//! End-to-end tests of the VCF solver through its public interface:
//! incremental outside updates, search repeatability, the two attacking
//! perspectives, principal variations, and the deepening limit.

use goshawk::color::{Color, Rule};
use goshawk::loc::{make_loc, BOARD_AREA, NULL_LOC};
use goshawk::vcf::{SearchResult, VcfSolver};

fn board_with(stones: &[(usize, usize, Color)]) -> [Color; BOARD_AREA] {
    let mut board = [Color::Empty; BOARD_AREA];
    for &(x, y, c) in stones {
        board[make_loc(x, y)] = c;
    }
    board
}

#[test]
fn test_outside_play_drives_the_solver() {
    let mut solver = VcfSolver::new(Rule::Freestyle, Color::Black);
    solver.set_board(&board_with(&[]));
    // Build the position stone by stone, the way the search driver does.
    solver.play_outside(make_loc(6, 7), Color::White);
    for x in 7..11 {
        solver.play_outside(make_loc(x, 7), Color::Black);
    }
    solver.play_outside(make_loc(0, 0), Color::White);
    let (result, best) = solver.full_search(10_000.0, 10);
    assert_eq!(result, SearchResult::Win);
    assert_eq!(best, make_loc(11, 7));

    // Taking the fourth stone back leaves a three blocked on one end:
    // a single four that runs out of steam, not a win.
    solver.undo_outside(make_loc(10, 7));
    let (result, best) = solver.full_search(10_000.0, 10);
    assert_eq!(result, SearchResult::Lose);
    assert_eq!(best, NULL_LOC);
}

#[test]
fn test_search_is_repeatable() {
    // A search must leave the position untouched, so running it again
    // gives the same answer.
    let mut solver = VcfSolver::new(Rule::Freestyle, Color::Black);
    solver.set_board(&board_with(&[
        (4, 7, Color::White),
        (5, 7, Color::Black),
        (6, 7, Color::Black),
        (7, 7, Color::Black),
        (8, 5, Color::Black),
        (8, 6, Color::Black),
        (0, 0, Color::White),
        (1, 1, Color::White),
        (2, 0, Color::White),
    ]));
    let (first, first_best) = solver.full_search(10_000.0, 10);
    let (second, second_best) = solver.full_search(10_000.0, 10);
    assert_eq!(first, SearchResult::Win);
    assert_eq!(first, second);
    assert_eq!(first_best, second_best);
}

#[test]
fn test_attacking_perspectives_are_independent() {
    // Black has an open three; White has nothing. The two solvers look at
    // the same stones and reach opposite verdicts.
    let stones = [
        (6, 7, Color::Black),
        (7, 7, Color::Black),
        (8, 7, Color::Black),
        (1, 1, Color::White),
        (2, 1, Color::White),
    ];
    let mut black = VcfSolver::new(Rule::Freestyle, Color::Black);
    black.set_board(&board_with(&stones));
    let (black_result, black_best) = black.full_search(10_000.0, 10);
    assert_eq!(black_result, SearchResult::Win);
    assert!(black_best != NULL_LOC);

    let mut white = VcfSolver::new(Rule::Freestyle, Color::White);
    white.set_board(&board_with(&stones));
    let (white_result, _) = white.full_search(10_000.0, 10);
    assert_eq!(white_result, SearchResult::Lose);
}

#[test]
fn test_pv_of_a_two_move_chain() {
    // 1. (8,7) is a horizontal four that also grows column 8 into an open
    // three; after the forced block the column finishes as a straight four.
    let mut solver = VcfSolver::new(Rule::Freestyle, Color::Black);
    let board = board_with(&[
        (4, 7, Color::White),
        (5, 7, Color::Black),
        (6, 7, Color::Black),
        (7, 7, Color::Black),
        (8, 5, Color::Black),
        (8, 6, Color::Black),
        (0, 0, Color::White),
        (1, 1, Color::White),
        (2, 0, Color::White),
    ]);
    solver.set_board(&board);
    let (result, best) = solver.full_search(10_000.0, 10);
    assert_eq!(result, SearchResult::Win);
    let pv = solver.pv();
    assert_eq!(pv.len(), 2);
    assert_eq!(pv[0], best);
    assert_eq!(best, make_loc(8, 7));
    // Every PV move lands on a distinct cell that was empty beforehand.
    assert!(pv[0] != pv[1]);
    for &mv in pv {
        assert_eq!(board[mv], Color::Empty);
    }
}

#[test]
fn test_max_layer_bounds_the_deepening() {
    // The only fours here create neither a three nor a two, so each forced
    // reply costs the full no-two debit. One deepening layer cannot afford
    // any of them and has to answer Uncertain; the full ladder of layers
    // proves the refutation.
    let mut solver = VcfSolver::new(Rule::Freestyle, Color::Black);
    solver.set_board(&board_with(&[
        (4, 7, Color::White),
        (5, 7, Color::Black),
        (6, 7, Color::Black),
        (7, 7, Color::Black),
        (3, 3, Color::White),
    ]));
    let (shallow, _) = solver.full_search(10_000.0, 1);
    assert_eq!(shallow, SearchResult::Uncertain);
    let (deep, _) = solver.full_search(10_000.0, 10);
    assert_eq!(deep, SearchResult::Lose);
}
