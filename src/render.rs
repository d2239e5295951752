//! Plain-text board rendering.

use std::fmt::Write as _;

use crate::board::{AttackBoard, Board, Cell, ViewCell};
use crate::config::BOARD_SIZE;
use crate::coord::Coord;

fn header() -> String {
    let mut s = String::from("   ");
    for col in 1..=BOARD_SIZE {
        let _ = write!(s, "{:>3}", col);
    }
    s
}

fn grid(mut symbol: impl FnMut(Coord) -> char) -> String {
    let mut out = header();
    for row in 0..BOARD_SIZE {
        let _ = write!(out, "\n {} ", (b'A' + row) as char);
        for col in 0..BOARD_SIZE {
            let _ = write!(out, "{:>3}", symbol(Coord { row, col }));
        }
    }
    out
}

/// Own fleet: `#` ship, `X` hit, `o` miss, `*` sunk, `.` water.
pub fn own_board(board: &Board) -> String {
    grid(|c| match board.cell(c) {
        Cell::Water => '.',
        Cell::Ship(_) => '#',
        Cell::Hit => 'X',
        Cell::Miss => 'o',
        Cell::Sunk(_) => '*',
    })
}

/// Attack history against the opponent: `X` hit, `o` miss, `*` sunk,
/// `.` unknown.
pub fn attack_map(view: &AttackBoard) -> String {
    let mut out = grid(|c| match view.cell(c) {
        ViewCell::Unknown => '.',
        ViewCell::Miss => 'o',
        ViewCell::Hit => 'X',
        ViewCell::Sunk(_) => '*',
    });
    if !view.sunk().is_empty() {
        let names: Vec<&str> = view.sunk().iter().map(|k| k.name()).collect();
        let _ = write!(out, "\nSunk: {}", names.join(", "));
    }
    out
}
