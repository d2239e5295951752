//! Board coordinates and the `A1`..`J10` text grammar.
//!
//! Rows are lettered `A`-`J` from the top, columns numbered `1`-`10` from the
//! left. Internally both are zero-based.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::BOARD_SIZE;

/// A cell on the 10x10 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

/// Reasons a coordinate string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    #[error("empty coordinate")]
    Empty,
    #[error("row '{0}' must be a letter A-J")]
    BadRow(char),
    #[error("column '{0}' must be a number 1-10")]
    BadColumn(String),
}

impl Coord {
    /// Build a coordinate, returning `None` when it lies off the board.
    pub fn new(row: u8, col: u8) -> Option<Self> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// Every coordinate on the board in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Coord { row, col }))
    }

    /// Row-major index in `0..100`.
    pub fn index(self) -> usize {
        self.row as usize * BOARD_SIZE as usize + self.col as usize
    }

    /// One step in `dir`, or `None` past the edge.
    pub fn step(self, dir: Direction) -> Option<Coord> {
        let (dr, dc) = dir.delta();
        let row = i16::from(self.row) + dr;
        let col = i16::from(self.col) + dc;
        if (0..BOARD_SIZE as i16).contains(&row) && (0..BOARD_SIZE as i16).contains(&col) {
            Some(Coord {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// In-bounds orthogonal neighbours, in N, S, W, E order.
    pub fn neighbors(self) -> impl Iterator<Item = (Direction, Coord)> {
        Direction::ALL
            .into_iter()
            .filter_map(move |d| self.step(d).map(|c| (d, c)))
    }

    /// Parse strictly according to `[A-J](10|[1-9])`, case-insensitive on the
    /// row letter, surrounding whitespace ignored.
    pub fn parse(input: &str) -> Result<Coord, CoordError> {
        let input = input.trim();
        let mut chars = input.chars();
        let row_ch = chars.next().ok_or(CoordError::Empty)?.to_ascii_uppercase();
        if !('A'..='J').contains(&row_ch) {
            return Err(CoordError::BadRow(row_ch));
        }
        let col_str = chars.as_str();
        let col: u8 = match col_str {
            "10" => 10,
            s if s.len() == 1 && matches!(s.as_bytes()[0], b'1'..=b'9') => s.as_bytes()[0] - b'0',
            s => return Err(CoordError::BadColumn(s.to_string())),
        };
        Ok(Coord {
            row: row_ch as u8 - b'A',
            col: col - 1,
        })
    }
}

impl FromStr for Coord {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coord::parse(s)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.row) as char, self.col + 1)
    }
}

/// Compass direction on the grid. North is towards row `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    fn delta(self) -> (i16, i16) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
            Direction::East => (0, 1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }
}
