//! Ship kinds and placed ships.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::bitboard::Grid;
use crate::common::PlacementError;
use crate::coord::Coord;

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Extends towards higher column numbers (`A1`, `A2`, ...).
    Horizontal,
    /// Extends towards later row letters (`A1`, `B1`, ...).
    Vertical,
}

impl Orientation {
    /// Accepts `H`/`V` and the full words, case-insensitive.
    pub fn parse(s: &str) -> Option<Orientation> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" | "HORIZONTAL" => Some(Orientation::Horizontal),
            "V" | "VERTICAL" => Some(Orientation::Vertical),
            _ => None,
        }
    }
}

/// The five ship classes of the standard fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipKind {
    Carrier,
    Battleship,
    Cruiser,
    Submarine,
    Destroyer,
}

impl ShipKind {
    pub const fn length(self) -> usize {
        match self {
            ShipKind::Carrier => 5,
            ShipKind::Battleship => 4,
            ShipKind::Cruiser => 3,
            ShipKind::Submarine => 3,
            ShipKind::Destroyer => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ShipKind::Carrier => "Carrier",
            ShipKind::Battleship => "Battleship",
            ShipKind::Cruiser => "Cruiser",
            ShipKind::Submarine => "Submarine",
            ShipKind::Destroyer => "Destroyer",
        }
    }
}

impl fmt::Display for ShipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compute the full cell run for a ship, failing if any cell leaves the grid.
pub fn ship_cells(
    kind: ShipKind,
    origin: Coord,
    orientation: Orientation,
) -> Result<Vec<Coord>, PlacementError> {
    (0..kind.length())
        .map(|i| {
            let i = i as u8;
            let (row, col) = match orientation {
                Orientation::Horizontal => (origin.row, origin.col.saturating_add(i)),
                Orientation::Vertical => (origin.row.saturating_add(i), origin.col),
            };
            Coord::new(row, col).ok_or(PlacementError::OutOfBounds {
                kind,
                origin,
                orientation,
            })
        })
        .collect()
}

/// A ship placed on a board. Cells never change after placement; only hits
/// accumulate.
#[derive(Clone, PartialEq, Eq)]
pub struct Ship {
    kind: ShipKind,
    cells: Vec<Coord>,
    mask: Grid,
    hits: Grid,
}

impl Ship {
    /// Place a ship at `origin` with `orientation`.
    pub fn new(kind: ShipKind, origin: Coord, orientation: Orientation) -> Result<Self, PlacementError> {
        let cells = ship_cells(kind, origin, orientation)?;
        let mask = cells.iter().copied().collect();
        Ok(Ship {
            kind,
            cells,
            mask,
            hits: Grid::new(),
        })
    }

    /// Register a hit. Returns `true` if `coord` belongs to this ship.
    pub fn hit(&mut self, coord: Coord) -> bool {
        if self.mask.contains(coord) {
            self.hits.insert(coord);
            true
        } else {
            false
        }
    }

    /// Sunk iff every cell has been hit.
    pub fn is_sunk(&self) -> bool {
        self.hits == self.mask
    }

    pub fn kind(&self) -> ShipKind {
        self.kind
    }

    /// Cells in order from the origin.
    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    /// Occupancy mask of the ship on the board.
    pub fn mask(&self) -> Grid {
        self.mask
    }

    pub fn hits(&self) -> Grid {
        self.hits
    }
}

impl fmt::Debug for Ship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ship {{ kind: {}, cells: {:?}, hits: {} }}",
            self.kind,
            self.cells,
            self.hits.count(),
        )
    }
}
