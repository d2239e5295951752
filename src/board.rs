//! Game boards: a player's own fleet board and their view of the opponent.

use rand::Rng;

use crate::bitboard::Grid;
use crate::common::{AttackError, AttackResult, PlacementError};
use crate::config::{BOARD_SIZE, FLEET};
use crate::coord::Coord;
use crate::ship::{ship_cells, Orientation, Ship, ShipKind};

/// Index into a board's fleet, in placement order.
pub type ShipId = usize;

const GRID: usize = BOARD_SIZE as usize;

/// Random origins tried before falling back to enumerating legal placements.
const RANDOM_PLACEMENT_ATTEMPTS: usize = 1000;

/// State of one cell on a player's own board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Water,
    Ship(ShipId),
    Hit,
    Miss,
    Sunk(ShipId),
}

/// A player's own board: ship placements, hits, misses.
#[derive(Debug, Clone)]
pub struct Board {
    cells: [[Cell; GRID]; GRID],
    fleet: Vec<Ship>,
    fired: Grid,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board (no ships placed).
    pub fn new() -> Self {
        Board {
            cells: [[Cell::Water; GRID]; GRID],
            fleet: Vec::with_capacity(FLEET.len()),
            fired: Grid::new(),
        }
    }

    pub fn cell(&self, coord: Coord) -> Cell {
        self.cells[coord.row as usize][coord.col as usize]
    }

    fn set_cell(&mut self, coord: Coord, cell: Cell) {
        self.cells[coord.row as usize][coord.col as usize] = cell;
    }

    /// Ships placed so far, in placement order.
    pub fn ships(&self) -> &[Ship] {
        &self.fleet
    }

    pub fn ship(&self, kind: ShipKind) -> Option<&Ship> {
        self.fleet.iter().find(|s| s.kind() == kind)
    }

    /// Cells the opponent has attacked on this board.
    pub fn fired(&self) -> Grid {
        self.fired
    }

    /// Board occupancy mask of all ships.
    pub fn ship_map(&self) -> Grid {
        self.fleet.iter().fold(Grid::new(), |acc, s| acc | s.mask())
    }

    /// Next ship of the standard fleet that still needs a position.
    pub fn next_unplaced(&self) -> Option<ShipKind> {
        FLEET.iter().copied().find(|k| self.ship(*k).is_none())
    }

    /// True once every ship of the standard fleet is on the board.
    pub fn fleet_complete(&self) -> bool {
        self.next_unplaced().is_none()
    }

    /// Number of ships not yet sunk.
    pub fn ships_afloat(&self) -> usize {
        self.fleet.iter().filter(|s| !s.is_sunk()).count()
    }

    /// Place a ship. On error the board is unchanged.
    pub fn place_ship(
        &mut self,
        kind: ShipKind,
        origin: Coord,
        orientation: Orientation,
    ) -> Result<ShipId, PlacementError> {
        if self.ship(kind).is_some() {
            return Err(PlacementError::AlreadyPlaced(kind));
        }
        let ship = Ship::new(kind, origin, orientation)?;
        for &c in ship.cells() {
            if let Cell::Ship(id) = self.cell(c) {
                return Err(PlacementError::Overlap {
                    kind,
                    existing: self.fleet[id].kind(),
                    at: c,
                });
            }
        }
        let id = self.fleet.len();
        for &c in ship.cells() {
            self.set_cell(c, Cell::Ship(id));
        }
        self.fleet.push(ship);
        Ok(id)
    }

    /// Whether `kind` fits at `origin`/`orientation` without touching the board.
    pub fn can_place(&self, kind: ShipKind, origin: Coord, orientation: Orientation) -> bool {
        match ship_cells(kind, origin, orientation) {
            Ok(cells) => cells.iter().all(|c| !matches!(self.cell(*c), Cell::Ship(_))),
            Err(_) => false,
        }
    }

    /// Returns a random legal (origin, orientation) for `kind`.
    ///
    /// Origins are drawn uniformly and retried on overlap or when the ship
    /// would run off the board; after a bounded number of misses the legal
    /// placements are enumerated and one is picked uniformly. `None` only if
    /// no legal placement exists.
    pub fn random_placement<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        kind: ShipKind,
    ) -> Option<(Coord, Orientation)> {
        for _ in 0..RANDOM_PLACEMENT_ATTEMPTS {
            let orientation = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let origin = Coord {
                row: rng.random_range(0..BOARD_SIZE),
                col: rng.random_range(0..BOARD_SIZE),
            };
            if self.can_place(kind, origin, orientation) {
                return Some((origin, orientation));
            }
        }
        let legal: Vec<(Coord, Orientation)> = Coord::all()
            .flat_map(|c| [(c, Orientation::Horizontal), (c, Orientation::Vertical)])
            .filter(|(c, o)| self.can_place(kind, *c, *o))
            .collect();
        if legal.is_empty() {
            None
        } else {
            Some(legal[rng.random_range(0..legal.len())])
        }
    }

    /// Randomly place every ship not yet on the board.
    pub fn place_remaining_randomly<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), PlacementError> {
        while let Some(kind) = self.next_unplaced() {
            let (origin, orientation) = self
                .random_placement(rng, kind)
                .ok_or(PlacementError::NoRoom(kind))?;
            self.place_ship(kind, origin, orientation)?;
        }
        Ok(())
    }

    /// Resolve an incoming attack at `coord`.
    ///
    /// Repeated attacks return [`AttackResult::AlreadyFired`] and mutate
    /// nothing.
    pub fn resolve_attack(&mut self, coord: Coord) -> AttackResult {
        if !self.fired.insert(coord) {
            return AttackResult::AlreadyFired;
        }
        match self.cell(coord) {
            Cell::Ship(id) => {
                let ship = &mut self.fleet[id];
                ship.hit(coord);
                if ship.is_sunk() {
                    let kind = ship.kind();
                    let cells = ship.cells().to_vec();
                    for c in cells {
                        self.set_cell(c, Cell::Sunk(id));
                    }
                    AttackResult::Sunk(kind)
                } else {
                    self.set_cell(coord, Cell::Hit);
                    AttackResult::Hit
                }
            }
            _ => {
                self.set_cell(coord, Cell::Miss);
                AttackResult::Miss
            }
        }
    }

    /// True iff every placed ship's hits cover all of its cells.
    pub fn is_fleet_destroyed(&self) -> bool {
        self.fleet.iter().all(Ship::is_sunk)
    }
}

/// What a player knows about a cell on the opponent's board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCell {
    Unknown,
    Miss,
    Hit,
    Sunk(ShipKind),
}

/// Attack history against the opponent. Ship identity is only known for the
/// cell that sank it.
#[derive(Debug, Clone)]
pub struct AttackBoard {
    cells: [[ViewCell; GRID]; GRID],
    fired: Grid,
    sunk: Vec<ShipKind>,
}

impl Default for AttackBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl AttackBoard {
    pub fn new() -> Self {
        AttackBoard {
            cells: [[ViewCell::Unknown; GRID]; GRID],
            fired: Grid::new(),
            sunk: Vec::new(),
        }
    }

    pub fn cell(&self, coord: Coord) -> ViewCell {
        self.cells[coord.row as usize][coord.col as usize]
    }

    pub fn fired(&self) -> Grid {
        self.fired
    }

    pub fn has_fired(&self, coord: Coord) -> bool {
        self.fired.contains(coord)
    }

    /// Opponent ships sunk so far, in the order they went down.
    pub fn sunk(&self) -> &[ShipKind] {
        &self.sunk
    }

    /// Record a resolved attack. `AlreadyFired` results carry no information
    /// and are ignored.
    pub fn record(&mut self, coord: Coord, result: AttackResult) -> Result<(), AttackError> {
        let cell = match result {
            AttackResult::AlreadyFired => return Ok(()),
            AttackResult::Miss => ViewCell::Miss,
            AttackResult::Hit => ViewCell::Hit,
            AttackResult::Sunk(kind) => ViewCell::Sunk(kind),
        };
        if !self.fired.insert(coord) {
            return Err(AttackError::AlreadyFired(coord));
        }
        if let ViewCell::Sunk(kind) = cell {
            self.sunk.push(kind);
        }
        self.cells[coord.row as usize][coord.col as usize] = cell;
        Ok(())
    }

    /// Every opponent ship has been reported sunk.
    pub fn all_sunk(&self) -> bool {
        self.sunk.len() == FLEET.len()
    }
}
