// Search/hunt/target guessing logic for the opponent board.
// Sees only its own fired history and the results reported back.

use std::collections::VecDeque;

use rand::Rng;

use crate::{
    bitboard::Grid,
    board::Board,
    common::{AttackResult, PlacementError},
    coord::{Coord, Direction},
};

/// Where the AI is in its targeting cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetState {
    /// No live lead: fire at random unfired cells.
    Search,
    /// A hit at `origin` with unknown orientation: try its neighbours.
    Hunt {
        origin: Coord,
        queue: VecDeque<Coord>,
    },
    /// Two aligned hits: walk along `direction` from `last`.
    Target {
        origin: Coord,
        direction: Direction,
        last: Coord,
        reversed: bool,
    },
}

/// The AI player's targeting policy. Ship placement is handled by
/// [`AiOpponent::place_fleet`] and kept on a separate [`Board`].
#[derive(Debug, Clone)]
pub struct AiOpponent {
    state: TargetState,
    fired: Grid,
}

impl Default for AiOpponent {
    fn default() -> Self {
        Self::new()
    }
}

impl AiOpponent {
    pub fn new() -> Self {
        Self {
            state: TargetState::Search,
            fired: Grid::new(),
        }
    }

    pub fn state(&self) -> &TargetState {
        &self.state
    }

    /// Every coordinate the AI has fired at so far.
    pub fn fired(&self) -> Grid {
        self.fired
    }

    /// A fleet board with all five ships placed uniformly at random.
    pub fn place_fleet<R: Rng + ?Sized>(rng: &mut R) -> Result<Board, PlacementError> {
        let mut board = Board::new();
        board.place_remaining_randomly(rng)?;
        Ok(board)
    }

    /// Pick the next coordinate to fire at. Never returns a coordinate that
    /// was already fired; `None` once the whole board has been fired at.
    pub fn choose<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Coord> {
        loop {
            match &mut self.state {
                TargetState::Search => return self.random_unfired(rng),
                TargetState::Hunt { queue, .. } => {
                    let fired = self.fired;
                    while let Some(c) = queue.pop_front() {
                        if !fired.contains(c) {
                            return Some(c);
                        }
                    }
                    self.state = TargetState::Search;
                }
                TargetState::Target {
                    direction, last, ..
                } => match last.step(*direction) {
                    Some(next) if !self.fired.contains(next) => return Some(next),
                    // edge of the board or known water behaves like a miss
                    _ => self.turn_around(),
                },
            }
        }
    }

    /// Feed back the defender's result for a coordinate chosen by
    /// [`AiOpponent::choose`].
    pub fn observe(&mut self, coord: Coord, result: AttackResult) {
        if result == AttackResult::AlreadyFired {
            return;
        }
        self.fired.insert(coord);
        match result {
            AttackResult::Sunk(_) => self.state = TargetState::Search,
            AttackResult::Hit => self.on_hit(coord),
            AttackResult::Miss => {
                if matches!(self.state, TargetState::Target { .. }) {
                    self.turn_around();
                }
            }
            AttackResult::AlreadyFired => {}
        }
    }

    fn on_hit(&mut self, coord: Coord) {
        match &mut self.state {
            TargetState::Search => {
                self.state = TargetState::Hunt {
                    origin: coord,
                    queue: self.unfired_neighbors(coord),
                };
            }
            TargetState::Hunt { origin, .. } => {
                let origin = *origin;
                self.state = match origin.neighbors().find(|(_, c)| *c == coord) {
                    Some((direction, _)) => TargetState::Target {
                        origin,
                        direction,
                        last: coord,
                        reversed: false,
                    },
                    None => TargetState::Hunt {
                        origin: coord,
                        queue: self.unfired_neighbors(coord),
                    },
                };
            }
            TargetState::Target { last, .. } => *last = coord,
        }
    }

    /// Try the opposite direction from the origin once; after that fall back
    /// to probing whatever neighbours of the origin are still unfired.
    fn turn_around(&mut self) {
        if let TargetState::Target {
            origin,
            direction,
            reversed,
            ..
        } = self.state
        {
            self.state = if reversed {
                TargetState::Hunt {
                    origin,
                    queue: self.unfired_neighbors(origin),
                }
            } else {
                TargetState::Target {
                    origin,
                    direction: direction.opposite(),
                    last: origin,
                    reversed: true,
                }
            };
        }
    }

    fn unfired_neighbors(&self, coord: Coord) -> VecDeque<Coord> {
        coord
            .neighbors()
            .map(|(_, c)| c)
            .filter(|c| !self.fired.contains(*c))
            .collect()
    }

    fn random_unfired<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Coord> {
        let open: Vec<Coord> = (!self.fired).iter().collect();
        if open.is_empty() {
            None
        } else {
            Some(open[rng.random_range(0..open.len())])
        }
    }
}
