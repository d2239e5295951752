use rand::Rng;

use crate::{
    board::{AttackBoard, Board, ShipId},
    common::{AttackError, AttackResult, PlacementError},
    coord::Coord,
    ship::{Orientation, ShipKind},
};

/// Lifecycle of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Placement,
    Battle,
    Finished,
}

/// Whose attack resolves next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Local,
    Opponent,
}

impl Turn {
    pub fn other(self) -> Turn {
        match self {
            Turn::Local => Turn::Opponent,
            Turn::Opponent => Turn::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    VsHuman,
    VsAi,
}

/// How a finished game ended, from the local player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
    /// Ended before either fleet was destroyed (quit or disconnect).
    Aborted,
}

/// Per-player game state. Only the coordinator mutates it.
#[derive(Debug, Clone)]
pub struct GameState {
    phase: Phase,
    turn: Turn,
    first_turn: Turn,
    mode: Mode,
    own: Board,
    opponent_view: AttackBoard,
    outcome: Option<Outcome>,
    pending: Option<Coord>,
    peer_ready: bool,
}

impl GameState {
    /// Start a game in the placement phase. `first_turn` decides who attacks
    /// first once the battle begins.
    pub fn new(mode: Mode, first_turn: Turn) -> Self {
        Self {
            phase: Phase::Placement,
            turn: first_turn,
            first_turn,
            mode,
            own: Board::new(),
            opponent_view: AttackBoard::new(),
            outcome: None,
            pending: None,
            peer_ready: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// The local player's fleet board.
    pub fn own_board(&self) -> &Board {
        &self.own
    }

    /// What the local player has learned about the opponent's board.
    pub fn opponent_view(&self) -> &AttackBoard {
        &self.opponent_view
    }

    /// Attack sent but not yet answered.
    pub fn pending_attack(&self) -> Option<Coord> {
        self.pending
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Place a specific ship during the placement phase.
    pub fn place_ship(
        &mut self,
        kind: ShipKind,
        origin: Coord,
        orientation: Orientation,
    ) -> Result<ShipId, PlacementError> {
        if self.phase != Phase::Placement {
            return Err(PlacementError::WrongPhase);
        }
        self.own.place_ship(kind, origin, orientation)
    }

    /// Place the next ship of the fleet, returning which one was placed.
    pub fn place_next(
        &mut self,
        origin: Coord,
        orientation: Orientation,
    ) -> Result<ShipKind, PlacementError> {
        if self.phase != Phase::Placement {
            return Err(PlacementError::WrongPhase);
        }
        let kind = self.own.next_unplaced().ok_or(PlacementError::FleetComplete)?;
        self.own.place_ship(kind, origin, orientation)?;
        Ok(kind)
    }

    pub fn place_remaining_randomly<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), PlacementError> {
        if self.phase != Phase::Placement {
            return Err(PlacementError::WrongPhase);
        }
        self.own.place_remaining_randomly(rng)
    }

    /// The opponent reported their fleet as placed.
    pub fn set_peer_ready(&mut self) {
        self.peer_ready = true;
    }

    pub fn peer_ready(&self) -> bool {
        self.peer_ready
    }

    /// Both fleets placed: the battle can begin.
    pub fn ready_for_battle(&self) -> bool {
        self.phase == Phase::Placement && self.own.fleet_complete() && self.peer_ready
    }

    pub fn begin_battle(&mut self) {
        self.phase = Phase::Battle;
        self.turn = self.first_turn;
    }

    /// Validate a local attack without changing anything.
    pub fn check_attack(&self, coord: Coord) -> Result<(), AttackError> {
        if self.phase != Phase::Battle {
            return Err(AttackError::NoBattle);
        }
        if let Some(pending) = self.pending {
            return Err(AttackError::ResultPending(pending));
        }
        if self.turn != Turn::Local {
            return Err(AttackError::NotYourTurn);
        }
        if self.opponent_view.has_fired(coord) {
            return Err(AttackError::AlreadyFired(coord));
        }
        Ok(())
    }

    /// Record that an attack is in flight. Further local attacks are refused
    /// until [`GameState::apply_result`] is called for it.
    pub fn mark_pending(&mut self, coord: Coord) -> Result<(), AttackError> {
        self.check_attack(coord)?;
        self.pending = Some(coord);
        Ok(())
    }

    /// Apply the defender's authoritative answer to our attack. The turn
    /// passes to the opponent for any resolved result. A result for a shot
    /// we never marked pending is refused and changes nothing.
    pub fn apply_result(&mut self, coord: Coord, result: AttackResult) -> Result<(), AttackError> {
        if self.phase != Phase::Battle {
            return Err(AttackError::NoBattle);
        }
        match self.pending {
            None => return Err(AttackError::NoPendingAttack),
            Some(pending) if pending != coord => {
                return Err(AttackError::ResultPending(pending));
            }
            Some(_) => {}
        }
        self.pending = None;
        self.opponent_view.record(coord, result)?;
        if result.is_resolved() {
            self.turn = Turn::Opponent;
        }
        Ok(())
    }

    /// Resolve an opponent attack against our fleet. The turn passes to us
    /// for any resolved result; losing the last ship finishes the game.
    pub fn receive_attack(&mut self, coord: Coord) -> Result<AttackResult, AttackError> {
        if self.phase != Phase::Battle {
            return Err(AttackError::NoBattle);
        }
        if self.turn != Turn::Opponent {
            return Err(AttackError::NotYourTurn);
        }
        let result = self.own.resolve_attack(coord);
        if result.is_resolved() {
            self.turn = Turn::Local;
            if self.own.is_fleet_destroyed() {
                self.finish(Outcome::Defeat);
            }
        }
        Ok(result)
    }

    /// Force the game into its terminal state. No-op once finished.
    pub fn finish(&mut self, outcome: Outcome) {
        if self.phase == Phase::Finished {
            return;
        }
        self.phase = Phase::Finished;
        self.outcome = Some(outcome);
        self.pending = None;
    }
}
