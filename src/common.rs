//! Common game types: attack results and the game-level error taxonomy.

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::ship::{Orientation, ShipKind};

/// Result of resolving an attack against a defending board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackResult {
    /// The cell was attacked before; nothing changed.
    AlreadyFired,
    /// Attack missed all ships.
    Miss,
    /// Attack hit a ship that is still afloat.
    Hit,
    /// Attack completed a ship, carrying its kind.
    Sunk(ShipKind),
}

impl AttackResult {
    /// Whether this result consumed the attacker's turn.
    pub fn is_resolved(self) -> bool {
        !matches!(self, AttackResult::AlreadyFired)
    }

    pub fn is_hit(self) -> bool {
        matches!(self, AttackResult::Hit | AttackResult::Sunk(_))
    }
}

/// Errors returned by ship placement. The board is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("{kind} at {origin} {orientation:?} does not fit on the 10x10 grid")]
    OutOfBounds {
        kind: ShipKind,
        origin: Coord,
        orientation: Orientation,
    },
    #[error("{kind} would overlap the {existing} at {at}")]
    Overlap {
        kind: ShipKind,
        existing: ShipKind,
        at: Coord,
    },
    #[error("the {0} is already placed")]
    AlreadyPlaced(ShipKind),
    #[error("no room left on the board for the {0}")]
    NoRoom(ShipKind),
    #[error("all five ships are already placed")]
    FleetComplete,
    #[error("ships can only be placed before the battle starts")]
    WrongPhase,
}

/// Reasons a local attack was rejected before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttackError {
    #[error("{0} was already fired at; pick another cell")]
    AlreadyFired(Coord),
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("waiting for the result of the attack on {0}")]
    ResultPending(Coord),
    #[error("no battle in progress")]
    NoBattle,
    #[error("no attack awaiting a result")]
    NoPendingAttack,
}

/// Invitation failures. Never shown to the user: the game falls back to
/// playing against the AI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InviteError {
    #[error("no peer connected")]
    NoPeerConnected,
}
