//! Classification of one line of local input.

use crate::coord::{Coord, CoordError};
use crate::ship::Orientation;

/// A line of local input, classified once and then matched exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Command(Command),
    Coordinate(Coord),
    Chat(String),
}

/// A slash command split into its name and whitespace-separated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

/// What a recognised command asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Battleship,
    Accept,
    Decline,
    Quit,
    Map,
    Place(Coord, Orientation),
    Random,
    Help,
    Status,
    Ping(String),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command /{0}; type /help for the list")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    BadCoord(#[from] CoordError),
    #[error("orientation '{0}' must be H or V")]
    BadOrientation(String),
}

pub const HELP: &str = "\
/battleship          start a game (invites the peer, or plays the AI)
/accept, /decline    answer a game invitation
/place <A1> <H|V>    place the next ship of your fleet
/random              place the remaining ships randomly
/map                 show your attack map
/quit                abandon the current game
/status              connection and traffic summary
/ping <text>         nudge the peer
/help                this list
/exit                leave the application
During a battle, a bare coordinate such as E5 fires at that cell.";

impl ParsedInput {
    /// Classify `line`. Blank lines yield `None`. Outside a battle a bare
    /// coordinate is ordinary chat.
    pub fn parse(line: &str, in_battle: bool) -> Option<ParsedInput> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix('/') {
            let mut words = rest.split_whitespace().map(str::to_string);
            let name = words.next().unwrap_or_default().to_ascii_lowercase();
            return Some(ParsedInput::Command(Command {
                name,
                args: words.collect(),
            }));
        }
        if in_battle {
            if let Ok(coord) = Coord::parse(trimmed) {
                return Some(ParsedInput::Coordinate(coord));
            }
        }
        Some(ParsedInput::Chat(line.trim_end().to_string()))
    }
}

impl Command {
    pub fn action(&self) -> Result<Action, InputError> {
        let arg = |i: usize| self.args.get(i).map(String::as_str);
        Ok(match self.name.as_str() {
            "battleship" => Action::Battleship,
            "accept" => Action::Accept,
            "decline" => Action::Decline,
            "quit" => Action::Quit,
            "map" => Action::Map,
            "random" => Action::Random,
            "help" => Action::Help,
            "status" => Action::Status,
            "exit" => Action::Exit,
            "ping" => Action::Ping(self.args.join(" ")),
            "place" => {
                const USAGE: &str = "/place <A1-J10> <H|V>";
                let (Some(c), Some(o)) = (arg(0), arg(1)) else {
                    return Err(InputError::Usage(USAGE));
                };
                let coord = Coord::parse(c)?;
                let orientation =
                    Orientation::parse(o).ok_or_else(|| InputError::BadOrientation(o.to_string()))?;
                Action::Place(coord, orientation)
            }
            other => return Err(InputError::UnknownCommand(other.to_string())),
        })
    }
}
