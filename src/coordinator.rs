//! Game coordinator: turns local input and peer game messages into game
//! state changes and outgoing messages.
//!
//! The coordinator is the single owner of the current [`GameState`]. Both of
//! its entry points, [`Coordinator::handle_input`] and
//! [`Coordinator::handle_event`], take `&mut self`, so a result arriving from
//! the peer can never interleave with a locally submitted attack.

use core::fmt;

use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::ai::AiOpponent;
use crate::board::Board;
use crate::common::{AttackResult, InviteError, PlacementError};
use crate::config::GameConfig;
use crate::coord::Coord;
use crate::game::{GameState, Mode, Outcome, Phase, Turn};
use crate::input::{Action, ParsedInput, HELP};
use crate::protocol::{AttackReport, GameMessage, Winner};
use crate::render;
use crate::session::{ConnectionState, DisconnectReason, Session, SessionEvent};

/// Which side of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Client,
}

/// Something to show the local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    /// Input refused; names the rule that was broken.
    Rejected(String),
    /// A rendered board.
    Board(String),
    ChatSent(String),
    ChatReceived { from: String, text: String },
    GameOver(Outcome),
    /// The user asked to leave the application.
    Exit,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Info(s) => f.write_str(s),
            Notice::Rejected(s) => write!(f, "! {s}"),
            Notice::Board(s) => f.write_str(s),
            Notice::ChatSent(s) => write!(f, "You: {s}"),
            Notice::ChatReceived { from, text } => write!(f, "{from}: {text}"),
            Notice::GameOver(Outcome::Victory) => f.write_str("*** Victory! You sank the whole fleet. ***"),
            Notice::GameOver(Outcome::Defeat) => f.write_str("*** Defeat. Your fleet is gone. ***"),
            Notice::GameOver(Outcome::Aborted) => f.write_str("*** Game aborted. ***"),
            Notice::Exit => f.write_str("Goodbye."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Invite {
    Idle,
    Sent,
    Received,
}

/// The computer opponent's side of a local game.
struct AiMatch {
    fleet: Board,
    targeting: AiOpponent,
}

pub struct Coordinator {
    role: Role,
    session: Option<Session>,
    config: GameConfig,
    rng: SmallRng,
    game: Option<GameState>,
    ai: Option<AiMatch>,
    invite: Invite,
    last_outcome: Option<Outcome>,
}

fn describe(result: AttackResult) -> String {
    match result {
        AttackResult::AlreadyFired => "already fired there".to_string(),
        AttackResult::Miss => "miss".to_string(),
        AttackResult::Hit => "hit!".to_string(),
        AttackResult::Sunk(kind) => format!("sunk the {kind}!"),
    }
}

impl Coordinator {
    pub fn new(role: Role, session: Option<Session>, config: GameConfig, rng: SmallRng) -> Self {
        Self {
            role,
            session,
            config,
            rng,
            game: None,
            ai: None,
            invite: Invite::Idle,
            last_outcome: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The game in progress, if any.
    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// How the most recent game ended.
    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn invitation_pending(&self) -> bool {
        self.invite != Invite::Idle
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn active_session(&self) -> Result<&Session, InviteError> {
        self.session
            .as_ref()
            .filter(|s| s.is_active())
            .ok_or(InviteError::NoPeerConnected)
    }

    fn in_battle(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.phase() == Phase::Battle)
    }

    fn send_game(&self, msg: GameMessage, out: &mut Vec<Notice>) -> bool {
        let sent = match self.active_session() {
            Ok(session) => session.send_game(msg).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match sent {
            Ok(()) => true,
            Err(e) => {
                out.push(Notice::Rejected(format!("could not reach the peer: {e}")));
                false
            }
        }
    }

    /// Handle one line of local input.
    pub async fn handle_input(&mut self, line: &str) -> Vec<Notice> {
        let mut out = Vec::new();
        match ParsedInput::parse(line, self.in_battle()) {
            None => {}
            Some(ParsedInput::Chat(text)) => self.chat(text, &mut out),
            Some(ParsedInput::Coordinate(coord)) => self.fire(coord, &mut out).await,
            Some(ParsedInput::Command(cmd)) => match cmd.action() {
                Ok(action) => self.run(action, &mut out).await,
                Err(e) => out.push(Notice::Rejected(e.to_string())),
            },
        }
        out
    }

    /// Handle one event from the session.
    pub fn handle_event(&mut self, event: SessionEvent) -> Vec<Notice> {
        let mut out = Vec::new();
        match event {
            SessionEvent::Chat(text) => {
                let from = self
                    .session
                    .as_ref()
                    .map(|s| s.peer().name)
                    .unwrap_or_else(|| "peer".to_string());
                out.push(Notice::ChatReceived { from, text });
            }
            SessionEvent::Game(msg) => self.on_game_message(msg, &mut out),
            SessionEvent::PeerInfo(info) => {
                out.push(Notice::Info(format!("Peer is now known as {}.", info.name)))
            }
            SessionEvent::Disconnected(reason) => self.on_disconnect(reason, &mut out),
        }
        out
    }

    fn chat(&mut self, text: String, out: &mut Vec<Notice>) {
        match self.session.as_ref().map(|s| s.send_chat(text.clone())) {
            Some(Ok(())) => out.push(Notice::ChatSent(text)),
            Some(Err(e)) => out.push(Notice::Rejected(format!("chat not sent: {e}"))),
            None => out.push(Notice::Rejected("chat not sent: no peer connected".into())),
        }
    }

    async fn run(&mut self, action: Action, out: &mut Vec<Notice>) {
        match action {
            Action::Battleship => self.start(out),
            Action::Accept => self.accept(out),
            Action::Decline => self.decline(out),
            Action::Quit => self.quit(out),
            Action::Map => match &self.game {
                Some(g) => out.push(Notice::Board(render::attack_map(g.opponent_view()))),
                None => out.push(Notice::Rejected("no game in progress".into())),
            },
            Action::Place(coord, orientation) => {
                let Some(game) = self.game.as_mut() else {
                    out.push(Notice::Rejected("start a game with /battleship first".into()));
                    return;
                };
                match game.place_next(coord, orientation) {
                    Ok(kind) => {
                        out.push(Notice::Info(format!("{kind} placed at {coord}.")));
                        out.push(Notice::Board(render::own_board(game.own_board())));
                        self.after_placement(out);
                    }
                    Err(e) => out.push(Notice::Rejected(e.to_string())),
                }
            }
            Action::Random => {
                let Some(game) = self.game.as_mut() else {
                    out.push(Notice::Rejected("start a game with /battleship first".into()));
                    return;
                };
                if game.phase() == Phase::Placement && game.own_board().fleet_complete() {
                    out.push(Notice::Rejected(PlacementError::FleetComplete.to_string()));
                    return;
                }
                match game.place_remaining_randomly(&mut self.rng) {
                    Ok(()) => {
                        out.push(Notice::Board(render::own_board(game.own_board())));
                        self.after_placement(out);
                    }
                    Err(e) => out.push(Notice::Rejected(e.to_string())),
                }
            }
            Action::Help => out.push(Notice::Info(HELP.to_string())),
            Action::Status => out.push(Notice::Info(self.status())),
            Action::Ping(text) => self.chat(format!("[PING] {text}"), out),
            Action::Exit => out.push(Notice::Exit),
        }
    }

    fn status(&self) -> String {
        let conn = match &self.session {
            Some(s) => {
                let stats = s.stats();
                format!(
                    "{:?} with {} ({}); frames sent {}/{}/{} video/chat/game, received {}/{}/{}, video dropped {}",
                    s.state(),
                    s.peer().name,
                    s.peer_addr(),
                    stats.frames_sent.video,
                    stats.frames_sent.chat,
                    stats.frames_sent.game,
                    stats.frames_received.video,
                    stats.frames_received.chat,
                    stats.frames_received.game,
                    stats.video_dropped,
                )
            }
            None => "not connected".to_string(),
        };
        let game = match &self.game {
            Some(g) => format!("{:?} game, {:?} phase, turn: {:?}", g.mode(), g.phase(), g.turn()),
            None => "no game".to_string(),
        };
        format!("{conn}\n{game}")
    }

    fn start(&mut self, out: &mut Vec<Notice>) {
        if self.game.as_ref().is_some_and(|g| !g.is_finished()) {
            out.push(Notice::Rejected("a game is already in progress; /quit it first".into()));
            return;
        }
        match self.invite {
            Invite::Sent => {
                out.push(Notice::Rejected("still waiting for the peer to answer".into()));
                return;
            }
            Invite::Received => {
                out.push(Notice::Rejected("answer the pending invitation with /accept or /decline".into()));
                return;
            }
            Invite::Idle => {}
        }
        match self.active_session().map(|s| s.send_game(GameMessage::Invite)) {
            Ok(Ok(())) => {
                self.invite = Invite::Sent;
                info!("invitation sent");
                out.push(Notice::Info("Invitation sent; waiting for the peer.".into()));
            }
            Ok(Err(e)) => {
                debug!(error = %e, "invite failed, playing the AI");
                self.start_vs_ai(out);
            }
            Err(e) => {
                debug!(error = %e, "playing the AI");
                self.start_vs_ai(out);
            }
        }
    }

    fn start_vs_ai(&mut self, out: &mut Vec<Notice>) {
        let fleet = match AiOpponent::place_fleet(&mut self.rng) {
            Ok(fleet) => fleet,
            Err(e) => {
                out.push(Notice::Rejected(format!("could not set up the computer's fleet: {e}")));
                return;
            }
        };
        self.ai = Some(AiMatch {
            fleet,
            targeting: AiOpponent::new(),
        });
        self.game = Some(GameState::new(Mode::VsAi, Turn::Local));
        info!("game against the AI started");
        out.push(Notice::Info(
            "Playing against the computer. Place ships with /place <A1> <H|V> or /random.".into(),
        ));
    }

    fn start_vs_human(&mut self, first: Turn, out: &mut Vec<Notice>) {
        self.ai = None;
        self.game = Some(GameState::new(Mode::VsHuman, first));
        info!(?first, "game against the peer started");
        out.push(Notice::Info(
            "Game on! Place ships with /place <A1> <H|V> or /random.".into(),
        ));
    }

    fn accept(&mut self, out: &mut Vec<Notice>) {
        if self.invite != Invite::Received {
            out.push(Notice::Rejected("there is no invitation to accept".into()));
            return;
        }
        self.invite = Invite::Idle;
        if self.send_game(GameMessage::Accept, out) {
            self.start_vs_human(Turn::Opponent, out);
        }
    }

    fn decline(&mut self, out: &mut Vec<Notice>) {
        if self.invite != Invite::Received {
            out.push(Notice::Rejected("there is no invitation to decline".into()));
            return;
        }
        self.invite = Invite::Idle;
        if self.send_game(GameMessage::Decline, out) {
            out.push(Notice::Info("Invitation declined.".into()));
        }
    }

    fn quit(&mut self, out: &mut Vec<Notice>) {
        if self.invite == Invite::Sent {
            self.invite = Invite::Idle;
            let mut ignored = Vec::new();
            self.send_game(GameMessage::Quit, &mut ignored);
            out.push(Notice::Info("Invitation withdrawn.".into()));
            return;
        }
        let Some(game) = self.game.as_ref() else {
            out.push(Notice::Rejected("no game in progress".into()));
            return;
        };
        if game.mode() == Mode::VsHuman {
            let mut ignored = Vec::new();
            self.send_game(GameMessage::Quit, &mut ignored);
        }
        self.finish(Outcome::Aborted, out);
    }

    fn after_placement(&mut self, out: &mut Vec<Notice>) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        if !game.own_board().fleet_complete() {
            if let Some(next) = game.own_board().next_unplaced() {
                out.push(Notice::Info(format!(
                    "Next: {} ({} cells).",
                    next,
                    next.length()
                )));
            }
            return;
        }
        if game.mode() == Mode::VsHuman {
            self.send_game(GameMessage::PlacementComplete, out);
        } else if let Some(game) = self.game.as_mut() {
            game.set_peer_ready();
        }
        self.maybe_begin_battle(out);
    }

    fn maybe_begin_battle(&mut self, out: &mut Vec<Notice>) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if !game.ready_for_battle() {
            if game.own_board().fleet_complete() {
                out.push(Notice::Info("Fleet ready; waiting for the opponent.".into()));
            }
            return;
        }
        game.begin_battle();
        info!(turn = ?game.turn(), "battle started");
        out.push(Notice::Info(match game.turn() {
            Turn::Local => "Battle! Your turn: fire with a coordinate like E5.".into(),
            Turn::Opponent => "Battle! The opponent fires first.".into(),
        }));
    }

    async fn fire(&mut self, coord: Coord, out: &mut Vec<Notice>) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        match game.mode() {
            Mode::VsHuman => {
                if let Err(e) = game.mark_pending(coord) {
                    out.push(Notice::Rejected(e.to_string()));
                    return;
                }
                if self.send_game(GameMessage::Attack(coord), out) {
                    out.push(Notice::Info(format!("Firing at {coord}...")));
                }
            }
            Mode::VsAi => self.fire_at_ai(coord, out).await,
        }
    }

    async fn fire_at_ai(&mut self, coord: Coord, out: &mut Vec<Notice>) {
        let (Some(game), Some(ai)) = (self.game.as_mut(), self.ai.as_mut()) else {
            return;
        };
        if let Err(e) = game.mark_pending(coord) {
            out.push(Notice::Rejected(e.to_string()));
            return;
        }
        let result = ai.fleet.resolve_attack(coord);
        if let Err(e) = game.apply_result(coord, result) {
            warn!(error = %e, "local attack result rejected");
            return;
        }
        out.push(Notice::Info(format!("{coord}: {}", describe(result))));
        if ai.fleet.is_fleet_destroyed() {
            self.finish(Outcome::Victory, out);
            return;
        }

        tokio::time::sleep(self.config.ai_delay).await;

        let (Some(game), Some(ai)) = (self.game.as_mut(), self.ai.as_mut()) else {
            return;
        };
        let Some(target) = ai.targeting.choose(&mut self.rng) else {
            return;
        };
        let result = match game.receive_attack(target) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "AI attack rejected");
                return;
            }
        };
        ai.targeting.observe(target, result);
        out.push(Notice::Info(format!(
            "Computer fires at {target}: {}",
            describe(result)
        )));
        if game.is_finished() {
            self.finish(Outcome::Defeat, out);
        } else {
            out.push(Notice::Info("Your turn.".into()));
        }
    }

    fn on_game_message(&mut self, msg: GameMessage, out: &mut Vec<Notice>) {
        let peer = self
            .session
            .as_ref()
            .map(|s| s.peer().name)
            .unwrap_or_else(|| "The peer".to_string());
        match msg {
            GameMessage::Invite => self.on_invite(&peer, out),
            GameMessage::Accept => {
                if self.invite == Invite::Sent {
                    self.invite = Invite::Idle;
                    out.push(Notice::Info(format!("{peer} accepted.")));
                    self.start_vs_human(Turn::Local, out);
                } else {
                    debug!("accept for a withdrawn invitation; telling the peer");
                    let mut ignored = Vec::new();
                    self.send_game(GameMessage::Quit, &mut ignored);
                }
            }
            GameMessage::Decline => {
                if self.invite == Invite::Sent {
                    self.invite = Invite::Idle;
                    out.push(Notice::Info(format!("{peer} declined.")));
                    self.start_vs_ai(out);
                } else {
                    debug!("unexpected decline ignored");
                }
            }
            GameMessage::PlacementComplete => match self.game.as_mut() {
                Some(game) if game.mode() == Mode::VsHuman => {
                    game.set_peer_ready();
                    out.push(Notice::Info(format!("{peer} has placed their fleet.")));
                    self.maybe_begin_battle(out);
                }
                _ => debug!("placement-complete without a game"),
            },
            GameMessage::Attack(coord) => self.on_attack(coord, &peer, out),
            GameMessage::AttackResult(report) => self.on_attack_result(report, out),
            GameMessage::GameOver { winner } => {
                if self.game.as_ref().is_some_and(|g| g.mode() == Mode::VsHuman) {
                    let outcome = match winner {
                        Winner::Receiver => Outcome::Victory,
                        Winner::Sender => Outcome::Defeat,
                    };
                    self.finish(outcome, out);
                }
            }
            GameMessage::Quit => {
                if self.game.as_ref().is_some_and(|g| g.mode() == Mode::VsHuman) {
                    out.push(Notice::Info(format!("{peer} left the game.")));
                    self.finish(Outcome::Aborted, out);
                } else if self.invite == Invite::Received {
                    self.invite = Invite::Idle;
                    out.push(Notice::Info(format!("{peer} withdrew the invitation.")));
                }
            }
        }
    }

    fn on_invite(&mut self, peer: &str, out: &mut Vec<Notice>) {
        if self.game.as_ref().is_some_and(|g| !g.is_finished()) {
            let mut ignored = Vec::new();
            self.send_game(GameMessage::Decline, &mut ignored);
            out.push(Notice::Info(format!(
                "{peer} invited you, but a game is in progress; declined."
            )));
            return;
        }
        match (self.invite, self.role) {
            (Invite::Sent, Role::Host) => {
                debug!("crossing invitations; ours stands");
                return;
            }
            (Invite::Sent, Role::Client) => {
                debug!("crossing invitations; withdrawing ours");
            }
            _ => {}
        }
        self.invite = Invite::Received;
        out.push(Notice::Info(format!(
            "{peer} invites you to Battleship. /accept or /decline?"
        )));
    }

    fn on_attack(&mut self, coord: Coord, peer: &str, out: &mut Vec<Notice>) {
        let Some(game) = self.game.as_mut().filter(|g| g.mode() == Mode::VsHuman) else {
            debug!(%coord, "attack without a game ignored");
            return;
        };
        let result = match game.receive_attack(coord) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, %coord, "peer attack rejected");
                return;
            }
        };
        let lost = game.is_finished();
        out.push(Notice::Info(format!(
            "{peer} fires at {coord}: {}",
            describe(result)
        )));
        self.send_game(
            GameMessage::AttackResult(AttackReport { coord, result }),
            out,
        );
        if lost {
            self.send_game(
                GameMessage::GameOver {
                    winner: Winner::Receiver,
                },
                out,
            );
            self.finish(Outcome::Defeat, out);
        } else if result.is_resolved() {
            out.push(Notice::Info("Your turn.".into()));
        }
    }

    fn on_attack_result(&mut self, report: AttackReport, out: &mut Vec<Notice>) {
        let Some(game) = self.game.as_mut().filter(|g| g.mode() == Mode::VsHuman) else {
            debug!("attack result without a game ignored");
            return;
        };
        if let Err(e) = game.apply_result(report.coord, report.result) {
            warn!(error = %e, "attack result rejected");
            return;
        }
        out.push(Notice::Info(format!(
            "{}: {}",
            report.coord,
            describe(report.result)
        )));
        if game.opponent_view().all_sunk() {
            self.finish(Outcome::Victory, out);
        }
    }

    fn on_disconnect(&mut self, reason: DisconnectReason, out: &mut Vec<Notice>) {
        match &reason {
            DisconnectReason::LocalShutdown => out.push(Notice::Info("Disconnected.".into())),
            DisconnectReason::Failed(e) => out.push(Notice::Info(format!("Connection lost: {e}"))),
        }
        self.invite = Invite::Idle;
        if self
            .game
            .as_ref()
            .is_some_and(|g| g.mode() == Mode::VsHuman && !g.is_finished())
        {
            self.finish(Outcome::Aborted, out);
        }
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.state() == ConnectionState::Closed)
        {
            self.session = None;
        }
    }

    /// End the current game and discard its state.
    fn finish(&mut self, outcome: Outcome, out: &mut Vec<Notice>) {
        if let Some(mut game) = self.game.take() {
            game.finish(outcome);
            let outcome = game.outcome().unwrap_or(outcome);
            info!(?outcome, "game over");
            self.last_outcome = Some(outcome);
            out.push(Notice::GameOver(outcome));
        }
        self.ai = None;
    }
}
