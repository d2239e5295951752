use ascii_whisper::{
    AttackError, AttackResult, Coord, GameState, Mode, Orientation, Outcome, Phase,
    PlacementError, ShipKind, Turn, ViewCell,
};
use rand::{rngs::SmallRng, SeedableRng};

fn c(s: &str) -> Coord {
    s.parse().unwrap()
}

fn battle(first: Turn) -> GameState {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut game = GameState::new(Mode::VsHuman, first);
    game.place_remaining_randomly(&mut rng).unwrap();
    game.set_peer_ready();
    assert!(game.ready_for_battle());
    game.begin_battle();
    game
}

#[test]
fn fleet_is_placed_in_order() {
    let mut game = GameState::new(Mode::VsAi, Turn::Local);
    assert_eq!(
        game.place_next(c("A1"), Orientation::Horizontal),
        Ok(ShipKind::Carrier)
    );
    assert_eq!(
        game.place_next(c("B1"), Orientation::Horizontal),
        Ok(ShipKind::Battleship)
    );
    assert!(!game.ready_for_battle());
}

#[test]
fn attacks_need_a_battle() {
    let game = GameState::new(Mode::VsHuman, Turn::Local);
    assert_eq!(game.check_attack(c("A1")), Err(AttackError::NoBattle));
}

#[test]
fn placement_is_closed_once_battle_starts() {
    let mut game = battle(Turn::Local);
    assert_eq!(game.phase(), Phase::Battle);
    assert_eq!(
        game.place_ship(ShipKind::Carrier, c("A1"), Orientation::Vertical),
        Err(PlacementError::WrongPhase)
    );
}

#[test]
fn attacking_out_of_turn_is_refused() {
    let mut game = battle(Turn::Opponent);
    assert_eq!(game.mark_pending(c("A1")), Err(AttackError::NotYourTurn));
    assert_eq!(game.pending_attack(), None);
}

#[test]
fn result_is_applied_only_when_it_arrives() {
    let mut game = battle(Turn::Local);
    game.mark_pending(c("E5")).unwrap();
    assert_eq!(game.opponent_view().cell(c("E5")), ViewCell::Unknown);
    assert_eq!(
        game.mark_pending(c("F5")),
        Err(AttackError::ResultPending(c("E5")))
    );

    game.apply_result(c("E5"), AttackResult::Hit).unwrap();
    assert_eq!(game.opponent_view().cell(c("E5")), ViewCell::Hit);
    assert_eq!(game.pending_attack(), None);
    assert_eq!(game.turn(), Turn::Opponent);
}

#[test]
fn unsolicited_result_changes_nothing() {
    let mut game = battle(Turn::Local);
    assert_eq!(
        game.apply_result(c("A1"), AttackResult::Sunk(ShipKind::Destroyer)),
        Err(AttackError::NoPendingAttack)
    );
    assert_eq!(game.turn(), Turn::Local);
    assert_eq!(game.opponent_view().cell(c("A1")), ViewCell::Unknown);
    assert!(game.opponent_view().sunk().is_empty());

    game.mark_pending(c("B2")).unwrap();
    game.apply_result(c("B2"), AttackResult::Miss).unwrap();
    assert_eq!(
        game.apply_result(c("B2"), AttackResult::Hit),
        Err(AttackError::NoPendingAttack)
    );
    assert_eq!(game.opponent_view().cell(c("B2")), ViewCell::Miss);
    assert_eq!(game.turn(), Turn::Opponent);
}

#[test]
fn already_fired_result_keeps_the_turn() {
    let mut game = battle(Turn::Local);
    game.mark_pending(c("A1")).unwrap();
    game.apply_result(c("A1"), AttackResult::AlreadyFired).unwrap();
    assert_eq!(game.turn(), Turn::Local);
    assert_eq!(game.pending_attack(), None);
}

#[test]
fn turns_alternate_after_every_resolved_attack() {
    let mut game = battle(Turn::Opponent);
    let first = game.receive_attack(c("A1")).unwrap();
    assert!(first.is_resolved());
    assert_eq!(game.turn(), Turn::Local);
    assert_eq!(game.receive_attack(c("A2")), Err(AttackError::NotYourTurn));

    game.mark_pending(c("J10")).unwrap();
    game.apply_result(c("J10"), AttackResult::Miss).unwrap();
    assert_eq!(game.turn(), Turn::Opponent);
    assert_eq!(game.check_attack(c("J10")), Err(AttackError::NotYourTurn));
}

#[test]
fn losing_the_last_ship_is_a_defeat() {
    let mut game = battle(Turn::Opponent);
    let cells: Vec<Coord> = game.own_board().ship_map().iter().collect();
    let mut our_shots = Coord::all();
    for (i, &x) in cells.iter().enumerate() {
        assert!(game.receive_attack(x).unwrap().is_hit());
        if i + 1 < cells.len() {
            assert!(!game.is_finished());
            let shot = our_shots.next().unwrap();
            game.mark_pending(shot).unwrap();
            game.apply_result(shot, AttackResult::Miss).unwrap();
        }
    }
    assert_eq!(game.phase(), Phase::Finished);
    assert_eq!(game.outcome(), Some(Outcome::Defeat));
}

#[test]
fn placing_past_the_fleet_is_refused() {
    let mut rng = SmallRng::seed_from_u64(8);
    let mut game = GameState::new(Mode::VsAi, Turn::Local);
    game.place_remaining_randomly(&mut rng).unwrap();
    assert_eq!(
        game.place_next(c("A1"), Orientation::Horizontal),
        Err(PlacementError::FleetComplete)
    );
}

#[test]
fn finish_is_terminal() {
    let mut game = battle(Turn::Local);
    game.finish(Outcome::Aborted);
    game.finish(Outcome::Victory);
    assert_eq!(game.outcome(), Some(Outcome::Aborted));
    assert_eq!(game.check_attack(c("B2")), Err(AttackError::NoBattle));
}
