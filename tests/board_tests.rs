use ascii_whisper::{
    AttackBoard, AttackError, AttackResult, BitBoard, Board, Cell, Coord, Grid, Orientation,
    PlacementError, ShipKind, ViewCell, FLEET, TOTAL_SHIP_CELLS,
};
use proptest::prelude::*;
use rand::{rngs::SmallRng, SeedableRng};

fn c(s: &str) -> Coord {
    s.parse().unwrap()
}

fn random_fleet(seed: u64) -> Board {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut board = Board::new();
    board.place_remaining_randomly(&mut rng).unwrap();
    board
}

#[test]
fn small_bitboard_iterates_its_own_cells() {
    let corner = Coord { row: 3, col: 3 };
    let mut small: BitBoard<u16, 4> = [Coord { row: 0, col: 1 }, corner]
        .into_iter()
        .collect();
    assert!(!small.insert(corner));
    assert!(!small.insert(Coord { row: 4, col: 0 }));
    assert_eq!(
        small.iter().collect::<Vec<_>>(),
        [Coord { row: 0, col: 1 }, corner]
    );
    assert_eq!((!small).count(), 14);
    assert!((!small).iter().all(|c| c.row < 4 && c.col < 4));
}

#[test]
fn full_grid_iterates_every_cell() {
    let full = !Grid::new();
    assert_eq!(full.count(), 100);
    assert!(full.iter().eq(Coord::all()));
}

#[test]
fn carrier_at_a1_horizontal_covers_a1_to_a5() {
    let mut board = Board::new();
    board
        .place_ship(ShipKind::Carrier, c("A1"), Orientation::Horizontal)
        .unwrap();
    let occupied: Vec<Coord> = Coord::all()
        .filter(|x| matches!(board.cell(*x), Cell::Ship(_)))
        .collect();
    assert_eq!(occupied, ["A1", "A2", "A3", "A4", "A5"].map(c).to_vec());
}

#[test]
fn overlapping_ship_is_rejected_without_change() {
    let mut board = Board::new();
    board
        .place_ship(ShipKind::Carrier, c("A1"), Orientation::Horizontal)
        .unwrap();
    let err = board
        .place_ship(ShipKind::Battleship, c("A3"), Orientation::Vertical)
        .unwrap_err();
    assert_eq!(
        err,
        PlacementError::Overlap {
            kind: ShipKind::Battleship,
            existing: ShipKind::Carrier,
            at: c("A3"),
        }
    );
    assert_eq!(board.ships().len(), 1);
    assert_eq!(board.cell(c("B3")), Cell::Water);
}

#[test]
fn ship_past_the_edge_is_out_of_bounds() {
    let mut board = Board::new();
    let err = board
        .place_ship(ShipKind::Destroyer, c("J10"), Orientation::Horizontal)
        .unwrap_err();
    assert!(matches!(err, PlacementError::OutOfBounds { kind: ShipKind::Destroyer, .. }));
    assert!(board.ships().is_empty());
    assert_eq!(board.cell(c("J10")), Cell::Water);
}

#[test]
fn each_kind_is_placed_once() {
    let mut board = Board::new();
    board
        .place_ship(ShipKind::Cruiser, c("C3"), Orientation::Vertical)
        .unwrap();
    let err = board
        .place_ship(ShipKind::Cruiser, c("H1"), Orientation::Horizontal)
        .unwrap_err();
    assert_eq!(err, PlacementError::AlreadyPlaced(ShipKind::Cruiser));
}

#[test]
fn repeated_attack_is_already_fired_and_changes_nothing() {
    let mut board = Board::new();
    board
        .place_ship(ShipKind::Destroyer, c("B1"), Orientation::Horizontal)
        .unwrap();
    assert_eq!(board.resolve_attack(c("C7")), AttackResult::Miss);
    assert_eq!(board.resolve_attack(c("C7")), AttackResult::AlreadyFired);
    assert_eq!(board.cell(c("C7")), Cell::Miss);

    assert_eq!(board.resolve_attack(c("B1")), AttackResult::Hit);
    assert_eq!(board.resolve_attack(c("B1")), AttackResult::AlreadyFired);
    assert_eq!(board.cell(c("B1")), Cell::Hit);
    assert_eq!(board.fired().count(), 2);
}

#[test]
fn destroyer_sinks_only_on_second_hit() {
    let mut board = Board::new();
    let id = board
        .place_ship(ShipKind::Destroyer, c("B1"), Orientation::Horizontal)
        .unwrap();
    assert_eq!(board.resolve_attack(c("B1")), AttackResult::Hit);
    assert!(!board.ship(ShipKind::Destroyer).unwrap().is_sunk());
    assert_eq!(
        board.resolve_attack(c("B2")),
        AttackResult::Sunk(ShipKind::Destroyer)
    );
    assert_eq!(board.cell(c("B1")), Cell::Sunk(id));
    assert_eq!(board.cell(c("B2")), Cell::Sunk(id));
    assert!(board.is_fleet_destroyed());
}

#[test]
fn view_records_each_cell_once() {
    let mut view = AttackBoard::new();
    view.record(c("E5"), AttackResult::Hit).unwrap();
    assert_eq!(view.cell(c("E5")), ViewCell::Hit);
    assert_eq!(
        view.record(c("E5"), AttackResult::Miss),
        Err(AttackError::AlreadyFired(c("E5")))
    );
    view.record(c("E6"), AttackResult::AlreadyFired).unwrap();
    assert!(!view.has_fired(c("E6")));
}

#[test]
fn view_knows_when_the_whole_fleet_is_sunk() {
    let mut view = AttackBoard::new();
    for (i, kind) in FLEET.into_iter().enumerate() {
        assert!(!view.all_sunk());
        view.record(Coord { row: i as u8, col: 0 }, AttackResult::Sunk(kind))
            .unwrap();
    }
    assert!(view.all_sunk());
    assert_eq!(view.sunk(), &FLEET);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_fleet_is_legal(seed in any::<u64>()) {
        let board = random_fleet(seed);
        prop_assert!(board.fleet_complete());
        prop_assert_eq!(board.ships().len(), FLEET.len());
        // overlapping ships would share bits and shrink the union
        prop_assert_eq!(board.ship_map().count(), TOTAL_SHIP_CELLS);
    }

    #[test]
    fn fleet_is_destroyed_only_when_every_cell_is_hit(seed in any::<u64>(), spared in 0..TOTAL_SHIP_CELLS) {
        let board = random_fleet(seed);
        let cells: Vec<Coord> = board.ship_map().iter().collect();

        let mut all_hit = board.clone();
        for &x in &cells {
            all_hit.resolve_attack(x);
        }
        prop_assert!(all_hit.is_fleet_destroyed());

        let mut one_short = board.clone();
        for (i, &x) in cells.iter().enumerate() {
            if i != spared {
                one_short.resolve_attack(x);
            }
        }
        prop_assert!(!one_short.is_fleet_destroyed());
    }

    #[test]
    fn attack_is_idempotent(seed in any::<u64>(), row in 0u8..10, col in 0u8..10) {
        let mut board = random_fleet(seed);
        let at = Coord { row, col };
        let first = board.resolve_attack(at);
        prop_assert!(first.is_resolved());
        let snapshot = (board.cell(at), board.fired(), board.ships_afloat());
        prop_assert_eq!(board.resolve_attack(at), AttackResult::AlreadyFired);
        prop_assert_eq!((board.cell(at), board.fired(), board.ships_afloat()), snapshot);
    }
}
