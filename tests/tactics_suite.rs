//! Tactical reading scenarios, driven through the public API and the
//! GTP debug surface.

use tenuki::engine::Engine;
use tenuki::position::{parse_coord, play_move, Point, Position};
use tenuki::tactics::fix_atari;

fn setpos(eng: &mut Engine, moves: &[&str]) -> Position {
    let mut pos = Position::new();
    for mv in moves {
        let pt = parse_coord(mv).expect("test coordinate");
        play_move(eng, &mut pos, pt).unwrap_or_else(|e| panic!("move {mv}: {e}"));
    }
    pos
}

fn pt(s: &str) -> Point {
    parse_coord(s).unwrap()
}

#[test]
fn walled_in_group_escapes_downward() {
    if tenuki::constants::N != 9 {
        return;
    }
    let mut eng = Engine::new(1);
    let pos = setpos(&mut eng, &["C8", "C9", "E9", "B8", "F9", "D8"]);
    let status = fix_atari(&mut eng, &pos, pt("C8"), false, true, false);
    assert!(status.in_atari);
    assert_eq!(status.moves, vec![pt("C7")]);
    assert_eq!(status.sizes, vec![1]);
}

#[test]
fn corner_group_escapes_into_the_corner() {
    if tenuki::constants::N != 9 {
        return;
    }
    let mut eng = Engine::new(1);
    // White B1 is in atari between Black C1 and B2; A1 takes it.
    let pos = setpos(&mut eng, &["C1", "G7", "B2", "B1"]);
    let status = fix_atari(&mut eng, &pos, pt("B1"), false, true, false);
    assert!(status.in_atari);
    assert!(
        status.moves.contains(&pt("A1")),
        "expected the capture at A1, got {:?}",
        status.moves
    );
}

#[test]
fn chased_pair_is_caught_in_a_ladder() {
    if tenuki::constants::N != 9 {
        return;
    }
    let mut eng = Engine::new(1);
    let pos = setpos(
        &mut eng,
        &["G5", "F5", "A1", "G4", "A2", "H4", "A3", "G6", "H5"],
    );
    let status = fix_atari(&mut eng, &pos, pt("G5"), false, true, false);
    assert!(!status.in_atari);
    assert!(
        status.moves.contains(&pt("H6")) || status.moves.contains(&pt("J5")),
        "expected the ladder attack at H6 or J5, got {:?}",
        status.moves
    );
    assert_eq!(status.sizes.first(), Some(&2), "the pair is the prize");
}

#[test]
fn interior_two_liberty_groups_are_skipped_near_the_edge_only() {
    if tenuki::constants::N != 9 {
        return;
    }
    let mut eng = Engine::new(1);
    let pos = setpos(
        &mut eng,
        &["G5", "F5", "A1", "G4", "A2", "H4", "A3", "G6", "H5"],
    );
    // with the edge-only restriction the H6 liberty (second line)
    // suppresses the expensive read
    let status = fix_atari(&mut eng, &pos, pt("G5"), false, true, true);
    assert!(status.moves.is_empty());
}

#[test]
fn lone_corner_stone_cannot_outrun_the_ladder() {
    let mut eng = Engine::new(1);
    let pos = setpos(&mut eng, &["A1", "A2"]);
    let status = fix_atari(&mut eng, &pos, pt("A1"), false, true, false);
    assert!(status.in_atari);
    assert!(status.moves.is_empty());
}

#[test]
fn counter_capture_rescues_the_corner() {
    if tenuki::constants::N != 9 {
        return;
    }
    let mut eng = Engine::new(1);
    let pos = setpos(&mut eng, &["A1", "E5", "B2", "A2"]);
    let status = fix_atari(&mut eng, &pos, pt("A1"), false, true, false);
    assert!(status.in_atari);
    assert!(status.moves.contains(&pt("A3")) || status.moves.contains(&pt("B1")));
}

#[test]
fn ladder_reading_is_free_of_board_damage() {
    if tenuki::constants::N != 9 {
        return;
    }
    let mut eng = Engine::new(1);
    let pos = setpos(
        &mut eng,
        &["G5", "F5", "A1", "G4", "A2", "H4", "A3", "G6", "H5"],
    );
    let before = pos.clone();
    fix_atari(&mut eng, &pos, pt("G5"), false, true, false);
    assert!(pos == before, "reading must only touch copies");
}
