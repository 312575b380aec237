use super::*;
use crate::clock::ManualClock;

const H: Secs = 3_600; // 1 hour in seconds
const T0: Secs = 1_700_000_000;

use crate::model::VehicleClass::{Bike, Car};

fn shape(zones: u32, areas: u32, cars: u32, bikes: u32) -> HierarchyShape {
    HierarchyShape {
        zones,
        areas_per_zone: areas,
        car_slots_per_area: cars,
        bike_slots_per_area: bikes,
    }
}

fn engine_with(shape: HierarchyShape) -> (Engine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(T0));
    let engine = Engine::new(shape, 200, clock.clone()).unwrap();
    (engine, clock)
}

fn slot(zone: u32, area: u32, index: u32) -> SlotRef {
    SlotRef { zone, area, index }
}

fn slot_available(engine: &Engine, r: SlotRef) -> bool {
    let idx = engine.hierarchy().index_of(r).unwrap();
    engine.hierarchy().slot(idx).unwrap().is_available()
}

// ── Park ─────────────────────────────────────────────────

#[test]
fn park_picks_first_matching_slot() {
    let (mut engine, _) = engine_with(shape(2, 2, 2, 1));
    assert_eq!(engine.park("A1", Car, 0, 0).unwrap(), slot(1, 1, 0));
    assert_eq!(engine.park("A2", Car, 0, 0).unwrap(), slot(1, 1, 1));
    // Area 1 of zone 1 is out of car slots; the bike slot does not count.
    assert_eq!(engine.park("A3", Car, 0, 0).unwrap(), slot(1, 2, 0));
    assert_eq!(engine.park("B1", Bike, 0, 0).unwrap(), slot(1, 1, 2));
    engine.check_invariants().unwrap();
}

#[test]
fn park_creates_requested_record() {
    let (mut engine, _) = engine_with(shape(1, 1, 2, 0));
    let r = engine.park("A1", Car, 0, 0).unwrap();
    let record = engine.reservation("A1").unwrap();
    assert_eq!(record.status, ReservationStatus::Requested);
    assert_eq!(record.request_time, T0);
    assert_eq!(record.occupy_time, None);
    assert_eq!(record.slot_ref, r);

    let idx = engine.hierarchy().index_of(r).unwrap();
    let s = engine.hierarchy().slot(idx).unwrap();
    assert_eq!(s.state, SlotState::Reserved);
    assert_eq!(s.occupant.as_deref(), Some("A1"));
}

#[test]
fn park_respects_zone_hint() {
    let (mut engine, _) = engine_with(shape(3, 2, 1, 0));
    assert_eq!(engine.park("A1", Car, 2, 0).unwrap(), slot(2, 1, 0));
    assert_eq!(engine.park("A2", Car, 2, 0).unwrap(), slot(2, 2, 0));
    // Zone 2 is full; the hint restricts the search, so no spill-over.
    let err = engine.park("A3", Car, 2, 0).unwrap_err();
    assert_eq!(
        err,
        EngineError::NoAvailableSlot { class: Car, zone: Some(2), area: None }
    );
    assert!(engine.reservation("A3").is_none());
}

#[test]
fn park_respects_area_hint() {
    let (mut engine, _) = engine_with(shape(2, 3, 1, 0));
    assert_eq!(engine.park("A1", Car, 1, 3).unwrap(), slot(1, 3, 0));
    // Area hint without zone hint scans that area in every zone.
    assert_eq!(engine.park("A2", Car, 0, 3).unwrap(), slot(2, 3, 0));
    let err = engine.park("A3", Car, 0, 3).unwrap_err();
    assert_eq!(err.code(), "NoAvailableSlot");
}

#[test]
fn park_rejects_unknown_zone_and_area() {
    let (mut engine, _) = engine_with(shape(2, 2, 1, 0));
    assert_eq!(engine.park("A1", Car, 3, 0).unwrap_err(), EngineError::UnknownZone(3));
    assert_eq!(
        engine.park("A1", Car, 1, 5).unwrap_err(),
        EngineError::UnknownArea { zone: 1, area: 5 }
    );
    assert_eq!(
        engine.park("A1", Car, 0, 5).unwrap_err(),
        EngineError::UnknownArea { zone: 1, area: 5 }
    );
    assert_eq!(engine.active_count(), 0);
}

#[test]
fn unknown_hint_message_names_empty_scope() {
    let (mut engine, _) = engine_with(shape(2, 2, 1, 0));
    let zone = engine.park("A1", Car, 9, 0).unwrap_err().to_string();
    assert!(zone.contains("zone 9 does not exist"), "{zone}");
    assert!(zone.contains("search scope has no slots"), "{zone}");
    let area = engine.park("A1", Car, 2, 9).unwrap_err().to_string();
    assert!(area.contains("area 9 does not exist in zone 2"), "{area}");
    assert!(area.contains("search scope has no slots"), "{area}");
}

#[test]
fn park_duplicate_plate_rejected() {
    let (mut engine, _) = engine_with(shape(1, 1, 3, 0));
    engine.park("A1", Car, 0, 0).unwrap();
    let err = engine.park("A1", Car, 0, 0).unwrap_err();
    assert_eq!(err, EngineError::DuplicateRequest("A1".into()));
    // Same plate with a different class is still the same vehicle.
    assert!(matches!(
        engine.park("A1", Bike, 0, 0),
        Err(EngineError::DuplicateRequest(_))
    ));
    assert_eq!(engine.free_total(), 2);
}

#[test]
fn park_duplicate_after_occupy_rejected() {
    let (mut engine, _) = engine_with(shape(1, 1, 3, 0));
    engine.park("A1", Car, 0, 0).unwrap();
    engine.occupy("A1", Car).unwrap();
    assert_eq!(engine.park("A1", Car, 0, 0).unwrap_err().code(), "DuplicateRequest");
}

#[test]
fn park_rejects_bad_plates() {
    let (mut engine, _) = engine_with(shape(1, 1, 1, 0));
    assert!(matches!(engine.park("", Car, 0, 0), Err(EngineError::LimitExceeded(_))));
    let long = "X".repeat(crate::limits::MAX_PLATE_LEN + 1);
    assert!(matches!(engine.park(&long, Car, 0, 0), Err(EngineError::LimitExceeded(_))));
    assert_eq!(engine.free_total(), 1);
}

#[test]
fn single_free_slot_goes_to_first_caller() {
    let (mut engine, _) = engine_with(shape(1, 1, 1, 0));
    assert!(engine.park("P1", Car, 0, 0).is_ok());
    assert_eq!(engine.park("P2", Car, 0, 0).unwrap_err().code(), "NoAvailableSlot");
}

#[test]
fn park_is_deterministic_across_instances() {
    let run = || {
        let (mut engine, _) = engine_with(HierarchyShape::default());
        let mut out = Vec::new();
        for i in 0..40 {
            let class = if i % 3 == 0 { Bike } else { Car };
            out.push(engine.park(&format!("V{i}"), class, (i % 4) as u32, (i % 3) as u32).unwrap());
        }
        out
    };
    assert_eq!(run(), run());
}

// ── Occupy ───────────────────────────────────────────────

#[test]
fn occupy_transitions_record_and_slot() {
    let (mut engine, clock) = engine_with(shape(1, 1, 2, 0));
    let r = engine.park("A1", Car, 0, 0).unwrap();
    clock.advance(60);
    assert_eq!(engine.occupy("A1", Car).unwrap(), r);

    let record = engine.reservation("A1").unwrap();
    assert_eq!(record.status, ReservationStatus::Occupied);
    assert_eq!(record.occupy_time, Some(T0 + 60));
    let idx = engine.hierarchy().index_of(r).unwrap();
    assert_eq!(engine.hierarchy().slot(idx).unwrap().state, SlotState::Occupied);
    engine.check_invariants().unwrap();
}

#[test]
fn occupy_errors() {
    let (mut engine, _) = engine_with(shape(1, 1, 2, 0));
    assert_eq!(engine.occupy("nope", Car).unwrap_err(), EngineError::NotFound("nope".into()));

    engine.park("A1", Car, 0, 0).unwrap();
    assert_eq!(
        engine.occupy("A1", Bike).unwrap_err(),
        EngineError::TypeMismatch { plate: "A1".into(), expected: Car, got: Bike }
    );
    // Failed mismatch left the record untouched.
    assert_eq!(engine.reservation("A1").unwrap().status, ReservationStatus::Requested);

    engine.occupy("A1", Car).unwrap();
    assert_eq!(engine.occupy("A1", Car).unwrap_err(), EngineError::AlreadyOccupied("A1".into()));
}

// ── Release ──────────────────────────────────────────────

#[test]
fn release_after_occupy_computes_duration() {
    let (mut engine, clock) = engine_with(shape(1, 1, 2, 0));
    engine.park("A1", Car, 0, 0).unwrap();
    clock.advance(600);
    engine.occupy("A1", Car).unwrap();
    clock.advance(5_400);
    let entry = engine.release("A1", Car).unwrap();
    assert_eq!(entry.duration_hours, 1.5);
    assert_eq!(entry.status, HistoryStatus::Released);
    assert_eq!(entry.request_time, T0);
    assert_eq!(entry.occupy_time, Some(T0 + 600));
    assert_eq!(entry.release_time, Some(T0 + 6_000));
}

#[test]
fn release_without_occupy_has_zero_duration() {
    let (mut engine, clock) = engine_with(shape(1, 1, 2, 0));
    engine.park("A1", Car, 0, 0).unwrap();
    clock.advance(3 * H);
    let entry = engine.release("A1", Car).unwrap();
    assert_eq!(entry.duration_hours, 0.0);
    assert_eq!(entry.occupy_time, None);
}

#[test]
fn release_frees_exactly_the_assigned_slot() {
    let (mut engine, _) = engine_with(shape(1, 2, 2, 0));
    let a = engine.park("A", Car, 0, 0).unwrap();
    let b = engine.park("B", Car, 0, 0).unwrap();
    let c = engine.park("C", Car, 0, 0).unwrap();
    engine.occupy("B", Car).unwrap();
    engine.release("B", Car).unwrap();

    assert!(slot_available(&engine, b));
    assert!(!slot_available(&engine, a));
    assert!(!slot_available(&engine, c));
    assert!(engine.reservation("B").is_none());
    engine.check_invariants().unwrap();

    // Freed slot is picked again by the next scan.
    assert_eq!(engine.park("D", Car, 0, 0).unwrap(), b);
}

#[test]
fn release_errors_leave_state_untouched() {
    let (mut engine, _) = engine_with(shape(1, 1, 2, 0));
    assert_eq!(engine.release("A1", Car).unwrap_err().code(), "NotFound");
    engine.park("A1", Car, 0, 0).unwrap();
    assert_eq!(engine.release("A1", Bike).unwrap_err().code(), "TypeMismatch");
    assert!(engine.reservation("A1").is_some());
    assert!(engine.history(None).is_empty());
    assert_eq!(engine.free_total(), 1);
}

#[test]
fn release_then_park_same_plate() {
    let (mut engine, _) = engine_with(shape(1, 1, 2, 0));
    engine.park("A1", Car, 0, 0).unwrap();
    engine.release("A1", Car).unwrap();
    assert!(engine.park("A1", Car, 0, 0).is_ok());
}

// ── Cancel ───────────────────────────────────────────────

#[test]
fn cancel_pending_reservation() {
    let (mut engine, _) = engine_with(shape(1, 1, 1, 0));
    let r = engine.park("A1", Car, 0, 0).unwrap();
    let entry = engine.cancel("A1", Car).unwrap();
    assert_eq!(entry.status, HistoryStatus::Cancelled);
    assert_eq!(entry.duration_hours, 0.0);
    assert!(slot_available(&engine, r));
    assert_eq!(engine.active_count(), 0);
}

#[test]
fn cancel_occupied_rejected() {
    let (mut engine, _) = engine_with(shape(1, 1, 1, 0));
    engine.park("A1", Car, 0, 0).unwrap();
    engine.occupy("A1", Car).unwrap();
    assert_eq!(engine.cancel("A1", Car).unwrap_err().code(), "AlreadyOccupied");
    assert_eq!(engine.cancel("B1", Car).unwrap_err().code(), "NotFound");
    assert_eq!(engine.cancel("A1", Bike).unwrap_err().code(), "TypeMismatch");
    assert_eq!(engine.active_count(), 1);
}

// ── Rollback ─────────────────────────────────────────────

#[test]
fn rollback_undoes_newest_first() {
    let (mut engine, _) = engine_with(shape(1, 1, 4, 0));
    engine.park("A", Car, 0, 0).unwrap();
    engine.park("B", Car, 0, 0).unwrap();
    engine.park("C", Car, 0, 0).unwrap();

    let undone = engine.rollback(2).unwrap();
    let plates: Vec<&str> = undone.iter().map(|e| e.vehicle.as_str()).collect();
    assert_eq!(plates, vec!["C", "B"]);
    assert!(undone.iter().all(|e| e.status == HistoryStatus::RolledBack));
    assert!(engine.reservation("A").is_some());
    assert!(engine.reservation("B").is_none());
    assert_eq!(engine.free_total(), 3);
    assert_eq!(engine.pending_rollbacks(), 1);
    engine.check_invariants().unwrap();
}

#[test]
fn rollback_skips_progressed_reservations() {
    let (mut engine, _) = engine_with(shape(1, 1, 4, 0));
    engine.park("A", Car, 0, 0).unwrap();
    engine.park("B", Car, 0, 0).unwrap();
    engine.park("C", Car, 0, 0).unwrap();
    engine.occupy("C", Car).unwrap();
    engine.cancel("B", Car).unwrap();
    assert_eq!(engine.pending_rollbacks(), 1);

    let undone = engine.rollback(1).unwrap();
    assert_eq!(undone[0].vehicle, "A");
    assert_eq!(engine.reservation("C").unwrap().status, ReservationStatus::Occupied);
}

#[test]
fn rollback_is_all_or_nothing() {
    let (mut engine, _) = engine_with(shape(1, 1, 4, 0));
    engine.park("A", Car, 0, 0).unwrap();
    assert_eq!(
        engine.rollback(2).unwrap_err(),
        EngineError::RollbackUnavailable { requested: 2, available: 1 }
    );
    assert_eq!(
        engine.rollback(0).unwrap_err(),
        EngineError::RollbackUnavailable { requested: 0, available: 1 }
    );
    assert!(engine.reservation("A").is_some());
}

#[test]
fn rollback_of_reparked_plate_targets_new_reservation() {
    let (mut engine, _) = engine_with(shape(1, 1, 2, 0));
    engine.park("A", Car, 0, 0).unwrap();
    engine.release("A", Car).unwrap();
    engine.park("A", Car, 0, 0).unwrap();
    assert_eq!(engine.pending_rollbacks(), 1);
    engine.rollback(1).unwrap();
    assert!(engine.reservation("A").is_none());
}

// ── Queries ──────────────────────────────────────────────

#[test]
fn status_reflects_slot_states() {
    let (mut engine, _) = engine_with(shape(2, 2, 1, 1));
    let r = engine.park("A", Car, 2, 2).unwrap();
    engine.park("B", Bike, 1, 1).unwrap();
    engine.occupy("B", Bike).unwrap();

    let zones = engine.status();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].free, 3);
    assert_eq!(zones[1].free, 3);
    assert_eq!(zones[0].areas[0].free, 1);
    assert!(!zones[0].areas[0].slots[1].is_available);
    assert_eq!(zones[0].areas[0].slots[1].class, Bike);

    let taken = &zones[1].areas[1].slots[r.index as usize];
    assert!(!taken.is_available);
    assert_eq!(taken.id, 7);

    engine.release("A", Car).unwrap();
    assert!(engine.status()[1].areas[1].slots[0].is_available);
}

#[test]
fn status_available_iff_no_active_record() {
    let (mut engine, _) = engine_with(shape(2, 3, 3, 2));
    for i in 0..20 {
        let class = if i % 4 == 0 { Bike } else { Car };
        let _ = engine.park(&format!("V{i}"), class, 0, 0);
    }
    for i in (0..20).step_by(3) {
        let class = if i % 4 == 0 { Bike } else { Car };
        let _ = engine.release(&format!("V{i}"), class);
    }
    let taken: std::collections::HashSet<u32> = engine
        .ledger()
        .iter()
        .map(|r| engine.hierarchy().slot(r.slot).unwrap().global_id)
        .collect();
    for zone in engine.status() {
        for area in zone.areas {
            for s in area.slots {
                assert_eq!(s.is_available, !taken.contains(&s.id));
            }
        }
    }
}

#[test]
fn free_counts() {
    let (mut engine, _) = engine_with(shape(2, 2, 2, 0));
    engine.park("A", Car, 1, 2).unwrap();
    engine.park("B", Car, 2, 1).unwrap();
    assert_eq!(engine.free_in_area(1, 2), 1);
    assert_eq!(engine.free_in_zone(1), 3);
    assert_eq!(engine.free_in_zone(2), 3);
    assert_eq!(engine.free_total(), 6);
}

#[test]
fn history_only_records_closed_lifecycles() {
    let (mut engine, _) = engine_with(shape(1, 1, 4, 0));
    engine.park("A", Car, 0, 0).unwrap();
    engine.park("B", Car, 0, 0).unwrap();
    engine.occupy("A", Car).unwrap();
    assert!(engine.history(None).is_empty());

    engine.release("A", Car).unwrap();
    engine.cancel("B", Car).unwrap();
    let history = engine.history(None);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].vehicle, "B");
    assert_eq!(history[0].status, HistoryStatus::Cancelled);
    assert_eq!(history[1].vehicle, "A");
    assert!(history[0].id > history[1].id);
    assert_eq!(engine.history(Some(1)).len(), 1);
}

#[test]
fn history_is_bounded() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut engine = Engine::new(shape(1, 1, 1, 0), 3, clock).unwrap();
    for i in 0..10 {
        let plate = format!("V{i}");
        engine.park(&plate, Car, 0, 0).unwrap();
        engine.release(&plate, Car).unwrap();
    }
    let history = engine.history(None);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].vehicle, "V9");
    assert_eq!(history[0].id, 10);
}

// ── Invariants ───────────────────────────────────────────

#[test]
fn invariants_hold_over_mixed_sequence() {
    let (mut engine, clock) = engine_with(shape(2, 2, 3, 2));
    for round in 0..5u32 {
        for i in 0..12u32 {
            let plate = format!("R{round}-{i}");
            let class = if i % 3 == 0 { Bike } else { Car };
            let _ = engine.park(&plate, class, i % 3, i % 2);
            clock.advance(30);
            if i % 2 == 0 {
                let _ = engine.occupy(&plate, class);
            }
            engine.check_invariants().unwrap();
        }
        for i in 0..12u32 {
            let plate = format!("R{round}-{i}");
            let class = if i % 3 == 0 { Bike } else { Car };
            match i % 4 {
                0 | 1 => {
                    let _ = engine.release(&plate, class);
                }
                2 => {
                    let _ = engine.cancel(&plate, class);
                }
                _ => {}
            }
            engine.check_invariants().unwrap();
        }
        let _ = engine.rollback(1);
        engine.check_invariants().unwrap();
    }
    let plates: std::collections::HashSet<&str> =
        engine.ledger().iter().map(|r| r.plate.as_str()).collect();
    assert_eq!(plates.len(), engine.active_count());
}

#[test]
fn check_invariants_detects_dangling_slot() {
    let (mut engine, _) = engine_with(shape(1, 1, 2, 0));
    engine.park("A", Car, 0, 0).unwrap();
    let slot = engine.hierarchy.slot_mut(1).unwrap();
    slot.state = SlotState::Occupied;
    slot.occupant = Some("ghost".into());
    assert!(matches!(engine.check_invariants(), Err(EngineError::Internal(_))));
}

#[test]
fn check_invariants_detects_state_disagreement() {
    let (mut engine, _) = engine_with(shape(1, 1, 2, 0));
    engine.park("A", Car, 0, 0).unwrap();
    engine.hierarchy.slot_mut(0).unwrap().state = SlotState::Occupied;
    assert!(matches!(engine.check_invariants(), Err(EngineError::Internal(_))));
}

// ── End-to-end ───────────────────────────────────────────

#[test]
fn two_car_slots_no_bike_slots_scenario() {
    let (mut engine, clock) = engine_with(shape(1, 1, 2, 0));
    assert_eq!(engine.park("A1", Car, 1, 1).unwrap(), slot(1, 1, 0));
    assert_eq!(engine.park("B2", Bike, 1, 1).unwrap_err().code(), "NoAvailableSlot");
    assert_eq!(engine.free_total(), 1);
    engine.occupy("A1", Car).unwrap();
    clock.advance(H);
    engine.release("A1", Car).unwrap();

    let history = engine.history(None);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, HistoryStatus::Released);
    assert_eq!(history[0].vehicle, "A1");
    assert_eq!(history[0].duration_hours, 1.0);
}
