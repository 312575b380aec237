use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{Engine, EngineError, PendingPark};

fn validate_plate(plate: &str) -> Result<(), EngineError> {
    if plate.is_empty() {
        return Err(EngineError::LimitExceeded("plate is empty"));
    }
    if plate.len() > MAX_PLATE_LEN {
        return Err(EngineError::LimitExceeded("plate too long"));
    }
    Ok(())
}

impl Engine {
    /// Reserve the first free slot matching `class`, scanning zones, then
    /// areas, then slots in ascending order. A hint of 0 means any.
    pub fn park(
        &mut self,
        plate: &str,
        class: VehicleClass,
        zone_hint: u32,
        area_hint: u32,
    ) -> Result<SlotRef, EngineError> {
        validate_plate(plate)?;
        if self.ledger.contains(plate) {
            return Err(EngineError::DuplicateRequest(plate.to_string()));
        }

        let zones: Vec<u32> = if zone_hint > 0 {
            if self.hierarchy.zone(zone_hint).is_none() {
                return Err(EngineError::UnknownZone(zone_hint));
            }
            vec![zone_hint]
        } else {
            self.hierarchy.zones().iter().map(|z| z.id).collect()
        };
        let area = (area_hint > 0).then_some(area_hint);
        if let Some(a) = area {
            // Every zone has the same areas, so checking the first is enough.
            let first = zones[0];
            if self.hierarchy.area(first, a).is_none() {
                return Err(EngineError::UnknownArea { zone: first, area: a });
            }
        }

        let found = zones.iter().find_map(|&z| {
            self.hierarchy
                .slots_in_zone(z, area)
                .find(|(_, slot)| slot.is_available() && slot.class == class)
                .map(|(idx, slot)| (idx, slot.slot_ref))
        });
        let Some((idx, slot_ref)) = found else {
            debug!("park {plate}: no free {class} slot (zone hint {zone_hint}, area hint {area_hint})");
            return Err(EngineError::NoAvailableSlot {
                class,
                zone: (zone_hint > 0).then_some(zone_hint),
                area,
            });
        };

        let record = Reservation {
            id: Ulid::new(),
            plate: plate.to_string(),
            class,
            slot: idx,
            slot_ref,
            request_time: self.now(),
            occupy_time: None,
            release_time: None,
            status: ReservationStatus::Requested,
        };
        let reservation_id = record.id;
        self.ledger.insert(record);
        if let Some(slot) = self.hierarchy.slot_mut(idx) {
            slot.state = SlotState::Reserved;
            slot.occupant = Some(plate.to_string());
        }

        if self.pending.len() == MAX_ROLLBACK_DEPTH {
            self.pending.pop_front();
        }
        self.pending.push_back(PendingPark {
            plate: plate.to_string(),
            reservation_id,
        });

        info!("reserved slot {slot_ref} for {class} {plate}");
        Ok(slot_ref)
    }

    /// Confirm arrival on a reserved slot.
    pub fn occupy(&mut self, plate: &str, class: VehicleClass) -> Result<SlotRef, EngineError> {
        let record = self.lookup(plate, class)?;
        if record.status == ReservationStatus::Occupied {
            return Err(EngineError::AlreadyOccupied(plate.to_string()));
        }
        self.check_link(record)?;
        let (idx, slot_ref, reservation_id) = (record.slot, record.slot_ref, record.id);

        let now = self.now();
        if let Some(record) = self.ledger.get_mut(plate) {
            record.status = ReservationStatus::Occupied;
            record.occupy_time = Some(now);
        }
        if let Some(slot) = self.hierarchy.slot_mut(idx) {
            slot.state = SlotState::Occupied;
        }
        self.forget_pending(reservation_id);

        info!("{class} {plate} occupied slot {slot_ref}");
        Ok(slot_ref)
    }

    /// End a lifecycle, occupied or merely reserved, and free its slot.
    pub fn release(&mut self, plate: &str, class: VehicleClass) -> Result<HistoryEntry, EngineError> {
        let record = self.lookup(plate, class)?;
        self.check_link(record)?;
        let entry = self.close(plate, HistoryStatus::Released)?;
        info!(
            "{class} {plate} released slot {}-{}-{} after {:.2}h",
            entry.zone, entry.area, entry.slot, entry.duration_hours
        );
        Ok(entry)
    }

    /// Withdraw a reservation that was never occupied.
    pub fn cancel(&mut self, plate: &str, class: VehicleClass) -> Result<HistoryEntry, EngineError> {
        let record = self.lookup(plate, class)?;
        if record.status == ReservationStatus::Occupied {
            return Err(EngineError::AlreadyOccupied(plate.to_string()));
        }
        self.check_link(record)?;
        let entry = self.close(plate, HistoryStatus::Cancelled)?;
        info!("{class} {plate} cancelled reservation of slot {}-{}-{}", entry.zone, entry.area, entry.slot);
        Ok(entry)
    }

    /// Undo the `k` most recent reservations that are still pending, newest
    /// first. Either all `k` are undone or none are.
    pub fn rollback(&mut self, k: usize) -> Result<Vec<HistoryEntry>, EngineError> {
        let available = self.pending.len();
        if k == 0 || k > available {
            return Err(EngineError::RollbackUnavailable { requested: k, available });
        }

        // Validate the whole batch before touching anything.
        for p in self.pending.iter().rev().take(k) {
            let record = self
                .ledger
                .get(&p.plate)
                .filter(|r| r.id == p.reservation_id && r.status == ReservationStatus::Requested)
                .ok_or_else(|| {
                    super::corrupt(format!("pending reservation of {} is no longer active", p.plate))
                })?;
            self.check_link(record)?;
        }

        let mut undone = Vec::with_capacity(k);
        for _ in 0..k {
            let Some(p) = self.pending.pop_back() else { break };
            let entry = self.close(&p.plate, HistoryStatus::RolledBack)?;
            info!("rolled back reservation of slot {}-{}-{} for {}", entry.zone, entry.area, entry.slot, p.plate);
            undone.push(entry);
        }
        Ok(undone)
    }

    /// Active record for `plate`, checked against the caller's vehicle class.
    fn lookup(&self, plate: &str, class: VehicleClass) -> Result<&Reservation, EngineError> {
        let record = self
            .ledger
            .get(plate)
            .ok_or_else(|| EngineError::NotFound(plate.to_string()))?;
        if record.class != class {
            return Err(EngineError::TypeMismatch {
                plate: plate.to_string(),
                expected: record.class,
                got: class,
            });
        }
        Ok(record)
    }

    /// Remove a linked record from the ledger, free its slot, and log it.
    /// Callers have already verified the link.
    fn close(&mut self, plate: &str, status: HistoryStatus) -> Result<HistoryEntry, EngineError> {
        let mut record = self
            .ledger
            .remove(plate)
            .ok_or_else(|| EngineError::NotFound(plate.to_string()))?;
        record.release_time = Some(self.now());
        record.status = ReservationStatus::Released;
        if let Some(slot) = self.hierarchy.slot_mut(record.slot) {
            slot.state = SlotState::Free;
            slot.occupant = None;
        }
        self.forget_pending(record.id);
        Ok(self.history.append(&record, status).clone())
    }

    fn forget_pending(&mut self, reservation_id: Ulid) {
        self.pending.retain(|p| p.reservation_id != reservation_id);
    }
}
