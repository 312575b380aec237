mod error;
mod mutations;
mod queries;
#[cfg(test)]
mod tests;

pub use error::EngineError;
pub use queries::{AreaStatus, SlotStatus, ZoneStatus};

use std::collections::VecDeque;
use std::sync::Arc;

use ulid::Ulid;

use crate::clock::Clock;
use crate::hierarchy::{Hierarchy, HierarchyShape, ShapeError};
use crate::history::HistoryLog;
use crate::ledger::Ledger;
use crate::model::*;

/// A pending reservation that ROLLBACK may still undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct PendingPark {
    pub plate: String,
    pub reservation_id: Ulid,
}

/// Owns slot state, the active ledger, and the history log. Every
/// transition goes through `&mut self`, so a single owner serializes them.
pub struct Engine {
    pub(super) hierarchy: Hierarchy,
    pub(super) ledger: Ledger,
    pub(super) history: HistoryLog,
    /// Most recent pending reservation at the back.
    pub(super) pending: VecDeque<PendingPark>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(
        shape: HierarchyShape,
        history_cap: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ShapeError> {
        Ok(Self {
            hierarchy: Hierarchy::new(shape)?,
            ledger: Ledger::new(),
            history: HistoryLog::new(history_cap),
            pending: VecDeque::new(),
            clock,
        })
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn active_count(&self) -> usize {
        self.ledger.len()
    }

    pub(super) fn now(&self) -> Secs {
        self.clock.now()
    }

    /// Describe how `record`'s slot fails to point back at it, if it does.
    fn link_error(&self, record: &Reservation) -> Option<String> {
        let Some(slot) = self.hierarchy.slot(record.slot) else {
            return Some(format!("record {} points at missing slot {}", record.plate, record.slot));
        };
        let expected = match record.status {
            ReservationStatus::Requested => SlotState::Reserved,
            ReservationStatus::Occupied => SlotState::Occupied,
            ReservationStatus::Released => SlotState::Free,
        };
        if slot.occupant.as_deref() != Some(record.plate.as_str()) || slot.state != expected {
            return Some(format!(
                "slot {} ({:?}, occupant {:?}) disagrees with record {} ({:?})",
                slot.slot_ref, slot.state, slot.occupant, record.plate, record.status
            ));
        }
        None
    }

    /// Checked before every transition touches a record's slot.
    pub(super) fn check_link(&self, record: &Reservation) -> Result<(), EngineError> {
        match self.link_error(record) {
            Some(msg) => Err(corrupt(msg)),
            None => Ok(()),
        }
    }

    /// Full cross-check of slots against the ledger.
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        for record in self.ledger.iter() {
            if let Some(msg) = self.link_error(record) {
                return Err(EngineError::Internal(msg));
            }
        }
        for (_, slot) in self.hierarchy.all_slots() {
            match (&slot.occupant, slot.state) {
                (None, SlotState::Free) => {}
                (Some(plate), SlotState::Reserved | SlotState::Occupied) => {
                    if self.ledger.get(plate).map(|r| r.slot_ref) != Some(slot.slot_ref) {
                        return Err(EngineError::Internal(format!(
                            "slot {} names {plate} but the ledger does not point back",
                            slot.slot_ref
                        )));
                    }
                }
                (occupant, state) => {
                    return Err(EngineError::Internal(format!(
                        "slot {} is {state:?} with occupant {occupant:?}",
                        slot.slot_ref
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Invariant violation: fatal in debug builds, an `Internal` error otherwise.
fn corrupt(msg: String) -> EngineError {
    tracing::error!("engine invariant violated: {msg}");
    debug_assert!(false, "engine invariant violated: {msg}");
    EngineError::Internal(msg)
}
