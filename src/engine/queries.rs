use serde::Serialize;

use crate::history::Order;
use crate::model::*;

use super::Engine;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatus {
    pub id: u32,
    #[serde(rename = "type")]
    pub class: VehicleClass,
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaStatus {
    pub id: u32,
    pub name: String,
    pub free: usize,
    pub slots: Vec<SlotStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStatus {
    pub id: u32,
    pub name: String,
    pub free: usize,
    pub areas: Vec<AreaStatus>,
}

impl Engine {
    /// Projection of every zone, area, and slot. Read-only.
    pub fn status(&self) -> Vec<ZoneStatus> {
        self.hierarchy
            .zones()
            .iter()
            .map(|zone| {
                let areas: Vec<AreaStatus> = zone
                    .areas
                    .iter()
                    .map(|area| {
                        let slots: Vec<SlotStatus> = area
                            .slot_indices()
                            .filter_map(|idx| self.hierarchy.slot(idx))
                            .map(|slot| SlotStatus {
                                id: slot.global_id,
                                class: slot.class,
                                is_available: slot.is_available(),
                            })
                            .collect();
                        AreaStatus {
                            id: area.id,
                            name: area.name.clone(),
                            free: slots.iter().filter(|s| s.is_available).count(),
                            slots,
                        }
                    })
                    .collect();
                ZoneStatus {
                    id: zone.id,
                    name: zone.name.clone(),
                    free: areas.iter().map(|a| a.free).sum(),
                    areas,
                }
            })
            .collect()
    }

    /// Most recent lifecycles first, at most `limit` (default: the log's cap).
    pub fn history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        self.history.query(limit, Order::NewestFirst)
    }

    pub fn history_cap(&self) -> usize {
        self.history.cap()
    }

    /// Copy of the active record for `plate`.
    pub fn reservation(&self, plate: &str) -> Option<Reservation> {
        self.ledger.get(plate).cloned()
    }

    pub fn pending_rollbacks(&self) -> usize {
        self.pending.len()
    }

    pub fn free_in_zone(&self, zone: u32) -> usize {
        self.hierarchy.free_in_zone(zone)
    }

    pub fn free_in_area(&self, zone: u32, area: u32) -> usize {
        self.hierarchy.free_in_area(zone, area)
    }

    pub fn free_total(&self) -> usize {
        self.hierarchy.free_total()
    }
}
