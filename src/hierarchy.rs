use std::ops::Range;

use crate::limits::MAX_TOTAL_SLOTS;
use crate::model::*;

/// Cardinality of the zone/area/slot tree, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyShape {
    pub zones: u32,
    pub areas_per_zone: u32,
    /// Leading slots of each area accept cars.
    pub car_slots_per_area: u32,
    /// Trailing slots of each area accept bikes.
    pub bike_slots_per_area: u32,
}

impl HierarchyShape {
    /// Widened so any pair of `u32` counts adds without overflow.
    pub fn slots_per_area(&self) -> u64 {
        u64::from(self.car_slots_per_area) + u64::from(self.bike_slots_per_area)
    }

    /// Exact for every `u32` shape; compare against `MAX_TOTAL_SLOTS` before
    /// narrowing.
    pub fn total_slots(&self) -> u128 {
        u128::from(self.zones) * u128::from(self.areas_per_zone) * u128::from(self.slots_per_area())
    }
}

impl Default for HierarchyShape {
    /// 15 zones × 3 areas × 20 slots (15 car + 5 bike).
    fn default() -> Self {
        Self {
            zones: 15,
            areas_per_zone: 3,
            car_slots_per_area: 15,
            bike_slots_per_area: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Empty(&'static str),
    TooLarge(u128),
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeError::Empty(what) => write!(f, "hierarchy has no {what}"),
            ShapeError::TooLarge(n) => {
                write!(f, "hierarchy has {n} slots, limit is {MAX_TOTAL_SLOTS}")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

#[derive(Debug, Clone)]
pub struct Slot {
    /// 1-based, unique across the hierarchy.
    pub global_id: u32,
    pub slot_ref: SlotRef,
    pub class: VehicleClass,
    pub state: SlotState,
    /// Plate of the linked ledger record.
    pub occupant: Option<String>,
}

impl Slot {
    pub fn is_available(&self) -> bool {
        self.state == SlotState::Free
    }
}

#[derive(Debug, Clone)]
pub struct Area {
    pub id: u32,
    pub zone_id: u32,
    pub name: String,
    /// Arena range of this area's slots, in display order.
    slots: Range<usize>,
}

impl Area {
    pub fn slot_indices(&self) -> Range<usize> {
        self.slots.clone()
    }
}

#[derive(Debug, Clone)]
pub struct Zone {
    pub id: u32,
    pub name: String,
    pub areas: Vec<Area>,
}

impl Zone {
    pub fn area(&self, area_id: u32) -> Option<&Area> {
        // Areas are dense and 1-based.
        let idx = (area_id as usize).checked_sub(1)?;
        self.areas.get(idx)
    }

    pub fn slot_indices(&self) -> Range<usize> {
        match (self.areas.first(), self.areas.last()) {
            (Some(first), Some(last)) => first.slots.start..last.slots.end,
            _ => 0..0,
        }
    }
}

/// Static Zone → Area → Slot tree. Slots live in one arena; zones and
/// areas refer to them by index range. Nodes are never added or removed
/// after construction; only slot state changes.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    zones: Vec<Zone>,
    slots: Vec<Slot>,
}

impl Hierarchy {
    pub fn new(shape: HierarchyShape) -> Result<Self, ShapeError> {
        if shape.zones == 0 {
            return Err(ShapeError::Empty("zones"));
        }
        if shape.areas_per_zone == 0 {
            return Err(ShapeError::Empty("areas"));
        }
        if shape.slots_per_area() == 0 {
            return Err(ShapeError::Empty("slots"));
        }
        let total = shape.total_slots();
        if total > MAX_TOTAL_SLOTS as u128 {
            return Err(ShapeError::TooLarge(total));
        }
        // Both fit: every factor is at most `total`.
        let capacity = usize::try_from(total).map_err(|_| ShapeError::TooLarge(total))?;
        let per_area = u32::try_from(shape.slots_per_area()).map_err(|_| ShapeError::TooLarge(total))?;

        let mut slots = Vec::with_capacity(capacity);
        let mut zones = Vec::with_capacity(shape.zones as usize);
        for z in 1..=shape.zones {
            let mut areas = Vec::with_capacity(shape.areas_per_zone as usize);
            for a in 1..=shape.areas_per_zone {
                let start = slots.len();
                for i in 0..per_area {
                    let class = if i < shape.car_slots_per_area {
                        VehicleClass::Car
                    } else {
                        VehicleClass::Bike
                    };
                    slots.push(Slot {
                        global_id: slots.len() as u32 + 1,
                        slot_ref: SlotRef { zone: z, area: a, index: i },
                        class,
                        state: SlotState::Free,
                        occupant: None,
                    });
                }
                areas.push(Area {
                    id: a,
                    zone_id: z,
                    name: format!("Area-{a}"),
                    slots: start..slots.len(),
                });
            }
            zones.push(Zone {
                id: z,
                name: format!("Zone-{z}"),
                areas,
            });
        }

        Ok(Self { zones, slots })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, zone_id: u32) -> Option<&Zone> {
        let idx = (zone_id as usize).checked_sub(1)?;
        self.zones.get(idx)
    }

    pub fn area(&self, zone_id: u32, area_id: u32) -> Option<&Area> {
        self.zone(zone_id)?.area(area_id)
    }

    pub fn slot(&self, idx: usize) -> Option<&Slot> {
        self.slots.get(idx)
    }

    pub(crate) fn slot_mut(&mut self, idx: usize) -> Option<&mut Slot> {
        self.slots.get_mut(idx)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Arena index of a slot by its position, if it exists.
    pub fn index_of(&self, slot_ref: SlotRef) -> Option<usize> {
        let area = self.area(slot_ref.zone, slot_ref.area)?;
        let idx = area.slots.start + slot_ref.index as usize;
        area.slots.contains(&idx).then_some(idx)
    }

    /// Slots of a zone, optionally restricted to one area, in scan order.
    pub fn slots_in_zone(
        &self,
        zone_id: u32,
        area_id: Option<u32>,
    ) -> impl Iterator<Item = (usize, &Slot)> {
        let range = match (self.zone(zone_id), area_id) {
            (Some(zone), None) => zone.slot_indices(),
            (Some(zone), Some(a)) => zone.area(a).map(Area::slot_indices).unwrap_or(0..0),
            (None, _) => 0..0,
        };
        self.slots[range.clone()]
            .iter()
            .enumerate()
            .map(move |(offset, slot)| (range.start + offset, slot))
    }

    pub fn all_slots(&self) -> impl Iterator<Item = (usize, &Slot)> {
        self.slots.iter().enumerate()
    }

    pub fn free_in_area(&self, zone_id: u32, area_id: u32) -> usize {
        self.slots_in_zone(zone_id, Some(area_id))
            .filter(|(_, s)| s.is_available())
            .count()
    }

    pub fn free_in_zone(&self, zone_id: u32) -> usize {
        self.slots_in_zone(zone_id, None)
            .filter(|(_, s)| s.is_available())
            .count()
    }

    pub fn free_total(&self) -> usize {
        self.slots.iter().filter(|s| s.is_available()).count()
    }
}
