use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix seconds.
pub type Secs = i64;

/// Vehicle class a slot accepts. Fixed per slot at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    Car,
    Bike,
}

impl VehicleClass {
    /// Wire encoding: 1 = Car, 2 = Bike.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(VehicleClass::Car),
            2 => Some(VehicleClass::Bike),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            VehicleClass::Car => 1,
            VehicleClass::Bike => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleClass::Car => "Car",
            VehicleClass::Bike => "Bike",
        }
    }
}

impl std::fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    Free,
    Reserved,
    Occupied,
}

/// Position of a slot in the hierarchy. Zone and area ids are 1-based,
/// `index` is the 0-based position inside its area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub zone: u32,
    pub area: u32,
    pub index: u32,
}

impl std::fmt::Display for SlotRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.zone, self.area, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Requested,
    Occupied,
    Released,
}

/// Active record in the occupancy ledger, keyed by plate.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: Ulid,
    pub plate: String,
    pub class: VehicleClass,
    /// Arena index of the assigned slot (non-owning).
    pub slot: usize,
    pub slot_ref: SlotRef,
    pub request_time: Secs,
    pub occupy_time: Option<Secs>,
    pub release_time: Option<Secs>,
    pub status: ReservationStatus,
}

impl Reservation {
    /// Hours between occupy and release; 0 when never occupied or not yet released.
    pub fn duration_hours(&self) -> f64 {
        match (self.occupy_time, self.release_time) {
            (Some(occupied), Some(released)) => (released - occupied) as f64 / 3600.0,
            _ => 0.0,
        }
    }
}

/// How a lifecycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryStatus {
    Released,
    Cancelled,
    RolledBack,
}

/// Immutable audit record appended when a reservation leaves the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub vehicle: String,
    #[serde(rename = "type")]
    pub class: VehicleClass,
    pub zone: u32,
    pub area: u32,
    pub slot: u32,
    pub status: HistoryStatus,
    pub request_time: Secs,
    pub occupy_time: Option<Secs>,
    pub release_time: Option<Secs>,
    pub duration_hours: f64,
}
