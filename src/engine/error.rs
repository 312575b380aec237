use crate::model::VehicleClass;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    DuplicateRequest(String),
    NoAvailableSlot {
        class: VehicleClass,
        zone: Option<u32>,
        area: Option<u32>,
    },
    NotFound(String),
    TypeMismatch {
        plate: String,
        expected: VehicleClass,
        got: VehicleClass,
    },
    AlreadyOccupied(String),
    UnknownZone(u32),
    UnknownArea {
        zone: u32,
        area: u32,
    },
    RollbackUnavailable {
        requested: usize,
        available: usize,
    },
    LimitExceeded(&'static str),
    /// Slot and ledger disagree. Never produced by a consistent engine.
    Internal(String),
}

impl EngineError {
    /// Stable tag reported to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::DuplicateRequest(_) => "DuplicateRequest",
            EngineError::NoAvailableSlot { .. } => "NoAvailableSlot",
            EngineError::NotFound(_) => "NotFound",
            EngineError::TypeMismatch { .. } => "TypeMismatch",
            EngineError::AlreadyOccupied(_) => "AlreadyOccupied",
            EngineError::UnknownZone(_) => "UnknownZone",
            EngineError::UnknownArea { .. } => "UnknownArea",
            EngineError::RollbackUnavailable { .. } => "RollbackUnavailable",
            EngineError::LimitExceeded(_) => "LimitExceeded",
            EngineError::Internal(_) => "Internal",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::DuplicateRequest(plate) => {
                write!(f, "vehicle {plate} already has an active reservation")
            }
            EngineError::NoAvailableSlot { class, zone, area } => {
                write!(f, "no free {class} slot")?;
                match (zone, area) {
                    (Some(z), Some(a)) => write!(f, " in zone {z} area {a}"),
                    (Some(z), None) => write!(f, " in zone {z}"),
                    (None, Some(a)) => write!(f, " in area {a} of any zone"),
                    (None, None) => write!(f, " in any zone"),
                }
            }
            EngineError::NotFound(plate) => write!(f, "no active reservation for vehicle {plate}"),
            EngineError::TypeMismatch { plate, expected, got } => {
                write!(f, "vehicle {plate} is registered as {expected}, not {got}")
            }
            EngineError::AlreadyOccupied(plate) => {
                write!(f, "vehicle {plate} already occupies its slot")
            }
            EngineError::UnknownZone(z) => {
                write!(f, "zone {z} does not exist; the search scope has no slots")
            }
            EngineError::UnknownArea { zone, area } => write!(
                f,
                "area {area} does not exist in zone {zone}; the search scope has no slots"
            ),
            EngineError::RollbackUnavailable { requested, available } => write!(
                f,
                "cannot roll back {requested} reservation(s): {available} pending"
            ),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
