use std::collections::HashMap;

use crate::model::Reservation;

/// Active reservations keyed by plate. At most one record per plate.
#[derive(Debug, Default)]
pub struct Ledger {
    active: HashMap<String, Reservation>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, plate: &str) -> bool {
        self.active.contains_key(plate)
    }

    pub fn get(&self, plate: &str) -> Option<&Reservation> {
        self.active.get(plate)
    }

    pub(crate) fn get_mut(&mut self, plate: &str) -> Option<&mut Reservation> {
        self.active.get_mut(plate)
    }

    /// Insert a new record. Returns false (and leaves the ledger untouched)
    /// if the plate already has one.
    pub(crate) fn insert(&mut self, record: Reservation) -> bool {
        if self.active.contains_key(&record.plate) {
            return false;
        }
        self.active.insert(record.plate.clone(), record);
        true
    }

    pub(crate) fn remove(&mut self, plate: &str) -> Option<Reservation> {
        self.active.remove(plate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.active.values()
    }
}
