use std::collections::VecDeque;

use crate::limits::MAX_HISTORY_CAP;
use crate::model::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

/// Append-only lifecycle log. Keeps the last `cap` entries; ids keep
/// counting across evictions.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    cap: usize,
    next_id: u64,
}

impl HistoryLog {
    /// `cap` is clamped to `1..=MAX_HISTORY_CAP`.
    pub fn new(cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_HISTORY_CAP);
        Self {
            entries: VecDeque::with_capacity(cap),
            cap,
            next_id: 1,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot a closed lifecycle. Evicts the oldest entry when full.
    pub fn append(&mut self, record: &Reservation, status: HistoryStatus) -> &HistoryEntry {
        if self.entries.len() == self.cap {
            self.entries.pop_front();
        }
        let entry = HistoryEntry {
            id: self.next_id,
            vehicle: record.plate.clone(),
            class: record.class,
            zone: record.slot_ref.zone,
            area: record.slot_ref.area,
            slot: record.slot_ref.index,
            status,
            request_time: record.request_time,
            occupy_time: record.occupy_time,
            release_time: record.release_time,
            duration_hours: record.duration_hours(),
        };
        self.next_id += 1;
        self.entries.push_back(entry);
        // Just pushed; never empty here.
        &self.entries[self.entries.len() - 1]
    }

    pub fn query(&self, limit: Option<usize>, order: Order) -> Vec<HistoryEntry> {
        let limit = limit.unwrap_or(self.cap);
        match order {
            Order::NewestFirst => self.entries.iter().rev().take(limit).cloned().collect(),
            Order::OldestFirst => self.entries.iter().take(limit).cloned().collect(),
        }
    }
}
