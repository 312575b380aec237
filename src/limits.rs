/// Longest accepted licence plate, in bytes.
pub const MAX_PLATE_LEN: usize = 32;

/// Longest accepted command line, in bytes (excluding the newline).
pub const MAX_LINE_LEN: usize = 256;

/// Default number of history entries kept in memory.
pub const DEFAULT_HISTORY_CAP: usize = 200;

/// Upper bound for a configured history cap.
pub const MAX_HISTORY_CAP: usize = 100_000;

/// Pending reservations remembered for ROLLBACK.
pub const MAX_ROLLBACK_DEPTH: usize = 1_000;

/// Upper bound on slots across the whole hierarchy.
pub const MAX_TOTAL_SLOTS: usize = 1_000_000;
