/// Longest free-text note accepted on a reservation, in bytes.
pub const MAX_NOTES_LEN: usize = 1024;

/// Reservations (of any status) a single court ledger may hold.
pub const MAX_RESERVATIONS_PER_COURT: usize = 100_000;

/// Capacity of the group-commit channel feeding the WAL writer.
pub const WAL_CHANNEL_CAPACITY: usize = 4096;

/// Per-court broadcast buffer for the change feed.
pub const NOTIFY_CHANNEL_CAPACITY: usize = 256;
