//! Platform constants and default configuration values

/// Tokens granted to every newly registered player account
pub const STARTING_GRANT_TOKENS: i64 = 50;

/// Minimum amount a withdrawal request may ask for
pub const MIN_WITHDRAWAL_TOKENS: i64 = 50;

/// Upper bound for a single payment or withdrawal request
pub const MAX_REQUEST_TOKENS: i64 = 100_000;

/// Service fee percentage charged on withdrawals
pub const WITHDRAWAL_FEE_PERCENT: i64 = 2;

/// Floor for the withdrawal service fee
pub const MIN_WITHDRAWAL_FEE: i64 = 5;

/// Match modes a tournament can be created with
pub const TOURNAMENT_MODES: [&str; 2] = ["1v1", "squad"];

/// Broadcast channel capacity for the realtime event feed
pub const BROADCAST_CHANNEL_CAPACITY: usize = 100;
