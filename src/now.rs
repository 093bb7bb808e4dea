//! Unix timestamps for login times and record updates.
//!
//! Under test the clock is frozen at its first read, so timestamps taken in
//! different places of one test agree. Login times still move forward, see
//! `UserRecord::next_login_time`.

use chrono::Utc;

#[cfg(test)]
static FROZEN_TIME: once_cell::sync::Lazy<u64> = once_cell::sync::Lazy::new(system_timestamp);

#[cfg(test)]
pub fn current_timestamp() -> u64 {
    *FROZEN_TIME
}

#[cfg(not(test))]
pub fn current_timestamp() -> u64 {
    system_timestamp()
}

fn system_timestamp() -> u64 {
    // Clocks set before 1970 are clamped instead of wrapping
    Utc::now().timestamp().max(0) as u64
}
