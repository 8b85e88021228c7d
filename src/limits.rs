//! Engine limits, enforced as `LimitExceeded` rejections.

use crate::model::{DAY_MS, Ms};

/// Maximum devices in the registry.
pub const MAX_DEVICES: usize = 100_000;

/// Maximum reservations on a single device's schedule.
pub const MAX_RESERVATIONS_PER_DEVICE: usize = 100_000;

/// Timestamps must be non-negative.
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;

/// Timestamps must fall before the year 3000.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 32_503_680_000_000;

/// Maximum duration units per reservation (any term unit).
pub const MAX_DURATION_UNITS: u32 = 10_000;

/// Maximum length of a single feedback entry, in bytes.
pub const MAX_FEEDBACK_LEN: usize = 4_096;

/// Cancellation must happen at least this long before the start date.
pub const MIN_CANCEL_NOTICE_MS: Ms = 2 * DAY_MS;

/// Canonical discount rate for resident customers.
pub const RESIDENT_DISCOUNT: f64 = 0.25;
