//! Metric names. The crate records through the `metrics` facade only; the
//! embedding process installs whatever recorder/exporter it wants.

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservations booked.
pub const RESERVATIONS_BOOKED_TOTAL: &str = "lessor_reservations_booked_total";

/// Counter: reservations extended.
pub const RESERVATIONS_EXTENDED_TOTAL: &str = "lessor_reservations_extended_total";

/// Counter: reservations cancelled.
pub const RESERVATIONS_CANCELLED_TOTAL: &str = "lessor_reservations_cancelled_total";

/// Counter: reservations transferred between devices.
pub const RESERVATIONS_TRANSFERRED_TOTAL: &str = "lessor_reservations_transferred_total";

/// Counter: booking attempts rejected by an interval conflict.
pub const RESERVATION_CONFLICTS_TOTAL: &str = "lessor_reservation_conflicts_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: devices currently in the registry.
pub const DEVICES_ACTIVE: &str = "lessor_devices_active";
