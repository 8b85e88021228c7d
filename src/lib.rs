//! Reservation scheduling and availability engine for a pool of leasable
//! network devices.
//!
//! The engine owns the device registry, per-device interval calendars, and
//! the reservation table, and exposes booking, extension, cancellation, and
//! transfer with typed rejections. Fees are derived from the reservation's
//! term by a pure pricing function. Persistence is the caller's job: the
//! engine emits and accepts a plain [`model::SystemState`] record, and
//! [`snapshot::SnapshotStore`] keeps one durably on disk.

pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod snapshot;

pub use engine::{Engine, EngineError, compute_fee, discount_for_resident};
pub use model::{
    ClassTag, Device, DeviceId, Invoice, Ms, Reservation, ReservationId, Span, SystemState,
    TermUnit,
};
pub use snapshot::SnapshotStore;
