mod calendar;
mod error;
mod mutations;
mod pricing;
mod queries;

pub use error::EngineError;
pub use pricing::{compute_fee, discount_for_resident};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

pub type SharedDeviceState = Arc<RwLock<DeviceState>>;

/// The scheduling engine: device registry, per-device interval calendars,
/// reservation index, and the monotonic reservation counter.
///
/// One engine value owns all scheduling state. The caller constructs it once
/// (empty or from a persisted snapshot) and passes it by reference into
/// every operation; persistence is an explicit save/load phase outside the
/// engine, via [`Engine::snapshot`] and [`Engine::from_snapshot`].
pub struct Engine {
    pub(super) state: DashMap<DeviceId, SharedDeviceState>,
    /// Reverse lookup: reservation id → device id.
    pub(super) reservation_index: DashMap<ReservationId, DeviceId>,
    /// Next reservation id to assign. Strictly increasing, never reused.
    pub(super) next_reservation_id: AtomicU64,
    /// Append-only customer feedback log.
    pub(super) feedback: RwLock<Vec<String>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Empty engine; reservation ids start at 1.
    pub fn new() -> Self {
        Self {
            state: DashMap::new(),
            reservation_index: DashMap::new(),
            next_reservation_id: AtomicU64::new(1),
            feedback: RwLock::new(Vec::new()),
        }
    }

    /// Rebuild an engine from a persisted snapshot. A reservation whose
    /// device is missing from the snapshot is dropped with a warning rather
    /// than poisoning the rest of the state.
    pub fn from_snapshot(snapshot: SystemState) -> Self {
        let engine = Self {
            state: DashMap::new(),
            reservation_index: DashMap::new(),
            next_reservation_id: AtomicU64::new(snapshot.next_reservation_id),
            feedback: RwLock::new(snapshot.feedback),
        };

        for device in snapshot.devices {
            engine
                .state
                .insert(device.id, Arc::new(RwLock::new(DeviceState::new(device))));
        }

        // We are the sole owner of these Arcs during rebuild, so try_write
        // always succeeds instantly.
        for reservation in snapshot.reservations {
            match engine.state.get(&reservation.device_id) {
                Some(entry) => {
                    let ds = entry.value().clone();
                    let mut guard = ds.try_write().expect("rebuild: uncontended write");
                    guard.insert_reservation(reservation);
                    engine
                        .reservation_index
                        .insert(reservation.id, reservation.device_id);
                }
                None => {
                    tracing::warn!(
                        reservation_id = reservation.id,
                        device_id = reservation.device_id,
                        "dropping reservation for unknown device"
                    );
                }
            }
        }

        engine
    }

    /// Canonical state snapshot for the persistence collaborator: devices
    /// and reservations sorted by id, so a save/load cycle is an identity.
    pub async fn snapshot(&self) -> SystemState {
        // Clone the Arcs up front: a shard guard must not be held across
        // the read().await below.
        let states: Vec<SharedDeviceState> =
            self.state.iter().map(|e| e.value().clone()).collect();

        let mut devices = Vec::with_capacity(states.len());
        let mut reservations = Vec::new();
        for ds in states {
            let guard = ds.read().await;
            devices.push(guard.device);
            reservations.extend(guard.schedule.iter().copied());
        }
        devices.sort_by_key(|d| d.id);
        reservations.sort_by_key(|r| r.id);

        SystemState {
            devices,
            reservations,
            feedback: self.feedback.read().await.clone(),
            next_reservation_id: self.next_reservation_id.load(Ordering::SeqCst),
        }
    }

    pub(super) fn device_state(&self, id: &DeviceId) -> Option<SharedDeviceState> {
        self.state.get(id).map(|e| e.value().clone())
    }

    pub fn device_for_reservation(&self, reservation_id: &ReservationId) -> Option<DeviceId> {
        self.reservation_index
            .get(reservation_id)
            .map(|e| *e.value())
    }

    /// Lookup reservation → device, acquire the device's write lock, and
    /// confirm the reservation is still scheduled there (a concurrent cancel
    /// or transfer may have won the race while we waited for the lock).
    pub(super) async fn resolve_reservation_write(
        &self,
        reservation_id: &ReservationId,
    ) -> Result<(DeviceId, tokio::sync::OwnedRwLockWriteGuard<DeviceState>), EngineError> {
        let device_id = self
            .device_for_reservation(reservation_id)
            .ok_or(EngineError::UnknownReservation(*reservation_id))?;
        let ds = self
            .device_state(&device_id)
            .ok_or(EngineError::UnknownDevice(device_id))?;
        let guard = ds.write_owned().await;
        if guard.reservation(*reservation_id).is_none() {
            return Err(EngineError::UnknownReservation(*reservation_id));
        }
        Ok((device_id, guard))
    }
}
