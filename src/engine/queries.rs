use crate::model::*;

use super::calendar::check_no_conflict;
use super::{Engine, EngineError};

impl Engine {
    pub fn device_exists(&self, id: DeviceId) -> bool {
        self.state.contains_key(&id)
    }

    pub async fn device_by_id(&self, id: DeviceId) -> Result<Device, EngineError> {
        let ds = self
            .device_state(&id)
            .ok_or(EngineError::UnknownDevice(id))?;
        let guard = ds.read().await;
        Ok(guard.device)
    }

    /// All registered devices, sorted by serial number.
    pub async fn list_devices(&self) -> Vec<Device> {
        // Clone the Arcs up front: a shard guard must not be held across
        // the read().await below.
        let states: Vec<_> = self.state.iter().map(|e| e.value().clone()).collect();
        let mut devices = Vec::with_capacity(states.len());
        for ds in states {
            let guard = ds.read().await;
            devices.push(guard.device);
        }
        devices.sort_by_key(|d| d.id);
        devices
    }

    /// The device's booked intervals as ordered `(start_at, due_at)` pairs.
    pub async fn device_schedule(&self, id: DeviceId) -> Result<Vec<(Ms, Ms)>, EngineError> {
        let ds = self
            .device_state(&id)
            .ok_or(EngineError::UnknownDevice(id))?;
        let guard = ds.read().await;
        Ok(guard
            .schedule
            .iter()
            .map(|r| (r.start_at, r.due_at()))
            .collect())
    }

    pub async fn reservation_by_id(
        &self,
        id: ReservationId,
    ) -> Result<Reservation, EngineError> {
        let device_id = self
            .device_for_reservation(&id)
            .ok_or(EngineError::UnknownReservation(id))?;
        let ds = self
            .device_state(&device_id)
            .ok_or(EngineError::UnknownReservation(id))?;
        let guard = ds.read().await;
        guard
            .reservation(id)
            .copied()
            .ok_or(EngineError::UnknownReservation(id))
    }

    /// Whether `[start, due]` is free on the device under the
    /// inclusive-boundary conflict rule.
    pub async fn is_available(
        &self,
        device_id: DeviceId,
        start: Ms,
        due: Ms,
    ) -> Result<bool, EngineError> {
        if due < start {
            return Err(EngineError::InvalidTerm("due before start"));
        }
        let ds = self
            .device_state(&device_id)
            .ok_or(EngineError::UnknownDevice(device_id))?;
        let guard = ds.read().await;
        Ok(check_no_conflict(&guard, &Span::new(start, due)).is_ok())
    }

    pub async fn feedbacks(&self) -> Vec<String> {
        self.feedback.read().await.clone()
    }
}
