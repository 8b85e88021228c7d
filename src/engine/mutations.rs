use std::sync::Arc;
use std::sync::atomic::Ordering;

use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::calendar::{check_no_conflict, check_no_conflict_excluding, now_ms, validate_term};
use super::pricing::compute_fee;
use super::{Engine, EngineError};

impl Engine {
    // ── Administrative ops ───────────────────────────────────

    pub async fn add_device(
        &self,
        id: DeviceId,
        class_tag: ClassTag,
        ports: u32,
    ) -> Result<(), EngineError> {
        if self.state.len() >= MAX_DEVICES {
            return Err(EngineError::LimitExceeded("too many devices"));
        }
        match self.state.entry(id) {
            Entry::Occupied(_) => Err(EngineError::AlreadyExists(id)),
            Entry::Vacant(vacant) => {
                let device = Device {
                    id,
                    class_tag,
                    ports,
                };
                vacant.insert(Arc::new(RwLock::new(DeviceState::new(device))));
                info!(device_id = id, class = %class_tag, ports, "device added");
                metrics::gauge!(observability::DEVICES_ACTIVE).increment(1.0);
                Ok(())
            }
        }
    }

    /// Remove a device and every reservation scheduled on it. The cascade
    /// happens under the device's write lock, so it is all-or-nothing.
    pub async fn remove_device(&self, id: DeviceId) -> Result<(), EngineError> {
        let ds = self
            .device_state(&id)
            .ok_or(EngineError::UnknownDevice(id))?;
        let mut guard = ds.write_owned().await;
        // A concurrent removal may have won while we waited for the lock.
        if !self.state.contains_key(&id) {
            return Err(EngineError::UnknownDevice(id));
        }

        let cascaded = guard.schedule.len();
        for reservation in guard.schedule.drain(..) {
            self.reservation_index.remove(&reservation.id);
        }
        self.state.remove(&id);

        info!(device_id = id, cascaded, "device removed");
        metrics::gauge!(observability::DEVICES_ACTIVE).decrement(1.0);
        Ok(())
    }

    /// Update the one mutable device attribute.
    pub async fn update_device_ports(&self, id: DeviceId, ports: u32) -> Result<(), EngineError> {
        let ds = self
            .device_state(&id)
            .ok_or(EngineError::UnknownDevice(id))?;
        let mut guard = ds.write().await;
        guard.device.ports = ports;
        info!(device_id = id, ports, "device ports updated");
        Ok(())
    }

    // ── Customer ops ─────────────────────────────────────────

    /// Book a device for a term. On success the reservation is committed to
    /// the device's schedule and an invoice for the whole term is returned.
    pub async fn reserve(
        &self,
        device_id: DeviceId,
        term: TermUnit,
        start_at: Ms,
        duration_units: u32,
        discount: f64,
    ) -> Result<Invoice, EngineError> {
        let now = now_ms();
        let span = validate_term(start_at, term, duration_units, now)?;

        let ds = self
            .device_state(&device_id)
            .ok_or(EngineError::UnknownDevice(device_id))?;
        let mut guard = ds.write_owned().await;
        // The device may have been removed while we waited for the lock; a
        // reservation must never land in a detached schedule.
        if !self.state.contains_key(&device_id) {
            return Err(EngineError::UnknownDevice(device_id));
        }
        if guard.schedule.len() >= MAX_RESERVATIONS_PER_DEVICE {
            return Err(EngineError::LimitExceeded("too many reservations on device"));
        }

        if let Err(e) = check_no_conflict(&guard, &span) {
            metrics::counter!(observability::RESERVATION_CONFLICTS_TOTAL).increment(1);
            return Err(e);
        }
        let fee = compute_fee(guard.device.class_tag, term, duration_units, discount)?;

        // All checks passed; nothing below can fail.
        let id = self.next_reservation_id.fetch_add(1, Ordering::SeqCst);
        let reservation = Reservation {
            id,
            device_id,
            term,
            created_at: now,
            start_at,
            duration_units,
        };
        guard.insert_reservation(reservation);
        self.reservation_index.insert(id, device_id);

        debug!(reservation_id = id, device_id, ?term, duration_units, "reservation booked");
        metrics::counter!(observability::RESERVATIONS_BOOKED_TOTAL).increment(1);
        Ok(Invoice {
            device_id,
            reservation_id: id,
            fee,
        })
    }

    /// Grow a reservation by `additional_units` of its own term unit.
    ///
    /// The availability probe starts one tick after the current due date so
    /// the reservation's own calendar entry does not conflict with it, and
    /// spans exactly the added time. On success only the recorded duration
    /// changes; calendar membership and order stay as they were.
    pub async fn extend_reservation(
        &self,
        reservation_id: ReservationId,
        additional_units: u32,
        discount: f64,
    ) -> Result<Invoice, EngineError> {
        if additional_units == 0 {
            return Err(EngineError::InvalidTerm("extension must be positive"));
        }

        let (device_id, mut guard) = self.resolve_reservation_write(&reservation_id).await?;
        let current = *guard
            .reservation(reservation_id)
            .ok_or(EngineError::UnknownReservation(reservation_id))?;

        let new_units = current
            .duration_units
            .checked_add(additional_units)
            .ok_or(EngineError::LimitExceeded("duration too long"))?;
        if new_units > MAX_DURATION_UNITS {
            return Err(EngineError::LimitExceeded("duration too long"));
        }
        let new_due = current.start_at + new_units as Ms * current.term.length_ms();
        if new_due > MAX_VALID_TIMESTAMP_MS {
            return Err(EngineError::LimitExceeded("timestamp out of range"));
        }

        let probe = Span::new(current.due_at() + 1, new_due);
        check_no_conflict(&guard, &probe)?;
        let fee = compute_fee(guard.device.class_tag, current.term, new_units, discount)?;

        guard
            .reservation_mut(reservation_id)
            .expect("reservation present under write lock")
            .duration_units = new_units;

        debug!(reservation_id, device_id, new_units, "reservation extended");
        metrics::counter!(observability::RESERVATIONS_EXTENDED_TOTAL).increment(1);
        Ok(Invoice {
            device_id,
            reservation_id,
            fee,
        })
    }

    /// Cancel a reservation, subject to the minimum-notice rule: rejection
    /// if the start date is less than `MIN_CANCEL_NOTICE_MS` away.
    pub async fn cancel_reservation(&self, reservation_id: ReservationId) -> Result<(), EngineError> {
        let (device_id, mut guard) = self.resolve_reservation_write(&reservation_id).await?;
        let reservation = *guard
            .reservation(reservation_id)
            .ok_or(EngineError::UnknownReservation(reservation_id))?;

        if reservation.start_at - now_ms() < MIN_CANCEL_NOTICE_MS {
            return Err(EngineError::TooLate {
                start_at: reservation.start_at,
                required_notice_ms: MIN_CANCEL_NOTICE_MS,
            });
        }

        guard.remove_reservation(reservation_id);
        self.reservation_index.remove(&reservation_id);

        debug!(reservation_id, device_id, "reservation cancelled");
        metrics::counter!(observability::RESERVATIONS_CANCELLED_TOTAL).increment(1);
        Ok(())
    }

    /// Move a reservation to another device, keeping its term untouched.
    /// Both schedules are locked (in device-id order, so two concurrent
    /// transfers cannot deadlock) and the move commits atomically.
    pub async fn transfer_reservation(
        &self,
        reservation_id: ReservationId,
        new_device_id: DeviceId,
        discount: f64,
    ) -> Result<Invoice, EngineError> {
        let old_device_id = self
            .device_for_reservation(&reservation_id)
            .ok_or(EngineError::UnknownReservation(reservation_id))?;
        let new_ds = self
            .device_state(&new_device_id)
            .ok_or(EngineError::UnknownDevice(new_device_id))?;

        if old_device_id == new_device_id {
            // Same-device transfer is a no-op: the reservation's own entry is
            // not an "other" reservation on the target.
            let (_, guard) = self.resolve_reservation_write(&reservation_id).await?;
            let current = *guard
                .reservation(reservation_id)
                .ok_or(EngineError::UnknownReservation(reservation_id))?;
            let fee = compute_fee(
                guard.device.class_tag,
                current.term,
                current.duration_units,
                discount,
            )?;
            return Ok(Invoice {
                device_id: new_device_id,
                reservation_id,
                fee,
            });
        }

        let old_ds = self
            .device_state(&old_device_id)
            .ok_or(EngineError::UnknownDevice(old_device_id))?;

        // Acquire write locks in sorted id order to prevent deadlocks.
        let (mut old_guard, mut new_guard) = if old_device_id < new_device_id {
            let old = old_ds.write_owned().await;
            let new = new_ds.write_owned().await;
            (old, new)
        } else {
            let new = new_ds.write_owned().await;
            let old = old_ds.write_owned().await;
            (old, new)
        };
        if !self.state.contains_key(&new_device_id) {
            return Err(EngineError::UnknownDevice(new_device_id));
        }
        if new_guard.schedule.len() >= MAX_RESERVATIONS_PER_DEVICE {
            return Err(EngineError::LimitExceeded("too many reservations on device"));
        }
        let current = *old_guard
            .reservation(reservation_id)
            .ok_or(EngineError::UnknownReservation(reservation_id))?;

        check_no_conflict_excluding(&new_guard, &current.span(), Some(reservation_id))?;
        let fee = compute_fee(
            new_guard.device.class_tag,
            current.term,
            current.duration_units,
            discount,
        )?;

        let mut moved = old_guard
            .remove_reservation(reservation_id)
            .expect("reservation present under write lock");
        moved.device_id = new_device_id;
        new_guard.insert_reservation(moved);
        self.reservation_index.insert(reservation_id, new_device_id);

        debug!(reservation_id, old_device_id, new_device_id, "reservation transferred");
        metrics::counter!(observability::RESERVATIONS_TRANSFERRED_TOTAL).increment(1);
        Ok(Invoice {
            device_id: new_device_id,
            reservation_id,
            fee,
        })
    }

    // ── Feedback log ─────────────────────────────────────────

    pub async fn record_feedback(&self, text: String) -> Result<(), EngineError> {
        if text.len() > MAX_FEEDBACK_LEN {
            return Err(EngineError::LimitExceeded("feedback too long"));
        }
        self.feedback.write().await.push(text);
        Ok(())
    }
}
