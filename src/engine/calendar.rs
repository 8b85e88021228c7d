use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Validate a candidate term against the engine limits and the creation-time
/// rule. `created_at` is the operation's notion of "now".
pub(crate) fn validate_term(
    start_at: Ms,
    term: TermUnit,
    duration_units: u32,
    created_at: Ms,
) -> Result<Span, EngineError> {
    use crate::limits::*;
    if duration_units == 0 {
        return Err(EngineError::InvalidTerm("duration must be positive"));
    }
    if duration_units > MAX_DURATION_UNITS {
        return Err(EngineError::LimitExceeded("duration too long"));
    }
    if start_at < created_at {
        return Err(EngineError::InvalidTerm("start before creation time"));
    }
    if start_at < MIN_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    let due_at = start_at + duration_units as Ms * term.length_ms();
    if due_at > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    Ok(Span::new(start_at, due_at))
}

/// First reservation on the device whose interval conflicts with `span`
/// under the inclusive-boundary rule, or `Ok(())` if the window is free.
pub(crate) fn check_no_conflict(ds: &DeviceState, span: &Span) -> Result<(), EngineError> {
    check_no_conflict_excluding(ds, span, None)
}

/// As `check_no_conflict`, but ignoring `exclude` — used when re-checking a
/// window against a device that already carries the moving reservation.
pub(crate) fn check_no_conflict_excluding(
    ds: &DeviceState,
    span: &Span,
    exclude: Option<ReservationId>,
) -> Result<(), EngineError> {
    for existing in ds.conflicting(span) {
        if Some(existing.id) == exclude {
            continue;
        }
        return Err(EngineError::Unavailable(existing.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{MAX_DURATION_UNITS, MAX_VALID_TIMESTAMP_MS};

    fn device_state() -> DeviceState {
        DeviceState::new(Device {
            id: 1,
            class_tag: ClassTag::new('A').unwrap(),
            ports: 4,
        })
    }

    fn booked(id: ReservationId, start: Ms, days: u32) -> Reservation {
        Reservation {
            id,
            device_id: 1,
            term: TermUnit::Day,
            created_at: 0,
            start_at: start,
            duration_units: days,
        }
    }

    #[test]
    fn validate_term_accepts_well_formed() {
        let span = validate_term(5 * DAY_MS, TermUnit::Day, 3, 0).unwrap();
        assert_eq!(span, Span::new(5 * DAY_MS, 8 * DAY_MS));
    }

    #[test]
    fn validate_term_rejects_zero_duration() {
        let result = validate_term(5 * DAY_MS, TermUnit::Day, 0, 0);
        assert!(matches!(result, Err(EngineError::InvalidTerm(_))));
    }

    #[test]
    fn validate_term_rejects_start_in_past() {
        let result = validate_term(DAY_MS, TermUnit::Day, 1, 2 * DAY_MS);
        assert!(matches!(result, Err(EngineError::InvalidTerm(_))));
    }

    #[test]
    fn validate_term_rejects_out_of_range() {
        let result = validate_term(MAX_VALID_TIMESTAMP_MS, TermUnit::Month, 12, 0);
        assert!(matches!(result, Err(EngineError::LimitExceeded(_))));

        let result = validate_term(0, TermUnit::Day, MAX_DURATION_UNITS + 1, 0);
        assert!(matches!(result, Err(EngineError::LimitExceeded(_))));
    }

    #[test]
    fn conflict_reports_conflicting_id() {
        let mut ds = device_state();
        ds.insert_reservation(booked(7, 0, 5));

        let result = check_no_conflict(&ds, &Span::new(2 * DAY_MS, 4 * DAY_MS));
        assert!(matches!(result, Err(EngineError::Unavailable(7))));
    }

    #[test]
    fn conflict_boundary_is_inclusive() {
        let mut ds = device_state();
        ds.insert_reservation(booked(1, 0, 5));

        // Starting exactly at the existing due date conflicts.
        let at_due = Span::new(5 * DAY_MS, 6 * DAY_MS);
        assert!(check_no_conflict(&ds, &at_due).is_err());

        // A gap of one tick is enough.
        let after = Span::new(5 * DAY_MS + 1, 6 * DAY_MS);
        assert!(check_no_conflict(&ds, &after).is_ok());
    }

    #[test]
    fn conflict_exclusion_skips_own_entry() {
        let mut ds = device_state();
        ds.insert_reservation(booked(1, 0, 5));
        ds.insert_reservation(booked(2, 10 * DAY_MS, 2));

        let own_window = Span::new(0, 5 * DAY_MS);
        assert!(check_no_conflict_excluding(&ds, &own_window, Some(1)).is_ok());
        // A different id still conflicts.
        assert!(check_no_conflict_excluding(&ds, &own_window, Some(2)).is_err());
    }
}
