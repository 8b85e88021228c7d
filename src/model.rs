use serde::{Deserialize, Serialize};

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Milliseconds per day.
pub const DAY_MS: Ms = 24 * 60 * 60 * 1000;

/// Device serial number.
pub type DeviceId = u32;

/// Reservation number, assigned from a monotonic process-wide counter.
pub type ReservationId = u64;

/// Closed interval `[start, end]`. Endpoints are inclusive: two spans that
/// merely touch (one's end equals the other's start) still conflict. This is
/// the boundary rule the extension probe is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start <= end, "Span start must not be after end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Inclusive-boundary conflict test: the spans are compatible only if one
    /// ends strictly before the other starts.
    pub fn conflicts_with(&self, other: &Span) -> bool {
        !(self.start > other.end || self.end < other.start)
    }
}

/// Granularity a reservation's duration is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermUnit {
    Day,
    Week,
    Month,
}

impl TermUnit {
    /// Day-equivalent length of one unit.
    pub fn length_days(&self) -> i64 {
        match self {
            TermUnit::Day => 1,
            TermUnit::Week => 7,
            TermUnit::Month => 30,
        }
    }

    pub fn length_ms(&self) -> Ms {
        self.length_days() * DAY_MS
    }
}

/// Device class, `A..=Z`. Lowercase input is uppercased at construction;
/// anything else is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassTag(char);

impl ClassTag {
    pub fn new(tag: char) -> Option<Self> {
        if tag.is_ascii_alphabetic() {
            Some(Self(tag.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_char(&self) -> char {
        self.0
    }

    /// Pricing weight: `'A'` = 26 down to `'Z'` = 1.
    pub fn rate_weight(&self) -> u32 {
        ('Z' as u32) - (self.0 as u32) + 1
    }
}

impl std::fmt::Display for ClassTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A leasable device. `id` and `class_tag` are immutable once created;
/// `ports` may be updated by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub class_tag: ClassTag,
    pub ports: u32,
}

/// A committed reservation. The due date is derived, never stored:
/// `due_at = start_at + duration_units × term.length_ms()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub device_id: DeviceId,
    pub term: TermUnit,
    pub created_at: Ms,
    pub start_at: Ms,
    /// Always positive; only ever grows (extension).
    pub duration_units: u32,
}

impl Reservation {
    pub fn due_at(&self) -> Ms {
        self.start_at + self.duration_units as Ms * self.term.length_ms()
    }

    pub fn span(&self) -> Span {
        Span::new(self.start_at, self.due_at())
    }
}

/// Fee snapshot produced at book/extend/transfer time. Never mutated and
/// never stored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub device_id: DeviceId,
    pub reservation_id: ReservationId,
    pub fee: f64,
}

#[derive(Debug, Clone)]
pub struct DeviceState {
    pub device: Device,
    /// The device's schedule: reservations sorted by `(start_at, id)`.
    pub schedule: Vec<Reservation>,
}

impl DeviceState {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            schedule: Vec::new(),
        }
    }

    /// Insert maintaining sort order by `(start_at, id)`. Ties on start time
    /// are ordered by reservation id, so ordering is deterministic.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .schedule
            .binary_search_by_key(&(reservation.start_at, reservation.id), |r| {
                (r.start_at, r.id)
            })
            .unwrap_or_else(|e| e);
        self.schedule.insert(pos, reservation);
    }

    /// Remove by reservation id.
    pub fn remove_reservation(&mut self, id: ReservationId) -> Option<Reservation> {
        if let Some(pos) = self.schedule.iter().position(|r| r.id == id) {
            Some(self.schedule.remove(pos))
        } else {
            None
        }
    }

    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.schedule.iter().find(|r| r.id == id)
    }

    pub fn reservation_mut(&mut self, id: ReservationId) -> Option<&mut Reservation> {
        self.schedule.iter_mut().find(|r| r.id == id)
    }

    /// Reservations whose interval conflicts with the query window.
    /// Binary search skips everything starting after `query.end`.
    pub fn conflicting(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        // Everything at index >= right_bound starts after query.end → under
        // the inclusive rule it cannot conflict.
        let right_bound = self.schedule.partition_point(|r| r.start_at <= query.end);
        self.schedule[..right_bound]
            .iter()
            .filter(move |r| r.due_at() >= query.start)
    }
}

/// The plain-record tuple the engine hands to (and accepts from) the
/// persistence collaborator. Canonical form: devices and reservations sorted
/// by id, so `load(save(x)) == x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub devices: Vec<Device>,
    pub reservations: Vec<Reservation>,
    pub feedback: Vec<String>,
    /// Next reservation id to assign. Persisted so ids stay unique and
    /// monotonic across restarts.
    pub next_reservation_id: ReservationId,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            reservations: Vec::new(),
            feedback: Vec::new(),
            next_reservation_id: 1,
        }
    }
}
