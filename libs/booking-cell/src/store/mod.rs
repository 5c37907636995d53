pub mod memory;
pub mod postgrest;

pub use memory::MemoryBookingStore;
pub use postgrest::PostgrestBookingStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, TimeSlot};

/// Which side of a booking a slot query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOwner {
    Doctor(Uuid),
    Patient(Uuid),
}

impl SlotOwner {
    pub fn id(&self) -> Uuid {
        match self {
            SlotOwner::Doctor(id) | SlotOwner::Patient(id) => *id,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("doctor already holds an overlapping booking")]
    DoctorSlotTaken,

    #[error("patient already holds an overlapping booking")]
    PatientSlotTaken,

    #[error("booking row not found")]
    NotFound,

    #[error("store failure: {0}")]
    Backend(String),
}

/// Persistence seam for bookings. The contract that makes admission safe
/// under concurrency lives in [`insert_guarded`]: the overlap re-check and
/// the insert are one indivisible step, so callers may race freely and at
/// most one proposal per slot survives.
///
/// [`insert_guarded`]: BookingStore::insert_guarded
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert the booking unless it would overlap a non-cancelled booking
    /// of the same doctor or the same patient. The check and the insert are
    /// atomic; a lost race surfaces as `DoctorSlotTaken` / `PatientSlotTaken`.
    async fn insert_guarded(&self, booking: &Booking) -> Result<Booking, StoreError>;

    /// Non-cancelled bookings of `owner` overlapping `slot`.
    async fn find_overlapping(
        &self,
        owner: SlotOwner,
        slot: &TimeSlot,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn fetch(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Set the booking status and, when `note` is given, replace the note.
    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, StoreError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, booking_id: Uuid) -> Result<bool, StoreError>;

    /// Non-cancelled bookings of a doctor starting within
    /// `[day_start, day_end)`, ordered by start ascending.
    async fn list_day(
        &self,
        doctor_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Bookings of one party, newest start first. Cancelled rows are
    /// included only when `include_cancelled` is set.
    async fn list_for_party(
        &self,
        owner: SlotOwner,
        include_cancelled: bool,
    ) -> Result<Vec<Booking>, StoreError>;
}
