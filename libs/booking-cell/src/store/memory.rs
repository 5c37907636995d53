use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, TimeSlot};
use crate::store::{BookingStore, SlotOwner, StoreError};

/// In-memory store for unit and integration tests. A single write lock makes
/// `insert_guarded` indivisible: the conflict re-scan and the push happen
/// without any interleaved insert, which is the same guarantee the exclusion
/// constraints give the Postgres-backed store.
#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: RwLock<Vec<Booking>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn owner_matches(owner: &SlotOwner, booking: &Booking) -> bool {
        match owner {
            SlotOwner::Doctor(id) => booking.doctor_id == *id,
            SlotOwner::Patient(id) => booking.patient_id == *id,
        }
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert_guarded(&self, booking: &Booking) -> Result<Booking, StoreError> {
        let mut bookings = self.bookings.write().await;

        // Re-scan under the write lock; the advisory pre-scan ran without it.
        let doctor_taken = bookings.iter().any(|b| {
            b.doctor_id == booking.doctor_id
                && b.status.is_active()
                && b.slot.overlaps(&booking.slot)
        });
        if doctor_taken {
            return Err(StoreError::DoctorSlotTaken);
        }

        let patient_taken = bookings.iter().any(|b| {
            b.patient_id == booking.patient_id
                && b.status.is_active()
                && b.slot.overlaps(&booking.slot)
        });
        if patient_taken {
            return Err(StoreError::PatientSlotTaken);
        }

        bookings.push(booking.clone());
        Ok(booking.clone())
    }

    async fn find_overlapping(
        &self,
        owner: SlotOwner,
        slot: &TimeSlot,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;

        let mut found: Vec<Booking> = bookings
            .iter()
            .filter(|b| {
                Self::owner_matches(&owner, b) && b.status.is_active() && b.slot.overlaps(slot)
            })
            .cloned()
            .collect();
        found.sort_by_key(|b| b.slot.start);

        Ok(found)
    }

    async fn fetch(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| b.id == booking_id).cloned())
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, StoreError> {
        let mut bookings = self.bookings.write().await;

        let booking = bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or(StoreError::NotFound)?;

        booking.status = status;
        if let Some(note) = note {
            booking.note = Some(note);
        }

        Ok(booking.clone())
    }

    async fn delete(&self, booking_id: Uuid) -> Result<bool, StoreError> {
        let mut bookings = self.bookings.write().await;
        let before = bookings.len();
        bookings.retain(|b| b.id != booking_id);
        Ok(bookings.len() < before)
    }

    async fn list_day(
        &self,
        doctor_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;

        let mut found: Vec<Booking> = bookings
            .iter()
            .filter(|b| {
                b.doctor_id == doctor_id
                    && b.status.is_active()
                    && b.slot.start >= day_start
                    && b.slot.start < day_end
            })
            .cloned()
            .collect();
        found.sort_by_key(|b| b.slot.start);

        Ok(found)
    }

    async fn list_for_party(
        &self,
        owner: SlotOwner,
        include_cancelled: bool,
    ) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;

        let mut found: Vec<Booking> = bookings
            .iter()
            .filter(|b| {
                Self::owner_matches(&owner, b) && (include_cancelled || b.status.is_active())
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.slot.start.cmp(&a.slot.start));

        Ok(found)
    }
}
