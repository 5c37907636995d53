use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use directory_cell::models::PartyRole;
use directory_cell::services::{PartyDirectory, PostgrestDirectory};
use shared_config::{AppConfig, InitialStatusPolicy};

use crate::models::{Booking, BookingError, BookingStatus, ProposeBookingRequest, TimeSlot};
use crate::store::{BookingStore, PostgrestBookingStore, SlotOwner, StoreError};

/// Admission pipeline for booking proposals. The service validates the
/// interval, resolves both parties, runs an advisory conflict scan for
/// friendlier errors, and then hands the proposal to the store, whose
/// guarded insert is the only check that holds under concurrency.
pub struct AdmissionService {
    store: Arc<dyn BookingStore>,
    directory: Arc<dyn PartyDirectory>,
    initial_status: InitialStatusPolicy,
}

impl AdmissionService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        directory: Arc<dyn PartyDirectory>,
        initial_status: InitialStatusPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            initial_status,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(PostgrestBookingStore::new(config)),
            directory: Arc::new(PostgrestDirectory::new(config)),
            initial_status: config.initial_status,
        }
    }

    /// Propose a booking and admit it if both calendars are free.
    pub async fn propose_booking(
        &self,
        request: ProposeBookingRequest,
    ) -> Result<Booking, BookingError> {
        // **Step 1: Validate the interval**
        let slot = TimeSlot::new(request.start_at, request.end_at)?;

        // **Step 2: Resolve both parties and their roles**
        self.require_role(request.patient_id, PartyRole::Patient)
            .await?;
        self.require_role(request.doctor_id, PartyRole::Doctor)
            .await?;

        // **Step 3: Advisory conflict scan, doctor side first**
        // This is a courtesy check for a precise error. Two proposals can
        // both pass it for the same slot, so it decides nothing.
        let doctor_clashes = self
            .store
            .find_overlapping(SlotOwner::Doctor(request.doctor_id), &slot)
            .await
            .map_err(Self::map_store_error)?;
        if !doctor_clashes.is_empty() {
            debug!(
                "Doctor {} has {} overlapping booking(s)",
                request.doctor_id,
                doctor_clashes.len()
            );
            return Err(BookingError::DoctorConflict);
        }

        let patient_clashes = self
            .store
            .find_overlapping(SlotOwner::Patient(request.patient_id), &slot)
            .await
            .map_err(Self::map_store_error)?;
        if !patient_clashes.is_empty() {
            debug!(
                "Patient {} has {} overlapping booking(s)",
                request.patient_id,
                patient_clashes.len()
            );
            return Err(BookingError::PatientConflict);
        }

        // **Step 4: Guarded insert, the store has the final word**
        let booking = Booking {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            slot,
            status: self.admitted_status(),
            reason: request.reason,
            note: request.note,
            created_at: Utc::now(),
        };

        let created = self
            .store
            .insert_guarded(&booking)
            .await
            .map_err(Self::map_store_error)?;

        info!(
            "Booking {} admitted for doctor {} at {}",
            created.id, created.doctor_id, created.slot.start
        );
        Ok(created)
    }

    /// Cancel a booking on behalf of an actor. Patients may only cancel
    /// their own; cancelling an already cancelled booking is a no-op.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        actor_role: PartyRole,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        let booking = self.get_booking(booking_id).await?;

        if actor_role == PartyRole::Patient && booking.patient_id != actor_id {
            return Err(BookingError::Forbidden(
                "You can only cancel your own bookings".to_string(),
            ));
        }

        match booking.status {
            // Idempotent: the stored row comes back unchanged, no second
            // note is appended.
            BookingStatus::Cancelled => return Ok(booking),
            BookingStatus::Completed => {
                return Err(BookingError::InvalidStatusTransition(
                    BookingStatus::Completed,
                ))
            }
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        let note = reason
            .filter(|r| !r.trim().is_empty())
            .map(|r| match &booking.note {
                Some(existing) => format!("{}\nCancel reason: {}", existing, r),
                None => format!("Cancel reason: {}", r),
            });

        let cancelled = self
            .store
            .update_status(booking_id, BookingStatus::Cancelled, note)
            .await
            .map_err(Self::map_store_error)?;

        info!("Booking {} cancelled", booking_id);
        Ok(cancelled)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.store
            .fetch(booking_id)
            .await
            .map_err(Self::map_store_error)?
            .ok_or(BookingError::NotFound)
    }

    /// Non-cancelled bookings for one doctor on one calendar day, in UTC,
    /// ordered by start time.
    pub async fn list_by_day(
        &self,
        doctor_id: Uuid,
        date: &str,
    ) -> Result<Vec<Booking>, BookingError> {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| BookingError::InvalidDate(date.to_string()))?;
        let next_day = day
            .succ_opt()
            .ok_or_else(|| BookingError::InvalidDate(date.to_string()))?;

        // Half-open window: a booking starting at midnight belongs to the
        // day it starts, never to the day before.
        let day_start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
        let day_end = Utc.from_utc_datetime(&next_day.and_time(NaiveTime::MIN));

        self.store
            .list_day(doctor_id, day_start, day_end)
            .await
            .map_err(Self::map_store_error)
    }

    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        include_cancelled: bool,
    ) -> Result<Vec<Booking>, BookingError> {
        self.store
            .list_for_party(SlotOwner::Patient(patient_id), include_cancelled)
            .await
            .map_err(Self::map_store_error)
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        include_cancelled: bool,
    ) -> Result<Vec<Booking>, BookingError> {
        self.store
            .list_for_party(SlotOwner::Doctor(doctor_id), include_cancelled)
            .await
            .map_err(Self::map_store_error)
    }

    /// Hard delete. Admin tooling only; everything user-facing cancels.
    pub async fn remove_booking(&self, booking_id: Uuid) -> Result<(), BookingError> {
        let removed = self
            .store
            .delete(booking_id)
            .await
            .map_err(Self::map_store_error)?;

        if removed {
            Ok(())
        } else {
            Err(BookingError::NotFound)
        }
    }

    async fn require_role(&self, party_id: Uuid, expected: PartyRole) -> Result<(), BookingError> {
        let party = self
            .directory
            .resolve_party(party_id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?
            .ok_or(BookingError::UnknownParty(party_id))?;

        if party.role != expected {
            return Err(BookingError::InvalidRole {
                party: party_id,
                expected,
            });
        }

        Ok(())
    }

    fn admitted_status(&self) -> BookingStatus {
        match self.initial_status {
            InitialStatusPolicy::Pending => BookingStatus::Pending,
            InitialStatusPolicy::Confirmed => BookingStatus::Confirmed,
        }
    }

    fn map_store_error(err: StoreError) -> BookingError {
        match err {
            StoreError::DoctorSlotTaken => BookingError::DoctorConflict,
            StoreError::PatientSlotTaken => BookingError::PatientConflict,
            StoreError::NotFound => BookingError::NotFound,
            StoreError::Backend(message) => BookingError::DatabaseError(message),
        }
    }
}
