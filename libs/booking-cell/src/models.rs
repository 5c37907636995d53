// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use directory_cell::models::PartyRole;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// Half-open interval `[start, end)` in UTC. `end` is the first instant that
/// no longer belongs to the slot, so a booking ending at 10:00 and one
/// starting at 10:00 do not collide.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    #[serde(rename = "start_at")]
    pub start: DateTime<Utc>,
    #[serde(rename = "end_at")]
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Build a validated slot. Zero-length and inverted intervals are
    /// rejected before they reach any store.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(BookingError::InvalidInterval)
        }
    }

    /// Two slots overlap iff each starts before the other ends. Touching
    /// endpoints are not an overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Whether a booking in this status occupies its slot. Cancelled
    /// bookings free the slot; everything else blocks it.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub status: BookingStatus,
    pub reason: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeBookingRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reason: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum BookingError {
    #[error("Booking interval is empty or inverted")]
    InvalidInterval,

    #[error("Unknown party: {0}")]
    UnknownParty(Uuid),

    #[error("Party {party} does not have the {expected} role")]
    InvalidRole { party: Uuid, expected: PartyRole },

    #[error("Doctor already has a booking overlapping this interval")]
    DoctorConflict,

    #[error("Patient already has a booking overlapping this interval")]
    PatientConflict,

    #[error("Booking not found")]
    NotFound,

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Booking cannot leave status: {0}")]
    InvalidStatusTransition(BookingStatus),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn slot(start_min: i64, end_min: i64) -> TimeSlot {
        let base = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        TimeSlot {
            start: base + chrono::Duration::minutes(start_min),
            end: base + chrono::Duration::minutes(end_min),
        }
    }

    #[test]
    fn rejects_empty_and_inverted_slots() {
        let t = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        assert!(TimeSlot::new(t, t).is_err());
        assert!(TimeSlot::new(t + chrono::Duration::minutes(30), t).is_err());
        assert!(TimeSlot::new(t, t + chrono::Duration::minutes(30)).is_ok());
    }

    #[test]
    fn overlap_is_half_open() {
        let base = slot(0, 60);

        assert!(base.overlaps(&slot(30, 90)), "partial overlap");
        assert!(base.overlaps(&slot(-30, 30)), "partial overlap from the left");
        assert!(base.overlaps(&slot(15, 45)), "containment");
        assert!(base.overlaps(&slot(-15, 75)), "containing slot");

        assert!(!base.overlaps(&slot(60, 90)), "touching at the end");
        assert!(!base.overlaps(&slot(-30, 0)), "touching at the start");
        assert!(!base.overlaps(&slot(90, 120)), "disjoint");
    }

    #[test]
    fn cancelled_is_the_only_inactive_status() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Confirmed.is_active());
        assert!(BookingStatus::Completed.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
    }

    #[test]
    fn booking_row_uses_flat_interval_columns() {
        let booking = Booking {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            slot: slot(0, 30),
            status: BookingStatus::Confirmed,
            reason: "Routine checkup".to_string(),
            note: None,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&booking).expect("booking serializes");
        assert!(value.get("start_at").is_some());
        assert!(value.get("end_at").is_some());
        assert!(value.get("slot").is_none());
        assert_eq!(value["status"], "confirmed");
    }
}
