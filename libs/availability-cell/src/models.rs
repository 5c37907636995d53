use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// One weekly recurring window as stored. Times are `HH:MM` strings in UTC;
/// `day_of_week` runs 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// Window as submitted by a doctor; the service assigns ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSpec {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAvailabilityRequest {
    pub windows: Vec<WindowSpec>,
}

/// A concrete slice of a window on a concrete date, flagged against the
/// doctor's bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookableSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_booked: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AvailabilityError {
    #[error("Invalid availability window: {0}")]
    InvalidWindow(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
