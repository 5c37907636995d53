use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// PARTY MODELS
// ==============================================================================

/// Role a directory entry plays in the booking domain. Every user row has
/// exactly one role; bookings require a Patient on one side and a Doctor on
/// the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Patient => write!(f, "patient"),
            PartyRole::Doctor => write!(f, "doctor"),
            PartyRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for PartyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(PartyRole::Patient),
            "doctor" => Ok(PartyRole::Doctor),
            "admin" => Ok(PartyRole::Admin),
            other => Err(format!("Unknown party role: {}", other)),
        }
    }
}

/// Minimal identity projection the booking core consumes. The core never
/// sees full user records, only id and role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub id: Uuid,
    pub role: PartyRole,
}

// ==============================================================================
// DIRECTORY RECORDS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: PartyRole,
    pub password_hash: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==============================================================================
// QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub q: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory entry not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
