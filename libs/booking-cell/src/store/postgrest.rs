use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{Booking, BookingStatus, TimeSlot};
use crate::store::{BookingStore, SlotOwner, StoreError};

/// Exclusion constraints on the bookings table, one per invariant side.
/// Both are `btree_gist` constraints over `(party column, tstzrange(start_at,
/// end_at))` restricted to non-cancelled rows, so the database rejects an
/// overlapping insert no matter how requests interleave.
const DOCTOR_SLOT_CONSTRAINT: &str = "bookings_doctor_slot_excl";
const PATIENT_SLOT_CONSTRAINT: &str = "bookings_patient_slot_excl";

pub struct PostgrestBookingStore {
    postgrest: PostgrestClient,
}

impl PostgrestBookingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
        }
    }

    fn owner_filter(owner: &SlotOwner) -> String {
        match owner {
            SlotOwner::Doctor(id) => format!("doctor_id=eq.{}", id),
            SlotOwner::Patient(id) => format!("patient_id=eq.{}", id),
        }
    }

    fn decode_rows(result: Vec<Value>) -> Result<Vec<Booking>, StoreError> {
        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Booking>, _>>()
            .map_err(|e| StoreError::Backend(format!("Failed to parse bookings: {}", e)))
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }
}

#[async_trait]
impl BookingStore for PostgrestBookingStore {
    async fn insert_guarded(&self, booking: &Booking) -> Result<Booking, StoreError> {
        debug!("Inserting booking {} for doctor {}", booking.id, booking.doctor_id);

        let body = serde_json::to_value(booking)
            .map_err(|e| StoreError::Backend(format!("Failed to encode booking: {}", e)))?;

        let result: Result<Vec<Value>, _> = self
            .postgrest
            .request_with_headers(
                Method::POST,
                "/rest/v1/bookings",
                Some(body),
                Some(Self::representation_headers()),
            )
            .await;

        let rows = match result {
            Ok(rows) => rows,
            Err(e) => {
                // The database is the arbiter under concurrency. A 23P01
                // here means another proposal won the slot between our scan
                // and this insert.
                return Err(match e.exclusion_constraint() {
                    Some(DOCTOR_SLOT_CONSTRAINT) => {
                        warn!("Doctor slot race lost for booking {}", booking.id);
                        StoreError::DoctorSlotTaken
                    }
                    Some(PATIENT_SLOT_CONSTRAINT) => {
                        warn!("Patient slot race lost for booking {}", booking.id);
                        StoreError::PatientSlotTaken
                    }
                    _ => StoreError::Backend(e.to_string()),
                });
            }
        };

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no rows".to_string()))?;

        serde_json::from_value(row)
            .map_err(|e| StoreError::Backend(format!("Failed to parse created booking: {}", e)))
    }

    async fn find_overlapping(
        &self,
        owner: SlotOwner,
        slot: &TimeSlot,
    ) -> Result<Vec<Booking>, StoreError> {
        let query_parts = vec![
            Self::owner_filter(&owner),
            "status=neq.cancelled".to_string(),
            format!("start_at=lt.{}", urlencoding::encode(&slot.end.to_rfc3339())),
            format!("end_at=gt.{}", urlencoding::encode(&slot.start.to_rfc3339())),
        ];

        let path = format!(
            "/rest/v1/bookings?{}&order=start_at.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Self::decode_rows(result)
    }

    async fn fetch(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self::decode_rows(result)?.into_iter().next())
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
        note: Option<String>,
    ) -> Result<Booking, StoreError> {
        debug!("Updating booking {} to status {}", booking_id, status);

        let mut body = json!({ "status": status.to_string() });
        if let Some(note) = note {
            body["note"] = json!(note);
        }

        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .postgrest
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let row = Self::decode_rows(result)?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)?;

        Ok(row)
    }

    async fn delete(&self, booking_id: Uuid) -> Result<bool, StoreError> {
        debug!("Deleting booking {}", booking_id);

        let path = format!("/rest/v1/bookings?id=eq.{}", booking_id);
        let result: Vec<Value> = self
            .postgrest
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(!result.is_empty())
    }

    async fn list_day(
        &self,
        doctor_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            "status=neq.cancelled".to_string(),
            format!("start_at=gte.{}", urlencoding::encode(&day_start.to_rfc3339())),
            format!("start_at=lt.{}", urlencoding::encode(&day_end.to_rfc3339())),
        ];

        let path = format!(
            "/rest/v1/bookings?{}&order=start_at.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Self::decode_rows(result)
    }

    async fn list_for_party(
        &self,
        owner: SlotOwner,
        include_cancelled: bool,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut query_parts = vec![Self::owner_filter(&owner)];
        if !include_cancelled {
            query_parts.push("status=neq.cancelled".to_string());
        }

        let path = format!(
            "/rest/v1/bookings?{}&order=start_at.desc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Self::decode_rows(result)
    }
}
