use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{DirectoryError, DoctorListParams, DoctorProfile, Party, PartyRole, PatientProfile};

/// Read-only identity lookup used by the booking core to validate the
/// parties named in a proposal. Implementations must answer `None` for ids
/// that do not exist rather than failing.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn resolve_party(&self, party_id: Uuid) -> Result<Option<Party>, DirectoryError>;
}

// ==============================================================================
// POSTGREST-BACKED DIRECTORY
// ==============================================================================

pub struct PostgrestDirectory {
    postgrest: PostgrestClient,
}

impl PostgrestDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
        }
    }
}

#[async_trait]
impl PartyDirectory for PostgrestDirectory {
    async fn resolve_party(&self, party_id: Uuid) -> Result<Option<Party>, DirectoryError> {
        debug!("Resolving party: {}", party_id);

        let path = format!("/rest/v1/users?id=eq.{}&select=id,role", party_id);
        let result: Vec<Party> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().next())
    }
}

// ==============================================================================
// IN-MEMORY DIRECTORY
// ==============================================================================

/// Fixed directory for tests and local development. Entries are supplied up
/// front; lookups never fail.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    parties: HashMap<Uuid, PartyRole>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_party(mut self, party_id: Uuid, role: PartyRole) -> Self {
        self.parties.insert(party_id, role);
        self
    }
}

#[async_trait]
impl PartyDirectory for MemoryDirectory {
    async fn resolve_party(&self, party_id: Uuid) -> Result<Option<Party>, DirectoryError> {
        Ok(self
            .parties
            .get(&party_id)
            .map(|role| Party { id: party_id, role: *role }))
    }
}

// ==============================================================================
// PROFILE LOOKUPS
// ==============================================================================

pub struct DirectoryService {
    postgrest: PostgrestClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
        }
    }

    /// Paged doctor listing with an optional case-insensitive search over
    /// name and specialty.
    pub async fn list_doctors(
        &self,
        params: &DoctorListParams,
    ) -> Result<Vec<DoctorProfile>, DirectoryError> {
        debug!("Listing doctors with params: {:?}", params);

        let page = params.page.unwrap_or(1).max(1);
        let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut query_parts = Vec::new();

        if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let encoded = urlencoding::encode(q);
            query_parts.push(format!(
                "or=(full_name.ilike.*{}*,specialty.ilike.*{}*)",
                encoded, encoded
            ));
        }

        query_parts.push("order=full_name.asc".to_string());
        query_parts.push(format!("limit={}", per_page));
        query_parts.push(format!("offset={}", offset));

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));
        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let doctors: Vec<DoctorProfile> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DoctorProfile>, _>>()
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctors)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<DoctorProfile, DirectoryError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DirectoryError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<PatientProfile, DirectoryError> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self
            .postgrest
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DirectoryError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse patient: {}", e)))
    }
}
