use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, InitialStatusPolicy};
use shared_models::auth::AuthUser;

use crate::jwt;

pub struct TestConfig {
    pub jwt_secret: String,
    pub postgrest_url: String,
    pub postgrest_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            postgrest_url: "http://localhost:54321".to_string(),
            postgrest_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock gateway, e.g. a wiremock server URI.
    pub fn with_gateway(postgrest_url: &str) -> Self {
        Self {
            postgrest_url: postgrest_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            postgrest_url: self.postgrest_url.clone(),
            postgrest_service_key: self.postgrest_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            initial_status: InitialStatusPolicy::Confirmed,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        jwt::issue_token(&user.to_auth_user(), secret, exp_hours.unwrap_or(24))
            .expect("test token issuance")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows and error bodies for wiremock-backed tests.
pub struct MockPostgrestResponses;

impl MockPostgrestResponses {
    pub fn user_row(user_id: Uuid, email: &str, role: &str) -> Value {
        json!({
            "id": user_id,
            "email": email,
            "full_name": "Test User",
            "role": role,
            "password_hash": "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$Zm9vYmFyYmF6cXV4",
            "phone": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(doctor_id: Uuid, full_name: &str) -> Value {
        json!({
            "id": doctor_id,
            "full_name": full_name,
            "specialty": "General Practice",
            "bio": "Experienced general practitioner",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_row(patient_id: Uuid, full_name: &str) -> Value {
        json!({
            "id": patient_id,
            "full_name": full_name,
            "birth_date": "1990-01-01",
            "phone": "+34600000000",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn booking_row(
        booking_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
        start_at: &str,
        end_at: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": booking_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "start_at": start_at,
            "end_at": end_at,
            "status": status,
            "reason": "Routine checkup",
            "note": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn availability_window_row(
        window_id: Uuid,
        doctor_id: Uuid,
        day_of_week: u8,
        start_time: &str,
        end_time: &str,
    ) -> Value {
        json!({
            "id": window_id,
            "doctor_id": doctor_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time
        })
    }

    /// Postgres 23P01 body as PostgREST forwards it, the shape produced when
    /// a guarded insert loses the slot race.
    pub fn exclusion_violation_body(constraint: &str) -> Value {
        json!({
            "code": "23P01",
            "details": "Key conflicts with existing key.",
            "hint": null,
            "message": format!(
                "conflicting key value violates exclusion constraint \"{}\"",
                constraint
            )
        })
    }

    pub fn unique_violation_body(constraint: &str) -> Value {
        json!({
            "code": "23505",
            "details": "Key already exists.",
            "hint": null,
            "message": format!(
                "duplicate key value violates unique constraint \"{}\"",
                constraint
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.postgrest_url, "http://localhost:54321");
        assert_eq!(app_config.initial_status, InitialStatusPolicy::Confirmed);
        assert!(!app_config.jwt_secret.is_empty());
        assert!(app_config.is_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let auth_user = user.to_auth_user();
        assert_eq!(auth_user.email, Some(user.email.clone()));
        assert_eq!(auth_user.role, Some(user.role.clone()));
        assert_eq!(auth_user.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }
}
