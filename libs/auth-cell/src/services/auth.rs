use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use directory_cell::models::{PartyRole, UserRecord};
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::auth::AuthUser;
use shared_utils::jwt;

use crate::models::{AuthError, AuthResponse, LoginRequest, PublicUser, RegisterRequest};

const TOKEN_TTL_HOURS: i64 = 24;
const MIN_PASSWORD_LEN: usize = 8;

pub struct AuthService {
    postgrest: PostgrestClient,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            postgrest: PostgrestClient::new(config),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    /// Create a user plus the profile row for its role, then sign them in.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let role = request
            .role
            .parse::<PartyRole>()
            .map_err(|_| AuthError::InvalidRole(request.role.clone()))?;
        if role == PartyRole::Admin {
            // Admin accounts are provisioned directly, never self-registered.
            return Err(AuthError::InvalidRole(request.role.clone()));
        }

        let email = request.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail(email));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        // Friendly pre-check; the unique index on email still decides.
        let existing: Vec<Value> = self
            .postgrest
            .request(
                Method::GET,
                &format!(
                    "/rest/v1/users?email=eq.{}&select=id",
                    urlencoding::encode(&email)
                ),
                None,
            )
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if !existing.is_empty() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash =
            hash_password(&request.password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let user_id = Uuid::new_v4();
        let user_data = json!({
            "id": user_id,
            "email": email,
            "full_name": request.full_name,
            "role": role.to_string(),
            "password_hash": password_hash,
            "phone": request.phone,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self
            .postgrest
            .request_with_headers(
                Method::POST,
                "/rest/v1/users",
                Some(user_data),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    warn!("Registration race lost for {}", email);
                    AuthError::EmailTaken
                } else {
                    AuthError::DatabaseError(e.to_string())
                }
            })?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::DatabaseError("Insert returned no rows".to_string()))?;
        let user: UserRecord = serde_json::from_value(row)
            .map_err(|e| AuthError::DatabaseError(format!("Failed to parse user: {}", e)))?;

        self.create_profile_row(&user).await?;

        debug!("Registered {} as {}", user.id, user.role);
        self.issue_response(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let email = request.email.trim().to_lowercase();

        let result: Vec<Value> = self
            .postgrest
            .request(
                Method::GET,
                &format!("/rest/v1/users?email=eq.{}", urlencoding::encode(&email)),
                None,
            )
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        // Same error for unknown email and wrong password.
        let row = result.into_iter().next().ok_or(AuthError::InvalidCredentials)?;
        let user: UserRecord = serde_json::from_value(row)
            .map_err(|e| AuthError::DatabaseError(format!("Failed to parse user: {}", e)))?;

        let valid = verify_password(&request.password, &user.password_hash)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        debug!("Login for {}", user.id);
        self.issue_response(user)
    }

    async fn create_profile_row(&self, user: &UserRecord) -> Result<(), AuthError> {
        let (path, profile_data) = match user.role {
            PartyRole::Doctor => (
                "/rest/v1/doctors",
                json!({
                    "id": user.id,
                    "full_name": user.full_name,
                    "specialty": null,
                    "bio": null,
                    "created_at": Utc::now().to_rfc3339()
                }),
            ),
            _ => (
                "/rest/v1/patients",
                json!({
                    "id": user.id,
                    "full_name": user.full_name,
                    "birth_date": null,
                    "phone": user.phone,
                    "created_at": Utc::now().to_rfc3339()
                }),
            ),
        };

        let _: Vec<Value> = self
            .postgrest
            .request_with_headers(
                Method::POST,
                path,
                Some(profile_data),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    fn issue_response(&self, user: UserRecord) -> Result<AuthResponse, AuthError> {
        let auth_user = AuthUser {
            id: user.id,
            email: Some(user.email.clone()),
            role: Some(user.role.to_string()),
        };

        let access_token = jwt::issue_token(&auth_user, &self.jwt_secret, TOKEN_TTL_HOURS)
            .map_err(AuthError::Internal)?;

        Ok(AuthResponse {
            user: PublicUser::from(user),
            access_token,
            token_type: "bearer".to_string(),
            expires_in: (TOKEN_TTL_HOURS * 3600) as u64,
        })
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

#[instrument(skip(password))]
fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

#[instrument(skip(password, hash))]
fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("same input").unwrap();
        let second = hash_password("same input").unwrap();
        assert_ne!(first, second);
    }
}
