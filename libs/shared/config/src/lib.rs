use std::env;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Initial status assigned to freshly admitted bookings. The clinics this
/// system replaced disagreed on whether a new booking starts out pending or
/// confirmed, so the policy is explicit configuration rather than a default
/// baked into the admission code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialStatusPolicy {
    Pending,
    Confirmed,
}

impl InitialStatusPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgrest_url: String,
    pub postgrest_service_key: String,
    pub jwt_secret: String,
    pub initial_status: InitialStatusPolicy,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            postgrest_url: env::var("POSTGREST_URL")
                .unwrap_or_else(|_| {
                    warn!("POSTGREST_URL not set, using empty value");
                    String::new()
                }),
            postgrest_service_key: env::var("POSTGREST_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("POSTGREST_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            initial_status: env::var("BOOKING_INITIAL_STATUS")
                .ok()
                .and_then(|v| {
                    let parsed = InitialStatusPolicy::parse(&v);
                    if parsed.is_none() {
                        warn!("BOOKING_INITIAL_STATUS '{}' not recognized, using 'confirmed'", v);
                    }
                    parsed
                })
                .unwrap_or(InitialStatusPolicy::Confirmed),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.postgrest_url.is_empty()
            && !self.postgrest_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_initial_status_policy() {
        assert_eq!(
            InitialStatusPolicy::parse("pending"),
            Some(InitialStatusPolicy::Pending)
        );
        assert_eq!(
            InitialStatusPolicy::parse(" Confirmed "),
            Some(InitialStatusPolicy::Confirmed)
        );
        assert_eq!(InitialStatusPolicy::parse("tentative"), None);
    }
}
