use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Error body PostgREST returns for failed requests. `code` carries the
/// Postgres SQLSTATE (e.g. 23505 unique violation, 23P01 exclusion
/// violation), which is how constraint failures travel back to the stores.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Error, Debug, Clone)]
pub enum PostgrestError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("gateway error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("failed to decode gateway response: {0}")]
    Decode(String),
}

impl PostgrestError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Api { code: Some(code), .. } if code == "23505")
    }

    /// Name of the violated exclusion constraint, if this error is a
    /// Postgres 23P01. The name is quoted inside the error message.
    pub fn exclusion_constraint(&self) -> Option<&str> {
        match self {
            Self::Api {
                code: Some(code),
                message,
                ..
            } if code == "23P01" => {
                let start = message.find('"')? + 1;
                let len = message[start..].find('"')?;
                Some(&message[start..start + len])
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PostgrestError {
    fn from(err: reqwest::Error) -> Self {
        PostgrestError::Transport(err.to_string())
    }
}

/// Thin client over a PostgREST gateway. The API talks to the database as a
/// trusted service, so every request carries the service key; row-level
/// authorization happens in the handlers.
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.postgrest_url.clone(),
            service_key: config.postgrest_service_key.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key)).unwrap(),
        );

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, PostgrestError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, PostgrestError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers();
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gateway error ({}): {}", status, error_text);

            let parsed: Option<PostgrestErrorBody> = serde_json::from_str(&error_text).ok();
            let (code, message) = match parsed {
                Some(body) => (body.code, body.message.unwrap_or(error_text)),
                None => (None, error_text),
            };

            return Err(PostgrestError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PostgrestError::Decode(e.to_string()))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exclusion_constraint_name() {
        let err = PostgrestError::Api {
            status: 409,
            code: Some("23P01".to_string()),
            message: "conflicting key value violates exclusion constraint \
                      \"bookings_doctor_slot_excl\""
                .to_string(),
        };
        assert_eq!(err.exclusion_constraint(), Some("bookings_doctor_slot_excl"));
    }

    #[test]
    fn non_exclusion_errors_have_no_constraint() {
        let err = PostgrestError::Api {
            status: 409,
            code: Some("23505".to_string()),
            message: "duplicate key value violates unique constraint \"users_email_key\""
                .to_string(),
        };
        assert!(err.is_unique_violation());
        assert_eq!(err.exclusion_constraint(), None);
    }
}
