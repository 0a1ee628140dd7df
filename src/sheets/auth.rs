//! Service Account Authentication
//!
//! Exchanges a signed JWT assertion for an OAuth2 access token
//! (the `jwt-bearer` grant) and caches it until shortly before it expires.

use crate::{config::ServiceAccountKey, sheets::StoreError};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before the backend would reject them
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Access tokens for one service account
pub struct TokenSource {
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Parse the service account's private key
    ///
    /// Fails when the key is not a valid RSA PEM.
    pub fn new(key: &ServiceAccountKey, http: reqwest::Client) -> Result<Self, StoreError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key_pem().as_bytes())
            .map_err(|e| StoreError::Auth(format!("invalid service account private key: {e}")))?;

        Ok(Self {
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            signing_key,
            http,
            cached: Mutex::new(None),
        })
    }

    /// A valid access token, fetching a new one if the cached token is missing or stale
    pub async fn token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - REFRESH_MARGIN_SECS > now {
                return Ok(token.access_token.clone());
            }
            debug!("Access token for {} is about to expire", self.client_email);
        }

        let fresh = self.fetch(now).await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    /// Drop the cached token so the next call re-authenticates
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    fn assertion(&self, now: i64) -> Result<String, StoreError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| StoreError::Auth(format!("cannot sign assertion: {e}")))
    }

    async fn fetch(&self, now: i64) -> Result<CachedToken, StoreError> {
        let assertion = self.assertion(now)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        info!("Obtained access token for {}", self.client_email);
        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}
