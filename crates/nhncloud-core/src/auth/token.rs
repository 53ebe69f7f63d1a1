//! OAuth2 client-credentials token cache.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::prelude::*;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NhnError, Result};
use crate::fsutil;
use crate::paths;

/// NHN Cloud OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth.api.nhncloudservice.com/oauth2/token/create";

/// A token is treated as expired this many seconds before its real expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Longest lifetime accepted from the token endpoint.
pub const MAX_EXPIRES_IN_SECS: i64 = 366 * 24 * 60 * 60;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cached bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds, counted from `issued_at`.
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
}

impl Token {
    /// Instant the token stops being accepted by the server.
    ///
    /// `None` when `expires_in` does not fit a timestamp; such a token is
    /// never valid.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.expires_in)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
    }

    /// True while more than five minutes of lifetime remain.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let deadline = TimeDelta::try_seconds(EXPIRY_MARGIN_SECS)
            .and_then(|margin| now.checked_add_signed(margin));
        match (deadline, self.expires_at()) {
            (Some(deadline), Some(expires_at)) => deadline < expires_at,
            _ => false,
        }
    }

    /// `Authorization`-style header value, e.g. `Bearer abc`.
    pub fn header_value(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "Bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", token_type, self.access_token)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    expires_in: i64,
}

/// Obtains and caches bearer tokens for one access key pair.
///
/// Every `get_token` call re-reads the cache file, so several managers
/// pointed at the same file stay consistent.
pub struct TokenManager {
    client: reqwest::Client,
    token_url: String,
    access_key_id: String,
    secret_access_key: String,
    cache_path: PathBuf,
}

impl TokenManager {
    /// Create a manager using the default endpoint and `~/.nhncloud/cache/token.json`.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Result<Self> {
        Self::with_cache_path(access_key_id, secret_access_key, paths::token_cache_path()?)
    }

    /// Create a manager with an explicit cache file.
    pub fn with_cache_path(
        access_key_id: &str,
        secret_access_key: &str,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NhnError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            cache_path: cache_path.into(),
        })
    }

    /// Override the token endpoint.
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Return the cached token if still valid, otherwise fetch a new one.
    pub async fn get_token(&self) -> Result<Token> {
        match self.load_cached() {
            Ok(Some(token)) if token.is_valid() => {
                tracing::debug!(expires_at = ?token.expires_at(), "Using cached access token");
                return Ok(token);
            }
            Ok(Some(_)) => tracing::debug!("Cached access token expired or about to expire"),
            Ok(None) => tracing::debug!("No cached access token"),
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable token cache"),
        }

        self.refresh_token().await
    }

    /// Exchange the access key pair for a new token and cache it.
    pub async fn refresh_token(&self) -> Result<Token> {
        let credentials = format!("{}:{}", self.access_key_id, self.secret_access_key);
        let basic = BASE64_STANDARD.encode(credentials);

        tracing::debug!("Requesting access token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| NhnError::Network(format!("Failed to request token: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NhnError::Network(format!("Failed to read token response: {}", e)))?;

        if status != reqwest::StatusCode::OK {
            return Err(NhnError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| NhnError::Json(format!("Failed to parse token response: {}", e)))?;
        if !(1..=MAX_EXPIRES_IN_SECS).contains(&parsed.expires_in) {
            return Err(NhnError::Json(format!(
                "Token response has out-of-range expires_in: {}",
                parsed.expires_in
            )));
        }

        let token = Token {
            access_token: parsed.access_token,
            token_type: parsed.token_type,
            expires_in: parsed.expires_in,
            issued_at: Utc::now(),
        };

        self.save(&token)?;
        tracing::info!(expires_in = token.expires_in, "Access token refreshed");
        Ok(token)
    }

    /// Delete the cache file.
    pub fn clear_token(&self) -> Result<()> {
        fsutil::remove_if_exists(&self.cache_path)
    }

    /// Read the cache file; `Ok(None)` when it does not exist.
    pub fn load_cached(&self) -> Result<Option<Token>> {
        let content = match std::fs::read_to_string(&self.cache_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(NhnError::Io(format!(
                    "Failed to read token cache {}: {}",
                    self.cache_path.display(),
                    e
                )))
            }
        };
        let token = serde_json::from_str(&content)
            .map_err(|e| NhnError::Json(format!("Corrupt token cache: {}", e)))?;
        Ok(Some(token))
    }

    fn save(&self, token: &Token) -> Result<()> {
        fsutil::write_json(&self.cache_path, token, Some(fsutil::PRIVATE_FILE_MODE))
    }
}
