//! Google OAuth for an installed application.
//!
//! Two files back this: the application credentials downloaded from
//! the Google Cloud console (`credentials.json`) and the authorized
//! user token written by `booker auth` (`token.json`). The token file
//! uses the same field names as Google's own client libraries so a
//! token generated elsewhere keeps working.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::BookingError;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

// Refresh a little early so a token doesn't expire mid-request
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: Option<String>,
    pub token_uri: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Unable to read credentials file {}: {}", path.display(), e))?;
        let file: CredentialsFile = serde_json::from_str(&content)?;
        file.installed
            .or(file.web)
            .ok_or(anyhow!("Credentials file {} has no installed or web client", path.display()))
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// A token without an expiry is treated as valid until the API
    /// says otherwise.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => false,
        }
    }

    fn apply(&mut self, resp: TokenResponse, now: DateTime<Utc>) {
        self.token = Some(resp.access_token);
        self.expiry = resp.expires_in.map(|secs| now + Duration::seconds(secs));
        // Google only sends a new refresh token on the initial exchange
        if let Some(refresh_token) = resp.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = resp.scope {
            self.scopes = scope.split_whitespace().map(String::from).collect();
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Build the URL the user opens to grant calendar access.
pub fn authorization_url(secrets: &ClientSecrets) -> String {
    let auth_uri = secrets.auth_uri.as_deref().unwrap_or(DEFAULT_AUTH_URI);
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        auth_uri,
        urlencoding::encode(&secrets.client_id),
        urlencoding::encode(secrets.redirect_uri()),
        urlencoding::encode(CALENDAR_SCOPE)
    )
}

/// Trade a one-time authorization code for a token that can be
/// refreshed from then on.
pub async fn exchange_code_for_token(secrets: &ClientSecrets, code: &str) -> Result<StoredToken> {
    let params = [
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", secrets.redirect_uri()),
    ];
    let res = reqwest::Client::new()
        .post(secrets.token_uri())
        .form(&params)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Token exchange failed: {} ({})", status, text);
    }
    let resp: TokenResponse = serde_json::from_str(&text)?;
    if resp.refresh_token.is_none() {
        anyhow::bail!("No refresh token in response");
    }

    let mut token = StoredToken {
        token: None,
        refresh_token: None,
        token_uri: Some(secrets.token_uri().to_string()),
        client_id: Some(secrets.client_id.clone()),
        client_secret: Some(secrets.client_secret.clone()),
        scopes: vec![CALENDAR_SCOPE.to_string()],
        expiry: None,
    };
    token.apply(resp, Utc::now());
    Ok(token)
}

/// Hands out access tokens, refreshing and persisting them as needed.
pub struct CredentialStore {
    token_path: PathBuf,
    credentials_path: PathBuf,
}

impl CredentialStore {
    pub fn new(token_path: &str, credentials_path: &str) -> Self {
        Self {
            token_path: PathBuf::from(token_path),
            credentials_path: PathBuf::from(credentials_path),
        }
    }

    pub fn load(&self) -> Result<Option<StoredToken>, BookingError> {
        if !self.token_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.token_path).map_err(|e| {
            BookingError::AuthenticationRequired(format!(
                "unable to read {}: {}",
                self.token_path.display(),
                e
            ))
        })?;
        let token = serde_json::from_str(&content).map_err(|e| {
            BookingError::AuthenticationRequired(format!(
                "unable to parse {}: {}",
                self.token_path.display(),
                e
            ))
        })?;
        Ok(Some(token))
    }

    pub fn save(&self, token: &StoredToken) -> Result<()> {
        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.token_path, content)
            .map_err(|e| anyhow!("Unable to write {}: {}", self.token_path.display(), e))?;
        Ok(())
    }

    /// A currently valid access token. Expired tokens are refreshed
    /// transparently when a refresh token is available.
    pub async fn access_token(&self) -> Result<String, BookingError> {
        let Some(mut token) = self.load()? else {
            return Err(BookingError::AuthenticationRequired(format!(
                "no token found at {}",
                self.token_path.display()
            )));
        };

        let now = Utc::now();
        if let Some(access_token) = &token.token {
            if !token.is_expired(now) {
                return Ok(access_token.clone());
            }
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            return Err(BookingError::AuthenticationRequired(
                "access token expired and no refresh token is stored".to_string(),
            ));
        };

        let (client_id, client_secret, token_uri) = self.client_for(&token)?;
        tracing::info!("Refreshing calendar access token");
        let resp = refresh_access_token(&token_uri, &client_id, &client_secret, &refresh_token).await?;
        token.apply(resp, Utc::now());
        if let Err(e) = self.save(&token) {
            tracing::error!("Failed to persist refreshed token: {}", e);
        }

        token
            .token
            .ok_or(BookingError::AuthenticationRequired("refresh returned no token".to_string()))
    }

    /// Client id, secret, and token endpoint for a refresh. Prefers what
    /// was saved alongside the token and falls back to the credentials
    /// file.
    fn client_for(&self, token: &StoredToken) -> Result<(String, String, String), BookingError> {
        if let (Some(id), Some(secret)) = (&token.client_id, &token.client_secret) {
            let token_uri = token
                .token_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
            return Ok((id.clone(), secret.clone(), token_uri));
        }
        let secrets = ClientSecrets::from_file(&self.credentials_path)
            .map_err(|e| BookingError::AuthenticationRequired(e.to_string()))?;
        let token_uri = token
            .token_uri
            .clone()
            .unwrap_or_else(|| secrets.token_uri().to_string());
        Ok((secrets.client_id, secrets.client_secret, token_uri))
    }
}

pub async fn refresh_access_token(
    token_uri: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenResponse, BookingError> {
    let params = [
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    let res = reqwest::Client::new()
        .post(token_uri)
        .form(&params)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if status.as_u16() == 400 || status.as_u16() == 401 {
        // invalid_grant: the refresh token was revoked or expired
        return Err(BookingError::AuthenticationRequired(format!(
            "token refresh rejected: {} ({})",
            status, text
        )));
    }
    if !status.is_success() {
        return Err(BookingError::Provider(format!(
            "token refresh failed: {} ({})",
            status, text
        )));
    }
    serde_json::from_str(&text)
        .map_err(|e| BookingError::Provider(format!("invalid token response: {}", e)))
}
