// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authentication lifecycle: OAuth2 device-authorization flow, token
//! refresh, and team-context tracking.
//!
//! Endpoints are discovered from the OpenID configuration document, fetched
//! lazily once per [`AuthManager`] instance and cached for its lifetime.
//! Tokens and the active team are persisted through [`ConfigStore`]; the
//! record is only mutated after a fully-formed successful response.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::api;
use crate::error::Error;
use crate::store::{ConfigStore, Key};

/// OAuth client id registered for this CLI.
pub const CLIENT_ID: &str = "clichief";

/// Scopes requested on login; `offline_access` yields the refresh token.
pub const SCOPES: &str = "profile email teams offline_access domainchief";

const DEFAULT_OPENID_CONFIG_URL: &str =
    "https://account.chief.app/.well-known/openid-configuration";

/// OpenID configuration document: endpoint names mapped to URLs.
///
/// Fetched once per process, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenIdConfig {
    #[serde(default)]
    token_endpoint: Option<String>,
    #[serde(default)]
    device_authorization_endpoint: Option<String>,
    #[serde(default)]
    userinfo_endpoint: Option<String>,
    #[serde(default)]
    revocation_endpoint: Option<String>,
    #[serde(default)]
    introspection_endpoint: Option<String>,
}

impl OpenIdConfig {
    fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Error> {
        value
            .as_deref()
            .ok_or_else(|| Error::ResponseFormat(format!("OpenID configuration is missing {name}")))
    }

    pub fn token_endpoint(&self) -> Result<&str, Error> {
        Self::require(&self.token_endpoint, "token_endpoint")
    }

    pub fn device_authorization_endpoint(&self) -> Result<&str, Error> {
        Self::require(
            &self.device_authorization_endpoint,
            "device_authorization_endpoint",
        )
    }

    pub fn userinfo_endpoint(&self) -> Result<&str, Error> {
        Self::require(&self.userinfo_endpoint, "userinfo_endpoint")
    }

    pub fn revocation_endpoint(&self) -> Result<&str, Error> {
        Self::require(&self.revocation_endpoint, "revocation_endpoint")
    }

    pub fn introspection_endpoint(&self) -> Option<&str> {
        self.introspection_endpoint.as_deref()
    }
}

/// Response from the device authorization endpoint (RFC 8628).
///
/// All four non-optional fields are required; a response without them is a
/// contract violation.
#[derive(Debug, Deserialize)]
struct DeviceAuthResponse {
    device_code: String,
    verification_uri_complete: String,
    expires_in: u64,
    interval: u64,
    #[serde(default)]
    user_code: Option<String>,
}

/// An in-flight device authorization, valid for `expires_in` seconds from
/// issuance. Never persisted.
#[derive(Debug, Clone)]
pub struct DeviceAuthSession {
    pub device_code: String,
    pub verification_uri_complete: String,
    pub expires_in: u64,
    pub interval: u64,
    pub user_code: Option<String>,
    issued_at: Instant,
}

impl DeviceAuthSession {
    fn expired(&self) -> bool {
        self.issued_at.elapsed() >= Duration::from_secs(self.expires_in)
    }
}

/// Token response during device code polling.
#[derive(Debug, Deserialize)]
struct DeviceTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Access/refresh token pair returned by a completed device flow.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<u64>,
}

/// A team the authenticated user belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub slug: String,
    pub name: String,
}

/// Payload of the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub teams: Vec<Team>,
}

fn no_teams_error() -> Error {
    Error::ResponseFormat("user info contained no teams".to_owned())
}

/// Drives the device-authorization flow, token refresh, and
/// authentication-state queries.
pub struct AuthManager {
    http: reqwest::Client,
    store: Mutex<ConfigStore>,
    openid_url: String,
    openid: OnceCell<OpenIdConfig>,
}

impl AuthManager {
    /// Create a manager discovering endpoints from `openid_url`.
    pub fn new(store: ConfigStore, openid_url: impl Into<String>) -> Result<Self, Error> {
        Ok(Self {
            http: api::http_client()?,
            store: Mutex::new(store),
            openid_url: openid_url.into(),
            openid: OnceCell::new(),
        })
    }

    /// Create a manager with the production OpenID configuration URL,
    /// honoring the `CHIEF_OPENID_CONFIG_URL` override.
    pub fn from_env(store: ConfigStore) -> Result<Self, Error> {
        let url = std::env::var("CHIEF_OPENID_CONFIG_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_OPENID_CONFIG_URL.to_owned());
        Self::new(store, url)
    }

    async fn openid_config(&self) -> Result<&OpenIdConfig, Error> {
        self.openid
            .get_or_try_init(|| async {
                let resp = self
                    .http
                    .get(&self.openid_url)
                    .send()
                    .await
                    .map_err(|e| Error::transport(&e))?;
                if !resp.status().is_success() {
                    return Err(api::response_error(resp).await);
                }
                resp.json::<OpenIdConfig>().await.map_err(|_| {
                    Error::ResponseFormat("OpenID configuration could not be decoded".to_owned())
                })
            })
            .await
    }

    /// Start a device authorization and return the session to poll.
    pub async fn initiate_device_auth(&self) -> Result<DeviceAuthSession, Error> {
        let config = self.openid_config().await?;
        let endpoint = config.device_authorization_endpoint()?.to_owned();

        let resp = self
            .http
            .post(&endpoint)
            .json(&json!({ "client_id": CLIENT_ID, "scope": SCOPES }))
            .send()
            .await
            .map_err(|e| Error::transport(&e))?;
        if !resp.status().is_success() {
            return Err(api::response_error(resp).await);
        }

        let auth: DeviceAuthResponse = resp.json().await.map_err(|_| {
            Error::ResponseFormat(
                "device authorization response is missing required fields".to_owned(),
            )
        })?;

        Ok(DeviceAuthSession {
            device_code: auth.device_code,
            verification_uri_complete: auth.verification_uri_complete,
            expires_in: auth.expires_in,
            interval: auth.interval,
            user_code: auth.user_code,
            issued_at: Instant::now(),
        })
    }

    /// Poll the token endpoint until the user approves, denies, or the
    /// session expires.
    ///
    /// Returns `Ok(None)` on denial or expiry; the caller treats that as
    /// "try again". Transport failures and undecodable bodies are transient:
    /// sleep one interval and retry. The expiry check is wall-clock per
    /// iteration, so a slow request may overrun `expires_in` slightly.
    pub async fn poll_for_token(
        &self,
        session: &DeviceAuthSession,
    ) -> Result<Option<TokenPair>, Error> {
        let token_endpoint = self.openid_config().await?.token_endpoint()?.to_owned();
        let body = json!({
            "client_id": CLIENT_ID,
            "device_code": session.device_code,
            "grant_type": "urn:ietf:params:oauth:grant-type:device_code",
        });
        let interval = Duration::from_secs(session.interval);

        while !session.expired() {
            match self.http.post(&token_endpoint).json(&body).send().await {
                Ok(resp) => {
                    let token: DeviceTokenResponse = match resp.json().await {
                        Ok(token) => token,
                        Err(e) => {
                            debug!("undecodable token response, retrying: {e}");
                            tokio::time::sleep(interval).await;
                            continue;
                        }
                    };

                    match token.error.as_deref() {
                        None => {
                            if let (Some(access_token), Some(refresh_token)) =
                                (token.access_token, token.refresh_token)
                            {
                                return Ok(Some(TokenPair {
                                    access_token,
                                    refresh_token,
                                    expires_in: token.expires_in,
                                }));
                            }
                            debug!("token response without tokens or error, retrying");
                        }
                        Some("authorization_pending") => {}
                        // Denied, expired_token, or anything else: give up.
                        Some(error) => {
                            debug!(error, "device authorization not granted");
                            return Ok(None);
                        }
                    }
                }
                Err(e) => {
                    debug!("token poll request failed, retrying: {e}");
                }
            }

            tokio::time::sleep(interval).await;
        }

        Ok(None)
    }

    /// Persist the token pair and derive the active team from userinfo.
    ///
    /// The first team in server order becomes the active team.
    pub async fn complete_authentication(&self, tokens: &TokenPair) -> Result<UserInfo, Error> {
        let userinfo_endpoint = self.openid_config().await?.userinfo_endpoint()?.to_owned();
        let user = self
            .fetch_user_info(&userinfo_endpoint, &tokens.access_token)
            .await?;

        let team = user.teams.first().ok_or_else(no_teams_error)?;
        self.store
            .lock()
            .update_auth_data(
                &tokens.access_token,
                &tokens.refresh_token,
                &team.slug,
                &team.name,
            )
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(user)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Returns `Ok(false)` without any network call when no refresh token is
    /// stored. Non-2xx token responses surface as [`Error::Api`] so the
    /// request pipeline can distinguish 400-class rejections; a 2xx response
    /// without `access_token` is a contract violation. On success the team
    /// context is re-derived from userinfo and the record persisted.
    pub async fn refresh_access_token(&self) -> Result<bool, Error> {
        let refresh_token = match self.store.lock().get(Key::RefreshToken) {
            Some(token) => token.to_owned(),
            None => return Ok(false),
        };

        let config = self.openid_config().await?;
        let token_endpoint = config.token_endpoint()?.to_owned();
        let userinfo_endpoint = config.userinfo_endpoint()?.to_owned();

        let resp = self
            .http
            .post(&token_endpoint)
            .json(&json!({
                "client_id": CLIENT_ID,
                "refresh_token": refresh_token,
                "grant_type": "refresh_token",
                "scope": SCOPES,
            }))
            .send()
            .await
            .map_err(|e| Error::transport(&e))?;
        if !resp.status().is_success() {
            return Err(api::response_error(resp).await);
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|_| Error::ResponseFormat("token response could not be decoded".to_owned()))?;
        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::ResponseFormat("token response is missing access_token".to_owned())
            })?;
        // A response without a new refresh token keeps the previous one.
        let new_refresh = body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .unwrap_or(&refresh_token);

        let user = self.fetch_user_info(&userinfo_endpoint, access_token).await?;
        let team = user.teams.first().ok_or_else(no_teams_error)?;

        self.store
            .lock()
            .update_auth_data(access_token, new_refresh, &team.slug, &team.name)
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(true)
    }

    /// Best-effort token revocation; errors are logged and swallowed.
    ///
    /// Revoking the refresh token invalidates the access token server-side,
    /// so only one token is sent, preferring the refresh token.
    pub async fn revoke_tokens(&self) {
        let (access, refresh) = {
            let store = self.store.lock();
            (
                store.get(Key::AccessToken).map(str::to_owned),
                store.get(Key::RefreshToken).map(str::to_owned),
            )
        };
        let Some(token) = refresh.or(access) else {
            return;
        };

        let endpoint = match self.openid_config().await {
            Ok(config) => match config.revocation_endpoint() {
                Ok(endpoint) => endpoint.to_owned(),
                Err(e) => {
                    debug!("token revocation skipped: {e}");
                    return;
                }
            },
            Err(e) => {
                debug!("token revocation skipped: {e}");
                return;
            }
        };

        match self
            .http
            .post(&endpoint)
            .json(&json!({ "client_id": CLIENT_ID, "token": token }))
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                debug!(status = %resp.status(), "token revocation failed");
            }
            Ok(_) => {}
            Err(e) => debug!("token revocation failed: {e}"),
        }
    }

    async fn fetch_user_info(&self, endpoint: &str, bearer: &str) -> Result<UserInfo, Error> {
        let resp = self
            .http
            .get(endpoint)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| Error::transport(&e))?;
        if !resp.status().is_success() {
            return Err(api::response_error(resp).await);
        }
        resp.json()
            .await
            .map_err(|_| Error::ResponseFormat("user info could not be decoded".to_owned()))
    }

    // -- Authentication-state queries (pure store reads) --------------------

    pub fn is_authenticated(&self) -> bool {
        self.store.lock().has(Key::AccessToken)
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.store.lock().get(Key::AccessToken).map(str::to_owned)
    }

    pub fn team_slug(&self) -> Option<String> {
        self.store.lock().get(Key::TeamSlug).map(str::to_owned)
    }

    pub fn team_name(&self) -> Option<String> {
        self.store.lock().get(Key::TeamName).map(str::to_owned)
    }

    pub fn has_team(&self) -> bool {
        self.store.lock().has(Key::TeamSlug)
    }

    /// Reset the credential record to defaults (full logout).
    pub fn clear_auth_data(&self) -> Result<(), Error> {
        self.store
            .lock()
            .reset()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
