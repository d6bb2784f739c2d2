// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-authenticated request pipeline.
//!
//! Every authenticated request gets `Authorization`/`X-Chief-Team` headers
//! read from the credential store at call time, and 401 responses trigger at
//! most one token refresh followed by a single resend. Unrecoverable auth
//! failures surface as [`Error::AuthRequired`]; only the CLI entry point
//! turns those into a process exit.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::auth::AuthManager;
use crate::error::Error;

/// Fixed User-Agent identifying the client and version.
pub const USER_AGENT: &str = concat!(
    "ChiefToolsCLI/",
    env!("CARGO_PKG_VERSION"),
    " (+https://aka.chief.app/cli)"
);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client with sane timeouts and the fixed User-Agent.
pub(crate) fn http_client() -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| Error::Transport(format!("cannot build HTTP client: {e}")))
}

/// Turn a non-2xx response into an [`Error::Api`], extracting any
/// server-supplied message from the body.
pub(crate) async fn response_error(resp: reqwest::Response) -> Error {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_owned))
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body
            }
        });
    Error::Api { status, message }
}

/// Immutable request builder over a base URL. Credentials are read from the
/// store at call time, so a refresh between attempts is picked up without
/// rebuilding the client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<AuthManager>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<AuthManager>) -> Result<Self, Error> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth,
        })
    }

    /// GET `path` with the given query pairs.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, Error> {
        self.execute(Method::GET, path, query, None).await
    }

    /// POST `path` with a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, Error> {
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        if !self.auth.is_authenticated() {
            return Err(Error::NotAuthenticated);
        }

        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        // The retry marker is local to this call, never shared state, so
        // sequential requests cannot cross-contaminate retry counts.
        let mut retried = false;
        loop {
            let Some(token) = self.auth.bearer_token() else {
                return Err(Error::NotAuthenticated);
            };

            let mut req = self
                .http
                .request(method.clone(), &url)
                .header(reqwest::header::ACCEPT, "application/json")
                .bearer_auth(token);
            if let Some(slug) = self.auth.team_slug() {
                req = req.header("X-Chief-Team", slug);
            }
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            let resp = req.send().await.map_err(|e| Error::transport(&e))?;

            if resp.status() == StatusCode::UNAUTHORIZED && !retried {
                self.recover_auth().await?;
                retried = true;
                continue;
            }

            // A 401 on the resend passes through like any other error status.
            return Self::decode(resp).await;
        }
    }

    /// Attempt exactly one token refresh after a 401.
    async fn recover_auth(&self) -> Result<(), Error> {
        match self.auth.refresh_access_token().await {
            Ok(true) => {
                debug!("access token refreshed after 401");
                Ok(())
            }
            // No refresh token stored; the session cannot be recovered.
            Ok(false) => {
                let _ = self.auth.clear_auth_data();
                Err(Error::AuthRequired(
                    "You must be authenticated to use this command, \
                     run `chief auth login` to get started!"
                        .to_owned(),
                ))
            }
            // The authorization server rejected the refresh token itself.
            Err(err) if err.is_client_error() => {
                let _ = self.auth.clear_auth_data();
                Err(Error::AuthRequired(
                    "Your authentication token is no longer valid, \
                     please run `chief auth login` to re-authenticate."
                        .to_owned(),
                ))
            }
            Err(err) => Err(Error::AuthRequired(format!(
                "An error occurred while refreshing your access token: {err}"
            ))),
        }
    }

    async fn decode(resp: reqwest::Response) -> Result<Value, Error> {
        if !resp.status().is_success() {
            return Err(response_error(resp).await);
        }
        resp.json()
            .await
            .map_err(|_| Error::ResponseFormat("response body is not valid JSON".to_owned()))
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
