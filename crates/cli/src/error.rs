// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Unified error type for the auth lifecycle, request pipeline, and domain
/// API client.
#[derive(Debug)]
pub enum Error {
    /// No access token stored; the command needs a login before any network
    /// call is attempted.
    NotAuthenticated,
    /// Connectivity failure (DNS, refused connection, timeout).
    Transport(String),
    /// Well-formed HTTP response missing expected fields; a server contract
    /// violation, never retried.
    ResponseFormat(String),
    /// Malformed client-supplied input, rejected before any network call.
    Validation(String),
    /// Unrecoverable authentication failure that survived the refresh/retry
    /// pipeline. Only the CLI entry point may turn this into a process exit.
    AuthRequired(String),
    /// Non-2xx HTTP response other than the 401s handled by the pipeline.
    Api { status: u16, message: String },
    /// Credential file could not be read or written.
    Config(String),
}

impl Error {
    /// Process exit code for this error: `2` for invalid invocation,
    /// `1` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            _ => 1,
        }
    }

    /// True for `Api` errors with a 4xx status.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if (400..500).contains(status))
    }

    /// Classify a reqwest failure: connectivity problems get the
    /// check-your-connection message, everything else is reported as-is.
    pub fn transport(err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Transport(
                "Failed to connect. Please check your internet connection and try again."
                    .to_owned(),
            )
        } else {
            Self::Transport(format!("request failed: {err}"))
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => {
                f.write_str("Use 'chief auth login' to authenticate first.")
            }
            Self::Transport(msg) => f.write_str(msg),
            Self::ResponseFormat(msg) => write!(f, "unexpected response from server: {msg}"),
            Self::Validation(msg) => f.write_str(msg),
            Self::AuthRequired(msg) => f.write_str(msg),
            Self::Api { status, message } => write!(f, "API request failed ({status}): {message}"),
            Self::Config(msg) => write!(f, "credential store error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(&err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
