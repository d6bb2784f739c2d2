// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `chief auth` — login, logout, whoami.

use std::sync::Arc;

use clap::Subcommand;

use crate::api::ApiClient;
use crate::auth::{AuthManager, UserInfo};
use crate::error::Error;
use crate::store::ConfigStore;

const DEFAULT_AUTH_URL: &str = "https://account.chief.app";

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Authenticate with a Chief Tools account
    Login,
    /// Log out of the authenticated Chief Tools account
    Logout,
    /// Display active account and authentication state
    Whoami,
}

/// Run an `auth` subcommand. Returns a process exit code.
pub async fn run(command: AuthCommand) -> i32 {
    let auth = match manager() {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let result = match command {
        AuthCommand::Login => login(&auth).await,
        AuthCommand::Logout => logout(&auth).await,
        AuthCommand::Whoami => whoami(auth).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

fn manager() -> Result<Arc<AuthManager>, Error> {
    let store = ConfigStore::open_default().map_err(|e| Error::Config(e.to_string()))?;
    Ok(Arc::new(AuthManager::from_env(store)?))
}

fn auth_base_url() -> String {
    std::env::var("CHIEF_AUTH_URL")
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_AUTH_URL.to_owned())
}

async fn login(auth: &AuthManager) -> Result<i32, Error> {
    if auth.is_authenticated() {
        println!("Already authenticated; a new login will replace the current session.");
    }

    let session = auth.initiate_device_auth().await?;

    println!("Opening browser for authentication...");
    if let Some(code) = &session.user_code {
        println!("Confirmation code: {code}");
    }
    open_browser(&session.verification_uri_complete);

    println!("Waiting for authentication...");
    let Some(tokens) = auth.poll_for_token(&session).await? else {
        eprintln!("Authentication request expired, please try again!");
        return Ok(1);
    };

    auth.complete_authentication(&tokens).await?;
    println!("Successfully authenticated!");
    Ok(0)
}

async fn logout(auth: &AuthManager) -> Result<i32, Error> {
    // Best-effort; logout proceeds even if revocation fails.
    auth.revoke_tokens().await;
    auth.clear_auth_data()?;
    println!("Successfully logged out.");
    Ok(0)
}

async fn whoami(auth: Arc<AuthManager>) -> Result<i32, Error> {
    if !auth.is_authenticated() {
        eprintln!("Not logged in. Use \"chief auth login\" to authenticate.");
        return Ok(1);
    }

    let api = ApiClient::new(auth_base_url(), Arc::clone(&auth))?;
    let value = api.get("oauth/userinfo", &[]).await?;
    let user: UserInfo = serde_json::from_value(value)
        .map_err(|_| Error::ResponseFormat("user info could not be decoded".to_owned()))?;

    let (Some(name), Some(email)) = (&user.name, &user.email) else {
        return Err(Error::ResponseFormat(
            "user info is missing name or email".to_owned(),
        ));
    };
    let team = user
        .teams
        .first()
        .ok_or_else(|| Error::ResponseFormat("user info contained no teams".to_owned()))?;

    println!("Currently logged in as: {name} ({email}) with team {}", team.name);
    Ok(0)
}

// On macOS use `open`, on Linux use `xdg-open`, on Windows use `start`.
fn open_browser(url: &str) {
    let cmd = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "start"
    } else {
        "xdg-open"
    };

    match std::process::Command::new(cmd).arg(url).spawn() {
        Ok(_) => eprintln!("Opening {url}"),
        Err(e) => {
            eprintln!("Failed to open browser: {e}");
            eprintln!("Open manually: {url}");
        }
    }
}
