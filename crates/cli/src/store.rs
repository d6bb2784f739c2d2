// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent credential store.
//!
//! A flat key-value record (`access_token`, `refresh_token`, `team_slug`,
//! `team_name`) serialized as JSON under the per-user config directory.
//! The file is created with null defaults on first use and rewritten
//! wholesale on every mutation. Concurrent CLI invocations are not guarded;
//! last writer wins.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

const CONFIG_FILE: &str = "config.json";

/// Keys of the credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    AccessToken,
    RefreshToken,
    TeamSlug,
    TeamName,
}

/// The on-disk credential record. All fields default to null.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    team_slug: Option<String>,
    #[serde(default)]
    team_name: Option<String>,
}

impl CredentialRecord {
    fn field(&self, key: Key) -> &Option<String> {
        match key {
            Key::AccessToken => &self.access_token,
            Key::RefreshToken => &self.refresh_token,
            Key::TeamSlug => &self.team_slug,
            Key::TeamName => &self.team_name,
        }
    }

    fn field_mut(&mut self, key: Key) -> &mut Option<String> {
        match key {
            Key::AccessToken => &mut self.access_token,
            Key::RefreshToken => &mut self.refresh_token,
            Key::TeamSlug => &mut self.team_slug,
            Key::TeamName => &mut self.team_name,
        }
    }
}

/// File-backed credential store.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    record: CredentialRecord,
}

impl ConfigStore {
    /// Open the store in the default location: `$CHIEF_CONFIG_DIR`, falling
    /// back to `$HOME/.config/chief`.
    pub fn open_default() -> anyhow::Result<Self> {
        let dir = match std::env::var("CHIEF_CONFIG_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var("HOME")
                    .map_err(|_| anyhow::anyhow!("HOME is not set; cannot locate config dir"))?;
                Path::new(&home).join(".config").join("chief")
            }
        };
        Self::open(&dir)
    }

    /// Open (creating if needed) the store under `dir`.
    ///
    /// A missing file is seeded with all-null defaults; an unparsable file
    /// is replaced with defaults rather than aborting the command.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("cannot create config dir {}: {e}", dir.display()))?;

        let path = dir.join(CONFIG_FILE);
        let record = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
            match serde_json::from_str(&data) {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), "unparsable credential file, resetting: {e}");
                    CredentialRecord::default()
                }
            }
        } else {
            CredentialRecord::default()
        };

        let store = Self { path, record };
        if !store.path.exists() {
            store.write()?;
        }
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: Key) -> Option<&str> {
        self.record.field(key).as_deref()
    }

    pub fn has(&self, key: Key) -> bool {
        self.record.field(key).is_some()
    }

    pub fn set(&mut self, key: Key, value: impl Into<String>) -> anyhow::Result<()> {
        *self.record.field_mut(key) = Some(value.into());
        self.write()
    }

    pub fn remove(&mut self, key: Key) -> anyhow::Result<()> {
        *self.record.field_mut(key) = None;
        self.write()
    }

    /// Reset the record to all-null defaults (full logout).
    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.record = CredentialRecord::default();
        self.write()
    }

    /// Persist a complete set of auth data in one write.
    pub fn update_auth_data(
        &mut self,
        access_token: &str,
        refresh_token: &str,
        team_slug: &str,
        team_name: &str,
    ) -> anyhow::Result<()> {
        self.record.access_token = Some(access_token.to_owned());
        self.record.refresh_token = Some(refresh_token.to_owned());
        self.record.team_slug = Some(team_slug.to_owned());
        self.record.team_name = Some(team_name.to_owned());
        self.write()
    }

    // Atomic write: write to tmp file then rename.
    fn write(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.record)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| anyhow::anyhow!("cannot write {}: {e}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| anyhow::anyhow!("cannot rename {}: {e}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
