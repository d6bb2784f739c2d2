// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain Chief API client.
//!
//! Typed access to the `domains`, `contacts`, and `tlds` endpoints. All
//! input validation is synchronous and client-side; nothing reaches the
//! network until the parameters are known-good. List/detail responses must
//! carry a `{data, meta?}` envelope; a missing `data` field is a contract
//! violation, distinct from a transport error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::ApiClient;
use crate::auth::AuthManager;
use crate::error::Error;

/// Allowed values for the `expand` query parameter.
pub const VALID_EXPAND_VALUES: &[&str] = &["tld", "contacts"];

/// IANA DNSSEC algorithm numbers accepted by the registry.
const DNSSEC_ALGORITHMS: &[u8] = &[1, 2, 3, 5, 6, 7, 8, 10, 12, 13, 14, 15, 16, 17, 23];

const DEFAULT_BASE_URL: &str = "https://domain.chief.app/api/v1";

/// Query options for list endpoints.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub query: Option<String>,
    pub expand: Vec<String>,
}

impl ListOptions {
    /// Validate and build the query pairs. Empty expand omits the parameter;
    /// multiple values join into one comma-separated value.
    pub fn to_query(&self) -> Result<Vec<(&'static str, String)>, Error> {
        let mut query = pagination_query(self.page, self.per_page)?;

        if let Some(expand) = expand_value(&self.expand)? {
            query.push(("expand", expand));
        }

        if let Some(q) = &self.query {
            if q.is_empty() {
                return Err(Error::Validation(
                    "Query must be a non-empty string".to_owned(),
                ));
            }
            query.push(("query", q.clone()));
        }

        Ok(query)
    }
}

fn pagination_query(
    page: Option<u32>,
    per_page: Option<u32>,
) -> Result<Vec<(&'static str, String)>, Error> {
    let mut query = Vec::new();

    if let Some(page) = page {
        if page < 1 {
            return Err(Error::Validation("Page must be an integer >= 1".to_owned()));
        }
        query.push(("page", page.to_string()));
    }

    if let Some(per_page) = per_page {
        if !(1..=100).contains(&per_page) {
            return Err(Error::Validation(
                "Per page must be an integer between 1 and 100".to_owned(),
            ));
        }
        query.push(("per_page", per_page.to_string()));
    }

    Ok(query)
}

fn expand_value(values: &[String]) -> Result<Option<String>, Error> {
    let invalid: Vec<&str> = values
        .iter()
        .map(String::as_str)
        .filter(|v| !VALID_EXPAND_VALUES.contains(v))
        .collect();
    if !invalid.is_empty() {
        return Err(Error::Validation(format!(
            "Invalid expand values: {}. Allowed values are: {}",
            invalid.join(", "),
            VALID_EXPAND_VALUES.join(", "),
        )));
    }

    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(values.join(",")))
    }
}

/// A nameserver entry for registration with custom DNS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nameserver {
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
}

/// A DNSSEC key record submitted with a registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnssecKey {
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<u8>,
}

impl DnssecKey {
    fn validate(&self) -> Result<(), Error> {
        if self.public_key.is_empty() {
            return Err(Error::Validation(
                "Public key is required for DNSSEC keys".to_owned(),
            ));
        }
        if let Some(algorithm) = self.algorithm {
            if !DNSSEC_ALGORITHMS.contains(&algorithm) {
                return Err(Error::Validation("Invalid DNSSEC algorithm".to_owned()));
            }
        }
        if let Some(flags) = self.flags {
            if flags != 256 && flags != 257 {
                return Err(Error::Validation(
                    "Invalid DNSSEC flags. Must be 256 (ZSK) or 257 (KSK)".to_owned(),
                ));
            }
        }
        if let Some(protocol) = self.protocol {
            if protocol != 3 {
                return Err(Error::Validation(
                    "Invalid DNSSEC protocol. Must be 3".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

/// Parameters for registering or transferring a domain.
///
/// Hosted DNS and custom nameservers are mutually exclusive, as are WHOIS
/// privacy and custom contact disclosure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterParams {
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_using_hosted_dns: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<Vec<Nameserver>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_whois_privacy_enabled: Option<bool>,
    /// Contact type (`owner`, `admin`, `tech`, `billing`) to contact handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnssec_keys: Option<Vec<DnssecKey>>,
}

impl RegisterParams {
    pub fn validate(&self) -> Result<(), Error> {
        if self.domain.len() < 3 || self.domain.len() > 63 {
            return Err(Error::Validation(
                "Domain name must be between 3 and 63 characters".to_owned(),
            ));
        }

        if self.is_using_hosted_dns.is_some() && self.nameservers.is_some() {
            return Err(Error::Validation(
                "Cannot provide nameservers when using hosted DNS".to_owned(),
            ));
        }

        if self.is_using_hosted_dns.is_none() {
            if let Some(nameservers) = &self.nameservers {
                if nameservers.len() < 2 {
                    return Err(Error::Validation(
                        "At least two nameservers are required when not using hosted DNS"
                            .to_owned(),
                    ));
                }
            }
        }

        if self.is_whois_privacy_enabled.is_some() && self.contacts.is_some() {
            return Err(Error::Validation(
                "Cannot provide contacts when WHOIS privacy is enabled".to_owned(),
            ));
        }

        if let Some(keys) = &self.dnssec_keys {
            for key in keys {
                key.validate()?;
            }
        }

        Ok(())
    }
}

/// A domain row from the list endpoint. Unknown fields are preserved for
/// JSON output and detailed display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub is_autorenew_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renews_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tld: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A contact row from the contacts endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pagination block of a list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{data, meta?}` envelope of the domain list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainList {
    pub data: Vec<Domain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

/// `{data, meta?}` envelope of the contacts endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactList {
    pub data: Vec<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

fn envelope_error(endpoint: &str) -> Error {
    Error::ResponseFormat(format!("invalid response format from {endpoint} endpoint"))
}

/// Client for the domain registration API. All requests route through the
/// bearer-authenticated pipeline.
pub struct DomainClient {
    api: ApiClient,
}

impl DomainClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<AuthManager>) -> Result<Self, Error> {
        Ok(Self {
            api: ApiClient::new(base_url, auth)?,
        })
    }

    /// Create a client for the production API, honoring the
    /// `CHIEF_DOMAIN_API_URL` override.
    pub fn from_env(auth: Arc<AuthManager>) -> Result<Self, Error> {
        let base = std::env::var("CHIEF_DOMAIN_API_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Self::new(base, auth)
    }

    /// List domains for the authenticated team.
    pub async fn list_domains(&self, options: &ListOptions) -> Result<DomainList, Error> {
        let query = options.to_query()?;
        let value = self.api.get("domains", &query).await?;
        if value.get("data").and_then(Value::as_array).is_none() {
            return Err(envelope_error("domains"));
        }
        serde_json::from_value(value).map_err(|_| envelope_error("domains"))
    }

    /// List the team's registration contacts.
    pub async fn list_contacts(
        &self,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<ContactList, Error> {
        let query = pagination_query(page, per_page)?;
        let value = self.api.get("contacts", &query).await?;
        if value.get("data").and_then(Value::as_array).is_none() {
            return Err(envelope_error("contacts"));
        }
        serde_json::from_value(value).map_err(|_| envelope_error("contacts"))
    }

    /// Check whether a domain can be registered. Returns the availability
    /// status string (e.g. `"free"`).
    pub async fn check_availability(&self, domain: &str) -> Result<String, Error> {
        let path = format!("domains/availability/{}", urlencoded(domain));
        let value = self.api.get(&path, &[]).await?;
        value
            .get("data")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| envelope_error("availability"))
    }

    /// Register a new domain, or transfer one when `auth_code` is set.
    pub async fn register_or_transfer(&self, params: &RegisterParams) -> Result<Value, Error> {
        params.validate()?;
        let body = serde_json::to_value(params)
            .map_err(|e| Error::Validation(format!("cannot encode registration: {e}")))?;
        let value = self.api.post("domains", &body).await?;
        value
            .get("data")
            .cloned()
            .ok_or_else(|| envelope_error("domains"))
    }

    /// Fetch registry information for a TLD.
    pub async fn tld_info(&self, tld: &str) -> Result<Value, Error> {
        let path = format!("tlds/{}", urlencoded(tld));
        let value = self.api.get(&path, &[]).await?;
        match value.get("data") {
            Some(data) if data.is_object() => Ok(data.clone()),
            _ => Err(envelope_error("tlds")),
        }
    }
}

/// Minimal URL-encode for path segments (percent-encode non-unreserved
/// chars).
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod tests;
