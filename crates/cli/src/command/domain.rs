// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `chief domain` — list, register, availability, contacts, tld.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::auth::AuthManager;
use crate::domain::{
    Contact, DnssecKey, Domain, DomainClient, ListOptions, Nameserver, PaginationMeta,
    RegisterParams,
};
use crate::error::Error;
use crate::store::ConfigStore;

const CONTACT_TYPES: &[&str] = &["owner", "admin", "tech", "billing"];

#[derive(Subcommand)]
pub enum DomainCommand {
    /// List all domains
    List(ListArgs),
    /// Register a new domain name, or transfer one with --auth-code
    Register(RegisterArgs),
    /// Check if a domain is available for registration
    Availability {
        /// Domain name to check
        domain: String,
    },
    /// List registration contacts
    Contacts(ContactsArgs),
    /// Show registry information for a TLD
    Tld {
        /// TLD to look up (e.g. "dev")
        tld: String,
    },
}

#[derive(Args)]
pub struct ListArgs {
    /// Page number for listing
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Items per page
    #[arg(long = "per-page", default_value = "25")]
    pub per_page: u32,

    /// Filter domains by name
    #[arg(long)]
    pub query: Option<String>,

    /// Expand related data (tld, contacts); repeatable or comma-separated
    #[arg(long)]
    pub expand: Vec<String>,

    /// Output format (table, json)
    #[arg(long, default_value = "table")]
    pub format: String,

    /// Show detailed domain information
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Domain name to register or transfer
    pub domain: String,

    /// Authorization code for a domain transfer
    #[arg(long = "auth-code")]
    pub auth_code: Option<String>,

    /// Use hosted DNS instead of custom nameservers
    #[arg(long = "hosted-dns")]
    pub hosted_dns: bool,

    /// Custom nameserver as HOSTNAME[,IPV4[,IPV6]]; repeatable, at least two
    /// required without --hosted-dns
    #[arg(long = "ns", value_parser = parse_nameserver)]
    pub nameservers: Vec<Nameserver>,

    /// Enable WHOIS privacy
    #[arg(long = "whois-privacy")]
    pub whois_privacy: bool,

    /// Contact assignment as TYPE=HANDLE (owner, admin, tech, billing);
    /// repeatable
    #[arg(long = "contact", value_parser = parse_contact)]
    pub contacts: Vec<(String, String)>,

    /// DNSSEC key as PUBKEY[:ALGORITHM[:FLAGS[:PROTOCOL]]]; repeatable
    #[arg(long = "dnssec-key", value_parser = parse_dnssec_key)]
    pub dnssec_keys: Vec<DnssecKey>,
}

#[derive(Args)]
pub struct ContactsArgs {
    /// Page number for listing
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Items per page
    #[arg(long = "per-page", default_value = "25")]
    pub per_page: u32,
}

/// Run a `domain` subcommand. Returns a process exit code.
pub async fn run(command: DomainCommand) -> i32 {
    let result = match command {
        DomainCommand::List(args) => list(args).await,
        DomainCommand::Register(args) => register(args).await,
        DomainCommand::Availability { domain } => availability(&domain).await,
        DomainCommand::Contacts(args) => contacts(args).await,
        DomainCommand::Tld { tld } => tld_info(&tld).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

fn client() -> Result<DomainClient, Error> {
    let store = ConfigStore::open_default().map_err(|e| Error::Config(e.to_string()))?;
    let auth = Arc::new(AuthManager::from_env(store)?);
    DomainClient::from_env(auth)
}

async fn list(args: ListArgs) -> Result<i32, Error> {
    if args.format != "table" && args.format != "json" {
        return Err(Error::Validation(format!(
            "invalid format: {} (expected table or json)",
            args.format
        )));
    }

    let options = ListOptions {
        page: Some(args.page),
        per_page: Some(args.per_page),
        query: args.query.clone(),
        expand: split_expand(&args.expand),
    };

    let list = client()?.list_domains(&options).await?;

    if list.data.is_empty() {
        println!("No domains found.");
        return Ok(0);
    }

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&list)
            .map_err(|e| Error::ResponseFormat(format!("cannot encode response: {e}")))?;
        println!("{json}");
        return Ok(0);
    }

    if args.detailed {
        print_detailed_domains(&list.data);
    } else {
        print_domain_table(&list.data);
    }
    if let Some(meta) = &list.meta {
        print_pagination(meta);
    }
    Ok(0)
}

async fn register(args: RegisterArgs) -> Result<i32, Error> {
    let params = RegisterParams {
        domain: args.domain.clone(),
        auth_code: args.auth_code.clone(),
        is_using_hosted_dns: args.hosted_dns.then_some(true),
        nameservers: if args.nameservers.is_empty() {
            None
        } else {
            Some(args.nameservers.clone())
        },
        is_whois_privacy_enabled: args.whois_privacy.then_some(true),
        contacts: if args.contacts.is_empty() {
            None
        } else {
            Some(args.contacts.iter().cloned().collect())
        },
        dnssec_keys: if args.dnssec_keys.is_empty() {
            None
        } else {
            Some(args.dnssec_keys.clone())
        },
    };
    // Reject malformed input before touching the network.
    params.validate()?;

    let domains = client()?;
    let status = domains.check_availability(&args.domain).await?;
    let is_transfer = status != "free";

    if is_transfer {
        if params.auth_code.is_none() {
            eprintln!(
                "{} is already registered. Pass --auth-code to transfer it.",
                args.domain
            );
            return Ok(1);
        }
        println!("Transferring {}...", args.domain);
    } else {
        println!("Domain {} is available for registration!", args.domain);
        println!("Registering {}...", args.domain);
    }

    let record = domains.register_or_transfer(&params).await?;
    let action = if is_transfer { "transferred" } else { "registered" };
    println!("Successfully {action} domain: {}", args.domain);
    print_record(&record);
    Ok(0)
}

async fn availability(domain: &str) -> Result<i32, Error> {
    let status = client()?.check_availability(domain).await?;
    if status == "free" {
        println!("Domain {domain} is available for registration!");
    } else {
        println!("Domain {domain} is not available ({status}).");
    }
    Ok(0)
}

async fn contacts(args: ContactsArgs) -> Result<i32, Error> {
    let list = client()?
        .list_contacts(Some(args.page), Some(args.per_page))
        .await?;

    if list.data.is_empty() {
        println!("No contacts found.");
        return Ok(0);
    }

    print_contact_table(&list.data);
    if let Some(meta) = &list.meta {
        print_pagination(meta);
    }
    Ok(0)
}

async fn tld_info(tld: &str) -> Result<i32, Error> {
    let info = client()?.tld_info(tld).await?;
    print_record(&info);
    Ok(0)
}

// -- Flag value parsers -----------------------------------------------------

fn parse_nameserver(value: &str) -> Result<Nameserver, String> {
    let mut parts = value.split(',').map(str::trim);
    let hostname = parts
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| "nameserver hostname is required".to_owned())?
        .to_owned();
    let ipv4 = parts.next().filter(|v| !v.is_empty()).map(str::to_owned);
    let ipv6 = parts.next().filter(|v| !v.is_empty()).map(str::to_owned);
    if parts.next().is_some() {
        return Err("expected HOSTNAME[,IPV4[,IPV6]]".to_owned());
    }
    Ok(Nameserver {
        hostname,
        ipv4,
        ipv6,
    })
}

fn parse_contact(value: &str) -> Result<(String, String), String> {
    let (kind, handle) = value
        .split_once('=')
        .ok_or_else(|| "expected TYPE=HANDLE".to_owned())?;
    let kind = kind.trim().to_lowercase();
    let handle = handle.trim();
    if !CONTACT_TYPES.contains(&kind.as_str()) {
        return Err(format!(
            "invalid contact type: {kind} (expected one of {})",
            CONTACT_TYPES.join(", ")
        ));
    }
    if handle.is_empty() {
        return Err("contact handle is required".to_owned());
    }
    Ok((kind, handle.to_owned()))
}

fn parse_dnssec_key(value: &str) -> Result<DnssecKey, String> {
    let mut parts = value.split(':');
    let public_key = parts.next().unwrap_or_default().to_owned();
    if public_key.is_empty() {
        return Err("DNSSEC public key is required".to_owned());
    }
    let algorithm = parts
        .next()
        .map(|p| p.parse().map_err(|_| format!("invalid DNSSEC algorithm: {p}")))
        .transpose()?;
    let flags = parts
        .next()
        .map(|p| p.parse().map_err(|_| format!("invalid DNSSEC flags: {p}")))
        .transpose()?;
    let protocol = parts
        .next()
        .map(|p| p.parse().map_err(|_| format!("invalid DNSSEC protocol: {p}")))
        .transpose()?;
    if parts.next().is_some() {
        return Err("expected PUBKEY[:ALGORITHM[:FLAGS[:PROTOCOL]]]".to_owned());
    }
    Ok(DnssecKey {
        public_key,
        algorithm,
        flags,
        protocol,
    })
}

/// Split repeated and comma-separated `--expand` inputs into distinct
/// values, preserving first-seen order. Validity is checked by the API
/// client.
fn split_expand(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in values {
        for part in item.split(',') {
            let part = part.trim();
            if !part.is_empty() && !out.iter().any(|v| v == part) {
                out.push(part.to_owned());
            }
        }
    }
    out
}

// -- Rendering --------------------------------------------------------------

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => yes_no(*b).to_owned(),
        Value::Null => "\u{2014}".to_owned(),
        other => other.to_string(),
    }
}

fn print_domain_table(domains: &[Domain]) {
    let name_w = domains
        .iter()
        .map(|d| d.domain.len())
        .max()
        .unwrap_or(0)
        .max(6);
    let status_w = domains
        .iter()
        .map(|d| d.status.as_deref().unwrap_or("\u{2014}").len())
        .max()
        .unwrap_or(0)
        .max(6);

    println!(
        "{:<name_w$}  {:<status_w$}  {:<10}  {}",
        "DOMAIN", "STATUS", "AUTO-RENEW", "RENEWS / EXPIRES AT"
    );

    for d in domains {
        let date = d
            .expires_at
            .as_deref()
            .or(d.renews_at.as_deref())
            .unwrap_or("\u{2014}");
        println!(
            "{:<name_w$}  {:<status_w$}  {:<10}  {}",
            d.domain,
            d.status.as_deref().unwrap_or("\u{2014}"),
            yes_no(d.is_autorenew_enabled),
            date
        );
    }
}

fn print_detailed_domains(domains: &[Domain]) {
    for d in domains {
        println!("{}", d.domain);
        if let Some(status) = &d.status {
            println!("  Status: {status}");
        }
        println!("  Auto-Renew: {}", yes_no(d.is_autorenew_enabled));
        if let Some(at) = &d.renews_at {
            println!("  Renews At: {at}");
        }
        if let Some(at) = &d.expires_at {
            println!("  Expires At: {at}");
        }
        for (key, value) in &d.extra {
            println!("  {key}: {}", render_value(value));
        }
        if let Some(tld) = &d.tld {
            print_expanded("TLD", tld);
        }
        if let Some(contacts) = &d.contacts {
            print_expanded("Contacts", contacts);
        }
        println!();
    }
}

fn print_expanded(label: &str, value: &Value) {
    match value.as_object() {
        Some(object) => {
            println!("  {label}:");
            for (key, value) in object {
                println!("    {key}: {}", render_value(value));
            }
        }
        None => println!("  {label}: {}", render_value(value)),
    }
}

fn print_record(record: &Value) {
    let Some(object) = record.as_object() else {
        println!("{}", render_value(record));
        return;
    };
    let key_w = object.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in object {
        println!("{key:<key_w$}  {}", render_value(value));
    }
}

fn print_contact_table(contacts: &[Contact]) {
    let rows: Vec<(String, String, String, &'static str)> = contacts
        .iter()
        .map(|c| {
            let mut name = format!(
                "{} {}",
                c.first_name.as_deref().unwrap_or_default(),
                c.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_owned();
            if let Some(company) = c.company_name.as_deref().filter(|s| !s.is_empty()) {
                name = format!("{name} - {company}");
            }
            (
                c.handle.clone(),
                name,
                c.email.clone().unwrap_or_else(|| "\u{2014}".to_owned()),
                yes_no(c.is_default),
            )
        })
        .collect();

    let handle_w = rows.iter().map(|r| r.0.len()).max().unwrap_or(0).max(6);
    let name_w = rows.iter().map(|r| r.1.len()).max().unwrap_or(0).max(4);
    let email_w = rows.iter().map(|r| r.2.len()).max().unwrap_or(0).max(5);

    println!(
        "{:<handle_w$}  {:<name_w$}  {:<email_w$}  {}",
        "HANDLE", "NAME", "EMAIL", "DEFAULT"
    );
    for (handle, name, email, default) in &rows {
        println!("{handle:<handle_w$}  {name:<name_w$}  {email:<email_w$}  {default}");
    }
}

fn print_pagination(meta: &PaginationMeta) {
    if let (Some(current), Some(last)) = (meta.current_page, meta.last_page) {
        let total = meta
            .total
            .map(|t| format!(" ({t} total)"))
            .unwrap_or_default();
        println!();
        println!("Page {current} of {last}{total}");
    }
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod tests;
