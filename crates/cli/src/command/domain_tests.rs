// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn split_expand_handles_repeats_and_commas() {
    let values = vec![
        "tld".to_owned(),
        "tld,contacts".to_owned(),
        " contacts , tld ".to_owned(),
    ];
    assert_eq!(split_expand(&values), vec!["tld", "contacts"]);
}

#[test]
fn split_expand_ignores_empty_segments() {
    let values = vec![",,".to_owned(), "tld,".to_owned()];
    assert_eq!(split_expand(&values), vec!["tld"]);
}

#[test]
fn split_expand_keeps_invalid_values_for_client_validation() {
    // Unknown values are not silently dropped here; the API client rejects
    // them with a validation error.
    let values = vec!["nameservers".to_owned()];
    assert_eq!(split_expand(&values), vec!["nameservers"]);
}

#[test]
fn parse_nameserver_accepts_hostname_and_addresses() {
    let ns = parse_nameserver("ns1.example.com,192.0.2.10,2001:db8::1").expect("ns");
    assert_eq!(ns.hostname, "ns1.example.com");
    assert_eq!(ns.ipv4.as_deref(), Some("192.0.2.10"));
    assert_eq!(ns.ipv6.as_deref(), Some("2001:db8::1"));

    let ns = parse_nameserver("ns2.example.com").expect("ns");
    assert_eq!(ns.hostname, "ns2.example.com");
    assert_eq!(ns.ipv4, None);
    assert_eq!(ns.ipv6, None);
}

#[test]
fn parse_nameserver_rejects_empty_and_overlong_specs() {
    assert!(parse_nameserver("").is_err());
    assert!(parse_nameserver(",1.2.3.4").is_err());
    assert!(parse_nameserver("ns1.example.com,1.2.3.4,::1,extra").is_err());
}

#[test]
fn parse_contact_accepts_known_types() {
    assert_eq!(
        parse_contact("owner=H1000").expect("contact"),
        ("owner".to_owned(), "H1000".to_owned())
    );
    // Types are case-insensitive.
    assert_eq!(
        parse_contact("Billing=H2000").expect("contact"),
        ("billing".to_owned(), "H2000".to_owned())
    );
}

#[test]
fn parse_contact_rejects_malformed_input() {
    assert!(parse_contact("owner").is_err());
    assert!(parse_contact("friend=H1000").is_err());
    assert!(parse_contact("owner=").is_err());
}

#[test]
fn parse_dnssec_key_accepts_partial_specs() {
    let key = parse_dnssec_key("AwEAAbcd").expect("key");
    assert_eq!(key.public_key, "AwEAAbcd");
    assert_eq!(key.algorithm, None);

    let key = parse_dnssec_key("AwEAAbcd:13:257:3").expect("key");
    assert_eq!(key.algorithm, Some(13));
    assert_eq!(key.flags, Some(257));
    assert_eq!(key.protocol, Some(3));
}

#[test]
fn parse_dnssec_key_rejects_malformed_input() {
    assert!(parse_dnssec_key("").is_err());
    assert!(parse_dnssec_key("AwEAAbcd:ed25519").is_err());
    assert!(parse_dnssec_key("AwEAAbcd:13:257:3:9").is_err());
}

#[test]
fn render_value_formats_scalars_for_tables() {
    assert_eq!(render_value(&Value::String("active".into())), "active");
    assert_eq!(render_value(&Value::Bool(true)), "Yes");
    assert_eq!(render_value(&Value::Bool(false)), "No");
    assert_eq!(render_value(&Value::Null), "\u{2014}");
    assert_eq!(
        render_value(&serde_json::json!({ "a": 1 })),
        r#"{"a":1}"#
    );
}
