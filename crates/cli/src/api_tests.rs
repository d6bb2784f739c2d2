// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex as TestMutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use super::*;
use crate::store::{ConfigStore, Key};

#[derive(Debug, Clone)]
struct CapturedHeaders {
    authorization: Option<String>,
    team: Option<String>,
    accept: Option<String>,
    user_agent: Option<String>,
}

struct MockApi {
    addr: SocketAddr,
    api_calls: Arc<AtomicU32>,
    token_calls: Arc<AtomicU32>,
    headers_seen: Arc<TestMutex<Vec<CapturedHeaders>>>,
}

fn next_response(calls: &AtomicU32, responses: &[(u16, String)]) -> (StatusCode, String) {
    let idx = calls.fetch_add(1, Ordering::Relaxed) as usize;
    let (status, body) = responses
        .get(idx)
        .or_else(|| responses.last())
        .cloned()
        .unwrap_or((500, "{}".to_owned()));
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body,
    )
}

fn header(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Mock server exposing both a protected API endpoint and the OAuth
/// endpoints the refresh path needs.
async fn mock_api(api: Vec<(u16, String)>, token: Vec<(u16, String)>) -> MockApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let api_calls = Arc::new(AtomicU32::new(0));
    let token_calls = Arc::new(AtomicU32::new(0));
    let headers_seen = Arc::new(TestMutex::new(Vec::new()));

    let api = Arc::new(api);
    let token = Arc::new(token);

    let ac = Arc::clone(&api_calls);
    let tc = Arc::clone(&token_calls);
    let hs = Arc::clone(&headers_seen);

    let app = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(move || async move {
                axum::Json(json!({
                    "token_endpoint": format!("http://{addr}/oauth/token"),
                    "device_authorization_endpoint": format!("http://{addr}/oauth/device"),
                    "userinfo_endpoint": format!("http://{addr}/oauth/userinfo"),
                    "revocation_endpoint": format!("http://{addr}/oauth/revoke"),
                }))
            }),
        )
        .route(
            "/oauth/token",
            post(move || {
                let calls = Arc::clone(&tc);
                let responses = Arc::clone(&token);
                async move { next_response(&calls, &responses) }
            }),
        )
        .route(
            "/oauth/userinfo",
            get(move || async move {
                axum::Json(json!({
                    "name": "Jane Doe",
                    "email": "jane@example.com",
                    "teams": [{ "slug": "acme", "name": "Acme Corp" }],
                }))
            }),
        )
        .route(
            "/api/v1/thing",
            get(move |headers: axum::http::HeaderMap| {
                let calls = Arc::clone(&ac);
                let responses = Arc::clone(&api);
                let seen = Arc::clone(&hs);
                async move {
                    seen.lock().push(CapturedHeaders {
                        authorization: header(&headers, "authorization"),
                        team: header(&headers, "x-chief-team"),
                        accept: header(&headers, "accept"),
                        user_agent: header(&headers, "user-agent"),
                    });
                    next_response(&calls, &responses)
                }
            }),
        );

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    MockApi {
        addr,
        api_calls,
        token_calls,
        headers_seen,
    }
}

fn refresh_ok() -> (u16, String) {
    (
        200,
        json!({ "access_token": "access-2", "refresh_token": "refresh-2" }).to_string(),
    )
}

fn client_with(
    mock: &MockApi,
    seed: impl FnOnce(&mut ConfigStore),
) -> (ApiClient, Arc<AuthManager>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = ConfigStore::open(dir.path()).expect("store");
    seed(&mut store);
    let auth = Arc::new(
        AuthManager::new(
            store,
            format!("http://{}/.well-known/openid-configuration", mock.addr),
        )
        .expect("manager"),
    );
    let api = ApiClient::new(format!("http://{}/api/v1", mock.addr), Arc::clone(&auth))
        .expect("client");
    (api, auth, dir)
}

fn seed_full(store: &mut ConfigStore) {
    store
        .update_auth_data("access-1", "refresh-1", "acme", "Acme Corp")
        .expect("seed");
}

#[tokio::test]
async fn not_authenticated_fails_before_any_network_call() {
    let mock = mock_api(vec![(200, "{}".to_owned())], vec![]).await;
    let (api, _auth, _dir) = client_with(&mock, |_| {});

    let err = api.get("thing", &[]).await.err().expect("error");
    assert!(matches!(&err, Error::NotAuthenticated), "got {err:?}");
    assert_eq!(mock.api_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn attaches_bearer_team_and_accept_headers() {
    let mock = mock_api(vec![(200, json!({ "ok": true }).to_string())], vec![]).await;
    let (api, _auth, _dir) = client_with(&mock, seed_full);

    let value = api.get("thing", &[]).await.expect("response");
    assert_eq!(value.get("ok"), Some(&Value::Bool(true)));

    let seen = mock.headers_seen.lock().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer access-1"));
    assert_eq!(seen[0].team.as_deref(), Some("acme"));
    assert_eq!(seen[0].accept.as_deref(), Some("application/json"));
    let ua = seen[0].user_agent.clone().unwrap_or_default();
    assert!(ua.starts_with("ChiefToolsCLI/"), "unexpected UA: {ua}");
}

#[tokio::test]
async fn team_header_is_omitted_without_a_team() {
    let mock = mock_api(vec![(200, "{}".to_owned())], vec![]).await;
    let (api, _auth, _dir) = client_with(&mock, |store| {
        store.set(Key::AccessToken, "access-1").expect("seed");
    });

    api.get("thing", &[]).await.expect("response");

    let seen = mock.headers_seen.lock().clone();
    assert_eq!(seen[0].team, None);
}

#[tokio::test]
async fn retries_once_with_fresh_token_after_401() {
    let mock = mock_api(
        vec![
            (401, "{}".to_owned()),
            (200, json!({ "data": "ok" }).to_string()),
        ],
        vec![refresh_ok()],
    )
    .await;
    let (api, auth, _dir) = client_with(&mock, seed_full);

    let value = api.get("thing", &[]).await.expect("response");
    assert_eq!(value.get("data").and_then(Value::as_str), Some("ok"));

    assert_eq!(mock.api_calls.load(Ordering::Relaxed), 2);
    assert_eq!(mock.token_calls.load(Ordering::Relaxed), 1);

    // The resend carried the refreshed token.
    let seen = mock.headers_seen.lock().clone();
    assert_eq!(seen[1].authorization.as_deref(), Some("Bearer access-2"));
    assert_eq!(auth.bearer_token().as_deref(), Some("access-2"));
}

#[tokio::test]
async fn second_401_passes_through_without_another_refresh() {
    let mock = mock_api(
        vec![(401, "{}".to_owned()), (401, "{}".to_owned())],
        vec![refresh_ok()],
    )
    .await;
    let (api, _auth, _dir) = client_with(&mock, seed_full);

    let err = api.get("thing", &[]).await.err().expect("error");
    assert!(
        matches!(&err, Error::Api { status: 401, .. }),
        "got {err:?}"
    );
    assert_eq!(mock.api_calls.load(Ordering::Relaxed), 2);
    assert_eq!(mock.token_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn missing_refresh_token_aborts_and_clears_auth() {
    let mock = mock_api(vec![(401, "{}".to_owned())], vec![]).await;
    let (api, auth, _dir) = client_with(&mock, |store| {
        store.set(Key::AccessToken, "access-1").expect("seed");
    });

    let err = api.get("thing", &[]).await.err().expect("error");
    assert!(matches!(&err, Error::AuthRequired(_)), "got {err:?}");
    assert!(!auth.is_authenticated());
    assert_eq!(mock.api_calls.load(Ordering::Relaxed), 1);
    assert_eq!(mock.token_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn rejected_refresh_token_aborts_and_clears_auth() {
    let mock = mock_api(
        vec![(401, "{}".to_owned())],
        vec![(400, json!({ "error": "invalid_grant" }).to_string())],
    )
    .await;
    let (api, auth, _dir) = client_with(&mock, seed_full);

    let err = api.get("thing", &[]).await.err().expect("error");
    assert!(matches!(&err, Error::AuthRequired(_)), "got {err:?}");
    assert!(
        err.to_string().contains("no longer valid"),
        "got: {err}"
    );
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn failed_refresh_aborts_without_clearing_auth() {
    let mock = mock_api(
        vec![(401, "{}".to_owned())],
        vec![(500, json!({ "error": "server_error" }).to_string())],
    )
    .await;
    let (api, auth, _dir) = client_with(&mock, seed_full);

    let err = api.get("thing", &[]).await.err().expect("error");
    assert!(matches!(&err, Error::AuthRequired(_)), "got {err:?}");
    assert!(auth.is_authenticated());
    assert_eq!(mock.token_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn non_401_errors_pass_through() {
    let mock = mock_api(
        vec![(500, json!({ "message": "boom" }).to_string())],
        vec![],
    )
    .await;
    let (api, _auth, _dir) = client_with(&mock, seed_full);

    let err = api.get("thing", &[]).await.err().expect("error");
    match &err {
        Error::Api { status, message } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(mock.api_calls.load(Ordering::Relaxed), 1);
    assert_eq!(mock.token_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn undecodable_success_body_is_format_error() {
    let mock = mock_api(vec![(200, "not json".to_owned())], vec![]).await;
    let (api, _auth, _dir) = client_with(&mock, seed_full);

    let err = api.get("thing", &[]).await.err().expect("error");
    assert!(matches!(&err, Error::ResponseFormat(_)), "got {err:?}");
}
