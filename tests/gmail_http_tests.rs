//! Gmail client and token refresh against a local server standing in for
//! Google's API and OAuth endpoints

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use gmail_draft_mcp::config::Config;
use gmail_draft_mcp::error::{AuthError, DraftMcpError, ErrorKind, ValidationError};
use gmail_draft_mcp::gmail::auth::{Authenticator, StoredCredentials};
use gmail_draft_mcp::gmail::client::GmailClient;
use gmail_draft_mcp::gmail::service::MailService;
use gmail_draft_mcp::mailbox::{create_draft_reply, fetch_unread, DraftRequest};

const MESSAGES: &str = "/gmail/v1/users/me/messages";
const THREADS: &str = "/gmail/v1/users/me/threads";
const DRAFTS: &str = "/gmail/v1/users/me/drafts";

/// Serve `app` on an ephemeral port, returning its base URL
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn stored(access_token: &str, expiry_date: Option<i64>, refresh_token: Option<&str>) -> StoredCredentials {
    StoredCredentials {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        token_type: "Bearer".to_string(),
        expiry_date,
        scope: String::new(),
    }
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn google_error(code: u16, message: &str, status: &str) -> Json<Value> {
    Json(json!({"error": {"code": code, "message": message, "status": status}}))
}

struct Fixture {
    client: GmailClient,
    credentials_path: PathBuf,
    _dir: tempfile::TempDir,
}

/// Client wired to `base` for both Gmail and the token endpoint
async fn fixture(base: &str, credentials: StoredCredentials) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let keys_path = dir.path().join("gcp-oauth.keys.json");
    let credentials_path = dir.path().join("credentials.json");

    let keys = json!({
        "installed": {
            "client_id": "client-id",
            "client_secret": "client-secret",
            "token_uri": format!("{}/token", base),
        }
    });
    std::fs::write(&keys_path, keys.to_string()).unwrap();
    std::fs::write(&credentials_path, serde_json::to_string(&credentials).unwrap()).unwrap();

    let mut config = Config::with_paths(&keys_path, &credentials_path);
    config.api_base_url = format!("{}/gmail/v1", base);

    let authenticator = Arc::new(Authenticator::new(config.clone()).await.unwrap());
    let client = GmailClient::new(&config, authenticator).unwrap();

    Fixture {
        client,
        credentials_path,
        _dir: dir,
    }
}

fn read_credentials(path: &Path) -> StoredCredentials {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

mod response_mapping_tests {
    use super::*;

    #[tokio::test]
    async fn list_sends_query_and_bearer() {
        let seen: Arc<Mutex<Vec<(String, HashMap<String, String>)>>> = Arc::default();
        let record = seen.clone();

        let app = Router::new().route(
            MESSAGES,
            get(
                move |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| {
                    let record = record.clone();
                    async move {
                        record.lock().unwrap().push((bearer(&headers), query));
                        Json(json!({
                            "messages": [{"id": "m1", "threadId": "t1"}],
                            "nextPageToken": "p2",
                            "resultSizeEstimate": 7
                        }))
                    }
                },
            ),
        );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("live", None, None)).await;

        let page = assert_ok!(fx.client.list_unread("is:unread in:inbox", 5, Some("p1")).await);

        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("p2"));

        let seen = seen.lock().unwrap();
        let (auth, query) = &seen[0];
        assert_eq!(auth, "Bearer live");
        assert_eq!(query["q"], "is:unread in:inbox");
        assert_eq!(query["maxResults"], "5");
        assert_eq!(query["pageToken"], "p1");
    }

    #[tokio::test]
    async fn google_error_message_is_extracted() {
        let app = Router::new().route(
            &format!("{}/m1", MESSAGES),
            get(|| async {
                (
                    StatusCode::FORBIDDEN,
                    google_error(403, "Insufficient Permission", "PERMISSION_DENIED"),
                )
            }),
        );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("live", None, None)).await;

        let err = assert_err!(fx.client.get_message("m1").await);

        match err {
            DraftMcpError::Remote(ref remote) => {
                assert_eq!(remote.status, 403);
                assert_eq!(remote.message, "Insufficient Permission");
                assert_eq!(remote.context, "get message");
            }
            ref other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.kind(), ErrorKind::RemoteService);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn plain_text_error_keeps_status() {
        let app = Router::new().route(
            &format!("{}/t1", THREADS),
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable") }),
        );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("live", None, None)).await;

        let err = assert_err!(fx.client.get_thread("t1").await);

        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[tokio::test]
    async fn unauthorized_is_authentication_error() {
        let app = Router::new().route(
            MESSAGES,
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    google_error(401, "Invalid Credentials", "UNAUTHENTICATED"),
                )
            }),
        );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("revoked", None, None)).await;

        let err = assert_err!(fx.client.list_unread("is:unread", 10, None).await);

        assert!(matches!(
            err,
            DraftMcpError::Auth(AuthError::Rejected { ref message }) if message == "Invalid Credentials"
        ));
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn draft_is_posted_to_the_thread() {
        let posted: Arc<Mutex<Option<Value>>> = Arc::default();
        let record = posted.clone();

        let app = Router::new()
            .route(
                &format!("{}/abc123", THREADS),
                get(|| async {
                    Json(json!({
                        "id": "abc123",
                        "messages": [{
                            "id": "m1",
                            "threadId": "abc123",
                            "payload": {"headers": [{"name": "Message-ID", "value": "<m1@mail.example.com>"}]}
                        }]
                    }))
                }),
            )
            .route(
                DRAFTS,
                post(move |Json(body): Json<Value>| {
                    let record = record.clone();
                    async move {
                        *record.lock().unwrap() = Some(body);
                        Json(json!({
                            "id": "r-42",
                            "message": {"id": "dm-1", "threadId": "abc123", "labelIds": ["DRAFT"]}
                        }))
                    }
                }),
            );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("live", None, None)).await;

        let request = DraftRequest::new("abc123", "a@b.com", "Re: Hi", "Thanks");
        let result = assert_ok!(create_draft_reply(&fx.client, &request).await);

        assert_eq!(result.draft_id, "r-42");
        assert_eq!(result.thread_id, "abc123");

        let body = posted.lock().unwrap().clone().unwrap();
        assert_eq!(body["message"]["threadId"], "abc123");
        assert!(!body["message"]["raw"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_thread_is_validation_error() {
        let app = Router::new().route(
            &format!("{}/nonexistent", THREADS),
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    google_error(404, "Requested entity was not found.", "NOT_FOUND"),
                )
            }),
        );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("live", None, None)).await;

        let request = DraftRequest::new("nonexistent", "a@b.com", "Re: Hi", "Thanks");
        let err = assert_err!(create_draft_reply(&fx.client, &request).await);

        assert!(matches!(
            err,
            DraftMcpError::Validation(ValidationError::UnknownThread { .. })
        ));
    }
}

mod token_refresh_tests {
    use super::*;

    #[tokio::test]
    async fn rejected_token_is_refreshed_on_next_call() {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let forms: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::default();
        let (counter, record) = (refreshes.clone(), forms.clone());

        let app = Router::new()
            .route(
                MESSAGES,
                get(|headers: HeaderMap| async move {
                    if bearer(&headers) == "Bearer fresh" {
                        (
                            StatusCode::OK,
                            Json(json!({"messages": [{"id": "m1", "threadId": "t1"}]})),
                        )
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            google_error(401, "Invalid Credentials", "UNAUTHENTICATED"),
                        )
                    }
                }),
            )
            .route(
                "/token",
                post(move |Form(form): Form<HashMap<String, String>>| {
                    let (counter, record) = (counter.clone(), record.clone());
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        record.lock().unwrap().push(form);
                        // No refresh_token: Google only sends one on consent
                        Json(json!({
                            "access_token": "fresh",
                            "expires_in": 3599,
                            "token_type": "Bearer",
                            "scope": "https://www.googleapis.com/auth/gmail.readonly"
                        }))
                    }
                }),
            );
        let base = spawn(app).await;
        // No recorded expiry: only the 401 reveals the token is dead
        let fx = fixture(&base, stored("stale", None, Some("keep-me"))).await;

        let err = assert_err!(fx.client.list_unread("is:unread", 10, None).await);
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);

        let page = assert_ok!(fx.client.list_unread("is:unread", 10, None).await);
        assert_eq!(page.messages[0].id, "m1");
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        let form = forms.lock().unwrap()[0].clone();
        assert_eq!(form["grant_type"], "refresh_token");
        assert_eq!(form["refresh_token"], "keep-me");
        assert_eq!(form["client_id"], "client-id");

        let persisted = read_credentials(&fx.credentials_path);
        assert_eq!(persisted.access_token, "fresh");
        assert_eq!(persisted.refresh_token.as_deref(), Some("keep-me"));
        assert!(persisted.expiry_date.is_some());

        // Fresh token is reused without another refresh
        assert_ok!(fx.client.list_unread("is:unread", 10, None).await);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_use() {
        let app = Router::new()
            .route(
                MESSAGES,
                get(|headers: HeaderMap| async move {
                    if bearer(&headers) == "Bearer fresh" {
                        (StatusCode::OK, Json(json!({"resultSizeEstimate": 0})))
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            google_error(401, "Invalid Credentials", "UNAUTHENTICATED"),
                        )
                    }
                }),
            )
            .route(
                "/token",
                post(|| async {
                    Json(json!({
                        "access_token": "fresh",
                        "refresh_token": "rotated",
                        "expires_in": 3599
                    }))
                }),
            );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("old", Some(1), Some("r"))).await;

        let messages = assert_ok!(fetch_unread(&fx.client, "is:unread", 10).await);

        assert!(messages.is_empty());
        let persisted = read_credentials(&fx.credentials_path);
        assert_eq!(persisted.refresh_token.as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn refused_refresh_is_authentication_error() {
        let app = Router::new().route(
            "/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "Token has been expired or revoked."})),
                )
            }),
        );
        let base = spawn(app).await;
        let fx = fixture(&base, stored("old", Some(1), Some("revoked"))).await;

        let err = assert_err!(fx.client.list_unread("is:unread", 10, None).await);

        assert!(matches!(
            err,
            DraftMcpError::Auth(AuthError::TokenRefreshFailed { ref message }) if message.contains("invalid_grant")
        ));
        // Nothing was written over the stored token
        assert_eq!(read_credentials(&fx.credentials_path).access_token, "old");
    }

    #[tokio::test]
    async fn unreadable_token_response_is_authentication_error() {
        let app = Router::new().route("/token", post(|| async { "<html>oops</html>" }));
        let base = spawn(app).await;
        let fx = fixture(&base, stored("old", Some(1), Some("r"))).await;

        let err = assert_err!(fx.client.list_unread("is:unread", 10, None).await);

        assert!(matches!(
            err,
            DraftMcpError::Auth(AuthError::TokenRefreshFailed { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
