//! End-to-end session flow against a mock backend
//!
//! Covers configuration, cookie persistence, per-call headers and error
//! translation working together through one client.

use std::collections::BTreeMap;
use std::sync::Arc;

use appwrite_client::{
    CancellationToken, Client, ClientError, CookieStorage, InMemoryCookieStorage, Method,
    ParamValue, Params, SdkInfo,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_login_then_authenticated_calls() {
    init_tracing();
    let server = MockServer::start().await;
    let storage = Arc::new(InMemoryCookieStorage::new());
    let client = Client::new(SdkInfo::new("io.example.e2e", "3.1.0"), storage.clone()).unwrap();
    client
        .set_endpoint(&format!("{}/v1", server.uri()))
        .set_project("e2e")
        .set_locale("de");

    Mock::given(method("POST"))
        .and(path("/v1/account/sessions/email"))
        .and(body_json(json!({"email": "ada@example.com", "password": "hunter22"})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("set-cookie", "a_session_e2e=token123; Path=/; HttpOnly")
                .set_body_json(json!({"$id": "session-1", "userId": "user-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/account/jwts"))
        .and(header("cookie", "a_session_e2e=token123"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"jwt": "jwt-abc"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/account"))
        .and(header("x-appwrite-jwt", "jwt-abc"))
        .and(header("x-appwrite-locale", "de"))
        .and(header("x-appwrite-project", "e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"$id": "user-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let mut login = Params::new();
    login.insert("email".to_string(), ParamValue::from("ada@example.com"));
    login.insert("password".to_string(), ParamValue::from("hunter22"));

    let session: Value = client
        .call_json(Method::POST, "/account/sessions/email", &BTreeMap::new(), &login, &cancel)
        .await
        .unwrap();
    assert_eq!(session["userId"], "user-1");

    let host = mock_host(&server);
    assert_eq!(storage.load(&host).len(), 1);

    let jwt: Value = client
        .call_json(Method::POST, "/account/jwts", &BTreeMap::new(), &Params::new(), &cancel)
        .await
        .unwrap();
    client.set_jwt(jwt["jwt"].as_str().unwrap());

    let account: Value = client
        .call_json(Method::GET, "/account", &BTreeMap::new(), &Params::new(), &cancel)
        .await
        .unwrap();
    assert_eq!(account["$id"], "user-1");
    assert_eq!(client.session_config().len(), 3);
}

#[tokio::test]
async fn test_failed_call_returns_only_an_error() {
    init_tracing();
    let server = MockServer::start().await;
    let client = Client::new(
        SdkInfo::new("io.example.e2e", "3.1.0"),
        Arc::new(InMemoryCookieStorage::new()),
    )
    .unwrap();
    client
        .set_endpoint(&format!("{}/v1", server.uri()))
        .set_project("e2e");

    Mock::given(method("DELETE"))
        .and(path("/v1/account/sessions/current"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Session not found",
            "code": 404,
            "type": "user_session_not_found",
        })))
        .mount(&server)
        .await;

    let result = client
        .call(
            Method::DELETE,
            "/account/sessions/current",
            &BTreeMap::new(),
            &Params::new(),
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(ClientError::Http(api)) => {
            assert_eq!(api.code, 404);
            assert_eq!(api.kind.as_deref(), Some("user_session_not_found"));
            let surfaced = serde_json::to_value(&api).unwrap();
            assert_eq!(surfaced["message"], "Session not found");
            assert_eq!(surfaced["type"], "user_session_not_found");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

fn mock_host(server: &MockServer) -> String {
    server.address().ip().to_string()
}
