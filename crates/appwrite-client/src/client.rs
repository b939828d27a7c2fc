//! Client handle

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::{ClientConfig, SdkInfo, TransportConfig, SESSION_JWT},
    cookie::{CookieStorage, PersistentCookieJar},
    error::{ClientError, Result},
    invoker::invoke,
    params::Params,
    request::{build_request, OutgoingRequest},
    transport::{SharedTransport, TrustMode},
};

/// Request engine for one backend.
///
/// Setters take `&self` and return `&Self` so a shared client can be
/// configured fluently; calls snapshot configuration and transport when they
/// start and are unaffected by later changes.
#[derive(Debug)]
pub struct Client {
    config: RwLock<ClientConfig>,
    transport: SharedTransport,
}

impl Client {
    /// Create a client with default transport settings
    pub fn new(sdk: SdkInfo, storage: Arc<dyn CookieStorage>) -> Result<Self> {
        Self::with_config(sdk, storage, TransportConfig::default())
    }

    /// Create a client with explicit transport settings
    pub fn with_config(
        sdk: SdkInfo,
        storage: Arc<dyn CookieStorage>,
        transport_config: TransportConfig,
    ) -> Result<Self> {
        let config = ClientConfig::new(sdk.default_headers());
        let jar = Arc::new(PersistentCookieJar::new(storage));
        let transport = SharedTransport::new(TrustMode::Strict, jar, transport_config)?;

        Ok(Self {
            config: RwLock::new(config),
            transport,
        })
    }

    pub fn set_endpoint(&self, endpoint: &str) -> &Self {
        self.config.write().set_endpoint(endpoint);
        self
    }

    pub fn set_endpoint_realtime(&self, endpoint: &str) -> &Self {
        self.config.write().set_endpoint_realtime(endpoint);
        self
    }

    pub fn set_project(&self, project: &str) -> &Self {
        self.config.write().set_project(project);
        self
    }

    /// Set the JWT used to authenticate calls
    pub fn set_jwt(&self, jwt: &str) -> &Self {
        self.config.write().set_jwt(jwt);
        self
    }

    /// Alias of [`set_jwt`](Client::set_jwt)
    pub fn set_auth_token(&self, token: &str) -> &Self {
        self.set_jwt(token)
    }

    pub fn set_locale(&self, locale: &str) -> &Self {
        self.config.write().set_locale(locale);
        self
    }

    pub fn add_header(&self, key: &str, value: &str) -> &Self {
        self.config.write().add_header(key, value);
        self
    }

    /// Switch certificate trust mode.
    ///
    /// `true` is INSECURE: the rebuilt transport accepts any certificate and
    /// any hostname. Only meant for development servers with self-signed
    /// certificates. The transport is rebuilt only when the mode changes.
    pub fn set_trust_any_certificate(&self, trust: bool) -> Result<&Self> {
        if self.trust_any_certificate() == trust {
            return Ok(self);
        }

        // built outside the config lock; only the swap happens under it
        let mode = TrustMode::from_flag(trust);
        let transport = self.transport.build(mode)?;

        let mut config = self.config.write();
        if config.set_trust_any_certificate(trust) {
            self.transport.install(transport, mode);
        }
        Ok(self)
    }

    pub fn endpoint(&self) -> String {
        self.config.read().endpoint().to_string()
    }

    pub fn endpoint_realtime(&self) -> Option<String> {
        self.config.read().endpoint_realtime().map(str::to_string)
    }

    pub fn trust_any_certificate(&self) -> bool {
        self.config.read().trust_any_certificate()
    }

    pub fn headers(&self) -> BTreeMap<String, String> {
        self.config.read().headers().clone()
    }

    pub fn session_config(&self) -> BTreeMap<String, String> {
        self.config.read().session().clone()
    }

    pub fn jwt(&self) -> Option<String> {
        self.config.read().session().get(SESSION_JWT).cloned()
    }

    /// Number of transport rebuilds so far
    pub fn transport_generation(&self) -> u64 {
        self.transport.generation()
    }

    /// Build a request with the current configuration without sending it
    pub fn prepare_request(
        &self,
        method: Method,
        path: &str,
        headers: &BTreeMap<String, String>,
        params: &Params,
    ) -> Result<OutgoingRequest> {
        let config = self.config.read();
        build_request(
            config.endpoint(),
            config.headers(),
            method,
            path,
            headers,
            params,
        )
    }

    /// Send a call and return the successful response.
    ///
    /// Responses with status >= 400 are returned as [`ClientError::Http`].
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        headers: &BTreeMap<String, String>,
        params: &Params,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let request = self.prepare_request(method, path, headers, params)?;
        let transport = self.transport.snapshot();
        invoke(transport, request, cancel).await
    }

    /// Send a call and deserialize the JSON response body
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        headers: &BTreeMap<String, String>,
        params: &Params,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let response = self.call(method, path, headers, params, cancel).await?;
        let body = read_body(response, cancel).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Check connectivity with `GET /ping`
    pub async fn ping(&self, cancel: &CancellationToken) -> Result<String> {
        let headers = BTreeMap::from([(
            "content-type".to_string(),
            "application/json".to_string(),
        )]);
        let response = self
            .call(Method::GET, "/ping", &headers, &Params::new(), cancel)
            .await?;
        let body = read_body(response, cancel).await?;
        debug!("Ping returned {} bytes", body.len());
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Read a response body, abandoning it if the call is cancelled meanwhile
async fn read_body(response: Response, cancel: &CancellationToken) -> Result<Vec<u8>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        body = response.bytes() => Ok(body?.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::InMemoryCookieStorage;

    fn client() -> Client {
        Client::new(
            SdkInfo::new("io.example.app", "1.0.0"),
            Arc::new(InMemoryCookieStorage::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_fluent_setters() {
        let client = client();
        client
            .set_endpoint("https://api.example.com/v1")
            .set_project("p1")
            .set_auth_token("jwt-1")
            .set_locale("fr")
            .add_header("X-Trace", "abc");

        assert_eq!(client.endpoint(), "https://api.example.com/v1");
        assert_eq!(client.endpoint_realtime().as_deref(), Some("wss://api.example.com/v1"));
        assert_eq!(client.jwt().as_deref(), Some("jwt-1"));
        let headers = client.headers();
        assert_eq!(headers.get("x-appwrite-project").map(String::as_str), Some("p1"));
        assert_eq!(headers.get("x-appwrite-locale").map(String::as_str), Some("fr"));
        assert_eq!(headers.get("x-trace").map(String::as_str), Some("abc"));
        assert_eq!(client.session_config().len(), 3);
    }

    #[test]
    fn test_explicit_realtime_is_kept() {
        let client = client();
        client
            .set_endpoint_realtime("wss://rt.example.com/v1/realtime")
            .set_endpoint("https://host");

        assert_eq!(
            client.endpoint_realtime().as_deref(),
            Some("wss://rt.example.com/v1/realtime")
        );
    }

    #[test]
    fn test_trust_mode_rebuilds_once_per_change() {
        let client = client();
        assert!(!client.trust_any_certificate());

        client.set_trust_any_certificate(true).unwrap();
        client.set_trust_any_certificate(true).unwrap();
        assert_eq!(client.transport_generation(), 1);
        assert!(client.trust_any_certificate());

        client.set_trust_any_certificate(false).unwrap();
        assert_eq!(client.transport_generation(), 2);
    }

    #[test]
    fn test_concurrent_toggles_keep_flag_and_transport_in_step() {
        let client = client();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let client = &client;
                scope.spawn(move || {
                    for round in 0..4 {
                        client.set_trust_any_certificate((i + round) % 2 == 0).unwrap();
                        client
                            .prepare_request(Method::GET, "/x", &BTreeMap::new(), &Params::new())
                            .unwrap();
                    }
                });
            }
        });

        let expected = TrustMode::from_flag(client.trust_any_certificate());
        assert_eq!(client.transport.mode(), expected);
    }

    #[test]
    fn test_prepare_request_uses_current_config() {
        let client = client();
        client.set_endpoint("http://localhost:8080/v1").set_project("demo");

        let request = client
            .prepare_request(Method::GET, "/account", &BTreeMap::new(), &Params::new())
            .unwrap();

        assert_eq!(request.url.as_str(), "http://localhost:8080/v1/account");
        assert_eq!(request.header("x-appwrite-project"), Some("demo"));
    }

    #[test]
    fn test_prepare_request_with_bad_endpoint() {
        let client = client();
        client.set_endpoint("localhost");

        let result = client.prepare_request(Method::GET, "/x", &BTreeMap::new(), &Params::new());
        assert!(matches!(result, Err(ClientError::MalformedUrl(_))));
    }
}
