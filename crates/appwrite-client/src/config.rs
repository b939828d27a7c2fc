//! Client configuration
//!
//! [`ClientConfig`] is the per-client store for endpoints, default headers and
//! session attributes. [`TransportConfig`] carries the connection tuning that
//! feeds the transport factory, and [`SdkInfo`] the platform metadata used to
//! fill identifying headers.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Endpoint used until the caller configures one
pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";

/// Response format the engine understands
pub const RESPONSE_FORMAT: &str = "1.6.0";

/// SDK version reported in `x-sdk-version`
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Content type that switches request encoding to multipart
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

pub(crate) const SESSION_PROJECT: &str = "project";
pub(crate) const SESSION_JWT: &str = "jwt";
pub(crate) const SESSION_LOCALE: &str = "locale";

/// Transport tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Maximum redirects to follow (0 = no redirects)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set redirect limit
    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_redirects() -> usize {
    10
}

/// Platform metadata for the identifying headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInfo {
    /// Application package / bundle identifier
    pub package_name: String,
    /// Application version
    pub app_version: String,
    /// Free-form platform agent appended to the user-agent
    #[serde(default = "default_platform_agent")]
    pub platform_agent: String,
}

impl SdkInfo {
    pub fn new(package_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            app_version: app_version.into(),
            platform_agent: default_platform_agent(),
        }
    }

    pub fn with_platform_agent(mut self, agent: impl Into<String>) -> Self {
        self.platform_agent = agent.into();
        self
    }

    /// Headers present on every request unless overridden
    pub fn default_headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert(
            "origin".to_string(),
            format!("appwrite-rust://{}", self.package_name),
        );
        headers.insert(
            "user-agent".to_string(),
            format!(
                "{}/{}, {}",
                self.package_name, self.app_version, self.platform_agent
            ),
        );
        headers.insert("x-sdk-name".to_string(), "Rust".to_string());
        headers.insert("x-sdk-platform".to_string(), "client".to_string());
        headers.insert("x-sdk-language".to_string(), "rust".to_string());
        headers.insert("x-sdk-version".to_string(), SDK_VERSION.to_string());
        headers.insert(
            "x-appwrite-response-format".to_string(),
            RESPONSE_FORMAT.to_string(),
        );
        headers
    }
}

fn default_platform_agent() -> String {
    format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Per-client configuration store.
///
/// Header keys are lowercased on insert so lookups and merges are
/// case-insensitive; the last write for a key wins.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    endpoint: String,
    endpoint_realtime: Option<String>,
    realtime_explicit: bool,
    trust_any_certificate: bool,
    headers: BTreeMap<String, String>,
    session: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn new(default_headers: BTreeMap<String, String>) -> Self {
        let mut config = Self {
            endpoint: String::new(),
            endpoint_realtime: None,
            realtime_explicit: false,
            trust_any_certificate: false,
            headers: BTreeMap::new(),
            session: BTreeMap::new(),
        };
        for (key, value) in default_headers {
            config.add_header(&key, &value);
        }
        config.set_endpoint(DEFAULT_ENDPOINT);
        config
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn endpoint_realtime(&self) -> Option<&str> {
        self.endpoint_realtime.as_deref()
    }

    pub fn trust_any_certificate(&self) -> bool {
        self.trust_any_certificate
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn session(&self) -> &BTreeMap<String, String> {
        &self.session
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Set the base endpoint.
    ///
    /// Unless a realtime endpoint was set explicitly, the realtime endpoint
    /// follows this one with `http` mapped to `ws` and `https` to `wss`.
    /// Other schemes leave no derived realtime endpoint.
    pub fn set_endpoint(&mut self, endpoint: &str) -> &mut Self {
        self.endpoint = endpoint.to_string();
        if !self.realtime_explicit {
            self.endpoint_realtime = realtime_from(endpoint);
        }
        self
    }

    pub fn set_endpoint_realtime(&mut self, endpoint: &str) -> &mut Self {
        self.endpoint_realtime = Some(endpoint.to_string());
        self.realtime_explicit = true;
        self
    }

    pub fn set_project(&mut self, project: &str) -> &mut Self {
        self.session.insert(SESSION_PROJECT.to_string(), project.to_string());
        self.add_header("x-appwrite-project", project)
    }

    pub fn set_jwt(&mut self, jwt: &str) -> &mut Self {
        self.session.insert(SESSION_JWT.to_string(), jwt.to_string());
        self.add_header("x-appwrite-jwt", jwt)
    }

    pub fn set_locale(&mut self, locale: &str) -> &mut Self {
        self.session.insert(SESSION_LOCALE.to_string(), locale.to_string());
        self.add_header("x-appwrite-locale", locale)
    }

    pub fn add_header(&mut self, key: &str, value: &str) -> &mut Self {
        self.headers.insert(key.to_ascii_lowercase(), value.to_string());
        self
    }

    /// Record the trust mode; returns whether it changed
    pub(crate) fn set_trust_any_certificate(&mut self, trust: bool) -> bool {
        let changed = self.trust_any_certificate != trust;
        self.trust_any_certificate = trust;
        changed
    }
}

/// Map an http(s) endpoint onto its websocket counterpart
fn realtime_from(endpoint: &str) -> Option<String> {
    let (scheme, rest) = endpoint.split_once("://")?;
    let ws = if scheme.eq_ignore_ascii_case("https") {
        "wss"
    } else if scheme.eq_ignore_ascii_case("http") {
        "ws"
    } else {
        return None;
    };
    Some(format!("{ws}://{rest}"))
}
