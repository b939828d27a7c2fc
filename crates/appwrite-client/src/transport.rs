//! Transport factory
//!
//! Builds the reqwest client every call is dispatched on. The factory knows
//! two trust modes; [`TrustMode::AcceptAny`] turns off certificate chain and
//! hostname verification and must never be used for production traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{
    config::TransportConfig,
    cookie::PersistentCookieJar,
    error::{ClientError, Result},
};

/// Certificate trust policy of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustMode {
    /// Platform trust store with hostname verification
    Strict,
    /// INSECURE: accepts every certificate chain and every hostname.
    ///
    /// Exists only for development against self-signed endpoints. Neither the
    /// authenticity nor the identity of the server is checked.
    AcceptAny,
}

impl TrustMode {
    pub fn from_flag(trust_any_certificate: bool) -> Self {
        if trust_any_certificate {
            TrustMode::AcceptAny
        } else {
            TrustMode::Strict
        }
    }
}

/// Build a transport for the given trust mode and cookie jar
pub fn build_transport(
    trust: TrustMode,
    cookie_jar: Arc<PersistentCookieJar>,
    config: &TransportConfig,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .cookie_provider(cookie_jar)
        .redirect(if config.max_redirects > 0 {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        });

    if trust == TrustMode::AcceptAny {
        warn!("Transport accepts any certificate and hostname; never use in production");
        builder = builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }

    builder
        .build()
        .map_err(|e| ClientError::TlsConfiguration(e.to_string()))
}

/// Transport shared by every call of one client.
///
/// Calls take a [`snapshot`](SharedTransport::snapshot) at dispatch time, so a
/// rebuild never affects a call that is already in flight.
#[derive(Debug)]
pub struct SharedTransport {
    current: RwLock<Installed>,
    generation: AtomicU64,
    cookie_jar: Arc<PersistentCookieJar>,
    config: TransportConfig,
}

#[derive(Debug)]
struct Installed {
    client: reqwest::Client,
    trust: TrustMode,
}

impl SharedTransport {
    pub fn new(
        trust: TrustMode,
        cookie_jar: Arc<PersistentCookieJar>,
        config: TransportConfig,
    ) -> Result<Self> {
        let client = build_transport(trust, cookie_jar.clone(), &config)?;
        Ok(Self {
            current: RwLock::new(Installed { client, trust }),
            generation: AtomicU64::new(0),
            cookie_jar,
            config,
        })
    }

    /// Transport to dispatch the next call on
    pub fn snapshot(&self) -> reqwest::Client {
        self.current.read().client.clone()
    }

    /// Trust mode of the installed transport
    pub fn mode(&self) -> TrustMode {
        self.current.read().trust
    }

    /// Build a transport for `trust` with this transport's jar and settings,
    /// without installing it
    pub fn build(&self, trust: TrustMode) -> Result<reqwest::Client> {
        build_transport(trust, self.cookie_jar.clone(), &self.config)
    }

    /// Install a transport previously built for `trust`
    pub fn install(&self, client: reqwest::Client, trust: TrustMode) {
        *self.current.write() = Installed { client, trust };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Transport rebuilt ({:?}), generation {}", trust, generation);
    }

    /// Replace the transport with one built for `trust`.
    ///
    /// On failure the previous transport stays in place.
    pub fn rebuild(&self, trust: TrustMode) -> Result<()> {
        let client = self.build(trust)?;
        self.install(client, trust);
        Ok(())
    }

    /// Number of rebuilds since construction
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn cookie_jar(&self) -> &Arc<PersistentCookieJar> {
        &self.cookie_jar
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}
