//! Cookie jar adapter
//!
//! Bridges reqwest's [`CookieStore`] hook to a persistent [`CookieStorage`]
//! supplied by the host application. Every `Set-Cookie` is accepted; cookies
//! are keyed by the host of the URL that set them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{trace, warn};
use url::Url;

/// A stored `name=value` cookie pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Persistent cookie backend, one cookie list per domain
pub trait CookieStorage: Send + Sync {
    /// Replace the cookies kept for `domain`
    fn store(&self, domain: &str, cookies: Vec<Cookie>);

    /// Cookies kept for `domain`, empty if none
    fn load(&self, domain: &str) -> Vec<Cookie>;
}

/// Thread-safe in-memory cookie storage
#[derive(Debug, Default)]
pub struct InMemoryCookieStorage {
    domains: RwLock<HashMap<String, Vec<Cookie>>>,
}

impl InMemoryCookieStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of domains with stored cookies (for testing)
    pub fn domain_count(&self) -> usize {
        self.domains.read().len()
    }
}

impl CookieStorage for InMemoryCookieStorage {
    fn store(&self, domain: &str, cookies: Vec<Cookie>) {
        let mut domains = self.domains.write();
        if cookies.is_empty() {
            domains.remove(domain);
        } else {
            domains.insert(domain.to_string(), cookies);
        }
    }

    fn load(&self, domain: &str) -> Vec<Cookie> {
        self.domains.read().get(domain).cloned().unwrap_or_default()
    }
}

/// reqwest cookie provider backed by a [`CookieStorage`]
pub struct PersistentCookieJar {
    storage: Arc<dyn CookieStorage>,
    // serializes load/merge/store so concurrent responses don't drop cookies
    update: Mutex<()>,
}

impl PersistentCookieJar {
    pub fn new(storage: Arc<dyn CookieStorage>) -> Self {
        Self {
            storage,
            update: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn CookieStorage> {
        &self.storage
    }
}

impl std::fmt::Debug for PersistentCookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCookieJar").finish_non_exhaustive()
    }
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let Some(domain) = url.host_str() else {
            return;
        };

        let _update = self.update.lock();
        let mut cookies = self.storage.load(domain);
        let mut changed = false;
        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                warn!("Ignoring non-UTF-8 Set-Cookie header from {}", domain);
                continue;
            };
            let Some(parsed) = parse_set_cookie(raw) else {
                continue;
            };

            cookies.retain(|c| c.name != parsed.cookie.name);
            if !parsed.expired {
                cookies.push(parsed.cookie);
            }
            changed = true;
        }

        if changed {
            trace!("Storing {} cookie(s) for {}", cookies.len(), domain);
            self.storage.store(domain, cookies);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let domain = url.host_str()?;
        let cookies = self.storage.load(domain);
        if cookies.is_empty() {
            return None;
        }

        let joined = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}

struct ParsedCookie {
    cookie: Cookie,
    expired: bool,
}

fn parse_set_cookie(raw: &str) -> Option<ParsedCookie> {
    let mut segments = raw.split(';');
    let (name, value) = segments.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let expired = segments.any(|attr| {
        attr.split_once('=').is_some_and(|(key, val)| {
            key.trim().eq_ignore_ascii_case("max-age")
                && val.trim().parse::<i64>().is_ok_and(|age| age <= 0)
        })
    });

    Some(ParsedCookie {
        cookie: Cookie::new(name, value.trim().trim_matches('"')),
        expired,
    })
}
