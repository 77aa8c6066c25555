//! # Fields
//!
//! Key/value storage exposed to components in four scopes:
//!
//! - **request** - lives for one request, seeded with `web:request-id`
//! - **session** - lives for a client session, kept in a [`SessionStore`]
//! - **webapp** - shared by all requests of one application
//! - **server** - shared by all applications, seeded with `web:product` and `web:vendor`
//!
//! Keys starting with the private prefix `web:` are reserved for Servlex itself. They are
//! readable through [`Properties::get`] but can only be written through
//! [`Properties::set_private`].

use crate::error::TechnicalException;
use crate::model::{Item, Sequence};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Prefix of the keys reserved for Servlex.
pub const PRIVATE_PREFIX: &str = "web:";

pub const PRODUCT_NAME: &str = env!("CARGO_PKG_NAME");
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VENDOR: &str = "Servlex contributors";

/// A scope of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldScope {
    Request,
    Session,
    Webapp,
    Server,
}

impl std::str::FromStr for FieldScope {
    type Err = TechnicalException;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(FieldScope::Request),
            "session" => Ok(FieldScope::Session),
            "webapp" => Ok(FieldScope::Webapp),
            "server" => Ok(FieldScope::Server),
            other => Err(TechnicalException::new(format!("unknown field scope: {other}"))),
        }
    }
}

/// External key/value store backing a scope.
pub trait FieldStore: Send + Sync {
    /// The value for `key`, or the empty sequence.
    fn get(&self, key: &str) -> Sequence;

    /// Store a value, returning the previous one. Private keys are refused.
    fn set(&self, key: &str, value: Sequence) -> Result<Option<Sequence>, TechnicalException>;

    fn keys(&self) -> Vec<String>;
}

/// Thread-safe field map with the private-prefix rules.
#[derive(Debug, Default)]
pub struct Properties {
    map: DashMap<String, Sequence>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server-scoped properties, seeded with the product name and vendor.
    pub fn server() -> Self {
        let props = Self::new();
        props.seed("web:product", format!("{PRODUCT_NAME} {PRODUCT_VERSION}"));
        props.seed("web:vendor", VENDOR.to_string());
        props
    }

    /// Request-scoped properties, seeded with the request id.
    pub fn request(request_id: &str) -> Self {
        let props = Self::new();
        props.seed("web:request-id", request_id.to_string());
        props
    }

    fn seed(&self, key: &str, value: String) {
        self.map
            .insert(key.to_string(), Sequence::singleton(Item::String(value)));
    }

    /// The value for `key`, or the empty sequence when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Sequence {
        self.map
            .get(key)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Store a public field. Fails on keys with the private prefix.
    pub fn set(&self, key: &str, value: Sequence) -> Result<Option<Sequence>, TechnicalException> {
        if key.starts_with(PRIVATE_PREFIX) {
            return Err(TechnicalException::new(format!(
                "field name uses the reserved prefix '{PRIVATE_PREFIX}': {key}"
            )));
        }
        debug!(key = %key, items = value.len(), "Setting field");
        Ok(self.map.insert(key.to_string(), value))
    }

    /// Read a private field as a string. The key must use the private prefix.
    pub fn get_private(&self, key: &str) -> Result<Option<String>, TechnicalException> {
        check_private(key)?;
        Ok(self
            .map
            .get(key)
            .and_then(|v| v.value().item_at(0).map(Item::string_value)))
    }

    /// Store a private string field. The key must use the private prefix.
    pub fn set_private(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<Sequence>, TechnicalException> {
        check_private(key)?;
        Ok(self
            .map
            .insert(key.to_string(), Sequence::singleton(value)))
    }

    pub fn remove(&self, key: &str) -> Option<Sequence> {
        self.map.remove(key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

fn check_private(key: &str) -> Result<(), TechnicalException> {
    if key.starts_with(PRIVATE_PREFIX) {
        Ok(())
    } else {
        Err(TechnicalException::new(format!(
            "private field name must start with '{PRIVATE_PREFIX}': {key}"
        )))
    }
}

impl FieldStore for Properties {
    fn get(&self, key: &str) -> Sequence {
        Properties::get(self, key)
    }

    fn set(&self, key: &str, value: Sequence) -> Result<Option<Sequence>, TechnicalException> {
        Properties::set(self, key, value)
    }

    fn keys(&self) -> Vec<String> {
        Properties::keys(self)
    }
}

/// Sessions idle longer than this are dropped.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Live sessions kept at most, before the least recently used ones are evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
struct Session {
    fields: Arc<Properties>,
    last_access: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            fields: Arc::new(Properties::new()),
            last_access: now,
        }
    }
}

/// Session registry, keyed by session id.
///
/// A session expires once it has not been accessed for the idle timeout. When creating a
/// session would exceed the capacity, expired sessions are purged first, then the least
/// recently accessed ones. Concurrent creations may overshoot the capacity by the number
/// of racing requests.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    max_sessions: usize,
    timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `max_sessions` sessions, each expiring after `timeout`
    /// without access.
    pub fn with_limits(max_sessions: usize, timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
            timeout,
        }
    }

    fn is_live(&self, session: &Session, now: Instant) -> bool {
        now.saturating_duration_since(session.last_access) < self.timeout
    }

    /// The live session `id`, refreshing its last access.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Properties>> {
        let now = Instant::now();
        let fields = self.sessions.get_mut(id).and_then(|mut session| {
            if self.is_live(&session, now) {
                session.last_access = now;
                Some(Arc::clone(&session.fields))
            } else {
                None
            }
        });
        if fields.is_none() {
            self.sessions.remove_if(id, |_, s| !self.is_live(s, now));
        }
        fields
    }

    /// The session `id`, created empty if it does not exist yet or has expired.
    pub fn get_or_create(&self, id: &str) -> Arc<Properties> {
        let now = Instant::now();
        if !self.sessions.contains_key(id) && self.sessions.len() >= self.max_sessions {
            self.evict(now);
        }
        let mut entry = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::new(now));
        if !self.is_live(&entry, now) {
            debug!(session_id = %id, "Session expired, starting a new one");
            *entry = Session::new(now);
        }
        entry.last_access = now;
        Arc::clone(&entry.fields)
    }

    /// Drop expired sessions, then the least recently accessed ones until there is room
    /// for one more.
    fn evict(&self, now: Instant) {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| self.is_live(s, now));
        while self.sessions.len() >= self.max_sessions {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|s| s.last_access)
                .map(|s| s.key().clone());
            match oldest {
                Some(id) => {
                    self.sessions.remove(&id);
                }
                None => break,
            }
        }
        debug!(
            evicted = before.saturating_sub(self.sessions.len()),
            remaining = self.sessions.len(),
            "Sessions evicted"
        );
    }

    pub fn invalidate(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// The four field scopes visible to one request.
pub struct FieldContext<'a> {
    pub request: &'a Properties,
    pub session: Option<Arc<Properties>>,
    pub webapp: &'a Properties,
    pub server: &'a dyn FieldStore,
}

impl FieldContext<'_> {
    /// The value of `key` in `scope`. A missing session reads as empty.
    #[must_use]
    pub fn get(&self, scope: FieldScope, key: &str) -> Sequence {
        match scope {
            FieldScope::Request => self.request.get(key),
            FieldScope::Session => self
                .session
                .as_ref()
                .map(|s| s.get(key))
                .unwrap_or_default(),
            FieldScope::Webapp => self.webapp.get(key),
            FieldScope::Server => self.server.get(key),
        }
    }

    /// Store `value` under `key` in `scope`.
    pub fn set(
        &self,
        scope: FieldScope,
        key: &str,
        value: Sequence,
    ) -> Result<Option<Sequence>, TechnicalException> {
        match scope {
            FieldScope::Request => self.request.set(key, value),
            FieldScope::Session => match &self.session {
                Some(session) => session.set(key, value),
                None => Err(TechnicalException::new(format!(
                    "no session to store field {key} in"
                ))),
            },
            FieldScope::Webapp => self.webapp.set(key, value),
            FieldScope::Server => self.server.set(key, value),
        }
    }
}
