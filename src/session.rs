use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use actix_web::HttpRequest;
use anyhow::{bail, Result};
use log::debug;

/// Storage of per session role lists.
///
/// `get` must tell a session that never had roles assigned (`None`) apart from
/// one whose role list is empty (`Some(vec![])`).
pub trait SessionStore: Send + Sync {
    fn get(&self, req: &HttpRequest, key: &str) -> Result<Option<Vec<String>>>;

    fn set(&self, req: &HttpRequest, key: &str, roles: Vec<String>) -> Result<()>;
}

/// Session access handed to actions that accept it, see
/// [`crate::action::Capabilities::bind_session`].
#[derive(Clone)]
pub struct SessionBinding {
    key: String,
    store: Arc<dyn SessionStore>,
    req: HttpRequest,
}

impl SessionBinding {
    pub fn new(key: impl ToString, store: Arc<dyn SessionStore>, req: HttpRequest) -> Self {
        Self {
            key: key.to_string(),
            store,
            req,
        }
    }

    /// The session key the role list is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replaces the role list of the current session.
    pub fn set_roles<I, S>(&self, roles: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let roles: Vec<String> = roles.into_iter().map(|r| r.to_string()).collect();
        self.store.set(&self.req, &self.key, roles)
    }

    pub fn roles(&self) -> Result<Option<Vec<String>>> {
        self.store.get(&self.req, &self.key)
    }
}

type SessionValues = HashMap<String, Vec<String>>;

struct Session {
    values: SessionValues,
    expire_at: Instant,
}

impl Session {
    fn new(ttl: Duration) -> Self {
        Self {
            values: HashMap::new(),
            expire_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expire_at <= now
    }
}

/// A memory session store. Sessions are identified by a cookie and expire a
/// fixed time after they were opened. Expired sessions read as empty and are
/// dropped the next time a session is opened.
pub struct MemorySessionStore {
    cookie: String,
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub const DEFAULT_COOKIE: &'static str = "rbac_session";
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

    pub fn new(cookie: impl ToString) -> Self {
        Self {
            cookie: cookie.to_string(),
            ttl: Self::DEFAULT_TTL,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The cookie carrying the session id.
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Creates an empty session and returns its id.
    pub fn open(&self) -> String {
        let id = format!("{:032x}", rand::random::<u128>());

        let mut sessions = self.lock();
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        let purged = before - sessions.len();
        if purged > 0 {
            debug!("Purge {purged} expired sessions");
        }

        sessions.insert(id.clone(), Session::new(self.ttl));
        debug!("Open session {id}");
        id
    }

    /// Writes a value into the session `id`. A missing or expired session is
    /// replaced by a fresh one.
    pub fn insert(&self, id: &str, key: &str, roles: Vec<String>) {
        let mut sessions = self.lock();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| Session::new(self.ttl));
        if session.is_expired(Instant::now()) {
            *session = Session::new(self.ttl);
        }
        session.values.insert(key.to_string(), roles);
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            debug!("Remove session {id}");
        }
        removed
    }

    /// Removes the session of `req`, if any.
    pub fn close(&self, req: &HttpRequest) -> bool {
        match self.session_id(req) {
            Some(id) => self.remove(&id),
            None => false,
        }
    }

    /// Number of stored sessions, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn session_id(&self, req: &HttpRequest) -> Option<String> {
        req.cookie(&self.cookie).map(|c| c.value().to_string())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COOKIE)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, req: &HttpRequest, key: &str) -> Result<Option<Vec<String>>> {
        let id = match self.session_id(req) {
            Some(id) => id,
            None => return Ok(None),
        };

        let now = Instant::now();
        Ok(self
            .lock()
            .get(&id)
            .filter(|session| !session.is_expired(now))
            .and_then(|session| session.values.get(key))
            .cloned())
    }

    fn set(&self, req: &HttpRequest, key: &str, roles: Vec<String>) -> Result<()> {
        let id = match self.session_id(req) {
            Some(id) => id,
            None => bail!("request has no '{}' session cookie", self.cookie),
        };

        self.insert(&id, key, roles);
        Ok(())
    }
}
