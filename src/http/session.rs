use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{event, Level};

use crate::auth::Session;
use crate::util::random::random_string;

pub const SESSION_COOKIE: &str = "oauthorize.sid";

pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_MAX_TRANSACTIONS: usize = 16;

struct Entry<C> {
    session: Session<C>,
    touched: Instant,
    seq: u64,
}

struct Sessions<C> {
    entries: HashMap<String, Entry<C>>,
    writes: u64,
}

/// In-process session storage keyed by the session cookie.
///
/// Requests work on a copy of their session and write it back when done, so
/// two concurrent requests on one session resolve as last writer wins.
/// Sessions idle for longer than `ttl` are dropped. Once `max_sessions` are
/// held, writing a new one evicts the least recently written.
pub struct SessionStore<C> {
    sessions: Mutex<Sessions<C>>,
    ttl: Duration,
    max_sessions: usize,
    max_transactions: usize,
}

impl<C> Default for SessionStore<C> {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL, DEFAULT_MAX_TRANSACTIONS)
    }
}

impl<C> std::fmt::Debug for SessionStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .field("max_sessions", &self.max_sessions)
            .field("max_transactions", &self.max_transactions)
            .finish_non_exhaustive()
    }
}

impl<C> SessionStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_sessions: usize, ttl: Duration, max_transactions: usize) -> Self {
        Self {
            sessions: Mutex::new(Sessions {
                entries: HashMap::new(),
                writes: 0,
            }),
            ttl,
            max_sessions: max_sessions.max(1),
            max_transactions,
        }
    }

    /// Pending transactions a single session may hold.
    pub fn max_transactions(&self) -> usize {
        self.max_transactions
    }

    pub async fn get(&self, sid: &str) -> Option<Session<C>> {
        let mut guard = self.sessions.lock().await;
        let expired = guard.entries.get(sid)?.touched.elapsed() >= self.ttl;
        if expired {
            guard.entries.remove(sid);
            return None;
        }
        guard.entries.get(sid).map(|e| e.session.clone())
    }

    pub async fn put(&self, sid: String, session: Session<C>) {
        let mut guard = self.sessions.lock().await;
        guard.writes += 1;
        let entry = Entry {
            session,
            touched: Instant::now(),
            seq: guard.writes,
        };
        let sessions = &mut guard.entries;
        if sessions.insert(sid.clone(), entry).is_some() {
            return;
        }

        while sessions.len() > self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(k, _)| **k != sid)
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                    event!(Level::DEBUG, "Session store full, evicted oldest session");
                }
                None => break,
            }
        }
    }

    pub async fn destroy(&self, sid: &str) -> Option<Session<C>> {
        self.sessions.lock().await.entries.remove(sid).map(|e| e.session)
    }

    /// Drops every session idle for longer than the TTL. Returns how many
    /// were dropped.
    pub async fn clean_up(&self) -> usize {
        let mut guard = self.sessions.lock().await;
        let sessions = &mut guard.entries;
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, e| e.touched.elapsed() < ttl);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    /// Returns the session for `sid`, or a fresh session under a new ID when
    /// `sid` is missing, unknown or expired.
    pub async fn open(&self, sid: Option<String>) -> (String, Session<C>) {
        if let Some(sid) = sid {
            if let Some(session) = self.get(&sid).await {
                return (sid, session);
            }
        }
        (random_string(32), Session::new())
    }
}

pub fn session_cookie(sid: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, sid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_reuses_known_sessions_only() {
        let store: SessionStore<()> = SessionStore::new();
        let mut session = Session::new();
        session.ensure_store("authorize");
        store.put("known".to_string(), session).await;

        let (sid, session) = store.open(Some("known".to_string())).await;
        assert_eq!(sid, "known");
        assert!(session.store("authorize").is_some());

        let (sid, session) = store.open(Some("forged".to_string())).await;
        assert_ne!(sid, "forged");
        assert!(session.store("authorize").is_none());
    }

    #[tokio::test]
    async fn destroy_forgets_the_session() {
        let store: SessionStore<()> = SessionStore::new();
        store.put("sid".to_string(), Session::new()).await;
        assert!(store.destroy("sid").await.is_some());
        assert!(store.get("sid").await.is_none());
    }

    #[tokio::test]
    async fn store_never_holds_more_than_max_sessions() {
        let store: SessionStore<()> = SessionStore::with_limits(8, DEFAULT_SESSION_TTL, 1);
        store.put("first".to_string(), Session::new()).await;

        for _ in 0..1000 {
            let (sid, session) = store.open(None).await;
            store.put(sid, session).await;
        }

        assert_eq!(store.len().await, 8);
        assert!(store.get("first").await.is_none());
    }

    #[tokio::test]
    async fn rewriting_a_held_session_does_not_evict() {
        let store: SessionStore<()> = SessionStore::with_limits(2, DEFAULT_SESSION_TTL, 1);
        store.put("a".to_string(), Session::new()).await;
        store.put("b".to_string(), Session::new()).await;
        store.put("a".to_string(), Session::new()).await;

        assert!(store.get("a").await.is_some());
        assert!(store.get("b").await.is_some());

        store.put("c".to_string(), Session::new()).await;
        assert!(store.get("b").await.is_none());
        assert!(store.get("a").await.is_some());
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store: SessionStore<()> = SessionStore::with_limits(8, Duration::from_secs(0), 1);
        store.put("sid".to_string(), Session::new()).await;
        store.put("other".to_string(), Session::new()).await;

        assert!(store.get("sid").await.is_none());
        assert_eq!(store.clean_up().await, 1);
        assert_eq!(store.len().await, 0);
    }

    #[test]
    fn cookie_carries_the_session_id() {
        assert!(session_cookie("abc").starts_with("oauthorize.sid=abc;"));
    }
}
