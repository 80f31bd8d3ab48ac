//! Mutex-serialized session registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::session::{Session, SessionState, SessionTimeout, generate_session_id};

/// Called with `(session_id, new_state)` while the manager lock is held.
///
/// Callbacks must not call back into the same manager.
pub type SessionEventCallback = Arc<dyn Fn(&str, SessionState) + Send + Sync>;

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Maximum sessions limit reached: {0}")]
    MaxSessionsReached(usize),
    #[error("Secure random source unavailable: {0}")]
    Random(String),
}

#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Upper bound on live sessions
    pub max_sessions: usize,
    /// Timeout applied by `SessionTimeout::Default`; `None` never expires
    pub default_timeout: Option<Duration>,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            default_timeout: Some(Duration::from_secs(3600)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub created_total: u64,
    pub expired_total: u64,
    pub terminated_total: u64,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    callback: Option<SessionEventCallback>,
    created_total: u64,
    expired_total: u64,
    terminated_total: u64,
}

impl Inner {
    fn notify(&self, session_id: &str, state: SessionState) {
        if let Some(callback) = &self.callback {
            callback(session_id, state);
        }
    }

    fn active_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.state == SessionState::Active)
            .count()
    }
}

/// Process-wide session registry
pub struct SessionManager {
    inner: Mutex<Inner>,
    config: SessionManagerConfig,
}

impl SessionManager {
    pub fn new(config: SessionManagerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
        }
    }

    /// Manager whose default timeout is `seconds` (0 disables expiry)
    pub fn with_default_timeout_seconds(seconds: u64) -> Self {
        Self::new(SessionManagerConfig {
            default_timeout: (seconds > 0).then(|| Duration::from_secs(seconds)),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    pub fn set_event_callback(&self, callback: SessionEventCallback) {
        self.inner.lock().callback = Some(callback);
    }

    pub fn clear_event_callback(&self) {
        self.inner.lock().callback = None;
    }

    /// Create a new active session.
    pub fn create(&self, timeout: SessionTimeout) -> Result<Session, SessionError> {
        let mut inner = self.inner.lock();

        if inner.sessions.len() >= self.config.max_sessions {
            error!(
                max_sessions = self.config.max_sessions,
                "No available session slots"
            );
            return Err(SessionError::MaxSessionsReached(self.config.max_sessions));
        }

        let mut session_id = generate_session_id()?;
        while inner.sessions.contains_key(&session_id) {
            session_id = generate_session_id()?;
        }

        let session = Session::new(session_id.clone(), timeout.resolve(self.config.default_timeout));
        inner.sessions.insert(session_id.clone(), session.clone());
        inner.created_total += 1;
        inner.notify(&session_id, SessionState::Active);

        info!(
            session_id = %session_id,
            timeout_secs = session.timeout.map(|t| t.as_secs()),
            "Created session"
        );
        Ok(session)
    }

    /// Look up an active session.
    ///
    /// A session found past its timeout transitions to `Expired`, fires the
    /// callback once and is reported as absent.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = Utc::now();

        let session = inner.sessions.get_mut(session_id)?;
        match session.state {
            SessionState::Active if session.is_expired_at(now) => {
                session.state = SessionState::Expired;
                inner.expired_total += 1;
                inner.notify(session_id, SessionState::Expired);
                debug!(session_id = %session_id, "Session expired on lookup");
                None
            }
            SessionState::Active => Some(session.clone()),
            _ => None,
        }
    }

    /// Refresh `last_access`. Returns false if the session is not active.
    pub fn touch(&self, session_id: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.sessions.get_mut(session_id) {
            Some(session) if session.state == SessionState::Active => {
                session.touch();
                true
            }
            _ => false,
        }
    }

    /// Terminate an active session. Returns false if there was none.
    pub fn terminate(&self, session_id: &str) -> bool {
        let mut inner = self.inner.lock();
        let is_active = inner
            .sessions
            .get(session_id)
            .is_some_and(|s| s.state == SessionState::Active);
        if !is_active {
            return false;
        }

        inner.sessions.remove(session_id);
        inner.terminated_total += 1;
        inner.notify(session_id, SessionState::Terminated);
        info!(session_id = %session_id, "Terminated session");
        true
    }

    /// Remove every expired session; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = Utc::now();

        let stale: Vec<(String, bool)> = inner
            .sessions
            .values()
            .filter(|s| s.state == SessionState::Expired || s.is_expired_at(now))
            .map(|s| (s.session_id.clone(), s.state == SessionState::Active))
            .collect();

        for (session_id, was_active) in &stale {
            inner.sessions.remove(session_id);
            if *was_active {
                inner.expired_total += 1;
                inner.notify(session_id, SessionState::Expired);
            }
            debug!(session_id = %session_id, "Cleaned up expired session");
        }

        if !stale.is_empty() {
            info!("Cleaned up {} expired sessions", stale.len());
        }
        stale.len()
    }

    /// Attach a value to an active session
    pub fn set_user_data(&self, session_id: &str, key: impl Into<String>, value: Value) -> bool {
        let mut inner = self.inner.lock();
        match inner.sessions.get_mut(session_id) {
            Some(session) if session.state == SessionState::Active => {
                session.user_data.insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().active_count()
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.inner.lock();
        SessionStats {
            active_sessions: inner.active_count(),
            max_sessions: self.config.max_sessions,
            created_total: inner.created_total,
            expired_total: inner.expired_total,
            terminated_total: inner.terminated_total,
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionManagerConfig::default())
    }
}
