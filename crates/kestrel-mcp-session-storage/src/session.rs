use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SessionError;

/// Longest session id accepted from a client
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Expired,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Active => "active",
            SessionState::Expired => "expired",
            SessionState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Timeout requested at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionTimeout {
    /// Use the manager's default timeout
    #[default]
    Default,
    Explicit(Duration),
    /// Never expires
    Never,
}

impl SessionTimeout {
    /// Map a signed seconds value: 0 is the default, negative never expires.
    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            0 => SessionTimeout::Default,
            s if s < 0 => SessionTimeout::Never,
            s => SessionTimeout::Explicit(Duration::from_secs(s as u64)),
        }
    }

    pub(crate) fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            SessionTimeout::Default => default,
            SessionTimeout::Explicit(d) if d.is_zero() => None,
            SessionTimeout::Explicit(d) => Some(d),
            SessionTimeout::Never => None,
        }
    }
}

/// A snapshot of one session.
///
/// The manager hands out clones; mutations go through the manager by id.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
    /// `None` means the session never expires
    pub timeout: Option<Duration>,
    pub user_data: HashMap<String, Value>,
}

impl Session {
    pub(crate) fn new(session_id: String, timeout: Option<Duration>) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            state: SessionState::Active,
            created_at: now,
            last_access: now,
            timeout,
            user_data: HashMap::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_access = Utc::now();
    }

    /// `timeout > 0 && now - last_access > timeout`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() => {
                let idle = now.signed_duration_since(self.last_access);
                idle.to_std().map(|idle| idle > timeout).unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Generate a session id: 16 bytes from the OS CSPRNG, lowercase hex.
pub fn generate_session_id() -> Result<String, SessionError> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|e| SessionError::Random(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// A session id is valid iff it is 1..=128 bytes of visible ASCII (0x21..=0x7E).
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id.bytes().all(|b| (0x21..=0x7E).contains(&b))
}
