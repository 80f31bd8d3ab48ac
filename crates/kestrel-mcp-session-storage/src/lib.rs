//! # Session registry
//!
//! Sessions bind successive Streamable HTTP requests through the
//! `Mcp-Session-Id` header. This crate owns their lifecycle: secure id
//! generation, lookup with lazy expiry, touch, termination, periodic sweeping
//! and a state-change callback.
//!
//! Storage is in-process only; sessions do not survive a restart.

mod manager;
mod session;

pub use manager::{SessionError, SessionEventCallback, SessionManager, SessionManagerConfig, SessionStats};
pub use session::{
    MAX_SESSION_ID_LEN, Session, SessionState, SessionTimeout, generate_session_id,
    is_valid_session_id,
};

/// Result alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;
