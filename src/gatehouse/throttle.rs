//! Session-scoped brute-force throttles.
//!
//! The counters live in the visitor's session, not per account: clearing the
//! cookie resets them. Nothing decrements a counter except [`Session::empty`].

use super::session::Session;

/// Failed attempts after which a session is blocked.
pub const MAX_ATTEMPTS: u32 = 5;

/// Count one failed password check and return the new total.
pub fn record_attempt(session: &mut Session) -> u32 {
    session.login_attempts = session.login_attempts.saturating_add(1);
    session.login_attempts
}

#[must_use]
pub fn is_blocked(session: &Session) -> bool {
    session.login_attempts >= MAX_ATTEMPTS
}

/// Registration gate. No handler increments `register_attempts`, so this
/// only trips for sessions carrying a counter from elsewhere.
#[must_use]
pub fn is_register_blocked(session: &Session) -> bool {
    session.register_attempts >= MAX_ATTEMPTS
}
