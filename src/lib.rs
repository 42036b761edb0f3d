//! # Gatehouse
//!
//! `gatehouse` is a small server-rendered web application: user registration,
//! login and logout, with session state carried in an HMAC-signed cookie.
//!
//! ## Sessions
//!
//! There is no server-side session registry. Every response that touches the
//! session writes the whole (typed) session back into the cookie, so a request
//! either persists all of its session mutations or none of them.
//!
//! ## Brute-force throttling
//!
//! Failed password checks are counted per session. Once the counter reaches
//! the limit, further logins are refused without querying the database and the
//! visitor sees the same outcome as a wrong password. Unknown emails and wrong
//! passwords are indistinguishable to prevent account enumeration.

pub mod cli;
pub mod gatehouse;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
