//! Session Module
//!
//! This module holds per-respondent state between requests:
//! - SynthesisList: the ordered records waiting to be submitted
//! - SessionStore: sessions keyed by id, created once a link check grants access

mod list;
mod store;

pub use list::SynthesisList;
pub use store::{
    DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_SECS, Session, SessionError, SessionHandle, SessionStore,
};
