//! Shared types for the Launchpad crates: configuration, the session
//! record, structured trace events and the common error type.

pub mod config;
pub mod error;
pub mod session;
pub mod trace;

pub use error::{Error, Result};
pub use session::{ActionOutcome, Provisioned, SessionId, SessionRecord};
