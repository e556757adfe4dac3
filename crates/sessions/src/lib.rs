//! Session persistence for Launchpad.
//!
//! A session is written once, when provisioning succeeds, and read back by
//! later lookups and action calls.  [`SessionStore`] is the contract;
//! [`FileSessionStore`] and [`MemorySessionStore`] are the two backends.

pub mod file;
pub mod memory;
pub mod store;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
pub use store::{SessionStore, StoreError, StoreResult};
