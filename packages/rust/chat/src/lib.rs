//! Chat integration for the answer chain.
//!
//! Conversation history lives behind an injected [`SessionStore`], and the
//! handler routes incoming messages through the chain plus the result
//! post-processor. Webhook transports and translation stay outside this
//! crate; callers hand in plain messages.

pub mod handler;
pub mod session;

pub use handler::{ChatHandler, Incoming, UNSUPPORTED_KIND_REPLY};
pub use session::{MemorySessionStore, SessionStore};
