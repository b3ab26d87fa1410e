//! Storage layer: the session store and the member roster.

pub mod roster;
pub mod session;

pub use roster::{InMemoryRoster, MemberRepository};
pub use session::{MemoryBackend, SessionBackend, SessionStore};
