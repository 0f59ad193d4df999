//! Process-local adapters, used when no database is configured and in tests.

mod revocation;
mod session;
mod user;

pub use revocation::InMemoryRevocationStore;
pub use session::InMemorySessionStore;
pub use user::InMemoryUserDirectory;
