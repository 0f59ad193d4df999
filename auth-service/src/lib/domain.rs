pub mod auth;
pub mod identity;
pub mod locks;
pub mod rate_limit;
pub mod revocation;
pub mod session;
pub mod user;
