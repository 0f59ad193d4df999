mod session;
mod user;

pub use session::PostgresSessionStore;
pub use user::PostgresUserDirectory;
