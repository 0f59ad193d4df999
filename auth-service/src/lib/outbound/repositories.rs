pub mod memory;
pub mod postgres;

pub use memory::InMemoryRevocationStore;
pub use memory::InMemorySessionStore;
pub use memory::InMemoryUserDirectory;
pub use postgres::PostgresSessionStore;
pub use postgres::PostgresUserDirectory;
