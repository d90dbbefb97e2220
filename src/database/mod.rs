pub mod central;
pub mod manager;
pub mod models;
pub mod session_store;

pub use central::PgDirectory;
pub use manager::{DatabaseError, DatabaseManager};
pub use session_store::PgSessionStore;
