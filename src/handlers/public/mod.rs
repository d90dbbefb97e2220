// handlers/public/mod.rs - Public handlers (no session required)
//
// Security Level: None
// Middleware: authentication runs but never rejects

pub mod auth;
pub mod system;

pub use auth::login_post;
pub use system::{health, root};
