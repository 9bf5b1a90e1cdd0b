// handlers/protected/auth/mod.rs - Session handlers for authenticated users

pub mod session;

pub use session::{session_logout, session_refresh, session_whoami};
