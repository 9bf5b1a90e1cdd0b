// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login; // POST /auth/login/:tenant/:user - open a session and get a token

pub use login::session_login;
