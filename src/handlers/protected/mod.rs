// handlers/protected/mod.rs - Protected handlers (validated security context required)
//
// Every route in this tier sits behind security_context_middleware, so handlers
// receive the SecurityContext as an explicit Extension and call the guard
// checks themselves.

pub mod auth;     // Session management for the current context
pub mod modules;  // Cellular module boundaries
pub mod security; // Tenant security policy
