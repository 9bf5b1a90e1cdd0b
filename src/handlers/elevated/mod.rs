// handlers/elevated/mod.rs - Elevated handlers (root key required)
//
// Tenant onboarding and grant management. Routes are mounted under /api/root
// behind root_key_middleware.

pub mod root;
