// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (session token) → Elevated (root key)
pub mod public;    // Tier 1: No authentication required (/auth/*)
pub mod protected; // Tier 2: Validated security context required (/api/*)
pub mod elevated;  // Tier 3: Root key required (/api/root/*)
