// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition only. Handlers here never see a SecurityContext and must
// treat every input as untrusted.

pub mod auth;
