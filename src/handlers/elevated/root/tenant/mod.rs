// handlers/elevated/root/tenant/mod.rs - Tenant administration

pub mod create; // POST /api/root/tenants
pub mod grant;  // PUT /api/root/tenants/:tenant/users/:user
pub mod list;   // GET /api/root/tenants
pub mod show;   // GET /api/root/tenants/:tenant

pub use create::tenant_create;
pub use grant::tenant_grant;
pub use list::tenant_list;
pub use show::tenant_show;
