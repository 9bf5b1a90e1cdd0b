pub mod auth;
pub mod response;

pub use auth::{request_metadata, root_key_middleware, security_context_middleware, ROOT_KEY_HEADER};
pub use response::{ApiResponse, ApiResult};
