pub mod admin;
pub mod auth;
pub mod module;
pub mod reseller;
pub mod response;
pub mod tenancy;

pub use admin::admin_gate;
pub use auth::{authenticate_middleware, AuthUser};
pub use module::{module_gate, ActiveModule};
pub use reseller::reseller_gate;
pub use response::{navigate, ApiResponse, ApiResult, ClientKind, Denial};
pub use tenancy::tenancy_middleware;
