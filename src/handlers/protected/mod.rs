// handlers/protected/mod.rs - Handlers behind an authenticated session
//
// Security Level: authenticated session token
// Middleware: admin, reseller and module gatekeepers guard their dashboards;
//             module routes additionally run inside a tenant binding

pub mod dashboards;
pub mod modules;
pub mod selection;

pub use dashboards::{admin_dashboard, no_access, reseller_dashboard};
pub use modules::{module_dashboard, module_section};
pub use selection::{
    access_selection_get, access_selection_post, business_select_post, business_selection_get,
    business_switch_post, logout_post,
};
