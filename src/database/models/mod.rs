pub mod business;
pub mod module;
pub mod tenant;
pub mod user;

pub use business::{Business, BusinessId, BusinessRecord, ResellerId, Subscription, SubscriptionStatus};
pub use module::{Module, ModuleStatus};
pub use tenant::{Tenant, TenantData};
pub use user::{User, UserType};
