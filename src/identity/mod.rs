//! Authenticated identities and their capability predicates.
//!
//! Each `user_type` maps to one variant of [`IdentityKind`]; the variant decides
//! what the identity may do.

use uuid::Uuid;

use crate::access::ActiveBusiness;
use crate::database::models::{Business, BusinessId, ResellerId, User, UserType};

pub trait Capabilities {
    fn has_admin_access(&self) -> bool;

    fn has_reseller_access(&self) -> bool;

    /// Whether this identity may make `business` its active business.
    fn can_operate_business(&self, business: &Business) -> bool;

    /// Whether this identity may operate `module_code` under `business`.
    /// Only modules in the business's entitlement list can ever pass.
    fn can_access_module(&self, business: &ActiveBusiness, module_code: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct SystemAdmin;

#[derive(Debug, Clone)]
pub struct ResellerOperator {
    pub reseller_id: Option<ResellerId>,
}

#[derive(Debug, Clone)]
pub struct BusinessOperator {
    /// Set when the user works as staff of a reseller.
    pub reseller_id: Option<ResellerId>,
    pub business_ids: Vec<BusinessId>,
}

#[derive(Debug, Clone)]
pub struct Investor;

impl Capabilities for SystemAdmin {
    fn has_admin_access(&self) -> bool {
        true
    }

    fn has_reseller_access(&self) -> bool {
        false
    }

    fn can_operate_business(&self, _business: &Business) -> bool {
        true
    }

    fn can_access_module(&self, business: &ActiveBusiness, module_code: &str) -> bool {
        business.is_entitled(module_code)
    }
}

impl Capabilities for ResellerOperator {
    fn has_admin_access(&self) -> bool {
        false
    }

    fn has_reseller_access(&self) -> bool {
        true
    }

    fn can_operate_business(&self, business: &Business) -> bool {
        self.reseller_id.is_some() && business.reseller_id == self.reseller_id
    }

    fn can_access_module(&self, business: &ActiveBusiness, module_code: &str) -> bool {
        self.reseller_id.is_some()
            && business.reseller_id == self.reseller_id
            && business.is_entitled(module_code)
    }
}

impl Capabilities for BusinessOperator {
    fn has_admin_access(&self) -> bool {
        false
    }

    fn has_reseller_access(&self) -> bool {
        self.reseller_id.is_some()
    }

    fn can_operate_business(&self, business: &Business) -> bool {
        self.business_ids.contains(&business.id)
    }

    fn can_access_module(&self, business: &ActiveBusiness, module_code: &str) -> bool {
        self.business_ids.contains(&business.id) && business.is_entitled(module_code)
    }
}

impl Capabilities for Investor {
    fn has_admin_access(&self) -> bool {
        false
    }

    fn has_reseller_access(&self) -> bool {
        false
    }

    fn can_operate_business(&self, _business: &Business) -> bool {
        false
    }

    fn can_access_module(&self, _business: &ActiveBusiness, _module_code: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub enum IdentityKind {
    SystemAdmin(SystemAdmin),
    Reseller(ResellerOperator),
    BusinessUser(BusinessOperator),
    Investor(Investor),
}

impl IdentityKind {
    fn capabilities(&self) -> &dyn Capabilities {
        match self {
            IdentityKind::SystemAdmin(admin) => admin,
            IdentityKind::Reseller(reseller) => reseller,
            IdentityKind::BusinessUser(operator) => operator,
            IdentityKind::Investor(investor) => investor,
        }
    }
}

/// An authenticated user with the businesses linked to it.
#[derive(Debug, Clone)]
pub struct Identity {
    user: User,
    businesses: Vec<Business>,
    kind: IdentityKind,
}

impl Identity {
    pub fn new(user: User, businesses: Vec<Business>) -> Self {
        let kind = match user.user_type {
            UserType::SystemAdmin => IdentityKind::SystemAdmin(SystemAdmin),
            UserType::Reseller => IdentityKind::Reseller(ResellerOperator {
                reseller_id: user.reseller_id,
            }),
            UserType::BusinessUser => IdentityKind::BusinessUser(BusinessOperator {
                reseller_id: user.reseller_id,
                business_ids: businesses.iter().map(|b| b.id).collect(),
            }),
            UserType::Investor => IdentityKind::Investor(Investor),
        };

        Self { user, businesses, kind }
    }

    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn kind(&self) -> &IdentityKind {
        &self.kind
    }

    /// The literal `user_type` of the account.
    pub fn primary_type(&self) -> UserType {
        self.user.user_type
    }

    pub fn businesses(&self) -> &[Business] {
        &self.businesses
    }

    pub fn linked_business(&self, business_id: BusinessId) -> Option<&Business> {
        self.businesses.iter().find(|b| b.id == business_id)
    }
}

impl Capabilities for Identity {
    fn has_admin_access(&self) -> bool {
        self.kind.capabilities().has_admin_access()
    }

    fn has_reseller_access(&self) -> bool {
        self.kind.capabilities().has_reseller_access()
    }

    fn can_operate_business(&self, business: &Business) -> bool {
        self.kind.capabilities().can_operate_business(business)
    }

    fn can_access_module(&self, business: &ActiveBusiness, module_code: &str) -> bool {
        self.kind.capabilities().can_access_module(business, module_code)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::access::EntitledModule;
    use crate::database::models::SubscriptionStatus;

    pub(crate) fn user(user_type: UserType, reseller_id: Option<ResellerId>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            user_type,
            reseller_id,
            password_hash: String::new(),
            is_active: true,
        }
    }

    pub(crate) fn business(id: BusinessId, reseller_id: Option<ResellerId>) -> Business {
        Business {
            id,
            name: format!("Business {}", id),
            tenant_id: Some(format!("tenant-{}", id)),
            reseller_id,
            subscription_status: SubscriptionStatus::Active,
        }
    }

    fn active(business: &Business, codes: &[&str]) -> ActiveBusiness {
        let modules = codes
            .iter()
            .enumerate()
            .map(|(i, code)| EntitledModule {
                id: i as i64 + 1,
                code: code.to_string(),
                name: code.to_uppercase(),
            })
            .collect();
        ActiveBusiness::new(business, modules)
    }

    #[test]
    fn business_user_needs_link_and_entitlement() {
        let linked = business(1, None);
        let other = business(2, None);
        let identity = Identity::new(user(UserType::BusinessUser, None), vec![linked.clone()]);

        assert!(identity.can_access_module(&active(&linked, &["hr"]), "hr"));
        assert!(!identity.can_access_module(&active(&linked, &["hr"]), "crm"));
        assert!(!identity.can_access_module(&active(&other, &["hr"]), "hr"));
        assert!(identity.can_operate_business(&linked));
        assert!(!identity.can_operate_business(&other));
        assert!(!identity.has_admin_access());
        assert!(!identity.has_reseller_access());
    }

    #[test]
    fn reseller_staff_has_reseller_capability_without_primary_type() {
        let identity = Identity::new(user(UserType::BusinessUser, Some(7)), vec![]);
        assert!(identity.has_reseller_access());
        assert_eq!(identity.primary_type(), UserType::BusinessUser);
    }

    #[test]
    fn reseller_operates_only_its_own_businesses() {
        let own = business(1, Some(7));
        let foreign = business(2, Some(8));
        let identity = Identity::new(user(UserType::Reseller, Some(7)), vec![]);

        assert!(identity.has_reseller_access());
        assert!(identity.can_operate_business(&own));
        assert!(!identity.can_operate_business(&foreign));
        assert!(identity.can_access_module(&active(&own, &["crm"]), "crm"));
        assert!(!identity.can_access_module(&active(&foreign, &["crm"]), "crm"));
    }

    #[test]
    fn reseller_without_reseller_id_operates_nothing() {
        let unowned = business(1, None);
        let identity = Identity::new(user(UserType::Reseller, None), vec![]);
        assert!(!identity.can_operate_business(&unowned));
    }

    #[test]
    fn investor_has_no_capabilities() {
        let b = business(1, None);
        let identity = Identity::new(user(UserType::Investor, None), vec![b.clone()]);
        assert!(!identity.has_admin_access());
        assert!(!identity.has_reseller_access());
        assert!(!identity.can_operate_business(&b));
        assert!(!identity.can_access_module(&active(&b, &["hr"]), "hr"));
    }

    #[test]
    fn admin_is_bounded_by_entitlement() {
        let b = business(1, None);
        let identity = Identity::new(user(UserType::SystemAdmin, None), vec![]);
        assert!(identity.has_admin_access());
        assert!(identity.can_operate_business(&b));
        assert!(identity.can_access_module(&active(&b, &["hr"]), "hr"));
        assert!(!identity.can_access_module(&active(&b, &[]), "hr"));
    }
}
