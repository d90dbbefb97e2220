use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::module::Module;

pub type BusinessId = i64;
pub type ResellerId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Suspended,
    Cancelled,
}

impl SubscriptionStatus {
    /// Only active and trial businesses have a usable subscription.
    pub fn is_operational(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trial)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "trial" => Ok(SubscriptionStatus::Trial),
            "suspended" => Ok(SubscriptionStatus::Suspended),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(format!("unknown subscription_status '{}'", other)),
        }
    }
}

/// A business (tenant owner) row from the central database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub tenant_id: Option<String>,
    pub reseller_id: Option<ResellerId>,
    pub subscription_status: SubscriptionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub package_id: i64,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.ends_at, Some(ends_at) if ends_at <= now)
    }

    /// Started at or before `now` and not yet expired. A missing start counts as started.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        let started = self.starts_at.map_or(true, |starts_at| starts_at <= now);
        started && !self.is_expired(now)
    }
}

/// A business together with its latest subscription and every module of that
/// subscription's package, regardless of module status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub business: Business,
    pub subscription: Option<Subscription>,
    pub package_modules: Vec<Module>,
}
