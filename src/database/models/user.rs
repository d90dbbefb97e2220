use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::business::ResellerId;

/// Primary type of a central user account, stored as `users.user_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    SystemAdmin,
    Reseller,
    BusinessUser,
    Investor,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::SystemAdmin => "system_admin",
            UserType::Reseller => "reseller",
            UserType::BusinessUser => "business_user",
            UserType::Investor => "investor",
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system_admin" => Ok(UserType::SystemAdmin),
            "reseller" => Ok(UserType::Reseller),
            "business_user" => Ok(UserType::BusinessUser),
            "investor" => Ok(UserType::Investor),
            other => Err(format!("unknown user_type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub reseller_id: Option<ResellerId>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
}
