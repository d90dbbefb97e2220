use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Active,
    Inactive,
    Deprecated,
}

impl FromStr for ModuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ModuleStatus::Active),
            "inactive" => Ok(ModuleStatus::Inactive),
            "deprecated" => Ok(ModuleStatus::Deprecated),
            other => Err(format!("unknown module status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: ModuleStatus,
}

impl Module {
    pub fn is_grantable(&self) -> bool {
        self.status == ModuleStatus::Active
    }
}
