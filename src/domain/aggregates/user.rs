//! User Aggregate
//!
//! Accounts are provisioned by the auth service; this side only reads them
//! and applies admin changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub mobile: Option<String>,
    #[serde(rename = "verify_email")]
    pub verify_email: bool,
    pub status: UserStatus,
    pub role: Role,
    #[serde(rename = "last_login_date")]
    pub last_login_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Admin => "ADMIN", Self::User => "USER" }
    }
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "Active", Self::Inactive => "Inactive", Self::Suspended => "Suspended" }
    }
}

impl FromStr for Role {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self> {
        [Self::Admin, Self::User]
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EcommerceError::validation(format!("unknown role: {s}")))
    }
}

impl FromStr for UserStatus {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self> {
        [Self::Active, Self::Inactive, Self::Suspended]
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EcommerceError::validation(format!("unknown status: {s}")))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::now_v7(), name: name.into(), email: email.into().to_lowercase(), avatar: None, mobile: None,
            verify_email: false, status: UserStatus::Active, role, last_login_date: None, created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Case-insensitive match on name or e-mail.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.email.to_lowercase().contains(&needle)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub inactive_users: u64,
    pub suspended_users: u64,
    pub admin_users: u64,
    pub verified_users: u64,
}

impl UserStats {
    pub fn record(&mut self, user: &User) {
        self.total_users += 1;
        match user.status {
            UserStatus::Active => self.active_users += 1,
            UserStatus::Inactive => self.inactive_users += 1,
            UserStatus::Suspended => self.suspended_users += 1,
        }
        if user.is_admin() { self.admin_users += 1; }
        if user.verify_email { self.verified_users += 1; }
    }
}
