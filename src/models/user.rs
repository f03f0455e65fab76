//! Telegram user model
//!
//! A user is identified by their Telegram id. The role decides whether the
//! paid catalog is open to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Payment;

/// A person talking to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub user_id: i64,
    /// Display name taken from Telegram
    pub tg_name: String,
    /// Telegram account id (unique)
    pub tg_id: i64,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl TelegramUser {
    pub fn new(tg_name: String, tg_id: i64) -> Self {
        Self {
            user_id: 0,
            tg_name,
            tg_id,
            role: UserRole::default(),
            created_at: Utc::now(),
        }
    }

    /// Clients and admins are graded against the pass threshold.
    pub fn has_paid_access(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Client)
    }
}

/// Access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Course staff, approves practices
    Admin,
    /// Paid at least once
    Client,
    /// Registered, not paying
    #[default]
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Client => write!(f, "client"),
            UserRole::User => write!(f, "user"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "client" => Ok(UserRole::Client),
            "user" => Ok(UserRole::User),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Contact details a user leaves before paying. One per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub user_id: i64,
    pub firstname: Option<String>,
    pub secondname: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    /// E.164 formatted phone number
    pub phonenumber: String,
}

/// Input for registering a user
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub tg_name: String,
    pub tg_id: i64,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Input for saving contact details (not yet validated)
#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    pub user_id: i64,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub secondname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    pub phonenumber: String,
}

/// User together with everything the bot shows on the profile screen
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: TelegramUser,
    pub contact: Option<UserContact>,
    pub payments: Vec<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip_through_text() {
        for role in [UserRole::Admin, UserRole::Client, UserRole::User] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert!("teacher".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_new_user_has_no_paid_access() {
        let user = TelegramUser::new("anna".to_string(), 100);
        assert_eq!(user.role, UserRole::User);
        assert!(!user.has_paid_access());
    }
}
