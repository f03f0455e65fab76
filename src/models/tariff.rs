//! Tariffs and payments

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ContentSet;

/// A purchasable course package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tariff {
    pub tariff_id: i64,
    /// Unique title, used by the bot to address the tariff
    pub title: String,
    pub description: String,
    /// Price in whole roubles
    pub price: i64,
    pub status: TariffStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TariffStatus {
    #[default]
    Active,
    Archive,
}

impl fmt::Display for TariffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TariffStatus::Active => write!(f, "active"),
            TariffStatus::Archive => write!(f, "archive"),
        }
    }
}

impl FromStr for TariffStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(TariffStatus::Active),
            "archive" => Ok(TariffStatus::Archive),
            _ => Err(anyhow::anyhow!("Invalid tariff status: {}", s)),
        }
    }
}

/// Input for creating a tariff
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTariffInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub status: TariffStatus,
}

/// A recorded payment and the access window it bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: i64,
    pub payment_date: DateTime<Utc>,
    pub amount: i64,
    pub user_id: i64,
    pub access_date_start: NaiveDate,
    pub access_date_finish: NaiveDate,
    /// Cleared when the tariff is deleted
    pub tariff_id: Option<i64>,
    pub status: Option<String>,
    pub service_description: Option<String>,
}

impl Payment {
    /// Whether the access window covers `day` (both ends inclusive).
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.access_date_start <= day && day <= self.access_date_finish
    }
}

/// Input for recording a payment; the tariff is addressed by title.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentInput {
    pub user_id: i64,
    pub tariff: String,
    pub amount: i64,
    pub access_date_start: NaiveDate,
    pub access_date_finish: NaiveDate,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub service_description: Option<String>,
}

/// A paid tariff: the payment and the starter content it opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TariffActivation {
    pub payment: Payment,
    pub granted: ContentSet,
}
