//! The answer set collected across the quiz screens.
//!
//! Every field type sanitizes what it is given instead of rejecting it: the zip
//! code drops non-digits, the mortgage balance snaps onto the slider track. The
//! only input that can be refused is a property value outside the fixed buckets,
//! since the presentation layer never offers one.

use serde::{Deserialize, Serialize};

use crate::{error::FunnelError, estimator::estimate};

pub const ZIP_CODE_LEN: usize = 5;

pub const MORTGAGE_BALANCE_MAX: u64 = 1_000_000;
pub const MORTGAGE_SLIDER_STEP: u64 = 10_000;

/// US zip code as typed by the user, digits only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ZipCode(String);

impl ZipCode {
    /// Strip everything but ASCII digits and keep at most five of them.
    pub fn sanitize(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(char::is_ascii_digit)
                .take(ZIP_CODE_LEN)
                .collect(),
        )
    }

    /// Whether the zip submit button should be enabled.
    pub fn is_complete(&self) -> bool {
        self.0.len() >= ZIP_CODE_LEN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ZipCode {
    fn from(raw: String) -> Self {
        Self::sanitize(&raw)
    }
}

impl From<ZipCode> for String {
    fn from(zip: ZipCode) -> Self {
        zip.0
    }
}

/// Property value buckets offered on the home value screen. Serialized as the
/// dollar amount of the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum PropertyValue {
    Under200k,
    From200kTo300k,
    From300kTo400k,
    From400kTo500k,
    From500kTo750k,
    From750kTo1m,
    Over1m,
}

impl PropertyValue {
    pub const ALL: [PropertyValue; 7] = [
        PropertyValue::Under200k,
        PropertyValue::From200kTo300k,
        PropertyValue::From300kTo400k,
        PropertyValue::From400kTo500k,
        PropertyValue::From500kTo750k,
        PropertyValue::From750kTo1m,
        PropertyValue::Over1m,
    ];

    /// Representative amount used by the estimator.
    pub fn amount(self) -> u64 {
        match self {
            PropertyValue::Under200k => 150_000,
            PropertyValue::From200kTo300k => 250_000,
            PropertyValue::From300kTo400k => 350_000,
            PropertyValue::From400kTo500k => 450_000,
            PropertyValue::From500kTo750k => 625_000,
            PropertyValue::From750kTo1m => 875_000,
            PropertyValue::Over1m => 1_250_000,
        }
    }
}

impl TryFrom<u64> for PropertyValue {
    type Error = FunnelError;

    fn try_from(amount: u64) -> Result<Self, Self::Error> {
        PropertyValue::ALL
            .into_iter()
            .find(|bucket| bucket.amount() == amount)
            .ok_or(FunnelError::UnknownPropertyValue(amount))
    }
}

impl From<PropertyValue> for u64 {
    fn from(value: PropertyValue) -> Self {
        value.amount()
    }
}

/// Outstanding mortgage balance, always on the slider track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct MortgageBalance(u64);

impl MortgageBalance {
    /// Clamp into `[0, MORTGAGE_BALANCE_MAX]` and snap to the nearest slider step.
    pub fn from_slider(raw: u64) -> Self {
        let clamped = raw.min(MORTGAGE_BALANCE_MAX);
        let snapped = (clamped + MORTGAGE_SLIDER_STEP / 2) / MORTGAGE_SLIDER_STEP
            * MORTGAGE_SLIDER_STEP;
        Self(snapped.min(MORTGAGE_BALANCE_MAX))
    }

    pub fn amount(self) -> u64 {
        self.0
    }
}

impl From<u64> for MortgageBalance {
    fn from(raw: u64) -> Self {
        Self::from_slider(raw)
    }
}

impl From<MortgageBalance> for u64 {
    fn from(balance: MortgageBalance) -> Self {
        balance.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl CreditTier {
    pub fn as_str(self) -> &'static str {
        match self {
            CreditTier::Excellent => "excellent",
            CreditTier::Good => "good",
            CreditTier::Fair => "fair",
            CreditTier::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    HomeImprovement,
    DebtConsolidation,
    EmergencyFund,
    MajorPurchase,
    Retirement,
    Other,
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::HomeImprovement => "home_improvement",
            Goal::DebtConsolidation => "debt_consolidation",
            Goal::EmergencyFund => "emergency_fund",
            Goal::MajorPurchase => "major_purchase",
            Goal::Retirement => "retirement",
            Goal::Other => "other",
        }
    }
}

/// Everything the user has told us so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    pub zip_code: ZipCode,
    pub property_value: Option<PropertyValue>,
    pub mortgage_balance: Option<MortgageBalance>,
    pub goal: Option<Goal>,
    pub credit: Option<CreditTier>,
}

impl Answers {
    /// Estimated available cash, once both estimator inputs are known.
    pub fn calculated_cash(&self) -> Option<u64> {
        match (self.property_value, self.mortgage_balance) {
            (Some(value), Some(balance)) => Some(estimate(value.amount(), balance.amount())),
            _ => None,
        }
    }
}
