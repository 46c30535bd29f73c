use serde::Serialize;

use crate::{
    answers::{MORTGAGE_BALANCE_MAX, MortgageBalance},
    estimator::format_usd,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliderTone {
    Good,
    Caution,
    Warning,
}

/// What the mortgage slider shows next to the thumb.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliderFeedback {
    pub balance: u64,
    pub formatted: String,
    pub hint: &'static str,
    pub tone: SliderTone,
    pub fill_percent: f64,
}

impl SliderFeedback {
    pub fn for_balance(balance: MortgageBalance) -> Self {
        let value = balance.amount();
        Self {
            balance: value,
            formatted: format_usd(value),
            hint: hint(value),
            tone: tone(value),
            fill_percent: value as f64 / MORTGAGE_BALANCE_MAX as f64 * 100.0,
        }
    }
}

fn hint(value: u64) -> &'static str {
    match value {
        0 => "Paid Off - Best Rates!",
        1..=100_000 => "Low Balance",
        100_001..=300_000 => "Moderate Balance",
        300_001..=500_000 => "Average Balance",
        500_001..=750_000 => "Higher Balance",
        _ => "High Balance",
    }
}

fn tone(value: u64) -> SliderTone {
    match value {
        0..=300_000 => SliderTone::Good,
        300_001..=600_000 => SliderTone::Caution,
        _ => SliderTone::Warning,
    }
}
