//! Available-cash estimate shown on the goal and results screens.

use std::time::Duration;

/// Maximum loan-to-value the estimate assumes, in percent.
pub const LTV_RATIO_PERCENT: u64 = 80;
/// Upper bound of any estimate.
pub const MAX_CASH: u64 = 390_000;

pub const COUNT_UP_FRAMES: u64 = 60;
pub const COUNT_UP_DURATION: Duration = Duration::from_millis(1500);

/// `clamp(round(property_value * 0.80 - mortgage_balance), 0, MAX_CASH)`.
///
/// Computed in hundredths with integer arithmetic so the result never depends
/// on float rounding. Halves round up.
pub fn estimate(property_value: u64, mortgage_balance: u64) -> u64 {
    let lendable = i128::from(property_value) * i128::from(LTV_RATIO_PERCENT);
    let owed = i128::from(mortgage_balance) * 100;
    let rounded = (lendable - owed + 50).div_euclid(100);
    rounded.clamp(0, i128::from(MAX_CASH)) as u64
}

/// Whole-dollar US currency, e.g. `$1,234,567`.
pub fn format_usd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Frames of the cash count-up animation. Empty when there is nothing to count.
pub fn count_up_frames(target: u64) -> Vec<u64> {
    if target == 0 {
        return Vec::new();
    }
    let frames = u128::from(COUNT_UP_FRAMES);
    (1..=frames)
        .map(|i| ((u128::from(target) * i * 2 + frames) / (frames * 2)) as u64)
        .collect()
}
