use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::model::Platform;

static PERCENT_OFF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,3})\s*%\s*off\b").unwrap());
static QUALIFIED_PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:upto|up\s+to|flat|get|save)\s*(\d{1,3})\s*%").unwrap()
});
// ₹ 1,299 | Rs. 1299 | Rs1299 | INR 1,299
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:₹|\bRs\.?|\bINR)\s*(\d[\d,]*)").unwrap());

/// Inclusive range of discount percentages treated as plausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscountBounds {
    pub min: u8,
    pub max: u8,
}

impl Default for DiscountBounds {
    fn default() -> Self {
        Self { min: 5, max: 95 }
    }
}

impl DiscountBounds {
    fn contains(&self, value: u32) -> bool {
        value >= u32::from(self.min) && value <= u32::from(self.max)
    }
}

/// Exclusive price window in whole rupees. The floor drops stray small numbers
/// (model numbers, quantities), the ceiling drops absurd values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PriceWindow {
    pub min: u32,
    pub max: u32,
}

impl Default for PriceWindow {
    fn default() -> Self {
        Self {
            min: 50,
            max: 5_000_000,
        }
    }
}

impl PriceWindow {
    fn contains(&self, value: u32) -> bool {
        value > self.min && value < self.max
    }
}

/// Largest plausible discount stated in `text`, or 0.
pub fn extract_discount(text: &str, bounds: DiscountBounds) -> u8 {
    PERCENT_OFF_RE
        .captures_iter(text)
        .chain(QUALIFIED_PERCENT_RE.captures_iter(text))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .filter(|v| bounds.contains(*v))
        .max()
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(0)
}

/// Distinct INR prices mentioned in `text`, ascending.
pub fn extract_prices(text: &str, window: PriceWindow) -> Vec<u32> {
    let prices: BTreeSet<u32> = PRICE_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].replace(',', "").parse::<u32>().ok())
        .filter(|v| window.contains(*v))
        .collect();
    prices.into_iter().collect()
}

pub fn detect_platform(text: &str) -> Platform {
    let lower = text.to_lowercase();
    if lower.contains("flipkart") {
        Platform::Flipkart
    } else if lower.contains("amazon") || lower.contains("amzn") {
        Platform::AmazonIndia
    } else {
        Platform::Unknown
    }
}

/// Lowest price is the deal price; highest is the original only when there are two or more.
pub fn split_prices(prices: &[u32]) -> (Option<u32>, Option<u32>) {
    let deal = prices.first().copied();
    let original = if prices.len() >= 2 {
        prices.last().copied()
    } else {
        None
    };
    (deal, original)
}
