use std::sync::LazyLock;

use regex::{Regex, RegexSet};
use serde::Deserialize;

/// Title patterns of list, guide and seasonal-sale articles. Checked against
/// the lowercased, trimmed title only.
const EDITORIAL_PATTERNS: &[&str] = &[
    r"^top\s+\d+",
    r"^best\s+\d+",
    r"biggest sales",
    r"you can't miss",
    r"shop smarter",
    r"step into style",
    r"light up your",
    r"how to",
    r"guide to",
    r"tips for",
    r"ways to",
    r"things you",
    r"reasons why",
    r"everything you",
    r"all you need",
    r"what is",
    r"why you should",
    r"festival.*deals",
    r"\bsale\b.*\b(19|20)\d{2}\b",
    r"\b\d+\s+deals\b",
    r"\b\d+\s+things\b",
    r"\b\d+\s+best\b",
    r"\b\d+\s+ways\b",
];

static EDITORIAL_SET: LazyLock<RegexSet> =
    LazyLock::new(|| RegexSet::new(EDITORIAL_PATTERNS).unwrap());
static PRICE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"₹|rs\.|inr|rupee").unwrap());
static DISCOUNT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\s*%\s*off|discount|deal price|loot").unwrap());

const PLATFORM_KEYWORDS: &[&str] = &["amazon", "amzn", "flipkart"];
const LOOSE_KEYWORDS: &[&str] = &["deal", "offer", "sale", "discount", "coupon", "% off", "loot"];

/// How much evidence a source's items need before they count as deals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
    /// Price or discount marker, plus a marketplace keyword.
    #[default]
    Strict,
    /// Any deal keyword. For feeds that are already curated deal lists.
    Loose,
}

pub fn is_editorial(title: &str) -> bool {
    EDITORIAL_SET.is_match(title.trim().to_lowercase().as_str())
}

/// Whether `title` + `body` describe a single-product marketplace offer.
pub fn is_deal(title: &str, body: &str, strictness: Strictness) -> bool {
    if is_editorial(title) {
        return false;
    }

    let combined = crate::model::analysis_text(title, body).to_lowercase();
    match strictness {
        Strictness::Strict => {
            let has_price = PRICE_MARKER_RE.is_match(&combined);
            let has_discount = DISCOUNT_MARKER_RE.is_match(&combined);
            let has_platform = PLATFORM_KEYWORDS.iter().any(|k| combined.contains(k));
            (has_price || has_discount) && has_platform
        }
        Strictness::Loose => LOOSE_KEYWORDS.iter().any(|k| combined.contains(k)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editorial_title_wins_over_deal_body() {
        assert!(!is_deal(
            "Top 15 Deals You Can't Miss This Diwali",
            "boAt Airdopes at ₹999, 80% off Amazon",
            Strictness::Strict,
        ));
    }

    #[test]
    fn editorial_patterns_apply_in_loose_mode() {
        assert!(!is_deal("How to spot a real deal", "discount", Strictness::Loose));
    }

    #[test]
    fn editorial_titles() {
        for title in [
            "Best 10 earbuds under 2000",
            "10 best phones of the month",
            "Big Billion Days sale 2025: what to expect",
            "Diwali festival mega deals roundup",
            "7 ways to save on groceries",
            "Shop smarter this season",
            "  TOP 5 laptops for students",
        ] {
            assert!(is_editorial(title), "{title}");
        }
    }

    #[test]
    fn product_titles_are_not_editorial() {
        for title in [
            "boAt Airdopes 141 at ₹999 (MRP ₹4499) 78% off Amazon",
            "Realme Narzo 70 5G at ₹12,999 on Flipkart",
            "Samsung 43 inch TV sale price ₹24,990",
        ] {
            assert!(!is_editorial(title), "{title}");
        }
    }

    #[test]
    fn strict_requires_platform() {
        assert!(!is_deal("Headphones at ₹999", "80% off", Strictness::Strict));
        assert!(is_deal("Headphones at ₹999", "on Amazon", Strictness::Strict));
        assert!(is_deal("Headphones", "loot on flipkart", Strictness::Strict));
    }

    #[test]
    fn strict_requires_price_or_discount() {
        assert!(!is_deal("New headphones on Amazon", "launched today", Strictness::Strict));
        assert!(is_deal("Headphones", "Rs. 999 amzn.to/abc", Strictness::Strict));
    }

    #[test]
    fn loose_accepts_keyword_only() {
        assert!(is_deal("Coupon for shoes", "", Strictness::Loose));
        assert!(!is_deal("New shoes launched", "", Strictness::Loose));
    }
}
