use std::fmt;

use serde::Serialize;

/// One posting as returned by a source, before any analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub body: String,
    pub source_name: String,
}

impl RawItem {
    /// Title and body joined into the single string every pass works on.
    pub fn analysis_text(&self) -> String {
        analysis_text(&self.title, &self.body)
    }
}

pub fn analysis_text(title: &str, body: &str) -> String {
    format!("{} {}", title, body)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    AmazonIndia,
    Flipkart,
    Unknown,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::AmazonIndia => "Amazon India",
            Platform::Flipkart => "Flipkart",
            Platform::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// A classified, extracted offer. `original_price > deal_price` whenever both are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealCandidate {
    pub title: String,
    pub link: String,
    pub discount_percent: u8,
    pub deal_price: Option<u32>,
    pub original_price: Option<u32>,
    pub platform: Platform,
    pub source: String,
}

/// Counters for one scheduled run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub sources: usize,
    pub raw_items: usize,
    pub candidates: usize,
    pub unique: usize,
    pub selected: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
