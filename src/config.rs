use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::pipeline::extract::{DiscountBounds, PriceWindow};
use crate::sources::{default_sources, ParserKind, SourceDescriptor};

const ENV_PREFIX: &str = "DEALS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// One ranked digest of the top K deals.
    Batch,
    /// One message per deal above `min_discount`.
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupLifetime {
    PerRun,
    PerProcess,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: RunMode,
    pub top_k: usize,
    pub min_discount: u8,
    pub dedup_key_len: usize,
    pub dedup_lifetime: DedupLifetime,
    pub title_max_chars: usize,
    pub show_source: bool,
    pub fetch_timeout_secs: u64,
    pub run_deadline_secs: u64,
    pub max_concurrent_fetches: usize,
    pub send_delay_ms: u64,
    pub interval_secs: u64,
    pub discount_bounds: DiscountBounds,
    pub price_window: PriceWindow,
    pub sources: Vec<SourceDescriptor>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: RunMode::Batch,
            top_k: 5,
            min_discount: 40,
            dedup_key_len: 25,
            dedup_lifetime: DedupLifetime::PerRun,
            title_max_chars: 80,
            show_source: true,
            fetch_timeout_secs: 15,
            run_deadline_secs: 120,
            max_concurrent_fetches: 4,
            send_delay_ms: 3000,
            interval_secs: 6 * 60 * 60,
            discount_bounds: DiscountBounds::default(),
            price_window: PriceWindow::default(),
            sources: default_sources(),
        }
    }
}

impl Settings {
    /// Defaults, then the optional TOML file at `path`, then `DEALS_*` env vars.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.top_k == 0 {
            return invalid("top_k must be at least 1".into());
        }
        if self.dedup_key_len == 0 {
            return invalid("dedup_key_len must be at least 1".into());
        }
        if self.title_max_chars == 0 {
            return invalid("title_max_chars must be at least 1".into());
        }
        if self.max_concurrent_fetches == 0 {
            return invalid("max_concurrent_fetches must be at least 1".into());
        }
        if self.fetch_timeout_secs == 0 {
            return invalid("fetch_timeout_secs must be at least 1".into());
        }
        if self.run_deadline_secs == 0 {
            return invalid("run_deadline_secs must be at least 1".into());
        }
        if self.interval_secs == 0 {
            return invalid("interval_secs must be at least 1".into());
        }
        if self.min_discount > 100 {
            return invalid(format!("min_discount {} exceeds 100", self.min_discount));
        }
        let b = self.discount_bounds;
        if b.min > b.max || b.max > 100 {
            return invalid(format!("discount_bounds [{}, {}] out of order", b.min, b.max));
        }
        let w = self.price_window;
        if w.min >= w.max {
            return invalid(format!("price_window ({}, {}) is empty", w.min, w.max));
        }
        for source in &self.sources {
            if source.parser == ParserKind::HtmlDom && source.selectors.is_none() {
                return invalid(format!(
                    "source {} uses html-dom but defines no selectors",
                    source.name
                ));
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }

    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.send_delay_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.top_k, 5);
        assert_eq!(s.dedup_key_len, 25);
        assert_eq!(s.sources.len(), 8);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let s = Settings::load(Path::new("does/not/exist.toml")).unwrap();
        assert_eq!(s.mode, RunMode::Batch);
        assert_eq!(s.discount_bounds, DiscountBounds::default());
    }

    #[test]
    fn rejects_zero_top_k() {
        let s = Settings {
            top_k: 0,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_interval() {
        let s = Settings {
            interval_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(msg)) if msg.contains("interval_secs")));
    }

    #[test]
    fn rejects_zero_timeouts() {
        for s in [
            Settings {
                fetch_timeout_secs: 0,
                ..Settings::default()
            },
            Settings {
                run_deadline_secs: 0,
                ..Settings::default()
            },
        ] {
            assert!(matches!(s.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn rejects_inverted_bounds() {
        let s = Settings {
            discount_bounds: DiscountBounds { min: 90, max: 10 },
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_html_source_without_selectors() {
        let mut s = Settings::default();
        s.sources[0].parser = ParserKind::HtmlDom;
        s.sources[0].selectors = None;
        assert!(s.validate().is_err());
    }

    #[test]
    fn parses_toml_overrides() {
        let toml = r#"
            mode = "stream"
            top_k = 3
            dedup_lifetime = "per-process"

            [price_window]
            min = 100
            max = 100000

            [[sources]]
            name = "Loot deals"
            endpoint = "https://example.com/feed.json"
            parser = "json-feed"
            strictness = "loose"
        "#;
        let s: Settings = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.mode, RunMode::Stream);
        assert_eq!(s.top_k, 3);
        assert_eq!(s.dedup_lifetime, DedupLifetime::PerProcess);
        assert_eq!(s.price_window, PriceWindow { min: 100, max: 100000 });
        assert_eq!(s.sources.len(), 1);
        assert_eq!(s.sources[0].parser, ParserKind::JsonFeed);
        // untouched keys keep their defaults
        assert_eq!(s.dedup_key_len, 25);
    }

    #[test]
    fn env_overrides_defaults() {
        // only keys no other test in this module asserts on
        let vars = [
            ("DEALS_TOP_K", "3"),
            ("DEALS_DEDUP_LIFETIME", "per-process"),
            ("DEALS_PRICE_WINDOW__MIN", "100"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let loaded = Settings::load(Path::new("does/not/exist.toml"));
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let s = loaded.unwrap();
        assert_eq!(s.top_k, 3);
        assert_eq!(s.dedup_lifetime, DedupLifetime::PerProcess);
        assert_eq!(s.price_window.min, 100);
        assert_eq!(s.price_window.max, PriceWindow::default().max);
        assert_eq!(s.sources.len(), 8);
    }
}
