pub mod feed;
pub mod html;
pub mod json;

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::SourceError;
use crate::model::RawItem;
use crate::pipeline::classify::Strictness;

const USER_AGENT: &str = "Mozilla/5.0";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserKind {
    #[default]
    FeedXml,
    HtmlDom,
    JsonFeed,
}

/// Where each field of an item lives. Element names for feed-xml, CSS
/// selectors for html-dom, JSON pointer (item) and keys for json-feed.
/// json-feed keys may list fallbacks separated by `|`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSelectors {
    pub item: String,
    pub title: String,
    pub link: String,
    pub body: String,
}

impl FieldSelectors {
    /// `None` for html-dom, which has no sensible default.
    pub fn defaults_for(kind: ParserKind) -> Option<Self> {
        let (item, title, link, body) = match kind {
            ParserKind::FeedXml => ("item", "title", "link", "description"),
            ParserKind::JsonFeed => ("/items", "title", "url|external_url", "content_text|summary|content_html"),
            ParserKind::HtmlDom => return None,
        };
        Some(Self {
            item: item.into(),
            title: title.into(),
            link: link.into(),
            body: body.into(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub parser: ParserKind,
    #[serde(default)]
    pub strictness: Strictness,
    #[serde(default)]
    pub selectors: Option<FieldSelectors>,
}

impl SourceDescriptor {
    pub fn feed(name: &str, endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            parser: ParserKind::FeedXml,
            strictness: Strictness::Strict,
            selectors: None,
        }
    }

    pub fn selectors(&self) -> Option<FieldSelectors> {
        self.selectors
            .clone()
            .or_else(|| FieldSelectors::defaults_for(self.parser))
    }
}

/// Desidime community deal feeds.
pub fn default_sources() -> Vec<SourceDescriptor> {
    [
        ("Desidime/All Deals", "https://www.desidime.com/deals.rss"),
        ("Desidime/Electronics", "https://www.desidime.com/selective_search/electronics.rss"),
        ("Desidime/Mobiles", "https://www.desidime.com/selective_search/mobiles.rss"),
        ("Desidime/Fashion", "https://www.desidime.com/selective_search/fashion.rss"),
        ("Desidime/Home Kitchen", "https://www.desidime.com/selective_search/home-kitchen.rss"),
        ("Desidime/Freebies", "https://www.desidime.com/selective_search/freebies.rss"),
        ("Desidime/Grocery", "https://www.desidime.com/selective_search/grocery.rss"),
        ("Desidime/Sports", "https://www.desidime.com/selective_search/sports-fitness.rss"),
    ]
    .into_iter()
    .map(|(name, url)| SourceDescriptor::feed(name, url))
    .collect()
}

/// Yields the raw items of one source. Never fails: problems are logged and
/// the source contributes nothing.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, source: &SourceDescriptor) -> Vec<RawItem>;
}

/// Fetches over HTTP and dispatches on the descriptor's parser kind.
pub struct HttpSourceAdapter {
    client: reqwest::Client,
}

impl HttpSourceAdapter {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_document(&self, source: &SourceDescriptor) -> Result<String, SourceError> {
        let response = self
            .client
            .get(&source.endpoint)
            .send()
            .await
            .map_err(|e| SourceError::unavailable(&source.name, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::unavailable(&source.name, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(&source.name, e))
    }

    pub async fn try_fetch(&self, source: &SourceDescriptor) -> Result<Vec<RawItem>, SourceError> {
        let document = self.fetch_document(source).await?;
        parse_document(source, &document)
    }
}

#[async_trait]
impl SourceAdapter for HttpSourceAdapter {
    async fn fetch(&self, source: &SourceDescriptor) -> Vec<RawItem> {
        match self.try_fetch(source).await {
            Ok(items) => {
                info!(source = %source.name, items = items.len(), "fetched source");
                items
            }
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }
}

pub fn parse_document(source: &SourceDescriptor, document: &str) -> Result<Vec<RawItem>, SourceError> {
    let selectors = source
        .selectors()
        .ok_or_else(|| SourceError::parse(&source.name, "no field selectors configured"))?;

    match source.parser {
        ParserKind::FeedXml => feed::parse_items(document, &selectors, &source.name),
        ParserKind::HtmlDom => html::parse_items(document, &selectors, &source.name, &source.endpoint),
        ParserKind::JsonFeed => json::parse_items(document, &selectors, &source.name),
    }
}

/// Strip markup and entities from feed text and collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, " ").replace("&nbsp;", " ");
    let decoded = quick_xml::escape::unescape(&stripped)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| stripped.clone());
    collapse_whitespace(&decoded)
}

pub fn collapse_whitespace(text: &str) -> String {
    SPACE_RE.replace_all(text.trim(), " ").into_owned()
}
