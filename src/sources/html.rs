use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::{collapse_whitespace, FieldSelectors};
use crate::error::SourceError;
use crate::model::RawItem;

/// Parse an HTML listing page. `base` resolves relative links.
pub fn parse_items(
    html: &str,
    sel: &FieldSelectors,
    source_name: &str,
    base: &str,
) -> Result<Vec<RawItem>, SourceError> {
    let item_sel = parse_selector(&sel.item, source_name)?;
    let title_sel = parse_selector(&sel.title, source_name)?;
    let link_sel = parse_selector(&sel.link, source_name)?;
    let body_sel = parse_selector(&sel.body, source_name)?;

    let document = Html::parse_document(html);
    let base = Url::parse(base).ok();
    let mut items = Vec::new();

    for element in document.select(&item_sel) {
        let title = element
            .select(&title_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if title.is_empty() {
            debug!(source = source_name, "card without title skipped");
            continue;
        }

        // The card itself may be the anchor.
        let href = element
            .select(&link_sel)
            .find_map(|a| a.value().attr("href"))
            .or_else(|| element.value().attr("href"));
        let link = href
            .map(|h| resolve_link(base.as_ref(), h))
            .unwrap_or_default();

        let body = element
            .select(&body_sel)
            .next()
            .map(element_text)
            .unwrap_or_default();

        items.push(RawItem {
            title,
            link,
            body,
            source_name: source_name.to_string(),
        });
    }

    Ok(items)
}

fn parse_selector(css: &str, source_name: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::parse(source_name, format!("bad selector {:?}: {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn resolve_link(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}
