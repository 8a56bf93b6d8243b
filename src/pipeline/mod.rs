pub mod classify;
pub mod dedup;
pub mod extract;
pub mod rank;
pub mod resolve;

use rayon::prelude::*;

use crate::model::{truncate_chars, DealCandidate, RawItem};
use classify::Strictness;
use extract::{DiscountBounds, PriceWindow};

/// Knobs for the per-item passes.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub discount_bounds: DiscountBounds,
    pub price_window: PriceWindow,
    pub title_max_chars: usize,
}

impl From<&crate::config::Settings> for ExtractOptions {
    fn from(s: &crate::config::Settings) -> Self {
        Self {
            discount_bounds: s.discount_bounds,
            price_window: s.price_window,
            title_max_chars: s.title_max_chars,
        }
    }
}

/// Classify → extract → resolve for one item. `None` means "not a deal".
pub fn process_item(item: &RawItem, strictness: Strictness, opts: &ExtractOptions) -> Option<DealCandidate> {
    if !classify::is_deal(&item.title, &item.body, strictness) {
        return None;
    }

    let text = item.analysis_text();
    let explicit = extract::extract_discount(&text, opts.discount_bounds);
    let prices = extract::extract_prices(&text, opts.price_window);
    let (deal_price, original_price) = extract::split_prices(&prices);

    Some(DealCandidate {
        title: truncate_chars(item.title.trim(), opts.title_max_chars),
        link: item.link.clone(),
        discount_percent: resolve::resolve_discount(explicit, deal_price, original_price),
        deal_price,
        original_price,
        platform: extract::detect_platform(&text),
        source: item.source_name.clone(),
    })
}

/// Run `process_item` over every batch in parallel; output keeps batch then item order.
pub fn extract_candidates(batches: &[(Strictness, Vec<RawItem>)], opts: &ExtractOptions) -> Vec<DealCandidate> {
    batches
        .par_iter()
        .flat_map_iter(|(strictness, items)| {
            items
                .iter()
                .filter_map(move |item| process_item(item, *strictness, opts))
        })
        .collect()
}
