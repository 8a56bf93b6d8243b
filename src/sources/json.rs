use serde_json::Value;
use tracing::debug;

use super::{clean_text, FieldSelectors};
use crate::error::SourceError;
use crate::model::RawItem;

/// Parse a JSON feed. `sel.item` is a JSON pointer to the item array; the
/// other selectors are keys (or pointers) inside each item.
pub fn parse_items(doc: &str, sel: &FieldSelectors, source_name: &str) -> Result<Vec<RawItem>, SourceError> {
    let root: Value = serde_json::from_str(doc).map_err(|e| SourceError::parse(source_name, e))?;
    let entries = root
        .pointer(&sel.item)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::parse(source_name, format!("no item array at {}", sel.item)))?;

    let items: Vec<RawItem> = entries
        .iter()
        .filter_map(|entry| {
            let title = string_field(entry, &sel.title).map(|t| clean_text(&t)).unwrap_or_default();
            if title.is_empty() {
                debug!(source = source_name, "json item without title skipped");
                return None;
            }
            Some(RawItem {
                title,
                link: string_field(entry, &sel.link).unwrap_or_default(),
                body: string_field(entry, &sel.body)
                    .map(|b| clean_text(&b))
                    .unwrap_or_default(),
                source_name: source_name.to_string(),
            })
        })
        .collect();

    Ok(items)
}

/// First non-empty string among `|`-separated keys.
fn string_field(entry: &Value, keys: &str) -> Option<String> {
    keys.split('|').map(str::trim).find_map(|key| {
        let value = if key.starts_with('/') {
            entry.pointer(key)
        } else {
            entry.get(key)
        };
        value
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_string())
    })
}
