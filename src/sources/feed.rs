use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::{clean_text, FieldSelectors};
use crate::error::SourceError;
use crate::model::RawItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Body,
}

impl Field {
    fn matching(name: &[u8], sel: &FieldSelectors) -> Option<Field> {
        if name == sel.title.as_bytes() {
            Some(Field::Title)
        } else if name == sel.link.as_bytes() {
            Some(Field::Link)
        } else if name == sel.body.as_bytes() {
            Some(Field::Body)
        } else {
            None
        }
    }
}

#[derive(Default)]
struct PartialItem {
    title: String,
    link: String,
    body: String,
    broken: bool,
}

impl PartialItem {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Title => self.title.push_str(text),
            Field::Link => self.link.push_str(text),
            Field::Body => self.body.push_str(text),
        }
    }

    fn finish(self, source_name: &str) -> Option<RawItem> {
        let title = clean_text(&self.title);
        if self.broken || title.is_empty() {
            return None;
        }
        Some(RawItem {
            title,
            link: self.link.trim().to_string(),
            body: clean_text(&self.body),
            source_name: source_name.to_string(),
        })
    }
}

/// Parse an RSS or Atom document into raw items. Items with unreadable text or
/// no title are skipped; a structurally broken document is an error.
pub fn parse_items(xml: &str, sel: &FieldSelectors, source_name: &str) -> Result<Vec<RawItem>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut current: Option<PartialItem> = None;
    let mut field: Option<Field> = None;
    let mut skipped = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == sel.item.as_bytes() {
                    current = Some(PartialItem::default());
                    field = None;
                } else if let (Some(item), None) = (current.as_mut(), field) {
                    // markup nested inside a field keeps feeding that field
                    field = Field::matching(e.name().as_ref(), sel);
                    if field == Some(Field::Link) && item.link.is_empty() {
                        if let Some(href) = href_attr(&e) {
                            item.link = href;
                            field = None;
                        }
                    }
                }
            }
            // Atom: <link href="…"/>
            Ok(Event::Empty(e)) => {
                if let Some(item) = current.as_mut() {
                    if e.name().as_ref() == sel.link.as_bytes() && item.link.is_empty() {
                        if let Some(href) = href_attr(&e) {
                            item.link = href;
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    match e.unescape() {
                        Ok(text) => item.push(f, &text),
                        Err(err) => {
                            debug!(source = source_name, error = %err, "unreadable item text");
                            item.broken = true;
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    item.push(f, &String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == sel.item.as_bytes() {
                    if let Some(item) = current.take() {
                        match item.finish(source_name) {
                            Some(raw) => items.push(raw),
                            None => skipped += 1,
                        }
                    }
                    field = None;
                } else if field.is_some() && Field::matching(name.as_ref(), sel) == field {
                    field = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::parse(
                    source_name,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    if skipped > 0 {
        debug!(source = source_name, skipped, "skipped malformed items");
    }
    Ok(items)
}

fn href_attr(e: &BytesStart) -> Option<String> {
    let attr = e.try_get_attribute("href").ok().flatten()?;
    let value = attr.unescape_value().ok()?;
    Some(value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ParserKind;

    fn rss() -> FieldSelectors {
        FieldSelectors::defaults_for(ParserKind::FeedXml).unwrap()
    }

    #[test]
    fn desidime_fixture() {
        let xml = std::fs::read_to_string("tests/fixtures/desidime.rss").unwrap();
        let items = parse_items(&xml, &rss(), "Desidime/All Deals").unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].title, "boAt Airdopes 141 at ₹999 (MRP ₹4499) 78% off Amazon");
        assert_eq!(items[0].link, "https://www.desidime.com/deals/boat-airdopes-141");
        assert!(items[1].body.contains("₹12,999"));
        assert!(!items[1].body.contains('<'));
        assert!(items.iter().all(|i| i.source_name == "Desidime/All Deals"));
    }

    #[test]
    fn channel_title_is_not_an_item() {
        let xml = "<rss><channel><title>Feed</title><item><title>A</title><link>u</link></item></channel></rss>";
        let items = parse_items(xml, &rss(), "s").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A");
    }

    #[test]
    fn item_without_title_skipped_siblings_kept() {
        let xml = "<rss><channel>\
            <item><link>u1</link><description>no title</description></item>\
            <item><title>B</title><link>u2</link></item>\
            </channel></rss>";
        let items = parse_items(xml, &rss(), "s").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "u2");
    }

    #[test]
    fn item_with_bad_entity_skipped_siblings_kept() {
        let xml = "<rss><channel>\
            <item><title>Bad &nosuch; title</title></item>\
            <item><title>Good</title></item>\
            </channel></rss>";
        let items = parse_items(xml, &rss(), "s").unwrap();
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Good"]);
    }

    #[test]
    fn mismatched_tags_are_a_parse_error() {
        let xml = "<rss><channel><item><title>A</title></wrong></channel></rss>";
        assert!(matches!(parse_items(xml, &rss(), "s"), Err(SourceError::Parse { .. })));
    }

    #[test]
    fn atom_entries() {
        let sel = FieldSelectors {
            item: "entry".into(),
            title: "title".into(),
            link: "link".into(),
            body: "summary".into(),
        };
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
            <entry><title>Mixer at Rs. 1,899 on Flipkart</title>
            <link rel="alternate" href="https://example.com/mixer"/>
            <summary>&lt;b&gt;Loot&lt;/b&gt; deal</summary></entry>
        </feed>"#;
        let items = parse_items(xml, &sel, "atom").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.com/mixer");
        assert_eq!(items[0].body, "Loot deal");
    }
}
