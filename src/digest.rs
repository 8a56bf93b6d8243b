use std::fmt::Write;
use std::time::Duration;

use crate::model::DealCandidate;

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━";
const RANK_MARKERS: [&str; 3] = ["🥇", "🥈", "🥉"];
const GENERIC_MARKER: &str = "🔥";

/// Rendering switches shared by batch and stream messages.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub show_source: bool,
    pub interval: Duration,
}

/// One ranked entry: header, title, prices, discount, link, source, separator.
pub fn render_entry(rank: usize, deal: &DealCandidate, opts: &FormatOptions) -> String {
    let mut out = String::new();
    let marker = rank
        .checked_sub(1)
        .and_then(|i| RANK_MARKERS.get(i))
        .copied()
        .unwrap_or(GENERIC_MARKER);

    let _ = writeln!(out, "{} <b>#{} — {}</b>", marker, rank, deal.platform);
    let _ = writeln!(out, "📦 {}", escape_html(&deal.title));

    match (deal.original_price, deal.deal_price) {
        (Some(original), Some(price)) if original != price => {
            let _ = writeln!(
                out,
                "🏷️ MRP: <s>₹{}</s>  💰 <b>₹{}</b>",
                group_thousands(original),
                group_thousands(price)
            );
        }
        (_, Some(price)) | (Some(price), None) => {
            let _ = writeln!(out, "💰 Price: <b>₹{}</b>", group_thousands(price));
        }
        (None, None) => {}
    }

    if deal.discount_percent > 0 {
        let _ = writeln!(out, "📉 You Save: <b>{}% OFF</b>", deal.discount_percent);
    }

    let _ = writeln!(out, "🛒 <a href='{}'>Buy Now →</a>", escape_attr(&deal.link));

    if opts.show_source && !deal.source.is_empty() {
        let _ = writeln!(out, "📰 <i>via {}</i>", escape_html(&deal.source));
    }

    let _ = writeln!(out, "{}", SEPARATOR);
    out.push('\n');
    out
}

/// The single ranked digest message.
pub fn render_batch(deals: &[DealCandidate], opts: &FormatOptions) -> String {
    let mut out = format!(
        "🇮🇳 <b>TOP {} DEALS — Amazon India &amp; Flipkart</b>\n{}\n\n",
        deals.len(),
        SEPARATOR
    );
    for (i, deal) in deals.iter().enumerate() {
        out.push_str(&render_entry(i + 1, deal, opts));
    }
    let _ = write!(out, "⏰ <i>Next scan in {}!</i>", human_interval(opts.interval));
    out
}

/// One stream-mode alert.
pub fn render_alert(rank: usize, deal: &DealCandidate, opts: &FormatOptions) -> String {
    format!("🚨 <b>DEAL ALERT</b>\n\n{}", render_entry(rank, deal, opts))
        .trim_end()
        .to_string()
}

/// Sent instead of an empty digest.
pub fn render_no_deals(opts: &FormatOptions) -> String {
    format!(
        "ℹ️ <b>Scan Complete!</b>\nNo product deals found this round.\n🕐 Will check again in {}!",
        human_interval(opts.interval)
    )
}

/// `4499` → `4,499`.
pub fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn human_interval(interval: Duration) -> String {
    let mins = interval.as_secs() / 60;
    let (hours, mins) = (mins / 60, mins % 60);
    let plural = |n: u64, unit: &str| format!("{} {}{}", n, unit, if n == 1 { "" } else { "s" });
    match (hours, mins) {
        (0, 0) => "a moment".to_string(),
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_html(text)
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Platform;

    fn opts() -> FormatOptions {
        FormatOptions {
            show_source: true,
            interval: Duration::from_secs(6 * 3600),
        }
    }

    fn deal(discount: u8, deal_price: Option<u32>, original: Option<u32>) -> DealCandidate {
        DealCandidate {
            title: "boAt Airdopes 141 <TWS> & case".into(),
            link: "https://example.com/?a=1&b='2'".into(),
            discount_percent: discount,
            deal_price,
            original_price: original,
            platform: Platform::AmazonIndia,
            source: "Desidime/All Deals".into(),
        }
    }

    #[test]
    fn full_entry() {
        let text = render_entry(1, &deal(78, Some(999), Some(4499)), &opts());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "🥇 <b>#1 — Amazon India</b>");
        assert_eq!(lines[1], "📦 boAt Airdopes 141 &lt;TWS&gt; &amp; case");
        assert_eq!(lines[2], "🏷️ MRP: <s>₹4,499</s>  💰 <b>₹999</b>");
        assert_eq!(lines[3], "📉 You Save: <b>78% OFF</b>");
        assert_eq!(lines[4], "🛒 <a href='https://example.com/?a=1&amp;b=&#39;2&#39;'>Buy Now →</a>");
        assert_eq!(lines[5], "📰 <i>via Desidime/All Deals</i>");
        assert_eq!(lines[6], SEPARATOR);
    }

    #[test]
    fn single_price_and_no_discount() {
        let text = render_entry(2, &deal(0, Some(1899), None), &opts());
        assert!(text.starts_with("🥈 "));
        assert!(text.contains("💰 Price: <b>₹1,899</b>"));
        assert!(!text.contains("MRP"));
        assert!(!text.contains("You Save"));
    }

    #[test]
    fn no_prices_no_price_line() {
        let text = render_entry(3, &deal(40, None, None), &opts());
        assert!(text.starts_with("🥉 "));
        assert!(!text.contains('₹'));
    }

    #[test]
    fn ranks_after_three_share_marker() {
        assert!(render_entry(4, &deal(1, None, None), &opts()).starts_with("🔥 <b>#4"));
        assert!(render_entry(9, &deal(1, None, None), &opts()).starts_with("🔥 <b>#9"));
    }

    #[test]
    fn source_line_optional() {
        let o = FormatOptions {
            show_source: false,
            ..opts()
        };
        assert!(!render_entry(1, &deal(1, None, None), &o).contains("via"));
    }

    #[test]
    fn batch_wraps_entries() {
        let deals = vec![deal(78, Some(999), Some(4499)), deal(50, None, None)];
        let text = render_batch(&deals, &opts());
        assert!(text.starts_with("🇮🇳 <b>TOP 2 DEALS — Amazon India &amp; Flipkart</b>"));
        assert!(text.contains("🥇 <b>#1"));
        assert!(text.contains("🥈 <b>#2"));
        assert!(text.ends_with("⏰ <i>Next scan in 6 hours!</i>"));
    }

    #[test]
    fn alert_and_notice() {
        let alert = render_alert(1, &deal(60, Some(999), None), &opts());
        assert!(alert.starts_with("🚨 <b>DEAL ALERT</b>"));
        assert!(alert.ends_with(SEPARATOR));
        assert!(render_no_deals(&opts()).contains("No product deals found this round."));
    }

    #[test]
    fn thousands() {
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(4499), "4,499");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn intervals() {
        assert_eq!(human_interval(Duration::from_secs(3600)), "1 hour");
        assert_eq!(human_interval(Duration::from_secs(90 * 60)), "1 hour 30 minutes");
        assert_eq!(human_interval(Duration::from_secs(300)), "5 minutes");
    }
}
