use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::history::ChangeResult;
use crate::instrument::Instrument;
use crate::utils::format_utc_timestamp;

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape text for Telegram MarkdownV2; every reserved character must be backslashed.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if RESERVED.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Format a price with thousands separators and two decimals.
pub fn format_price(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Render the alert body for one breached (instrument, window) pair.
pub fn alert_message(
    instrument: &Instrument,
    change: &ChangeResult,
    threshold: f64,
    sent_at: DateTime<Utc>,
) -> String {
    let direction = if change.change_percent > 0.0 {
        "📈 up"
    } else {
        "📉 down"
    };
    let start = change.start_price.unwrap_or(change.current_price);

    let market = escape_markdown(instrument.market_label());
    let name = escape_markdown(instrument.display_name());
    let symbol = escape_markdown(instrument.symbol());
    let window = escape_markdown(&format!("{} min", change.window_minutes));
    let threshold = escape_markdown(&format!("{threshold}%"));
    let magnitude = escape_markdown(&format!("{:.2}%", change.change_percent.abs()));
    let start = escape_markdown(&format_price(start));
    let current = escape_markdown(&format_price(change.current_price));
    let time = escape_markdown(&format_utc_timestamp(sent_at));

    format!(
        "🚨 *Price movement alert* \\({market}\\)\n\
         • Pair: {name} \\(`{symbol}`\\)\n\
         • Window: {window} \\(threshold {threshold}\\)\n\
         • Move: {direction} {magnitude}\n\
         • Start price: ${start}\n\
         • Current price: ${current}\n\
         • Time: {time}"
    )
}

/// Render the launch summary: instruments with their initial prices plus the
/// active watch configuration.
pub fn startup_message(
    entries: &[(Instrument, Option<f64>)],
    windows: &BTreeMap<u32, f64>,
    poll_interval_secs: u64,
    started_at: DateTime<Utc>,
) -> String {
    let instrument_lines: Vec<String> = entries
        .iter()
        .map(|(instrument, price)| {
            let market = escape_markdown(instrument.market_label());
            let symbol = escape_markdown(instrument.symbol());
            let price = match price {
                Some(value) => escape_markdown(&format_price(*value)),
                None => "unavailable".to_string(),
            };
            format!("• `{symbol}` \\({market}\\): {price}")
        })
        .collect();

    let threshold_lines: Vec<String> = windows
        .iter()
        .map(|(window, threshold)| {
            format!(
                "• {} min: {}",
                window,
                escape_markdown(&format!("{threshold}%"))
            )
        })
        .collect();

    format!(
        "🚀 *Price monitor started*\n\
         • Started at: {}\n\
         • Instruments \\({}\\):\n{}\n\n\
         *Watch configuration*:\n\
         • Poll interval: {}s\n\
         • Window thresholds:\n{}",
        escape_markdown(&format_utc_timestamp(started_at)),
        entries.len(),
        instrument_lines.join("\n"),
        poll_interval_secs,
        threshold_lines.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sent_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn escapes_every_reserved_character() {
        assert_eq!(escape_markdown("a_b*c."), "a\\_b\\*c\\.");
        assert_eq!(escape_markdown("(5%)"), "\\(5%\\)");
        assert_eq!(escape_markdown("BTCUSDT"), "BTCUSDT");
    }

    #[test]
    fn groups_thousands_in_prices() {
        assert_eq!(format_price(43500.5), "43,500.50");
        assert_eq!(format_price(999.0), "999.00");
        assert_eq!(format_price(1234567.891), "1,234,567.89");
        assert_eq!(format_price(0.42), "0.42");
    }

    #[test]
    fn alert_message_carries_the_breach_details() {
        let instrument = Instrument::parse("BTCUSDT").unwrap();
        let change = ChangeResult {
            window_minutes: 5,
            start_price: Some(43500.0),
            current_price: 44548.99,
            change_percent: 2.41,
        };

        let text = alert_message(&instrument, &change, 2.0, sent_at());

        assert!(text.contains("Bitcoin"));
        assert!(text.contains("`BTCUSDT`"));
        assert!(text.contains("📈 up 2\\.41%"));
        assert!(text.contains("$43,500\\.00"));
        assert!(text.contains("$44,548\\.99"));
        assert!(text.contains("threshold 2%"));
    }

    #[test]
    fn alert_message_reports_downward_moves() {
        let instrument = Instrument::parse("ETHUSDT_PERP").unwrap();
        let change = ChangeResult {
            window_minutes: 15,
            start_price: Some(2400.0),
            current_price: 2328.0,
            change_percent: -3.0,
        };

        let text = alert_message(&instrument, &change, 2.0, sent_at());

        assert!(text.contains("📉 down 3\\.00%"));
        assert!(text.contains("Perpetual"));
    }

    #[test]
    fn startup_message_lists_instruments_and_thresholds() {
        let entries = vec![
            (Instrument::parse("BTCUSDT").unwrap(), Some(43500.5)),
            (Instrument::parse("ETHUSDT_PERP").unwrap(), None),
        ];
        let windows = BTreeMap::from([(5, 2.0), (60, 3.5)]);

        let text = startup_message(&entries, &windows, 30, sent_at());

        assert!(text.contains("Instruments \\(2\\)"));
        assert!(text.contains("`BTCUSDT` \\(Spot\\): 43,500\\.50"));
        assert!(text.contains("`ETHUSDT` \\(Perpetual\\): unavailable"));
        assert!(text.contains("• 5 min: 2%"));
        assert!(text.contains("• 60 min: 3\\.5%"));
        assert!(text.contains("Poll interval: 30s"));
    }
}
