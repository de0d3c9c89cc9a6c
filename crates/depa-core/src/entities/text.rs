use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::entities::parse_decimal_loose;
use crate::model::{Origin, Price, SecurityIdentifier, SecurityRecord};

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2}[A-Z0-9]{10}\b").expect("static regex"));

/// A number immediately followed by a unit word is a quantity.
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:[,.\s]\d{3})+|\d+)\s*(?:shares|units|pcs|stk)\b")
        .expect("static regex")
});

/// A number after a price keyword, optionally led by a currency symbol or
/// code.
static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:price|value|nav|kurs)\b[\s:=-]{0,10}([$€£]|usd|eur|gbp|chf|sek)?\s*(\d+(?:[.,]\d+)?)",
    )
    .expect("static regex")
});

/// Scan free text for security identifiers and nearby attributes.
///
/// Every whole-word identifier match gets a symmetric context window of
/// `context_radius` characters; the display name, quantity and price are
/// only searched inside that window. One record per unique identifier; the
/// first context encountered is stored for audit.
pub fn scan_text(full_text: &str, context_radius: usize) -> Vec<SecurityRecord> {
    let mut records: BTreeMap<SecurityIdentifier, SecurityRecord> = BTreeMap::new();

    for m in IDENTIFIER_RE.find_iter(full_text) {
        let Some(identifier) = SecurityIdentifier::parse(m.as_str()) else {
            continue;
        };
        if records.contains_key(&identifier) {
            continue;
        }

        let start = floor_char_boundary(full_text, m.start().saturating_sub(context_radius));
        let end = ceil_char_boundary(full_text, (m.end() + context_radius).min(full_text.len()));
        let window = &full_text[start..end];
        let prefix = &full_text[start..m.start()];

        let mut record = SecurityRecord::new(
            identifier.clone(),
            Origin::FreeText {
                context: window.trim().to_string(),
            },
        );
        record.display_name = display_name_before(prefix);
        record.quantity = find_quantity(window);
        record.price = find_price(window);
        records.insert(identifier, record);
    }

    records.into_values().collect()
}

fn find_quantity(window: &str) -> Option<rust_decimal::Decimal> {
    QUANTITY_RE
        .captures(window)
        .and_then(|c| parse_decimal_loose(c.get(1)?.as_str()))
}

fn find_price(window: &str) -> Option<Price> {
    let captures = PRICE_RE.captures(window)?;
    let value = parse_decimal_loose(captures.get(2)?.as_str())?;
    let currency = captures.get(1).map(|m| {
        let raw = m.as_str();
        if raw.chars().all(|c| c.is_ascii_alphabetic()) {
            raw.to_ascii_uppercase()
        } else {
            raw.to_string()
        }
    });
    Some(Price { value, currency })
}

/// The capitalized word sequence immediately preceding an identifier.
///
/// Ticker-like all-caps tokens between the name and the identifier are
/// skipped ("Apple Inc AAPL US03..." names "Apple Inc"). The result must be
/// 5–50 characters to count as a name.
fn display_name_before(prefix: &str) -> Option<String> {
    let mut tokens: Vec<&str> = prefix
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')')))
        .filter(|t| !t.is_empty())
        .collect();

    while let Some(last) = tokens.last() {
        if is_ticker_like(last) {
            tokens.pop();
        } else {
            break;
        }
    }

    let mut name_tokens: Vec<&str> = tokens
        .iter()
        .rev()
        .take_while(|t| is_capitalized_word(t))
        .copied()
        .collect();
    if name_tokens.is_empty() {
        return None;
    }
    name_tokens.reverse();
    let name = name_tokens.join(" ");
    let length = name.chars().count();
    if (5..=50).contains(&length) {
        Some(name)
    } else {
        None
    }
}

fn is_capitalized_word(token: &str) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_uppercase()
        && token.chars().any(|c| c.is_lowercase())
        && token
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '&' | '.' | '-' | '\''))
}

fn is_ticker_like(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= 6
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RADIUS: usize = 120;

    #[test]
    fn prose_with_quantity_and_price() {
        let text = "Position report: Apple Inc AAPL US0378331005 100 shares price $150 as of June.";
        let records = scan_text(text, RADIUS);
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.identifier.as_str(), "US0378331005");
        assert_eq!(rec.display_name.as_deref(), Some("Apple Inc"));
        assert_eq!(rec.quantity, Some(dec!(100)));
        let price = rec.price.as_ref().unwrap();
        assert_eq!(price.value, dec!(150));
        assert_eq!(price.currency.as_deref(), Some("$"));
        assert!(matches!(rec.provenance[0], Origin::FreeText { .. }));
    }

    #[test]
    fn repeated_identifier_yields_one_record() {
        let text = "US0378331005 mentioned here, and US0378331005 again later.";
        let records = scan_text(text, RADIUS);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn wrong_length_codes_are_ignored() {
        // 11 and 13 characters around the valid shape.
        let text = "codes US037833100 and US03783310055 are not identifiers";
        assert!(scan_text(text, RADIUS).is_empty());
    }

    #[test]
    fn lowercase_is_not_an_identifier() {
        assert!(scan_text("us0378331005", RADIUS).is_empty());
    }

    #[test]
    fn currency_code_price() {
        let text = "Bond DE000BAY0017, value EUR 62,30 per unit";
        let records = scan_text(text, RADIUS);
        let price = records[0].price.as_ref().unwrap();
        assert_eq!(price.value, dec!(62.30));
        assert_eq!(price.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn quantity_needs_a_unit_word() {
        let text = "Security US0378331005 100";
        let records = scan_text(text, RADIUS);
        assert_eq!(records[0].quantity, None);
    }

    #[test]
    fn thousands_separated_quantity() {
        let text = "Holding US0378331005 1,000 shares";
        let records = scan_text(text, RADIUS);
        assert_eq!(records[0].quantity, Some(dec!(1000)));
    }

    #[test]
    fn attributes_outside_window_are_not_seen() {
        // The quantity sits past the 20-character radius; the adjacent name
        // is still inside it.
        let padding = "x ".repeat(100);
        let text = format!("Apple Inc US0378331005 {padding} 100 shares");
        let records = scan_text(&text, 20);
        assert_eq!(records[0].display_name.as_deref(), Some("Apple Inc"));
        assert_eq!(records[0].quantity, None);
    }

    #[test]
    fn name_without_attributes() {
        let records = scan_text("Issued by Siemens Energy DE000ENER6Y0.", RADIUS);
        let rec = &records[0];
        assert_eq!(rec.display_name.as_deref(), Some("Siemens Energy"));
        assert_eq!(rec.quantity, None);
        assert_eq!(rec.price, None);
    }

    #[test]
    fn short_name_is_rejected() {
        // "Ubs" alone is under the 5-character floor.
        let records = scan_text("per Ubs CH0244767585", RADIUS);
        assert_eq!(records[0].display_name, None);
    }

    #[test]
    fn records_sorted_by_identifier() {
        let text = "US0378331005 then DE000BAY0017";
        let records = scan_text(text, RADIUS);
        assert_eq!(records[0].identifier.as_str(), "DE000BAY0017");
        assert_eq!(records[1].identifier.as_str(), "US0378331005");
    }
}
