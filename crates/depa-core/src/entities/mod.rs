pub mod table;
pub mod text;

use rust_decimal::Decimal;

/// Headers that mark a table as security-related at all.
pub(crate) const SECURITY_TABLE_KEYWORDS: &[&str] =
    &["isin", "identifier", "security", "stock", "bond", "fund"];

/// Headers that mark the column holding the identifiers themselves.
pub(crate) const IDENTIFIER_COLUMN_KEYWORDS: &[&str] = &["isin", "identifier", "code"];

pub(crate) const NAME_COLUMN_KEYWORDS: &[&str] = &["name", "description", "instrument"];

pub(crate) const QUANTITY_COLUMN_KEYWORDS: &[&str] =
    &["quantity", "qty", "shares", "units", "nominal", "amount"];

pub(crate) const PRICE_COLUMN_KEYWORDS: &[&str] = &["price", "value", "nav", "rate", "kurs"];

pub(crate) fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw))
}

/// Parse a number out of a cell or text capture, tolerating currency
/// symbols, thousands separators and a decimal comma.
///
/// Separator disambiguation: when both `.` and `,` appear, the later one is
/// the decimal separator; a lone separator followed by groups of exactly
/// three digits is a thousands separator.
pub(crate) fn parse_decimal_loose(raw: &str) -> Option<Decimal> {
    let mut cleaned = String::new();
    for (i, c) in raw.trim().char_indices() {
        if c.is_ascii_digit() || c == '.' || c == ',' || (c == '-' && i == 0) {
            cleaned.push(c);
        } else if !c.is_whitespace() && !cleaned.is_empty() && cleaned.chars().any(|d| d.is_ascii_digit()) {
            // A non-numeric character after digits ends the number; this
            // keeps trailing units ("100 shares") out without merging two
            // unrelated numbers.
            break;
        }
    }
    let cleaned = cleaned.trim_end_matches(|c| c == '.' || c == ',');
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut normalized = normalize_separators(cleaned);
    if normalized.starts_with('.') {
        normalized.insert(0, '0');
    }
    normalized.parse().ok()
}

fn normalize_separators(s: &str) -> String {
    let has_dot = s.contains('.');
    let has_comma = s.contains(',');
    match (has_dot, has_comma) {
        (true, true) => {
            if s.rfind('.') > s.rfind(',') {
                s.replace(',', "")
            } else {
                s.replace('.', "").replace(',', ".")
            }
        }
        (false, true) => {
            if is_grouped(s, ',') {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            }
        }
        (true, false) => {
            if is_grouped(s, '.') {
                s.replace('.', "")
            } else {
                s.to_string()
            }
        }
        (false, false) => s.to_string(),
    }
}

/// True when `s` looks like digit groups of three joined by `sep`
/// ("1,234,567"), i.e. the separator is a thousands separator.
fn is_grouped(s: &str, sep: char) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let groups: Vec<&str> = unsigned.split(sep).collect();
    groups.len() >= 2
        && !groups[0].is_empty()
        && groups[0].len() <= 3
        && groups
            .iter()
            .all(|g| g.chars().all(|c| c.is_ascii_digit()))
        && groups[1..].iter().all(|g| g.len() == 3)
}

const CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP", "CHF", "SEK", "NOK", "DKK", "JPY"];

/// Split a leading currency symbol or 3-letter code off a value string.
pub(crate) fn split_leading_currency(raw: &str) -> (Option<String>, &str) {
    let s = raw.trim();
    let mut chars = s.chars();
    match chars.next() {
        Some(c @ ('$' | '€' | '£')) => (Some(c.to_string()), chars.as_str().trim_start()),
        _ => {
            if s.len() >= 3 && s.is_char_boundary(3) {
                let prefix = &s[..3];
                let code = prefix.to_ascii_uppercase();
                if CURRENCY_CODES.contains(&code.as_str())
                    && s[3..].trim_start().starts_with(|c: char| c.is_ascii_digit())
                {
                    return (Some(code), s[3..].trim_start());
                }
            }
            (None, s)
        }
    }
}
