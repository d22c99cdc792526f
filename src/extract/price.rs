//! Price normalization from locale-formatted text.
//!
//! The source site renders prices as French-Canadian text ("19,99 $",
//! "Économisez 25%") or English text ("$19.99"). Extraction takes the first
//! integer-or-decimal token with either separator and normalizes to a dot.

use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    // First numeric token; decimal part optional, either separator
    Regex::new(r"\d+(?:[.,]\d+)?").expect("hardcoded price pattern is valid")
});

/// Extract a numeric price from arbitrary text.
///
/// Returns `None` when no numeric token is present or the parsed value is not
/// finite. Currency symbols and surrounding text are ignored rather than
/// interpreted.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let token = PRICE_TOKEN.find(text.trim())?;
    let normalized = token.as_str().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separator_is_normalized() {
        assert_eq!(parse_price("19,99 $"), Some(19.99));
    }

    #[test]
    fn dot_separator_parses_directly() {
        assert_eq!(parse_price("$129.99"), Some(129.99));
    }

    #[test]
    fn integer_price_parses() {
        assert_eq!(parse_price("45"), Some(45.0));
    }

    #[test]
    fn surrounding_text_is_ignored() {
        assert_eq!(parse_price("Prix en liquidation 8,49 $ ch."), Some(8.49));
    }

    #[test]
    fn first_token_wins() {
        // Strikethrough original price renders before the sale price; the raw
        // matched text starts with whichever the selector captured.
        assert_eq!(parse_price("34,99 $ 24,99 $"), Some(34.99));
    }

    #[test]
    fn dash_placeholder_is_absent() {
        assert_eq!(parse_price("—"), None);
    }

    #[test]
    fn empty_and_whitespace_are_absent() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("   "), None);
    }

    #[test]
    fn non_numeric_text_is_absent() {
        assert_eq!(parse_price("Voir le prix en magasin"), None);
    }
}
