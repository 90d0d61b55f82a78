// Phone number helpers for the US provider format (+1XXXXXXXXXX).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_DIGIT: Regex = Regex::new(r"\D").unwrap();
    static ref PLUS_ONE_PREFIX: Regex = Regex::new(r"^\+1").unwrap();
    pub static ref PROVIDER_FORMAT: Regex = Regex::new(r"^\+1\d{10}$").unwrap();
}

/// A string is a sendable phone when it contains exactly 10 digits
pub fn is_phone(s: &str) -> bool {
    s.chars().filter(|c| c.is_ascii_digit()).count() == 10
}

/// Strip every non-digit character
pub fn normalize(s: &str) -> String {
    NON_DIGIT.replace_all(s, "").into_owned()
}

/// Prefix a bare 10-digit number with the provider country code
pub fn to_provider_format(digits: &str) -> String {
    format!("+1{}", digits)
}

/// Strip a leading `+1` if present
pub fn strip_plus_one(s: &str) -> String {
    PLUS_ONE_PREFIX.replace(s, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ten_digit_numbers_with_punctuation() {
        assert!(is_phone("5551234567"));
        assert!(is_phone("(555) 123-4567"));
        assert!(is_phone("555.123.4567"));
    }

    #[test]
    fn rejects_short_long_and_empty() {
        assert!(!is_phone("555123456"));
        assert!(!is_phone("15551234567"));
        assert!(!is_phone(""));
        assert!(!is_phone("not a phone"));
    }

    #[test]
    fn normalize_strips_everything_but_digits() {
        assert_eq!(normalize("(555) 123-4567"), "5551234567");
        assert_eq!(normalize("+1 555 123 4567"), "15551234567");
    }

    #[test]
    fn provider_format_round_trip() {
        let formatted = to_provider_format("5551234567");
        assert_eq!(formatted, "+15551234567");
        assert!(PROVIDER_FORMAT.is_match(&formatted));
        assert_eq!(strip_plus_one(&formatted), "5551234567");
    }

    #[test]
    fn strip_plus_one_only_touches_the_prefix(){
        assert_eq!(strip_plus_one("5551234567"), "5551234567");
        assert_eq!(strip_plus_one("+15551+1234"), "5551+1234");
    }
}
