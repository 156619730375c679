//! Phonetic keys for street and city names.
//!
//! Keys are a coarse pre-filter: the datastore stores the key of every
//! segment name and city, and retrieval looks rows up by the key of the
//! query text. Numeric street names ("5th", "42nd") bypass Metaphone so that
//! "5th St" and "Fifth St" are not conflated with each other's spellings.

use rphonetic::{Encoder, Metaphone};

/// Default key length used by the reference data.
pub const DEFAULT_KEY_LEN: usize = 5;

/// Encode `name` into its phonetic key.
///
/// A leading digit run is returned verbatim regardless of `max_len`.
pub fn encode(name: &str, max_len: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let digits: String = cleaned.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        return digits;
    }
    if cleaned.is_empty() {
        return String::new();
    }

    Metaphone::new(max_len)
        .encode(&cleaned)
        .chars()
        .take(max_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_digits_bypass_metaphone() {
        assert_eq!(encode("5th Ave", DEFAULT_KEY_LEN), "5");
        assert_eq!(encode("1234567 Road", 2), "1234567");
        assert_eq!(encode("#42nd", DEFAULT_KEY_LEN), "42");
    }

    #[test]
    fn test_punctuation_and_case_are_ignored() {
        assert_eq!(
            encode("O'Brien St.", DEFAULT_KEY_LEN),
            encode("obrien st", DEFAULT_KEY_LEN)
        );
        assert_eq!(
            encode("MAIN STREET", DEFAULT_KEY_LEN),
            encode("main street", DEFAULT_KEY_LEN)
        );
    }

    #[test]
    fn test_spelling_variants_share_a_key() {
        assert_eq!(encode("Smith", DEFAULT_KEY_LEN), encode("Smyth", DEFAULT_KEY_LEN));
    }

    #[test]
    fn test_key_is_truncated() {
        let key = encode("Massachusetts Avenue", DEFAULT_KEY_LEN);
        assert!(!key.is_empty());
        assert!(key.chars().count() <= DEFAULT_KEY_LEN);
        assert!(encode("Massachusetts Avenue", 3).chars().count() <= 3);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(encode("Broadway", 5), encode("Broadway", 5));
        assert_eq!(encode("", 5), "");
        assert_eq!(encode("---", 5), "");
    }
}
