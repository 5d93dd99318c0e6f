//! Username and color generation.
//!
//! Usernames are `adjective_noun_ddd`, colors are `#RRGGBB` in uppercase hex.
//! Every choice is uniform and independent. Uniqueness is not checked; with
//! 20 adjectives, 20 nouns and 1000 suffixes there are 400,000 usernames.

use rand::seq::SliceRandom;
use rand::Rng;

/// Adjectives a username is built from.
pub const ADJECTIVES: [&str; 20] = [
    "swift", "brave", "clever", "bright", "calm", "daring", "eager", "fierce", "gentle", "happy",
    "jolly", "kind", "lucky", "mighty", "noble", "proud", "quick", "radiant", "silent", "wise",
];

/// Nouns a username is built from.
pub const NOUNS: [&str; 20] = [
    "tiger", "eagle", "wolf", "dragon", "phoenix", "falcon", "lion", "fox", "bear", "raven",
    "hawk", "panther", "jaguar", "lynx", "shark", "orca", "viper", "cobra", "puma", "wolverine",
];

const DIGITS: &[u8] = b"0123456789";
const HEX_DIGITS: &[u8] = b"0123456789ABCDEF";

/// Number of digits in the numeric username suffix.
const SUFFIX_LEN: usize = 3;

/// Number of hex digits in a color.
const COLOR_LEN: usize = 6;

fn pick_chars<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], len: usize) -> String {
    (0..len)
        .filter_map(|_| alphabet.choose(&mut *rng).map(|&b| char::from(b)))
        .collect()
}

/// Generate a username such as `swift_tiger_042`.
pub fn generate_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("swift");
    let noun = NOUNS.choose(rng).copied().unwrap_or("tiger");
    let suffix = pick_chars(rng, DIGITS, SUFFIX_LEN);

    format!("{adjective}_{noun}_{suffix}")
}

/// Generate a display color such as `#1A2B3C`.
pub fn generate_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{}", pick_chars(rng, HEX_DIGITS, COLOR_LEN))
}

/// Whether `username` has the shape produced by [`generate_username`].
pub fn is_generated_username(username: &str) -> bool {
    let mut parts = username.split('_');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(adjective), Some(noun), Some(suffix), None) => {
            ADJECTIVES.iter().any(|w| *w == adjective)
                && NOUNS.iter().any(|w| *w == noun)
                && suffix.len() == SUFFIX_LEN
                && suffix.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// Whether `color` has the shape produced by [`generate_color`].
pub fn is_generated_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == COLOR_LEN && hex.bytes().all(|b| HEX_DIGITS.contains(&b)),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_word_lists_have_twenty_distinct_entries() {
        assert_eq!(ADJECTIVES.iter().collect::<HashSet<_>>().len(), 20);
        assert_eq!(NOUNS.iter().collect::<HashSet<_>>().len(), 20);
    }

    #[test]
    fn test_generated_usernames_match_pattern() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let username = generate_username(&mut rng);
            assert!(is_generated_username(&username), "bad username {username}");
        }
    }

    #[test]
    fn test_generated_colors_match_pattern() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let color = generate_color(&mut rng);
            assert!(is_generated_color(&color), "bad color {color}");
            assert_eq!(color.len(), 7);
        }
    }

    #[test]
    fn test_same_seed_same_output() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        assert_eq!(generate_username(&mut a), generate_username(&mut b));
        assert_eq!(generate_color(&mut a), generate_color(&mut b));
    }

    #[test]
    fn test_suffix_keeps_leading_zeros() {
        // Over enough draws some suffix must start with 0; it must stay 3 digits.
        let mut rng = StdRng::seed_from_u64(1);
        let zero_led = (0..2000)
            .map(|_| generate_username(&mut rng))
            .find(|u| u.rsplit('_').next().is_some_and(|s| s.starts_with('0')));

        let username = zero_led.expect("expected a zero-led suffix in 2000 draws");
        assert_eq!(username.rsplit('_').next().map(str::len), Some(3));
    }

    #[test]
    fn test_all_words_reachable() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut adjectives = HashSet::new();
        let mut nouns = HashSet::new();

        for _ in 0..5000 {
            let username = generate_username(&mut rng);
            let mut parts = username.split('_');
            adjectives.insert(parts.next().unwrap().to_string());
            nouns.insert(parts.next().unwrap().to_string());
        }

        assert_eq!(adjectives.len(), 20);
        assert_eq!(nouns.len(), 20);
    }

    #[test]
    fn test_username_validator_rejects_foreign_shapes() {
        assert!(is_generated_username("swift_tiger_042"));
        assert!(!is_generated_username("slow_tiger_042"));
        assert!(!is_generated_username("swift_cat_042"));
        assert!(!is_generated_username("swift_tiger_42"));
        assert!(!is_generated_username("swift_tiger_04a"));
        assert!(!is_generated_username("swift_tiger_042_x"));
    }

    #[test]
    fn test_color_validator_rejects_foreign_shapes() {
        assert!(is_generated_color("#09AF3C"));
        assert!(!is_generated_color("09AF3C"));
        assert!(!is_generated_color("#09af3c"));
        assert!(!is_generated_color("#09AF3"));
        assert!(!is_generated_color("#09AF3CG"));
    }
}
