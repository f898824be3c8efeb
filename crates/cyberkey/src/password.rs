//! Password generation and strength scoring

use rand::Rng;
use std::fmt;

/// Generator charset: 64 chars, ambiguous glyphs (I/O/l/o/0/1) removed
const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789!@#$%^&*";

/// Default generated password length
pub const DEFAULT_LENGTH: usize = 16;

/// Generate a random password of the given length
pub fn generate(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Heuristic strength rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Weak => write!(f, "weak"),
            Strength::Medium => write!(f, "medium"),
            Strength::Strong => write!(f, "strong"),
        }
    }
}

/// Score a password 0..=5: one point each for length over 5, length
/// over 10, an uppercase letter, a digit, and a non-alphanumeric char
pub fn score(password: &str) -> u8 {
    let mut score = 0;
    let length = password.chars().count();

    if length > 5 {
        score += 1;
    }
    if length > 10 {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 1;
    }

    score
}

/// Map a score to a rating: under 3 is weak, under 5 is medium
pub fn strength(password: &str) -> Strength {
    match score(password) {
        0..=2 => Strength::Weak,
        3..=4 => Strength::Medium,
        _ => Strength::Strong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_length_and_charset() {
        let pass = generate(DEFAULT_LENGTH);
        assert_eq!(pass.chars().count(), DEFAULT_LENGTH);
        assert!(pass.bytes().all(|b| CHARSET.contains(&b)));

        assert_eq!(generate(0), "");
        assert_eq!(generate(32).chars().count(), 32);
    }

    #[test]
    fn test_generate_avoids_ambiguous_chars() {
        for _ in 0..20 {
            let pass = generate(64);
            for c in ['I', 'O', 'l', 'o', '0', '1'] {
                assert!(!pass.contains(c), "ambiguous char {} in {}", c, pass);
            }
        }
    }

    #[test]
    fn test_score() {
        assert_eq!(score(""), 0);
        assert_eq!(score("abc"), 0);
        // Length over 5 only
        assert_eq!(score("abcdef"), 1);
        // Length over 5 + over 10
        assert_eq!(score("abcdefghijk"), 2);
        // Uppercase, digit, symbol
        assert_eq!(score("A1!"), 3);
        // Everything
        assert_eq!(score("Abcdefghij1!"), 5);
    }

    #[test]
    fn test_strength_thresholds() {
        assert_eq!(strength(""), Strength::Weak);
        assert_eq!(strength("abcdef"), Strength::Weak);
        assert_eq!(strength("Abcdef1"), Strength::Medium);
        assert_eq!(strength("Abcdefghij1!"), Strength::Strong);
    }

    #[test]
    fn test_generated_length_points() {
        // 16 chars always earns both length points
        for _ in 0..10 {
            assert!(score(&generate(DEFAULT_LENGTH)) >= 2);
        }
    }
}
