//! Header multiplicity codec.
//!
//! The gateway response carries one string per header key, so N values for a
//! single header cannot be expressed directly. Gateway and downstream proxies
//! treat keys that differ only in letter case as distinct map entries, while
//! browsers match `Set-Cookie` case-insensitively. Each extra value is
//! therefore stored under a differently-cased spelling of the same name.
//!
//! The casing is a 9-bit pattern `j = 512 - (index % 512)` laid MSB-first over
//! the first nine letters of the lowercased name; a set bit uppercases the
//! letter. Index 0 is the all-clear pattern, i.e. the plain lowercase name:
//!
//! | index | key          |
//! |-------|--------------|
//! | 0     | `set-cookie` |
//! | 1     | `SET-COOKIE` |
//! | 2     | `SET-COOKIe` |
//! | 256   | `Set-cookie` |

use crate::models::CodecError;

/// Number of distinct keys the codec can produce for one header name.
pub const MODULUS: usize = 512;

/// Width of the case pattern, `log2(MODULUS)`.
pub const PATTERN_BITS: usize = MODULUS.trailing_zeros() as usize;

/// The only header whose repeated values are spread across scrambled keys.
pub const SET_COOKIE: &str = "set-cookie";

/// Returns the key under which the `index`-th value of `name` is stored.
///
/// The result is always case-insensitively equal to `name` and distinct from
/// the key of every other index in `0..MODULUS`.
///
/// # Errors
///
/// Returns [`CodecError::IndexOutOfRange`] when `index >= MODULUS`, and
/// [`CodecError::NameTooShort`] when `index > 0` and `name` has fewer than
/// [`PATTERN_BITS`] ASCII letters to carry the pattern.
pub fn encode(name: &str, index: usize) -> Result<String, CodecError> {
    if index >= MODULUS {
        return Err(CodecError::IndexOutOfRange {
            index,
            max: MODULUS - 1,
        });
    }

    let lower = name.to_ascii_lowercase();
    if index == 0 {
        return Ok(lower);
    }

    let letters = letter_count(&lower);
    if letters < PATTERN_BITS {
        return Err(CodecError::NameTooShort {
            name: name.to_string(),
            letters,
            required: PATTERN_BITS,
        });
    }

    let pattern = MODULUS - index % MODULUS;
    let mut remaining = PATTERN_BITS;
    let encoded = lower
        .chars()
        .map(|c| {
            if !c.is_ascii_alphabetic() || remaining == 0 {
                return c;
            }
            remaining -= 1;
            if (pattern >> remaining) & 1 == 1 {
                toggle_case(c)
            } else {
                c
            }
        })
        .collect();

    Ok(encoded)
}

/// Inverse of [`encode`]: recovers the lowercase name and the value index.
///
/// Returns `None` when the casing cannot have come from [`encode`], i.e. an
/// uppercase letter sits past the pattern window.
#[must_use]
pub fn decode(encoded: &str) -> Option<(String, usize)> {
    let mut pattern = 0usize;
    let mut seen = 0usize;

    for c in encoded.chars().filter(char::is_ascii_alphabetic) {
        let bit = usize::from(c.is_ascii_uppercase());
        if seen < PATTERN_BITS {
            pattern = (pattern << 1) | bit;
            seen += 1;
        } else if bit == 1 {
            return None;
        }
    }

    if pattern != 0 && seen < PATTERN_BITS {
        return None;
    }

    let index = (MODULUS - pattern) % MODULUS;
    Some((encoded.to_ascii_lowercase(), index))
}

/// Whether `name` is the header whose values are kept as separate entries.
#[must_use]
pub fn is_multi_value_header(name: &str) -> bool {
    name.eq_ignore_ascii_case(SET_COOKIE)
}

fn letter_count(name: &str) -> usize {
    name.chars().filter(char::is_ascii_alphabetic).count()
}

const fn toggle_case(c: char) -> char {
    if c.is_ascii_uppercase() {
        c.to_ascii_lowercase()
    } else {
        c.to_ascii_uppercase()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_index_zero_is_plain_lowercase_name() {
        assert_eq!(encode("Set-Cookie", 0).unwrap(), "set-cookie");
        assert_eq!(encode("X", 0).unwrap(), "x");
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode("Set-Cookie", 1).unwrap(), "SET-COOKIE");
        assert_eq!(encode("Set-Cookie", 2).unwrap(), "SET-COOKIe");
        assert_eq!(encode("Set-Cookie", 3).unwrap(), "SET-COOKiE");
        assert_eq!(encode("Set-Cookie", 256).unwrap(), "Set-cookie");
    }

    #[test]
    fn test_every_index_is_case_insensitively_equal_and_unique() {
        let mut seen = HashSet::new();
        for index in 0..MODULUS {
            let key = encode("Set-Cookie", index).unwrap();
            assert!(key.eq_ignore_ascii_case("Set-Cookie"), "index {index} gave {key}");
            assert!(seen.insert(key.clone()), "index {index} collided on {key}");
        }
        assert_eq!(seen.len(), MODULUS);
    }

    #[test]
    fn test_hyphen_stays_in_place() {
        for index in [1, 17, 200, 300, 511] {
            let key = encode("set-cookie", index).unwrap();
            assert_eq!(key.find('-'), Some(3), "index {index} gave {key}");
        }
    }

    #[test]
    fn test_index_past_modulus_is_rejected() {
        assert_eq!(
            encode("Set-Cookie", MODULUS),
            Err(CodecError::IndexOutOfRange {
                index: MODULUS,
                max: MODULUS - 1
            })
        );
    }

    #[test]
    fn test_short_name_is_rejected_for_extra_values() {
        let err = encode("X-Id", 1).unwrap_err();
        assert!(matches!(err, CodecError::NameTooShort { letters: 3, .. }));
    }

    #[test]
    fn test_longer_names_only_use_pattern_window() {
        let key = encode("X-Custom-Header", 1).unwrap();
        assert_eq!(key, "X-CUSTOM-HEader");
        assert!(key.eq_ignore_ascii_case("x-custom-header"));
    }

    #[test]
    fn test_decode_inverts_encode() {
        for index in 0..MODULUS {
            let key = encode("Set-Cookie", index).unwrap();
            assert_eq!(decode(&key), Some(("set-cookie".to_string(), index)));
        }
    }

    #[test]
    fn test_decode_rejects_foreign_casing() {
        assert_eq!(decode("x-custom-headeR"), None);
        assert_eq!(decode("Ab"), None);
    }

    #[test]
    fn test_is_multi_value_header() {
        assert!(is_multi_value_header("Set-Cookie"));
        assert!(is_multi_value_header("SET-COOKIE"));
        assert!(!is_multi_value_header("Cookie"));
    }
}
