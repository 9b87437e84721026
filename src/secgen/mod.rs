//! Random secret generation with guaranteed character-class coverage.
//!
//! Every allowed character class is represented at least once
//! regardless of the secret length.  If [`CharClass::Special`] is
//! allowed, roughly 10% of the characters are special; the other
//! allowed classes share the remaining length about equally.  The
//! secret length cannot be smaller than the number of allowed classes.
//! Only a curated subset of the printable special ASCII characters is
//! used, to avoid characters that cause display or input friction.

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{Rng, TryRngCore};

use crate::errors::{CredVaultError, Result};

/// Character classes a generated secret can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Digit,
    AlphaUpper,
    AlphaLower,
    Special,
}

impl CharClass {
    /// Returns `true` if `c` belongs to this class.
    pub fn contains(self, c: u8) -> bool {
        match self {
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::AlphaUpper => c.is_ascii_uppercase(),
            CharClass::AlphaLower => c.is_ascii_lowercase(),
            CharClass::Special => !c.is_ascii_alphanumeric(),
        }
    }
}

/// Curated special characters.
const SPECIAL_CHARS: &[u8] = b"!#$%&*+-/=?@";

/// Fraction of positions given to the special class when requested.
const SPECIAL_FRACTION: f32 = 0.1;

/// Generates random secrets.  Stateless; draws from the OS RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretGenerator;

impl SecretGenerator {
    /// Fill `out` with a random secret drawn from `classes`.
    ///
    /// `classes` must be non-empty and free of duplicates.  Fails if
    /// `out` is shorter than the number of allowed classes, since one
    /// character of each class could then not be guaranteed.  The
    /// caller owns `out` and is responsible for zeroing it once the
    /// secret has been consumed.
    pub fn generate(&self, out: &mut [u8], classes: &[CharClass]) -> Result<()> {
        if classes.is_empty() {
            return Err(CredVaultError::EmptySequence("character classes"));
        }
        if out.len() < classes.len() {
            return Err(CredVaultError::SecretTooShort {
                length: out.len(),
                classes: classes.len(),
            });
        }

        let mut rng = OsRng.unwrap_err();
        let mut index = 0;
        for &class in classes {
            let quota = class_quota(out.len(), class, classes);
            for _ in 0..quota {
                if index == out.len() {
                    break;
                }
                out[index] = random_char(&mut rng, class);
                index += 1;
            }
        }

        // Any positions left over after the per-class quotas are drawn
        // from a uniformly random allowed class.
        while index < out.len() {
            let class = classes[rng.random_range(0..classes.len())];
            out[index] = random_char(&mut rng, class);
            index += 1;
        }

        // Fisher-Yates, so characters do not appear in quota order.
        out.shuffle(&mut rng);
        Ok(())
    }
}

/// Number of positions allocated to `class` before leftover filling.
fn class_quota(length: usize, class: CharClass, classes: &[CharClass]) -> usize {
    if !classes.contains(&CharClass::Special) {
        return length / classes.len();
    }
    let special = ((length as f32 * SPECIAL_FRACTION).round() as usize).max(1);
    if class == CharClass::Special {
        special
    } else {
        (length - special) / (classes.len() - 1)
    }
}

fn random_char<R: Rng>(rng: &mut R, class: CharClass) -> u8 {
    match class {
        CharClass::Digit => rng.random_range(b'0'..=b'9'),
        CharClass::AlphaUpper => rng.random_range(b'A'..=b'Z'),
        CharClass::AlphaLower => rng.random_range(b'a'..=b'z'),
        CharClass::Special => SPECIAL_CHARS[rng.random_range(0..SPECIAL_CHARS.len())],
    }
}
