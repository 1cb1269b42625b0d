//! Object identifiers and the compound `"<id>_<clone>"` handle format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AxError;

/// Scopes simultaneous instances of one canonical object. `0` is the
/// canonical clone.
pub type CloneId = i32;

/// Passed to clone operations to request the first free clone id.
pub const NEXT_FREE_CLONE: CloneId = -1;

/// A 64-bit object id stored as two signed 32-bit halves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticyId {
    /// Lower 32 bits.
    pub low: i32,
    /// Upper 32 bits.
    pub high: i32,
}

impl ArticyId {
    /// The null id, meaning "no reference".
    pub const NULL: ArticyId = ArticyId { low: 0, high: 0 };

    /// Build an id from its two halves.
    pub fn new(low: i32, high: i32) -> Self {
        Self { low, high }
    }

    /// The full 64-bit value.
    pub fn get(self) -> u64 {
        (u64::from(self.high as u32) << 32) | u64::from(self.low as u32)
    }

    /// Whether this is the null id.
    pub fn is_null(self) -> bool {
        self.low == 0 && self.high == 0
    }

    /// Parse a hex id, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AxError> {
        let digits = strip_hex_prefix(s.trim()).unwrap_or(s.trim());
        u64::from_str_radix(digits, 16)
            .map(Self::from)
            .map_err(|_| AxError::InvalidId(s.to_string()))
    }

    /// Format as the export's hex notation, e.g. `0x000000000000AAAA`.
    pub fn to_hex(self) -> String {
        format!("0x{:016X}", self.get())
    }

    /// Format as the compound handle `"<id>_<clone>"`.
    pub fn with_clone(self, clone_id: CloneId) -> String {
        format!("{}_{}", self.get(), clone_id)
    }
}

impl From<u64> for ArticyId {
    fn from(value: u64) -> Self {
        Self {
            low: value as u32 as i32,
            high: (value >> 32) as u32 as i32,
        }
    }
}

impl From<ArticyId> for u64 {
    fn from(id: ArticyId) -> Self {
        id.get()
    }
}

impl fmt::Display for ArticyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl FromStr for ArticyId {
    type Err = AxError;

    /// Accepts `0x`-prefixed hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if strip_hex_prefix(trimmed).is_some() {
            return Self::from_hex(trimmed);
        }
        trimmed
            .parse::<u64>()
            .map(Self::from)
            .map_err(|_| AxError::InvalidId(s.to_string()))
    }
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Split a compound handle `"<id>_<clone>"` on its last underscore.
///
/// The id part is decimal. A clone part that is not a number reads as `0`.
pub fn parse_compound(s: &str) -> Option<(ArticyId, CloneId)> {
    let (id, clone) = s.rsplit_once('_')?;
    let id = id.parse::<u64>().ok()?;
    Some((ArticyId::from(id), leading_int(clone)))
}

/// Parse the leading decimal digits of `s`, yielding `0` when there are none.
pub(crate) fn leading_int(s: &str) -> i32 {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i32>().map(|n| sign * n).unwrap_or(0)
}

impl Serialize for ArticyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ArticyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => Ok(ArticyId::from(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn halves_combine() {
        let id = ArticyId::new(0xAAAA, 1);
        assert_eq!(id.get(), (1u64 << 32) | 0xAAAA);
        assert!(!id.is_null());
        assert!(ArticyId::NULL.is_null());
    }

    #[test]
    fn negative_halves_are_unsigned_bits() {
        let id = ArticyId::from(u64::MAX);
        assert_eq!(id.low, -1);
        assert_eq!(id.high, -1);
        assert_eq!(id.get(), u64::MAX);
    }

    #[test]
    fn parse_hex_and_decimal() {
        assert_eq!(ArticyId::from_hex("0xAAAA").unwrap().get(), 43690);
        assert_eq!(ArticyId::from_hex("aaaa").unwrap().get(), 43690);
        assert_eq!("0x000000000000AAAA".parse::<ArticyId>().unwrap().get(), 43690);
        assert_eq!("43690".parse::<ArticyId>().unwrap().get(), 43690);
        assert!("door".parse::<ArticyId>().is_err());
    }

    #[test]
    fn hex_display() {
        let id = ArticyId::from(0xAAAA);
        assert_eq!(id.to_hex(), "0x000000000000AAAA");
        assert_eq!(id.to_string(), "43690");
        assert_eq!(id.with_clone(1), "43690_1");
    }

    #[test]
    fn compound_splits_on_last_underscore() {
        assert_eq!(parse_compound("43690_1"), Some((ArticyId::from(43690), 1)));
        assert_eq!(parse_compound("43690_x"), Some((ArticyId::from(43690), 0)));
        assert_eq!(parse_compound("43690"), None);
        assert_eq!(parse_compound("door_1"), None);
    }

    #[test]
    fn serde_uses_hex_strings() {
        let id = ArticyId::from(0xAAAA);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0x000000000000AAAA\"");
        let back: ArticyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        let from_number: ArticyId = serde_json::from_str("43690").unwrap();
        assert_eq!(from_number, id);
    }

    proptest! {
        #[test]
        fn u64_round_trip(value in any::<u64>()) {
            prop_assert_eq!(ArticyId::from(value).get(), value);
        }

        #[test]
        fn compound_round_trip(value in any::<u64>(), clone in 0i32..1000) {
            let text = ArticyId::from(value).with_clone(clone);
            prop_assert_eq!(parse_compound(&text), Some((ArticyId::from(value), clone)));
        }
    }
}
