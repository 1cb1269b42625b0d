//! Script fragment text and its stable hash.

use std::fmt;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Hash reserved for the empty fragment.
pub const EMPTY_FRAGMENT_HASH: i32 = 0;

/// Stable 32-bit hash of a fragment's text (FNV-1a over the UTF-8 bytes).
///
/// The empty string maps to [`EMPTY_FRAGMENT_HASH`]; no other text does.
pub fn fragment_hash(text: &str) -> i32 {
    if text.is_empty() {
        return EMPTY_FRAGMENT_HASH;
    }
    let hash = text
        .bytes()
        .fold(FNV_OFFSET, |acc, byte| (acc ^ u32::from(byte)).wrapping_mul(FNV_PRIME));
    match hash as i32 {
        EMPTY_FRAGMENT_HASH => 1,
        h => h,
    }
}

/// A condition or instruction as authored, with its hash cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptFragment {
    text: String,
    hash: i32,
}

impl ScriptFragment {
    /// Wrap fragment text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = fragment_hash(&text);
        Self { text, hash }
    }

    /// The source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The fragment's hash.
    pub fn hash(&self) -> i32 {
        self.hash
    }

    /// Whether the fragment has no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for ScriptFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vectors() {
        // Reference FNV-1a 32-bit values.
        assert_eq!(fragment_hash("a") as u32, 0xe40c_292c);
        assert_eq!(fragment_hash("foobar") as u32, 0xbf9c_f968);
    }

    #[test]
    fn empty_is_reserved() {
        assert_eq!(fragment_hash(""), EMPTY_FRAGMENT_HASH);
        assert_ne!(fragment_hash(" "), EMPTY_FRAGMENT_HASH);
    }

    #[test]
    fn whitespace_matters() {
        assert_ne!(fragment_hash("a==b"), fragment_hash("a == b"));
    }

    #[test]
    fn fragment_caches_hash() {
        let fragment = ScriptFragment::new("GameState.awake == true");
        assert_eq!(fragment.hash(), fragment_hash("GameState.awake == true"));
        assert_eq!(fragment.to_string(), "GameState.awake == true");
        assert!(!fragment.is_empty());
        assert!(ScriptFragment::new("").is_empty());
    }

    proptest! {
        #[test]
        fn only_empty_text_gets_the_reserved_hash(text in ".+") {
            prop_assert_ne!(fragment_hash(&text), EMPTY_FRAGMENT_HASH);
            prop_assert_eq!(fragment_hash(&text), ScriptFragment::new(text.clone()).hash());
        }
    }
}
