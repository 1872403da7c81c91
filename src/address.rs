//! Recognition of Solana token addresses inside free text.
//!
//! Matching is purely syntactic: a candidate must be 32 to 44 characters
//! long, use only the base58 alphabet and contain at least
//! [`MIN_DISTINCT_CHARS`] distinct symbols. Nothing is checked on-chain.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

pub const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
pub const MIN_LENGTH: usize = 32;
pub const MAX_LENGTH: usize = 44;
/// Rejects repeated-character runs such as `aaaa...a`.
pub const MIN_DISTINCT_CHARS: usize = 10;

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s,;:.!?]+").unwrap());
static BASE58_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[1-9A-HJ-NP-Za-km-z]+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Returns `None` unless `candidate` passes [`is_valid_address`].
    pub fn parse(candidate: &str) -> Option<Self> {
        is_valid_address(candidate).then(|| Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `DezXAZ8z...B1pPB263` style shortening for status lines.
    pub fn short(&self) -> String {
        let head: String = self.0.chars().take(8).collect();
        let tail: String = self.0.chars().skip(self.0.len().saturating_sub(8)).collect();
        format!("{head}...{tail}")
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_base58_char(ch: char) -> bool {
    matches!(ch, '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

pub fn is_valid_address(candidate: &str) -> bool {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&candidate.len()) {
        return false;
    }
    if !candidate.chars().all(is_base58_char) {
        return false;
    }
    let distinct: HashSet<char> = candidate.chars().collect();
    distinct.len() >= MIN_DISTINCT_CHARS
}

fn first_valid<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Option<Address> {
    tokens
        .into_iter()
        .map(str::trim)
        .find(|token| is_valid_address(token))
        .map(|token| Address(token.to_string()))
}

/// Finds the most literal plausible address in `text`.
///
/// Precedence: the whole trimmed input, then separator-split tokens, then
/// maximal base58 runs anywhere in the text, then tokens left after
/// stripping non-word characters.
pub fn extract(text: &str) -> Option<Address> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if is_valid_address(text) {
        return Some(Address(text.to_string()));
    }

    if let Some(found) = first_valid(SEPARATORS.split(text)) {
        return Some(found);
    }

    if let Some(found) = first_valid(BASE58_RUN.find_iter(text).map(|m| m.as_str())) {
        return Some(found);
    }

    let stripped = NON_WORD.replace_all(text, "");
    first_valid(stripped.split_whitespace())
}

/// Every distinct address in `text`, in order of first appearance.
pub fn extract_all(text: &str) -> Vec<Address> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    let split = text.split_whitespace();
    let runs = BASE58_RUN.find_iter(text).map(|m| m.as_str());
    for candidate in split.chain(runs) {
        if is_valid_address(candidate) && seen.insert(candidate.to_string()) {
            found.push(Address(candidate.to_string()));
        }
    }
    found
}

pub fn contains_address(text: &str) -> bool {
    extract(text).is_some()
}
