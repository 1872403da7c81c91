use crate::address::{self, Address, MIN_LENGTH};

pub const GREETING_PATTERNS: &[&str] = &[
    "who are you",
    "what can you do",
    "what are you",
    "hello",
    "hi there",
    "hey there",
    "help me",
    "about you",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    TokenQuery(Address),
    Greeting,
    Chat,
}

// A word this long is probably an address that failed validation; it must
// not be answered with the canned greeting.
fn has_address_sized_word(text: &str) -> bool {
    text.split_whitespace()
        .any(|word| word.chars().count() >= MIN_LENGTH)
}

pub fn is_greeting(text: &str) -> bool {
    if has_address_sized_word(text) {
        return false;
    }
    let lower = text.to_lowercase();
    GREETING_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// An address always wins over greeting words.
pub fn classify(text: &str) -> Intent {
    if let Some(found) = address::extract(text) {
        return Intent::TokenQuery(found);
    }
    if is_greeting(text) {
        Intent::Greeting
    } else {
        Intent::Chat
    }
}
