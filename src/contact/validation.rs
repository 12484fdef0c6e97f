use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

// Loose on purpose: a local 10 or 11 digit number, no country code handling.
static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,11}$").expect("phone pattern is valid"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContactKind {
    Email,
    Phone,
}

pub fn classify_contact(value: &str) -> Option<ContactKind> {
    if EMAIL_PATTERN.is_match(value) {
        Some(ContactKind::Email)
    } else if PHONE_PATTERN.is_match(value) {
        Some(ContactKind::Phone)
    } else {
        None
    }
}

pub fn is_valid_contact(value: &str) -> bool {
    classify_contact(value).is_some()
}
