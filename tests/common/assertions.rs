//! Common assertion helpers for command output validation

#![allow(dead_code)]

use predicates::prelude::*;

/// Predicate for the setup error printed when no credentials resolve
pub fn invalid_credentials() -> impl Predicate<str> {
    predicates::str::contains("Invalid credentials")
}

/// Predicate for configuration errors
pub fn invalid_configuration() -> impl Predicate<str> {
    predicates::str::contains("Invalid configuration")
}

/// Predicate for a `cache stats` line
pub fn has_stat(name: &str, value: usize) -> impl Predicate<str> {
    predicates::str::is_match(format!(r"{name}\s+{value}")).expect("valid regex")
}
