//! Grammar checks for operator input.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PasswordError;

pub const MIN_PASSWORD_LEN: usize = 6;

// 1–63 chars, alphanumerics with interior hyphens.
static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$").expect("Invalid hostname regex")
});

// Leading letter or underscore, 3–32 chars total.
static USERNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_-]{2,31}$").expect("Invalid username regex")
});

pub fn validate_hostname(hostname: &str) -> bool {
    HOSTNAME.is_match(hostname)
}

pub fn validate_username(username: &str) -> bool {
    USERNAME.is_match(username)
}

pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    match password.chars().count() {
        0 => Err(PasswordError::Empty),
        n if n < MIN_PASSWORD_LEN => Err(PasswordError::TooShort),
        _ => Ok(()),
    }
}
