//! Credential rules applied at signup.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LENGTH: usize = 12;
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 50;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

pub const ERR_TOO_SHORT: &str = "Password must be at least 12 characters long";
pub const ERR_NO_UPPERCASE: &str = "Password must contain at least one uppercase letter";
pub const ERR_NO_LOWERCASE: &str = "Password must contain at least one lowercase letter";
pub const ERR_NO_DIGIT: &str = "Password must contain at least one number";
pub const ERR_NO_SPECIAL: &str = "Password must contain at least one special character";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Checks every rule and reports all failures, not just the first.
pub fn validate_password(password: &str) -> PasswordValidation {
    let mut errors = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(ERR_TOO_SHORT.to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push(ERR_NO_UPPERCASE.to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push(ERR_NO_LOWERCASE.to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(ERR_NO_DIGIT.to_string());
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        errors.push(ERR_NO_SPECIAL.to_string());
    }

    PasswordValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_username(username: &str) -> bool {
    let len = username.chars().count();
    (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len)
}
