//! Input validation for account administration

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// A rejected field; the message is safe to show to the administrator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Username must be between 3 and 32 characters.")]
    UsernameLength,

    #[error("Username can only contain letters, numbers, and underscores.")]
    UsernameCharacters,

    #[error("Password must be between 8 and 128 characters.")]
    PasswordLength,

    #[error("Password must contain an uppercase letter, a lowercase letter, a digit and a special character.")]
    PasswordComplexity,

    #[error("Full name is required and must be at most 100 characters.")]
    FullName,

    #[error("Invalid email format.")]
    Email,
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ValidationError::UsernameLength);
    }

    static USERNAME_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let matches = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(username));

    if !matches {
        return Err(ValidationError::UsernameCharacters);
    }
    Ok(())
}

/// Length 8 to 128 with at least one of each character class
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(ValidationError::PasswordLength);
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if has_upper && has_lower && has_digit && has_special {
        Ok(())
    } else {
        Err(ValidationError::PasswordComplexity)
    }
}

pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(ValidationError::FullName);
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 254 {
        return Err(ValidationError::Email);
    }

    static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let matches = EMAIL_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email));

    if !matches {
        return Err(ValidationError::Email);
    }
    Ok(())
}
