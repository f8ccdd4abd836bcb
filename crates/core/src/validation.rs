//! Field validators shared by service inputs.

use std::borrow::Cow;
use validator::ValidationError;

/// Message attached to blank required fields.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Reject empty and whitespace-only values.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED_MESSAGE)));
    }
    Ok(())
}

/// Accept ASCII letters, digits, underscores and hyphens only.
pub fn slug(value: &str) -> Result<(), ValidationError> {
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::new("slug").with_message(Cow::Borrowed(
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        )));
    }
    Ok(())
}

/// Accept letters, digits and `@.+-_`, the username alphabet of the user directory.
pub fn username(value: &str) -> Result<(), ValidationError> {
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::new("username").with_message(Cow::Borrowed(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        )));
    }
    Ok(())
}
