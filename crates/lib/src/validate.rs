//! Validation of names and free text.
//!
//! Each check returns the reason a value was rejected so callers can wrap it
//! in their own error variant.

/// Validate a user or group name.
///
/// Names are 1 to `max_len` characters from `[A-Za-z0-9_.-]` and may not
/// start with `-` (they are passed on command lines).
pub fn check_name(name: &str, max_len: usize) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if name.chars().count() > max_len {
        return Err(format!("name is longer than {max_len} characters"));
    }
    if name.starts_with('-') {
        return Err("name may not start with '-'".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(format!("name contains invalid character {c:?}"));
    }
    Ok(())
}

/// Validate a tagline, comment or description.
pub fn check_text(text: &str, max_len: usize) -> Result<(), String> {
    if text.chars().count() > max_len {
        return Err(format!("text is longer than {max_len} characters"));
    }
    if text.chars().any(char::is_control) {
        return Err("text contains control characters".to_string());
    }
    Ok(())
}

/// Validate a home directory: an absolute path without `..` components.
pub fn check_home_dir(path: &str, max_len: usize) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err("path is not absolute".to_string());
    }
    if path.len() > max_len {
        return Err(format!("path is longer than {max_len} bytes"));
    }
    if path.chars().any(char::is_control) {
        return Err("path contains control characters".to_string());
    }
    if path.split('/').any(|component| component == "..") {
        return Err("path contains '..'".to_string());
    }
    Ok(())
}
