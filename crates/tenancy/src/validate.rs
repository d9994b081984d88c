//! Input shape checks shared by registration and the resource services.

use workhive_core::{DomainError, DomainResult};

pub const SUBDOMAIN_MIN_LEN: usize = 3;
pub const SUBDOMAIN_MAX_LEN: usize = 63;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Lowercase alphanumerics and hyphens, starting and ending alphanumeric.
pub fn validate_subdomain(raw: &str) -> DomainResult<String> {
    let s = raw.trim().to_ascii_lowercase();
    if s.len() < SUBDOMAIN_MIN_LEN || s.len() > SUBDOMAIN_MAX_LEN {
        return Err(DomainError::validation(format!(
            "subdomain must be {SUBDOMAIN_MIN_LEN}-{SUBDOMAIN_MAX_LEN} characters"
        )));
    }
    let bytes = s.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let body_ok = bytes.iter().all(|&b| edge_ok(b) || b == b'-');
    if !body_ok || !edge_ok(bytes[0]) || !edge_ok(bytes[bytes.len() - 1]) {
        return Err(DomainError::validation(
            "subdomain may contain lowercase letters, digits and inner hyphens only",
        ));
    }
    Ok(s)
}

/// Trim and lowercase; require `local@domain.tld` with no whitespace.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(DomainError::validation("a valid email address is required"))
    }
}

pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    Ok(())
}

/// Non-blank text field, returned trimmed.
pub fn required_text(field: &str, value: &str) -> DomainResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

/// Optional free text; blank collapses to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
