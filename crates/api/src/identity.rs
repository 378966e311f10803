//! Identity normalization.

/// Normalize an email address for use as an identity key.
///
/// Surrounding whitespace is trimmed and the domain (after the last `@`) is
/// lowercased. The local part keeps its case.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}
