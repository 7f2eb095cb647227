//! Input validation helpers
//!
//! Services collect problems per field into [`FieldErrors`]; the API layer
//! renders them as `VALIDATION_ERROR` details.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to list of messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a single failing field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Trimmed text between 1 and `max` characters
    pub fn require_text(&mut self, field: &str, value: &str, max: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "must not be empty");
        } else if trimmed.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
        }
    }

    /// Optional text no longer than `max` characters
    pub fn max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.add(field, "must be a valid email address");
        }
    }

    /// Absolute http(s) URL or a path under `/uploads/`
    pub fn url(&mut self, field: &str, value: &str) {
        if !is_valid_url(value) {
            self.add(field, "must be an http(s) URL");
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<i64>) {
        if matches!(value, Some(v) if v < 0) {
            self.add(field, "must not be negative");
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{} {}", field, messages.join(", ")))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.len() > 255 || value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn is_valid_url(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    if let Some(path) = value.strip_prefix("/uploads/") {
        return !path.is_empty();
    }
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

/// URL-safe slug from a display name
///
/// Lowercase ASCII letters and digits separated by single hyphens, at most
/// 60 characters. Falls back to `artist` when nothing usable remains.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
        if slug.len() >= 60 {
            break;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "artist".to_string()
    } else {
        slug
    }
}
