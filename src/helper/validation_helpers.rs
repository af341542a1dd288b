use crate::error::AppError;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;

pub const MAX_POST_TITLE_CHARS: usize = 200;
pub const MAX_POST_CONTENT_CHARS: usize = 5000;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").unwrap());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trimmed value of a field that must be present and non-blank.
pub fn required(value: Option<&str>, message: &str) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::validation(message)),
    }
}

/// For partial updates: absent stays absent, present must not be blank.
pub fn optional_non_blank(value: Option<&str>, message: &str) -> Result<Option<String>, AppError> {
    value.map(|v| required(Some(v), message)).transpose()
}

/// Length is counted in Unicode scalar values, not bytes.
pub fn check_max_chars(value: &str, max: usize, message: &str) -> Result<(), AppError> {
    if value.chars().count() > max {
        Err(AppError::validation(message))
    } else {
        Ok(())
    }
}

pub fn check_post_title(title: &str) -> Result<(), AppError> {
    check_max_chars(title, MAX_POST_TITLE_CHARS, "title too long")
}

pub fn check_post_content(content: &str) -> Result<(), AppError> {
    check_max_chars(content, MAX_POST_CONTENT_CHARS, "content too long")
}

/// Trims tags and drops blanks. A tag may not contain the storage separator.
pub fn clean_tags(tags: &[String]) -> Result<Vec<String>, AppError> {
    let mut cleaned = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        if tag.contains(',') {
            return Err(AppError::validation("Tags may not contain ','"));
        }
        cleaned.push(tag.to_string());
    }
    Ok(cleaned)
}

/// Distinguishes an absent field from an explicit `null`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Debug, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// `(page, per_page)` with page >= 1 and per_page in 1..=100.
    pub fn clamped(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
    }

    #[test]
    fn title_limit_counts_characters() {
        assert!(check_post_title(&"a".repeat(200)).is_ok());
        assert!(check_post_title(&"a".repeat(201)).is_err());
        // 200 three-byte characters are still 200 characters.
        assert!(check_post_title(&"湘".repeat(200)).is_ok());
        assert_eq!(check_post_content(&"b".repeat(5001)).unwrap_err().to_string(), "content too long");
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(required(Some("  hi "), "x").unwrap(), "hi");
        assert!(required(Some("   "), "x").is_err());
        assert!(required(None, "x").is_err());
        assert_eq!(optional_non_blank(None, "x").unwrap(), None);
        assert!(optional_non_blank(Some(""), "x").is_err());
    }

    #[test]
    fn tags_are_cleaned() {
        let tags = vec![" opera ".to_string(), "".to_string(), "embroidery".to_string()];
        assert_eq!(clean_tags(&tags).unwrap(), vec!["opera", "embroidery"]);
        assert!(clean_tags(&["a,b".to_string()]).is_err());
    }

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(PageQuery::default().clamped(), (1, 10));
        let q = PageQuery { page: Some(-3), per_page: Some(1000) };
        assert_eq!(q.clamped(), (1, 100));
        let q = PageQuery { page: Some(4), per_page: Some(0) };
        assert_eq!(q.clamped(), (4, 1));
    }
}
