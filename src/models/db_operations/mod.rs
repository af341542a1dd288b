use chrono::{SecondsFormat, Utc};
use rusqlite::{ffi, Error as RusqliteError};

pub mod comments_db_operations;
pub mod likes_db_operations;
pub mod posts_db_operations;
pub mod resources_db_operations;
pub mod revocation_db_operations;
pub mod users_db_operations;

/// Fixed-width RFC 3339 timestamp so `ORDER BY created_at` sorts chronologically.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn is_unique_violation(err: &RusqliteError) -> bool {
    matches!(
        err,
        RusqliteError::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Builds a `LIKE ... ESCAPE '\'` pattern that matches `needle` as a literal substring.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
pub(crate) fn test_connection() -> rusqlite::Connection {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    crate::setup::db_setup::run_migrations(&mut conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("opera"), "%opera%");
        assert_eq!(contains_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn timestamps_are_fixed_width() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000000+00:00".len());
        assert!(ts.ends_with("+00:00"));
    }
}
