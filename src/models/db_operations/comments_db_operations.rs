use crate::models::db_operations::timestamp_now;
use crate::models::db_operations::users_db_operations::{author_from_row, AUTHOR_COLUMNS};
use crate::models::Comment;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row};

fn comment_columns() -> String {
    format!("c.id, c.content, c.created_at, c.author_id, c.post_id, {}", AUTHOR_COLUMNS)
}

fn comment_from_row(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: row.get(2)?,
        author_id: row.get(3)?,
        post_id: row.get(4)?,
        author: author_from_row(row, 5)?,
    })
}

pub fn create_comment(conn: &Connection, author_id: i64, post_id: i64, content: &str) -> Result<Comment, RusqliteError> {
    conn.execute(
        "INSERT INTO comments (content, created_at, author_id, post_id) VALUES (?1, ?2, ?3, ?4)",
        params![content, timestamp_now(), author_id, post_id],
    )?;
    let id = conn.last_insert_rowid();
    read_comment(conn, id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

pub fn read_comment(conn: &Connection, comment_id: i64) -> Result<Option<Comment>, RusqliteError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM comments c JOIN users u ON u.id = c.author_id WHERE c.id = ?1",
            comment_columns()
        ),
        [comment_id],
        comment_from_row,
    )
    .optional()
}

/// Oldest first, optionally restricted to one post.
pub fn list_comments(conn: &Connection, post_id: Option<i64>) -> Result<Vec<Comment>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comments c JOIN users u ON u.id = c.author_id
         WHERE (?1 IS NULL OR c.post_id = ?1)
         ORDER BY c.created_at, c.id",
        comment_columns()
    ))?;
    let rows = stmt.query_map([post_id], comment_from_row)?;

    let mut comments = Vec::new();
    for comment in rows {
        comments.push(comment?);
    }
    Ok(comments)
}

pub fn delete_comment(conn: &Connection, comment_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::posts_db_operations::create_post;
    use crate::models::db_operations::test_connection;
    use crate::models::db_operations::users_db_operations::create_user;

    #[test]
    fn list_filters_by_post() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let p1 = create_post(&conn, user.id, "one", "c", "x").unwrap();
        let p2 = create_post(&conn, user.id, "two", "c", "x").unwrap();
        create_comment(&conn, user.id, p1.id, "first").unwrap();
        create_comment(&conn, user.id, p1.id, "second").unwrap();
        create_comment(&conn, user.id, p2.id, "other").unwrap();

        let on_p1 = list_comments(&conn, Some(p1.id)).unwrap();
        assert_eq!(on_p1.len(), 2);
        assert_eq!(on_p1[0].content, "first");
        assert_eq!(on_p1[0].author.username, "a");
        assert_eq!(list_comments(&conn, None).unwrap().len(), 3);
    }

    #[test]
    fn comment_on_missing_post_violates_foreign_key() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        assert!(create_comment(&conn, user.id, 77, "orphan").is_err());
    }

    #[test]
    fn delete_reports_affected_rows() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let post = create_post(&conn, user.id, "t", "c", "x").unwrap();
        let comment = create_comment(&conn, user.id, post.id, "bye").unwrap();

        assert_eq!(delete_comment(&conn, comment.id).unwrap(), 1);
        assert_eq!(delete_comment(&conn, comment.id).unwrap(), 0);
    }
}
