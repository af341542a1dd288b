use crate::models::db_operations::timestamp_now;
use crate::models::db_operations::users_db_operations::{author_from_row, AUTHOR_COLUMNS};
use crate::models::{Page, Post, PostChanges};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Error as RusqliteError, OptionalExtension, Row};

fn post_columns() -> String {
    format!(
        "p.id, p.title, p.content, p.category, p.likes_count, p.views,
         (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
         p.created_at, p.author_id, {}",
        AUTHOR_COLUMNS
    )
}

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        likes_count: row.get(4)?,
        views: row.get(5)?,
        comments_count: row.get(6)?,
        created_at: row.get(7)?,
        author_id: row.get(8)?,
        author: author_from_row(row, 9)?,
    })
}

pub fn create_post(
    conn: &Connection,
    author_id: i64,
    title: &str,
    content: &str,
    category: &str,
) -> Result<Post, RusqliteError> {
    conn.execute(
        "INSERT INTO posts (title, content, category, created_at, author_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![title, content, category, timestamp_now(), author_id],
    )?;
    let id = conn.last_insert_rowid();
    read_post(conn, id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

pub fn read_post(conn: &Connection, post_id: i64) -> Result<Option<Post>, RusqliteError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = ?1",
            post_columns()
        ),
        [post_id],
        post_from_row,
    )
    .optional()
}

pub fn read_post_owner(conn: &Connection, post_id: i64) -> Result<Option<i64>, RusqliteError> {
    conn.query_row("SELECT author_id FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
        .optional()
}

pub fn post_exists(conn: &Connection, post_id: i64) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        [post_id],
        |row| row.get(0),
    )
}

/// Newest first.
pub fn list_posts(conn: &Connection, page: i64, per_page: i64) -> Result<Page<Post>, RusqliteError> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id
         ORDER BY p.created_at DESC, p.id DESC LIMIT ?1 OFFSET ?2",
        post_columns()
    ))?;
    let rows = stmt.query_map(params![per_page, (page - 1).saturating_mul(per_page)], post_from_row)?;

    let mut items = Vec::new();
    for post in rows {
        items.push(post?);
    }
    Ok(Page::new(items, total, page, per_page))
}

/// Single-statement increment; concurrent readers never lose a view.
pub fn increment_views(conn: &Connection, post_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("UPDATE posts SET views = views + 1 WHERE id = ?1", [post_id])
}

pub fn update_post(conn: &Connection, post_id: i64, changes: &PostChanges) -> Result<Option<Post>, RusqliteError> {
    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(title) = &changes.title {
        sets.push("title = ?");
        args.push(Value::Text(title.clone()));
    }
    if let Some(content) = &changes.content {
        sets.push("content = ?");
        args.push(Value::Text(content.clone()));
    }
    if let Some(category) = &changes.category {
        sets.push("category = ?");
        args.push(Value::Text(category.clone()));
    }

    if !sets.is_empty() {
        args.push(Value::Integer(post_id));
        conn.execute(
            &format!("UPDATE posts SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(args.iter()),
        )?;
    }
    read_post(conn, post_id)
}

/// Removes the post's comments and likes before the post itself, all in one transaction.
pub fn delete_post(conn: &mut Connection, post_id: i64) -> Result<usize, RusqliteError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM comments WHERE post_id = ?1", [post_id])?;
    tx.execute("DELETE FROM likes WHERE post_id = ?1", [post_id])?;
    let deleted = tx.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
    tx.commit()?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::test_connection;
    use crate::models::db_operations::users_db_operations::create_user;
    use crate::models::DEFAULT_POST_CATEGORY;

    #[test]
    fn list_is_newest_first_with_comment_counts() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let first = create_post(&conn, user.id, "first", "c", DEFAULT_POST_CATEGORY).unwrap();
        create_post(&conn, user.id, "second", "c", "news").unwrap();
        conn.execute(
            "INSERT INTO comments (content, created_at, author_id, post_id) VALUES ('hi', ?1, ?2, ?3)",
            params![timestamp_now(), user.id, first.id],
        )
        .unwrap();

        let page = list_posts(&conn, 1, 10).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "second");
        assert_eq!(page.items[1].comments_count, 1);
        assert_eq!(page.items[1].category, DEFAULT_POST_CATEGORY);
    }

    #[test]
    fn views_increment_by_one() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let post = create_post(&conn, user.id, "t", "c", "x").unwrap();

        increment_views(&conn, post.id).unwrap();
        increment_views(&conn, post.id).unwrap();
        assert_eq!(read_post(&conn, post.id).unwrap().unwrap().views, 2);
        assert_eq!(increment_views(&conn, 404).unwrap(), 0);
    }

    #[test]
    fn delete_removes_comments_and_likes() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let post = create_post(&conn, user.id, "t", "c", "x").unwrap();
        conn.execute(
            "INSERT INTO comments (content, created_at, author_id, post_id) VALUES ('hi', ?1, ?2, ?3)",
            params![timestamp_now(), user.id, post.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
            params![user.id, post.id, timestamp_now()],
        )
        .unwrap();

        assert_eq!(delete_post(&mut conn, post.id).unwrap(), 1);
        let comments: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0)).unwrap();
        let likes: i64 = conn.query_row("SELECT COUNT(*) FROM likes", [], |r| r.get(0)).unwrap();
        assert_eq!((comments, likes), (0, 0));
        assert!(!post_exists(&conn, post.id).unwrap());
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let post = create_post(&conn, user.id, "t", "c", "x").unwrap();

        let changes = PostChanges { content: Some("new body".to_string()), ..Default::default() };
        let updated = update_post(&conn, post.id, &changes).unwrap().unwrap();
        assert_eq!(updated.title, "t");
        assert_eq!(updated.content, "new body");
        assert!(update_post(&conn, 404, &PostChanges::default()).unwrap().is_none());
    }
}
