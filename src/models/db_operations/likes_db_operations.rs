use crate::models::db_operations::timestamp_now;
use crate::models::{LikeAction, LikeToggle};
use rusqlite::{params, Connection, Error as RusqliteError, TransactionBehavior};

/// Flips the caller's like on a post.
///
/// Runs under an IMMEDIATE transaction so toggles on the same post serialize
/// on the database write lock. The like row is the source of truth: the
/// counter only moves when a row was actually deleted or inserted, and the
/// decrement is floored at zero. Returns `None` if the post does not exist.
pub fn toggle_like(conn: &mut Connection, user_id: i64, post_id: i64) -> Result<Option<LikeToggle>, RusqliteError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        [post_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    let removed = tx.execute(
        "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
        params![user_id, post_id],
    )?;

    let action = if removed > 0 {
        tx.execute(
            "UPDATE posts SET likes_count = MAX(likes_count - 1, 0) WHERE id = ?1",
            [post_id],
        )?;
        LikeAction::Unliked
    } else {
        let inserted = tx.execute(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, post_id) DO NOTHING",
            params![user_id, post_id, timestamp_now()],
        )?;
        if inserted > 0 {
            tx.execute(
                "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
                [post_id],
            )?;
        }
        LikeAction::Liked
    };

    let likes: i64 = tx.query_row(
        "SELECT likes_count FROM posts WHERE id = ?1",
        [post_id],
        |row| row.get(0),
    )?;
    tx.commit()?;

    Ok(Some(LikeToggle {
        action,
        liked: action == LikeAction::Liked,
        likes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::posts_db_operations::{create_post, read_post};
    use crate::models::db_operations::test_connection;
    use crate::models::db_operations::users_db_operations::create_user;
    use rusqlite::OptionalExtension;

    fn has_liked(conn: &Connection, user_id: i64, post_id: i64) -> Result<bool, RusqliteError> {
        Ok(conn
            .query_row(
                "SELECT id FROM likes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }

    fn count_likes(conn: &Connection, post_id: i64) -> Result<i64, RusqliteError> {
        conn.query_row("SELECT COUNT(*) FROM likes WHERE post_id = ?1", [post_id], |row| row.get(0))
    }

    #[test]
    fn toggling_twice_restores_state() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let post = create_post(&conn, user.id, "t", "c", "x").unwrap();

        let first = toggle_like(&mut conn, user.id, post.id).unwrap().unwrap();
        assert_eq!(first.action, LikeAction::Liked);
        assert_eq!(first.likes, 1);
        assert!(has_liked(&conn, user.id, post.id).unwrap());

        let second = toggle_like(&mut conn, user.id, post.id).unwrap().unwrap();
        assert_eq!(second.action, LikeAction::Unliked);
        assert!(!second.liked);
        assert_eq!(second.likes, 0);
        assert!(!has_liked(&conn, user.id, post.id).unwrap());
    }

    #[test]
    fn counter_tracks_like_rows_across_users() {
        let mut conn = test_connection();
        let a = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let b = create_user(&mut conn, "b", "b@example.com", "pw", false, 4).unwrap();
        let post = create_post(&conn, a.id, "t", "c", "x").unwrap();

        assert_eq!(toggle_like(&mut conn, a.id, post.id).unwrap().unwrap().likes, 1);
        assert_eq!(toggle_like(&mut conn, b.id, post.id).unwrap().unwrap().likes, 2);
        assert_eq!(toggle_like(&mut conn, a.id, post.id).unwrap().unwrap().likes, 1);

        let stored = read_post(&conn, post.id).unwrap().unwrap();
        assert_eq!(stored.likes_count, count_likes(&conn, post.id).unwrap());
    }

    #[test]
    fn unlike_never_drives_counter_negative() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let post = create_post(&conn, user.id, "t", "c", "x").unwrap();
        // A like row whose counter bump was lost
        conn.execute(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
            params![user.id, post.id, timestamp_now()],
        )
        .unwrap();

        let toggle = toggle_like(&mut conn, user.id, post.id).unwrap().unwrap();
        assert_eq!(toggle.action, LikeAction::Unliked);
        assert_eq!(toggle.likes, 0);
    }

    #[test]
    fn missing_post_yields_none() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        assert!(toggle_like(&mut conn, user.id, 42).unwrap().is_none());
    }
}
