use crate::models::db_operations::timestamp_now;
use crate::models::{PublicUser, User};
use bcrypt::{hash, verify, BcryptError};
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension, Row, TransactionBehavior};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at, avatar";

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_admin: row.get(4)?,
        created_at: row.get(5)?,
        avatar: row.get(6)?,
    })
}

/// Author columns for queries joining `users u`, read back with [`author_from_row`].
pub const AUTHOR_COLUMNS: &str = "u.id, u.username, u.email, u.is_admin, u.created_at, u.avatar";

pub fn author_from_row(row: &Row, offset: usize) -> rusqlite::Result<PublicUser> {
    Ok(PublicUser {
        id: row.get(offset)?,
        username: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        is_admin: row.get(offset + 3)?,
        created_at: row.get(offset + 4)?,
        avatar: row.get(offset + 5)?,
    })
}

/// Placeholder avatar derived from the first letter of the username and the row id.
pub fn default_avatar_url(username: &str, user_id: i64) -> String {
    let initial: String = username
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "U".to_string());
    format!("https://picsum.photos/seed/{}{}/100", initial, user_id)
}

/// Inserts a user and assigns its avatar in one transaction.
pub fn create_user(
    conn: &mut Connection,
    username: &str,
    email: &str,
    password: &str,
    is_admin: bool,
    cost: u32,
) -> Result<User, RusqliteError> {
    let hashed_password = hash(password, cost).map_err(bcrypt_to_rusqlite_error)?;
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO users (username, email, password_hash, is_admin, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, email, hashed_password, is_admin, timestamp_now()],
    )?;
    let user_id = tx.last_insert_rowid();
    tx.execute(
        "UPDATE users SET avatar = ?1 WHERE id = ?2",
        params![default_avatar_url(username, user_id), user_id],
    )?;
    let user = tx.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [user_id],
        user_from_row,
    )?;
    tx.commit()?;
    Ok(user)
}

pub fn read_user_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [user_id],
        user_from_row,
    )
    .optional()
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, RusqliteError> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
        [username],
        user_from_row,
    )
    .optional()
}

pub fn read_user_by_login(conn: &Connection, username_or_email: &str) -> Result<Option<User>, RusqliteError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM users WHERE username = ?1 OR email = ?1 ORDER BY id LIMIT 1",
            USER_COLUMNS
        ),
        [username_or_email],
        user_from_row,
    )
    .optional()
}

pub fn read_all_users(conn: &Connection) -> Result<Vec<User>, RusqliteError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
    let rows = stmt.query_map([], user_from_row)?;

    let mut users = Vec::new();
    for user in rows {
        users.push(user?);
    }
    Ok(users)
}

pub fn read_admins(conn: &Connection) -> Result<Vec<User>, RusqliteError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE is_admin = 1 ORDER BY username",
        USER_COLUMNS
    ))?;
    let rows = stmt.query_map([], user_from_row)?;

    let mut users = Vec::new();
    for user in rows {
        users.push(user?);
    }
    Ok(users)
}

pub fn username_or_email_taken(conn: &Connection, username: &str, email: &str) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
        params![username, email],
        |row| row.get(0),
    )
}

/// True when some user other than `except_id` already holds `username`.
pub fn username_taken_by_other(conn: &Connection, username: &str, except_id: i64) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
        params![username, except_id],
        |row| row.get(0),
    )
}

pub fn update_profile(
    conn: &Connection,
    user_id: i64,
    username: Option<&str>,
    avatar: Option<Option<&str>>,
) -> Result<usize, RusqliteError> {
    let mut changed = 0;
    if let Some(username) = username {
        changed += conn.execute(
            "UPDATE users SET username = ?1 WHERE id = ?2",
            params![username, user_id],
        )?;
    }
    if let Some(avatar) = avatar {
        changed += conn.execute(
            "UPDATE users SET avatar = ?1 WHERE id = ?2",
            params![avatar, user_id],
        )?;
    }
    Ok(changed)
}

pub fn update_password(conn: &Connection, username: &str, new_password: &str, cost: u32) -> Result<usize, RusqliteError> {
    let hashed_password = hash(new_password, cost).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE username = ?2",
        params![hashed_password, username],
    )
}

/// Returns the user when the password matches its stored hash.
pub fn verify_credentials(conn: &Connection, username_or_email: &str, password: &str) -> Result<Option<User>, RusqliteError> {
    let user = match read_user_by_login(conn, username_or_email)? {
        Some(user) => user,
        None => return Ok(None),
    };
    if verify(password, &user.password_hash).unwrap_or(false) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

pub fn count_admins(conn: &Connection) -> Result<i64, RusqliteError> {
    conn.query_row("SELECT COUNT(*) FROM users WHERE is_admin = 1", [], |row| row.get(0))
}

#[derive(Debug, PartialEq, Eq)]
pub enum RoleChange {
    Updated(User),
    NotFound,
    LastAdmin,
}

/// Sets the admin flag. The admin count is read under the write lock so two
/// concurrent demotions cannot leave the platform without an admin.
pub fn set_admin_flag(conn: &mut Connection, user_id: i64, is_admin: bool) -> Result<RoleChange, RusqliteError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let target = match tx
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [user_id],
            user_from_row,
        )
        .optional()?
    {
        Some(user) => user,
        None => return Ok(RoleChange::NotFound),
    };

    if !is_admin && target.is_admin && count_admins(&tx)? <= 1 {
        return Ok(RoleChange::LastAdmin);
    }

    tx.execute(
        "UPDATE users SET is_admin = ?1 WHERE id = ?2",
        params![is_admin, user_id],
    )?;
    let updated = tx.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        [user_id],
        user_from_row,
    )?;
    tx.commit()?;
    Ok(RoleChange::Updated(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::{is_unique_violation, test_connection};

    #[test]
    fn create_user_assigns_deterministic_avatar() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "lisa", "lisa@example.com", "pw", false, 4).unwrap();
        assert_eq!(user.avatar.as_deref(), Some(format!("https://picsum.photos/seed/L{}/100", user.id).as_str()));
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "pw");
    }

    #[test]
    fn default_avatar_uppercases_non_ascii_initial() {
        assert_eq!(default_avatar_url("ärger", 7), "https://picsum.photos/seed/Ä7/100");
        assert_eq!(default_avatar_url("", 3), "https://picsum.photos/seed/U3/100");
    }

    #[test]
    fn duplicate_email_is_a_unique_violation() {
        let mut conn = test_connection();
        create_user(&mut conn, "a", "same@example.com", "pw", false, 4).unwrap();
        let err = create_user(&mut conn, "b", "same@example.com", "pw", false, 4).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn credentials_match_username_or_email() {
        let mut conn = test_connection();
        create_user(&mut conn, "wang", "wang@example.com", "secret", false, 4).unwrap();

        assert!(verify_credentials(&conn, "wang", "secret").unwrap().is_some());
        assert!(verify_credentials(&conn, "wang@example.com", "secret").unwrap().is_some());
        assert!(verify_credentials(&conn, "wang", "wrong").unwrap().is_none());
        assert!(verify_credentials(&conn, "nobody", "secret").unwrap().is_none());
    }

    #[test]
    fn last_admin_cannot_be_demoted() {
        let mut conn = test_connection();
        let admin = create_user(&mut conn, "root", "root@example.com", "pw", true, 4).unwrap();
        let user = create_user(&mut conn, "u", "u@example.com", "pw", false, 4).unwrap();

        assert_eq!(set_admin_flag(&mut conn, admin.id, false).unwrap(), RoleChange::LastAdmin);

        match set_admin_flag(&mut conn, user.id, true).unwrap() {
            RoleChange::Updated(u) => assert!(u.is_admin),
            other => panic!("unexpected {:?}", other),
        }
        match set_admin_flag(&mut conn, admin.id, false).unwrap() {
            RoleChange::Updated(u) => assert!(!u.is_admin),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(count_admins(&conn).unwrap(), 1);
        assert_eq!(set_admin_flag(&mut conn, 999, true).unwrap(), RoleChange::NotFound);
    }

    #[test]
    fn username_collision_ignores_self() {
        let mut conn = test_connection();
        let a = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        create_user(&mut conn, "b", "b@example.com", "pw", false, 4).unwrap();

        assert!(!username_taken_by_other(&conn, "a", a.id).unwrap());
        assert!(username_taken_by_other(&conn, "b", a.id).unwrap());
    }
}
