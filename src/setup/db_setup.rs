use bcrypt::hash;
use crate::models::db_operations::timestamp_now;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Migration {version} ('{name}') is recorded but unknown to this build")]
    UnknownMigration { version: i64, name: String },
}

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// The ordered schema history. Append only; never edit an applied entry.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_core_tables",
        sql: "
            CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                avatar TEXT
            );
            CREATE TABLE cultural_resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                image_url TEXT,
                tags TEXT NOT NULL DEFAULT '',
                created_date TEXT NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id)
            );
            CREATE TABLE posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id),
                likes_count INTEGER NOT NULL DEFAULT 0 CHECK (likes_count >= 0)
            );
            CREATE TABLE comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id),
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_cultural_resources_category ON cultural_resources(category);
            CREATE INDEX idx_posts_created_at ON posts(created_at);
            CREATE INDEX idx_comments_post_id ON comments(post_id);
        ",
    },
    Migration {
        version: 2,
        name: "add_post_views",
        sql: "ALTER TABLE posts ADD COLUMN views INTEGER NOT NULL DEFAULT 0;",
    },
    Migration {
        version: 3,
        name: "add_post_category",
        sql: "ALTER TABLE posts ADD COLUMN category TEXT NOT NULL DEFAULT 'general discussion';",
    },
    Migration {
        version: 4,
        name: "create_likes",
        sql: "
            CREATE TABLE likes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                CONSTRAINT unique_user_post_like UNIQUE (user_id, post_id)
            );
            CREATE INDEX idx_likes_post_id ON likes(post_id);
        ",
    },
];

fn ensure_history_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Versions already recorded in `schema_migrations`, ascending.
pub fn applied_versions(conn: &Connection) -> Result<Vec<(i64, String)>, SetupError> {
    ensure_history_table(conn)?;
    let mut stmt = conn.prepare("SELECT version, name FROM schema_migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut applied = Vec::new();
    for row in rows {
        let (version, name): (i64, String) = row?;
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            return Err(SetupError::UnknownMigration { version, name });
        }
        applied.push((version, name));
    }
    Ok(applied)
}

pub fn pending_migrations(conn: &Connection) -> Result<Vec<&'static Migration>, SetupError> {
    let applied = applied_versions(conn)?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.iter().any(|(v, _)| *v == m.version))
        .collect())
}

/// Applies every pending migration in order, each in its own transaction.
/// Returns the number of migrations applied.
pub fn run_migrations(conn: &mut Connection) -> Result<usize, SetupError> {
    let pending = pending_migrations(conn)?;
    for migration in &pending {
        let tx = conn.transaction()?;
        log::info!("Applying migration {} ({})", migration.version, migration.name);
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, timestamp_now()],
        )?;
        tx.commit()?;
    }
    Ok(pending.len())
}

struct SampleResource {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    tags: &'static [&'static str],
}

const SAMPLE_USERS: &[(&str, &str, &str)] = &[
    ("user1", "user1@example.com", "password1"),
    ("user2", "user2@example.com", "password2"),
    ("huxiang_fan", "fan@example.com", "huxiang123"),
];

const SAMPLE_RESOURCES: &[SampleResource] = &[
    SampleResource {
        title: "Hunan Flower-Drum Opera",
        description: "A regional opera of Hunan that grew out of folk song and dance, known for its rustic flavour.",
        category: "traditional arts",
        tags: &["opera", "hunan", "folk art"],
    },
    SampleResource {
        title: "Yuelu Academy",
        description: "Founded at the foot of Mount Yuelu in Changsha, one of the four great academies of ancient China.",
        category: "history",
        tags: &["academy", "education", "architecture"],
    },
    SampleResource {
        title: "Xiang Cuisine",
        description: "One of the eight great culinary traditions of China, famous for its bold, spicy flavours.",
        category: "food culture",
        tags: &["food", "hunan", "cooking"],
    },
];

const SAMPLE_POSTS: &[(&str, &str)] = &[
    (
        "What Huxiang culture means to me",
        "Huxiang culture has deep historical roots and has shaped generations of thinkers and reformers.",
    ),
    (
        "A visit to Yuelu Academy",
        "Spent last weekend at Yuelu Academy. The atmosphere of a thousand-year-old school is something else.",
    ),
];

fn find_user_id(tx: &Transaction, username: &str) -> rusqlite::Result<Option<i64>> {
    tx.query_row("SELECT id FROM users WHERE username = ?1", [username], |row| row.get(0))
        .optional()
}

fn insert_seed_user(
    tx: &Transaction,
    username: &str,
    email: &str,
    password: &str,
    is_admin: bool,
    cost: u32,
) -> Result<i64, SetupError> {
    if let Some(id) = find_user_id(tx, username)? {
        return Ok(id);
    }
    let hashed = hash(password, cost)?;
    tx.execute(
        "INSERT INTO users (username, email, password_hash, is_admin, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, email, hashed, is_admin, timestamp_now()],
    )?;
    println!("  > Created user '{}'", username);
    Ok(tx.last_insert_rowid())
}

/// Inserts the sample admin, users, resources and posts. Rows that already
/// exist (matched by username or title) are left alone.
pub fn seed_sample_data(conn: &mut Connection, cost: u32) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    let admin_id = insert_seed_user(&tx, "admin", "admin@example.com", "admin123", true, cost)?;
    let mut first_user_id = None;
    for (username, email, password) in SAMPLE_USERS {
        let id = insert_seed_user(&tx, username, email, password, false, cost)?;
        first_user_id.get_or_insert(id);
    }
    let sample_user_id = first_user_id.unwrap_or(admin_id);

    for (idx, resource) in SAMPLE_RESOURCES.iter().enumerate() {
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM cultural_resources WHERE title = ?1)",
            [resource.title],
            |row| row.get(0),
        )?;
        if exists {
            continue;
        }
        let author_id = if idx % 2 == 0 { admin_id } else { sample_user_id };
        tx.execute(
            "INSERT INTO cultural_resources (title, description, category, tags, created_date, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                resource.title,
                resource.description,
                resource.category,
                resource.tags.join(","),
                timestamp_now(),
                author_id
            ],
        )?;
        println!("  > Created resource '{}'", resource.title);
    }

    for (title, content) in SAMPLE_POSTS {
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE title = ?1)",
            [title],
            |row| row.get(0),
        )?;
        if exists {
            continue;
        }
        tx.execute(
            "INSERT INTO posts (title, content, created_at, author_id) VALUES (?1, ?2, ?3, ?4)",
            params![title, content, timestamp_now(), sample_user_id],
        )?;
        println!("  > Created post '{}'", title);
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_once_in_order() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&mut conn).unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&mut conn).unwrap(), 0);

        let applied = applied_versions(&conn).unwrap();
        let versions: Vec<i64> = applied.iter().map(|(v, _)| *v).collect();
        assert_eq!(versions, vec![1, 2, 3, 4]);
        assert!(pending_migrations(&conn).unwrap().is_empty());
    }

    #[test]
    fn migrated_posts_have_views_and_category_defaults() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES ('a', 'a@b.cd', 'x', '2024-01-01T00:00:00.000000+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO posts (title, content, created_at, author_id) VALUES ('t', 'c', '2024-01-01T00:00:00.000000+00:00', 1)",
            [],
        )
        .unwrap();

        let (views, category): (i64, String) = conn
            .query_row("SELECT views, category FROM posts WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(views, 0);
        assert_eq!(category, "general discussion");
    }

    #[test]
    fn unknown_recorded_version_is_reported() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (99, 'from_the_future', 'now')",
            [],
        )
        .unwrap();

        match pending_migrations(&conn) {
            Err(SetupError::UnknownMigration { version, .. }) => assert_eq!(version, 99),
            other => panic!("expected UnknownMigration, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn seeding_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        seed_sample_data(&mut conn, 4).unwrap();
        seed_sample_data(&mut conn, 4).unwrap();

        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).unwrap();
        let admins: i64 = conn
            .query_row("SELECT COUNT(*) FROM users WHERE is_admin = 1", [], |r| r.get(0))
            .unwrap();
        let resources: i64 = conn
            .query_row("SELECT COUNT(*) FROM cultural_resources", [], |r| r.get(0))
            .unwrap();
        let posts: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0)).unwrap();
        assert_eq!(users, 4);
        assert_eq!(admins, 1);
        assert_eq!(resources, 3);
        assert_eq!(posts, 2);
    }
}
