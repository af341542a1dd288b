use crate::models::db_operations::users_db_operations::{author_from_row, AUTHOR_COLUMNS};
use crate::models::db_operations::{contains_pattern, timestamp_now};
use crate::models::{CulturalResource, Page, ResourceChanges};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Error as RusqliteError, OptionalExtension, Row};

fn resource_columns() -> String {
    format!(
        "r.id, r.title, r.description, r.category, r.image_url, r.tags, r.created_date, r.author_id, {}",
        AUTHOR_COLUMNS
    )
}

/// Splits the stored comma-joined tag string back into a list.
pub fn split_tags(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn join_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn resource_from_row(row: &Row) -> rusqlite::Result<CulturalResource> {
    let stored_tags: String = row.get(5)?;
    Ok(CulturalResource {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        image_url: row.get(4)?,
        tags: split_tags(&stored_tags),
        created_date: row.get(6)?,
        author_id: row.get(7)?,
        author: author_from_row(row, 8)?,
    })
}

pub fn create_resource(
    conn: &Connection,
    author_id: i64,
    title: &str,
    description: &str,
    category: &str,
    image_url: Option<&str>,
    tags: &[String],
) -> Result<CulturalResource, RusqliteError> {
    conn.execute(
        "INSERT INTO cultural_resources (title, description, category, image_url, tags, created_date, author_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![title, description, category, image_url, join_tags(tags), timestamp_now(), author_id],
    )?;
    let id = conn.last_insert_rowid();
    read_resource(conn, id)?.ok_or(RusqliteError::QueryReturnedNoRows)
}

pub fn read_resource(conn: &Connection, resource_id: i64) -> Result<Option<CulturalResource>, RusqliteError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM cultural_resources r JOIN users u ON u.id = r.author_id WHERE r.id = ?1",
            resource_columns()
        ),
        [resource_id],
        resource_from_row,
    )
    .optional()
}

pub fn read_resource_owner(conn: &Connection, resource_id: i64) -> Result<Option<i64>, RusqliteError> {
    conn.query_row(
        "SELECT author_id FROM cultural_resources WHERE id = ?1",
        [resource_id],
        |row| row.get(0),
    )
    .optional()
}

/// Lists resources newest first, filtered by exact category and/or tag substring.
pub fn list_resources(
    conn: &Connection,
    category: Option<&str>,
    tag: Option<&str>,
    page: i64,
    per_page: i64,
) -> Result<Page<CulturalResource>, RusqliteError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(category) = category {
        clauses.push("r.category = ?");
        args.push(Value::Text(category.to_string()));
    }
    if let Some(tag) = tag {
        clauses.push("r.tags LIKE ? ESCAPE '\\'");
        args.push(Value::Text(contains_pattern(tag)));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM cultural_resources r {}", where_sql),
        params_from_iter(args.iter()),
        |row| row.get(0),
    )?;

    let mut page_args = args.clone();
    page_args.push(Value::Integer(per_page));
    page_args.push(Value::Integer((page - 1).saturating_mul(per_page)));

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM cultural_resources r JOIN users u ON u.id = r.author_id {}
         ORDER BY r.created_date DESC, r.id DESC LIMIT ? OFFSET ?",
        resource_columns(),
        where_sql
    ))?;
    let rows = stmt.query_map(params_from_iter(page_args.iter()), resource_from_row)?;

    let mut items = Vec::new();
    for resource in rows {
        items.push(resource?);
    }
    Ok(Page::new(items, total, page, per_page))
}

pub fn update_resource(conn: &Connection, resource_id: i64, changes: &ResourceChanges) -> Result<Option<CulturalResource>, RusqliteError> {
    let mut sets: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(title) = &changes.title {
        sets.push("title = ?");
        args.push(Value::Text(title.clone()));
    }
    if let Some(description) = &changes.description {
        sets.push("description = ?");
        args.push(Value::Text(description.clone()));
    }
    if let Some(category) = &changes.category {
        sets.push("category = ?");
        args.push(Value::Text(category.clone()));
    }
    if let Some(image_url) = &changes.image_url {
        sets.push("image_url = ?");
        args.push(image_url.clone().map(Value::Text).unwrap_or(Value::Null));
    }
    if let Some(tags) = &changes.tags {
        sets.push("tags = ?");
        args.push(Value::Text(join_tags(tags)));
    }

    if !sets.is_empty() {
        args.push(Value::Integer(resource_id));
        conn.execute(
            &format!("UPDATE cultural_resources SET {} WHERE id = ?", sets.join(", ")),
            params_from_iter(args.iter()),
        )?;
    }
    read_resource(conn, resource_id)
}

pub fn delete_resource(conn: &Connection, resource_id: i64) -> Result<usize, RusqliteError> {
    conn.execute("DELETE FROM cultural_resources WHERE id = ?1", [resource_id])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::test_connection;
    use crate::models::db_operations::users_db_operations::create_user;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tags_are_joined_for_storage_and_split_on_read() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let res = create_resource(&conn, user.id, "Opera", "Folk opera", "arts", None, &tags(&[" opera ", "", "hunan"])).unwrap();

        assert_eq!(res.tags, vec!["opera", "hunan"]);
        let stored: String = conn
            .query_row("SELECT tags FROM cultural_resources WHERE id = ?1", [res.id], |r| r.get(0))
            .unwrap();
        assert_eq!(stored, "opera,hunan");
        assert_eq!(res.author.username, "a");
    }

    #[test]
    fn list_filters_by_category_and_tag_substring() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        create_resource(&conn, user.id, "Opera", "d", "arts", None, &tags(&["folk opera", "hunan"])).unwrap();
        create_resource(&conn, user.id, "Academy", "d", "history", None, &tags(&["education"])).unwrap();
        create_resource(&conn, user.id, "Cuisine", "d", "food", None, &tags(&["hunan", "100%_spicy"])).unwrap();

        let all = list_resources(&conn, None, None, 1, 10).unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].title, "Cuisine");

        let arts = list_resources(&conn, Some("arts"), None, 1, 10).unwrap();
        assert_eq!(arts.total, 1);

        let hunan = list_resources(&conn, None, Some("hun"), 1, 10).unwrap();
        assert_eq!(hunan.total, 2);

        let both = list_resources(&conn, Some("food"), Some("hunan"), 1, 10).unwrap();
        assert_eq!(both.total, 1);

        let literal = list_resources(&conn, None, Some("0%_s"), 1, 10).unwrap();
        assert_eq!(literal.total, 1);
        let wildcard = list_resources(&conn, None, Some("%"), 1, 10).unwrap();
        assert_eq!(wildcard.total, 1);
    }

    #[test]
    fn pagination_reports_pages() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        for i in 0..5 {
            create_resource(&conn, user.id, &format!("r{}", i), "d", "c", None, &[]).unwrap();
        }
        let page = list_resources(&conn, None, None, 3, 2).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.items.len(), 1);

        let beyond = list_resources(&conn, None, None, 9, 2).unwrap();
        assert!(beyond.items.is_empty());
    }

    #[test]
    fn partial_update_leaves_other_columns() {
        let mut conn = test_connection();
        let user = create_user(&mut conn, "a", "a@example.com", "pw", false, 4).unwrap();
        let res = create_resource(&conn, user.id, "Old", "desc", "cat", Some("http://img"), &tags(&["x"])).unwrap();

        let changes = ResourceChanges {
            title: Some("New".to_string()),
            image_url: Some(None),
            ..Default::default()
        };
        let updated = update_resource(&conn, res.id, &changes).unwrap().unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.description, "desc");
        assert_eq!(updated.image_url, None);
        assert_eq!(updated.tags, vec!["x"]);

        assert_eq!(delete_resource(&conn, res.id).unwrap(), 1);
        assert!(read_resource(&conn, res.id).unwrap().is_none());
    }
}
