//! # Category Repository
//!
//! Categories are looked up by their unique name. Product writes and CSV
//! imports create unknown categories on the fly via [`ensure_category`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::Category;

/// Returns the id of the category named `name`, creating it if absent.
///
/// Runs on the caller's connection so it joins the caller's transaction.
pub(crate) async fn ensure_category(conn: &mut SqliteConnection, name: &str) -> DbResult<String> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM categories WHERE name = ?1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, NULL, ?3)")
        .bind(&id)
        .bind(name)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    info!(category = %name, "Category created");
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// All categories, by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description FROM categories WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Inserts a new category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already taken
    pub async fn insert(&self, name: &str, description: Option<&str>) -> DbResult<Category> {
        debug!(name = %name, "Inserting category");

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
        };

        sqlx::query("INSERT INTO categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::from(e).with_value(name))?;

        Ok(category)
    }

    /// Number of products (active or archived) filed under a category.
    pub async fn product_count(&self, category_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?1")
            .bind(category_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::DbError;

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.categories().insert("Snacks", None).await.unwrap();
        db.categories().insert("Drinks", Some("Cold")).await.unwrap();

        let names: Vec<String> = db
            .categories()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Drinks", "Snacks"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories().insert("Drinks", None).await.unwrap();

        let err = db.categories().insert("Drinks", None).await.unwrap_err();
        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "name");
                assert_eq!(value, "Drinks");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ensure_category_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let first = super::ensure_category(&mut conn, "Dairy").await.unwrap();
        let second = super::ensure_category(&mut conn, "Dairy").await.unwrap();
        drop(conn);

        assert_eq!(first, second);
        assert_eq!(db.categories().list().await.unwrap().len(), 1);
    }
}
