use serde::Serialize;
use sqlx::postgres::PgRow;

use super::{DBClient, offset};
use crate::error::CatalogError;
use crate::models::{CatalogEntry, Category, Genre};

/// A `(id, name, slug)` table addressed by slug: categories and genres.
pub trait CatalogTable:
    for<'r> sqlx::FromRow<'r, PgRow> + Serialize + Clone + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;
    /// Human readable singular, used in error messages
    const LABEL: &'static str;

    fn id(&self) -> i64;
    fn entry(&self) -> &CatalogEntry;
}

impl CatalogTable for Category {
    const TABLE: &'static str = "categories";
    const LABEL: &'static str = "Category";

    fn id(&self) -> i64 {
        self.id
    }

    fn entry(&self) -> &CatalogEntry {
        &self.entry
    }
}

impl CatalogTable for Genre {
    const TABLE: &'static str = "genres";
    const LABEL: &'static str = "Genre";

    fn id(&self) -> i64 {
        self.id
    }

    fn entry(&self) -> &CatalogEntry {
        &self.entry
    }
}

/// Catalog (category/genre) database operations trait
pub trait CatalogExt {
    /// Paginated entries ordered by name, optionally filtered by a name substring
    async fn get_entries<T: CatalogTable>(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<T>, CatalogError>;

    async fn get_entry_count<T: CatalogTable>(
        &self,
        search: Option<&str>,
    ) -> Result<i64, CatalogError>;

    /// Insert; a taken slug yields `CatalogError::Duplicate`
    async fn create_entry<T: CatalogTable>(&self, entry: &CatalogEntry)
    -> Result<T, CatalogError>;

    /// Change the display name. The slug is the lookup key and never changes.
    async fn rename_entry<T: CatalogTable>(
        &self,
        slug: &str,
        name: &str,
    ) -> Result<T, CatalogError>;

    async fn delete_entry<T: CatalogTable>(&self, slug: &str) -> Result<(), CatalogError>;
}

impl CatalogExt for DBClient {
    async fn get_entries<T: CatalogTable>(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<T>, CatalogError> {
        let query = format!(
            r#"
            SELECT id, name, slug FROM {}
            WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#,
            T::TABLE
        );

        let entries = sqlx::query_as::<_, T>(&query)
            .bind(search)
            .bind(limit)
            .bind(offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    async fn get_entry_count<T: CatalogTable>(
        &self,
        search: Option<&str>,
    ) -> Result<i64, CatalogError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')",
            T::TABLE
        );

        let count: i64 = sqlx::query_scalar(&query)
            .bind(search)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create_entry<T: CatalogTable>(
        &self,
        entry: &CatalogEntry,
    ) -> Result<T, CatalogError> {
        let query = format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
            T::TABLE
        );

        let created = sqlx::query_as::<_, T>(&query)
            .bind(&entry.name)
            .bind(&entry.slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match CatalogError::from(e) {
                CatalogError::Duplicate(_) => CatalogError::duplicate(format!(
                    "{} with slug={} already exists",
                    T::LABEL,
                    entry.slug
                )),
                other => other,
            })?;

        Ok(created)
    }

    async fn rename_entry<T: CatalogTable>(
        &self,
        slug: &str,
        name: &str,
    ) -> Result<T, CatalogError> {
        let query = format!(
            "UPDATE {} SET name = $1 WHERE slug = $2 RETURNING id, name, slug",
            T::TABLE
        );

        let updated = sqlx::query_as::<_, T>(&query)
            .bind(name)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| CatalogError::not_found(format!("{} not found", T::LABEL)))
    }

    async fn delete_entry<T: CatalogTable>(&self, slug: &str) -> Result<(), CatalogError> {
        let query = format!("DELETE FROM {} WHERE slug = $1", T::TABLE);

        let result = sqlx::query(&query).bind(slug).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found(format!("{} not found", T::LABEL)));
        }

        Ok(())
    }
}
