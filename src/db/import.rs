use std::collections::HashSet;

use sqlx::PgConnection;

use super::{CatalogTable, DBClient};
use crate::error::CatalogError;
use crate::models::{Comment, Review, Title, User};

/// Tables that imported rows may reference by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportTable {
    Categories,
    Genres,
    Users,
    Titles,
    Reviews,
}

impl ImportTable {
    pub fn table(self) -> &'static str {
        match self {
            ImportTable::Categories => "categories",
            ImportTable::Genres => "genres",
            ImportTable::Users => "users",
            ImportTable::Titles => "titles",
            ImportTable::Reviews => "reviews",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImportTable::Categories => "Category",
            ImportTable::Genres => "Genre",
            ImportTable::Users => "User",
            ImportTable::Titles => "Title",
            ImportTable::Reviews => "Review",
        }
    }
}

/// Bulk-load operations used by the CSV importer.
///
/// Rows keep the ids they carry in the file. Each call runs in one
/// transaction, skips rows whose id (or unique key) already exists and
/// returns how many rows were actually inserted. Afterwards the table's id
/// sequence is moved past the largest id so later inserts do not collide.
pub trait ImportExt {
    /// The subset of `ids` with no row in `table`, in input order, without repeats
    async fn missing_ids(&self, table: ImportTable, ids: &[i64])
    -> Result<Vec<i64>, CatalogError>;

    async fn import_catalog_entries<T: CatalogTable>(&self, rows: &[T])
    -> Result<u64, CatalogError>;

    async fn import_users(&self, rows: &[User]) -> Result<u64, CatalogError>;

    async fn import_titles(&self, rows: &[Title]) -> Result<u64, CatalogError>;

    /// `(title_id, genre_id)` pairs
    async fn import_genre_links(&self, links: &[(i64, i64)]) -> Result<u64, CatalogError>;

    async fn import_reviews(&self, rows: &[Review]) -> Result<u64, CatalogError>;

    async fn import_comments(&self, rows: &[Comment]) -> Result<u64, CatalogError>;
}

async fn sync_id_sequence(conn: &mut PgConnection, table: &str) -> Result<(), CatalogError> {
    let query = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
    );
    sqlx::query(&query).execute(conn).await?;
    Ok(())
}

impl ImportExt for DBClient {
    async fn missing_ids(
        &self,
        table: ImportTable,
        ids: &[i64],
    ) -> Result<Vec<i64>, CatalogError> {
        let query = format!("SELECT id FROM {} WHERE id = ANY($1)", table.table());
        let found: Vec<i64> = sqlx::query_scalar(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        let found: HashSet<i64> = found.into_iter().collect();
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id) && seen.insert(*id))
            .collect())
    }

    async fn import_catalog_entries<T: CatalogTable>(
        &self,
        rows: &[T],
    ) -> Result<u64, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let query = format!(
            "INSERT INTO {} (id, name, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            T::TABLE
        );

        let mut inserted = 0;
        for row in rows {
            let result = sqlx::query(&query)
                .bind(row.id())
                .bind(&row.entry().name)
                .bind(&row.entry().slug)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        sync_id_sequence(&mut tx, T::TABLE).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn import_users(&self, rows: &[User]) -> Result<u64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = 0;
        for user in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO users (id, username, email, role, bio, first_name, last_name)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.role)
            .bind(&user.bio)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        sync_id_sequence(&mut tx, "users").await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn import_titles(&self, rows: &[Title]) -> Result<u64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = 0;
        for title in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO titles (id, name, year, description, category_id)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(title.id)
            .bind(&title.name)
            .bind(title.year)
            .bind(&title.description)
            .bind(title.category_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        sync_id_sequence(&mut tx, "titles").await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn import_genre_links(&self, links: &[(i64, i64)]) -> Result<u64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = 0;
        for &(title_id, genre_id) in links {
            let result = sqlx::query(
                "INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(title_id)
            .bind(genre_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn import_reviews(&self, rows: &[Review]) -> Result<u64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = 0;
        for review in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO reviews (id, title_id, author_id, text, score, pub_date)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(review.id)
            .bind(review.title_id)
            .bind(review.post.author_id)
            .bind(&review.post.text)
            .bind(review.score)
            .bind(review.post.pub_date)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        sync_id_sequence(&mut tx, "reviews").await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn import_comments(&self, rows: &[Comment]) -> Result<u64, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let mut inserted = 0;
        for comment in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO comments (id, review_id, author_id, text, pub_date)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(comment.id)
            .bind(comment.review_id)
            .bind(comment.post.author_id)
            .bind(&comment.post.text)
            .bind(comment.post.pub_date)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        sync_id_sequence(&mut tx, "comments").await?;
        tx.commit().await?;
        Ok(inserted)
    }
}
