use std::collections::HashMap;

use sqlx::PgConnection;

use super::{DBClient, offset};
use crate::dtos::TitleDto;
use crate::error::CatalogError;
use crate::models::CatalogEntry;

/// List filters; every field is optional and they combine with AND.
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    pub category: Option<String>, // category slug
    pub genre: Option<String>,    // genre slug
    pub name: Option<String>,     // case-insensitive substring
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: String,
    pub category: Option<String>,
    pub genre: Vec<String>,
}

/// Partial title update. `genre: Some(..)` replaces the whole genre set.
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub genre: Option<Vec<String>>,
}

/// Title database operations trait
pub trait TitleExt {
    async fn get_title(&self, title_id: i64) -> Result<Option<TitleDto>, CatalogError>;

    async fn get_titles(
        &self,
        filter: &TitleFilter,
        page: i64,
        limit: i64,
    ) -> Result<Vec<TitleDto>, CatalogError>;

    async fn get_title_count(&self, filter: &TitleFilter) -> Result<i64, CatalogError>;

    /// Create a title with its genre links. Unknown genre or category slugs
    /// are a validation error and nothing is written.
    async fn create_title(&self, title: &NewTitle) -> Result<TitleDto, CatalogError>;

    async fn update_title(
        &self,
        title_id: i64,
        changes: &TitleChanges,
    ) -> Result<TitleDto, CatalogError>;

    async fn delete_title(&self, title_id: i64) -> Result<(), CatalogError>;
}

#[derive(sqlx::FromRow)]
struct TitleRow {
    id: i64,
    name: String,
    year: i32,
    description: String,
    rating: Option<f64>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

#[derive(sqlx::FromRow)]
struct TitleGenreRow {
    title_id: i64,
    name: String,
    slug: String,
}

// rating is never stored: it is the mean of the title's review scores at read time
const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           (SELECT AVG(r.score)::float8 FROM reviews r WHERE r.title_id = t.id) AS rating,
           c.name AS category_name, c.slug AS category_slug
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

const TITLE_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR c.slug = $1)
      AND ($2::text IS NULL OR EXISTS (
            SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = t.id AND g.slug = $2))
      AND ($3::text IS NULL OR t.name ILIKE '%' || $3 || '%')
      AND ($4::int IS NULL OR t.year = $4)
"#;

impl DBClient {
    async fn attach_genres(&self, rows: Vec<TitleRow>) -> Result<Vec<TitleDto>, CatalogError> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let genre_rows = sqlx::query_as::<_, TitleGenreRow>(
            r#"
            SELECT tg.title_id, g.name, g.slug
            FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i64, Vec<CatalogEntry>> = HashMap::new();
        for row in genre_rows {
            genres.entry(row.title_id).or_default().push(CatalogEntry {
                name: row.name,
                slug: row.slug,
            });
        }

        let titles = rows
            .into_iter()
            .map(|row| {
                let category = match (row.category_name, row.category_slug) {
                    (Some(name), Some(slug)) => Some(CatalogEntry { name, slug }),
                    _ => None,
                };
                TitleDto {
                    id: row.id,
                    name: row.name,
                    year: row.year,
                    rating: row.rating,
                    description: row.description,
                    genre: genres.remove(&row.id).unwrap_or_default(),
                    category,
                }
            })
            .collect();

        Ok(titles)
    }
}

async fn category_id(conn: &mut PgConnection, slug: &str) -> Result<i64, CatalogError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(conn)
        .await?;

    id.ok_or_else(|| {
        CatalogError::validation(format!("Category with slug={} does not exist", slug))
    })
}

async fn genre_ids(conn: &mut PgConnection, slugs: &[String]) -> Result<Vec<i64>, CatalogError> {
    let found: Vec<(i64, String)> = sqlx::query_as("SELECT id, slug FROM genres WHERE slug = ANY($1)")
        .bind(slugs)
        .fetch_all(conn)
        .await?;

    if let Some(missing) = slugs.iter().find(|s| !found.iter().any(|(_, slug)| slug == *s)) {
        return Err(CatalogError::validation(format!(
            "Genre with slug={} does not exist",
            missing
        )));
    }

    Ok(found.into_iter().map(|(id, _)| id).collect())
}

async fn link_genres(
    conn: &mut PgConnection,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), CatalogError> {
    sqlx::query(
        r#"
        INSERT INTO title_genres (title_id, genre_id)
        SELECT $1, UNNEST($2::bigint[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(title_id)
    .bind(genre_ids)
    .execute(conn)
    .await?;

    Ok(())
}

impl TitleExt for DBClient {
    async fn get_title(&self, title_id: i64) -> Result<Option<TitleDto>, CatalogError> {
        let query = format!("{TITLE_SELECT} WHERE t.id = $1");

        let row = sqlx::query_as::<_, TitleRow>(&query)
            .bind(title_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_genres(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn get_titles(
        &self,
        filter: &TitleFilter,
        page: i64,
        limit: i64,
    ) -> Result<Vec<TitleDto>, CatalogError> {
        let query = format!("{TITLE_SELECT} {TITLE_FILTER} ORDER BY t.year DESC, t.id LIMIT $5 OFFSET $6");

        let rows = sqlx::query_as::<_, TitleRow>(&query)
            .bind(filter.category.as_deref())
            .bind(filter.genre.as_deref())
            .bind(filter.name.as_deref())
            .bind(filter.year)
            .bind(limit)
            .bind(offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        self.attach_genres(rows).await
    }

    async fn get_title_count(&self, filter: &TitleFilter) -> Result<i64, CatalogError> {
        let query = format!(
            "SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id {TITLE_FILTER}"
        );

        let count: i64 = sqlx::query_scalar(&query)
            .bind(filter.category.as_deref())
            .bind(filter.genre.as_deref())
            .bind(filter.name.as_deref())
            .bind(filter.year)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create_title(&self, title: &NewTitle) -> Result<TitleDto, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let category_id = match title.category.as_deref() {
            Some(slug) => Some(category_id(&mut tx, slug).await?),
            None => None,
        };
        let genre_ids = genre_ids(&mut tx, &title.genre).await?;

        let title_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO titles (name, year, description, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&title.name)
        .bind(title.year)
        .bind(&title.description)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        link_genres(&mut tx, title_id, &genre_ids).await?;

        tx.commit().await?;

        self.get_title(title_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Title not found"))
    }

    async fn update_title(
        &self,
        title_id: i64,
        changes: &TitleChanges,
    ) -> Result<TitleDto, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let category_id = match changes.category.as_deref() {
            Some(slug) => Some(category_id(&mut tx, slug).await?),
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE titles
            SET name = COALESCE($1, name),
                year = COALESCE($2, year),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id)
            WHERE id = $5
            "#,
        )
        .bind(changes.name.as_deref())
        .bind(changes.year)
        .bind(changes.description.as_deref())
        .bind(category_id)
        .bind(title_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found("Title not found"));
        }

        if let Some(slugs) = &changes.genre {
            let genre_ids = genre_ids(&mut tx, slugs).await?;
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(title_id)
                .execute(&mut *tx)
                .await?;
            link_genres(&mut tx, title_id, &genre_ids).await?;
        }

        tx.commit().await?;

        self.get_title(title_id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Title not found"))
    }

    async fn delete_title(&self, title_id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(title_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found("Title not found"));
        }

        Ok(())
    }
}
