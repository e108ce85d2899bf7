use super::{DBClient, offset};
use crate::dtos::ReviewDto;
use crate::error::CatalogError;

/// Review database operations trait
pub trait ReviewExt {
    async fn title_exists(&self, title_id: i64) -> Result<bool, CatalogError>;

    /// Paginated reviews of a title, newest first
    async fn get_reviews(
        &self,
        title_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ReviewDto>, CatalogError>;

    async fn get_title_review_count(&self, title_id: i64) -> Result<i64, CatalogError>;

    /// A review is only addressable through the title it belongs to
    async fn get_review(
        &self,
        title_id: i64,
        review_id: i64,
    ) -> Result<Option<ReviewDto>, CatalogError>;

    /// Insert a review. A second review by the same author on the same title
    /// violates `unique_author_title_review` and yields `CatalogError::Duplicate`.
    async fn create_review(
        &self,
        title_id: i64,
        author_id: i64,
        text: &str,
        score: i16,
    ) -> Result<ReviewDto, CatalogError>;

    async fn update_review(
        &self,
        review_id: i64,
        text: Option<&str>,
        score: Option<i16>,
    ) -> Result<ReviewDto, CatalogError>;

    async fn delete_review(&self, review_id: i64) -> Result<(), CatalogError>;
}

impl ReviewExt for DBClient {
    async fn title_exists(&self, title_id: i64) -> Result<bool, CatalogError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = $1)")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn get_reviews(
        &self,
        title_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ReviewDto>, CatalogError> {
        let reviews = sqlx::query_as::<_, ReviewDto>(
            r#"
            SELECT r.id, r.title_id AS title, r.text, u.username AS author, r.author_id,
                   r.score, r.pub_date
            FROM reviews r
            INNER JOIN users u ON r.author_id = u.id
            WHERE r.title_id = $1
            ORDER BY r.pub_date DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(title_id)
        .bind(limit)
        .bind(offset(page, limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn get_title_review_count(&self, title_id: i64) -> Result<i64, CatalogError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn get_review(
        &self,
        title_id: i64,
        review_id: i64,
    ) -> Result<Option<ReviewDto>, CatalogError> {
        let review = sqlx::query_as::<_, ReviewDto>(
            r#"
            SELECT r.id, r.title_id AS title, r.text, u.username AS author, r.author_id,
                   r.score, r.pub_date
            FROM reviews r
            INNER JOIN users u ON r.author_id = u.id
            WHERE r.id = $1 AND r.title_id = $2
            "#,
        )
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn create_review(
        &self,
        title_id: i64,
        author_id: i64,
        text: &str,
        score: i16,
    ) -> Result<ReviewDto, CatalogError> {
        // Use CTE to insert and return the review with the author's username
        let review = sqlx::query_as::<_, ReviewDto>(
            r#"
            WITH new_review AS (
                INSERT INTO reviews (title_id, author_id, text, score)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            )
            SELECT nr.id, nr.title_id AS title, nr.text, u.username AS author, nr.author_id,
                   nr.score, nr.pub_date
            FROM new_review nr
            JOIN users u ON nr.author_id = u.id
            "#,
        )
        .bind(title_id)
        .bind(author_id)
        .bind(text)
        .bind(score)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: i64,
        text: Option<&str>,
        score: Option<i16>,
    ) -> Result<ReviewDto, CatalogError> {
        let review = sqlx::query_as::<_, ReviewDto>(
            r#"
            WITH updated_review AS (
                UPDATE reviews
                SET text = COALESCE($1, text), score = COALESCE($2, score)
                WHERE id = $3
                RETURNING *
            )
            SELECT ur.id, ur.title_id AS title, ur.text, u.username AS author, ur.author_id,
                   ur.score, ur.pub_date
            FROM updated_review ur
            JOIN users u ON ur.author_id = u.id
            "#,
        )
        .bind(text)
        .bind(score)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        review.ok_or_else(|| CatalogError::not_found("Review not found"))
    }

    async fn delete_review(&self, review_id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found("Review not found"));
        }

        Ok(())
    }
}
