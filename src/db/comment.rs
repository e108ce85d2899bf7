use super::{DBClient, offset};
use crate::dtos::CommentDto;
use crate::error::CatalogError;

/// Comment database operations trait
pub trait CommentExt {
    /// Paginated comments on a review, newest first
    async fn get_comments(
        &self,
        review_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<CommentDto>, CatalogError>;

    async fn get_review_comment_count(&self, review_id: i64) -> Result<i64, CatalogError>;

    async fn get_comment(
        &self,
        review_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentDto>, CatalogError>;

    async fn create_comment(
        &self,
        review_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentDto, CatalogError>;

    async fn edit_comment(&self, comment_id: i64, text: &str) -> Result<CommentDto, CatalogError>;

    async fn delete_comment(&self, comment_id: i64) -> Result<(), CatalogError>;
}

impl CommentExt for DBClient {
    async fn get_comments(
        &self,
        review_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<CommentDto>, CatalogError> {
        let comments = sqlx::query_as::<_, CommentDto>(
            r#"
            SELECT c.id, c.review_id AS review, c.text, u.username AS author, c.author_id,
                   c.pub_date
            FROM comments c
            INNER JOIN users u ON c.author_id = u.id
            WHERE c.review_id = $1
            ORDER BY c.pub_date DESC, c.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(review_id)
        .bind(limit)
        .bind(offset(page, limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn get_review_comment_count(&self, review_id: i64) -> Result<i64, CatalogError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn get_comment(
        &self,
        review_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentDto>, CatalogError> {
        let comment = sqlx::query_as::<_, CommentDto>(
            r#"
            SELECT c.id, c.review_id AS review, c.text, u.username AS author, c.author_id,
                   c.pub_date
            FROM comments c
            INNER JOIN users u ON c.author_id = u.id
            WHERE c.id = $1 AND c.review_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn create_comment(
        &self,
        review_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentDto, CatalogError> {
        // Use CTE to insert and return comment with username
        let comment = sqlx::query_as::<_, CommentDto>(
            r#"
            WITH new_comment AS (
                INSERT INTO comments (review_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT nc.id, nc.review_id AS review, nc.text, u.username AS author, nc.author_id,
                   nc.pub_date
            FROM new_comment nc
            JOIN users u ON nc.author_id = u.id
            "#,
        )
        .bind(review_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn edit_comment(&self, comment_id: i64, text: &str) -> Result<CommentDto, CatalogError> {
        let comment = sqlx::query_as::<_, CommentDto>(
            r#"
            WITH updated_comment AS (
                UPDATE comments SET text = $1 WHERE id = $2
                RETURNING *
            )
            SELECT uc.id, uc.review_id AS review, uc.text, u.username AS author, uc.author_id,
                   uc.pub_date
            FROM updated_comment uc
            JOIN users u ON uc.author_id = u.id
            "#,
        )
        .bind(text)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;

        comment.ok_or_else(|| CatalogError::not_found("Comment not found"))
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        // Return NotFound if the comment doesn't exist
        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found("Comment not found"));
        }

        Ok(())
    }
}
