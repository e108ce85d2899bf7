use crate::db::{CommentExt, ReviewExt};
use crate::dtos::CommentDto;
use crate::error::CatalogError;
use crate::models::User;
use crate::policy::{Access, Policy};
use crate::services::reviews::find_review;

/// A comment addressed through its title and review. Every level of the
/// path has to match, otherwise the comment is not found.
pub async fn find_comment<S: ReviewExt + CommentExt>(
    store: &S,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
) -> Result<CommentDto, CatalogError> {
    find_review(store, title_id, review_id).await?;

    store
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| CatalogError::not_found("Comment not found"))
}

pub async fn create_comment<S: ReviewExt + CommentExt>(
    store: &S,
    title_id: i64,
    review_id: i64,
    author: &User,
    text: &str,
) -> Result<CommentDto, CatalogError> {
    find_review(store, title_id, review_id).await?;
    Policy::OwnerOrElevated.check(Some(author), Access::Write, None)?;

    store.create_comment(review_id, author.id, text).await
}

/// Only the author, a moderator or an admin may edit.
pub async fn edit_comment<S: ReviewExt + CommentExt>(
    store: &S,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
    requester: &User,
    text: &str,
) -> Result<CommentDto, CatalogError> {
    let comment = find_comment(store, title_id, review_id, comment_id).await?;
    Policy::OwnerOrElevated.check(Some(requester), Access::Write, Some(comment.author_id))?;

    store.edit_comment(comment.id, text).await
}

pub async fn delete_comment<S: ReviewExt + CommentExt>(
    store: &S,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
    requester: &User,
) -> Result<(), CatalogError> {
    let comment = find_comment(store, title_id, review_id, comment_id).await?;
    Policy::OwnerOrElevated.check(Some(requester), Access::Write, Some(comment.author_id))?;

    store.delete_comment(comment.id).await
}
