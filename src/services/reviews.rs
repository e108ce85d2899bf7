use crate::db::ReviewExt;
use crate::dtos::ReviewDto;
use crate::error::CatalogError;
use crate::models::User;
use crate::policy::{Access, Policy};
use crate::utils::validators::check_score;

/// A review addressed through its title; a review of another title is not found.
pub async fn find_review<S: ReviewExt>(
    store: &S,
    title_id: i64,
    review_id: i64,
) -> Result<ReviewDto, CatalogError> {
    store
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| CatalogError::not_found("Review not found"))
}

/// Post `author`'s review of a title. There is at most one review per
/// (author, title); the second attempt is a `Duplicate`, also under
/// concurrent submission since the store's unique constraint decides.
pub async fn create_review<S: ReviewExt>(
    store: &S,
    title_id: i64,
    author: &User,
    text: &str,
    score: i16,
) -> Result<ReviewDto, CatalogError> {
    check_score(score)?;

    if !store.title_exists(title_id).await? {
        return Err(CatalogError::not_found("Title not found"));
    }

    store
        .create_review(title_id, author.id, text, score)
        .await
        .map_err(|e| match e {
            CatalogError::Duplicate(_) => {
                CatalogError::duplicate("You have already reviewed this title")
            }
            other => other,
        })
}

/// Partial edit by the author, a moderator or an admin; the score stays within bounds.
pub async fn update_review<S: ReviewExt>(
    store: &S,
    title_id: i64,
    review_id: i64,
    requester: &User,
    text: Option<&str>,
    score: Option<i16>,
) -> Result<ReviewDto, CatalogError> {
    let review = find_review(store, title_id, review_id).await?;
    Policy::OwnerOrElevated.check(Some(requester), Access::Write, Some(review.author_id))?;

    if let Some(score) = score {
        check_score(score)?;
    }
    store.update_review(review.id, text, score).await
}

/// Delete a review and its comments; same permissions as editing.
pub async fn delete_review<S: ReviewExt>(
    store: &S,
    title_id: i64,
    review_id: i64,
    requester: &User,
) -> Result<(), CatalogError> {
    let review = find_review(store, title_id, review_id).await?;
    Policy::OwnerOrElevated.check(Some(requester), Access::Write, Some(review.author_id))?;

    store.delete_review(review.id).await
}
