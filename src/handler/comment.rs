use crate::AppState;
use crate::db::CommentExt;
use crate::dtos::{InputCommentDto, ListQueryDto, ListResponseDto, PaginationDto, SingleResponseDto};
use crate::error::HttpError;
use crate::middleware::{JWTAuthMiddleware, auth};
use crate::services::{comments, reviews};
use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use tracing::instrument;
use validator::Validate;

/// Router for comment endpoints nested under
/// /titles/{title_id}/reviews/{review_id}/comments
pub fn comment_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        // GET / - Get comments on a review (public)
        .route("/", get(get_comments))
        // POST / - Create comment (requires auth)
        .route(
            "/",
            post(create_comment)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{comment_id}", get(get_comment))
        // PATCH/DELETE /{comment_id} - author, moderator or admin
        .route(
            "/{comment_id}",
            patch(edit_comment)
                .delete(delete_comment)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Get paginated comments on a review, newest first
#[instrument(skip(app_state))]
pub async fn get_comments(
    Query(params): Query<ListQueryDto>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid get_comments input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    reviews::find_review(&app_state.db_client, title_id, review_id)
        .await
        .map_err(|e| {
            tracing::error!("Could not get review: {}", e);
            HttpError::from(e)
        })?;

    let page = params.page();
    let limit = params.limit();

    let comments = app_state
        .db_client
        .get_comments(review_id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting comments: {}", e);
            HttpError::from(e)
        })?;

    let total = app_state
        .db_client
        .get_review_comment_count(review_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review comment count: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("get_comments successful");
    Ok(Json(ListResponseDto {
        status: "success".to_string(),
        data: comments,
        pagination: PaginationDto::new(page, limit, total),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_comment(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let comment = comments::find_comment(&app_state.db_client, title_id, review_id, comment_id)
        .await
        .map_err(|e| {
            tracing::error!("Could not get comment: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("get_comment successful");
    Ok(Json(SingleResponseDto::success(comment)))
}

/// Create comment on a review
///
/// Request body: { text }
/// Returns 201 Created with the new comment.
#[instrument(skip(app_state, body, jwt), fields(username = %jwt.user.username))]
pub async fn create_comment(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<InputCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    // Validate comment text (1-1000 characters)
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let comment = comments::create_comment(
        &app_state.db_client,
        title_id,
        review_id,
        &jwt.user,
        &body.text,
    )
    .await
    .map_err(|e| {
        tracing::error!("Could not create comment: {}", e);
        HttpError::from(e)
    })?;

    tracing::info!("create_comment successful");
    Ok((StatusCode::CREATED, Json(SingleResponseDto::success(comment))))
}

/// Edit existing comment
///
/// Request body: { text }
#[instrument(skip(app_state, body, jwt), fields(username = %jwt.user.username))]
pub async fn edit_comment(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<InputCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid edit_comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let comment = comments::edit_comment(
        &app_state.db_client,
        title_id,
        review_id,
        comment_id,
        &jwt.user,
        &body.text,
    )
    .await
    .map_err(|e| {
        tracing::error!("Could not edit comment: {}", e);
        HttpError::from(e)
    })?;

    tracing::info!("edit_comment successful");
    Ok(Json(SingleResponseDto::success(comment)))
}

/// Delete comment
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
async fn delete_comment(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    comments::delete_comment(&app_state.db_client, title_id, review_id, comment_id, &jwt.user)
        .await
        .map_err(|e| {
            tracing::error!("Could not delete comment: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("delete_comment successful");
    Ok(StatusCode::NO_CONTENT)
}
