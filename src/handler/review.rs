use crate::{
    AppState,
    db::ReviewExt,
    dtos::{
        InputReviewDto, ListQueryDto, ListResponseDto, PaginationDto, SingleResponseDto,
        UpdateReviewDto,
    },
    error::HttpError,
    middleware::{JWTAuthMiddleware, auth},
    policy::{Access, Policy},
    services::reviews,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use tracing::instrument;
use validator::Validate;

/// Router for review endpoints nested under /titles/{title_id}/reviews
///
/// Reading is public. Any authenticated user may post one review per title;
/// the author, moderators and admins may edit or delete it.
pub fn review_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_reviews))
        .route(
            "/",
            post(create_review)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{review_id}", get(get_review))
        .route(
            "/{review_id}",
            patch(update_review)
                .delete(delete_review)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Paginated reviews of a title, newest first
#[instrument(skip(app_state))]
pub async fn get_reviews(
    Path(title_id): Path<i64>,
    Query(query_params): Query<ListQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_reviews input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let exists = app_state.db_client.title_exists(title_id).await.map_err(|e| {
        tracing::error!("DB error, checking title: {}", e);
        HttpError::from(e)
    })?;
    if !exists {
        return Err(HttpError::not_found("Title not found"));
    }

    let page = query_params.page();
    let limit = query_params.limit();

    let reviews = app_state
        .db_client
        .get_reviews(title_id, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting reviews: {}", e);
            HttpError::from(e)
        })?;

    let total = app_state
        .db_client
        .get_title_review_count(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting review count: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("get_reviews successful");
    Ok(Json(ListResponseDto {
        status: "success".to_string(),
        data: reviews,
        pagination: PaginationDto::new(page, limit, total),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_review(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let review = reviews::find_review(&app_state.db_client, title_id, review_id)
        .await
        .map_err(|e| {
            tracing::error!("Could not get review: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("get_review successful");
    Ok(Json(SingleResponseDto::success(review)))
}

/// Post a review; a second review of the same title by the same user is a 409
#[instrument(skip(app_state, body, jwt), fields(username = %jwt.user.username))]
pub async fn create_review(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<InputReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_review input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    Policy::OwnerOrElevated.check(Some(&jwt.user), Access::Write, None)?;

    let review = reviews::create_review(
        &app_state.db_client,
        title_id,
        &jwt.user,
        &body.text,
        body.score,
    )
    .await
    .map_err(|e| {
        tracing::error!("Could not create review: {}", e);
        HttpError::from(e)
    })?;

    tracing::info!("create_review successful");
    Ok((StatusCode::CREATED, Json(SingleResponseDto::success(review))))
}

#[instrument(skip(app_state, body, jwt), fields(username = %jwt.user.username))]
pub async fn update_review(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_review input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let updated = reviews::update_review(
        &app_state.db_client,
        title_id,
        review_id,
        &jwt.user,
        body.text.as_deref(),
        body.score,
    )
    .await
    .map_err(|e| {
        tracing::error!("Could not update review: {}", e);
        HttpError::from(e)
    })?;

    tracing::info!("update_review successful");
    Ok(Json(SingleResponseDto::success(updated)))
}

/// Delete a review together with its comments
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn delete_review(
    Path((title_id, review_id)): Path<(i64, i64)>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    reviews::delete_review(&app_state.db_client, title_id, review_id, &jwt.user)
        .await
        .map_err(|e| {
            tracing::error!("Could not delete review: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("delete_review successful");
    Ok(StatusCode::NO_CONTENT)
}
