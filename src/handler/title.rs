use crate::{
    AppState,
    db::{NewTitle, TitleChanges, TitleExt, TitleFilter},
    dtos::{
        InputTitleDto, ListResponseDto, PaginationDto, SingleResponseDto, TitleQueryDto,
        UpdateTitleDto,
    },
    error::HttpError,
    middleware::{auth, read_only},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use tracing::instrument;
use validator::Validate;

/// Router for title endpoints. Reads are public; writes need an admin.
pub fn title_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        // GET / - ?category=<slug>&genre=<slug>&name=<substring>&year=<n>&page&limit
        .route("/", get(get_titles))
        .route(
            "/",
            post(create_title)
                .route_layer(middleware::from_fn(read_only))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route("/{title_id}", get(get_title))
        .route(
            "/{title_id}",
            patch(update_title)
                .delete(delete_title)
                .route_layer(middleware::from_fn(read_only))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

impl From<&TitleQueryDto> for TitleFilter {
    fn from(query: &TitleQueryDto) -> Self {
        TitleFilter {
            category: query.category.clone(),
            genre: query.genre.clone(),
            name: query.name.clone(),
            year: query.year,
        }
    }
}

#[instrument(skip(app_state))]
pub async fn get_titles(
    Query(query_params): Query<TitleQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_titles input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);
    let filter = TitleFilter::from(&query_params);

    let titles = app_state
        .db_client
        .get_titles(&filter, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting titles: {}", e);
            HttpError::from(e)
        })?;

    let total = app_state
        .db_client
        .get_title_count(&filter)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title count: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("get_titles successful");
    Ok(Json(ListResponseDto {
        status: "success".to_string(),
        data: titles,
        pagination: PaginationDto::new(page, limit, total),
    }))
}

#[instrument(skip(app_state))]
pub async fn get_title(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let title = app_state
        .db_client
        .get_title(title_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting title: {}", e);
            HttpError::from(e)
        })?
        .ok_or_else(|| HttpError::not_found("Title not found"))?;

    tracing::info!("get_title successful");
    Ok(Json(SingleResponseDto::success(title)))
}

/// Create a title; `genre` is a list of genre slugs, `category` a category slug
#[instrument(skip(app_state, body), fields(name = %body.name))]
pub async fn create_title(
    State(app_state): State<AppState>,
    Json(body): Json<InputTitleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_title input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let new_title = NewTitle {
        name: body.name,
        year: body.year,
        description: body.description.unwrap_or_default(),
        category: body.category,
        genre: body.genre,
    };

    let title = app_state
        .db_client
        .create_title(&new_title)
        .await
        .map_err(|e| {
            tracing::error!("Could not create title: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("create_title successful");
    Ok((StatusCode::CREATED, Json(SingleResponseDto::success(title))))
}

#[instrument(skip(app_state, body))]
pub async fn update_title(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateTitleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_title input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let changes = TitleChanges {
        name: body.name,
        year: body.year,
        description: body.description,
        category: body.category,
        genre: body.genre,
    };

    let title = app_state
        .db_client
        .update_title(title_id, &changes)
        .await
        .map_err(|e| {
            tracing::error!("Could not update title: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("update_title successful");
    Ok(Json(SingleResponseDto::success(title)))
}

/// Delete a title with its reviews and their comments
#[instrument(skip(app_state))]
pub async fn delete_title(
    Path(title_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_title(title_id)
        .await
        .map_err(|e| {
            tracing::error!("Could not delete title: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("delete_title successful");
    Ok(StatusCode::NO_CONTENT)
}
