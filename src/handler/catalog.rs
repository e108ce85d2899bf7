use crate::{
    AppState,
    db::{CatalogExt, CatalogTable},
    dtos::{
        InputCatalogEntryDto, ListQueryDto, ListResponseDto, PaginationDto, SingleResponseDto,
        UpdateCatalogEntryDto,
    },
    error::HttpError,
    middleware::{auth, read_only},
    models::CatalogEntry,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use validator::Validate;

/// Router for a slug-addressed catalog table, mounted at `/categories` and
/// `/genres`. Reads are public; writes need an admin.
pub fn catalog_handler<T: CatalogTable>(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(get_entries::<T>))
        .route(
            "/",
            post(create_entry::<T>)
                .route_layer(middleware::from_fn(read_only))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{slug}",
            patch(rename_entry::<T>)
                .delete(delete_entry::<T>)
                .route_layer(middleware::from_fn(read_only))
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Paginated entries, `?search=` matches names case-insensitively
pub async fn get_entries<T: CatalogTable>(
    Query(query_params): Query<ListQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid {} list input: {}", T::LABEL, e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page();
    let limit = query_params.limit();
    let search = query_params.search.as_deref();

    let entries = app_state
        .db_client
        .get_entries::<T>(search, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing {}: {}", T::TABLE, e);
            HttpError::from(e)
        })?;

    let total = app_state
        .db_client
        .get_entry_count::<T>(search)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting {}: {}", T::TABLE, e);
            HttpError::from(e)
        })?;

    tracing::info!(table = T::TABLE, "list successful");
    Ok(Json(ListResponseDto {
        status: "success".to_string(),
        data: entries,
        pagination: PaginationDto::new(page, limit, total),
    }))
}

/// Create an entry. A taken slug is a 409.
pub async fn create_entry<T: CatalogTable>(
    State(app_state): State<AppState>,
    Json(body): Json<InputCatalogEntryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid {} input: {}", T::LABEL, e);
        HttpError::bad_request(e.to_string())
    })?;

    let entry = CatalogEntry {
        name: body.name,
        slug: body.slug,
    };

    let created = app_state
        .db_client
        .create_entry::<T>(&entry)
        .await
        .map_err(|e| {
            tracing::error!("Could not create {} {}: {}", T::LABEL, entry.slug, e);
            HttpError::from(e)
        })?;

    tracing::info!(table = T::TABLE, slug = %entry.slug, "create successful");
    Ok((StatusCode::CREATED, Json(SingleResponseDto::success(created))))
}

/// Rename an entry; its slug stays the same.
pub async fn rename_entry<T: CatalogTable>(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateCatalogEntryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid {} input: {}", T::LABEL, e);
        HttpError::bad_request(e.to_string())
    })?;

    let updated = app_state
        .db_client
        .rename_entry::<T>(&slug, &body.name)
        .await
        .map_err(|e| {
            tracing::error!("Could not rename {} {}: {}", T::LABEL, slug, e);
            HttpError::from(e)
        })?;

    tracing::info!(table = T::TABLE, slug = %slug, "rename successful");
    Ok(Json(SingleResponseDto::success(updated)))
}

/// Delete by slug. Titles in a deleted category keep existing without one;
/// deleted genres drop out of their titles' genre lists.
pub async fn delete_entry<T: CatalogTable>(
    Path(slug): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_entry::<T>(&slug)
        .await
        .map_err(|e| {
            tracing::error!("Could not delete {} {}: {}", T::LABEL, slug, e);
            HttpError::from(e)
        })?;

    tracing::info!(table = T::TABLE, slug = %slug, "delete successful");
    Ok(StatusCode::NO_CONTENT)
}
