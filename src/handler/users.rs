use crate::{
    AppState,
    db::{NewUser, UserChanges, UserExt},
    dtos::{
        CreateUserDto, FilterUserDto, ListQueryDto, ListResponseDto, PaginationDto,
        SingleResponseDto, UpdateUserDto,
    },
    error::HttpError,
    middleware::{JWTAuthMiddleware, admin_only},
    models::User,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;
use validator::Validate;

/// Router for user endpoints
///
/// All routes are protected by the auth middleware (applied in routes.rs).
/// Everything except `/me` is admin-only.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        // GET/PATCH /me - own profile, any authenticated user
        .route("/me", get(get_me).patch(update_me))
        .route(
            "/",
            get(get_users)
                .post(create_user)
                .route_layer(middleware::from_fn(admin_only)),
        )
        .route(
            "/{username}",
            get(get_user)
                .patch(update_user)
                .delete(delete_user)
                .route_layer(middleware::from_fn(admin_only)),
        )
}

impl From<UpdateUserDto> for UserChanges {
    fn from(dto: UpdateUserDto) -> Self {
        UserChanges {
            username: dto.username,
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            bio: dto.bio,
            role: dto.role,
        }
    }
}

async fn find_user(app_state: &AppState, username: &str) -> Result<User, HttpError> {
    app_state
        .db_client
        .get_user(None, Some(username), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::from(e)
        })?
        .ok_or_else(|| HttpError::not_found("User not found"))
}

/// Own profile
#[instrument(skip(jwt), fields(username = %jwt.user.username))]
pub async fn get_me(
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    tracing::info!("get_me successful");
    Ok(Json(SingleResponseDto::success(FilterUserDto::filter_user(
        &jwt.user,
    ))))
}

/// Edit own profile. A `role` in the body is ignored.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn update_me(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpdateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_me input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let changes = UserChanges {
        role: None,
        ..UserChanges::from(body)
    };

    let user = app_state
        .db_client
        .update_user(jwt.user.id, &changes)
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating own profile: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("update_me successful");
    Ok(Json(SingleResponseDto::success(FilterUserDto::filter_user(
        &user,
    ))))
}

/// Paginated user list (admin only)
///
/// Query params: ?page=1&limit=10&search=<username substring>
#[instrument(skip(app_state))]
pub async fn get_users(
    Query(query_params): Query<ListQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid get_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page();
    let limit = query_params.limit();
    let search = query_params.search.as_deref();

    let users = app_state
        .db_client
        .get_users(search, page, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting users: {}", e);
            HttpError::from(e)
        })?;

    let total = app_state
        .db_client
        .get_user_count(search)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user count: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("get_users successful");
    Ok(Json(ListResponseDto {
        status: "success".to_string(),
        data: FilterUserDto::filter_users(&users),
        pagination: PaginationDto::new(page, limit, total),
    }))
}

/// Create a user directly, with any role (admin only)
#[instrument(skip(app_state, body), fields(username = %body.username))]
pub async fn create_user(
    State(app_state): State<AppState>,
    Json(body): Json<CreateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid create_user input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let new_user = NewUser {
        username: body.username,
        email: body.email,
        first_name: body.first_name.unwrap_or_default(),
        last_name: body.last_name.unwrap_or_default(),
        bio: body.bio.unwrap_or_default(),
        role: body.role.unwrap_or_default(),
    };

    let user = app_state.db_client.save_user(&new_user).await.map_err(|e| {
        tracing::error!("DB error, creating user: {}", e);
        HttpError::from(e)
    })?;

    tracing::info!("create_user successful");
    Ok((
        StatusCode::CREATED,
        Json(SingleResponseDto::success(FilterUserDto::filter_user(
            &user,
        ))),
    ))
}

#[instrument(skip(app_state))]
pub async fn get_user(
    Path(username): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = find_user(&app_state, &username).await?;

    tracing::info!("get_user successful");
    Ok(Json(SingleResponseDto::success(FilterUserDto::filter_user(
        &user,
    ))))
}

/// Partial update of any user, role included (admin only)
#[instrument(skip(app_state, body))]
pub async fn update_user(
    Path(username): Path<String>,
    State(app_state): State<AppState>,
    Json(body): Json<UpdateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid update_user input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = find_user(&app_state, &username).await?;

    let updated = app_state
        .db_client
        .update_user(user.id, &UserChanges::from(body))
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating user: {}", e);
            HttpError::from(e)
        })?;

    tracing::info!("update_user successful");
    Ok(Json(SingleResponseDto::success(FilterUserDto::filter_user(
        &updated,
    ))))
}

#[instrument(skip(app_state))]
pub async fn delete_user(
    Path(username): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let user = find_user(&app_state, &username).await?;

    app_state.db_client.delete_user(user.id).await.map_err(|e| {
        tracing::error!("DB error, deleting user: {}", e);
        HttpError::from(e)
    })?;

    tracing::info!("delete_user successful");
    Ok(StatusCode::NO_CONTENT)
}
