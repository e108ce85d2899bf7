use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::User,
    policy::{Access, Policy},
    utils::token,
};

/// Middleware extension that stores authenticated user information
///
/// Inserted into the request extensions by `auth`. Handlers extract it with
/// `Extension(jwt): Extension<JWTAuthMiddleware>`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: User,
}

/// Authentication middleware that validates the access token
///
/// Token extraction priority:
/// - First: `access_token` cookie (set by `POST /auth/token`)
/// - Second: `Authorization: Bearer <token>` header
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - No token is provided
/// - Token is invalid or expired
/// - User no longer exists in database
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("access_token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
                .map(str::to_owned)
        })
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    // Checks signature and expiry
    let subject = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    let user_id: i64 = subject
        .parse()
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    // The user may have been deleted after the token was issued
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|_| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    req.extensions_mut().insert(JWTAuthMiddleware { user });

    Ok(next.run(req).await)
}

/// Route-level permission check; runs after `auth` when the route requires it.
///
/// Object ownership is unknown at this point, so only the role part of the
/// policy is decided here. Handlers that touch an existing review or
/// comment repeat the check with the author's id.
pub async fn policy_check(
    req: Request,
    next: Next,
    policy: Policy,
) -> Result<impl IntoResponse, HttpError> {
    let access = Access::from_method(req.method());
    let requester = req.extensions().get::<JWTAuthMiddleware>().map(|jwt| &jwt.user);

    policy.check(requester, access, None)?;

    Ok(next.run(req).await)
}

/// Route layer for catalog resources: public reads, admin writes
pub async fn read_only(req: Request, next: Next) -> Result<impl IntoResponse, HttpError> {
    policy_check(req, next, Policy::ReadOnly).await
}

/// Route layer for admin-only resources
pub async fn admin_only(req: Request, next: Next) -> Result<impl IntoResponse, HttpError> {
    policy_check(req, next, Policy::AdminOnly).await
}
