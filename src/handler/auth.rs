use crate::{
    AppState,
    dtos::{SignupDto, SignupResponseDto, TokenRequestDto, TokenResponseDto},
    error::HttpError,
    mail::mails::send_confirmation_email,
    services::accounts,
    utils::token,
};
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::instrument;
use validator::Validate;

/// Router for authentication endpoints
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/token", post(issue_token))
}

/// Passwordless signup
///
/// Looks up or creates the user for the (username, email) pair and emails a
/// confirmation code derived from the row. Repeating the request with the
/// same pair just sends a fresh code. Delivery happens in the background and
/// its failure does not fail the request.
#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn signup(
    State(app_state): State<AppState>,
    Json(body): Json<SignupDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid signup input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = accounts::register(&app_state.db_client, &body.username, &body.email)
        .await
        .map_err(|e| {
            tracing::error!("Signup rejected: {}", e);
            HttpError::from(e)
        })?;

    let code = accounts::confirmation_code(&user, app_state.env.jwt_secret.as_bytes());

    // Fire-and-forget: the handle is dropped, the task keeps running
    send_confirmation_email(
        app_state.env.mail.clone(),
        user.email.clone(),
        user.username.clone(),
        code,
    );

    tracing::info!("signup successful");
    Ok((
        StatusCode::OK,
        Json(SignupResponseDto {
            username: user.username,
            email: user.email,
        }),
    ))
}

/// Exchange username + confirmation code for an access token
///
/// The token is returned in the body and also set as the `access_token`
/// cookie. Issuing it stamps `last_login`, which spends the code.
#[instrument(skip(app_state, jar, body), fields(username = %body.username))]
pub async fn issue_token(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<TokenRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid token input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = accounts::redeem_code(
        &app_state.db_client,
        &body.username,
        &body.confirmation_code,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.confirmation_code_maxage,
    )
    .await
    .map_err(|e| {
        tracing::error!("Token request rejected: {}", e);
        HttpError::from(e)
    })?;

    let access_token = token::create_token(
        &user.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let access_cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(app_state.env.jwt_maxage))
        .build();

    tracing::info!("token issued");
    Ok((
        jar.add(access_cookie),
        Json(TokenResponseDto {
            token: access_token,
        }),
    ))
}
