use chrono::Utc;

use crate::db::{NewUser, UserExt};
use crate::error::{CatalogError, ErrorMessage};
use crate::models::User;
use crate::utils::{confirmation, validators::check_username};

fn identity_mismatch() -> CatalogError {
    CatalogError::Conflict(ErrorMessage::UsernameEmailMismatch.to_string())
}

/// Look up or create the user keyed by the `(username, email)` pair.
///
/// Repeating a signup with the same pair returns the existing row. A pair
/// whose halves belong to different rows (or to a row with the other half
/// different) is a `Conflict`.
pub async fn register<S: UserExt>(
    store: &S,
    username: &str,
    email: &str,
) -> Result<User, CatalogError> {
    check_username(username)?;

    let by_username = store.get_user(None, Some(username), None).await?;
    let by_email = store.get_user(None, None, Some(email)).await?;

    match (by_username, by_email) {
        (Some(user), Some(other)) if user.id == other.id => Ok(user),
        (None, None) => {
            let new_user = NewUser {
                username: username.to_string(),
                email: email.to_string(),
                ..Default::default()
            };
            match store.save_user(&new_user).await {
                Ok(user) => Ok(user),
                // Lost a race against a concurrent signup: the row exists now
                Err(CatalogError::Duplicate(_)) => {
                    match store.get_user(None, Some(username), None).await? {
                        Some(user) if user.email == email => Ok(user),
                        _ => Err(identity_mismatch()),
                    }
                }
                Err(e) => Err(e),
            }
        }
        _ => Err(identity_mismatch()),
    }
}

/// Code for the user's current state, to be delivered by email.
pub fn confirmation_code(user: &User, secret: &[u8]) -> String {
    confirmation::make_code(user, secret, Utc::now())
}

/// Check a confirmation code and spend it by stamping `last_login`.
/// Returns the updated user; the caller issues the access token.
pub async fn redeem_code<S: UserExt>(
    store: &S,
    username: &str,
    code: &str,
    secret: &[u8],
    code_max_age: i64,
) -> Result<User, CatalogError> {
    let user = store
        .get_user(None, Some(username), None)
        .await?
        .ok_or_else(|| CatalogError::not_found("User not found"))?;

    if !confirmation::check_code(&user, code, secret, code_max_age, Utc::now()) {
        return Err(CatalogError::validation(
            ErrorMessage::InvalidConfirmationCode.to_string(),
        ));
    }

    store.touch_last_login(user.id).await
}
