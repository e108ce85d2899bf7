use axum::http::Method;

use crate::error::{CatalogError, ErrorMessage};
use crate::models::User;

/// Whether a request only reads or also changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    /// GET, HEAD, OPTIONS and TRACE read; everything else writes
    pub fn from_method(method: &Method) -> Self {
        if method.is_safe() {
            Access::Read
        } else {
            Access::Write
        }
    }
}

/// Permission classes attached to resources.
///
/// Admins pass every check. Otherwise:
///
/// | policy            | read   | write                                   |
/// |-------------------|--------|-----------------------------------------|
/// | `ReadOnly`        | anyone | admin                                   |
/// | `OwnerOrElevated` | anyone | author, moderator; any user to create   |
/// | `AdminOnly`       | admin  | admin                                   |
///
/// A failed check is `Authentication` (401) when there is no requester and
/// `Authorization` (403) when there is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    ReadOnly,
    OwnerOrElevated,
    AdminOnly,
}

impl Policy {
    /// `owner_id` is the author of the object being written, `None` when
    /// the request creates a new object.
    pub fn check(
        self,
        requester: Option<&User>,
        access: Access,
        owner_id: Option<i64>,
    ) -> Result<(), CatalogError> {
        if requester.is_some_and(User::is_admin) {
            return Ok(());
        }

        match (self, access) {
            (Policy::ReadOnly | Policy::OwnerOrElevated, Access::Read) => Ok(()),
            (Policy::ReadOnly, Access::Write) | (Policy::AdminOnly, _) => deny(requester),
            (Policy::OwnerOrElevated, Access::Write) => {
                let Some(user) = requester else {
                    return deny(None);
                };
                if user.role.is_elevated() || owner_id.is_none_or(|id| id == user.id) {
                    Ok(())
                } else {
                    deny(Some(user))
                }
            }
        }
    }
}

fn deny(requester: Option<&User>) -> Result<(), CatalogError> {
    match requester {
        None => Err(CatalogError::Authentication(
            ErrorMessage::UserNotAuthenticated.to_string(),
        )),
        Some(_) => Err(CatalogError::Authorization(
            ErrorMessage::PermissionDenied.to_string(),
        )),
    }
}
