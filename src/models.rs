use chrono::prelude::*;
use serde::{Deserialize, Serialize};

/// User role enumeration for role-based access control (RBAC)
///
/// Stored in PostgreSQL as the ENUM type "user_role".
///
/// - `User`: may read everything and write its own reviews/comments
/// - `Moderator`: may additionally edit or delete anyone's reviews/comments
/// - `Admin`: passes every permission check
///
/// The `#[sqlx(type_name = "user_role", rename_all = "lowercase")]` attribute
/// maps variants to the lowercase ENUM labels ("user", "moderator", "admin").
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    /// Moderators and admins may touch content they did not author.
    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }
}

/// User model representing the users table
///
/// There is no password column: identity is proven with an emailed
/// confirmation code derived from this row (see `utils::confirmation`).
/// `last_login` and `updated_at` take part in that derivation, so touching
/// either invalidates codes issued earlier.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: UserRole,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Shared `name` + `slug` pair of the catalog tables (categories, genres).
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: CatalogEntry,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Genre {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: CatalogEntry,
}

/// Title (a reviewed work) as stored in the titles table.
///
/// Genre membership lives in the `title_genres` join table and the average
/// score is never stored; both are assembled into `dtos::TitleDto` on read.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: String,
    pub category_id: Option<i64>, // SET NULL when the category is deleted
}

/// Shared author/text/pub_date fields of reviews and comments.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct AuthoredPost {
    pub author_id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>, // set once at insert
}

/// Review of a title. One per (author, title), enforced by a UNIQUE constraint.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: i64,
    pub title_id: i64,
    pub score: i16,
    #[sqlx(flatten)]
    pub post: AuthoredPost,
}

/// Comment on a review.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    #[sqlx(flatten)]
    pub post: AuthoredPost,
}
