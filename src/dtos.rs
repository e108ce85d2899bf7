use crate::models::{CatalogEntry, User, UserRole};
use crate::utils::validators::{validate_score, validate_slug, validate_username, validate_year};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// DTOs (Data Transfer Objects) define the structure of data exchanged with clients
// They are separate from database models to control exactly what data is exposed

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Signup request: no password, a confirmation code is emailed instead
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SignupDto {
    #[validate(
        length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(
        length(min = 1, max = 254, message = "Email must be between 1 and 254 characters"),
        email(message = "Email is invalid")
    )]
    pub email: String,
}

/// Echo of the accepted signup
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponseDto {
    pub username: String,
    pub email: String,
}

/// Exchange a confirmation code for an access token
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenRequestDto {
    #[validate(
        length(min = 1, max = 150, message = "Username is required"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(length(min = 1, message = "Confirmation code is required"))]
    pub confirmation_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponseDto {
    pub token: String,
}

// ============================================================================
// Pagination & Query DTOs
// ============================================================================

/// Pagination and name search for catalog and user lists
#[derive(Serialize, Deserialize, Validate, Debug, Default)]
pub struct ListQueryDto {
    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,

    #[validate(length(min = 1, max = 256))]
    pub search: Option<String>,
}

impl ListQueryDto {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10)
    }
}

/// Pagination metadata
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PaginationDto {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl PaginationDto {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        PaginationDto {
            page,
            limit,
            total,
            total_pages: (total as f64 / limit as f64).ceil() as i64,
        }
    }
}

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct ListResponseDto<T: Serialize> {
    pub status: String,
    pub data: Vec<T>,
    pub pagination: PaginationDto,
}

/// Single object response
#[derive(Debug, Serialize)]
pub struct SingleResponseDto<T: Serialize> {
    pub status: String,
    pub data: T,
}

impl<T: Serialize> SingleResponseDto<T> {
    pub fn success(data: T) -> Self {
        SingleResponseDto {
            status: "success".to_string(),
            data,
        }
    }
}

// ============================================================================
// User DTOs
// ============================================================================

/// User data sent to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: String,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            bio: user.bio.to_owned(),
            role: user.role.to_str().to_string(),
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

/// Admin creates a user directly
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateUserDto {
    #[validate(
        length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(
        length(min = 1, max = 254, message = "Email must be between 1 and 254 characters"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<UserRole>,
}

/// Partial update of a user. `role` is only honoured on the admin endpoint;
/// `/users/me` strips it before the update reaches the store.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateUserDto {
    #[validate(
        length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,

    #[validate(
        length(min = 1, max = 254, message = "Email must be between 1 and 254 characters"),
        email(message = "Email is invalid")
    )]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub role: Option<UserRole>,
}

// ============================================================================
// Catalog DTOs (categories, genres)
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InputCatalogEntryDto {
    #[validate(length(min = 1, max = 256, message = "Name must be between 1 and 256 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
}

/// Only the name can change, the slug is the lookup key
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateCatalogEntryDto {
    #[validate(length(min = 1, max = 256, message = "Name must be between 1 and 256 characters"))]
    pub name: String,
}

// ============================================================================
// Title DTOs
// ============================================================================

/// Title creation request; genres and category are referenced by slug
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InputTitleDto {
    #[validate(length(min = 1, max = 256, message = "Name must be between 1 and 256 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_year"))]
    pub year: i32,

    pub description: Option<String>,

    #[validate(length(min = 1, message = "At least one genre is required"))]
    pub genre: Vec<String>,

    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateTitleDto {
    #[validate(length(min = 1, max = 256, message = "Name must be between 1 and 256 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_year"))]
    pub year: Option<i32>,

    pub description: Option<String>,

    #[validate(length(min = 1, message = "At least one genre is required"))]
    pub genre: Option<Vec<String>>,

    pub category: Option<String>,
}

/// Filters for the title list
#[derive(Debug, Deserialize, Validate, Default)]
pub struct TitleQueryDto {
    pub category: Option<String>, // category slug
    pub genre: Option<String>,    // genre slug
    pub name: Option<String>,     // case-insensitive substring
    pub year: Option<i32>,

    #[validate(range(min = 1, message = "Page must be greater than 0"))]
    pub page: Option<i64>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

/// Title as returned to clients. `rating` is the average review score,
/// computed when the title is read, `null` while nobody has reviewed it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TitleDto {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: String,
    pub genre: Vec<CatalogEntry>,
    pub category: Option<CatalogEntry>,
}

// ============================================================================
// Review DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct InputReviewDto {
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,

    #[validate(custom(function = "validate_score"))]
    pub score: i16,
}

#[derive(Debug, Deserialize, Validate, Default)]
pub struct UpdateReviewDto {
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: Option<String>,

    #[validate(custom(function = "validate_score"))]
    pub score: Option<i16>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ReviewDto {
    pub id: i64,
    pub title: i64,
    pub text: String,
    pub author: String, // author's username
    #[serde(skip)]
    pub author_id: i64,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

// ============================================================================
// Comment DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct InputCommentDto {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Text must be between 1 and 1000 characters"
    ))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CommentDto {
    pub id: i64,
    pub review: i64,
    pub text: String,
    pub author: String, // author's username
    #[serde(skip)]
    pub author_id: i64,
    pub pub_date: DateTime<Utc>,
}
