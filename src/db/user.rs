use super::{DBClient, offset};
use crate::error::CatalogError;
use crate::models::{User, UserRole};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, last_login, created_at, updated_at";

/// Fields of a user row supplied on creation. Everything else is defaulted
/// by the database.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: UserRole,
}

/// Partial user update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<UserRole>,
}

/// User database operations trait
pub trait UserExt {
    /// Get single user by ID, username or email
    /// Returns Option - Some(user) if found, None if not found
    async fn get_user(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, CatalogError>;

    /// Get paginated list of users, optionally filtered by a username substring
    async fn get_users(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<User>, CatalogError>;

    async fn get_user_count(&self, search: Option<&str>) -> Result<i64, CatalogError>;

    /// Create a user; a taken username or email yields `CatalogError::Duplicate`
    async fn save_user(&self, user: &NewUser) -> Result<User, CatalogError>;

    /// Apply a partial update and bump `updated_at`
    async fn update_user(&self, user_id: i64, changes: &UserChanges)
    -> Result<User, CatalogError>;

    async fn delete_user(&self, user_id: i64) -> Result<(), CatalogError>;

    /// Stamp `last_login` with the current time (spends outstanding confirmation codes)
    async fn touch_last_login(&self, user_id: i64) -> Result<User, CatalogError>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, CatalogError> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
            user = sqlx::query_as::<_, User>(&query)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(username) = username {
            let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
            user = sqlx::query_as::<_, User>(&query)
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(email) = email {
            let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
            user = sqlx::query_as::<_, User>(&query)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(user)
    }

    async fn get_users(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<User>, CatalogError> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR username ILIKE '%' || $1 || '%')
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#
        );

        let users = sqlx::query_as::<_, User>(&query)
            .bind(search)
            .bind(limit)
            .bind(offset(page, limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn get_user_count(&self, search: Option<&str>) -> Result<i64, CatalogError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR username ILIKE '%' || $1 || '%')
            "#,
        )
        .bind(search)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn save_user(&self, user: &NewUser) -> Result<User, CatalogError> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, bio, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.bio)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_user(
        &self,
        user_id: i64,
        changes: &UserChanges,
    ) -> Result<User, CatalogError> {
        let query = format!(
            r#"
            UPDATE users
            SET username = COALESCE($1, username),
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                bio = COALESCE($5, bio),
                role = COALESCE($6, role),
                updated_at = NOW()
            WHERE id = $7
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(changes.username.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.first_name.as_deref())
            .bind(changes.last_name.as_deref())
            .bind(changes.bio.as_deref())
            .bind(changes.role)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        user.ok_or_else(|| CatalogError::not_found("User not found"))
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::not_found("User not found"));
        }

        Ok(())
    }

    async fn touch_last_login(&self, user_id: i64) -> Result<User, CatalogError> {
        let query =
            format!("UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        user.ok_or_else(|| CatalogError::not_found("User not found"))
    }
}
