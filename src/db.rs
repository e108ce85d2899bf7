use sqlx::{Pool, Postgres};

pub mod schema;

mod user;
pub use user::{NewUser, UserChanges, UserExt};

mod catalog;
pub use catalog::{CatalogExt, CatalogTable};

mod title;
pub use title::{NewTitle, TitleChanges, TitleExt, TitleFilter};

mod review;
pub use review::ReviewExt;

mod comment;
pub use comment::CommentExt;

mod import;
pub use import::{ImportExt, ImportTable};

#[cfg(test)]
pub mod memory;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// OFFSET for a 1-based page number
pub(crate) fn offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1) * limit
}
