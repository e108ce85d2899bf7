//! One struct per CSV layout. Columns are matched by header name; extra
//! columns are ignored and empty optional cells read as `None`.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{
    AuthoredPost, CatalogEntry, Category, Comment, Genre, Review, Title, User, UserRole,
};

/// `id,name,slug` (category.csv, genre.csv)
#[derive(Debug, Deserialize)]
pub struct CatalogRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl CatalogRow {
    fn entry(self) -> (i64, CatalogEntry) {
        (
            self.id,
            CatalogEntry {
                name: self.name,
                slug: self.slug,
            },
        )
    }

    pub fn into_category(self) -> Category {
        let (id, entry) = self.entry();
        Category { id, entry }
    }

    pub fn into_genre(self) -> Genre {
        let (id, entry) = self.entry();
        Genre { id, entry }
    }
}

/// `id,username,email,role,bio,first_name,last_name`
#[derive(Debug, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserRow {
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role: self.role.unwrap_or_default(),
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `id,name,year,category` where `category` is a category id
#[derive(Debug, Deserialize)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i32,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl TitleRow {
    pub fn into_title(self) -> Title {
        Title {
            id: self.id,
            name: self.name,
            year: self.year,
            description: self.description.unwrap_or_default(),
            category_id: self.category,
        }
    }
}

/// `id,title_id,genre_id`; the row id carries no meaning
#[derive(Debug, Deserialize)]
pub struct GenreTitleRow {
    pub title_id: i64,
    pub genre_id: i64,
}

/// `id,title_id,text,author,score,pub_date` where `author` is a user id
#[derive(Debug, Deserialize)]
pub struct ReviewRow {
    pub id: i64,
    pub title_id: i64,
    pub text: String,
    pub author: i64,
    pub score: i16,
    #[serde(default)]
    pub pub_date: Option<DateTime<Utc>>,
}

impl ReviewRow {
    pub fn into_review(self, now: DateTime<Utc>) -> Review {
        Review {
            id: self.id,
            title_id: self.title_id,
            score: self.score,
            post: AuthoredPost {
                author_id: self.author,
                text: self.text,
                pub_date: self.pub_date.unwrap_or(now),
            },
        }
    }
}

/// `id,review_id,text,author,pub_date` where `author` is a user id
#[derive(Debug, Deserialize)]
pub struct CommentRow {
    pub id: i64,
    pub review_id: i64,
    pub text: String,
    pub author: i64,
    #[serde(default)]
    pub pub_date: Option<DateTime<Utc>>,
}

impl CommentRow {
    pub fn into_comment(self, now: DateTime<Utc>) -> Comment {
        Comment {
            id: self.id,
            review_id: self.review_id,
            post: AuthoredPost {
                author_id: self.author,
                text: self.text,
                pub_date: self.pub_date.unwrap_or(now),
            },
        }
    }
}
