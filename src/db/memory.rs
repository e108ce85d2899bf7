//! In-memory store for service and importer tests.
//!
//! Mirrors the constraints of the Postgres schema: unique usernames, emails,
//! slugs and (author, title) review pairs, foreign keys, and cascading
//! deletes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{
    CatalogTable, CommentExt, ImportExt, ImportTable, NewTitle, NewUser, ReviewExt, TitleChanges, TitleExt,
    TitleFilter, UserChanges, UserExt,
};
use crate::dtos::{CommentDto, ReviewDto, TitleDto};
use crate::error::CatalogError;
use crate::models::{AuthoredPost, CatalogEntry, Comment, Review, Title, User};

const CATEGORIES: &str = "categories";
const GENRES: &str = "genres";

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    catalog: HashMap<&'static str, BTreeMap<i64, CatalogEntry>>,
    titles: BTreeMap<i64, Title>,
    title_genres: BTreeSet<(i64, i64)>,
    reviews: BTreeMap<i64, Review>,
    comments: BTreeMap<i64, Comment>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn genre_links(&self) -> Vec<(i64, i64)> {
        self.lock().title_genres.iter().copied().collect()
    }

    pub fn review_count(&self) -> usize {
        self.lock().reviews.len()
    }

    pub fn comment_count(&self) -> usize {
        self.lock().comments.len()
    }

    pub fn catalog_count(&self, table: &str) -> usize {
        self.lock().catalog.get(table).map_or(0, BTreeMap::len)
    }
}

pub fn mean_score(scores: &[i16]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    Some(sum as f64 / scores.len() as f64)
}

fn duplicate(constraint: &str) -> CatalogError {
    CatalogError::duplicate(format!("Violates {}", constraint))
}

fn missing_reference(constraint: &str) -> CatalogError {
    CatalogError::not_found(format!("Referenced object does not exist ({})", constraint))
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn bump_id(&mut self, id: i64) {
        self.last_id = self.last_id.max(id);
    }

    fn catalog(&self, table: &str) -> Option<&BTreeMap<i64, CatalogEntry>> {
        self.catalog.get(table)
    }

    fn slug_id(&self, table: &str, slug: &str) -> Option<i64> {
        self.catalog(table)?
            .iter()
            .find(|(_, entry)| entry.slug == slug)
            .map(|(id, _)| *id)
    }

    fn user_conflict(&self, user_id: Option<i64>, username: &str, email: &str) -> Option<CatalogError> {
        let others = self.users.values().filter(|u| Some(u.id) != user_id);
        for other in others {
            if other.username == username {
                return Some(duplicate("users_username_key"));
            }
            if other.email == email {
                return Some(duplicate("users_email_key"));
            }
        }
        None
    }

    fn title_dto(&self, title: &Title) -> TitleDto {
        let mut genre: Vec<CatalogEntry> = self
            .title_genres
            .iter()
            .filter(|(title_id, _)| *title_id == title.id)
            .filter_map(|(_, genre_id)| self.catalog(GENRES)?.get(genre_id).cloned())
            .collect();
        genre.sort_by(|a, b| a.name.cmp(&b.name));

        let scores: Vec<i16> = self
            .reviews
            .values()
            .filter(|r| r.title_id == title.id)
            .map(|r| r.score)
            .collect();

        TitleDto {
            id: title.id,
            name: title.name.clone(),
            year: title.year,
            rating: mean_score(&scores),
            description: title.description.clone(),
            genre,
            category: title
                .category_id
                .and_then(|id| self.catalog(CATEGORIES)?.get(&id).cloned()),
        }
    }

    fn review_dto(&self, review: &Review) -> ReviewDto {
        ReviewDto {
            id: review.id,
            title: review.title_id,
            text: review.post.text.clone(),
            author: self
                .users
                .get(&review.post.author_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            author_id: review.post.author_id,
            score: review.score,
            pub_date: review.post.pub_date,
        }
    }

    fn comment_dto(&self, comment: &Comment) -> CommentDto {
        CommentDto {
            id: comment.id,
            review: comment.review_id,
            text: comment.post.text.clone(),
            author: self
                .users
                .get(&comment.post.author_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            author_id: comment.post.author_id,
            pub_date: comment.post.pub_date,
        }
    }

    fn category_id(&self, slug: &str) -> Result<i64, CatalogError> {
        self.slug_id(CATEGORIES, slug).ok_or_else(|| {
            CatalogError::validation(format!("Category with slug={} does not exist", slug))
        })
    }

    fn genre_ids(&self, slugs: &[String]) -> Result<Vec<i64>, CatalogError> {
        slugs
            .iter()
            .map(|slug| {
                self.slug_id(GENRES, slug).ok_or_else(|| {
                    CatalogError::validation(format!("Genre with slug={} does not exist", slug))
                })
            })
            .collect()
    }

    fn delete_review_cascade(&mut self, review_id: i64) {
        self.reviews.remove(&review_id);
        self.comments.retain(|_, c| c.review_id != review_id);
    }

    fn delete_title_cascade(&mut self, title_id: i64) {
        self.titles.remove(&title_id);
        self.title_genres.retain(|(t, _)| *t != title_id);
        let reviews: Vec<i64> = self
            .reviews
            .values()
            .filter(|r| r.title_id == title_id)
            .map(|r| r.id)
            .collect();
        for review_id in reviews {
            self.delete_review_cascade(review_id);
        }
    }

    fn has_id(&self, table: ImportTable, id: i64) -> bool {
        match table {
            ImportTable::Categories => self.catalog(CATEGORIES).is_some_and(|t| t.contains_key(&id)),
            ImportTable::Genres => self.catalog(GENRES).is_some_and(|t| t.contains_key(&id)),
            ImportTable::Users => self.users.contains_key(&id),
            ImportTable::Titles => self.titles.contains_key(&id),
            ImportTable::Reviews => self.reviews.contains_key(&id),
        }
    }

    fn page<T>(items: Vec<T>, page: i64, limit: i64) -> Vec<T> {
        let skip = super::offset(page, limit).max(0) as usize;
        items.into_iter().skip(skip).take(limit.max(0) as usize).collect()
    }
}

fn matches_search(value: &str, search: Option<&str>) -> bool {
    search.is_none_or(|s| value.to_lowercase().contains(&s.to_lowercase()))
}

impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, CatalogError> {
        let t = self.lock();
        let found = if let Some(id) = user_id {
            t.users.get(&id).cloned()
        } else if let Some(username) = username {
            t.users.values().find(|u| u.username == username).cloned()
        } else if let Some(email) = email {
            t.users.values().find(|u| u.email == email).cloned()
        } else {
            None
        };
        Ok(found)
    }

    async fn get_users(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<User>, CatalogError> {
        let t = self.lock();
        let mut users: Vec<User> = t
            .users
            .values()
            .filter(|u| matches_search(&u.username, search))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(Tables::page(users, page, limit))
    }

    async fn get_user_count(&self, search: Option<&str>) -> Result<i64, CatalogError> {
        let t = self.lock();
        Ok(t.users
            .values()
            .filter(|u| matches_search(&u.username, search))
            .count() as i64)
    }

    async fn save_user(&self, user: &NewUser) -> Result<User, CatalogError> {
        let mut t = self.lock();
        if let Some(err) = t.user_conflict(None, &user.username, &user.email) {
            return Err(err);
        }
        let now = Utc::now();
        let created = User {
            id: t.next_id(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            bio: user.bio.clone(),
            role: user.role,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(
        &self,
        user_id: i64,
        changes: &UserChanges,
    ) -> Result<User, CatalogError> {
        let mut t = self.lock();
        let mut user = t
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("User not found"))?;

        if let Some(username) = &changes.username {
            user.username = username.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &changes.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(bio) = &changes.bio {
            user.bio = bio.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(err) = t.user_conflict(Some(user_id), &user.username, &user.email) {
            return Err(err);
        }
        user.updated_at = Utc::now();
        t.users.insert(user_id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), CatalogError> {
        let mut t = self.lock();
        if t.users.remove(&user_id).is_none() {
            return Err(CatalogError::not_found("User not found"));
        }
        let reviews: Vec<i64> = t
            .reviews
            .values()
            .filter(|r| r.post.author_id == user_id)
            .map(|r| r.id)
            .collect();
        for review_id in reviews {
            t.delete_review_cascade(review_id);
        }
        t.comments.retain(|_, c| c.post.author_id != user_id);
        Ok(())
    }

    async fn touch_last_login(&self, user_id: i64) -> Result<User, CatalogError> {
        let mut t = self.lock();
        let user = t
            .users
            .get_mut(&user_id)
            .ok_or_else(|| CatalogError::not_found("User not found"))?;
        user.last_login = Some(Utc::now());
        Ok(user.clone())
    }
}

impl TitleExt for MemoryStore {
    async fn get_title(&self, title_id: i64) -> Result<Option<TitleDto>, CatalogError> {
        let t = self.lock();
        Ok(t.titles.get(&title_id).map(|title| t.title_dto(title)))
    }

    async fn get_titles(
        &self,
        filter: &TitleFilter,
        page: i64,
        limit: i64,
    ) -> Result<Vec<TitleDto>, CatalogError> {
        let t = self.lock();
        let mut titles: Vec<TitleDto> = t
            .titles
            .values()
            .map(|title| t.title_dto(title))
            .filter(|dto| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|slug| dto.category.as_ref().is_some_and(|c| c.slug == slug))
                    && filter
                        .genre
                        .as_deref()
                        .is_none_or(|slug| dto.genre.iter().any(|g| g.slug == slug))
                    && matches_search(&dto.name, filter.name.as_deref())
                    && filter.year.is_none_or(|year| dto.year == year)
            })
            .collect();
        titles.sort_by(|a, b| b.year.cmp(&a.year).then(a.id.cmp(&b.id)));
        Ok(Tables::page(titles, page, limit))
    }

    async fn get_title_count(&self, filter: &TitleFilter) -> Result<i64, CatalogError> {
        Ok(self.get_titles(filter, 1, i64::MAX / 2).await?.len() as i64)
    }

    async fn create_title(&self, title: &NewTitle) -> Result<TitleDto, CatalogError> {
        let mut t = self.lock();
        let category_id = title
            .category
            .as_deref()
            .map(|slug| t.category_id(slug))
            .transpose()?;
        let genre_ids = t.genre_ids(&title.genre)?;

        let created = Title {
            id: t.next_id(),
            name: title.name.clone(),
            year: title.year,
            description: title.description.clone(),
            category_id,
        };
        for genre_id in genre_ids {
            t.title_genres.insert((created.id, genre_id));
        }
        t.titles.insert(created.id, created.clone());
        Ok(t.title_dto(&created))
    }

    async fn update_title(
        &self,
        title_id: i64,
        changes: &TitleChanges,
    ) -> Result<TitleDto, CatalogError> {
        let mut t = self.lock();
        let mut title = t
            .titles
            .get(&title_id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found("Title not found"))?;

        if let Some(slug) = changes.category.as_deref() {
            title.category_id = Some(t.category_id(slug)?);
        }
        if let Some(slugs) = &changes.genre {
            let genre_ids = t.genre_ids(slugs)?;
            t.title_genres.retain(|(id, _)| *id != title_id);
            for genre_id in genre_ids {
                t.title_genres.insert((title_id, genre_id));
            }
        }
        if let Some(name) = &changes.name {
            title.name = name.clone();
        }
        if let Some(year) = changes.year {
            title.year = year;
        }
        if let Some(description) = &changes.description {
            title.description = description.clone();
        }
        t.titles.insert(title_id, title.clone());
        Ok(t.title_dto(&title))
    }

    async fn delete_title(&self, title_id: i64) -> Result<(), CatalogError> {
        let mut t = self.lock();
        if !t.titles.contains_key(&title_id) {
            return Err(CatalogError::not_found("Title not found"));
        }
        t.delete_title_cascade(title_id);
        Ok(())
    }
}

impl ReviewExt for MemoryStore {
    async fn title_exists(&self, title_id: i64) -> Result<bool, CatalogError> {
        Ok(self.lock().titles.contains_key(&title_id))
    }

    async fn get_reviews(
        &self,
        title_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ReviewDto>, CatalogError> {
        let t = self.lock();
        let mut reviews: Vec<ReviewDto> = t
            .reviews
            .values()
            .filter(|r| r.title_id == title_id)
            .map(|r| t.review_dto(r))
            .collect();
        reviews.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(Tables::page(reviews, page, limit))
    }

    async fn get_title_review_count(&self, title_id: i64) -> Result<i64, CatalogError> {
        let t = self.lock();
        Ok(t.reviews.values().filter(|r| r.title_id == title_id).count() as i64)
    }

    async fn get_review(
        &self,
        title_id: i64,
        review_id: i64,
    ) -> Result<Option<ReviewDto>, CatalogError> {
        let t = self.lock();
        Ok(t.reviews
            .get(&review_id)
            .filter(|r| r.title_id == title_id)
            .map(|r| t.review_dto(r)))
    }

    async fn create_review(
        &self,
        title_id: i64,
        author_id: i64,
        text: &str,
        score: i16,
    ) -> Result<ReviewDto, CatalogError> {
        let mut t = self.lock();
        if !t.titles.contains_key(&title_id) {
            return Err(missing_reference("reviews_title_id_fkey"));
        }
        if !t.users.contains_key(&author_id) {
            return Err(missing_reference("reviews_author_id_fkey"));
        }
        if t
            .reviews
            .values()
            .any(|r| r.title_id == title_id && r.post.author_id == author_id)
        {
            return Err(duplicate("unique_author_title_review"));
        }

        let review = Review {
            id: t.next_id(),
            title_id,
            score,
            post: AuthoredPost {
                author_id,
                text: text.to_string(),
                pub_date: Utc::now(),
            },
        };
        t.reviews.insert(review.id, review.clone());
        Ok(t.review_dto(&review))
    }

    async fn update_review(
        &self,
        review_id: i64,
        text: Option<&str>,
        score: Option<i16>,
    ) -> Result<ReviewDto, CatalogError> {
        let mut t = self.lock();
        let review = t
            .reviews
            .get_mut(&review_id)
            .ok_or_else(|| CatalogError::not_found("Review not found"))?;
        if let Some(text) = text {
            review.post.text = text.to_string();
        }
        if let Some(score) = score {
            review.score = score;
        }
        let review = review.clone();
        Ok(t.review_dto(&review))
    }

    async fn delete_review(&self, review_id: i64) -> Result<(), CatalogError> {
        let mut t = self.lock();
        if !t.reviews.contains_key(&review_id) {
            return Err(CatalogError::not_found("Review not found"));
        }
        t.delete_review_cascade(review_id);
        Ok(())
    }
}

impl CommentExt for MemoryStore {
    async fn get_comments(
        &self,
        review_id: i64,
        page: i64,
        limit: i64,
    ) -> Result<Vec<CommentDto>, CatalogError> {
        let t = self.lock();
        let mut comments: Vec<CommentDto> = t
            .comments
            .values()
            .filter(|c| c.review_id == review_id)
            .map(|c| t.comment_dto(c))
            .collect();
        comments.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(Tables::page(comments, page, limit))
    }

    async fn get_review_comment_count(&self, review_id: i64) -> Result<i64, CatalogError> {
        let t = self.lock();
        Ok(t.comments.values().filter(|c| c.review_id == review_id).count() as i64)
    }

    async fn get_comment(
        &self,
        review_id: i64,
        comment_id: i64,
    ) -> Result<Option<CommentDto>, CatalogError> {
        let t = self.lock();
        Ok(t.comments
            .get(&comment_id)
            .filter(|c| c.review_id == review_id)
            .map(|c| t.comment_dto(c)))
    }

    async fn create_comment(
        &self,
        review_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<CommentDto, CatalogError> {
        let mut t = self.lock();
        if !t.reviews.contains_key(&review_id) {
            return Err(missing_reference("comments_review_id_fkey"));
        }
        if !t.users.contains_key(&author_id) {
            return Err(missing_reference("comments_author_id_fkey"));
        }

        let comment = Comment {
            id: t.next_id(),
            review_id,
            post: AuthoredPost {
                author_id,
                text: text.to_string(),
                pub_date: Utc::now(),
            },
        };
        t.comments.insert(comment.id, comment.clone());
        Ok(t.comment_dto(&comment))
    }

    async fn edit_comment(&self, comment_id: i64, text: &str) -> Result<CommentDto, CatalogError> {
        let mut t = self.lock();
        let comment = t
            .comments
            .get_mut(&comment_id)
            .ok_or_else(|| CatalogError::not_found("Comment not found"))?;
        comment.post.text = text.to_string();
        let comment = comment.clone();
        Ok(t.comment_dto(&comment))
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<(), CatalogError> {
        let mut t = self.lock();
        t.comments
            .remove(&comment_id)
            .map(|_| ())
            .ok_or_else(|| CatalogError::not_found("Comment not found"))
    }
}

impl ImportExt for MemoryStore {
    async fn missing_ids(
        &self,
        table: ImportTable,
        ids: &[i64],
    ) -> Result<Vec<i64>, CatalogError> {
        let t = self.lock();
        let mut missing = Vec::new();
        for &id in ids {
            if !t.has_id(table, id) && !missing.contains(&id) {
                missing.push(id);
            }
        }
        Ok(missing)
    }

    async fn import_catalog_entries<T: CatalogTable>(
        &self,
        rows: &[T],
    ) -> Result<u64, CatalogError> {
        let mut t = self.lock();
        let mut inserted = 0;
        for row in rows {
            let table = t.catalog.entry(T::TABLE).or_default();
            let taken = table.contains_key(&row.id())
                || table.values().any(|e| e.slug == row.entry().slug);
            if !taken {
                table.insert(row.id(), row.entry().clone());
                inserted += 1;
            }
            t.bump_id(row.id());
        }
        Ok(inserted)
    }

    async fn import_users(&self, rows: &[User]) -> Result<u64, CatalogError> {
        let mut t = self.lock();
        let mut inserted = 0;
        for user in rows {
            if !t.users.contains_key(&user.id)
                && t.user_conflict(None, &user.username, &user.email).is_none()
            {
                t.users.insert(user.id, user.clone());
                inserted += 1;
            }
            t.bump_id(user.id);
        }
        Ok(inserted)
    }

    async fn import_titles(&self, rows: &[Title]) -> Result<u64, CatalogError> {
        let mut t = self.lock();
        if rows
            .iter()
            .filter_map(|title| title.category_id)
            .any(|id| !t.has_id(ImportTable::Categories, id))
        {
            return Err(missing_reference("titles_category_id_fkey"));
        }
        let mut inserted = 0;
        for title in rows {
            if !t.titles.contains_key(&title.id) {
                t.titles.insert(title.id, title.clone());
                inserted += 1;
            }
            t.bump_id(title.id);
        }
        Ok(inserted)
    }

    async fn import_genre_links(&self, links: &[(i64, i64)]) -> Result<u64, CatalogError> {
        let mut t = self.lock();
        if links.iter().any(|&(title_id, genre_id)| {
            !t.has_id(ImportTable::Titles, title_id) || !t.has_id(ImportTable::Genres, genre_id)
        }) {
            return Err(missing_reference("title_genres_fkey"));
        }
        let mut inserted = 0;
        for link in links {
            if t.title_genres.insert(*link) {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn import_reviews(&self, rows: &[Review]) -> Result<u64, CatalogError> {
        let mut t = self.lock();
        if rows.iter().any(|r| {
            !t.has_id(ImportTable::Titles, r.title_id) || !t.has_id(ImportTable::Users, r.post.author_id)
        }) {
            return Err(missing_reference("reviews_fkey"));
        }
        let mut inserted = 0;
        for review in rows {
            let pair_taken = t.reviews.values().any(|r| {
                r.title_id == review.title_id && r.post.author_id == review.post.author_id
            });
            if !t.reviews.contains_key(&review.id) && !pair_taken {
                t.reviews.insert(review.id, review.clone());
                inserted += 1;
            }
            t.bump_id(review.id);
        }
        Ok(inserted)
    }

    async fn import_comments(&self, rows: &[Comment]) -> Result<u64, CatalogError> {
        let mut t = self.lock();
        if rows.iter().any(|c| {
            !t.has_id(ImportTable::Reviews, c.review_id)
                || !t.has_id(ImportTable::Users, c.post.author_id)
        }) {
            return Err(missing_reference("comments_fkey"));
        }
        let mut inserted = 0;
        for comment in rows {
            if !t.comments.contains_key(&comment.id) {
                t.comments.insert(comment.id, comment.clone());
                inserted += 1;
            }
            t.bump_id(comment.id);
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_scores() {
        assert_eq!(mean_score(&[7, 9]), Some(8.0));
        assert_eq!(mean_score(&[10]), Some(10.0));
        assert_eq!(mean_score(&[1, 2]), Some(1.5));
        assert_eq!(mean_score(&[]), None);
    }
}
