pub mod auth;
pub mod catalog;
pub mod comment;
pub mod review;
pub mod title;
pub mod users;
