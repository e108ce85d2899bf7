//! Store-agnostic business rules. Handlers call into these
//! with `DBClient`; tests call them with the in-memory store.

pub mod accounts;
pub mod comments;
pub mod reviews;
