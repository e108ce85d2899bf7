use chrono::{Datelike, Utc};
use validator::ValidationError;

use crate::error::CatalogError;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const SLUG_MAX_LENGTH: usize = 50;
pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 10;

/// Usernames: ASCII letters, digits and `_ . @ + -`, and never "me" (reserved for `/users/me`).
pub fn check_username(value: &str) -> Result<(), CatalogError> {
    if value.eq_ignore_ascii_case("me") {
        return Err(CatalogError::validation(
            "Username \"me\" is reserved, please choose another one",
        ));
    }
    if value.is_empty() || value.chars().count() > USERNAME_MAX_LENGTH {
        return Err(CatalogError::validation(format!(
            "Username must be between 1 and {} characters",
            USERNAME_MAX_LENGTH
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(CatalogError::validation(
            "Username may contain only latin letters, digits and _ . @ + -",
        ));
    }
    Ok(())
}

/// Release year may not be in the future (checked against the wall clock).
pub fn check_year(year: i32) -> Result<(), CatalogError> {
    let current = Utc::now().year();
    if year > current {
        return Err(CatalogError::validation(format!(
            "Year cannot be later than {}",
            current
        )));
    }
    Ok(())
}

pub fn check_score(score: i16) -> Result<(), CatalogError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(CatalogError::validation(format!(
            "Score must be an integer between {} and {}",
            MIN_SCORE, MAX_SCORE
        )));
    }
    Ok(())
}

// validator-crate adapters used by the DTO derive attributes

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    check_username(value).map_err(|e| invalid("invalid_username", e))
}

pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    check_year(year).map_err(|e| invalid("invalid_year", e))
}

pub fn validate_score(score: i16) -> Result<(), ValidationError> {
    check_score(score).map_err(|e| invalid("invalid_score", e))
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let ok = !slug.is_empty()
        && slug.len() <= SLUG_MAX_LENGTH
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_slug")
            .with_message("Slug may contain only latin letters, digits, - and _".into()))
    }
}

fn invalid(code: &'static str, err: CatalogError) -> ValidationError {
    ValidationError::new(code).with_message(err.to_string().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn me_is_rejected_in_any_case() {
        for name in ["me", "Me", "ME", "mE"] {
            assert!(matches!(
                check_username(name),
                Err(CatalogError::Validation(_))
            ));
        }
    }

    #[test]
    fn usernames_with_forbidden_characters_are_rejected() {
        for name in [
            "bad name", "semi;colon", "slash/", "hash#tag", "star*", "", "Юзер42", "x²",
        ] {
            assert!(check_username(name).is_err(), "{name}");
        }
    }

    #[test]
    fn allowed_username_characters_pass() {
        for name in ["reviewer", "john.doe", "a+b", "x-y_z", "mail@host", "User42", "meme"] {
            assert!(check_username(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn overly_long_username_is_rejected() {
        let name = "a".repeat(USERNAME_MAX_LENGTH + 1);
        assert!(check_username(&name).is_err());
        assert!(check_username(&"a".repeat(USERNAME_MAX_LENGTH)).is_ok());
    }

    #[test]
    fn future_year_is_rejected() {
        let current = Utc::now().year();
        assert!(check_year(current).is_ok());
        assert!(check_year(1895).is_ok());
        assert!(check_year(current + 1).is_err());
    }

    #[test]
    fn score_bounds_are_inclusive() {
        assert!(check_score(1).is_ok());
        assert!(check_score(10).is_ok());
        assert!(check_score(0).is_err());
        assert!(check_score(11).is_err());
        assert!(check_score(-3).is_err());
    }

    #[test]
    fn slugs_are_url_safe() {
        assert!(validate_slug("sci-fi_2").is_ok());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug(&"s".repeat(SLUG_MAX_LENGTH + 1)).is_err());
    }
}
