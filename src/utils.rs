pub mod confirmation;
pub mod token;
pub mod validators;
