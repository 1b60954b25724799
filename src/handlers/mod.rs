pub mod auth;
pub mod favorites;
