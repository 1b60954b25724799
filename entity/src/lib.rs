pub mod favorite_music;
pub mod refresh_token;
pub mod user;
