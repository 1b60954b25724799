pub type User = entity::user::Model;
pub type RefreshToken = entity::refresh_token::Model;
pub type FavoriteMusic = entity::favorite_music::Model;
