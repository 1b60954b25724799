pub mod jwt;
pub mod middleware;
pub mod password;
pub mod providers;
pub mod session;
