pub mod auth_service;
pub mod user_directory;
