pub mod quote_repo;
pub mod repository_error;
pub mod settings_repo;
