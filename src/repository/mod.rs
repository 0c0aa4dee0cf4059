pub mod database;
pub mod models;
pub mod query_repository;

pub use database::Database;
pub use models::SavedQuery;
pub use query_repository::QueryRepository;
