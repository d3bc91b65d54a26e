pub mod config;
pub mod database;
pub mod game_repository;
pub mod job_repository;

pub use config::DatabaseConfig;
pub use database::Database;
pub use game_repository::{GameRecord, GameRepository};
pub use job_repository::ScrapeJobRepository;
