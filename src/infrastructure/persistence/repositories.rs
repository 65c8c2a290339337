pub mod draw_repository;
pub mod prediction_repository;

pub use draw_repository::SqliteDrawRepository;
pub use prediction_repository::SqlitePredictionRepository;
