pub mod db;
pub mod repository;

pub use db::SqliteRepository;
pub use repository::{MemoryRepository, ReviewRepository};
