pub mod app_config;
pub mod database;
pub mod images;
pub mod memory_repo;
pub mod offer_repo;

pub use database::DbClient;
pub use images::LocalImageStore;
pub use memory_repo::InMemoryOfferRepository;
pub use offer_repo::PostgresOfferRepository;
