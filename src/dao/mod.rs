/// Team and competition state persistence.
pub mod competition_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
