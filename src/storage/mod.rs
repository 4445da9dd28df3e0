mod conflict;
mod repository;

pub use conflict::*;
pub use repository::*;

/// SQL migration for the customers table and the transaction log
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
