pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod storage;

pub use config::StoreConfig;
pub use domain::*;
pub use storage::Repository;
