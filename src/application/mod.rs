// Application layer - use cases and orchestration.
// The service owns every unit of work; the repository only runs statements
// inside the scope it is handed.

pub mod error;
pub mod metrics;
pub mod service;

pub use error::*;
pub use metrics::*;
pub use service::*;
