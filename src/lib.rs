pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{GameService, LinkWorkflow, MetadataService, UserService};
pub use domain::error::{ServiceError, ServiceResult};
pub use domain::traffic::{TrafficHandle, TrafficSimulator};
pub use infra::config::{Config, ConfigError, TrafficConfig};
pub use storage::{MemoryStore, PostgresStore, Store};
