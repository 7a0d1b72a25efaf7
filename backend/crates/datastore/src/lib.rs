//! Store connectivity: target registry, connection supervisor with one-shot
//! failover, and the retrying query facade business code goes through.

pub mod config;
pub mod error;
pub mod facade;
pub mod listener;
pub mod pool;
pub mod postgres;
pub mod retry;
pub mod supervisor;

pub use config::{ConnectionTarget, StoreConfig, TargetRegistry, TargetRole, TlsMode};
pub use error::{ErrorClass, StoreError, StoreResult};
pub use facade::{PgQueryFacade, QueryFacade};
pub use listener::{PoolListener, TracingListener};
pub use pool::{PoolConnector, StorePool};
pub use postgres::{PgConnector, PgStorePool};
pub use retry::RetryPolicy;
pub use supervisor::{ConnectionSupervisor, SupervisorStatus};
