//! Query Facade
//!
//! The only way business code reaches the store. Each attempt leases
//! whichever pool is active at that moment, so a failover between attempts
//! is picked up transparently.

use std::future::Future;
use std::sync::Arc;

use crate::error::{QueryTimedOut, StoreError, StoreResult};
use crate::pool::{PoolConnector, StorePool};
use crate::postgres::PgConnector;
use crate::retry::RetryPolicy;
use crate::supervisor::{ConnectionSupervisor, SupervisorStatus};

/// Handle type operations receive for connector `C`
pub type HandleOf<C> = <<C as PoolConnector>::Pool as StorePool>::Handle;

pub struct QueryFacade<C: PoolConnector> {
    supervisor: Arc<ConnectionSupervisor<C>>,
    policy: RetryPolicy,
}

/// Facade over PostgreSQL pools
pub type PgQueryFacade = QueryFacade<PgConnector>;

impl<C: PoolConnector> Clone for QueryFacade<C> {
    fn clone(&self) -> Self {
        Self {
            supervisor: Arc::clone(&self.supervisor),
            policy: self.policy,
        }
    }
}

impl<C: PoolConnector> QueryFacade<C> {
    pub fn new(supervisor: Arc<ConnectionSupervisor<C>>) -> Self {
        let policy = RetryPolicy::query(supervisor.retry_unit());
        Self { supervisor, policy }
    }

    /// Override the retry schedule
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor<C>> {
        &self.supervisor
    }

    pub async fn status(&self) -> SupervisorStatus {
        self.supervisor.status().await
    }

    /// Run `op` against the active pool
    ///
    /// Transient failures (including exceeding the target's query timeout)
    /// are retried per the policy and the last one is returned unchanged.
    /// Anything else is returned after the first attempt. `op` may run more
    /// than once, so it must be safe to repeat as given.
    pub async fn execute<T, F, Fut>(&self, op: F) -> StoreResult<T>
    where
        F: Fn(HandleOf<C>) -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let op = &op;
        let supervisor = &self.supervisor;
        self.policy
            .run(StoreError::is_transient, move |attempt| async move {
                let lease = supervisor.lease().await?;
                let timeout = lease.query_timeout();
                match tokio::time::timeout(timeout, op(lease.handle())).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(
                            attempt,
                            role = %lease.role(),
                            timeout_ms = timeout.as_millis() as u64,
                            "Store operation timed out"
                        );
                        Err(StoreError::transient(QueryTimedOut(timeout)))
                    }
                }
            })
            .await
    }
}
