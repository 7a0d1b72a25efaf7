//! Connection Supervisor
//!
//! Owns the single active pool reference. Readers take the `RwLock` read side
//! for the instant it takes to lease; the write side is only taken under the
//! swap mutex, so initialization, failover and shutdown never interleave and
//! no reader ever sees a pool that has not passed its probe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::config::{ConnectionTarget, StoreConfig, TargetRegistry, TargetRole};
use crate::error::{StoreError, StoreResult};
use crate::listener::{PoolListener, TracingListener};
use crate::pool::{ManagedPool, PoolConnector, PoolLease};
use crate::retry::RetryPolicy;

/// Externally visible supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    /// `initialize` has not completed yet
    Initializing,
    /// A pool built from this target is active
    Ready(TargetRole),
    /// No usable pool; calls fail with `Unavailable` until restart or operator action
    Degraded,
    /// Shutdown began
    ShutDown,
}

impl SupervisorStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SupervisorStatus::Ready(_))
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SupervisorStatus::Initializing => "initializing",
            SupervisorStatus::Ready(TargetRole::Primary) => "ready(primary)",
            SupervisorStatus::Ready(TargetRole::Fallback) => "ready(fallback)",
            SupervisorStatus::Degraded => "degraded",
            SupervisorStatus::ShutDown => "shut_down",
        }
    }
}

#[derive(Debug, Default)]
struct SwapState {
    initialized: bool,
    failed_over: bool,
}

type Active<C> = Arc<ManagedPool<<C as PoolConnector>::Pool>>;

pub struct ConnectionSupervisor<C: PoolConnector> {
    connector: C,
    registry: TargetRegistry,
    retry_unit: Duration,
    drain_timeout: Duration,
    listener: Arc<dyn PoolListener>,
    active: RwLock<Option<Active<C>>>,
    swap: Mutex<SwapState>,
    initialized: AtomicBool,
    shutting_down: AtomicBool,
}

impl<C: PoolConnector> ConnectionSupervisor<C> {
    pub fn new(connector: C, config: StoreConfig) -> Self {
        Self {
            connector,
            registry: config.registry,
            retry_unit: config.retry_unit,
            drain_timeout: config.drain_timeout,
            listener: Arc::new(TracingListener),
            active: RwLock::new(None),
            swap: Mutex::new(SwapState::default()),
            initialized: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn PoolListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn retry_unit(&self) -> Duration {
        self.retry_unit
    }

    pub async fn status(&self) -> SupervisorStatus {
        if self.shutting_down.load(Ordering::SeqCst) {
            return SupervisorStatus::ShutDown;
        }
        match self.active.read().await.as_ref() {
            Some(pool) => SupervisorStatus::Ready(pool.role()),
            None if self.initialized.load(Ordering::SeqCst) => SupervisorStatus::Degraded,
            None => SupervisorStatus::Initializing,
        }
    }

    /// Establish the primary pool, failing over once if it stays unreachable
    ///
    /// Only configuration errors are returned; an unreachable store leaves the
    /// supervisor `Degraded` rather than failing startup. Calling this again
    /// after it completed is a no-op.
    pub async fn initialize(&self) -> StoreResult<SupervisorStatus> {
        let mut swap = self.swap.lock().await;
        if swap.initialized {
            drop(swap);
            return Ok(self.status().await);
        }

        let primary = self.registry.primary();
        let outcome = match self.establish(TargetRole::Primary, primary).await {
            Ok(pool) => {
                *self.active.write().await = Some(pool);
                Ok(())
            }
            Err(err @ StoreError::Config(_)) => Err(err),
            Err(err) if self.registry.fallback().is_some() => {
                tracing::error!(
                    addr = %primary.addr(),
                    error = %err,
                    "Primary store unreachable after probe budget"
                );
                self.failover_locked(&mut swap).await.map(|_| ())
            }
            Err(err) => {
                tracing::error!(
                    addr = %primary.addr(),
                    error = %err,
                    "Primary store unreachable and no fallback configured; running degraded"
                );
                Ok(())
            }
        };

        swap.initialized = true;
        self.initialized.store(true, Ordering::SeqCst);
        drop(swap);

        match outcome {
            Err(err @ StoreError::Config(_)) => Err(err),
            _ => Ok(self.status().await),
        }
    }

    /// One-shot swap of the active pool to the fallback target
    ///
    /// Serialized with initialization and shutdown. A second call after the
    /// swap happened is a no-op; the supervisor never swaps back to primary.
    pub async fn failover(&self) -> StoreResult<SupervisorStatus> {
        let mut swap = self.swap.lock().await;
        self.failover_locked(&mut swap).await
    }

    async fn failover_locked(&self, swap: &mut SwapState) -> StoreResult<SupervisorStatus> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(StoreError::Draining);
        }
        if swap.failed_over {
            return Ok(self.current_status().await);
        }
        let Some(fallback) = self.registry.fallback() else {
            return Err(StoreError::Unavailable);
        };
        swap.failed_over = true;

        let from = match self.active.read().await.as_ref() {
            Some(pool) => pool.addr().to_string(),
            None => self.registry.primary().addr(),
        };
        self.listener.on_failover(&from, &fallback.addr());

        match self.establish(TargetRole::Fallback, fallback).await {
            Ok(pool) => {
                let previous = self.active.write().await.replace(pool);
                if let Some(previous) = previous {
                    self.retire(previous).await;
                }
                Ok(SupervisorStatus::Ready(TargetRole::Fallback))
            }
            Err(err) => {
                tracing::error!(
                    addr = %fallback.addr(),
                    error = %err,
                    "Fallback store unreachable"
                );
                Err(err)
            }
        }
    }

    /// Status without going through `shutting_down` (caller holds the swap lock)
    async fn current_status(&self) -> SupervisorStatus {
        match self.active.read().await.as_ref() {
            Some(pool) => SupervisorStatus::Ready(pool.role()),
            None => SupervisorStatus::Degraded,
        }
    }

    /// Connect and probe one target; on success the pool is `Ready`
    async fn establish(&self, role: TargetRole, target: &ConnectionTarget) -> StoreResult<Active<C>> {
        let addr = target.addr();
        let raw = match self.connector.connect(target).await {
            Ok(raw) => raw,
            Err(err) => {
                self.listener.on_error(role, &addr, 1, &err);
                return Err(err);
            }
        };

        let pool = Arc::new(ManagedPool::new(raw, role, target));
        let probe_pool = &pool;
        let listener = &self.listener;
        let probed = RetryPolicy::probe(self.retry_unit)
            .run(
                |err: &StoreError| {
                    !matches!(err, StoreError::Config(_) | StoreError::AccessDenied(_))
                },
                move |attempt| async move {
                    let result = probe_pool.probe().await;
                    if let Err(err) = &result {
                        listener.on_error(role, probe_pool.addr(), attempt, err);
                    }
                    result
                },
            )
            .await;

        match probed {
            Ok(()) => {
                pool.mark_ready();
                self.listener.on_connect(role, pool.addr());
                Ok(pool)
            }
            Err(StoreError::AccessDenied(source)) => {
                pool.close().await;
                Err(StoreError::Config(format!(
                    "{addr} rejected the configured credentials: {source}"
                )))
            }
            Err(err) => {
                pool.close().await;
                Err(err)
            }
        }
    }

    /// Drain and close a pool that is no longer the active one
    async fn retire(&self, pool: Active<C>) {
        if let Err(in_flight) = pool.drain(self.drain_timeout).await {
            tracing::warn!(
                addr = %pool.addr(),
                in_flight,
                "Retired pool still had operations in flight; closing anyway"
            );
        }
        pool.close().await;
        self.listener.on_close(pool.role(), pool.addr());
    }

    /// Lease the current active pool
    pub async fn lease(&self) -> StoreResult<PoolLease<C::Pool>> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(StoreError::Draining);
        }
        match self.active.read().await.as_ref() {
            Some(pool) => pool.acquire(),
            None => Err(StoreError::Unavailable),
        }
    }

    /// Stop acquisitions, drain in-flight work, close the active pool
    ///
    /// The pool is closed even if draining timed out; that case is reported
    /// as [`StoreError::DrainTimedOut`].
    pub async fn shutdown(&self) -> StoreResult<()> {
        self.shutting_down.store(true, Ordering::SeqCst);
        let _swap = self.swap.lock().await;

        let Some(pool) = self.active.write().await.take() else {
            tracing::info!("Store shutdown: no active pool");
            return Ok(());
        };

        tracing::info!(
            addr = %pool.addr(),
            in_flight = pool.in_flight(),
            "Draining store pool"
        );
        let drained = pool.drain(self.drain_timeout).await;
        pool.close().await;
        self.listener.on_close(pool.role(), pool.addr());

        match drained {
            Ok(()) => Ok(()),
            Err(in_flight) => Err(StoreError::DrainTimedOut { in_flight }),
        }
    }
}
