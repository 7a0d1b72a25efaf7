//! Pool Lifecycle
//!
//! [`StorePool`] and [`PoolConnector`] are the seams a concrete driver plugs
//! into. [`ManagedPool`] wraps one driver pool with an explicit state machine
//! (`Initializing → Ready → Draining → Closed`) and counts in-flight leases so
//! shutdown can drain before closing.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::config::{ConnectionTarget, TargetRole};
use crate::error::{StoreError, StoreResult};

/// A live pool of physical connections bound to one target
pub trait StorePool: Send + Sync + 'static {
    /// What operations receive to talk to the store (e.g. `sqlx::PgPool`)
    type Handle: Clone + Send + Sync + 'static;

    fn handle(&self) -> Self::Handle;

    /// Cheap round trip proving the target is reachable
    fn probe(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Close every physical connection
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Builds pools from connection targets
pub trait PoolConnector: Send + Sync + 'static {
    type Pool: StorePool;

    fn connect(
        &self,
        target: &ConnectionTarget,
    ) -> impl Future<Output = StoreResult<Self::Pool>> + Send;
}

/// Lifecycle state of a [`ManagedPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Initializing = 0,
    Ready = 1,
    Draining = 2,
    Closed = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Initializing,
            1 => PoolState::Ready,
            2 => PoolState::Draining,
            _ => PoolState::Closed,
        }
    }
}

/// A driver pool plus lifecycle state and in-flight accounting
pub struct ManagedPool<P: StorePool> {
    pool: P,
    role: TargetRole,
    addr: String,
    query_timeout: Duration,
    state: AtomicU8,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl<P: StorePool> ManagedPool<P> {
    pub fn new(pool: P, role: TargetRole, target: &ConnectionTarget) -> Self {
        Self {
            pool,
            role,
            addr: target.addr(),
            query_timeout: target.timeouts.query,
            state: AtomicU8::new(PoolState::Initializing as u8),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn role(&self) -> TargetRole {
        self.role
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) async fn probe(&self) -> StoreResult<()> {
        self.pool.probe().await
    }

    /// `Initializing → Ready`
    pub(crate) fn mark_ready(&self) {
        let _ = self.state.compare_exchange(
            PoolState::Initializing as u8,
            PoolState::Ready as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Take a lease on the pool
    ///
    /// Fails with [`StoreError::Draining`] unless the pool is `Ready`. The
    /// counter is bumped before the state check so a concurrent
    /// [`ManagedPool::drain`] either sees this lease or makes us back out.
    pub fn acquire(self: &Arc<Self>) -> StoreResult<PoolLease<P>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let lease = PoolLease {
            pool: Arc::clone(self),
        };
        match self.state() {
            PoolState::Ready => Ok(lease),
            PoolState::Initializing => Err(StoreError::Unavailable),
            PoolState::Draining | PoolState::Closed => Err(StoreError::Draining),
        }
    }

    /// Stop accepting leases and wait for outstanding ones
    ///
    /// Returns the number of leases still held when `timeout` elapsed.
    pub async fn drain(&self, timeout: Duration) -> Result<(), usize> {
        self.state
            .fetch_max(PoolState::Draining as u8, Ordering::SeqCst);

        let wait_idle = async {
            loop {
                let notified = self.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait_idle)
            .await
            .map_err(|_| self.in_flight())
    }

    /// Close the underlying pool (idempotent)
    pub async fn close(&self) {
        let previous = self.state.swap(PoolState::Closed as u8, Ordering::SeqCst);
        if previous != PoolState::Closed as u8 {
            self.pool.close().await;
        }
    }
}

/// In-flight guard; releasing it may complete a pending drain
pub struct PoolLease<P: StorePool> {
    pool: Arc<ManagedPool<P>>,
}

impl<P: StorePool> PoolLease<P> {
    pub fn handle(&self) -> P::Handle {
        self.pool.pool.handle()
    }

    pub fn role(&self) -> TargetRole {
        self.pool.role
    }

    pub fn query_timeout(&self) -> Duration {
        self.pool.query_timeout
    }
}

impl<P: StorePool> Drop for PoolLease<P> {
    fn drop(&mut self) {
        if self.pool.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.pool.idle.notify_waiters();
        }
    }
}
