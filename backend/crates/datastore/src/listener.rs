//! Pool lifecycle observer
//!
//! Invoked synchronously by the supervisor at fixed points. Implementations
//! must not block.

use crate::config::TargetRole;
use crate::error::StoreError;

pub trait PoolListener: Send + Sync + 'static {
    /// A pool passed its connectivity probe and became active
    fn on_connect(&self, _role: TargetRole, _addr: &str) {}

    /// A probe attempt or pool construction failed
    fn on_error(&self, _role: TargetRole, _addr: &str, _attempt: u32, _error: &StoreError) {}

    /// The active pool reference was swapped from primary to fallback
    fn on_failover(&self, _from: &str, _to: &str) {}

    /// The active pool was closed during shutdown
    fn on_close(&self, _role: TargetRole, _addr: &str) {}
}

/// Default listener: structured log events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl PoolListener for TracingListener {
    fn on_connect(&self, role: TargetRole, addr: &str) {
        tracing::info!(%role, addr = %addr, "Store pool connected");
    }

    fn on_error(&self, role: TargetRole, addr: &str, attempt: u32, error: &StoreError) {
        tracing::warn!(
            %role,
            addr = %addr,
            attempt,
            error = %error,
            source = ?std::error::Error::source(error).map(|s| s.to_string()),
            "Store connectivity probe failed"
        );
    }

    fn on_failover(&self, from: &str, to: &str) {
        tracing::warn!(from = %from, to = %to, "Failing over to fallback store target");
    }

    fn on_close(&self, role: TargetRole, addr: &str) {
        tracing::info!(%role, addr = %addr, "Store pool closed");
    }
}
