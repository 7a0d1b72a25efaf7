//! PostgreSQL connector

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

use crate::config::{ConnectionTarget, TlsMode};
use crate::error::StoreResult;
use crate::pool::{PoolConnector, StorePool};

/// Builds lazily-connecting sqlx pools; reachability is proven by the probe
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl PoolConnector for PgConnector {
    type Pool = PgStorePool;

    async fn connect(&self, target: &ConnectionTarget) -> StoreResult<PgStorePool> {
        let options = PgConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .database(&target.database)
            .username(&target.user)
            .password(&target.password)
            .ssl_mode(ssl_mode(target.tls));

        let pool = PgPoolOptions::new()
            .min_connections(target.pool.min_connections)
            .max_connections(target.pool.max_connections)
            .acquire_timeout(target.timeouts.connect)
            .idle_timeout(Some(target.timeouts.idle))
            .connect_lazy_with(options);

        Ok(PgStorePool { pool })
    }
}

fn ssl_mode(tls: TlsMode) -> PgSslMode {
    match tls {
        TlsMode::Disable => PgSslMode::Disable,
        TlsMode::Prefer => PgSslMode::Prefer,
        TlsMode::Require => PgSslMode::Require,
        TlsMode::VerifyCa => PgSslMode::VerifyCa,
        TlsMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

pub struct PgStorePool {
    pool: PgPool,
}

impl StorePool for PgStorePool {
    type Handle = PgPool;

    fn handle(&self) -> PgPool {
        self.pool.clone()
    }

    async fn probe(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_mapping() {
        assert!(matches!(ssl_mode(TlsMode::Disable), PgSslMode::Disable));
        assert!(matches!(ssl_mode(TlsMode::VerifyFull), PgSslMode::VerifyFull));
    }
}
