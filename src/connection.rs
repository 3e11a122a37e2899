//! Connection lifecycle orchestration
//!
//! [`DbConnection`] owns the connect/reconnect/query/liveness protocol on top
//! of a driver-specific [`DbDriver`] capability implementation. It never
//! performs network I/O itself beyond the tunnel-liveness probe; all SQL
//! execution is delegated to the driver.

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, ErrorKind, Result};
use crate::retry::{RetryProxy, DEFAULT_BACKOFF_BASE};
use crate::tunnel::TunnelState;
use crate::types::QueryResult;

/// Default attempt budget for the initial connect
pub const DEFAULT_CONNECT_MAX_RETRIES: u32 = 3;

/// Default attempt budget for queries
pub const DEFAULT_QUERY_MAX_RETRIES: u32 = 5;

/// Kinds retried regardless of what the driver declares.
///
/// `DeadConnection` is produced by [`DbConnection::is_alive`] and must always
/// be eligible, otherwise a mid-fetch connection loss could never be retried.
pub const BASE_RETRYABLE_KINDS: &[ErrorKind] = &[ErrorKind::DeadConnection];

/// Driver capability contract consumed by the orchestrator.
///
/// Implemented by the concrete wire-protocol adapters (PDO-like, ODBC-like),
/// which own all actual network I/O and SQL execution. The handle is opaque
/// to the orchestrator and replaced wholesale on reconnect, never mutated.
#[async_trait]
pub trait DbDriver: Send + Sync {
    /// Opaque, driver-owned resource representing a live session
    type Handle: Send;

    /// Establish (or re-establish) the underlying session
    async fn connect(&self) -> Result<Self::Handle>;

    /// Execute one statement on the given session
    async fn do_query(&self, handle: &mut Self::Handle, sql: &str) -> Result<QueryResult>;

    /// Execute a trivial round-trip to confirm the session is usable
    async fn test_connection(&self, handle: &mut Self::Handle) -> Result<()> {
        self.do_query(handle, "SELECT 1").await.map(|_| ())
    }

    /// Driver-specific string escaping, no retry semantics
    fn quote(&self, s: &str) -> String;

    /// Driver-specific identifier escaping, no retry semantics
    fn quote_identifier(&self, s: &str) -> String;

    /// Failure kinds that are retry-eligible for this driver
    fn retryable_kinds(&self) -> &[ErrorKind];
}

/// Configuration for establishing a [`DbConnection`]
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Driver connection string; consumed only for tunnel-state inference,
    /// otherwise opaque driver-specific text
    pub dsn: String,
    /// Attempt budget for the initial connect (clamped to at least 1)
    pub connect_max_retries: u32,
    /// Administrative statements run once per successful connect, before the
    /// connection is considered ready
    pub init_queries: Vec<String>,
    /// Base delay for exponential retry backoff
    pub backoff_base: Duration,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // DSNs routinely embed credentials (Pwd=, Password=), so never print
        // the raw text.
        f.debug_struct("ConnectionConfig")
            .field("dsn", &"***")
            .field("connect_max_retries", &self.connect_max_retries)
            .field("init_queries", &self.init_queries)
            .field("backoff_base", &self.backoff_base)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create configuration with defaults for the given DSN
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            connect_max_retries: DEFAULT_CONNECT_MAX_RETRIES,
            init_queries: Vec::new(),
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Set the connect attempt budget
    pub fn with_connect_max_retries(mut self, retries: u32) -> Self {
        self.connect_max_retries = retries;
        self
    }

    /// Append an initialization query
    pub fn with_init_query(mut self, sql: impl Into<String>) -> Self {
        self.init_queries.push(sql.into());
        self
    }

    /// Replace the initialization query list
    pub fn with_init_queries(mut self, queries: Vec<String>) -> Self {
        self.init_queries = queries;
        self
    }

    /// Set the base backoff delay
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }
}

/// Connection lifecycle orchestrator.
///
/// Owns exactly one live driver handle at a time. Queries are wrapped in a
/// bounded-attempt retry; on failure the orchestrator consults the tunnel
/// state computed at construction, attempts a best-effort reconnect, and
/// lets the retry policy decide whether to re-invoke.
pub struct DbConnection<D: DbDriver> {
    driver: D,
    handle: D::Handle,
    tunnel: TunnelState,
    init_queries: Vec<String>,
    backoff_base: Duration,
    retryable: HashSet<ErrorKind>,
}

impl<D: DbDriver> std::fmt::Debug for DbConnection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConnection")
            .field("tunnel", &self.tunnel)
            .field("init_queries", &self.init_queries)
            .field("backoff_base", &self.backoff_base)
            .field("retryable", &self.retryable)
            .finish_non_exhaustive()
    }
}

impl<D: DbDriver> DbConnection<D> {
    /// Connect with retry and run the initialization queries.
    ///
    /// Tunnel state is derived from the DSN here, once, and never recomputed.
    /// On exhausted retries this fails with a terminal connection error
    /// wrapping the last underlying failure; the caller must not retry it.
    pub async fn connect(driver: D, config: ConnectionConfig) -> Result<Self> {
        let tunnel = TunnelState::from_dsn(&config.dsn);
        let retryable: HashSet<ErrorKind> = driver
            .retryable_kinds()
            .iter()
            .chain(BASE_RETRYABLE_KINDS)
            .copied()
            .collect();

        let mut proxy = RetryProxy::new(config.connect_max_retries, retryable.clone())
            .with_backoff_base(config.backoff_base);

        let driver_ref = &driver;
        let init_queries = &config.init_queries;
        let ((), connected) = proxy
            .call((), move |()| async move {
                ((), Self::establish(driver_ref, init_queries).await)
            })
            .await;
        let handle = connected.map_err(Error::connect_failed)?;

        Ok(Self {
            driver,
            handle,
            tunnel,
            init_queries: config.init_queries,
            backoff_base: config.backoff_base,
            retryable,
        })
    }

    /// One full session establishment: connect, then init queries in order.
    async fn establish(driver: &D, init_queries: &[String]) -> Result<D::Handle> {
        let mut handle = driver.connect().await?;
        for sql in init_queries {
            info!("Running query \"{sql}\".");
            driver.do_query(&mut handle, sql).await?;
        }
        Ok(handle)
    }

    /// Low-level session handle
    pub fn handle(&self) -> &D::Handle {
        &self.handle
    }

    /// Mutable low-level session handle
    pub fn handle_mut(&mut self) -> &mut D::Handle {
        &mut self.handle
    }

    /// The underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Tunnel facts derived from the DSN at construction
    pub fn tunnel(&self) -> &TunnelState {
        &self.tunnel
    }

    /// Driver-specific string escaping
    pub fn quote(&self, s: &str) -> String {
        self.driver.quote(s)
    }

    /// Driver-specific identifier escaping
    pub fn quote_identifier(&self, s: &str) -> String {
        self.driver.quote_identifier(s)
    }

    /// Execute a trivial round-trip on the live session
    pub async fn test_connection(&mut self) -> Result<()> {
        self.driver.test_connection(&mut self.handle).await
    }

    /// Confirm the session is still usable.
    ///
    /// A recoverable-kind failure is re-raised as `DeadConnection`, which is
    /// part of the base retried set; any other failure propagates unchanged.
    /// Succeeds with no side effect.
    pub async fn is_alive(&mut self) -> Result<()> {
        match self.test_connection().await {
            Ok(()) => Ok(()),
            Err(e) if e.kind().is_recoverable() => Err(Error::dead_connection(e.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Execute a query with up to `max_retries` attempts.
    ///
    /// Returns the driver's result set; fetch errors discovered later are the
    /// caller's to handle (see [`query_and_process`](Self::query_and_process)
    /// for the variant that retries them).
    pub async fn query(&mut self, sql: &str, max_retries: u32) -> Result<QueryResult> {
        let mut proxy = self.retry_proxy(max_retries);
        let (_, result) = proxy
            .call(self, |conn| async move {
                let result = conn.query_reconnect_on_error(sql).await;
                (conn, result)
            })
            .await;

        result.map_err(|e| Self::wrap_exhausted(&proxy, e))
    }

    /// Execute a query and run `processor` over the result inside the retried
    /// unit, followed by exactly one liveness check.
    ///
    /// Drivers can surface connection loss lazily, while rows are being
    /// fetched; bundling fetch + process + liveness probe inside the retry
    /// boundary means a mid-fetch failure re-runs the full query from scratch
    /// instead of returning partial rows. Success of the trailing `is_alive`
    /// means all data has been extracted.
    pub async fn query_and_process<T, P, Fut>(
        &mut self,
        sql: &str,
        max_retries: u32,
        processor: P,
    ) -> Result<T>
    where
        P: FnMut(QueryResult) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut proxy = self.retry_proxy(max_retries);
        let (_, result) = proxy
            .call((self, processor), |(conn, mut processor)| async move {
                let result = match conn.query_reconnect_on_error(sql).await {
                    Ok(db_result) => match processor(db_result).await {
                        Ok(value) => conn.is_alive().await.map(|()| value),
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                };
                ((conn, processor), result)
            })
            .await;

        result.map_err(|e| Self::wrap_exhausted(&proxy, e))
    }

    /// One query attempt with reconnect-on-error semantics.
    ///
    /// On failure: a tunneled session whose local listener is gone fails
    /// immediately with `TunnelClosed` (reconnecting through a closed tunnel
    /// cannot succeed); otherwise a best-effort reconnect runs and the
    /// original query error is re-raised for the retry policy to evaluate.
    async fn query_reconnect_on_error(&mut self, sql: &str) -> Result<QueryResult> {
        debug!("Running query \"{sql}\".");
        match self.driver.do_query(&mut self.handle, sql).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if self.tunnel.is_tunneled() && !self.tunnel.is_open().await {
                    return Err(Error::TunnelClosed);
                }
                // Fire-and-forget recovery attempt; its own failure is
                // discarded so the original error keeps root-cause clarity.
                if let Ok(handle) = Self::establish(&self.driver, &self.init_queries).await {
                    self.handle = handle;
                }
                Err(e)
            }
        }
    }

    fn retry_proxy(&self, max_retries: u32) -> RetryProxy {
        RetryProxy::new(max_retries, self.retryable.clone()).with_backoff_base(self.backoff_base)
    }

    /// Reclassify an exhausted retryable failure, preserving the attempt
    /// count; non-retryable failures pass through untouched.
    fn wrap_exhausted(proxy: &RetryProxy, e: Error) -> Error {
        if proxy.is_retryable(e.kind()) {
            Error::retried(proxy.try_count(), e)
        } else {
            e
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::new("mysql:host=localhost;port=3306;dbname=testdb");

        assert_eq!(config.connect_max_retries, DEFAULT_CONNECT_MAX_RETRIES);
        assert!(config.init_queries.is_empty());
        assert_eq!(config.backoff_base, DEFAULT_BACKOFF_BASE);
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new("pgsql:host=localhost;port=5432;dbname=testdb")
            .with_connect_max_retries(5)
            .with_init_query("SET NAMES utf8")
            .with_init_query("SET SESSION wait_timeout = 600")
            .with_backoff_base(Duration::from_millis(50));

        assert_eq!(config.connect_max_retries, 5);
        assert_eq!(config.init_queries.len(), 2);
        assert_eq!(config.backoff_base, Duration::from_millis(50));
    }

    #[test]
    fn test_connection_config_debug_redacts_dsn() {
        let config = ConnectionConfig::new("Driver={X};Server=localhost;Pwd=secret;");
        let debug = format!("{config:?}");

        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }
}
