//! # resilient-rdbc
//!
//! Connection resilience and retry orchestration for long-running relational
//! database extraction jobs.
//!
//! Transient network drops, database restarts, bastion/SSH-tunnel closures
//! and mid-fetch failures must not abort an extraction job outright: they are
//! retried with bounded attempts and exponential backoff, and kept distinct
//! from permanent user-configuration errors. The crate owns the abstract
//! connection lifecycle (connect-with-retry, query-with-retry,
//! reconnect-on-error, liveness probing), the SSH-tunnel awareness that
//! changes failure semantics when a local tunnel is in use, and the DSN
//! inspection that detects tunnel usage.
//!
//! Actual network I/O and SQL execution live behind the [`DbDriver`]
//! capability trait, implemented by the concrete wire-protocol adapters.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use resilient_rdbc::prelude::*;
//!
//! let config = ConnectionConfig::new("mysql:host=127.0.0.1;port=33006;dbname=extraction")
//!     .with_connect_max_retries(3)
//!     .with_init_query("SET NAMES utf8");
//!
//! let mut conn = DbConnection::connect(my_driver, config).await?;
//!
//! // Plain query with retry
//! let rows = conn.query("SELECT id, name FROM users", 5).await?.fetch_all().await?;
//!
//! // Fetch + process inside the retry boundary; a mid-fetch connection loss
//! // re-runs the query instead of returning partial rows
//! let count = conn
//!     .query_and_process("SELECT * FROM events", 5, |mut result| async move {
//!         let mut n = 0;
//!         while let Some(_row) = result.next_row().await? {
//!             n += 1;
//!         }
//!         Ok(n)
//!     })
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod connection;
pub mod dsn;
pub mod error;
pub mod retry;
pub mod tunnel;
pub mod types;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::connection::{
        ConnectionConfig, DbConnection, DbDriver, BASE_RETRYABLE_KINDS,
        DEFAULT_CONNECT_MAX_RETRIES, DEFAULT_QUERY_MAX_RETRIES,
    };
    pub use crate::dsn::DsnParser;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::retry::{RetryProxy, DEFAULT_BACKOFF_BASE};
    pub use crate::tunnel::TunnelState;
    pub use crate::types::{QueryResult, Row, RowFetch, Value};
}

// Re-export commonly used items at crate root
pub use connection::{ConnectionConfig, DbConnection, DbDriver};
pub use error::{Error, ErrorKind, Result};
pub use types::{QueryResult, Row, Value};
