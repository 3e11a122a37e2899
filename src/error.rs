//! Error types for resilient-rdbc
//!
//! Every error carries an [`ErrorKind`] tag. Retry eligibility is a
//! set-membership check on kinds, declared per driver, never a check on
//! runtime type identity.

use std::fmt;
use thiserror::Error;

/// Result type for resilient-rdbc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kind tags for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed DSN, bad credentials (terminal, user-facing)
    Configuration,
    /// Transient network/DNS failure while establishing a session
    Connection,
    /// Query execution failed (syntax errors, missing objects)
    Query,
    /// Liveness probe failed; part of the base retried set
    DeadConnection,
    /// Local SSH tunnel listener is gone; terminal at this layer
    TunnelClosed,
    /// A retryable failure that survived all attempts
    Retried,
    /// Any other driver-reported failure
    Driver,
}

impl ErrorKind {
    /// Kinds that `is_alive` reclassifies as a dead connection.
    ///
    /// These are the driver-surfaced failure shapes; terminal kinds such as
    /// `TunnelClosed` and `Configuration` propagate unchanged.
    #[inline]
    pub const fn is_recoverable(self) -> bool {
        matches!(self, Self::Connection | Self::Query | Self::Driver)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Query => write!(f, "query"),
            Self::DeadConnection => write!(f, "dead_connection"),
            Self::TunnelClosed => write!(f, "tunnel_closed"),
            Self::Retried => write!(f, "retried"),
            Self::Driver => write!(f, "driver"),
        }
    }
}

/// Main error type for resilient-rdbc
#[derive(Error, Debug)]
pub enum Error {
    /// User configuration error, never retried
    #[error("configuration error: {message}")]
    Configuration {
        /// Human-readable description
        message: String,
    },

    /// Session establishment failed
    #[error("{message}")]
    Connection {
        /// Human-readable description
        message: String,
        /// Underlying driver error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution failed
    #[error("query error: {message}")]
    Query {
        /// Human-readable description
        message: String,
        /// The statement that failed, if known
        sql: Option<String>,
        /// Underlying driver error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Liveness probe failed
    #[error("Dead connection: {message}")]
    DeadConnection {
        /// Message of the failure that the probe surfaced
        message: String,
    },

    /// The local SSH tunnel listener no longer accepts connections
    #[error("SSH tunnel has been closed.")]
    TunnelClosed,

    /// A retryable failure that exhausted all attempts
    #[error("{message}")]
    Retried {
        /// Number of attempts made, for diagnostics
        try_count: u32,
        /// Message of the original failure
        message: String,
        /// The original failure
        #[source]
        source: Box<Error>,
    },

    /// Driver-reported failure with no more specific classification
    #[error("driver error: {message}")]
    Driver {
        /// Human-readable description
        message: String,
        /// Underlying driver error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Get the error kind tag
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Query { .. } => ErrorKind::Query,
            Self::DeadConnection { .. } => ErrorKind::DeadConnection,
            Self::TunnelClosed => ErrorKind::TunnelClosed,
            Self::Retried { .. } => ErrorKind::Retried,
            Self::Driver { .. } => ErrorKind::Driver,
        }
    }

    /// Number of attempts made, for retried-and-exhausted failures
    pub fn try_count(&self) -> Option<u32> {
        match self {
            Self::Retried { try_count, .. } => Some(*try_count),
            _ => None,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error carrying the failed statement
    pub fn query_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a dead-connection error
    pub fn dead_connection(message: impl Into<String>) -> Self {
        Self::DeadConnection {
            message: message.into(),
        }
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
            source: None,
        }
    }

    /// Create a driver error with source
    pub fn driver_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Driver {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap an exhausted retryable failure, preserving the attempt count
    pub fn retried(try_count: u32, source: Error) -> Self {
        Self::Retried {
            try_count,
            message: source.to_string(),
            source: Box::new(source),
        }
    }

    /// Wrap the last failure of an exhausted connect-with-retry.
    ///
    /// Terminal for the caller; the session was never established.
    pub fn connect_failed(source: Error) -> Self {
        Self::Connection {
            message: format!("Error connecting to DB: {source}"),
            source: Some(Box::new(source)),
        }
    }
}
