//! Unified error types for the dashboard cache.
//!
//! Error codes:
//! - TIMEFRAME_001: Unsupported timeframe
//! - SEGMENT_001: Default segment could not be resolved
//! - QUERY_001-003: Query backend errors
//! - STORE_001-003: Activity / cache store errors
//! - REFRESH_001: A refresh pass failed part way through
//! - STEP_001: A step exceeded its timeout
//! - VALID_001: Invalid request

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Query backend error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// QUERY_001: Request to the backend failed
    RequestFailed,
    /// QUERY_002: Backend answered with something we could not read
    MalformedResponse,
    /// QUERY_003: Backend kept asking us to wait past the deadline
    Timeout,
}

impl QueryErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestFailed => "QUERY_001",
            Self::MalformedResponse => "QUERY_002",
            Self::Timeout => "QUERY_003",
        }
    }
}

/// Store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// STORE_001: Reading activity or segment data failed
    ReadFailed,
    /// STORE_002: Writing a cache entry failed
    CacheWriteFailed,
    /// STORE_003: Advancing the refresh watermark failed
    WatermarkWriteFailed,
}

impl StoreErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFailed => "STORE_001",
            Self::CacheWriteFailed => "STORE_002",
            Self::WatermarkWriteFailed => "STORE_003",
        }
    }
}

/// Unified error type for the dashboard cache.
#[derive(Debug, Error)]
pub enum Error {
    #[error("[TIMEFRAME_001] unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),

    #[error("[SEGMENT_001] no default segment for tenant {tenant_id}")]
    MissingSegment { tenant_id: String },

    /// Query backend error with code.
    #[error("[{code}] {message}")]
    QueryBackend { code: &'static str, message: String },

    /// Store error with code.
    #[error("[{code}] {message}")]
    Store { code: &'static str, message: String },

    /// A slice failed after `slices_written` slices of the pass were already stored.
    #[error("[REFRESH_001] refresh of slice {slice} failed after {slices_written} slice(s) written: {source}")]
    PartialPassFailure {
        slice: String,
        slices_written: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("[STEP_001] step {step} timed out after {after_secs}s")]
    StepTimeout { step: String, after_secs: u64 },

    #[error("[VALID_001] validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn unsupported_timeframe(value: impl Into<String>) -> Self {
        Self::UnsupportedTimeframe(value.into())
    }

    pub fn missing_segment(tenant_id: impl Into<String>) -> Self {
        Self::MissingSegment {
            tenant_id: tenant_id.into(),
        }
    }

    /// Create a query backend error.
    pub fn query(code: QueryErrorCode, msg: impl Into<String>) -> Self {
        Self::QueryBackend {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a store error.
    pub fn store(code: StoreErrorCode, msg: impl Into<String>) -> Self {
        Self::Store {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn partial_pass(slice: impl Into<String>, slices_written: usize, source: Error) -> Self {
        Self::PartialPassFailure {
            slice: slice.into(),
            slices_written,
            source: Box::new(source),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a step that failed with this error may be attempted again.
    ///
    /// Programmer errors and missing configuration never heal on their own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QueryBackend { .. } | Self::Store { .. } | Self::StepTimeout { .. } => true,
            Self::PartialPassFailure { source, .. } => source.is_retryable(),
            Self::UnsupportedTimeframe(_)
            | Self::MissingSegment { .. }
            | Self::Validation(_)
            | Self::NotFound(_)
            | Self::Serialization(_)
            | Self::Internal(_) => false,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnsupportedTimeframe(_) => 400,
            Self::Validation(_) => 400,
            Self::MissingSegment { .. } => 404,
            Self::NotFound(_) => 404,
            Self::QueryBackend { .. } => 502,
            Self::StepTimeout { .. } => 504,
            Self::PartialPassFailure { source, .. } => source.http_status(),
            Self::Store { .. } => 500,
            Self::Serialization(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::UnsupportedTimeframe(_) => Some("TIMEFRAME_001"),
            Self::MissingSegment { .. } => Some("SEGMENT_001"),
            Self::QueryBackend { code, .. } => Some(code),
            Self::Store { code, .. } => Some(code),
            Self::PartialPassFailure { .. } => Some("REFRESH_001"),
            Self::StepTimeout { .. } => Some("STEP_001"),
            Self::Validation(_) => Some("VALID_001"),
            _ => None,
        }
    }
}
