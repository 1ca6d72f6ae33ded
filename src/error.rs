//! Error types and handling for the packet cache

/// Result type alias for packet cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error types raised by the packet cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing allocator could not satisfy a request
    #[error("Allocation failed: requested {requested} bytes - {message}")]
    AllocationFailed { requested: usize, message: String },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A payload write was attempted while other references alias the payload
    #[error("Payload is shared by {refs} references")]
    SharedPayload { refs: usize },

    /// Insufficient space in the payload
    #[error("Insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// The trim timer could not be started
    #[error("Timer error: {message}")]
    Timer {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl CacheError {
    /// Create an allocation failure error
    pub fn allocation_failed(requested: usize, message: impl Into<String>) -> Self {
        Self::AllocationFailed {
            requested,
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a shared payload error
    pub fn shared_payload(refs: usize) -> Self {
        Self::SharedPayload { refs }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create a timer error from a thread spawn failure
    pub fn timer(source: std::io::Error, context: &str) -> Self {
        Self::Timer {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Whether the caller should treat this as a transient out-of-memory condition
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }
}
