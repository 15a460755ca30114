use rust_decimal::Decimal;
use thiserror::Error;

/// Malformed or out-of-range input to a pure operation. The only error class
/// that may propagate to the caller, and only when detected before any
/// backend is invoked.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("symbol must be non-empty")]
    EmptySymbol,

    #[error("price must be positive, got {value}")]
    NonPositivePrice { value: Decimal },

    #[error("{field} out of range: {value} (expected [{min}, {max}])")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Blacklisted field detected in an outbound payload. Aborts the remote path
/// (fail closed), never the request.
#[derive(Debug, Error)]
#[error("sensitive fields detected in outbound payload: {fields:?}")]
pub struct SensitiveDataError {
    pub fields: Vec<String>,
}

/// Remote API transport/protocol failures.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed API envelope: {0}")]
    MalformedEnvelope(String),

    #[error("API response contained no completion")]
    EmptyCompletion,

    #[error("remote API failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Remote completion text that does not satisfy the strict response contract.
/// Unlike the local model's tolerant parsing, these are never coerced.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid signal value: {0}")]
    InvalidSignal(String),

    #[error("{field} out of range: {value} (expected [0, 1])")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Cache store failures. Reads degrade to misses, writes are best-effort.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed cache entry for key {key}: {reason}")]
    MalformedEntry { key: String, reason: String },
}

/// Sum of all inference failures, used across port boundaries. Every variant
/// except `Validation` is absorbed by the orchestrator's fallback chain.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    SensitiveData(#[from] SensitiveDataError),

    #[error(transparent)]
    RemoteApi(#[from] RemoteApiError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}
