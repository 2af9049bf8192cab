/// Error classes a backend call can surface.
///
/// The taxonomy mirrors how failures are reported to the user: auth failures
/// clear stored credentials, rejections carry the server's own message,
/// network and timeout failures get a generic connectivity notice, and
/// contract violations abort the operation outright instead of guessing at
/// missing fields.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication required: {0}")]
    Auth(String),

    /// The backend answered with a non-2xx status. The message is the
    /// server-supplied body message when one was present, otherwise a
    /// generic fallback.
    #[error("{0}")]
    Rejected(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// A success response was missing a field the contract requires
    /// (e.g. an order id). Fatal for the operation that observed it.
    #[error("response contract violated: {0}")]
    Contract(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
