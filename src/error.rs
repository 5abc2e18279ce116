/// Error types shared by IP discovery, the DreamHost client and configuration loading.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Could not reach a remote endpoint (connect, TLS, timeout, ...)
    #[error("network error: {0}")]
    Network(String),

    /// Endpoint answered, but with a non-success status, a body we could not
    /// understand, or an application-level refusal
    #[error("provider error: {0}")]
    Provider(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<minreq::Error> for Error {
    fn from(err: minreq::Error) -> Self {
        match err {
            // minreq reports body decoding problems through the same error type
            // as transport failures; those belong to the remote side.
            minreq::Error::SerdeJsonError(e) => Error::Provider(format!("malformed JSON body: {}", e)),
            minreq::Error::InvalidUtf8InBody(e) => Error::Provider(format!("invalid UTF-8 in body: {}", e)),
            other => Error::Network(other.to_string()),
        }
    }
}

impl Error {
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}
