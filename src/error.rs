// src/error.rs

/// Failures of a single page fetch. Every variant is terminal for the current
/// navigation and renders as the error screen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("No practice ID provided.")]
    MissingPracticeId,
    #[error("Failed to fetch {what}: {status} {status_text}")]
    RequestFailed {
        what: &'static str,
        status: u16,
        status_text: String,
    },
    #[error("{0}")]
    Parse(String),
    #[error("Received unexpected data format from the server.")]
    UnexpectedFormat,
    #[error("Could not reach server.")]
    Unreachable(String),
}

/// Raised by a `Transport` before any HTTP status is known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("server unreachable: {0}")]
    Unreachable(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Unreachable(detail) | TransportError::Other(detail) => {
                FetchError::Unreachable(detail)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SmsError {
    #[error("An SMS is already being sent. Please wait for it to finish.")]
    AlreadySending,
    #[error("No TAM phone number on record for this customer.")]
    NoPhoneOnRecord,
    #[error("SMS request failed with status {status}")]
    RequestFailed { status: u16 },
    #[error("SMS was not sent: {0}")]
    Rejected(String),
    #[error("Could not reach the SMS service.")]
    Unreachable,
    #[error("SMS service replied with an unexpected body: {0}")]
    BadReply(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no sortable column named {0:?} on this page")]
pub struct UnknownColumn(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no customer with id {0:?}")]
    UnknownCustomer(String),
    #[error(transparent)]
    Sms(#[from] SmsError),
}
