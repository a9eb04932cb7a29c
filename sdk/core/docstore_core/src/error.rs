// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Error types shared by every document store client.

use crate::http::StatusCode;
use std::{borrow::Cow, time::Duration};

/// A convenience alias for `Result` where the error type is hard coded to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of an [`Error`].
///
/// Kinds are split into two families. Transient kinds ([`ErrorKind::is_transient`]) are
/// expected to clear up on their own and are retried by the [`RetryPolicy`](crate::retry::RetryPolicy).
/// Every other kind is definitive and is returned to the caller on first occurrence.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// The addressed resource does not exist.
    #[error("NotFound")]
    NotFound,
    /// A resource with the same identity already exists.
    #[error("Conflict")]
    Conflict,
    /// An `if-match` condition did not hold.
    #[error("PreconditionFailed")]
    PreconditionFailed,
    /// The request was rejected as malformed before or by the service.
    #[error("InvalidArgument")]
    InvalidArgument,
    /// The credential was missing, wrong, or lacked permission.
    #[error("Unauthorized")]
    Unauthorized,
    /// The service asked the client to slow down.
    #[error("Throttled")]
    Throttled {
        /// Delay suggested by the service before trying again, if any.
        retry_after: Option<Duration>,
    },
    /// The request or response did not complete in time.
    #[error("NetworkTimeout")]
    NetworkTimeout,
    /// The service or the network path to it is temporarily unavailable.
    #[error("ServiceUnavailable")]
    ServiceUnavailable,
    /// The operation was cancelled by the caller.
    #[error("Cancelled")]
    Cancelled,
    /// A transient failure persisted for the whole retry budget.
    #[error("RetriesExhausted({last} after {attempts} attempts)")]
    RetriesExhausted {
        /// Number of attempts made, including the first.
        attempts: u32,
        /// The kind of the last failure observed.
        last: Box<ErrorKind>,
    },
    /// The service returned a status the client does not classify.
    #[error("HttpResponse({status})")]
    HttpResponse { status: StatusCode },
    /// Client configuration is missing or invalid.
    #[error("Configuration")]
    Configuration,
    /// A payload could not be converted to or from its wire form.
    #[error("DataConversion")]
    DataConversion,
    /// Anything else.
    #[error("Other")]
    Other,
}

impl ErrorKind {
    /// Returns `true` when an operation failing with this kind may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::Throttled { .. } | ErrorKind::NetworkTimeout | ErrorKind::ServiceUnavailable
        )
    }

    /// Maps a non-success HTTP status to the kind a caller should see.
    pub fn from_status(status: StatusCode, retry_after: Option<Duration>) -> Self {
        match status.as_u16() {
            400 => ErrorKind::InvalidArgument,
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::NetworkTimeout,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::PreconditionFailed,
            429 => ErrorKind::Throttled { retry_after },
            502..=504 => ErrorKind::ServiceUnavailable,
            _ => ErrorKind::HttpResponse { status },
        }
    }
}

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by a document store operation.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    status: Option<StatusCode>,
    #[source]
    source: Option<BoxedSource>,
}

impl Error {
    /// Creates an error of the given kind with a human-readable message.
    pub fn message(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates an error of the given kind wrapping another error.
    pub fn full<E>(kind: ErrorKind, source: E, message: impl Into<Cow<'static, str>>) -> Self
    where
        E: Into<BoxedSource>,
    {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: Some(source.into()),
        }
    }

    /// Creates an error from an unsuccessful service response.
    pub fn from_response(
        status: StatusCode,
        retry_after: Option<Duration>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            kind: ErrorKind::from_status(status, retry_after),
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Wraps the last transient failure once the retry budget is spent.
    pub fn retries_exhausted(attempts: u32, last: Error) -> Self {
        Self {
            kind: ErrorKind::RetriesExhausted {
                attempts,
                last: Box::new(last.kind.clone()),
            },
            message: format!("gave up after {attempts} attempts").into(),
            status: last.status,
            source: Some(Box::new(last)),
        }
    }

    /// Creates the error returned when the caller cancels an operation.
    pub fn cancelled() -> Self {
        Self::message(ErrorKind::Cancelled, "operation was cancelled")
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The HTTP status returned by the service, when the error came from a response.
    pub fn http_status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns `true` if retrying may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }

    /// For [`ErrorKind::RetriesExhausted`], the last underlying error.
    pub fn last_error(&self) -> Option<&Error> {
        match self.kind {
            ErrorKind::RetriesExhausted { .. } => self
                .source
                .as_deref()
                .and_then(|source| source.downcast_ref::<Error>()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::full(ErrorKind::DataConversion, error, "JSON conversion failed")
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Error::full(ErrorKind::DataConversion, error, "URL could not be parsed")
    }
}

/// Adds context to foreign errors, converting them into an [`Error`].
pub trait ResultExt<T> {
    fn context(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|error| Error::full(kind, error, message))
    }
}

/// Turns an expected absence into a value instead of an error.
pub trait OptionalExt<T> {
    /// Maps [`ErrorKind::NotFound`] to `Ok(None)`; every other error is passed through.
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for Result<T> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }
}
