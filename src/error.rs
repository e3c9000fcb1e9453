//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] is the single error type of the crate. Most variants never
//! reach application code: the pumps treat transport failures as terminal
//! and swallow codec failures, reporting them only to the optional error
//! observer. The host HTTP endpoints render it as a structured JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ConnectionId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "hub control loop has stopped"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`HubError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Hub-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Codec      | 400 Bad Request             |
/// | 2000–2999 | Transport  | 502 Bad Gateway             |
/// | 3000–3999 | Hub        | 503 / 500                   |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub control loop is no longer accepting requests.
    #[error("hub control loop has stopped")]
    HubStopped,

    /// A message could not be encoded for the wire.
    #[error("encode error: {0}")]
    Encode(String),

    /// An inbound frame could not be decoded into a message.
    #[error("decode error: {0}")]
    Decode(String),

    /// The underlying transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer (or the local side) closed the transport.
    #[error("transport closed")]
    TransportClosed,

    /// Nothing was received within the read deadline.
    #[error("read deadline elapsed")]
    ReadTimeout,

    /// A frame could not be written within the write deadline.
    #[error("write deadline elapsed")]
    WriteTimeout,

    /// An inbound frame exceeded the configured size limit.
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Size of the offending frame in bytes.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The target's outbound queue had no free slot and the send was dropped.
    #[error("outbound queue of connection {0} is full")]
    QueueFull(ConnectionId),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Encode(_) => 1001,
            Self::Decode(_) => 1002,
            Self::FrameTooLarge { .. } => 1003,
            Self::Transport(_) => 2001,
            Self::TransportClosed => 2002,
            Self::ReadTimeout => 2003,
            Self::WriteTimeout => 2004,
            Self::HubStopped => 3001,
            Self::QueueFull(_) => 3002,
            Self::InvalidConfig(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Encode(_) | Self::Decode(_) | Self::FrameTooLarge { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Transport(_) | Self::TransportClosed | Self::ReadTimeout | Self::WriteTimeout => {
                StatusCode::BAD_GATEWAY
            }
            Self::HubStopped | Self::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<axum::Error> for HubError {
    fn from(err: axum::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn hub_stopped_maps_to_service_unavailable() {
        let err = HubError::HubStopped;
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), 3001);
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn frame_too_large_message_names_both_sizes() {
        let msg = HubError::FrameTooLarge {
            size: 600,
            limit: 512,
        }
        .to_string();
        assert!(msg.contains("600"));
        assert!(msg.contains("512"));
    }
}
