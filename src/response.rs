//! Response envelope assembly
//!
//! Turns an engine [`Response`] into the bytes and status sent on the wire.
//! The envelope is all-or-nothing: either `{"data": ...}` or
//! `{"errors": [...]}`, never both.

use async_graphql::{ErrorExtensionValues, PathSegment, Pos, Response, ServerError, Value};
use axum::http::StatusCode;
use serde::Serialize;
use tracing::error;

/// Error message that marks a client-side (400) failure
pub const VALIDATION_ERROR: &str = "Validation error";

const INTERNAL_ERROR_BODY: &[u8] = br#"{"errors":[{"message":"Internal server error"}]}"#;

/// Status and serialized body ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Assembled {
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: INTERNAL_ERROR_BODY.to_vec(),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Envelope<'a> {
    Data { data: &'a Value },
    Errors { errors: Vec<ErrorEntry<'a>> },
}

#[derive(Serialize)]
struct ErrorEntry<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "<[Pos]>::is_empty")]
    locations: &'a [Pos],
    #[serde(skip_serializing_if = "<[PathSegment]>::is_empty")]
    path: &'a [PathSegment],
    #[serde(skip_serializing_if = "Option::is_none")]
    extensions: Option<&'a ErrorExtensionValues>,
}

impl<'a> From<&'a ServerError> for ErrorEntry<'a> {
    fn from(err: &'a ServerError) -> Self {
        Self {
            message: &err.message,
            locations: &err.locations,
            path: &err.path,
            extensions: err.extensions.as_ref(),
        }
    }
}

/// Status for a batch of field errors
///
/// Each error maps to 400 when its message is the validation marker and to
/// 500 otherwise; the last error in the batch decides.
pub fn status_for(errors: &[ServerError]) -> StatusCode {
    errors
        .iter()
        .map(|err| {
            if err.message == VALIDATION_ERROR {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })
        .last()
        .unwrap_or(StatusCode::OK)
}

/// Serialize an execution result into the response envelope
pub fn assemble(response: &Response) -> Assembled {
    let (status, envelope) = if response.errors.is_empty() {
        (StatusCode::OK, Envelope::Data { data: &response.data })
    } else {
        (
            status_for(&response.errors),
            Envelope::Errors {
                errors: response.errors.iter().map(ErrorEntry::from).collect(),
            },
        )
    };

    match serde_json::to_vec(&envelope) {
        Ok(body) => Assembled { status, body },
        Err(err) => {
            error!(error = %err, "failed to serialize response envelope");
            Assembled::internal()
        }
    }
}

/// Transport-level rejection that never reached the engine
pub fn reject(status: StatusCode, message: &str) -> Assembled {
    let envelope = Envelope::Errors {
        errors: vec![ErrorEntry {
            message,
            locations: &[],
            path: &[],
            extensions: None,
        }],
    };

    match serde_json::to_vec(&envelope) {
        Ok(body) => Assembled { status, body },
        Err(_) => Assembled::internal(),
    }
}
