use std::io;

use thiserror::Error;

/// An error reported by a [`Transport`](crate::Transport).
///
/// Delivery is best-effort: the worker logs the error and moves on to the
/// next task.  Nothing is retried.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint answered with a non-success status code.
    #[error("endpoint responded with status {0}")]
    Status(u16),
    /// The payload could not be written.
    #[error("i/o error while delivering payload")]
    Io(#[from] io::Error),
    /// The request could not be completed.
    #[error("request failed: {0}")]
    Request(String),
    /// The transport was already closed.
    #[error("transport is closed")]
    Closed,
}

/// An error produced when serializing a payload.
#[derive(Debug, Error)]
#[error("failed to encode payload")]
pub struct EncodeError(#[from] pub serde_json::Error);
