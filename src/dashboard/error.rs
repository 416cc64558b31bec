//! Fetch error types.

use thiserror::Error;

use crate::model::codec::DecodeError;
use crate::transport::TransportError;

/// A panel fetch failed. Filter and visibility state are left untouched.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The executor could not be reached or reported a failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A result cell did not match its field's codec.
    #[error("failed to decode result: {0}")]
    Decode(#[from] DecodeError),
}
