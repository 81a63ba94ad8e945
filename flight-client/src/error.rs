//! Crate-level error taxonomy.

use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Request could not be encoded, or a response could not be decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Every attempt of a retrying exchange timed out.
    #[error("no response after {attempts} attempts")]
    ExchangeFailed { attempts: u32 },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Caller input that can never succeed; reported without any send.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ClientError::Codec(CodecError::FieldTooLong { .. })
                | ClientError::Codec(CodecError::PayloadTooLarge { .. })
                | ClientError::Config(_)
        )
    }

    /// A single receive timeout, which the dispatcher retries.  An exchange
    /// that has already used up its attempts is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(TransportError::Timeout))
    }
}
