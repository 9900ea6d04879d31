//! Cache error types.

use thiserror::Error;

/// Errors raised by the remote cache tier.
///
/// These are transient backend failures. The tiered cache absorbs them: it
/// logs a warning, bumps the error counter and keeps serving from the local
/// tier. They never reach a caller of `get`/`set`.
#[derive(Debug, Error)]
pub enum RemoteTierError {
    /// Could not establish a connection to the remote endpoint.
    #[error("remote cache connection failed for '{url}': {message}")]
    Connection { url: String, message: String },

    /// A command against an established connection failed.
    #[error("remote cache command failed: {message}")]
    Command { message: String },
}

pub type RemoteTierResult<T> = Result<T, RemoteTierError>;

impl From<redis::RedisError> for RemoteTierError {
    fn from(e: redis::RedisError) -> Self {
        Self::Command {
            message: e.to_string(),
        }
    }
}

/// Errors raised while encoding or decoding remote cache frames.
///
/// Decode failures are treated as remote misses (the frame is discarded);
/// encode failures skip the remote write. Both are counted under `errors`.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Value could not be serialized into a frame.
    #[error("failed to serialize cache value: {reason}")]
    Encode { reason: String },

    /// Frame bytes could not be turned back into a value.
    #[error("failed to deserialize cache frame: {reason}")]
    Decode { reason: String },

    /// A frame must carry at least the flag byte.
    #[error("cache frame is empty")]
    EmptyFrame,

    /// The flag byte named no known encoding.
    #[error("unknown cache frame flag {flag:#04x}")]
    UnknownFlag { flag: u8 },
}
