//! Error types for encoding and remote hash access.
//!
//! [`CodecError`] covers local encoding failures (type or width mismatch,
//! malformed text). [`HashError`] is what facade and iterator operations
//! return: either a codec failure or a remote command failure passed through
//! unchanged from the [`HashCommands`](crate::commands::HashCommands)
//! implementation.

/// Errors raised while converting between typed values and stored bytes.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Binary-mode integral decode received the wrong number of bytes.
    #[error("binary width mismatch: expected {expected} bytes, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
    /// A structured message wrote a different number of bytes than it reported.
    #[error("structured message length mismatch: reported {reported} bytes, wrote {written}")]
    LengthMismatch { reported: usize, written: usize },
    /// Non-empty text could not be parsed as the target type.
    #[error("cannot parse {text:?} as {target}")]
    InvalidText { text: String, target: &'static str },
    /// Stored bytes are not valid UTF-8 where a string was expected.
    #[error("stored bytes are not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// The generic variant cannot be represented as the target type.
    #[error("variant {variant} is not representable as {target}")]
    Unrepresentable {
        variant: &'static str,
        target: &'static str,
    },
    /// Structured message encoding failed.
    #[error("structured message encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    /// Structured message decoding failed.
    #[error("structured message decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Errors returned by [`RemoteHash`](crate::hash::RemoteHash) and
/// [`HashIter`](crate::cursor::HashIter) operations.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// A key or value failed to encode or decode locally.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Failure reported by the command backend, unchanged.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Result of a facade or iterator operation.
pub type HashResult<T> = Result<T, HashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_mismatch_message() {
        let err = CodecError::WidthMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "binary width mismatch: expected 4 bytes, got 3"
        );
    }

    #[test]
    fn store_error_is_transparent() {
        let err = HashError::from(anyhow::anyhow!("connection reset"));
        assert_eq!(err.to_string(), "connection reset");
        assert!(matches!(err, HashError::Store(_)));
    }

    #[test]
    fn codec_error_converts_into_hash_error() {
        let err: HashError = CodecError::Unrepresentable {
            variant: "Float",
            target: "i32",
        }
        .into();
        assert!(matches!(err, HashError::Codec(_)));
    }
}
