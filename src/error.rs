//! Error types for DDS recovery.
//!
//! The taxonomy keeps each failure kind distinct and observable: structural
//! header problems, DCLZ protocol violations, and entity size mismatches are
//! fatal for the current entity or group; Reed-Solomon failures are not
//! errors at all but surface as unknown bytes (`None`) from the C1 decoder;
//! running out of group files is the benign end of input, reported as
//! `Ok(None)` by [`crate::stream::GroupSource::load`].

use thiserror::Error;

/// Primary error type for DDS recovery operations.
#[derive(Debug, Error)]
pub enum RecoverError {
    /// IO error during group loading or sink writes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A group file does not hold exactly one Basic Group.
    #[error("group is {actual} bytes, expected {expected}")]
    GroupSize { expected: usize, actual: usize },

    /// The validity bitmap does not match the group length.
    #[error("validity bitmap is {actual} bytes, expected {expected}")]
    ValiditySize { expected: usize, actual: usize },

    /// Strict mode found an undecoded byte in the group body.
    #[error("group byte {offset} is not valid and strict checking is on")]
    StrictValidity { offset: usize },

    /// The group trailer contains undecoded bytes.
    #[error("group trailer byte {offset} is not valid")]
    TrailerInvalid { offset: usize },

    /// A block access table entry contains undecoded bytes.
    #[error("block access table entry {index} is not valid")]
    BatEntryInvalid { index: usize },

    /// A block access table entry points past the group payload.
    #[error("block access table entry {index} overruns the payload: position {pos} + count {count}")]
    BatOverrun {
        index: usize,
        pos: usize,
        count: usize,
    },

    /// Malformed entity header.
    #[error("entity header: {message}")]
    EntityHeader { message: String },

    /// Entity chain entries arrived out of order.
    #[error("entity chain: {message}")]
    EntityChain { message: String },

    /// The DCLZ stream violated the codeword protocol.
    #[error("DCLZ: {message}")]
    DclzProtocol { message: String },

    /// Decompressed entity size disagrees with its header.
    #[error("entity expanded to {actual} bytes, expected {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// Result type alias for recovery operations.
pub type Result<T> = std::result::Result<T, RecoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecoverError::GroupSize {
            expected: 126_632,
            actual: 100,
        };
        assert!(err.to_string().contains("126632"));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = RecoverError::SizeMismatch {
            expected: 512,
            actual: 384,
        };
        let msg = err.to_string();
        assert!(msg.contains("512"));
        assert!(msg.contains("384"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: RecoverError = io.into();
        assert!(matches!(err, RecoverError::Io(_)));
    }
}
