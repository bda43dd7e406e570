// Error types for building, signing and submitting ledger operations.

use std::fmt;

use crate::validation::Violation;

/// Errors produced anywhere in the validate -> sign -> envelope -> submit pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-supplied JSON could not be parsed, or an enum literal is not
    /// one of the allowed values.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Key material is not valid base58 or does not have the expected size.
    #[error("Malformed key material in '{field}': {reason}")]
    MalformedKeyMaterial { field: &'static str, reason: String },

    /// A raw keypair buffer has the wrong length.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// One or more domain invariants were violated. Always carries the full set.
    #[error("Validation failed: {}", ViolationList(.0))]
    ValidationFailed(Vec<Violation>),

    /// The envelope could not be serialized into the wire format.
    #[error("Envelope encoding error: {0}")]
    EnvelopeEncoding(String),

    /// The ledger could not be reached.
    #[error("Submission failed: {source}")]
    SubmissionFailed {
        #[source]
        source: TransportError,
    },

    /// The ledger answered but refused the envelope.
    #[error("Rejected by ledger (code {code}): {reason}")]
    Rejected { code: u32, reason: String },

    /// A signature inside an envelope does not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The ledger has no document for the DID.
    #[error("The did is not on the ledger: {0}")]
    DidNotFound(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`crate::LedgerTransport`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection, DNS or timeout failure.
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    /// The endpoint answered with a non-success status.
    #[error("ledger returned status {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The endpoint answered with a body that could not be interpreted.
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

struct ViolationList<'a>(&'a [Violation]);

impl fmt::Display for ViolationList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failed_lists_every_violation() {
        let err = Error::ValidationFailed(vec![
            Violation::new("IxoFactor", "-1", "should be positive"),
            Violation::new("NodeFeePercentage", "-0.1", "should be positive"),
        ]);

        let message = err.to_string();
        assert!(message.contains("IxoFactor"));
        assert!(message.contains("NodeFeePercentage"));
        assert!(message.contains("; "));
    }

    #[test]
    fn test_submission_failed_keeps_cause() {
        use std::error::Error as _;

        let err = Error::SubmissionFailed {
            source: TransportError::Unreachable("connection refused".to_string()),
        };

        assert!(err.to_string().contains("connection refused"));
        assert!(err.source().is_some());
    }
}
