// JCS (JSON Canonicalization Scheme) - RFC 8785 canonical sign bytes

use serde::Serialize;

use crate::error::{Error, Result};

/// Canonicalizes a serializable value according to RFC 8785 (JCS) and returns the UTF-8 bytes.
///
/// These are the sign bytes of a message:
/// - Object keys are sorted lexicographically
/// - No unnecessary whitespace
/// - Numbers are serialized consistently
pub fn jcs_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let canonical = serde_jcs::to_string(value).map_err(|e| Error::EnvelopeEncoding(e.to_string()))?;
    Ok(canonical.into_bytes())
}
