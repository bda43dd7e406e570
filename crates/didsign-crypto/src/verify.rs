// Envelope verification
//
// Recomputes the canonical sign bytes of the carried operation and checks
// every signature against the signer's published verify key.

use ed25519_dalek::{Verifier, VerifyingKey, PUBLIC_KEY_LENGTH};

use crate::envelope::Envelope;
use crate::error::{Error, Result};

/// Verifies an envelope independently of how it was produced.
///
/// This function:
/// 1. Requires exactly one operation and at least one signature
/// 2. Recomputes the operation's JCS sign bytes
/// 3. Requires one signature from the DID the operation names as signer
/// 4. Decodes each base58 verify key and checks its Ed25519 signature
pub fn verify_envelope(envelope: &Envelope) -> Result<()> {
    let operation = match envelope.payload() {
        [operation] => operation,
        payload => {
            return Err(Error::InvalidSignature(format!(
                "expected exactly one operation, found {}",
                payload.len()
            )))
        }
    };

    if envelope.signatures().is_empty() {
        return Err(Error::InvalidSignature("envelope carries no signatures".to_string()));
    }

    let sign_bytes = operation.sign_bytes()?;

    if !envelope
        .signatures()
        .iter()
        .any(|entry| entry.signer_did == operation.signer_did())
    {
        return Err(Error::InvalidSignature(format!(
            "missing signature from required signer '{}'",
            operation.signer_did()
        )));
    }

    for entry in envelope.signatures() {
        let verifying_key = decode_verify_key(&entry.signer_public_key)?;
        verifying_key
            .verify(&sign_bytes, &entry.signature_value)
            .map_err(|_| {
                Error::InvalidSignature(format!(
                    "signature from '{}' does not match the operation",
                    entry.signer_did
                ))
            })?;
    }

    Ok(())
}

fn decode_verify_key(encoded: &str) -> Result<VerifyingKey> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| Error::MalformedKeyMaterial {
            field: "signerPublicKey",
            reason: e.to_string(),
        })?;
    let array: [u8; PUBLIC_KEY_LENGTH] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| Error::MalformedKeyMaterial {
                field: "signerPublicKey",
                reason: format!("expected {} bytes, decoded {}", PUBLIC_KEY_LENGTH, bytes.len()),
            })?;
    VerifyingKey::from_bytes(&array).map_err(|e| Error::MalformedKeyMaterial {
        field: "signerPublicKey",
        reason: e.to_string(),
    })
}
