// Sovrin-style DID identities and assembly of the raw signing keypair.

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
use serde::{Deserialize, Serialize};

use crate::did::did_from_verify_key;
use crate::error::{Error, Result};

/// A decentralized identifier together with its key material.
///
/// Produced by an external identity generator and handed in as JSON. The
/// secret half is only ever used to derive a keypair for one signature.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SovrinDid {
    pub did: String,
    pub verify_key: String,
    pub encryption_public_key: String,
    pub secret: SovrinSecret,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SovrinSecret {
    pub seed: String,
    pub sign_key: String,
    pub encryption_private_key: String,
}

impl SovrinDid {
    /// Parses the identity JSON supplied by a caller.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::MalformedInput(format!("Could not parse sovrin DID: {}", e)))
    }

    /// Assembles the 64-byte signing keypair from `signKey` and `verifyKey`.
    pub fn keypair(&self) -> Result<KeypairBytes> {
        assemble_keypair(&self.secret.sign_key, &self.verify_key)
    }

    /// Checks that `verifyKey` is the public half of `signKey` and that the
    /// DID was derived from `verifyKey`.
    ///
    /// Signing does not require this; a mismatched pair produces a signature
    /// that fails verification.
    pub fn check_key_consistency(&self) -> Result<()> {
        let keypair = self.keypair()?;
        let derived = SigningKey::from_bytes(keypair.secret()).verifying_key();
        if derived.as_bytes() != keypair.public() {
            return Err(Error::MalformedKeyMaterial {
                field: "verifyKey",
                reason: "not the public counterpart of signKey".to_string(),
            });
        }

        let expected_did = did_from_verify_key(&derived);
        let did = self.did.strip_prefix("did:sov:").unwrap_or(&self.did);
        if did != expected_did {
            return Err(Error::MalformedKeyMaterial {
                field: "did",
                reason: format!("expected '{}' for this verifyKey", expected_did),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SovrinDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SovrinDid")
            .field("did", &self.did)
            .field("verify_key", &self.verify_key)
            .field("encryption_public_key", &self.encryption_public_key)
            .field("secret", &self.secret)
            .finish()
    }
}

impl fmt::Debug for SovrinSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SovrinSecret(<redacted>)")
    }
}

/// Raw `secret || public` keypair in the layout the signer expects.
#[derive(Clone, PartialEq, Eq)]
pub struct KeypairBytes {
    secret: [u8; SECRET_KEY_LENGTH],
    public: [u8; PUBLIC_KEY_LENGTH],
}

impl KeypairBytes {
    /// The 64-byte buffer: bytes 0..32 hold the secret, 32..64 the public key.
    pub fn to_bytes(&self) -> [u8; KEYPAIR_LENGTH] {
        let mut buffer = [0u8; KEYPAIR_LENGTH];
        buffer[..SECRET_KEY_LENGTH].copy_from_slice(&self.secret);
        buffer[SECRET_KEY_LENGTH..].copy_from_slice(&self.public);
        buffer
    }

    pub fn secret(&self) -> &[u8; SECRET_KEY_LENGTH] {
        &self.secret
    }

    pub fn public(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.public
    }

    /// The public half as a verifying key. Fails if the bytes are not a curve point.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.public).map_err(|e| Error::MalformedKeyMaterial {
            field: "verifyKey",
            reason: e.to_string(),
        })
    }

    fn from_halves(secret: &[u8], public: &[u8]) -> Self {
        let mut keypair = KeypairBytes {
            secret: [0u8; SECRET_KEY_LENGTH],
            public: [0u8; PUBLIC_KEY_LENGTH],
        };
        keypair.secret.copy_from_slice(secret);
        keypair.public.copy_from_slice(public);
        keypair
    }
}

impl TryFrom<&[u8]> for KeypairBytes {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEYPAIR_LENGTH {
            return Err(Error::InvalidKeyLength {
                expected: KEYPAIR_LENGTH,
                actual: bytes.len(),
            });
        }
        let (secret, public) = bytes.split_at(SECRET_KEY_LENGTH);
        Ok(KeypairBytes::from_halves(secret, public))
    }
}

impl fmt::Debug for KeypairBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairBytes")
            .field("public", &bs58::encode(self.public).into_string())
            .finish_non_exhaustive()
    }
}

/// Builds the 64-byte signing keypair from two base58 strings.
///
/// `signKey` is written from offset 0, then `verifyKey` is written over
/// bytes 32..64. `signKey` may be the bare 32-byte seed or a 64-byte
/// `seed || public` form; in the latter case its public half is replaced.
/// Any other decoded length is rejected rather than truncated or padded.
pub fn assemble_keypair(sign_key: &str, verify_key: &str) -> Result<KeypairBytes> {
    let secret = decode_base58("signKey", sign_key)?;
    if secret.len() != SECRET_KEY_LENGTH && secret.len() != KEYPAIR_LENGTH {
        return Err(Error::MalformedKeyMaterial {
            field: "signKey",
            reason: format!(
                "expected {} or {} bytes, decoded {}",
                SECRET_KEY_LENGTH,
                KEYPAIR_LENGTH,
                secret.len()
            ),
        });
    }

    let public = decode_base58("verifyKey", verify_key)?;
    if public.len() != PUBLIC_KEY_LENGTH {
        return Err(Error::MalformedKeyMaterial {
            field: "verifyKey",
            reason: format!(
                "expected {} bytes, decoded {}",
                PUBLIC_KEY_LENGTH,
                public.len()
            ),
        });
    }

    // A 64-byte signKey carries its own public half; the verifyKey replaces it.
    Ok(KeypairBytes::from_halves(&secret[..SECRET_KEY_LENGTH], &public))
}

fn decode_base58(field: &'static str, value: &str) -> Result<Vec<u8>> {
    bs58::decode(value)
        .into_vec()
        .map_err(|e| Error::MalformedKeyMaterial {
            field,
            reason: e.to_string(),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_DID_JSON: &str = r#"{
        "did": "CCzPRoyPQsTxVwoAwTZXcK",
        "verifyKey": "77GSw8G26F1e3qwtmzzTvWicZSCCkFKK43NSntpfuJKx",
        "encryptionPublicKey": "AhKmLwrPdPMY3yeBpPqUy8qsphgXGaFEWHNgeUxKa3bV",
        "secret": {
            "seed": "ea25949b56257a8f16435af37d333fb11258fe9f7a1c2a8eebbebb4d0ea2ae85",
            "signKey": "Gm1dz5ToFcw3Ur7aRqpfzXh9kFJ8C6FZTTueCSGaZDH6",
            "encryptionPrivateKey": "Gm1dz5ToFcw3Ur7aRqpfzXh9kFJ8C6FZTTueCSGaZDH6"
        }
    }"#;

    pub(crate) fn sample_identity() -> SovrinDid {
        SovrinDid::from_json(SAMPLE_DID_JSON).unwrap()
    }

    fn b58(bytes: &[u8]) -> String {
        bs58::encode(bytes).into_string()
    }

    #[test]
    fn test_parse_identity_json() {
        let identity = sample_identity();
        assert_eq!(identity.did, "CCzPRoyPQsTxVwoAwTZXcK");
        assert_eq!(identity.secret.sign_key, "Gm1dz5ToFcw3Ur7aRqpfzXh9kFJ8C6FZTTueCSGaZDH6");
    }

    #[test]
    fn test_parse_identity_rejects_bad_json() {
        let err = SovrinDid::from_json(r#"{"did": "abc"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_keypair_layout() {
        let secret = [0x11u8; 32];
        let public = [0x22u8; 32];

        let keypair = assemble_keypair(&b58(&secret), &b58(&public)).unwrap();

        assert_eq!(&keypair.to_bytes()[..32], &secret);
        assert_eq!(&keypair.to_bytes()[32..], &public);
    }

    #[test]
    fn test_verify_key_always_wins_upper_half() {
        let public = [0x07u8; 32];
        for fill in [0x00u8, 0x5a, 0xff] {
            let mut long_secret = [fill; 64];
            long_secret[..32].copy_from_slice(&[0x33; 32]);

            let keypair = assemble_keypair(&b58(&long_secret), &b58(&public)).unwrap();
            assert_eq!(keypair.public(), &public);
            assert_eq!(keypair.secret(), &[0x33; 32]);
        }
    }

    #[test]
    fn test_invalid_base58_is_rejected() {
        let err = assemble_keypair("0OIl", &b58(&[1u8; 32])).unwrap_err();
        match err {
            Error::MalformedKeyMaterial { field, .. } => assert_eq!(field, "signKey"),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = assemble_keypair(&b58(&[1u8; 32]), "not base58!").unwrap_err();
        match err {
            Error::MalformedKeyMaterial { field, .. } => assert_eq!(field, "verifyKey"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_short_keys_are_not_padded() {
        let err = assemble_keypair(&b58(&[1u8; 31]), &b58(&[2u8; 32])).unwrap_err();
        assert!(err.to_string().contains("decoded 31"));

        let err = assemble_keypair(&b58(&[1u8; 32]), &b58(&[2u8; 33])).unwrap_err();
        assert!(err.to_string().contains("decoded 33"));

        assert!(assemble_keypair("", &b58(&[2u8; 32])).is_err());
    }

    #[test]
    fn test_raw_keypair_length_is_checked() {
        let err = KeypairBytes::try_from(&[0u8; 63][..]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidKeyLength {
                expected: 64,
                actual: 63
            }
        ));
        assert!(KeypairBytes::try_from(&[0u8; 64][..]).is_ok());
    }

    #[test]
    fn test_sample_identity_is_consistent() {
        sample_identity()
            .check_key_consistency()
            .expect("sample keys belong together");
    }

    #[test]
    fn test_mismatched_keys_are_detected() {
        let mut identity = sample_identity();
        identity.verify_key = b58(SigningKey::from_bytes(&[9u8; 32]).verifying_key().as_bytes());

        match identity.check_key_consistency().unwrap_err() {
            Error::MalformedKeyMaterial { field, .. } => assert_eq!(field, "verifyKey"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_did_is_detected() {
        let mut identity = sample_identity();
        identity.did = "did:sov:SomethingElse".to_string();

        match identity.check_key_consistency().unwrap_err() {
            Error::MalformedKeyMaterial { field, .. } => assert_eq!(field, "did"),
            other => panic!("unexpected error: {:?}", other),
        }

        identity.did = "did:sov:CCzPRoyPQsTxVwoAwTZXcK".to_string();
        assert!(identity.check_key_consistency().is_ok());
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let identity = sample_identity();
        let debug = format!("{:?} {:?}", identity, identity.keypair().unwrap());

        assert!(!debug.contains("Gm1dz5ToFcw3Ur7aRqpfzXh9kFJ8C6FZTTueCSGaZDH6"));
        assert!(!debug.contains("ea25949b"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("77GSw8G26F1e3qwtmzzTvWicZSCCkFKK43NSntpfuJKx"));
    }
}
