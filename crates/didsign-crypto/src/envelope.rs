// The signed transaction envelope submitted to the ledger.
//
// An envelope pairs exactly one operation with the signature of the identity
// that must authorize it. Its JSON form is the wire format: the payload
// array first, then the signatures, then the memo.

use chrono::{DateTime, Utc};
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::tx_hash_hex;
use crate::operation::Operation;

/// One signer's entry in an envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeSignature {
    /// DID of the signer
    pub signer_did: String,
    /// Base58 Ed25519 verify key the signature checks against
    pub signer_public_key: String,
    /// Base64-encoded 64-byte Ed25519 signature
    #[serde(with = "signature_base64")]
    pub signature_value: Signature,
    /// When the signature was produced. Not covered by the signature.
    pub created: DateTime<Utc>,
}

/// Identity of the signer as it appears in the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerRef {
    pub did: String,
    pub verify_key: String,
}

/// A single-message signed transaction. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    payload: Vec<Operation>,
    signatures: Vec<EnvelopeSignature>,
    memo: String,
}

impl Envelope {
    /// Wraps one operation and its signature.
    pub fn build(
        operation: Operation,
        signer: SignerRef,
        signature: Signature,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            payload: vec![operation],
            signatures: vec![EnvelopeSignature {
                signer_did: signer.did,
                signer_public_key: signer.verify_key,
                signature_value: signature,
                created,
            }],
            memo: String::new(),
        }
    }

    pub fn payload(&self) -> &[Operation] {
        &self.payload
    }

    /// The single operation carried by an envelope built with [`Envelope::build`].
    pub fn operation(&self) -> Option<&Operation> {
        self.payload.first()
    }

    pub fn signatures(&self) -> &[EnvelopeSignature] {
        &self.signatures
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    /// Serializes the envelope into the bytes sent to the ledger.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::EnvelopeEncoding(e.to_string()))
    }

    /// Parses an envelope from wire bytes.
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::MalformedInput(format!("Could not parse envelope: {}", e)))
    }

    /// Upper-case hex SHA-256 of the wire bytes, as the ledger reports it.
    pub fn tx_hash(&self) -> Result<String> {
        Ok(tx_hash_hex(&self.to_wire_bytes()?))
    }
}

mod signature_base64 {
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use base64::Engine;
    use ed25519_dalek::{Signature, SIGNATURE_LENGTH};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(signature: &Signature, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(signature.to_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Signature, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = BASE64_STANDARD
            .decode(&encoded)
            .map_err(|e| de::Error::custom(format!("Invalid base64 signature: {}", e)))?;
        let array: [u8; SIGNATURE_LENGTH] = bytes.try_into().map_err(|_| {
            de::Error::custom(format!(
                "Invalid signature length: expected {} bytes",
                SIGNATURE_LENGTH
            ))
        })?;
        Ok(Signature::from_bytes(&array))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{BondStatus, MsgUpdateBondStatus};
    use crate::identity::tests::sample_identity;
    use crate::sign::sign_msg;
    use chrono::TimeZone;

    fn sample_envelope() -> Envelope {
        let identity = sample_identity();
        let msg = MsgUpdateBondStatus::new("did:sov:sender", BondStatus::Open, &identity);
        let signature = sign_msg(&msg, &identity).unwrap();

        Envelope::build(
            msg.into(),
            SignerRef {
                did: identity.did.clone(),
                verify_key: identity.verify_key.clone(),
            },
            signature,
            Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_envelope_wire_layout() {
        let envelope = sample_envelope();
        let json: serde_json::Value =
            serde_json::from_slice(&envelope.to_wire_bytes().unwrap()).unwrap();

        assert_eq!(json["payload"].as_array().unwrap().len(), 1);
        assert_eq!(json["payload"][0]["type"], "bonddoc/UpdateBondStatus");
        assert_eq!(
            json["signatures"][0]["signerPublicKey"],
            "77GSw8G26F1e3qwtmzzTvWicZSCCkFKK43NSntpfuJKx"
        );
        assert_eq!(json["signatures"][0]["signerDid"], "CCzPRoyPQsTxVwoAwTZXcK");
        assert_eq!(json["signatures"][0]["created"], "2020-03-01T12:00:00Z");
        assert_eq!(json["memo"], "");

        let wire = String::from_utf8(envelope.to_wire_bytes().unwrap()).unwrap();
        assert!(wire.starts_with("{\"payload\":"));
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = sample_envelope();
        let bytes = envelope.to_wire_bytes().unwrap();

        let decoded = Envelope::from_wire_bytes(&bytes).unwrap();

        assert_eq!(decoded, envelope);
        assert_eq!(decoded.to_wire_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_tx_hash_is_stable() {
        let envelope = sample_envelope();
        let hash = envelope.tx_hash().unwrap();

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, envelope.clone().tx_hash().unwrap());
    }

    #[test]
    fn test_bad_signature_encoding_is_rejected() {
        let envelope = sample_envelope();
        let mut json = serde_json::to_value(&envelope).unwrap();
        json["signatures"][0]["signatureValue"] = serde_json::json!("AAAA");

        let err = Envelope::from_wire_bytes(json.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Invalid signature length"));

        json["signatures"][0]["signatureValue"] = serde_json::json!("not base64!!");
        let err = Envelope::from_wire_bytes(json.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Invalid base64 signature"));
    }
}
