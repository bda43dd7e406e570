// The shared validate -> sign -> envelope -> submit pipeline.
//
// Every command that changes ledger state goes through
// [`SubmissionPipeline::submit`], parameterized by the message type.

use chrono::{DateTime, Utc};

use crate::did_doc::MsgAddCredential;
use crate::envelope::{Envelope, SignerRef};
use crate::error::{Error, Result};
use crate::identity::SovrinDid;
use crate::operation::{Msg, Operation};
use crate::sign::sign_with_keypair;
use crate::submit::{LedgerTransport, SubmissionClient, SubmissionResult};
use crate::validation::Violation;

/// Query route resolving a DID to its document.
pub const DID_DOC_QUERY_ROUTE: &str = "custom/did/queryDidDoc";

/// Store path holding project documents keyed by project DID.
pub const PROJECT_STORE_PATH: &str = "/store/project/key";

/// Key in the project store that indexes every project DID.
pub const ALL_PROJECTS_KEY: &str = "ALL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Reject identities whose verifyKey is not derived from their signKey
    /// before signing, instead of leaving it to ledger-side verification.
    pub strict_keys: bool,
}

/// Validates, signs and wraps one message. No network access.
///
/// Fails before any key material is touched if the message is not
/// well-formed, or if `identity` is not the signer the message requires.
pub fn sign_operation<M>(
    msg: M,
    identity: &SovrinDid,
    options: PipelineOptions,
    created: DateTime<Utc>,
) -> Result<Envelope>
where
    M: Msg + Into<Operation>,
{
    let mut violations = msg.violations();
    if msg.signer_did() != identity.did {
        violations.push(Violation::new(
            "signerDid",
            identity.did.clone(),
            format!("must be '{}' to sign {}", msg.signer_did(), M::TYPE),
        ));
    }
    if !violations.is_empty() {
        return Err(Error::ValidationFailed(violations));
    }

    if options.strict_keys {
        identity.check_key_consistency()?;
    }

    let sign_bytes = msg.sign_bytes()?;
    let keypair = identity.keypair()?;
    let signature = sign_with_keypair(&sign_bytes, &keypair)?;
    tracing::debug!(msg_type = M::TYPE, signer = %identity.did, "signed operation");

    Ok(Envelope::build(
        msg.into(),
        SignerRef {
            did: identity.did.clone(),
            verify_key: identity.verify_key.clone(),
        },
        signature,
        created,
    ))
}

/// Shared sign-and-broadcast service used by every command.
#[derive(Debug, Clone)]
pub struct SubmissionPipeline<T> {
    client: SubmissionClient<T>,
    options: PipelineOptions,
}

impl<T: LedgerTransport> SubmissionPipeline<T> {
    pub fn new(transport: T, options: PipelineOptions) -> Self {
        Self {
            client: SubmissionClient::new(transport),
            options,
        }
    }

    pub fn client(&self) -> &SubmissionClient<T> {
        &self.client
    }

    /// Validates and signs `msg` with `identity` without submitting it.
    pub fn sign<M>(&self, msg: M, identity: &SovrinDid) -> Result<Envelope>
    where
        M: Msg + Into<Operation>,
    {
        sign_operation(msg, identity, self.options, Utc::now())
    }

    /// Validates, signs, wraps and broadcasts `msg`.
    pub fn submit<M>(&self, msg: M, identity: &SovrinDid) -> Result<SubmissionResult>
    where
        M: Msg + Into<Operation>,
    {
        let envelope = self.sign(msg, identity)?;
        tracing::debug!(tx_hash = %envelope.tx_hash()?, "broadcasting envelope");
        self.client.submit(&envelope)
    }

    /// Issues a KYC credential for `did`, which must already be on the ledger.
    pub fn add_kyc_credential(
        &self,
        did: &str,
        issuer: &SovrinDid,
        issued: DateTime<Utc>,
    ) -> Result<SubmissionResult> {
        let envelope = self.sign_kyc_credential(did, issuer, issued)?;
        self.client.submit(&envelope)
    }

    /// Signs a KYC credential for `did` without submitting it. The DID must
    /// already be on the ledger.
    pub fn sign_kyc_credential(
        &self,
        did: &str,
        issuer: &SovrinDid,
        issued: DateTime<Utc>,
    ) -> Result<Envelope> {
        self.ensure_did_exists(did)?;
        let msg = MsgAddCredential::kyc(did, issuer.did.clone(), issued);
        sign_operation(msg, issuer, self.options, Utc::now())
    }

    /// Fails with `DidNotFound` unless the ledger holds a document for `did`.
    pub fn ensure_did_exists(&self, did: &str) -> Result<()> {
        match self.query_did_doc(did)? {
            Some(_) => Ok(()),
            None => Err(Error::DidNotFound(did.to_string())),
        }
    }

    /// The DID document stored on the ledger, if any.
    pub fn query_did_doc(&self, did: &str) -> Result<Option<serde_json::Value>> {
        let path = format!("{}/{}", DID_DOC_QUERY_ROUTE, did);
        self.query_json(&path, "")
    }

    /// The project document stored under `project_did`, if any.
    pub fn query_project_doc(&self, project_did: &str) -> Result<Option<serde_json::Value>> {
        self.query_json(PROJECT_STORE_PATH, project_did)
    }

    /// Every project DID in the project store; empty when nothing is stored.
    pub fn query_all_project_dids(&self) -> Result<Vec<String>> {
        Ok(self
            .query_json::<Vec<String>>(PROJECT_STORE_PATH, ALL_PROJECTS_KEY)?
            .unwrap_or_default())
    }

    fn query_json<V: serde::de::DeserializeOwned>(&self, path: &str, key: &str) -> Result<Option<V>> {
        match self.client.query(path, key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                Error::MalformedInput(format!("Could not parse query result for '{}': {}", path, e))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{BondStatus, MsgUpdateBondStatus};
    use crate::identity::tests::sample_identity;

    #[test]
    fn test_wrong_signer_is_rejected_before_signing() {
        let identity = sample_identity();
        let mut msg = MsgUpdateBondStatus::new("did:sov:sender", BondStatus::Open, &identity);
        msg.bond_did = "AnotherBond".to_string();

        match sign_operation(msg, &identity, PipelineOptions::default(), Utc::now()) {
            Err(Error::ValidationFailed(violations)) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "signerDid");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_fields_and_signer_reported_together() {
        let identity = sample_identity();
        let mut msg = MsgUpdateBondStatus::new("", BondStatus::Open, &identity);
        msg.bond_did = String::new();

        match sign_operation(msg, &identity, PipelineOptions::default(), Utc::now()) {
            Err(Error::ValidationFailed(violations)) => {
                let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
                assert_eq!(fields, vec!["senderDid", "bondDid", "signerDid"]);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_key_material_fails_after_validation() {
        let mut identity = sample_identity();
        identity.secret.sign_key = "not-base58-0OIl".to_string();
        let msg = MsgUpdateBondStatus::new("did:sov:sender", BondStatus::Open, &identity);

        assert!(matches!(
            sign_operation(msg, &identity, PipelineOptions::default(), Utc::now()),
            Err(Error::MalformedKeyMaterial { field: "signKey", .. })
        ));
    }

    #[test]
    fn test_strict_keys_rejects_mismatched_identity() {
        let mut identity = sample_identity();
        identity.verify_key = bs58::encode([0x5a; 32]).into_string();
        let msg = MsgUpdateBondStatus::new("did:sov:sender", BondStatus::Open, &identity);

        let lenient = sign_operation(msg.clone(), &identity, PipelineOptions::default(), Utc::now());
        assert!(!matches!(lenient, Err(Error::ValidationFailed(_))));

        let strict = sign_operation(msg, &identity, PipelineOptions { strict_keys: true }, Utc::now());
        assert!(matches!(strict, Err(Error::MalformedKeyMaterial { .. })));
    }
}
