// DID document and credential messages.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::SovrinDid;
use crate::operation::{require_non_empty, Msg};
use crate::validation::Violation;

/// Credential types attached to a KYC credential.
pub const KYC_CREDENTIAL_TYPES: [&str; 2] = ["Credential", "ProofOfKYC"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BaseDidDoc {
    pub did: String,
    pub pub_key: String,
    #[serde(default)]
    pub credentials: Vec<DidCredential>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialClaim {
    pub id: String,
    #[serde(rename = "KYCValidated")]
    pub kyc_validated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DidCredential {
    pub cred_type: Vec<String>,
    pub issuer: String,
    pub issued: String,
    pub claim: CredentialClaim,
}

/// Publishes a DID and its verify key, signed by the DID itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MsgAddDid {
    pub did_doc: BaseDidDoc,
}

impl MsgAddDid {
    pub fn new(did: impl Into<String>, pub_key: impl Into<String>) -> Self {
        Self {
            did_doc: BaseDidDoc {
                did: did.into(),
                pub_key: pub_key.into(),
                credentials: Vec::new(),
            },
        }
    }

    pub fn from_identity(identity: &SovrinDid) -> Self {
        Self::new(identity.did.clone(), identity.verify_key.clone())
    }
}

impl Msg for MsgAddDid {
    const TYPE: &'static str = "did/AddDid";

    fn signer_did(&self) -> &str {
        &self.did_doc.did
    }

    fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        require_non_empty(&mut violations, "did", &self.did_doc.did);
        require_non_empty(&mut violations, "pubKey", &self.did_doc.pub_key);
        violations
    }
}

/// Attaches a credential issued by the signer to an existing DID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MsgAddCredential {
    pub did_credential: DidCredential,
}

impl MsgAddCredential {
    pub fn new(
        did: impl Into<String>,
        cred_type: Vec<String>,
        issuer: impl Into<String>,
        issued: impl Into<String>,
    ) -> Self {
        Self {
            did_credential: DidCredential {
                cred_type,
                issuer: issuer.into(),
                issued: issued.into(),
                claim: CredentialClaim {
                    id: did.into(),
                    kyc_validated: true,
                },
            },
        }
    }

    /// A KYC credential for `did`, issued by `issuer` at `issued` (RFC 3339, seconds).
    pub fn kyc(did: impl Into<String>, issuer: impl Into<String>, issued: DateTime<Utc>) -> Self {
        Self::new(
            did,
            KYC_CREDENTIAL_TYPES.iter().map(|t| t.to_string()).collect(),
            issuer,
            issued.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    pub fn subject_did(&self) -> &str {
        &self.did_credential.claim.id
    }
}

impl Msg for MsgAddCredential {
    const TYPE: &'static str = "did/AddCredential";

    fn signer_did(&self) -> &str {
        &self.did_credential.issuer
    }

    fn violations(&self) -> Vec<Violation> {
        let credential = &self.did_credential;
        let mut violations = Vec::new();
        require_non_empty(&mut violations, "claim.id", &credential.claim.id);
        require_non_empty(&mut violations, "issuer", &credential.issuer);
        require_non_empty(&mut violations, "issued", &credential.issued);
        if credential.cred_type.is_empty() {
            violations.push(Violation::new("credType", "[]", "must list at least one type"));
        }
        violations
    }
}
