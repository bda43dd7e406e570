// The `Msg` trait implemented by every ledger message, and the tagged
// `Operation` enum that carries a message on the wire.

use serde::{Deserialize, Serialize};

use crate::bond::{MsgCreateBond, MsgUpdateBondStatus};
use crate::did_doc::{MsgAddCredential, MsgAddDid};
use crate::error::{Error, Result};
use crate::jcs::jcs_canonical_bytes;
use crate::project::MsgCreateProject;
use crate::validation::Violation;

/// A state-changing ledger message that must be co-signed by an identity.
pub trait Msg: Serialize {
    /// Wire type tag, e.g. `bonddoc/CreateBond`.
    const TYPE: &'static str;

    /// DID of the identity whose key must sign this message.
    fn signer_did(&self) -> &str;

    /// Every stateless invariant this message breaks. Empty when well-formed.
    fn violations(&self) -> Vec<Violation>;

    fn validate_basic(&self) -> Result<()> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed(violations))
        }
    }

    /// The exact bytes that get signed: the JCS form of the message value.
    fn sign_bytes(&self) -> Result<Vec<u8>> {
        jcs_canonical_bytes(self)
    }
}

/// Any supported message, tagged the way the ledger expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum Operation {
    #[serde(rename = "bonddoc/CreateBond")]
    CreateBond(MsgCreateBond),
    #[serde(rename = "bonddoc/UpdateBondStatus")]
    UpdateBondStatus(MsgUpdateBondStatus),
    #[serde(rename = "did/AddDid")]
    AddDid(MsgAddDid),
    #[serde(rename = "did/AddCredential")]
    AddCredential(MsgAddCredential),
    #[serde(rename = "project/CreateProject")]
    CreateProject(MsgCreateProject),
}

macro_rules! dispatch {
    ($self:expr, $msg:ident => $body:expr) => {
        match $self {
            Operation::CreateBond($msg) => $body,
            Operation::UpdateBondStatus($msg) => $body,
            Operation::AddDid($msg) => $body,
            Operation::AddCredential($msg) => $body,
            Operation::CreateProject($msg) => $body,
        }
    };
}

impl Operation {
    pub fn msg_type(&self) -> &'static str {
        fn type_of<M: Msg>(_: &M) -> &'static str {
            M::TYPE
        }
        dispatch!(self, msg => type_of(msg))
    }

    pub fn signer_did(&self) -> &str {
        dispatch!(self, msg => msg.signer_did())
    }

    pub fn validate_basic(&self) -> Result<()> {
        dispatch!(self, msg => msg.validate_basic())
    }

    pub fn sign_bytes(&self) -> Result<Vec<u8>> {
        dispatch!(self, msg => msg.sign_bytes())
    }
}

macro_rules! impl_from_msg {
    ($($msg:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$msg> for Operation {
                fn from(msg: $msg) -> Self {
                    Operation::$variant(msg)
                }
            }
        )*
    };
}

impl_from_msg! {
    MsgCreateBond => CreateBond,
    MsgUpdateBondStatus => UpdateBondStatus,
    MsgAddDid => AddDid,
    MsgAddCredential => AddCredential,
    MsgCreateProject => CreateProject,
}

/// Pushes a violation when a required identifier is blank.
pub(crate) fn require_non_empty(violations: &mut Vec<Violation>, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.push(Violation::new(field, value, "must not be empty"));
    }
}
