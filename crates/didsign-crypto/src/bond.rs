// Bond documents, the bond lifecycle status and the two bond messages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::SovrinDid;
use crate::operation::{require_non_empty, Msg};
use crate::validation::Violation;

/// Lifecycle status of a bond.
///
/// `PREISSUANCE -> OPEN`, `OPEN <-> SUSPENDED`, `OPEN -> CLOSED`,
/// `OPEN | CLOSED -> SETTLEMENT`, `SETTLEMENT -> ENDED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BondStatus {
    PreIssuance,
    Open,
    Suspended,
    Closed,
    Settlement,
    Ended,
}

impl BondStatus {
    pub const ALL: [BondStatus; 6] = [
        BondStatus::PreIssuance,
        BondStatus::Open,
        BondStatus::Suspended,
        BondStatus::Closed,
        BondStatus::Settlement,
        BondStatus::Ended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BondStatus::PreIssuance => "PREISSUANCE",
            BondStatus::Open => "OPEN",
            BondStatus::Suspended => "SUSPENDED",
            BondStatus::Closed => "CLOSED",
            BondStatus::Settlement => "SETTLEMENT",
            BondStatus::Ended => "ENDED",
        }
    }

    /// Whether the lifecycle graph allows moving from `self` to `next`.
    ///
    /// Not enforced when building messages; the ledger owns transition rules.
    pub fn can_transition_to(&self, next: BondStatus) -> bool {
        use BondStatus::*;
        matches!(
            (self, next),
            (PreIssuance, Open)
                | (Open, Suspended)
                | (Suspended, Open)
                | (Open, Closed)
                | (Open, Settlement)
                | (Closed, Settlement)
                | (Settlement, Ended)
        )
    }
}

impl fmt::Display for BondStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BondStatus {
    type Err = Error;

    /// Exact, case-sensitive match against the six literals.
    fn from_str(s: &str) -> Result<Self> {
        BondStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                Error::MalformedInput(format!(
                    "The status must be one of 'PREISSUANCE', 'OPEN', 'SUSPENDED', \
                     'CLOSED', 'SETTLEMENT' or 'ENDED', got '{}'",
                    s
                ))
            })
    }
}

/// Bond document supplied by the caller when creating a bond.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BondDoc {
    #[serde(default)]
    pub created_on: String,
    #[serde(default)]
    pub created_by: String,
    pub status: BondStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateBondStatusDoc {
    pub status: BondStatus,
}

/// Registers a new bond, signed by the bond's own DID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MsgCreateBond {
    pub tx_hash: String,
    pub sender_did: String,
    pub bond_did: String,
    pub pub_key: String,
    pub data: BondDoc,
}

impl MsgCreateBond {
    pub fn new(sender_did: impl Into<String>, data: BondDoc, bond: &SovrinDid) -> Self {
        Self {
            tx_hash: String::new(),
            sender_did: sender_did.into(),
            bond_did: bond.did.clone(),
            pub_key: bond.verify_key.clone(),
            data,
        }
    }
}

impl Msg for MsgCreateBond {
    const TYPE: &'static str = "bonddoc/CreateBond";

    fn signer_did(&self) -> &str {
        &self.bond_did
    }

    fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        require_non_empty(&mut violations, "senderDid", &self.sender_did);
        require_non_empty(&mut violations, "bondDid", &self.bond_did);
        require_non_empty(&mut violations, "pubKey", &self.pub_key);
        violations
    }
}

/// Moves a bond to a new lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MsgUpdateBondStatus {
    pub tx_hash: String,
    pub sender_did: String,
    pub bond_did: String,
    pub data: UpdateBondStatusDoc,
}

impl MsgUpdateBondStatus {
    pub fn new(sender_did: impl Into<String>, status: BondStatus, bond: &SovrinDid) -> Self {
        Self {
            tx_hash: String::new(),
            sender_did: sender_did.into(),
            bond_did: bond.did.clone(),
            data: UpdateBondStatusDoc { status },
        }
    }
}

impl Msg for MsgUpdateBondStatus {
    const TYPE: &'static str = "bonddoc/UpdateBondStatus";

    fn signer_did(&self) -> &str {
        &self.bond_did
    }

    fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        require_non_empty(&mut violations, "senderDid", &self.sender_did);
        require_non_empty(&mut violations, "bondDid", &self.bond_did);
        violations
    }
}
