// didsign-crypto - Sovrin DID signing of ledger operations

pub mod bond;
pub mod did;
pub mod did_doc;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod identity;
pub mod jcs;
pub mod operation;
pub mod params;
pub mod pipeline;
pub mod project;
pub mod sign;
pub mod submit;
pub mod validation;
pub mod verify;

pub use bond::{BondDoc, BondStatus, MsgCreateBond, MsgUpdateBondStatus, UpdateBondStatusDoc};
pub use did::{did_from_verify_key, qualified_did};
pub use did_doc::{MsgAddCredential, MsgAddDid};
pub use envelope::{Envelope, EnvelopeSignature, SignerRef};
pub use error::{Error, Result, TransportError};
pub use hash::tx_hash_hex;
pub use identity::{assemble_keypair, KeypairBytes, SovrinDid, SovrinSecret};
pub use jcs::jcs_canonical_bytes;
pub use operation::{Msg, Operation};
pub use params::{Coin, PaymentParams, PaymentParamsInput};
pub use pipeline::{sign_operation, PipelineOptions, SubmissionPipeline};
pub use project::MsgCreateProject;
pub use sign::{sign, sign_msg, sign_with_keypair};
pub use submit::{BroadcastResponse, LedgerTransport, SubmissionClient, SubmissionResult};
pub use validation::{is_legal_status, validate_params, validate_params_with_limits, ParamLimits, Violation};
pub use verify::verify_envelope;
