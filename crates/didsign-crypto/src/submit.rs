// Submission of signed envelopes to the ledger.
//
// The ledger itself is reached through a [`LedgerTransport`]; this module
// only encodes the envelope, performs one round trip and interprets the
// answer. It never retries.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::{Error, Result, TransportError};

/// What the ledger reports after processing a broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BroadcastResponse {
    /// Block height the transaction was committed at (0 when not committed).
    pub height: i64,
    /// Transaction hash as reported by the ledger.
    pub tx_hash: String,
    /// Result code; 0 means accepted.
    pub code: u32,
    /// Ledger log or rejection reason.
    pub log: String,
    /// The full acknowledgement as received.
    pub raw: serde_json::Value,
}

/// Request/response access to the ledger.
pub trait LedgerTransport {
    /// Sends encoded envelope bytes and waits for the ledger's answer.
    fn broadcast(&self, envelope_bytes: &[u8]) -> std::result::Result<BroadcastResponse, TransportError>;

    /// Reads the value stored under `key` at `path`; `None` when nothing is stored.
    fn query(&self, path: &str, key: &str) -> std::result::Result<Option<Vec<u8>>, TransportError>;
}

impl<T: LedgerTransport + ?Sized> LedgerTransport for &T {
    fn broadcast(&self, envelope_bytes: &[u8]) -> std::result::Result<BroadcastResponse, TransportError> {
        (**self).broadcast(envelope_bytes)
    }

    fn query(&self, path: &str, key: &str) -> std::result::Result<Option<Vec<u8>>, TransportError> {
        (**self).query(path, key)
    }
}

/// A committed transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionResult {
    pub height: i64,
    pub tx_hash: String,
    pub raw: serde_json::Value,
}

/// Sends envelopes through a transport and interprets the ledger's answer.
#[derive(Debug, Clone)]
pub struct SubmissionClient<T> {
    transport: T,
}

impl<T: LedgerTransport> SubmissionClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Encodes and broadcasts one envelope: exactly one round trip, no retries.
    pub fn submit(&self, envelope: &Envelope) -> Result<SubmissionResult> {
        let bytes = envelope.to_wire_bytes()?;

        let response = self.transport.broadcast(&bytes).map_err(into_submission_error)?;

        if response.code != 0 {
            tracing::warn!(code = response.code, reason = %response.log, "envelope rejected by ledger");
            return Err(Error::Rejected {
                code: response.code,
                reason: response.log,
            });
        }

        tracing::info!(
            height = response.height,
            tx_hash = %response.tx_hash,
            "Committed at block {}. Hash: {}",
            response.height,
            response.tx_hash
        );

        Ok(SubmissionResult {
            height: response.height,
            tx_hash: response.tx_hash,
            raw: response.raw,
        })
    }

    /// Reads raw bytes from the ledger; an empty value is `None`.
    pub fn query(&self, path: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.transport.query(path, key).map_err(into_submission_error)?;
        Ok(value.filter(|bytes| !bytes.is_empty()))
    }
}

/// Status errors mean the ledger answered and said no; anything else is a
/// failure to reach or understand it.
fn into_submission_error(error: TransportError) -> Error {
    match error {
        TransportError::Status { status, reason } => Error::Rejected {
            code: u32::from(status),
            reason,
        },
        other => Error::SubmissionFailed { source: other },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::{BondStatus, MsgUpdateBondStatus};
    use crate::envelope::SignerRef;
    use crate::identity::tests::sample_identity;
    use crate::sign::sign_msg;
    use std::cell::RefCell;

    enum Reply {
        Ok(BroadcastResponse),
        Unreachable,
        Status(u16, &'static str),
    }

    struct ScriptedLedger {
        reply: Reply,
        received: RefCell<Vec<Vec<u8>>>,
    }

    impl ScriptedLedger {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                received: RefCell::new(Vec::new()),
            }
        }
    }

    impl LedgerTransport for ScriptedLedger {
        fn broadcast(&self, envelope_bytes: &[u8]) -> std::result::Result<BroadcastResponse, TransportError> {
            self.received.borrow_mut().push(envelope_bytes.to_vec());
            match &self.reply {
                Reply::Ok(response) => Ok(response.clone()),
                Reply::Unreachable => Err(TransportError::Unreachable("connection refused".to_string())),
                Reply::Status(status, reason) => Err(TransportError::Status {
                    status: *status,
                    reason: reason.to_string(),
                }),
            }
        }

        fn query(&self, _path: &str, _key: &str) -> std::result::Result<Option<Vec<u8>>, TransportError> {
            Ok(Some(Vec::new()))
        }
    }

    fn response(code: u32, log: &str) -> BroadcastResponse {
        BroadcastResponse {
            height: 10,
            tx_hash: "ABCD".to_string(),
            code,
            log: log.to_string(),
            raw: serde_json::json!({"height": "10", "hash": "ABCD"}),
        }
    }

    fn envelope() -> Envelope {
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
            chrono::Utc::now(),
        )
    }

    #[test]
    fn test_successful_submission() {
        let client = SubmissionClient::new(ScriptedLedger::new(Reply::Ok(response(0, ""))));
        let envelope = envelope();

        let result = client.submit(&envelope).unwrap();

        assert_eq!(result.height, 10);
        assert_eq!(result.tx_hash, "ABCD");
        assert_eq!(result.raw["hash"], "ABCD");

        let received = client.transport().received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], envelope.to_wire_bytes().unwrap());
    }

    #[test]
    fn test_nonzero_code_is_rejected_verbatim() {
        let client = SubmissionClient::new(ScriptedLedger::new(Reply::Ok(response(4, "signature verification failed"))));

        match client.submit(&envelope()) {
            Err(Error::Rejected { code, reason }) => {
                assert_eq!(code, 4);
                assert_eq!(reason, "signature verification failed");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_http_status_is_rejected() {
        let client = SubmissionClient::new(ScriptedLedger::new(Reply::Status(500, "internal error")));

        assert!(matches!(
            client.submit(&envelope()),
            Err(Error::Rejected { code: 500, .. })
        ));
    }

    #[test]
    fn test_unreachable_ledger_is_submission_failure() {
        let ledger = ScriptedLedger::new(Reply::Unreachable);
        let client = SubmissionClient::new(&ledger);

        let err = client.submit(&envelope()).unwrap_err();
        assert!(matches!(err, Error::SubmissionFailed { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(ledger.received.borrow().len(), 1, "no retries");
    }

    #[test]
    fn test_empty_query_value_is_none() {
        let client = SubmissionClient::new(ScriptedLedger::new(Reply::Unreachable));
        assert_eq!(client.query("custom/did/queryDidDoc", "abc").unwrap(), None);
    }
}
