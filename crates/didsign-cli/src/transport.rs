// Tendermint JSON-RPC transport for the ledger node
// One blocking request per call; retries are left to the operator

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use didsign_crypto::{BroadcastResponse, LedgerTransport, TransportError};
use serde::Deserialize;
use serde_json::{json, Value};

/// Talks to a node's RPC endpoint, e.g. `http://localhost:26657`.
#[derive(Debug, Clone)]
pub struct RpcTransport {
    endpoint: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
}

#[derive(Debug, Deserialize)]
struct BroadcastCommit {
    #[serde(default)]
    check_tx: TxResult,
    #[serde(default)]
    deliver_tx: TxResult,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    height: Value,
}

#[derive(Debug, Deserialize)]
struct AbciQuery {
    response: AbciQueryResponse,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
}

impl RpcTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        tracing::debug!(endpoint = %self.endpoint, method, "rpc request");

        let response = match self.agent.post(&self.endpoint).send_json(request) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let reason = response
                    .into_string()
                    .unwrap_or_else(|e| format!("unreadable body: {}", e));
                return Err(TransportError::Status { status, reason });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportError::Unreachable(transport.to_string()));
            }
        };

        let body: RpcResponse = response
            .into_json()
            .map_err(|e| TransportError::InvalidResponse(format!("{} response is not JSON-RPC: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(TransportError::InvalidResponse(format!(
                "{} failed with rpc error {}: {} {}",
                method,
                error.code,
                error.message,
                error.data.unwrap_or_default()
            )));
        }

        body.result
            .ok_or_else(|| TransportError::InvalidResponse(format!("{} response has no result", method)))
    }
}

impl LedgerTransport for RpcTransport {
    fn broadcast(&self, envelope_bytes: &[u8]) -> Result<BroadcastResponse, TransportError> {
        let raw = self.call(
            "broadcast_tx_commit",
            json!({ "tx": BASE64_STANDARD.encode(envelope_bytes) }),
        )?;

        let commit: BroadcastCommit = serde_json::from_value(raw.clone())
            .map_err(|e| TransportError::InvalidResponse(format!("malformed broadcast result: {}", e)))?;

        // A transaction failing CheckTx never reaches a block.
        if commit.check_tx.code != 0 {
            return Ok(BroadcastResponse {
                height: 0,
                tx_hash: commit.hash,
                code: commit.check_tx.code,
                log: commit.check_tx.log,
                raw,
            });
        }

        Ok(BroadcastResponse {
            height: parse_height(&commit.height)?,
            tx_hash: commit.hash,
            code: commit.deliver_tx.code,
            log: commit.deliver_tx.log,
            raw,
        })
    }

    fn query(&self, path: &str, key: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let raw = self.call(
            "abci_query",
            json!({
                "path": path,
                "data": hex::encode(key.as_bytes()),
                "height": "0",
                "prove": false,
            }),
        )?;

        let query: AbciQuery = serde_json::from_value(raw)
            .map_err(|e| TransportError::InvalidResponse(format!("malformed query result: {}", e)))?;

        if query.response.code != 0 {
            tracing::debug!(path, code = query.response.code, log = %query.response.log, "query found nothing");
            return Ok(None);
        }

        match query.response.value {
            None => Ok(None),
            Some(value) => BASE64_STANDARD
                .decode(value)
                .map(Some)
                .map_err(|e| TransportError::InvalidResponse(format!("query value is not base64: {}", e))),
        }
    }
}

/// Heights arrive as strings from current nodes and as numbers from older ones.
fn parse_height(height: &Value) -> Result<i64, TransportError> {
    match height {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| TransportError::InvalidResponse(format!("invalid height {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| TransportError::InvalidResponse(format!("invalid height '{}'", s))),
        other => Err(TransportError::InvalidResponse(format!("invalid height {}", other))),
    }
}
