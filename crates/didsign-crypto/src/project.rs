// Project creation message. The project document itself is free-form JSON.

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::identity::SovrinDid;
use crate::operation::{require_non_empty, Msg};
use crate::validation::Violation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MsgCreateProject {
    pub tx_hash: String,
    pub sender_did: String,
    pub project_did: String,
    pub pub_key: String,
    pub data: serde_json::Value,
}

impl MsgCreateProject {
    /// Builds the message from a caller-supplied project document.
    ///
    /// The document must be a JSON object, and every number in it must be
    /// exactly representable as an integer or an IEEE-754 double.
    pub fn new(
        sender_did: impl Into<String>,
        project_doc: &str,
        project: &SovrinDid,
    ) -> Result<Self> {
        let raw: Box<RawValue> = serde_json::from_str(project_doc).map_err(|e| {
            Error::MalformedInput(format!("Could not parse project document: {}", e))
        })?;
        check_numbers_lossless(&raw, "data")?;

        let data: serde_json::Value = serde_json::from_str(raw.get()).map_err(|e| {
            Error::MalformedInput(format!("Could not parse project document: {}", e))
        })?;
        if !data.is_object() {
            return Err(Error::MalformedInput(
                "Project document must be a JSON object".to_string(),
            ));
        }

        Ok(Self {
            tx_hash: String::new(),
            sender_did: sender_did.into(),
            project_did: project.did.clone(),
            pub_key: project.verify_key.clone(),
            data,
        })
    }
}

impl Msg for MsgCreateProject {
    const TYPE: &'static str = "project/CreateProject";

    fn signer_did(&self) -> &str {
        &self.project_did
    }

    fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        require_non_empty(&mut violations, "senderDid", &self.sender_did);
        require_non_empty(&mut violations, "projectDid", &self.project_did);
        require_non_empty(&mut violations, "pubKey", &self.pub_key);
        violations
    }
}

/// Rejects number tokens that would change value once held as `i64`, `u64` or `f64`.
fn check_numbers_lossless(raw: &RawValue, path: &str) -> Result<()> {
    let token = raw.get().trim();
    let malformed = |e: serde_json::Error| Error::MalformedInput(format!("Could not parse project document: {}", e));

    match token.chars().next() {
        Some('{') => {
            let fields: BTreeMap<String, Box<RawValue>> = serde_json::from_str(token).map_err(malformed)?;
            for (key, value) in &fields {
                check_numbers_lossless(value, &format!("{}.{}", path, key))?;
            }
            Ok(())
        }
        Some('[') => {
            let items: Vec<Box<RawValue>> = serde_json::from_str(token).map_err(malformed)?;
            for (i, value) in items.iter().enumerate() {
                check_numbers_lossless(value, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        Some(c) if c == '-' || c.is_ascii_digit() => {
            if token.parse::<i64>().is_ok() || token.parse::<u64>().is_ok() {
                return Ok(());
            }
            let exact = BigDecimal::from_str(token).ok();
            let as_double = token
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .and_then(|d| BigDecimal::from_str(&d.to_string()).ok());
            match (exact, as_double) {
                (Some(exact), Some(as_double)) if exact == as_double => Ok(()),
                _ => Err(Error::MalformedInput(format!(
                    "Number {} at '{}' cannot be represented exactly",
                    token, path
                ))),
            }
        }
        _ => Ok(()),
    }
}
