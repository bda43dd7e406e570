// Command argument loading
// JSON arguments are given inline or as @path to a file

use anyhow::{anyhow, Result};
use didsign_crypto::SovrinDid;

/// Returns the argument itself, or the contents of the file for `@path`.
pub fn read_json_arg(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read '{}': {}", path, e)),
        None => Ok(arg.to_string()),
    }
}

/// Loads a signer identity document (`{did, verifyKey, secret: {signKey, ...}}`).
pub fn read_identity(arg: &str) -> Result<SovrinDid> {
    let json = read_json_arg(arg)?;
    Ok(SovrinDid::from_json(&json)?)
}
