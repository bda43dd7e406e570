// Message signing
//
// Signs canonical message bytes with a raw `secret || public` keypair the way
// the ledger verifies them: plain Ed25519, with the public half of the buffer
// bound into the signature hash exactly as supplied.

use ed25519_dalek::hazmat::{raw_sign, ExpandedSecretKey};
use ed25519_dalek::Signature;
use sha2::Sha512;

use crate::error::Result;
use crate::identity::{KeypairBytes, SovrinDid};
use crate::operation::Msg;

/// Signs `canonical_bytes` with a 64-byte keypair buffer.
///
/// Deterministic: the same bytes and keypair always give the same signature.
/// A buffer of any other length fails with `InvalidKeyLength`.
pub fn sign(canonical_bytes: &[u8], keypair: &[u8]) -> Result<Signature> {
    let keypair = KeypairBytes::try_from(keypair)?;
    sign_with_keypair(canonical_bytes, &keypair)
}

/// Signs `canonical_bytes` with an assembled keypair.
///
/// The public half is used as given; if it does not belong to the secret
/// half the signature simply fails verification downstream.
pub fn sign_with_keypair(canonical_bytes: &[u8], keypair: &KeypairBytes) -> Result<Signature> {
    let verifying_key = keypair.verifying_key()?;
    let expanded = ExpandedSecretKey::from(keypair.secret());
    Ok(raw_sign::<Sha512>(&expanded, canonical_bytes, &verifying_key))
}

/// Signs a message's sign bytes with the identity's key material.
pub fn sign_msg<M: Msg>(msg: &M, identity: &SovrinDid) -> Result<Signature> {
    let sign_bytes = msg.sign_bytes()?;
    let keypair = identity.keypair()?;
    sign_with_keypair(&sign_bytes, &keypair)
}
