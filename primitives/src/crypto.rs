//! Hashing and signatures.
//!
//! - BLAKE3 identifies transactions (`tx_hash`)
//! - SHA-256 commits to ordered lists of hashes (bundle digests, proposal hashes)
//! - Ed25519 signs transaction bodies; the signer's public key is its address

use crate::types::{Address, Hash};

/// Compute BLAKE3 hash of the input data.
pub fn hash_blake3(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash of a raw, signed transaction.
pub fn tx_hash(raw: &[u8]) -> Hash {
    hash_blake3(raw)
}

/// Compute SHA-256 hash of the input data.
pub fn hash_sha256(data: &[u8]) -> Hash {
    use sha2::Digest;
    let result = sha2::Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// SHA-256 over the concatenation of `hashes`, in order.
///
/// Two lists produce the same digest only if they hold the same hashes
/// in the same order.
pub fn ordered_digest<'a, I>(hashes: I) -> Hash
where
    I: IntoIterator<Item = &'a Hash>,
{
    use sha2::Digest;
    let mut hasher = sha2::Sha256::new();
    for h in hashes {
        hasher.update(h);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Verify an Ed25519 signature. Deterministic, no randomization.
///
/// Returns `false` for malformed keys as well as bad signatures.
pub fn verify_ed25519(message: &[u8], signature: &[u8; 64], public_key: &Address) -> bool {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

/// Sign a message with an Ed25519 private key.
#[cfg(feature = "std")]
pub fn sign_ed25519(message: &[u8], secret_key: &ed25519_dalek::SigningKey) -> [u8; 64] {
    use ed25519_dalek::Signer;
    secret_key.sign(message).to_bytes()
}

/// Keypair whose secret is `[seed; 32]`, giving reproducible keys in tests.
pub fn deterministic_keypair(seed: u8) -> (Address, ed25519_dalek::SigningKey) {
    let signing_key = ed25519_dalek::SigningKey::from_bytes(&[seed; 32]);
    (*signing_key.verifying_key().as_bytes(), signing_key)
}

/// Generate a fresh Ed25519 keypair from OS randomness.
#[cfg(feature = "std")]
pub fn generate_keypair() -> (Address, ed25519_dalek::SigningKey) {
    let mut rng = rand::rngs::OsRng;
    let signing_key = ed25519_dalek::SigningKey::generate(&mut rng);
    (*signing_key.verifying_key().as_bytes(), signing_key)
}
