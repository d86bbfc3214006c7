//! Transaction signature verification seam.

use blocklane_primitives::SignedTx;

/// Checks that a decoded transaction is authorised by its signer.
pub trait TxVerifier: Send + Sync {
    fn verify(&self, tx: &SignedTx) -> bool;
}

/// Ed25519 over the body bytes, keyed by the signer address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl TxVerifier for Ed25519Verifier {
    fn verify(&self, tx: &SignedTx) -> bool {
        tx.verify_signature()
    }
}
