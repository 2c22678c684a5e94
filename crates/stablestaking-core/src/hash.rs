use sha2::{Digest, Sha256};

use crate::Hash32;

/// Compute a domain-separated SHA-256 hash: `H(domain || data)`.
pub fn sha256_domain(domain: &[u8], data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash32(bytes)
}

// =============================================================================
// Domain separation (v1)
// =============================================================================

/// Domain separation tag for deriving module account addresses.
pub const MODULE_ADDRESS_DOMAIN_V1: &[u8] = b"STABLESTAKING_MODULE_ADDRESS_V1";

/// Domain separation tag for hashing canonical ledger state preimages.
pub const LEDGER_STATE_DOMAIN_V1: &[u8] = b"STABLESTAKING_LEDGER_STATE_V1";

/// Hash canonical v1 ledger state preimage bytes into a commitment.
pub fn hash_ledger_preimage_v1(preimage: &[u8]) -> Hash32 {
    sha256_domain(LEDGER_STATE_DOMAIN_V1, preimage)
}

/// Append a length-prefixed byte string to a canonical preimage.
pub fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

pub fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}
