use digest::Digest;
use sha2::Sha256;

pub const HASH_LEN: usize = 32;

/// Arity of every tree in the protocol
pub const ARITY: usize = 5;

pub type HashBytes = [u8; HASH_LEN];

/// SHA-256 of an arbitrary byte string
pub fn hash_bytes(data: &[u8]) -> HashBytes {
    let digest = Sha256::digest(data);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Hash five child nodes into their parent
pub fn hash5(children: &[HashBytes; ARITY]) -> HashBytes {
    let mut hasher = Sha256::new();
    for child in children.iter() {
        hasher.update(child);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Zero value of the message tree.
///
/// Nobody knows a preimage that hashes to it as a message.
pub fn nothing_up_my_sleeve() -> HashBytes {
    hash_bytes(b"Maci")
}

/// Encode an integer as a big-endian tree leaf
pub fn u128_to_leaf(value: u128) -> HashBytes {
    let mut out = [0u8; HASH_LEN];
    out[HASH_LEN - 16..].copy_from_slice(&value.to_be_bytes());
    out
}
