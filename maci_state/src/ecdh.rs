//! ECDH key agreement and authenticated encryption of messages.
//!
//! Keys are ed25519 keys. The ECDH scalar of a private key is the clamped scalar of its
//! expanded ed25519 secret, the same scalar that produced its public key, so that
//! `derive_shared_key(a, B) == derive_shared_key(b, A)`.

use crate::*;
use aes_gcm::aead::{generic_array::GenericArray, Aead, NewAead};
use aes_gcm::Aes256Gcm;
use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::scalar::Scalar;
use hkdf::Hkdf;
use rand::{thread_rng, Rng};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;

const AES_IV_LENGTH: usize = 12;

/// A symmetric key shared between a voter's ephemeral key and the coordinator
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SharedKey(..)")
    }
}

/// Derive the shared key between `priv_key` and the holder of `pub_key`
pub fn derive_shared_key(priv_key: &PrivKey, pub_key: &PubKey) -> Result<SharedKey, Error> {
    let shared_point = generate_shared(priv_key, pub_key)?;
    hkdf_sha256(&shared_point).map(SharedKey)
}

fn generate_shared(priv_key: &PrivKey, pub_key: &PubKey) -> Result<[u8; 32], Error> {
    let point = CompressedEdwardsY(pub_key.to_bytes())
        .decompress()
        .ok_or(Error::InvalidPublicKey)?;

    let expanded = priv_key.expanded()?.to_bytes();
    let mut scalar_bits = [0u8; 32];
    scalar_bits.copy_from_slice(&expanded[..32]);
    let scalar = Scalar::from_bits(scalar_bits);

    Ok((point * scalar).compress().to_bytes())
}

fn hkdf_sha256(master: &[u8]) -> Result<[u8; 32], Error> {
    let h = Hkdf::<Sha256>::new(None, master);
    let mut out = [0u8; 32];
    h.expand(b"maci shared key", &mut out)
        .map_err(|_| Error::KeyDerivation)?;
    Ok(out)
}

/// Encrypt `msg` under the shared key. The output is the random IV followed by the ciphertext.
pub fn encrypt(key: &SharedKey, msg: &[u8]) -> Result<Vec<u8>, Error> {
    encrypt_with_rng(key, msg, &mut thread_rng())
}

/// Like `encrypt`, drawing the IV from the given RNG
pub fn encrypt_with_rng<R: CryptoRng + RngCore>(
    key: &SharedKey,
    msg: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, Error> {
    let aead = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    let mut nonce = [0u8; AES_IV_LENGTH];
    rng.fill(&mut nonce);
    let nonce = GenericArray::from_slice(&nonce);

    let ciphertext = aead.encrypt(nonce, msg).map_err(|_| Error::Encryption)?;

    let mut output = Vec::with_capacity(AES_IV_LENGTH + ciphertext.len());
    output.extend_from_slice(nonce);
    output.extend(ciphertext);

    Ok(output)
}

/// Decrypt the output of `encrypt`
pub fn decrypt(key: &SharedKey, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
    if ciphertext.len() < AES_IV_LENGTH {
        return Err(Error::Decryption);
    }
    let aead = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    let nonce = GenericArray::from_slice(&ciphertext[..AES_IV_LENGTH]);
    let encrypted = &ciphertext[AES_IV_LENGTH..];

    aead.decrypt(nonce, encrypted).map_err(|_| Error::Decryption)
}
