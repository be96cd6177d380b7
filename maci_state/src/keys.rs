use crate::*;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::SECRET_KEY_LENGTH;
use rand_core::{CryptoRng, RngCore};

/// A participant's or coordinator's private key
///
/// The same key signs commands and performs ECDH key agreement.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivKey([u8; SECRET_KEY_LENGTH]);

impl PrivKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let secret = SecretKey::from_bytes(bytes)?;
        Ok(PrivKey(secret.to_bytes()))
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.0
    }

    pub(crate) fn expanded(&self) -> Result<ExpandedSecretKey, Error> {
        let secret = SecretKey::from_bytes(&self.0)?;
        Ok(ExpandedSecretKey::from(&secret))
    }
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "PrivKey(..)")
    }
}

/// A public key, used both to verify command signatures and for ECDH
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PubKey(pub(crate) PublicKey);

impl PubKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(PubKey(PublicKey::from_bytes(bytes)?))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// The public key of the blank state leaf
    ///
    /// The bytes come from hashing a fixed string until they decode to a curve point,
    /// so no private key for it is known.
    pub fn blank() -> Self {
        let mut counter: u64 = 0;
        loop {
            let mut preimage = b"maci blank state leaf".to_vec();
            preimage.extend_from_slice(&counter.to_be_bytes());
            if let Ok(public) = PublicKey::from_bytes(&hash_bytes(&preimage)) {
                return PubKey(public);
            }
            counter += 1;
        }
    }
}

impl std::fmt::Display for PubKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

impl std::str::FromStr for PubKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        PubKey::from_bytes(&bytes)
    }
}

/// A private/public key pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keypair {
    pub priv_key: PrivKey,
    pub pub_key: PubKey,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn new() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Keypair::generate(&mut csprng)
    }

    /// Generate a keypair from the given RNG
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let ed25519_dalek::Keypair { public, secret } = ed25519_dalek::Keypair::generate(rng);
        Keypair {
            priv_key: PrivKey(secret.to_bytes()),
            pub_key: PubKey(public),
        }
    }

    /// Rebuild a keypair from a private key
    pub fn from_priv_key(priv_key: PrivKey) -> Result<Self, Error> {
        let secret = SecretKey::from_bytes(&priv_key.0)?;
        let public = PublicKey::from(&secret);
        Ok(Keypair {
            priv_key,
            pub_key: PubKey(public),
        })
    }

    /// Derive the key shared between `priv_key` and the owner of `pub_key`
    pub fn gen_ecdh_shared_key(priv_key: &PrivKey, pub_key: &PubKey) -> Result<SharedKey, Error> {
        derive_shared_key(priv_key, pub_key)
    }
}

impl Default for Keypair {
    fn default() -> Self {
        Keypair::new()
    }
}
