use crate::*;
use ed25519_dalek::PublicKey;
use ed25519_dalek::Signature;
use ed25519_dalek::Verifier;
use rand::Rng;
use rand_core::{CryptoRng, RngCore};

/// A voter's instruction to a poll
///
/// A command casts `new_vote_weight` votes for `vote_option_index` and sets the
/// participant's public key to `new_pub_key`, which may be unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub state_index: u64,
    pub new_pub_key: PubKey,
    pub vote_option_index: u64,
    pub new_vote_weight: u64,
    pub nonce: u64,
    pub poll_id: u64,
    pub salt: [u8; 16],
}

impl Command {
    /// Create a new command with a random salt
    pub fn new(
        state_index: u64,
        new_pub_key: PubKey,
        vote_option_index: u64,
        new_vote_weight: u64,
        nonce: u64,
        poll_id: u64,
    ) -> Self {
        Command::generate(
            state_index,
            new_pub_key,
            vote_option_index,
            new_vote_weight,
            nonce,
            poll_id,
            &mut rand::thread_rng(),
        )
    }

    /// Create a new command, drawing the salt from the given RNG
    pub fn generate<R: CryptoRng + RngCore>(
        state_index: u64,
        new_pub_key: PubKey,
        vote_option_index: u64,
        new_vote_weight: u64,
        nonce: u64,
        poll_id: u64,
        rng: &mut R,
    ) -> Self {
        Command {
            state_index,
            new_pub_key,
            vote_option_index,
            new_vote_weight,
            nonce,
            poll_id,
            salt: rng.gen(),
        }
    }

    /// Deterministic encoding that signatures are computed over
    pub fn as_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(self)?)
    }

    pub fn sign(&self, priv_key: &PrivKey) -> Result<Signature, Error> {
        let serialized = self.as_bytes()?;
        let expanded = priv_key.expanded()?;
        let public_key = PublicKey::from(&expanded);

        Ok(expanded.sign(&serialized, &public_key))
    }

    pub fn verify_signature(&self, signature: &Signature, pub_key: &PubKey) -> bool {
        match self.as_bytes() {
            Ok(serialized) => pub_key.0.verify(&serialized, signature).is_ok(),
            Err(_) => false,
        }
    }

    /// Encrypt the signed command into a message for the coordinator
    pub fn encrypt(&self, signature: &Signature, shared_key: &SharedKey) -> Result<Message, Error> {
        self.encrypt_with_rng(signature, shared_key, &mut rand::thread_rng())
    }

    /// Like `encrypt`, drawing the IV from the given RNG
    pub fn encrypt_with_rng<R: CryptoRng + RngCore>(
        &self,
        signature: &Signature,
        shared_key: &SharedKey,
        rng: &mut R,
    ) -> Result<Message, Error> {
        let signed = SignedCommand {
            command: self.clone(),
            signature: *signature,
        };
        let plaintext = serde_cbor::to_vec(&signed)?;

        Ok(Message {
            data: encrypt_with_rng(shared_key, &plaintext, rng)?,
        })
    }
}

/// A command together with its signature, as carried inside a message
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignedCommand {
    pub command: Command,

    #[serde(with = "EdSignatureHex")]
    pub signature: Signature,
}

impl SignedCommand {
    /// Verify the signature against the given public key
    pub fn verify(&self, pub_key: &PubKey) -> bool {
        self.command.verify_signature(&self.signature, pub_key)
    }
}

/// An encrypted command
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    #[serde(with = "hex_serde")]
    pub data: Vec<u8>,
}

impl Message {
    /// Leaf of the message tree for this message and the key it was encrypted with
    pub fn hash(&self, enc_pub_key: &PubKey) -> HashBytes {
        let mut preimage = Vec::with_capacity(self.data.len() + 32);
        preimage.extend_from_slice(&self.data);
        preimage.extend_from_slice(enc_pub_key.as_bytes());
        hash_bytes(&preimage)
    }

    pub fn decrypt(&self, shared_key: &SharedKey) -> Result<SignedCommand, Error> {
        let plaintext = decrypt(shared_key, &self.data)?;
        Ok(serde_cbor::from_slice(&plaintext)?)
    }
}
