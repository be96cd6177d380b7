use crate::*;

/// Index of a participant in the state tree. Index 0 is the blank leaf.
pub type StateIndex = usize;

/// A participant's record in the state tree
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StateLeaf {
    pub pub_key: PubKey,
    pub voice_credit_balance: u64,
    pub timestamp: u64,
}

impl StateLeaf {
    pub fn new(pub_key: PubKey, voice_credit_balance: u64, timestamp: u64) -> Self {
        StateLeaf {
            pub_key,
            voice_credit_balance,
            timestamp,
        }
    }

    /// The padding leaf stored at index 0
    pub fn blank() -> Self {
        StateLeaf::new(PubKey::blank(), 0, 0)
    }

    pub fn hash(&self) -> HashBytes {
        let mut preimage = Vec::with_capacity(48);
        preimage.extend_from_slice(self.pub_key.as_bytes());
        preimage.extend_from_slice(&self.voice_credit_balance.to_be_bytes());
        preimage.extend_from_slice(&self.timestamp.to_be_bytes());
        hash_bytes(&preimage)
    }
}

/// Hash of the blank state leaf, also the zero value of the state tree
pub fn blank_state_leaf_hash() -> HashBytes {
    StateLeaf::blank().hash()
}
