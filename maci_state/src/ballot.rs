use crate::*;

/// A participant's record of votes in a single poll
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    /// Nonce of the last accepted command
    pub nonce: u64,

    /// Vote weight per vote option
    pub votes: Vec<u64>,

    /// Depth of the tree the votes are hashed into
    pub vote_option_tree_depth: u8,
}

impl Ballot {
    pub fn new(num_vote_options: usize, vote_option_tree_depth: u8) -> Self {
        Ballot {
            nonce: 0,
            votes: vec![0; num_vote_options],
            vote_option_tree_depth,
        }
    }

    /// Root of the vote option tree over `votes`
    pub fn vote_option_root(&self) -> Result<HashBytes, Error> {
        let leaves: Vec<HashBytes> = self.votes.iter().map(|v| u128_to_leaf(*v as u128)).collect();
        compute_root(self.vote_option_tree_depth, [0u8; HASH_LEN], &leaves)
    }

    pub fn hash(&self) -> Result<HashBytes, Error> {
        let mut preimage = Vec::with_capacity(8 + HASH_LEN);
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        preimage.extend_from_slice(&self.vote_option_root()?);
        Ok(hash_bytes(&preimage))
    }
}
