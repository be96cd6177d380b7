use crate::*;
use num_bigint::BigUint;
use std::cmp::min;

/// Result of tallying one batch of ballots
#[derive(Debug, Clone, PartialEq)]
pub struct TallyReport {
    pub batch_start_index: usize,
    pub batch_end_index: usize,

    /// Packed `TallyVotesSmallVals` for this batch
    pub packed_vals: BigUint,

    /// Root of the vote option tree over the running results
    pub results_root: HashBytes,

    pub total_spent_voice_credits: u128,
}

impl Poll {
    pub fn has_untallied_ballots(&self) -> bool {
        self.num_batches_tallied * self.batch_sizes.tally_batch_size < self.ballots.len()
    }

    pub fn num_batches_tallied(&self) -> usize {
        self.num_batches_tallied
    }

    /// Add the next batch of ballots to the running tally
    ///
    /// Ballots are tallied in index order, blank leaf included. Every message must be
    /// processed first.
    pub fn tally_votes(&mut self) -> Result<TallyReport, Error> {
        if self.has_unprocessed_messages() {
            return Err(Error::UnprocessedMessages);
        }
        if !self.has_untallied_ballots() {
            return Err(Error::TallyComplete);
        }

        let batch_size = self.batch_sizes.tally_batch_size;
        let batch_start_index = self.num_batches_tallied * batch_size;
        let batch_end_index = min(batch_start_index + batch_size, self.ballots.len());

        let packed_vals = TallyVotesSmallVals {
            batch_start_index: batch_start_index as u64,
            batch_size: batch_size as u64,
            num_sign_ups: self.num_sign_ups as u64,
        }
        .pack()?;

        for ballot in &self.ballots[batch_start_index..batch_end_index] {
            for (i, weight) in ballot.votes.iter().enumerate() {
                let weight = *weight as u128;
                let spent = weight * weight;

                self.tally_result[i] += weight;
                self.per_vo_spent_voice_credits[i] += spent;
                self.total_spent_voice_credits += spent;
            }
        }

        self.num_batches_tallied += 1;
        let results_root = self.results_root()?;

        log::info!(
            "poll {}: tallied ballots {}..{}, {} voice credits spent so far",
            self.poll_id,
            batch_start_index,
            batch_end_index,
            self.total_spent_voice_credits
        );

        Ok(TallyReport {
            batch_start_index,
            batch_end_index,
            packed_vals,
            results_root,
            total_spent_voice_credits: self.total_spent_voice_credits,
        })
    }

    /// Tally every remaining batch
    pub fn tally_all_votes(&mut self) -> Result<&[u128], Error> {
        while self.has_untallied_ballots() {
            self.tally_votes()?;
        }
        Ok(&self.tally_result)
    }

    /// Root of the vote option tree over `tally_result`
    pub fn results_root(&self) -> Result<HashBytes, Error> {
        let leaves: Vec<HashBytes> = self.tally_result.iter().map(|v| u128_to_leaf(*v)).collect();
        compute_root(
            self.tree_depths.vote_option_tree_depth,
            [0u8; HASH_LEN],
            &leaves,
        )
    }

    /// Total vote weight per vote option
    pub fn tally_result(&self) -> &[u128] {
        &self.tally_result
    }

    /// Voice credits spent per vote option
    pub fn per_vo_spent_voice_credits(&self) -> &[u128] {
        &self.per_vo_spent_voice_credits
    }

    pub fn total_spent_voice_credits(&self) -> u128 {
        self.total_spent_voice_credits
    }
}
