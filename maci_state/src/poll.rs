use crate::*;
use num_bigint::BigUint;
use std::cmp::min;
use std::convert::TryFrom;

/// Sequential poll identifier, assigned by the registry
pub type PollId = usize;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizes {
    pub message_batch_size: usize,
    pub tally_batch_size: usize,
}

/// Result of processing one batch of messages
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub batch_start_index: usize,
    pub batch_end_index: usize,

    /// Packed `ProcessMessageSmallVals` for this batch
    pub packed_vals: BigUint,

    /// Roots after the batch was applied
    pub state_root: HashBytes,
    pub ballot_root: HashBytes,

    /// Message index and outcome of every message, in the order they were applied
    pub outcomes: Vec<(usize, Outcome)>,
}

/// Snapshot of a poll's mutable state
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProcessedState {
    pub state_leaves: Vec<StateLeaf>,
    pub ballots: Vec<Ballot>,
}

// A command that passed every check, and the balance it leaves
struct Transition {
    state_index: usize,
    vote_option_index: usize,
    new_balance: u64,
}

/// A poll
///
/// A poll owns its own copy of the state leaves taken when it was deployed. Messages
/// are published into an append-only log, then processed batch by batch from the end
/// of the log towards the start, then the resulting ballots are tallied batch by batch.
#[derive(Clone, Debug)]
pub struct Poll {
    pub(crate) poll_id: PollId,
    pub(crate) end_time: u64,
    pub(crate) coordinator_keypair: Keypair,
    pub(crate) max_values: MaxValues,
    pub(crate) tree_depths: TreeDepths,
    pub(crate) batch_sizes: BatchSizes,
    pub(crate) num_sign_ups: usize,

    pub(crate) messages: Vec<Message>,
    pub(crate) enc_pub_keys: Vec<PubKey>,
    pub(crate) message_tree: IncrementalQuinTree,
    pub(crate) message_aq: AccQueue,

    pub(crate) state_leaves: Vec<StateLeaf>,
    pub(crate) state_tree: IncrementalQuinTree,
    pub(crate) ballots: Vec<Ballot>,
    pub(crate) ballot_tree: IncrementalQuinTree,

    pub(crate) num_batches_processed: usize,
    pub(crate) current_message_batch_index: Option<usize>,

    pub(crate) num_batches_tallied: usize,
    pub(crate) tally_result: Vec<u128>,
    pub(crate) per_vo_spent_voice_credits: Vec<u128>,
    pub(crate) total_spent_voice_credits: u128,
}

impl Poll {
    /// Create a poll over a snapshot of the registry's state leaves
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        poll_id: PollId,
        end_time: u64,
        max_values: MaxValues,
        tree_depths: TreeDepths,
        message_batch_size: usize,
        coordinator_keypair: Keypair,
        state_leaves: Vec<StateLeaf>,
        state_tree_depth: u8,
    ) -> Result<Self, Error> {
        if message_batch_size == 0 {
            return Err(Error::InvalidPollConfig("message batch size must be positive"));
        }
        if max_values.max_vote_options == 0 {
            return Err(Error::InvalidPollConfig("at least one vote option is required"));
        }
        if max_values.max_vote_options > tree_capacity(tree_depths.vote_option_tree_depth) {
            return Err(Error::InvalidPollConfig(
                "vote options do not fit in the vote option tree",
            ));
        }
        if tree_depths.message_tree_sub_depth > tree_depths.message_tree_depth {
            return Err(Error::InvalidPollConfig(
                "message tree sub depth exceeds the message tree depth",
            ));
        }

        let num_sign_ups = state_leaves.len().saturating_sub(1);
        if num_sign_ups > max_values.max_users {
            return Err(Error::InvalidPollConfig("more sign ups than max users"));
        }

        let blank_ballot = Ballot::new(
            max_values.max_vote_options,
            tree_depths.vote_option_tree_depth,
        );
        let ballots = vec![blank_ballot.clone(); state_leaves.len()];

        let ballot_hashes = ballots
            .iter()
            .map(|ballot| ballot.hash())
            .collect::<Result<Vec<_>, _>>()?;
        let ballot_tree =
            IncrementalQuinTree::from_leaves(state_tree_depth, blank_ballot.hash()?, &ballot_hashes)?;

        let leaf_hashes: Vec<HashBytes> = state_leaves.iter().map(StateLeaf::hash).collect();
        let state_tree =
            IncrementalQuinTree::from_leaves(state_tree_depth, blank_state_leaf_hash(), &leaf_hashes)?;

        let message_tree =
            IncrementalQuinTree::new(tree_depths.message_tree_depth, nothing_up_my_sleeve());
        let message_aq = AccQueue::new(tree_depths.message_tree_sub_depth, nothing_up_my_sleeve());

        Ok(Poll {
            poll_id,
            end_time,
            coordinator_keypair,
            max_values,
            tree_depths,
            batch_sizes: BatchSizes {
                message_batch_size,
                tally_batch_size: tree_capacity(tree_depths.int_state_tree_depth),
            },
            num_sign_ups,
            messages: vec![],
            enc_pub_keys: vec![],
            message_tree,
            message_aq,
            state_leaves,
            state_tree,
            ballots,
            ballot_tree,
            num_batches_processed: 0,
            current_message_batch_index: None,
            num_batches_tallied: 0,
            tally_result: vec![0; max_values.max_vote_options],
            per_vo_spent_voice_credits: vec![0; max_values.max_vote_options],
            total_spent_voice_credits: 0,
        })
    }

    pub fn poll_id(&self) -> PollId {
        self.poll_id
    }

    /// Closing time, enforced by the caller
    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    pub fn coordinator_pub_key(&self) -> &PubKey {
        &self.coordinator_keypair.pub_key
    }

    pub fn max_values(&self) -> MaxValues {
        self.max_values
    }

    pub fn tree_depths(&self) -> TreeDepths {
        self.tree_depths
    }

    pub fn batch_sizes(&self) -> BatchSizes {
        self.batch_sizes
    }

    pub fn num_sign_ups(&self) -> usize {
        self.num_sign_ups
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn enc_pub_keys(&self) -> &[PubKey] {
        &self.enc_pub_keys
    }

    pub fn state_leaves(&self) -> &[StateLeaf] {
        &self.state_leaves
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn num_batches_processed(&self) -> usize {
        self.num_batches_processed
    }

    /// Start index of the next batch to process, `None` before the first batch
    pub fn current_message_batch_index(&self) -> Option<usize> {
        self.current_message_batch_index
    }

    pub fn state_root(&self) -> HashBytes {
        self.state_tree.root()
    }

    pub fn ballot_root(&self) -> HashBytes {
        self.ballot_tree.root()
    }

    pub fn message_root(&self) -> HashBytes {
        self.message_tree.root()
    }

    /// Append a message to the log
    ///
    /// The message is not inspected. Invalid commands are discarded during processing.
    pub fn publish_message(&mut self, message: Message, enc_pub_key: PubKey) -> Result<(), Error> {
        if self.current_message_batch_index.is_some() {
            return Err(Error::ProcessingStarted);
        }
        if self.message_aq.is_merged() {
            return Err(Error::AccQueueMerged);
        }

        let leaf = message.hash(&enc_pub_key);
        self.message_tree.insert(leaf)?;
        self.message_aq.enqueue(leaf)?;

        self.messages.push(message);
        self.enc_pub_keys.push(enc_pub_key);

        Ok(())
    }

    /// Merge the message accumulator queue, closing the log to new messages
    pub fn merge_message_aq(&mut self) -> Result<HashBytes, Error> {
        self.message_aq.merge_sub_roots(0)?;
        self.message_aq.merge(self.tree_depths.message_tree_depth)
    }

    pub fn has_unprocessed_messages(&self) -> bool {
        self.num_batches_processed * self.batch_sizes.message_batch_size < self.messages.len()
    }

    /// Process the next batch of messages
    ///
    /// Batches are taken from the end of the log towards the start and the messages of
    /// a batch are applied last to first. Returns `None`, leaving the poll untouched, once
    /// every message has been processed.
    pub fn process_messages(&mut self) -> Result<Option<BatchReport>, Error> {
        if !self.has_unprocessed_messages() {
            return Ok(None);
        }

        let batch_size = self.batch_sizes.message_batch_size;
        let num_messages = self.messages.len();

        let batch_start_index = match self.current_message_batch_index {
            Some(index) => index,
            None => match num_messages % batch_size {
                0 => num_messages - batch_size,
                remainder => num_messages - remainder,
            },
        };
        let batch_end_index = min(batch_start_index + batch_size, num_messages);

        let packed_vals = ProcessMessageSmallVals {
            max_vote_options: self.max_values.max_vote_options as u64,
            num_users: self.num_sign_ups as u64,
            batch_start_index: batch_start_index as u64,
            batch_end_index: batch_end_index as u64,
        }
        .pack()?;

        let mut outcomes = Vec::with_capacity(batch_end_index - batch_start_index);
        for index in (batch_start_index..batch_end_index).rev() {
            let outcome = self.process_message(index)?;
            if let Outcome::Rejected(reason) = outcome {
                log::debug!("poll {}: message {} rejected: {}", self.poll_id, index, reason);
            }
            outcomes.push((index, outcome));
        }

        self.num_batches_processed += 1;
        self.current_message_batch_index = Some(batch_start_index.saturating_sub(batch_size));

        log::info!(
            "poll {}: processed messages {}..{} (batch {})",
            self.poll_id,
            batch_start_index,
            batch_end_index,
            self.num_batches_processed
        );

        Ok(Some(BatchReport {
            batch_start_index,
            batch_end_index,
            packed_vals,
            state_root: self.state_root(),
            ballot_root: self.ballot_root(),
            outcomes,
        }))
    }

    /// Process every remaining batch and return the resulting state
    pub fn process_all_messages(&mut self) -> Result<ProcessedState, Error> {
        while self.has_unprocessed_messages() {
            self.process_messages()?;
        }
        Ok(self.processed_state())
    }

    pub fn processed_state(&self) -> ProcessedState {
        ProcessedState {
            state_leaves: self.state_leaves.clone(),
            ballots: self.ballots.clone(),
        }
    }

    /// Decrypt, validate and apply the message at `index`
    pub(crate) fn process_message(&mut self, index: usize) -> Result<Outcome, Error> {
        let signed = match self.decrypt_message(index) {
            Some(signed) => signed,
            None => return Ok(Outcome::Rejected(RejectReason::Undecryptable)),
        };

        let transition = match self.check_command(&signed) {
            Ok(transition) => transition,
            Err(reason) => return Ok(Outcome::Rejected(reason)),
        };
        let command = signed.command;
        let state_index = transition.state_index;

        let ballot = &mut self.ballots[state_index];
        ballot.nonce = command.nonce;
        ballot.votes[transition.vote_option_index] = command.new_vote_weight;
        let ballot_hash = ballot.hash()?;

        let state_leaf = &mut self.state_leaves[state_index];
        state_leaf.pub_key = command.new_pub_key;
        state_leaf.voice_credit_balance = transition.new_balance;
        let leaf_hash = state_leaf.hash();

        self.state_tree.update(state_index, leaf_hash)?;
        self.ballot_tree.update(state_index, ballot_hash)?;

        Ok(Outcome::Applied)
    }

    fn decrypt_message(&self, index: usize) -> Option<SignedCommand> {
        let enc_pub_key = self.enc_pub_keys.get(index)?;
        let message = self.messages.get(index)?;
        let shared_key =
            Keypair::gen_ecdh_shared_key(&self.coordinator_keypair.priv_key, enc_pub_key).ok()?;
        message.decrypt(&shared_key).ok()
    }

    fn check_command(&self, signed: &SignedCommand) -> Result<Transition, RejectReason> {
        let command = &signed.command;

        let state_index = usize::try_from(command.state_index)
            .ok()
            .filter(|i| *i >= 1 && *i < self.ballots.len())
            .ok_or(RejectReason::InvalidStateIndex(command.state_index))?;

        if command.poll_id != self.poll_id as u64 {
            return Err(RejectReason::PollMismatch(command.poll_id));
        }

        let state_leaf = &self.state_leaves[state_index];
        let ballot = &self.ballots[state_index];

        // Signed by the key registered now, not the one being requested
        if !signed.verify(&state_leaf.pub_key) {
            return Err(RejectReason::InvalidSignature);
        }

        let expected = ballot.nonce.wrapping_add(1);
        if command.nonce != expected || expected == 0 {
            return Err(RejectReason::InvalidNonce {
                expected,
                found: command.nonce,
            });
        }

        let vote_option_index = usize::try_from(command.vote_option_index)
            .ok()
            .filter(|i| *i < self.max_values.max_vote_options)
            .ok_or(RejectReason::InvalidVoteOption(command.vote_option_index))?;

        // u64 squares fit in u128, and so does the balance plus the refund
        let prev_weight = ballot.votes[vote_option_index] as u128;
        let new_weight = command.new_vote_weight as u128;
        let credits = state_leaf.voice_credit_balance as u128 + prev_weight * prev_weight;
        let cost = new_weight * new_weight;
        if cost > credits {
            return Err(RejectReason::InsufficientVoiceCredits);
        }
        let new_balance =
            u64::try_from(credits - cost).map_err(|_| RejectReason::InsufficientVoiceCredits)?;

        Ok(Transition {
            state_index,
            vote_option_index,
            new_balance,
        })
    }
}
