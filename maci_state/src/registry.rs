use crate::*;
use std::cmp::min;

/// The set of signed-up participants and the polls deployed over them
///
/// Leaves are only ever appended. Index 0 holds the blank state leaf so the first
/// participant gets index 1.
#[derive(Clone, Debug)]
pub struct Registry {
    state_tree_depth: u8,
    state_leaves: Vec<StateLeaf>,
    state_tree: IncrementalQuinTree,
    state_aq: AccQueue,
    polls: Vec<Poll>,
}

impl Registry {
    pub fn new(state_tree_depth: u8) -> Result<Self, Error> {
        let blank = StateLeaf::blank();
        let zero = blank_state_leaf_hash();

        let mut state_tree = IncrementalQuinTree::new(state_tree_depth, zero);
        let mut state_aq = AccQueue::new(min(STATE_TREE_SUBDEPTH, state_tree_depth), zero);
        state_tree.insert(blank.hash())?;
        state_aq.enqueue(blank.hash())?;

        Ok(Registry {
            state_tree_depth,
            state_leaves: vec![blank],
            state_tree,
            state_aq,
            polls: vec![],
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Registry::new(config.state_tree_depth)
    }

    pub fn state_tree_depth(&self) -> u8 {
        self.state_tree_depth
    }

    /// Register a participant, returning their state index
    pub fn sign_up(
        &mut self,
        pub_key: PubKey,
        initial_voice_credit_balance: u64,
        timestamp: u64,
    ) -> Result<StateIndex, Error> {
        let capacity = self.state_tree.capacity();
        if self.state_leaves.len() >= capacity {
            return Err(Error::CapacityExceeded(capacity));
        }
        if self.state_aq.is_merged() {
            return Err(Error::AccQueueMerged);
        }

        let leaf = StateLeaf::new(pub_key, initial_voice_credit_balance, timestamp);
        let hash = leaf.hash();
        let state_index = self.state_tree.insert(hash)?;
        self.state_aq.enqueue(hash)?;
        self.state_leaves.push(leaf);

        log::info!("signed up {} at state index {}", pub_key, state_index);

        Ok(state_index)
    }

    pub fn state_leaves(&self) -> &[StateLeaf] {
        &self.state_leaves
    }

    /// Number of participants, not counting the blank leaf
    pub fn num_sign_ups(&self) -> usize {
        self.state_leaves.len() - 1
    }

    pub fn state_root(&self) -> HashBytes {
        self.state_tree.root()
    }

    /// Merge the state accumulator queue to the full state tree depth
    ///
    /// No participant can sign up afterwards.
    pub fn merge_state_aq(&mut self) -> Result<HashBytes, Error> {
        self.state_aq.merge_sub_roots(0)?;
        self.state_aq.merge(self.state_tree_depth)
    }

    /// Deploy a poll over a copy of the current state leaves
    pub fn deploy_poll(
        &mut self,
        end_time: u64,
        max_values: MaxValues,
        tree_depths: TreeDepths,
        message_batch_size: usize,
        coordinator_keypair: Keypair,
    ) -> Result<PollId, Error> {
        let poll_id = self.polls.len();
        let poll = Poll::new(
            poll_id,
            end_time,
            max_values,
            tree_depths,
            message_batch_size,
            coordinator_keypair,
            self.state_leaves.clone(),
            self.state_tree_depth,
        )?;

        log::info!(
            "deployed poll {} over {} sign ups, coordinator {}",
            poll_id,
            poll.num_sign_ups(),
            poll.coordinator_pub_key()
        );

        self.polls.push(poll);
        Ok(poll_id)
    }

    /// Deploy a poll with the limits and depths of a `Config`
    pub fn deploy_poll_with_config(
        &mut self,
        end_time: u64,
        config: &Config,
        coordinator_keypair: Keypair,
    ) -> Result<PollId, Error> {
        self.deploy_poll(
            end_time,
            config.max_values,
            config.tree_depths,
            config.message_batch_size,
            coordinator_keypair,
        )
    }

    pub fn poll(&self, poll_id: PollId) -> Result<&Poll, Error> {
        self.polls.get(poll_id).ok_or(Error::PollNotFound(poll_id))
    }

    pub fn poll_mut(&mut self, poll_id: PollId) -> Result<&mut Poll, Error> {
        self.polls.get_mut(poll_id).ok_or(Error::PollNotFound(poll_id))
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    /// Process the next batch of messages of a poll
    pub fn process_messages(&mut self, poll_id: PollId) -> Result<Option<BatchReport>, Error> {
        self.poll_mut(poll_id)?.process_messages()
    }

    /// Tally the next batch of ballots of a poll
    pub fn tally_votes(&mut self, poll_id: PollId) -> Result<TallyReport, Error> {
        self.poll_mut(poll_id)?.tally_votes()
    }
}
