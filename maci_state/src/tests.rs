use super::*;
use rand_core::SeedableRng;

const VOICE_CREDIT_BALANCE: u64 = 100;
const MESSAGE_BATCH_SIZE: usize = 25;

struct Voting {
    registry: Registry,
    coordinator: Keypair,
}

impl Voting {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Voting {
            registry: Registry::new(STATE_TREE_DEPTH).unwrap(),
            coordinator: Keypair::new(),
        }
    }

    fn sign_up(&mut self, user: &Keypair) -> StateIndex {
        self.registry
            .sign_up(user.pub_key, VOICE_CREDIT_BALANCE, 1_600_000_000)
            .unwrap()
    }

    fn deploy(&mut self) -> PollId {
        self.registry
            .deploy_poll(
                1_600_000_300,
                MaxValues::default(),
                TreeDepths::default(),
                MESSAGE_BATCH_SIZE,
                self.coordinator.clone(),
            )
            .unwrap()
    }

    fn poll(&mut self, poll_id: PollId) -> &mut Poll {
        self.registry.poll_mut(poll_id).unwrap()
    }

    /// Sign a command, encrypt it under a fresh ephemeral key and publish it
    fn publish(&mut self, poll_id: PollId, command: Command, signer: &PrivKey) {
        let signature = command.sign(signer).unwrap();
        let ephemeral = Keypair::new();
        let shared_key =
            Keypair::gen_ecdh_shared_key(&ephemeral.priv_key, &self.coordinator.pub_key).unwrap();
        let message = command.encrypt(&signature, &shared_key).unwrap();

        self.poll(poll_id)
            .publish_message(message, ephemeral.pub_key)
            .unwrap();
    }
}

#[test]
fn key_change_by_one_user() {
    let mut voting = Voting::new();
    let user1 = Keypair::new();
    let user2 = Keypair::new();
    let user1_new = Keypair::new();

    let index1 = voting.sign_up(&user1);
    let index2 = voting.sign_up(&user2);
    let poll_id = voting.deploy();
    let p = poll_id as u64;

    voting.publish(poll_id, Command::new(index1 as u64, user1.pub_key, 0, 9, 1, p), &user1.priv_key);
    voting.publish(poll_id, Command::new(index2 as u64, user2.pub_key, 1, 3, 1, p), &user2.priv_key);

    // Same nonce, new key, signed with the old key
    voting.publish(
        poll_id,
        Command::new(index1 as u64, user1_new.pub_key, 0, 5, 1, p),
        &user1.priv_key,
    );

    let report = voting.registry.process_messages(poll_id).unwrap().unwrap();
    assert_eq!(
        report.outcomes,
        vec![
            (2, Outcome::Applied),
            (1, Outcome::Applied),
            (0, Outcome::Rejected(RejectReason::InvalidSignature)),
        ]
    );
    voting.registry.tally_votes(poll_id).unwrap();

    let poll = voting.poll(poll_id);
    assert_eq!(poll.per_vo_spent_voice_credits()[0], 25);
    assert_eq!(poll.per_vo_spent_voice_credits()[1], 9);
    assert_eq!(poll.state_leaves()[index1].pub_key, user1_new.pub_key);
    assert_eq!(poll.state_leaves()[index2].pub_key, user2.pub_key);

    // The registry's own leaves are untouched
    assert_eq!(voting.registry.state_leaves()[index1].pub_key, user1.pub_key);
}

#[test]
fn key_change_by_both_users() {
    let mut voting = Voting::new();
    let user1 = Keypair::new();
    let user2 = Keypair::new();
    let user1_new = Keypair::new();
    let user2_new = Keypair::new();

    let index1 = voting.sign_up(&user1) as u64;
    let index2 = voting.sign_up(&user2) as u64;
    let poll_id = voting.deploy();
    let p = poll_id as u64;

    voting.publish(poll_id, Command::new(index1, user1.pub_key, 0, 9, 1, p), &user1.priv_key);
    voting.publish(poll_id, Command::new(index2, user2.pub_key, 1, 3, 1, p), &user2.priv_key);
    voting.publish(poll_id, Command::new(index1, user1_new.pub_key, 0, 5, 1, p), &user1.priv_key);
    voting.publish(poll_id, Command::new(index2, user2_new.pub_key, 1, 7, 1, p), &user2.priv_key);

    voting.poll(poll_id).process_all_messages().unwrap();
    voting.poll(poll_id).tally_votes().unwrap();

    let poll = voting.poll(poll_id);
    assert_eq!(poll.per_vo_spent_voice_credits()[0], 25);
    assert_eq!(poll.per_vo_spent_voice_credits()[1], 49);
    assert_eq!(poll.tally_result()[0], 5);
    assert_eq!(poll.tally_result()[1], 7);
    assert_eq!(poll.state_leaves()[1].pub_key, user1_new.pub_key);
    assert_eq!(poll.state_leaves()[2].pub_key, user2_new.pub_key);
}

#[test]
fn key_change_in_later_batch() {
    let mut voting = Voting::new();
    let user1 = Keypair::new();
    let user1_new = Keypair::new();

    let index1 = voting.sign_up(&user1) as u64;
    let poll_id = voting.deploy();
    let p = poll_id as u64;

    voting.publish(poll_id, Command::new(index1, user1.pub_key, 0, 9, 1, p), &user1.priv_key);
    for _ in 0..MESSAGE_BATCH_SIZE - 1 {
        voting.publish(poll_id, Command::new(1, user1.pub_key, 0, 9, 2, p), &user1.priv_key);
    }
    voting.publish(poll_id, Command::new(index1, user1_new.pub_key, 0, 5, 1, p), &user1.priv_key);

    let state = voting.poll(poll_id).process_all_messages().unwrap();
    assert_eq!(voting.poll(poll_id).num_batches_processed(), 2);
    voting.poll(poll_id).tally_votes().unwrap();

    let poll = voting.poll(poll_id);
    assert_eq!(poll.per_vo_spent_voice_credits()[0], 25);
    assert_eq!(state.state_leaves[1].pub_key, user1_new.pub_key);
    assert_eq!(state.state_leaves[1].voice_credit_balance, VOICE_CREDIT_BALANCE - 25);
    assert_eq!(state.ballots[1].nonce, 1);
}

#[test]
fn process_and_tally_one_message() {
    let mut voting = Voting::new();
    let user = Keypair::new();

    let index = voting.sign_up(&user);
    assert_eq!(index, 1);

    // Registry root against an accumulator queue fed with the same leaves
    let mut queue = AccQueue::new(STATE_TREE_SUBDEPTH, blank_state_leaf_hash());
    for leaf in voting.registry.state_leaves() {
        queue.enqueue(leaf.hash()).unwrap();
    }
    queue.merge_sub_roots(0).unwrap();
    queue.merge(STATE_TREE_DEPTH).unwrap();
    assert_eq!(queue.get_root(STATE_TREE_DEPTH), Some(voting.registry.state_root()));

    let poll_id = voting.deploy();
    let command = Command::new(index as u64, user.pub_key, 0, 9, 1, poll_id as u64);
    voting.publish(poll_id, command, &user.priv_key);

    // Message root against an accumulator queue
    let message_root = {
        let poll = voting.poll(poll_id);
        let mut queue = AccQueue::new(2, nothing_up_my_sleeve());
        queue
            .enqueue(poll.messages()[0].hash(&poll.enc_pub_keys()[0]))
            .unwrap();
        queue.merge_sub_roots(0).unwrap();
        queue.merge(3).unwrap();
        assert_eq!(queue.get_root(3), Some(poll.message_root()));
        poll.merge_message_aq().unwrap()
    };
    assert_eq!(message_root, voting.poll(poll_id).message_root());

    let report = voting.poll(poll_id).process_messages().unwrap().unwrap();
    let vals = ProcessMessageSmallVals::unpack(&report.packed_vals).unwrap();
    assert_eq!(vals.max_vote_options, 25);
    assert_eq!(vals.num_users, 1);
    assert_eq!((vals.batch_start_index, vals.batch_end_index), (0, 1));

    let poll = voting.poll(poll_id);
    assert_eq!(poll.ballots()[1].votes[0], 9);
    assert_eq!(poll.state_leaves()[1].voice_credit_balance, VOICE_CREDIT_BALANCE - 81);

    assert_eq!(poll.tally_result().iter().sum::<u128>(), 0);
    assert!(poll.has_untallied_ballots());
    poll.tally_votes().unwrap();

    assert_eq!(poll.tally_result().iter().sum::<u128>(), 9);
    assert_eq!(poll.tally_result()[0], 9);
    assert_eq!(poll.total_spent_voice_credits(), 81);
    assert!(!poll.has_untallied_ballots());
}

#[test]
fn process_and_tally_half_valid_messages() {
    let mut voting = Voting::new();
    let users: Vec<Keypair> = (0..MESSAGE_BATCH_SIZE - 1).map(|_| Keypair::new()).collect();
    for user in &users {
        voting.sign_up(user);
    }
    let poll_id = voting.deploy();
    let p = poll_id as u64;

    for (i, user) in users.iter().enumerate() {
        let command = Command::new(i as u64 + 1, user.pub_key, i as u64, 9, 1, p);
        voting.publish(poll_id, command, &user.priv_key);
    }
    assert_eq!(voting.poll(poll_id).messages().len(), MESSAGE_BATCH_SIZE - 1);

    // Over budget
    for (i, user) in users.iter().enumerate() {
        let weight = VOICE_CREDIT_BALANCE * 2;
        let command = Command::new(i as u64 + 1, user.pub_key, i as u64, weight, 1, p);
        voting.publish(poll_id, command, &user.priv_key);
    }
    assert_eq!(voting.poll(poll_id).messages().len(), 2 * (MESSAGE_BATCH_SIZE - 1));

    let poll = voting.poll(poll_id);
    assert_eq!(poll.current_message_batch_index(), None);
    assert_eq!(poll.num_batches_processed(), 0);

    let report = poll.process_messages().unwrap().unwrap();
    assert_eq!(poll.current_message_batch_index(), Some(0));
    assert_eq!(poll.num_batches_processed(), 1);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, o)| *o == Outcome::Rejected(RejectReason::InsufficientVoiceCredits)));

    poll.process_messages().unwrap();
    assert_eq!(poll.current_message_batch_index(), Some(0));
    assert_eq!(poll.num_batches_processed(), 2);

    for i in 1..MESSAGE_BATCH_SIZE {
        assert_eq!(poll.ballots()[i].votes[i - 1], 9);
        assert_eq!(poll.state_leaves()[i].voice_credit_balance, VOICE_CREDIT_BALANCE - 81);
    }

    // Nothing left, nothing changes
    let state = poll.process_all_messages().unwrap();
    assert_eq!(poll.num_batches_processed(), 2);
    assert_eq!(state.state_leaves.len(), poll.state_leaves().len());
    assert_eq!(state.ballots.len(), state.state_leaves.len());
    assert_eq!(state, poll.processed_state());

    assert_eq!(poll.total_spent_voice_credits(), 0);
    assert!(poll.has_untallied_ballots());
    poll.tally_votes().unwrap();

    let result = poll.tally_result();
    for weight in &result[..result.len() - 1] {
        assert_eq!(*weight, 9);
    }
    assert!(!poll.has_untallied_ballots());
    assert!(matches!(poll.tally_votes(), Err(Error::TallyComplete)));
}

#[test]
fn independent_polls() {
    let mut voting = Voting::new();
    let user = Keypair::new();
    let index = voting.sign_up(&user) as u64;

    let first = voting.deploy();
    let second = voting.deploy();

    voting.publish(first, Command::new(index, user.pub_key, 0, 4, 1, first as u64), &user.priv_key);
    voting.publish(second, Command::new(index, user.pub_key, 1, 6, 1, second as u64), &user.priv_key);

    // A command for the first poll sent to the second
    voting.publish(second, Command::new(index, user.pub_key, 2, 1, 1, first as u64), &user.priv_key);

    voting.poll(first).process_all_messages().unwrap();
    let report = voting.registry.process_messages(second).unwrap().unwrap();
    assert_eq!(
        report.outcomes[0],
        (1, Outcome::Rejected(RejectReason::PollMismatch(first as u64)))
    );

    let first_poll = voting.registry.poll(first).unwrap();
    let second_poll = voting.registry.poll(second).unwrap();
    assert_eq!(first_poll.state_leaves()[1].voice_credit_balance, VOICE_CREDIT_BALANCE - 16);
    assert_eq!(second_poll.state_leaves()[1].voice_credit_balance, VOICE_CREDIT_BALANCE - 36);
    assert_eq!(second_poll.ballots()[1].votes[2], 0);
}

struct Replay {
    message_root: HashBytes,
    reports: Vec<BatchReport>,
    tally: Vec<u128>,
    results_root: HashBytes,
    total_spent: u128,
}

/// Run a whole poll with every key, salt and IV drawn from one seed
fn seeded_replay(seed: [u8; 32]) -> Replay {
    let mut rng = rand_chacha::ChaCha20Rng::from_seed(seed);

    let coordinator = Keypair::generate(&mut rng);
    let users: Vec<Keypair> = (0..5).map(|_| Keypair::generate(&mut rng)).collect();

    let mut registry = Registry::new(STATE_TREE_DEPTH).unwrap();
    for user in &users {
        registry.sign_up(user.pub_key, VOICE_CREDIT_BALANCE, 0).unwrap();
    }
    let poll_id = registry
        .deploy_poll(0, MaxValues::default(), TreeDepths::default(), 3, coordinator.clone())
        .unwrap();

    for (i, user) in users.iter().enumerate() {
        for nonce in 1..=2 {
            let command = Command::generate(
                i as u64 + 1,
                user.pub_key,
                nonce,
                i as u64 + nonce,
                nonce,
                poll_id as u64,
                &mut rng,
            );
            let signature = command.sign(&user.priv_key).unwrap();
            let ephemeral = Keypair::generate(&mut rng);
            let shared_key =
                Keypair::gen_ecdh_shared_key(&ephemeral.priv_key, &coordinator.pub_key).unwrap();
            let message = command
                .encrypt_with_rng(&signature, &shared_key, &mut rng)
                .unwrap();
            registry
                .poll_mut(poll_id)
                .unwrap()
                .publish_message(message, ephemeral.pub_key)
                .unwrap();
        }
    }

    let poll = registry.poll_mut(poll_id).unwrap();
    let message_root = poll.message_root();

    let mut reports = vec![];
    while let Some(report) = poll.process_messages().unwrap() {
        reports.push(report);
    }
    let tally = poll.tally_all_votes().unwrap().to_vec();

    Replay {
        message_root,
        reports,
        tally,
        results_root: poll.results_root().unwrap(),
        total_spent: poll.total_spent_voice_credits(),
    }
}

#[test]
fn replays_are_deterministic() {
    let _ = env_logger::builder().is_test(true).try_init();

    let first = seeded_replay([42; 32]);
    let second = seeded_replay([42; 32]);

    // Same ciphertexts, same batches, same results
    assert_eq!(first.message_root, second.message_root);
    assert_eq!(first.reports, second.reports);
    assert_eq!(first.tally, second.tally);
    assert_eq!(first.results_root, second.results_root);
    assert_eq!(first.total_spent, second.total_spent);

    assert_eq!(first.reports.len(), 4);
    let applied = first
        .reports
        .iter()
        .flat_map(|r| r.outcomes.iter())
        .filter(|(_, o)| o.is_applied())
        .count();
    // Every second-nonce command is seen before its first-nonce command
    assert_eq!(applied, 5);
    assert_eq!(first.total_spent, 1 + 4 + 9 + 16 + 25);

    // Another seed gives other ciphertexts but the same tally
    let other = seeded_replay([7; 32]);
    assert_ne!(other.message_root, first.message_root);
    assert_eq!(other.tally, first.tally);
}
