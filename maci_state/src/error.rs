use crate::*;

use thiserror::Error;

/// Error types
///
/// These signal misuse of the state machine by the calling code. They are never
/// produced by the contents of a message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("maci: state tree is full, capacity is {0} leaves")]
    CapacityExceeded(usize),

    #[error("maci: merkle tree of depth {0} is full")]
    TreeFull(u8),

    #[error("maci: leaf index {0} is out of range")]
    LeafIndexOutOfRange(usize),

    #[error("maci: accumulator queue sub roots have already been merged")]
    AccQueueMerged,

    #[error("maci: cannot merge accumulator queue to depth {0}")]
    InvalidMergeDepth(u8),

    #[error("maci: poll {0} not found")]
    PollNotFound(PollId),

    #[error("maci: invalid poll configuration: {0}")]
    InvalidPollConfig(&'static str),

    #[error("maci: cannot publish a message after message processing has started")]
    ProcessingStarted,

    #[error("maci: all messages must be processed before tallying")]
    UnprocessedMessages,

    #[error("maci: all ballots have already been tallied")]
    TallyComplete,

    #[error("maci: {field} = {value} does not fit in {bits} bits")]
    PackedValueOutOfRange {
        field: &'static str,
        value: u64,
        bits: usize,
    },

    #[error("maci: packed value is {0} bits wide")]
    PackedValueTooWide(u64),

    #[error("maci: invalid public key")]
    InvalidPublicKey,

    #[error("maci: invalid hexidecimal: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("maci: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("maci: shared key derivation failed")]
    KeyDerivation,

    #[error("maci: encryption failure")]
    Encryption,

    #[error("maci: decryption failure")]
    Decryption,

    #[error("maci: CBOR error: {0}")]
    CBOR(#[from] serde_cbor::Error),

    #[error("maci: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("maci: configuration error: {0}")]
    Config(String),
}

/// Reasons a command is rejected during message processing
///
/// A rejected command consumes its message slot but leaves every state leaf
/// and ballot untouched.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("maci validation: message could not be decrypted")]
    Undecryptable,

    #[error("maci validation: state index {0} is out of range")]
    InvalidStateIndex(u64),

    #[error("maci validation: command is for poll {0}")]
    PollMismatch(u64),

    #[error("maci validation: signature does not match the registered public key")]
    InvalidSignature,

    #[error("maci validation: expected nonce {expected}, found {found}")]
    InvalidNonce { expected: u64, found: u64 },

    #[error("maci validation: vote option {0} is out of range")]
    InvalidVoteOption(u64),

    #[error("maci validation: insufficient voice credits")]
    InsufficientVoiceCredits,
}

/// The result of applying a single message
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Rejected(RejectReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        *self == Outcome::Applied
    }
}
