use crate::*;
use std::env::var;
use std::str::FromStr;

/// Depth of the registry's state tree
pub const STATE_TREE_DEPTH: u8 = 10;

/// Depth of the subtrees of the state accumulator queue
pub const STATE_TREE_SUBDEPTH: u8 = 2;

/// Upper bounds a poll is configured with
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxValues {
    pub max_users: usize,
    pub max_vote_options: usize,
}

impl Default for MaxValues {
    fn default() -> Self {
        MaxValues {
            max_users: 25,
            max_vote_options: 25,
        }
    }
}

/// Depths of the trees a poll builds
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeDepths {
    /// Ballots are tallied in batches of `5^int_state_tree_depth`
    pub int_state_tree_depth: u8,
    pub message_tree_depth: u8,
    pub message_tree_sub_depth: u8,
    pub vote_option_tree_depth: u8,
}

impl Default for TreeDepths {
    fn default() -> Self {
        TreeDepths {
            int_state_tree_depth: 2,
            message_tree_depth: 3,
            message_tree_sub_depth: 2,
            vote_option_tree_depth: 4,
        }
    }
}

/// Deployment parameters for a registry and its polls
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub state_tree_depth: u8,
    pub max_values: MaxValues,
    pub tree_depths: TreeDepths,
    pub message_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            state_tree_depth: STATE_TREE_DEPTH,
            max_values: MaxValues::default(),
            tree_depths: TreeDepths::default(),
            message_batch_size: 25,
        }
    }
}

impl Config {
    /// Read the configuration from the environment, falling back to the defaults
    pub fn from_env() -> Result<Self, Error> {
        let default = Config::default();

        Ok(Config {
            state_tree_depth: env_or("MACI_STATE_TREE_DEPTH", default.state_tree_depth)?,
            max_values: MaxValues {
                max_users: env_or("MACI_MAX_USERS", default.max_values.max_users)?,
                max_vote_options: env_or(
                    "MACI_MAX_VOTE_OPTIONS",
                    default.max_values.max_vote_options,
                )?,
            },
            tree_depths: default.tree_depths,
            message_batch_size: env_or("MACI_MESSAGE_BATCH_SIZE", default.message_batch_size)?,
        })
    }

    /// Parse a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match var(name) {
        Ok(val) => val
            .parse()
            .map_err(|_| Error::Config(format!("{} is not valid: {}", name, val))),
        Err(_e) => Ok(default),
    }
}
