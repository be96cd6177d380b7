#[macro_use]
extern crate serde;

mod acc_queue;
mod ballot;
mod command;
mod config;
mod ecdh;
mod error;
mod hash;
mod keys;
mod merkle;
mod pack;
mod poll;
mod registry;
mod serde_hex;
mod state_leaf;
mod tally;

pub use acc_queue::*;
pub use ballot::*;
pub use command::*;
pub use config::*;
pub use ecdh::*;
pub use error::*;
pub use hash::*;
pub use keys::*;
pub use merkle::*;
pub use pack::*;
pub use poll::*;
pub use registry::*;
pub use serde_hex::*;
pub use state_leaf::*;
pub use tally::*;

#[cfg(test)]
mod tests;
