//! Packing of small values into a single circuit public input.
//!
//! Every field takes `PACKED_FIELD_BITS` bits, the first field in the lowest bits.

use crate::*;
use num_bigint::BigUint;

pub const PACKED_FIELD_BITS: usize = 50;

fn pack_fields(fields: &[(&'static str, u64)]) -> Result<BigUint, Error> {
    let mut packed = BigUint::from(0u64);
    for (i, (field, value)) in fields.iter().enumerate() {
        if *value >> PACKED_FIELD_BITS != 0 {
            return Err(Error::PackedValueOutOfRange {
                field: *field,
                value: *value,
                bits: PACKED_FIELD_BITS,
            });
        }
        packed |= BigUint::from(*value) << (i * PACKED_FIELD_BITS);
    }
    Ok(packed)
}

fn unpack_fields<const N: usize>(packed: &BigUint) -> Result<[u64; N], Error> {
    if packed.bits() > (N * PACKED_FIELD_BITS) as u64 {
        return Err(Error::PackedValueTooWide(packed.bits()));
    }

    let mask = (BigUint::from(1u64) << PACKED_FIELD_BITS) - 1u64;
    let mut fields = [0u64; N];
    for (i, field) in fields.iter_mut().enumerate() {
        let value = (packed >> (i * PACKED_FIELD_BITS)) & &mask;
        *field = value.to_u64_digits().first().copied().unwrap_or(0);
    }
    Ok(fields)
}

/// Public values of a message processing batch
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMessageSmallVals {
    pub max_vote_options: u64,
    pub num_users: u64,
    pub batch_start_index: u64,
    pub batch_end_index: u64,
}

impl ProcessMessageSmallVals {
    pub fn pack(&self) -> Result<BigUint, Error> {
        pack_fields(&[
            ("max_vote_options", self.max_vote_options),
            ("num_users", self.num_users),
            ("batch_start_index", self.batch_start_index),
            ("batch_end_index", self.batch_end_index),
        ])
    }

    pub fn unpack(packed: &BigUint) -> Result<Self, Error> {
        let [max_vote_options, num_users, batch_start_index, batch_end_index] =
            unpack_fields::<4>(packed)?;
        Ok(ProcessMessageSmallVals {
            max_vote_options,
            num_users,
            batch_start_index,
            batch_end_index,
        })
    }
}

/// Public values of a tally batch
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyVotesSmallVals {
    pub batch_start_index: u64,
    pub batch_size: u64,
    pub num_sign_ups: u64,
}

impl TallyVotesSmallVals {
    pub fn pack(&self) -> Result<BigUint, Error> {
        pack_fields(&[
            ("batch_start_index", self.batch_start_index),
            ("batch_size", self.batch_size),
            ("num_sign_ups", self.num_sign_ups),
        ])
    }

    pub fn unpack(packed: &BigUint) -> Result<Self, Error> {
        let [batch_start_index, batch_size, num_sign_ups] = unpack_fields::<3>(packed)?;
        Ok(TallyVotesSmallVals {
            batch_start_index,
            batch_size,
            num_sign_ups,
        })
    }
}
