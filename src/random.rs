// Prize Competition Program - Randomness
use solana_program::{
    account_info::AccountInfo,
    hash::{hash, hashv},
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
    sysvar,
};

use crate::error::CompetitionError;

/// A source of uniformly distributed 64-bit values
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform value in `[0, bound)`, rejection sampled so every value is
    /// equally likely. Returns 0 when `bound` is 0.
    fn uniform_below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        let limit = u64::MAX - (u64::MAX % bound);
        loop {
            let value = self.next_u64();
            if value < limit {
                return value % bound;
            }
        }
    }
}

/// sha256 counter-mode stream expanded from a 32-byte seed
pub struct HashChainRng {
    seed: [u8; 32],
    counter: u64,
    block: [u8; 32],
    offset: usize,
}

impl HashChainRng {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            counter: 0,
            block: [0u8; 32],
            offset: 32,
        }
    }

    fn refill(&mut self) {
        self.block = hashv(&[&self.seed, &self.counter.to_le_bytes()]).to_bytes();
        self.counter = self.counter.wrapping_add(1);
        self.offset = 0;
    }
}

impl RandomSource for HashChainRng {
    fn next_u64(&mut self) -> u64 {
        if self.offset + 8 > self.block.len() {
            self.refill();
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.block[self.offset..self.offset + 8]);
        self.offset += 8;
        u64::from_le_bytes(bytes)
    }
}

/// Commitment stored at competition creation for the draw secret
pub fn commitment(secret: &[u8; 32]) -> [u8; 32] {
    hash(secret).to_bytes()
}

pub fn verify_reveal(commitment: &[u8; 32], secret: &[u8; 32]) -> Result<(), CompetitionError> {
    if hash(secret).to_bytes() != *commitment {
        return Err(CompetitionError::InvalidDrawSecret);
    }
    Ok(())
}

/// Most recent hash from the SlotHashes sysvar, read without deserializing
/// the whole sysvar. `None` when the sysvar has no entries yet.
pub fn latest_slot_hash(slot_hashes_info: &AccountInfo) -> Result<Option<[u8; 32]>, ProgramError> {
    if *slot_hashes_info.key != sysvar::slot_hashes::id() {
        msg!("Expected the SlotHashes sysvar");
        return Err(ProgramError::InvalidArgument);
    }
    let data = slot_hashes_info.try_borrow_data()?;
    if data.len() < 8 {
        return Ok(None);
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&data[0..8]);
    if u64::from_le_bytes(len_bytes) == 0 || data.len() < 48 {
        return Ok(None);
    }
    let mut latest = [0u8; 32];
    latest.copy_from_slice(&data[16..48]);
    Ok(Some(latest))
}

/// Seed for instant prize assignment
pub fn assignment_seed(
    entropy: &[u8; 32],
    competition: &Pubkey,
    slot: u64,
    slot_hash: Option<[u8; 32]>,
) -> [u8; 32] {
    hashv(&[
        b"instant-prizes",
        entropy,
        competition.as_ref(),
        &slot.to_le_bytes(),
        &slot_hash.unwrap_or_default(),
    ])
    .to_bytes()
}

/// Seed for the grand prize draw, bound to the revealed secret and the pool size
pub fn draw_seed(
    secret: &[u8; 32],
    competition: &Pubkey,
    live_tickets: u32,
    slot_hash: Option<[u8; 32]>,
) -> [u8; 32] {
    hashv(&[
        b"draw",
        secret,
        competition.as_ref(),
        &live_tickets.to_le_bytes(),
        &slot_hash.unwrap_or_default(),
    ])
    .to_bytes()
}

/// Replays a fixed list of values, for deterministic tests
#[cfg(test)]
pub struct SequenceSource {
    values: Vec<u64>,
    next: usize,
}

#[cfg(test)]
impl SequenceSource {
    pub fn new(values: Vec<u64>) -> Self {
        Self { values, next: 0 }
    }
}

#[cfg(test)]
impl RandomSource for SequenceSource {
    fn next_u64(&mut self) -> u64 {
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}
