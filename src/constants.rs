// Prize Competition Program - Constants

/// PDA seed for the global config account
pub const CONFIG_SEED: &[u8] = b"config";
/// PDA seed for the lamport vault that collects ticket payments and pays cash prizes
pub const VAULT_SEED: &[u8] = b"vault";
/// PDA seed prefix for competitions, followed by the competition index (le bytes)
pub const COMPETITION_SEED: &[u8] = b"competition";
/// PDA seed prefix for per-user balances
pub const BALANCE_SEED: &[u8] = b"balance";
/// PDA seed prefix for Ryder Cash transactions, followed by user and index
pub const RYDER_CASH_SEED: &[u8] = b"ryder_cash";
/// PDA seed prefix for the draw record of a competition
pub const DRAW_SEED: &[u8] = b"draw";
/// PDA seed prefix for a user's participation marker in a competition
pub const PARTICIPANT_SEED: &[u8] = b"participant";

/// Maximum number of instant prize definitions per competition
pub const MAX_INSTANT_PRIZES: usize = 16;

/// Tickets per page when listing instant win tickets
pub const INSTANT_WIN_PAGE_SIZE: usize = 20;

/// Basis points denominator used for progress figures (10000 = 100%)
pub const BASIS_POINTS: u64 = 10_000;
