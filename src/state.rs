// Prize Competition Program - State
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::Pubkey,
};
use std::convert::TryFrom;

use crate::error::CompetitionError;

/// Lifecycle of a competition as seen by the draw engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompetitionPhase {
    /// Active but before its start time
    Upcoming,
    /// Accepting purchases
    Open,
    /// Sales over (inactive or past end time), eligible for the draw
    Closed,
    /// Winner recorded, terminal
    Drawn,
}

/// Instant prize type, each with its own crediting strategy
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrizeKind {
    /// Credited to the withdrawable cash balance
    Cash,
    /// Credited to the Ryder Cash (site credit) ledger
    SiteCredit,
}

impl TryFrom<u8> for PrizeKind {
    type Error = CompetitionError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(PrizeKind::Cash),
            1 => Ok(PrizeKind::SiteCredit),
            _ => Err(CompetitionError::InvalidPrizeKind),
        }
    }
}

impl From<PrizeKind> for u8 {
    fn from(kind: PrizeKind) -> Self {
        match kind {
            PrizeKind::Cash => 0,
            PrizeKind::SiteCredit => 1,
        }
    }
}

/// Where a prize credit landed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credited {
    Withdrawable { balance_after: u64 },
    SiteCredit { balance_after: u64 },
}

impl PrizeKind {
    /// Apply a prize of `value` to the winner's balance
    pub fn credit(self, balance: &mut UserBalance, value: u64) -> Result<Credited, CompetitionError> {
        match self {
            PrizeKind::Cash => {
                balance.withdrawable_cash = balance
                    .withdrawable_cash
                    .checked_add(value)
                    .ok_or(CompetitionError::MathOverflow)?;
                Ok(Credited::Withdrawable {
                    balance_after: balance.withdrawable_cash,
                })
            }
            PrizeKind::SiteCredit => {
                balance.site_credit = balance
                    .site_credit
                    .checked_add(value)
                    .ok_or(CompetitionError::MathOverflow)?;
                Ok(Credited::SiteCredit {
                    balance_after: balance.site_credit,
                })
            }
        }
    }
}

/// Payment status of an entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Refunded,
}

impl TryFrom<u8> for PaymentStatus {
    type Error = ProgramError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(PaymentStatus::Paid),
            1 => Ok(PaymentStatus::Refunded),
            _ => Err(ProgramError::InvalidAccountData),
        }
    }
}

impl From<PaymentStatus> for u8 {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Paid => 0,
            PaymentStatus::Refunded => 1,
        }
    }
}

/// How a purchase is paid for
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Lamports transferred from the buyer to the vault
    Lamports,
    /// Debited from the buyer's Ryder Cash balance
    SiteCredit,
}

impl TryFrom<u8> for PaymentMethod {
    type Error = ProgramError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(PaymentMethod::Lamports),
            1 => Ok(PaymentMethod::SiteCredit),
            _ => Err(ProgramError::InvalidAccountData),
        }
    }
}

impl From<PaymentMethod> for u8 {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Lamports => 0,
            PaymentMethod::SiteCredit => 1,
        }
    }
}

/// Program configuration account
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Admin authority allowed to run competitions and draws
    pub admin: Pubkey,
    /// Bump of the vault PDA
    pub vault_bump: u8,
    /// Counter for sequential competition indexes
    pub next_competition_index: u64,
}

/// A time-boxed paid-entry competition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Competition {
    pub is_initialized: bool,
    /// Sequential index, part of the PDA seeds
    pub index: u64,
    /// Admin that created the competition
    pub authority: Pubkey,
    pub title: [u8; 32],
    /// Price per ticket in lamports
    pub ticket_price: u64,
    /// Hard ceiling of ticket numbers, numbers run 1..=max_tickets
    pub max_tickets: u32,
    /// Highest ticket number granted so far
    pub tickets_sold: u32,
    /// Sold tickets that are still eligible for the draw (refunds excluded)
    pub live_tickets: u32,
    pub start_time: UnixTimestamp,
    pub end_time: UnixTimestamp,
    pub is_active: bool,
    /// Fixed value of the grand prize, if any
    pub prize_value: Option<u64>,
    pub winner: Option<Pubkey>,
    pub draw_timestamp: Option<UnixTimestamp>,
    pub winning_ticket: Option<u32>,
    /// Set once instant prizes have been assigned
    pub has_instant_wins: bool,
    pub entry_count: u32,
    /// Distinct users holding at least one live ticket
    pub participant_count: u32,
    /// Total paid for entries, refunds deducted
    pub revenue: u64,
    /// Ticket ledger account bound to this competition
    pub ledger: Pubkey,
    /// Instant prize table account bound to this competition
    pub prize_table: Pubkey,
    /// sha256 of the draw secret revealed at draw time
    pub draw_commitment: [u8; 32],
    pub bump: u8,
}

impl Competition {
    /// Whether tickets can be bought at `now`
    pub fn is_open(&self, now: UnixTimestamp) -> bool {
        self.is_active && self.winner.is_none() && now >= self.start_time && now < self.end_time
    }

    pub fn phase(&self, now: UnixTimestamp) -> CompetitionPhase {
        if self.winner.is_some() {
            CompetitionPhase::Drawn
        } else if !self.is_active || now >= self.end_time {
            CompetitionPhase::Closed
        } else if now < self.start_time {
            CompetitionPhase::Upcoming
        } else {
            CompetitionPhase::Open
        }
    }

    pub fn remaining_tickets(&self) -> u32 {
        self.max_tickets.saturating_sub(self.tickets_sold)
    }
}

impl Sealed for Config {}
impl Sealed for Competition {}

impl IsInitialized for Config {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl IsInitialized for Competition {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for Config {
    const LEN: usize = 1 + 32 + 1 + 8;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Config::LEN];
        let (is_initialized, admin, vault_bump, next_competition_index) =
            array_refs![src, 1, 32, 1, 8];

        Ok(Config {
            is_initialized: is_initialized[0] != 0,
            admin: Pubkey::new_from_array(*admin),
            vault_bump: vault_bump[0],
            next_competition_index: u64::from_le_bytes(*next_competition_index),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Config::LEN];
        let (is_initialized_dst, admin_dst, vault_bump_dst, next_competition_index_dst) =
            mut_array_refs![dst, 1, 32, 1, 8];

        is_initialized_dst[0] = self.is_initialized as u8;
        admin_dst.copy_from_slice(self.admin.as_ref());
        vault_bump_dst[0] = self.vault_bump;
        *next_competition_index_dst = self.next_competition_index.to_le_bytes();
    }
}

fn unpack_option_u64(src: &[u8; 9]) -> Option<u64> {
    let (flag, value) = array_refs![src, 1, 8];
    (flag[0] != 0).then(|| u64::from_le_bytes(*value))
}

fn pack_option_u64(value: Option<u64>, dst: &mut [u8; 9]) {
    let (flag, value_dst) = mut_array_refs![dst, 1, 8];
    flag[0] = value.is_some() as u8;
    *value_dst = value.unwrap_or_default().to_le_bytes();
}

fn unpack_option_pubkey(src: &[u8; 33]) -> Option<Pubkey> {
    let (flag, key) = array_refs![src, 1, 32];
    (flag[0] != 0).then(|| Pubkey::new_from_array(*key))
}

fn pack_option_pubkey(value: Option<Pubkey>, dst: &mut [u8; 33]) {
    let (flag, key_dst) = mut_array_refs![dst, 1, 32];
    flag[0] = value.is_some() as u8;
    key_dst.copy_from_slice(value.unwrap_or_default().as_ref());
}

fn unpack_option_u32(src: &[u8; 5]) -> Option<u32> {
    let (flag, value) = array_refs![src, 1, 4];
    (flag[0] != 0).then(|| u32::from_le_bytes(*value))
}

fn pack_option_u32(value: Option<u32>, dst: &mut [u8; 5]) {
    let (flag, value_dst) = mut_array_refs![dst, 1, 4];
    flag[0] = value.is_some() as u8;
    *value_dst = value.unwrap_or_default().to_le_bytes();
}

impl Pack for Competition {
    const LEN: usize =
        1 + 8 + 32 + 32 + 8 + 4 + 4 + 4 + 8 + 8 + 1 + 9 + 33 + 9 + 5 + 1 + 4 + 4 + 8 + 32 + 32 + 32 + 1;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, Competition::LEN];
        let (
            is_initialized,
            index,
            authority,
            title,
            ticket_price,
            max_tickets,
            tickets_sold,
            live_tickets,
            start_time,
            end_time,
            is_active,
            prize_value,
            winner,
            draw_timestamp,
            winning_ticket,
            has_instant_wins,
            entry_count,
            participant_count,
            revenue,
            ledger,
            prize_table,
            draw_commitment,
            bump,
        ) = array_refs![
            src, 1, 8, 32, 32, 8, 4, 4, 4, 8, 8, 1, 9, 33, 9, 5, 1, 4, 4, 8, 32, 32, 32, 1
        ];

        Ok(Competition {
            is_initialized: is_initialized[0] != 0,
            index: u64::from_le_bytes(*index),
            authority: Pubkey::new_from_array(*authority),
            title: *title,
            ticket_price: u64::from_le_bytes(*ticket_price),
            max_tickets: u32::from_le_bytes(*max_tickets),
            tickets_sold: u32::from_le_bytes(*tickets_sold),
            live_tickets: u32::from_le_bytes(*live_tickets),
            start_time: UnixTimestamp::from_le_bytes(*start_time),
            end_time: UnixTimestamp::from_le_bytes(*end_time),
            is_active: is_active[0] != 0,
            prize_value: unpack_option_u64(prize_value),
            winner: unpack_option_pubkey(winner),
            draw_timestamp: unpack_option_u64(draw_timestamp).map(|t| t as UnixTimestamp),
            winning_ticket: unpack_option_u32(winning_ticket),
            has_instant_wins: has_instant_wins[0] != 0,
            entry_count: u32::from_le_bytes(*entry_count),
            participant_count: u32::from_le_bytes(*participant_count),
            revenue: u64::from_le_bytes(*revenue),
            ledger: Pubkey::new_from_array(*ledger),
            prize_table: Pubkey::new_from_array(*prize_table),
            draw_commitment: *draw_commitment,
            bump: bump[0],
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, Competition::LEN];
        let (
            is_initialized_dst,
            index_dst,
            authority_dst,
            title_dst,
            ticket_price_dst,
            max_tickets_dst,
            tickets_sold_dst,
            live_tickets_dst,
            start_time_dst,
            end_time_dst,
            is_active_dst,
            prize_value_dst,
            winner_dst,
            draw_timestamp_dst,
            winning_ticket_dst,
            has_instant_wins_dst,
            entry_count_dst,
            participant_count_dst,
            revenue_dst,
            ledger_dst,
            prize_table_dst,
            draw_commitment_dst,
            bump_dst,
        ) = mut_array_refs![
            dst, 1, 8, 32, 32, 8, 4, 4, 4, 8, 8, 1, 9, 33, 9, 5, 1, 4, 4, 8, 32, 32, 32, 1
        ];

        is_initialized_dst[0] = self.is_initialized as u8;
        *index_dst = self.index.to_le_bytes();
        authority_dst.copy_from_slice(self.authority.as_ref());
        title_dst.copy_from_slice(&self.title);
        *ticket_price_dst = self.ticket_price.to_le_bytes();
        *max_tickets_dst = self.max_tickets.to_le_bytes();
        *tickets_sold_dst = self.tickets_sold.to_le_bytes();
        *live_tickets_dst = self.live_tickets.to_le_bytes();
        *start_time_dst = self.start_time.to_le_bytes();
        *end_time_dst = self.end_time.to_le_bytes();
        is_active_dst[0] = self.is_active as u8;
        pack_option_u64(self.prize_value, prize_value_dst);
        pack_option_pubkey(self.winner, winner_dst);
        pack_option_u64(self.draw_timestamp.map(|t| t as u64), draw_timestamp_dst);
        pack_option_u32(self.winning_ticket, winning_ticket_dst);
        has_instant_wins_dst[0] = self.has_instant_wins as u8;
        *entry_count_dst = self.entry_count.to_le_bytes();
        *participant_count_dst = self.participant_count.to_le_bytes();
        *revenue_dst = self.revenue.to_le_bytes();
        ledger_dst.copy_from_slice(self.ledger.as_ref());
        prize_table_dst.copy_from_slice(self.prize_table.as_ref());
        draw_commitment_dst.copy_from_slice(&self.draw_commitment);
        bump_dst[0] = self.bump;
    }
}

/// Per-user balances: withdrawable cash and Ryder Cash site credit
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct UserBalance {
    pub is_initialized: bool,
    pub owner: Pubkey,
    /// Lamports the user may withdraw from the vault
    pub withdrawable_cash: u64,
    /// Ryder Cash, only spendable on entries
    pub site_credit: u64,
    /// Number of Ryder Cash transactions recorded, also the next transaction index
    pub transaction_count: u64,
    pub bump: u8,
}

impl UserBalance {
    pub const LEN: usize = 1 + 32 + 8 + 8 + 8 + 1;

    pub fn new(owner: Pubkey, bump: u8) -> Self {
        Self {
            is_initialized: true,
            owner,
            bump,
            ..Self::default()
        }
    }

    pub fn debit_site_credit(&mut self, amount: u64) -> Result<u64, CompetitionError> {
        self.site_credit = self
            .site_credit
            .checked_sub(amount)
            .ok_or(CompetitionError::InsufficientBalance)?;
        Ok(self.site_credit)
    }

    pub fn debit_cash(&mut self, amount: u64) -> Result<u64, CompetitionError> {
        self.withdrawable_cash = self
            .withdrawable_cash
            .checked_sub(amount)
            .ok_or(CompetitionError::InsufficientBalance)?;
        Ok(self.withdrawable_cash)
    }
}

/// Direction of a Ryder Cash movement
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionDirection {
    Credit,
    Debit,
}

/// Why a Ryder Cash movement happened
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionReason {
    InstantWin,
    TicketPurchase,
    Refund,
}

/// Immutable record of one Ryder Cash movement
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct RyderCashTransaction {
    pub is_initialized: bool,
    pub user: Pubkey,
    pub index: u64,
    pub direction: TransactionDirection,
    pub amount: u64,
    /// Site credit balance right after this movement
    pub balance_after: u64,
    pub reason: TransactionReason,
    pub competition: Pubkey,
    pub created_at: UnixTimestamp,
}

impl RyderCashTransaction {
    pub const LEN: usize = 1 + 32 + 8 + 1 + 8 + 8 + 1 + 32 + 8;
}

/// Audit artifact of a completed fair draw
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct DrawRecord {
    pub is_initialized: bool,
    pub competition: Pubkey,
    /// Live tickets in the pool at draw time
    pub total_tickets: u32,
    /// Distinct participants at draw time
    pub participant_count: u32,
    pub winning_ticket: u32,
    pub winner: Pubkey,
    /// Ledger index of the winning entry
    pub entry_index: u32,
    /// Seed the selection was derived from
    pub seed: [u8; 32],
    pub drawn_at: UnixTimestamp,
}

impl DrawRecord {
    pub const LEN: usize = 1 + 32 + 4 + 4 + 4 + 32 + 4 + 32 + 8;
}

/// Marks that a user holds entries in a competition
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq)]
pub struct Participant {
    pub is_initialized: bool,
    pub competition: Pubkey,
    pub user: Pubkey,
    /// Live tickets, refunds deducted
    pub tickets: u32,
    /// Live entries, refunds deducted
    pub entries: u32,
}

impl Participant {
    pub const LEN: usize = 1 + 32 + 32 + 4 + 4;

    /// Record a new entry. Returns true when the user joins the draw pool.
    pub fn add_entry(&mut self, quantity: u32) -> Result<bool, CompetitionError> {
        let joining = self.tickets == 0;
        self.tickets = self
            .tickets
            .checked_add(quantity)
            .ok_or(CompetitionError::MathOverflow)?;
        self.entries = self
            .entries
            .checked_add(1)
            .ok_or(CompetitionError::MathOverflow)?;
        Ok(joining)
    }

    /// Remove a refunded entry. Returns true when the user leaves the draw pool.
    pub fn remove_entry(&mut self, quantity: u32) -> Result<bool, CompetitionError> {
        self.tickets = self
            .tickets
            .checked_sub(quantity)
            .ok_or(CompetitionError::MathOverflow)?;
        self.entries = self
            .entries
            .checked_sub(1)
            .ok_or(CompetitionError::MathOverflow)?;
        Ok(self.tickets == 0)
    }
}
