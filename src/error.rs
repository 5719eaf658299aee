use solana_program::program_error::ProgramError;
use thiserror::Error;

/// First custom error code used by the program. Codes below it belong to
/// the system program and other CPI targets.
pub const ERROR_CODE_OFFSET: u32 = 6000;

/// Errors that may be returned by the Prize Competition program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompetitionError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstruction = 6000,

    /// Requested tickets exceed the remaining supply
    #[error("Requested tickets exceed remaining supply")]
    CapacityExceeded,

    /// Competition is inactive or outside its sale window
    #[error("Competition is closed")]
    CompetitionClosed,

    /// Payment or persistence failure during a purchase
    #[error("Purchase failed")]
    PurchaseFailed,

    /// The competition already has a winner
    #[error("Competition has already been drawn")]
    AlreadyDrawn,

    /// No live tickets to draw from
    #[error("Competition has no participants")]
    NoParticipants,

    /// Balance debit would go negative
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Caller is not the configured admin
    #[error("Only the admin can perform this action")]
    NotAuthorized,

    /// Ticket quantity must be at least one
    #[error("Ticket quantity must be at least one")]
    InvalidTicketQuantity,

    /// Instant prizes were already assigned for this competition
    #[error("Instant prizes already assigned")]
    InstantPrizesAlreadyAssigned,

    /// Instant prizes can only be assigned before any ticket is sold
    #[error("Ticket sales have already started")]
    SalesAlreadyStarted,

    /// More instant wins than ticket numbers, or more than the table can hold
    #[error("Too many instant wins for this competition")]
    TooManyInstantWins,

    /// The ticket ledger account has no room for another entry
    #[error("Ticket ledger is full")]
    LedgerFull,

    /// The prize table account is too small
    #[error("Prize table is full")]
    PrizeTableFull,

    /// Unknown prize kind tag
    #[error("Invalid prize kind")]
    InvalidPrizeKind,

    /// Claim would push remaining wins below zero
    #[error("Instant prize has no remaining wins")]
    PrizeExhausted,

    /// Revealed draw secret does not match the commitment
    #[error("Draw secret does not match commitment")]
    InvalidDrawSecret,

    /// An account does not match the one recorded on the competition
    #[error("Account does not match competition")]
    AccountMismatch,

    /// No entry with the requested index
    #[error("Entry not found")]
    EntryNotFound,

    /// Entry was already refunded
    #[error("Entry already refunded")]
    EntryAlreadyRefunded,

    /// End time must be after start time and max tickets non-zero
    #[error("Invalid competition parameters")]
    InvalidCompetitionParameters,

    /// Arithmetic overflow
    #[error("Math overflow")]
    MathOverflow,

    /// Vault cannot cover the payout and stay rent exempt
    #[error("Vault has insufficient funds")]
    VaultInsufficientFunds,
}

impl CompetitionError {
    const ALL: [CompetitionError; 23] = [
        CompetitionError::InvalidInstruction,
        CompetitionError::CapacityExceeded,
        CompetitionError::CompetitionClosed,
        CompetitionError::PurchaseFailed,
        CompetitionError::AlreadyDrawn,
        CompetitionError::NoParticipants,
        CompetitionError::InsufficientBalance,
        CompetitionError::NotAuthorized,
        CompetitionError::InvalidTicketQuantity,
        CompetitionError::InstantPrizesAlreadyAssigned,
        CompetitionError::SalesAlreadyStarted,
        CompetitionError::TooManyInstantWins,
        CompetitionError::LedgerFull,
        CompetitionError::PrizeTableFull,
        CompetitionError::InvalidPrizeKind,
        CompetitionError::PrizeExhausted,
        CompetitionError::InvalidDrawSecret,
        CompetitionError::AccountMismatch,
        CompetitionError::EntryNotFound,
        CompetitionError::EntryAlreadyRefunded,
        CompetitionError::InvalidCompetitionParameters,
        CompetitionError::MathOverflow,
        CompetitionError::VaultInsufficientFunds,
    ];

    /// Error for a `ProgramError::Custom` code raised by this program
    pub fn from_code(code: u32) -> Option<Self> {
        let index = code.checked_sub(ERROR_CODE_OFFSET)?;
        Self::ALL.get(index as usize).copied()
    }
}

impl From<CompetitionError> for ProgramError {
    fn from(e: CompetitionError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
