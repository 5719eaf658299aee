// Prize Competition Program - Fair Draw Engine
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::CompetitionError,
    ledger::{Entry, TicketLedger},
    random::RandomSource,
    state::{Competition, DrawRecord},
};

/// Pick the grand prize winner, uniformly over every live ticket.
///
/// Each live ticket is one equally likely outcome, so a user's chance is
/// proportional to the tickets they hold. Refunded entries are skipped.
/// On success the competition is closed and the winner recorded.
pub fn draw_winner<D, R>(
    competition: &mut Competition,
    competition_key: &Pubkey,
    ledger: &TicketLedger<D>,
    rng: &mut R,
    seed: [u8; 32],
    now: UnixTimestamp,
) -> Result<DrawRecord, ProgramError>
where
    D: AsRef<[u8]>,
    R: RandomSource,
{
    if competition.winner.is_some() {
        return Err(CompetitionError::AlreadyDrawn.into());
    }
    if competition.live_tickets == 0 {
        return Err(CompetitionError::NoParticipants.into());
    }

    let pick = rng.uniform_below(competition.live_tickets as u64) as u32;
    let (entry, winning_ticket) = nth_live_ticket(ledger, pick)?;

    competition.winner = Some(entry.user);
    competition.winning_ticket = Some(winning_ticket);
    competition.draw_timestamp = Some(now);
    competition.is_active = false;

    Ok(DrawRecord {
        is_initialized: true,
        competition: *competition_key,
        total_tickets: competition.live_tickets,
        participant_count: competition.participant_count,
        winning_ticket,
        winner: entry.user,
        entry_index: entry.index,
        seed,
        drawn_at: now,
    })
}

/// The `n`th live ticket (0-based) in ticket order, with the entry holding it
fn nth_live_ticket<D: AsRef<[u8]>>(
    ledger: &TicketLedger<D>,
    mut n: u32,
) -> Result<(Entry, u32), ProgramError> {
    for entry in ledger.entries() {
        let entry = entry?;
        if !entry.is_live() {
            continue;
        }
        if n < entry.quantity {
            return Ok((entry, entry.first_ticket + n));
        }
        n -= entry.quantity;
    }
    msg!("Live ticket count does not match the ledger");
    Err(CompetitionError::AccountMismatch.into())
}
