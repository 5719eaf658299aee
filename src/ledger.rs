// Prize Competition Program - Ticket Ledger
//
// Append-only record of which ticket numbers belong to which purchase.
// Lives in a program-owned account pre-allocated by the client; the
// account is a fixed header followed by fixed-size entry records.
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};
use std::convert::TryFrom;
use std::ops::RangeInclusive;

use crate::error::CompetitionError;
use crate::state::{PaymentMethod, PaymentStatus};

const HEADER_LEN: usize = 1 + 32 + 4 + 4 + 4;
const ENTRY_LEN: usize = 4 + 4 + 32 + 8 + 1 + 1 + 8;

/// One purchase event: a contiguous block of ticket numbers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub index: u32,
    pub first_ticket: u32,
    pub quantity: u32,
    pub user: Pubkey,
    pub total_cost: u64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub purchased_at: UnixTimestamp,
}

impl Entry {
    pub fn last_ticket(&self) -> u32 {
        self.first_ticket + self.quantity - 1
    }

    /// The ordered ticket numbers granted by this entry
    pub fn ticket_numbers(&self) -> RangeInclusive<u32> {
        self.first_ticket..=self.last_ticket()
    }

    pub fn contains(&self, ticket: u32) -> bool {
        ticket >= self.first_ticket && ticket <= self.last_ticket()
    }

    pub fn is_live(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    fn unpack(index: u32, src: &[u8; ENTRY_LEN]) -> Result<Self, ProgramError> {
        let (first_ticket, quantity, user, total_cost, payment_method, payment_status, purchased_at) =
            array_refs![src, 4, 4, 32, 8, 1, 1, 8];
        Ok(Entry {
            index,
            first_ticket: u32::from_le_bytes(*first_ticket),
            quantity: u32::from_le_bytes(*quantity),
            user: Pubkey::new_from_array(*user),
            total_cost: u64::from_le_bytes(*total_cost),
            payment_method: PaymentMethod::try_from(payment_method[0])?,
            payment_status: PaymentStatus::try_from(payment_status[0])?,
            purchased_at: UnixTimestamp::from_le_bytes(*purchased_at),
        })
    }

    fn pack(&self, dst: &mut [u8; ENTRY_LEN]) {
        let (
            first_ticket_dst,
            quantity_dst,
            user_dst,
            total_cost_dst,
            payment_method_dst,
            payment_status_dst,
            purchased_at_dst,
        ) = mut_array_refs![dst, 4, 4, 32, 8, 1, 1, 8];
        *first_ticket_dst = self.first_ticket.to_le_bytes();
        *quantity_dst = self.quantity.to_le_bytes();
        user_dst.copy_from_slice(self.user.as_ref());
        *total_cost_dst = self.total_cost.to_le_bytes();
        payment_method_dst[0] = self.payment_method.into();
        payment_status_dst[0] = self.payment_status.into();
        *purchased_at_dst = self.purchased_at.to_le_bytes();
    }
}

/// Details of a reservation request
#[derive(Debug, Clone, Copy)]
pub struct Reservation {
    pub user: Pubkey,
    pub quantity: u32,
    pub total_cost: u64,
    pub payment_method: PaymentMethod,
    pub purchased_at: UnixTimestamp,
}

/// Zero-copy view over a ticket ledger account
pub struct TicketLedger<D> {
    data: D,
}

impl TicketLedger<()> {
    /// Account size needed to hold `capacity` entries
    pub fn space(capacity: u32) -> usize {
        HEADER_LEN + capacity as usize * ENTRY_LEN
    }
}

impl<D: AsRef<[u8]>> TicketLedger<D> {
    /// Load an initialized ledger
    pub fn load(data: D) -> Result<Self, ProgramError> {
        let ledger = Self { data };
        if ledger.data.as_ref().len() < HEADER_LEN {
            return Err(ProgramError::AccountDataTooSmall);
        }
        if ledger.data.as_ref()[0] == 0 {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(ledger)
    }

    fn header(&self) -> (&[u8; 1], &[u8; 32], &[u8; 4], &[u8; 4], &[u8; 4]) {
        let src = array_ref![self.data.as_ref(), 0, HEADER_LEN];
        array_refs![src, 1, 32, 4, 4, 4]
    }

    /// Competition this ledger belongs to
    pub fn competition(&self) -> Pubkey {
        Pubkey::new_from_array(*self.header().1)
    }

    pub fn capacity(&self) -> u32 {
        u32::from_le_bytes(*self.header().2)
    }

    /// Number of entries recorded
    pub fn len(&self) -> u32 {
        u32::from_le_bytes(*self.header().3)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest ticket number granted so far
    pub fn tickets_issued(&self) -> u32 {
        u32::from_le_bytes(*self.header().4)
    }

    pub fn entry(&self, index: u32) -> Result<Entry, ProgramError> {
        if index >= self.len() {
            return Err(CompetitionError::EntryNotFound.into());
        }
        let offset = HEADER_LEN + index as usize * ENTRY_LEN;
        Entry::unpack(index, array_ref![self.data.as_ref(), offset, ENTRY_LEN])
    }

    /// Entries in purchase order, which is also ascending ticket order
    pub fn entries(&self) -> impl Iterator<Item = Result<Entry, ProgramError>> + '_ {
        (0..self.len()).map(move |index| self.entry(index))
    }

    /// Entry holding `ticket`, if that number has been sold
    pub fn owner_of(&self, ticket: u32) -> Result<Option<Entry>, ProgramError> {
        if ticket == 0 || ticket > self.tickets_issued() {
            return Ok(None);
        }
        let (mut lo, mut hi) = (0u32, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = self.entry(mid)?;
            if ticket < entry.first_ticket {
                hi = mid;
            } else if ticket > entry.last_ticket() {
                lo = mid + 1;
            } else {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

impl<D: AsRef<[u8]> + AsMut<[u8]>> TicketLedger<D> {
    /// Initialize an empty ledger for `competition`
    pub fn initialize(mut data: D, competition: &Pubkey) -> Result<Self, ProgramError> {
        let len = data.as_ref().len();
        if len < HEADER_LEN + ENTRY_LEN {
            return Err(ProgramError::AccountDataTooSmall);
        }
        if data.as_ref()[0] != 0 {
            return Err(ProgramError::AccountAlreadyInitialized);
        }
        let capacity = u32::try_from((len - HEADER_LEN) / ENTRY_LEN).unwrap_or(u32::MAX);

        let dst = array_mut_ref![data.as_mut(), 0, HEADER_LEN];
        let (is_initialized_dst, competition_dst, capacity_dst, len_dst, issued_dst) =
            mut_array_refs![dst, 1, 32, 4, 4, 4];
        is_initialized_dst[0] = 1;
        competition_dst.copy_from_slice(competition.as_ref());
        *capacity_dst = capacity.to_le_bytes();
        *len_dst = 0u32.to_le_bytes();
        *issued_dst = 0u32.to_le_bytes();

        Ok(Self { data })
    }

    fn set_counters(&mut self, len: u32, tickets_issued: u32) {
        let dst = array_mut_ref![self.data.as_mut(), 0, HEADER_LEN];
        let (_, _, _, len_dst, issued_dst) = mut_array_refs![dst, 1, 32, 4, 4, 4];
        *len_dst = len.to_le_bytes();
        *issued_dst = tickets_issued.to_le_bytes();
    }

    fn write_entry(&mut self, entry: &Entry) {
        let offset = HEADER_LEN + entry.index as usize * ENTRY_LEN;
        entry.pack(array_mut_ref![self.data.as_mut(), offset, ENTRY_LEN]);
    }

    /// Grant the next contiguous block of `quantity` numbers, never exceeding
    /// `max_tickets` in aggregate. Nothing is written on failure.
    pub fn reserve(
        &mut self,
        max_tickets: u32,
        reservation: &Reservation,
    ) -> Result<Entry, CompetitionError> {
        if reservation.quantity == 0 {
            return Err(CompetitionError::InvalidTicketQuantity);
        }
        let issued = self.tickets_issued();
        let new_issued = issued
            .checked_add(reservation.quantity)
            .ok_or(CompetitionError::CapacityExceeded)?;
        if new_issued > max_tickets {
            return Err(CompetitionError::CapacityExceeded);
        }
        let index = self.len();
        if index >= self.capacity() {
            return Err(CompetitionError::LedgerFull);
        }

        let entry = Entry {
            index,
            first_ticket: issued + 1,
            quantity: reservation.quantity,
            user: reservation.user,
            total_cost: reservation.total_cost,
            payment_method: reservation.payment_method,
            payment_status: PaymentStatus::Paid,
            purchased_at: reservation.purchased_at,
        };
        self.write_entry(&entry);
        self.set_counters(index + 1, new_issued);
        Ok(entry)
    }

    /// Mark an entry as refunded. Its numbers stay burned.
    pub fn void(&mut self, index: u32) -> Result<Entry, ProgramError> {
        let mut entry = self.entry(index)?;
        if entry.payment_status == PaymentStatus::Refunded {
            return Err(CompetitionError::EntryAlreadyRefunded.into());
        }
        entry.payment_status = PaymentStatus::Refunded;
        self.write_entry(&entry);
        Ok(entry)
    }
}
