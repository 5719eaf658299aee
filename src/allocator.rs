// Prize Competition Program - Instant Prize Allocator
//
// The prize table account holds the prize definitions followed by the
// pre-assigned winning ticket rows, sorted by ticket number.
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};
use std::convert::TryFrom;
use std::ops::RangeInclusive;

use crate::constants::MAX_INSTANT_PRIZES;
use crate::error::CompetitionError;
use crate::random::RandomSource;
use crate::state::PrizeKind;

const HEADER_LEN: usize = 1 + 32 + 1 + 4 + 4;
const PRIZE_LEN: usize = 32 + 1 + 8 + 4 + 4;
const TICKET_LEN: usize = 4 + 1 + 1 + 32 + 8;
const TICKETS_OFFSET: usize = HEADER_LEN + MAX_INSTANT_PRIZES * PRIZE_LEN;

/// Prize definition supplied when a competition is set up
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct InstantPrizeConfig {
    pub name: [u8; 32],
    pub kind: PrizeKind,
    /// Lamports for cash, credit units for site credit
    pub value: u64,
    pub total_wins: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstantPrize {
    pub index: u8,
    pub name: [u8; 32],
    pub kind: PrizeKind,
    pub value: u64,
    pub total_wins: u32,
    pub remaining_wins: u32,
}

impl InstantPrize {
    pub fn claimed_wins(&self) -> u32 {
        self.total_wins - self.remaining_wins
    }
}

/// A ticket number pre-mapped to a prize
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstantWinTicket {
    pub ticket: u32,
    pub prize_index: u8,
    pub winner: Option<Pubkey>,
    pub claimed_at: Option<UnixTimestamp>,
}

impl InstantWinTicket {
    pub fn is_claimed(&self) -> bool {
        self.winner.is_some()
    }

    fn unpack(src: &[u8; TICKET_LEN]) -> Self {
        let (ticket, prize_index, claimed, winner, claimed_at) = array_refs![src, 4, 1, 1, 32, 8];
        let claimed = claimed[0] != 0;
        InstantWinTicket {
            ticket: u32::from_le_bytes(*ticket),
            prize_index: prize_index[0],
            winner: claimed.then(|| Pubkey::new_from_array(*winner)),
            claimed_at: claimed.then(|| UnixTimestamp::from_le_bytes(*claimed_at)),
        }
    }

    fn pack(&self, dst: &mut [u8; TICKET_LEN]) {
        let (ticket_dst, prize_index_dst, claimed_dst, winner_dst, claimed_at_dst) =
            mut_array_refs![dst, 4, 1, 1, 32, 8];
        *ticket_dst = self.ticket.to_le_bytes();
        prize_index_dst[0] = self.prize_index;
        claimed_dst[0] = self.is_claimed() as u8;
        winner_dst.copy_from_slice(self.winner.unwrap_or_default().as_ref());
        *claimed_at_dst = self.claimed_at.unwrap_or_default().to_le_bytes();
    }
}

/// A claim produced by a purchase
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstantWin {
    pub ticket: u32,
    pub prize_index: u8,
    pub name: [u8; 32],
    pub kind: PrizeKind,
    pub value: u64,
}

/// Zero-copy view over an instant prize table account
pub struct PrizeTable<D> {
    data: D,
}

impl PrizeTable<()> {
    /// Account size needed to hold `win_capacity` winning tickets
    pub fn space(win_capacity: u32) -> usize {
        TICKETS_OFFSET + win_capacity as usize * TICKET_LEN
    }
}

impl<D: AsRef<[u8]>> PrizeTable<D> {
    pub fn load(data: D) -> Result<Self, ProgramError> {
        let table = Self { data };
        if table.data.as_ref().len() < TICKETS_OFFSET {
            return Err(ProgramError::AccountDataTooSmall);
        }
        if table.data.as_ref()[0] == 0 {
            return Err(ProgramError::UninitializedAccount);
        }
        Ok(table)
    }

    fn header(&self) -> (&[u8; 1], &[u8; 32], &[u8; 1], &[u8; 4], &[u8; 4]) {
        let src = array_ref![self.data.as_ref(), 0, HEADER_LEN];
        array_refs![src, 1, 32, 1, 4, 4]
    }

    pub fn competition(&self) -> Pubkey {
        Pubkey::new_from_array(*self.header().1)
    }

    pub fn prize_count(&self) -> u8 {
        self.header().2[0]
    }

    pub fn win_capacity(&self) -> u32 {
        u32::from_le_bytes(*self.header().3)
    }

    /// Number of winning ticket rows assigned
    pub fn win_count(&self) -> u32 {
        u32::from_le_bytes(*self.header().4)
    }

    pub fn prize(&self, index: u8) -> Result<InstantPrize, ProgramError> {
        if index >= self.prize_count() {
            return Err(ProgramError::InvalidAccountData);
        }
        let offset = HEADER_LEN + index as usize * PRIZE_LEN;
        let src = array_ref![self.data.as_ref(), offset, PRIZE_LEN];
        let (name, kind, value, total_wins, remaining_wins) = array_refs![src, 32, 1, 8, 4, 4];
        Ok(InstantPrize {
            index,
            name: *name,
            kind: PrizeKind::try_from(kind[0])?,
            value: u64::from_le_bytes(*value),
            total_wins: u32::from_le_bytes(*total_wins),
            remaining_wins: u32::from_le_bytes(*remaining_wins),
        })
    }

    pub fn prizes(&self) -> Result<Vec<InstantPrize>, ProgramError> {
        (0..self.prize_count()).map(|index| self.prize(index)).collect()
    }

    /// Winning ticket row at position `row` (rows are sorted by ticket number)
    pub fn ticket_row(&self, row: u32) -> Result<InstantWinTicket, ProgramError> {
        if row >= self.win_count() {
            return Err(ProgramError::InvalidArgument);
        }
        let offset = TICKETS_OFFSET + row as usize * TICKET_LEN;
        Ok(InstantWinTicket::unpack(array_ref![
            self.data.as_ref(),
            offset,
            TICKET_LEN
        ]))
    }

    pub fn tickets(&self) -> impl Iterator<Item = InstantWinTicket> + '_ {
        (0..self.win_count()).filter_map(move |row| self.ticket_row(row).ok())
    }

    /// First row whose ticket number is >= `ticket`
    fn lower_bound(&self, ticket: u32) -> Result<u32, ProgramError> {
        let (mut lo, mut hi) = (0u32, self.win_count());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.ticket_row(mid)?.ticket < ticket {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Instant win row for `ticket`, if that number carries a prize
    pub fn lookup(&self, ticket: u32) -> Result<Option<InstantWinTicket>, ProgramError> {
        let row = self.lower_bound(ticket)?;
        if row < self.win_count() {
            let found = self.ticket_row(row)?;
            if found.ticket == ticket {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Unclaimed winning rows inside `range`, paired with their row position.
    /// Clients use this to predict which Ryder Cash records a purchase creates.
    pub fn unclaimed_in_range(
        &self,
        range: RangeInclusive<u32>,
    ) -> Result<Vec<(u32, InstantWinTicket)>, ProgramError> {
        let mut found = Vec::new();
        let mut row = self.lower_bound(*range.start())?;
        while row < self.win_count() {
            let ticket = self.ticket_row(row)?;
            if ticket.ticket > *range.end() {
                break;
            }
            if !ticket.is_claimed() {
                found.push((row, ticket));
            }
            row += 1;
        }
        Ok(found)
    }
}

impl<D: AsRef<[u8]> + AsMut<[u8]>> PrizeTable<D> {
    pub fn initialize(mut data: D, competition: &Pubkey) -> Result<Self, ProgramError> {
        let len = data.as_ref().len();
        if len < TICKETS_OFFSET {
            return Err(ProgramError::AccountDataTooSmall);
        }
        if data.as_ref()[0] != 0 {
            return Err(ProgramError::AccountAlreadyInitialized);
        }
        let win_capacity = u32::try_from((len - TICKETS_OFFSET) / TICKET_LEN).unwrap_or(u32::MAX);

        let dst = array_mut_ref![data.as_mut(), 0, HEADER_LEN];
        let (is_initialized_dst, competition_dst, prize_count_dst, capacity_dst, win_count_dst) =
            mut_array_refs![dst, 1, 32, 1, 4, 4];
        is_initialized_dst[0] = 1;
        competition_dst.copy_from_slice(competition.as_ref());
        prize_count_dst[0] = 0;
        *capacity_dst = win_capacity.to_le_bytes();
        *win_count_dst = 0u32.to_le_bytes();

        Ok(Self { data })
    }

    fn set_counts(&mut self, prize_count: u8, win_count: u32) {
        let dst = array_mut_ref![self.data.as_mut(), 0, HEADER_LEN];
        let (_, _, prize_count_dst, _, win_count_dst) = mut_array_refs![dst, 1, 32, 1, 4, 4];
        prize_count_dst[0] = prize_count;
        *win_count_dst = win_count.to_le_bytes();
    }

    fn write_prize(&mut self, prize: &InstantPrize) {
        let offset = HEADER_LEN + prize.index as usize * PRIZE_LEN;
        let dst = array_mut_ref![self.data.as_mut(), offset, PRIZE_LEN];
        let (name_dst, kind_dst, value_dst, total_wins_dst, remaining_wins_dst) =
            mut_array_refs![dst, 32, 1, 8, 4, 4];
        name_dst.copy_from_slice(&prize.name);
        kind_dst[0] = prize.kind.into();
        *value_dst = prize.value.to_le_bytes();
        *total_wins_dst = prize.total_wins.to_le_bytes();
        *remaining_wins_dst = prize.remaining_wins.to_le_bytes();
    }

    fn write_ticket_row(&mut self, row: u32, ticket: &InstantWinTicket) {
        let offset = TICKETS_OFFSET + row as usize * TICKET_LEN;
        ticket.pack(array_mut_ref![self.data.as_mut(), offset, TICKET_LEN]);
    }

    /// Draw `total_wins` distinct numbers per prize from `[1, max_tickets]`,
    /// without replacement across all prizes, and persist them unclaimed.
    /// Returns the number of winning tickets assigned.
    pub fn assign_instant_prizes<R: RandomSource>(
        &mut self,
        rng: &mut R,
        max_tickets: u32,
        prizes: &[InstantPrizeConfig],
    ) -> Result<u32, ProgramError> {
        if self.prize_count() != 0 || self.win_count() != 0 {
            return Err(CompetitionError::InstantPrizesAlreadyAssigned.into());
        }
        if prizes.is_empty() || prizes.len() > MAX_INSTANT_PRIZES {
            return Err(CompetitionError::TooManyInstantWins.into());
        }
        let mut total: u32 = 0;
        for prize in prizes {
            if prize.total_wins == 0 {
                return Err(ProgramError::InvalidArgument);
            }
            total = total
                .checked_add(prize.total_wins)
                .ok_or(CompetitionError::TooManyInstantWins)?;
        }
        if total > max_tickets {
            return Err(CompetitionError::TooManyInstantWins.into());
        }
        if total > self.win_capacity() {
            return Err(CompetitionError::PrizeTableFull.into());
        }

        // Floyd's sampling: a uniform k-subset of [1, n], kept sorted
        let mut numbers: Vec<u32> = Vec::with_capacity(total as usize);
        for upper in (max_tickets - total + 1)..=max_tickets {
            let pick = rng.uniform_below(upper as u64) as u32 + 1;
            let candidate = match numbers.binary_search(&pick) {
                Ok(_) => upper,
                Err(_) => pick,
            };
            if let Err(position) = numbers.binary_search(&candidate) {
                numbers.insert(position, candidate);
            }
        }

        // Uniformly shuffled prize labels, one per winning number
        let mut labels: Vec<u8> = Vec::with_capacity(total as usize);
        for (index, prize) in prizes.iter().enumerate() {
            labels.extend(std::iter::repeat(index as u8).take(prize.total_wins as usize));
        }
        for i in (1..labels.len()).rev() {
            let j = rng.uniform_below(i as u64 + 1) as usize;
            labels.swap(i, j);
        }

        for (index, prize) in prizes.iter().enumerate() {
            self.write_prize(&InstantPrize {
                index: index as u8,
                name: prize.name,
                kind: prize.kind,
                value: prize.value,
                total_wins: prize.total_wins,
                remaining_wins: prize.total_wins,
            });
        }
        for (row, (ticket, prize_index)) in numbers.iter().zip(labels.iter()).enumerate() {
            self.write_ticket_row(
                row as u32,
                &InstantWinTicket {
                    ticket: *ticket,
                    prize_index: *prize_index,
                    winner: None,
                    claimed_at: None,
                },
            );
        }
        self.set_counts(prizes.len() as u8, total);
        Ok(total)
    }

    /// Claim every unclaimed winning number in `range` for `winner`.
    /// Already claimed numbers are skipped, so replays never double count.
    /// Nothing is written if any claim would exhaust its prize.
    pub fn resolve(
        &mut self,
        range: RangeInclusive<u32>,
        winner: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<Vec<InstantWin>, ProgramError> {
        let planned = self.unclaimed_in_range(range)?;
        if planned.is_empty() {
            return Ok(Vec::new());
        }

        let mut prizes = self.prizes()?;
        for (_, ticket) in &planned {
            let prize = prizes
                .get_mut(ticket.prize_index as usize)
                .ok_or(ProgramError::InvalidAccountData)?;
            prize.remaining_wins = prize
                .remaining_wins
                .checked_sub(1)
                .ok_or(CompetitionError::PrizeExhausted)?;
        }

        let mut wins = Vec::with_capacity(planned.len());
        for (row, mut ticket) in planned {
            ticket.winner = Some(*winner);
            ticket.claimed_at = Some(now);
            self.write_ticket_row(row, &ticket);

            let prize = &prizes[ticket.prize_index as usize];
            wins.push(InstantWin {
                ticket: ticket.ticket,
                prize_index: prize.index,
                name: prize.name,
                kind: prize.kind,
                value: prize.value,
            });
        }
        for prize in &prizes {
            self.write_prize(prize);
        }
        Ok(wins)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::random::HashChainRng;
    use std::collections::HashSet;

    pub(crate) fn prize_name(name: &str) -> [u8; 32] {
        let mut padded = [0u8; 32];
        padded[..name.len()].copy_from_slice(name.as_bytes());
        padded
    }

    pub(crate) fn config(name: &str, kind: PrizeKind, value: u64, total_wins: u32) -> InstantPrizeConfig {
        InstantPrizeConfig {
            name: prize_name(name),
            kind,
            value,
            total_wins,
        }
    }

    fn new_table(win_capacity: u32) -> PrizeTable<Vec<u8>> {
        PrizeTable::initialize(vec![0u8; PrizeTable::space(win_capacity)], &Pubkey::new_unique())
            .unwrap()
    }

    /// Table with one prize pinned to the given ticket numbers
    pub(crate) fn pinned_table(kind: PrizeKind, value: u64, tickets: &[u32]) -> PrizeTable<Vec<u8>> {
        let mut table = new_table(tickets.len() as u32);
        table.write_prize(&InstantPrize {
            index: 0,
            name: prize_name("Pinned"),
            kind,
            value,
            total_wins: tickets.len() as u32,
            remaining_wins: tickets.len() as u32,
        });
        for (row, ticket) in tickets.iter().enumerate() {
            table.write_ticket_row(
                row as u32,
                &InstantWinTicket {
                    ticket: *ticket,
                    prize_index: 0,
                    winner: None,
                    claimed_at: None,
                },
            );
        }
        table.set_counts(1, tickets.len() as u32);
        table
    }

    #[test]
    fn test_assignment_is_disjoint_and_in_range() {
        let mut table = new_table(64);
        let mut rng = HashChainRng::new([3u8; 32]);
        let prizes = vec![
            config("Cash 100", PrizeKind::Cash, 100, 5),
            config("Credit 10", PrizeKind::SiteCredit, 10, 20),
            config("Cash 1000", PrizeKind::Cash, 1_000, 1),
        ];
        assert_eq!(table.assign_instant_prizes(&mut rng, 100, &prizes).unwrap(), 26);

        let tickets: Vec<InstantWinTicket> = table.tickets().collect();
        assert_eq!(tickets.len(), 26);
        let distinct: HashSet<u32> = tickets.iter().map(|t| t.ticket).collect();
        assert_eq!(distinct.len(), 26);
        assert!(tickets.iter().all(|t| t.ticket >= 1 && t.ticket <= 100));
        assert!(tickets.windows(2).all(|w| w[0].ticket < w[1].ticket));
        assert!(tickets.iter().all(|t| !t.is_claimed()));

        for (index, prize) in prizes.iter().enumerate() {
            let rows = tickets.iter().filter(|t| t.prize_index as usize == index).count();
            assert_eq!(rows as u32, prize.total_wins);
            let stored = table.prize(index as u8).unwrap();
            assert_eq!(stored.remaining_wins, prize.total_wins);
            assert_eq!(stored.kind, prize.kind);
        }
    }

    #[test]
    fn test_assignment_can_fill_every_number() {
        let mut table = new_table(10);
        let mut rng = HashChainRng::new([9u8; 32]);
        let prizes = vec![
            config("A", PrizeKind::Cash, 1, 4),
            config("B", PrizeKind::SiteCredit, 1, 6),
        ];
        table.assign_instant_prizes(&mut rng, 10, &prizes).unwrap();
        let numbers: Vec<u32> = table.tickets().map(|t| t.ticket).collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_assignment_rejects_bad_setups() {
        let mut rng = HashChainRng::new([1u8; 32]);
        let mut table = new_table(4);
        assert_eq!(
            table.assign_instant_prizes(&mut rng, 3, &[config("A", PrizeKind::Cash, 1, 4)]),
            Err(CompetitionError::TooManyInstantWins.into())
        );
        assert_eq!(
            table.assign_instant_prizes(&mut rng, 100, &[config("A", PrizeKind::Cash, 1, 5)]),
            Err(CompetitionError::PrizeTableFull.into())
        );
        table
            .assign_instant_prizes(&mut rng, 100, &[config("A", PrizeKind::Cash, 1, 2)])
            .unwrap();
        assert_eq!(
            table.assign_instant_prizes(&mut rng, 100, &[config("A", PrizeKind::Cash, 1, 2)]),
            Err(CompetitionError::InstantPrizesAlreadyAssigned.into())
        );
    }

    #[test]
    fn test_assignment_depends_on_seed() {
        let prizes = vec![config("A", PrizeKind::Cash, 1, 8)];
        let mut first = new_table(8);
        let mut second = new_table(8);
        first
            .assign_instant_prizes(&mut HashChainRng::new([1u8; 32]), 10_000, &prizes)
            .unwrap();
        second
            .assign_instant_prizes(&mut HashChainRng::new([2u8; 32]), 10_000, &prizes)
            .unwrap();
        let a: Vec<u32> = first.tickets().map(|t| t.ticket).collect();
        let b: Vec<u32> = second.tickets().map(|t| t.ticket).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_claims_ticket_seven_once() {
        let mut table = pinned_table(PrizeKind::Cash, 500, &[7]);
        let buyer = Pubkey::new_unique();

        let wins = table.resolve(5..=9, &buyer, 1_234).unwrap();
        assert_eq!(wins.len(), 1);
        assert_eq!(wins[0].ticket, 7);
        assert_eq!(wins[0].value, 500);
        assert_eq!(table.prize(0).unwrap().remaining_wins, 0);

        let row = table.lookup(7).unwrap().unwrap();
        assert_eq!(row.winner, Some(buyer));
        assert_eq!(row.claimed_at, Some(1_234));

        // replaying the same range is a no-op
        let replay = table.resolve(5..=9, &Pubkey::new_unique(), 9_999).unwrap();
        assert!(replay.is_empty());
        assert_eq!(table.prize(0).unwrap().remaining_wins, 0);
        assert_eq!(table.lookup(7).unwrap().unwrap().winner, Some(buyer));
    }

    #[test]
    fn test_resolve_ignores_numbers_without_prizes() {
        let mut table = pinned_table(PrizeKind::SiteCredit, 10, &[3, 40]);
        let wins = table.resolve(4..=39, &Pubkey::new_unique(), 0).unwrap();
        assert!(wins.is_empty());
        assert!(table.lookup(4).unwrap().is_none());
        assert_eq!(table.prize(0).unwrap().remaining_wins, 2);
    }

    #[test]
    fn test_remaining_wins_tracks_claimed_rows() {
        let mut table = new_table(32);
        let mut rng = HashChainRng::new([11u8; 32]);
        let prizes = vec![
            config("A", PrizeKind::Cash, 5, 10),
            config("B", PrizeKind::SiteCredit, 2, 12),
        ];
        table.assign_instant_prizes(&mut rng, 50, &prizes).unwrap();

        let buyer = Pubkey::new_unique();
        table.resolve(1..=20, &buyer, 1).unwrap();
        table.resolve(15..=35, &buyer, 2).unwrap();

        for prize in table.prizes().unwrap() {
            assert!(prize.remaining_wins <= prize.total_wins);
            let claimed = table
                .tickets()
                .filter(|t| t.prize_index == prize.index && t.is_claimed())
                .count() as u32;
            assert_eq!(prize.claimed_wins(), claimed);
        }
        assert!(table
            .tickets()
            .all(|t| t.is_claimed() == (t.ticket <= 35)));
    }

    #[test]
    fn test_resolve_refuses_to_underflow_remaining_wins() {
        let mut table = pinned_table(PrizeKind::Cash, 1, &[2, 3]);
        let mut prize = table.prize(0).unwrap();
        prize.remaining_wins = 1;
        table.write_prize(&prize);

        assert_eq!(
            table.resolve(1..=5, &Pubkey::new_unique(), 0),
            Err(CompetitionError::PrizeExhausted.into())
        );
        assert!(table.tickets().all(|t| !t.is_claimed()));
        assert_eq!(table.prize(0).unwrap().remaining_wins, 1);
    }
}
