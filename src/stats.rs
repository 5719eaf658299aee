// Prize Competition Program - Stats
//
// Read-only projections over competition state, computed off-chain from
// fetched account data.
use solana_program::program_error::ProgramError;

use crate::{
    allocator::{InstantPrize, InstantWinTicket, PrizeTable},
    constants::{BASIS_POINTS, INSTANT_WIN_PAGE_SIZE},
    state::Competition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompetitionStats {
    pub tickets_sold: u32,
    pub remaining_tickets: u32,
    /// Tickets still in the draw pool
    pub live_tickets: u32,
    /// Sold share of max tickets, in basis points
    pub progress_bps: u64,
    pub revenue: u64,
    pub entry_count: u32,
    pub participant_count: u32,
}

impl CompetitionStats {
    pub fn progress_percent(&self) -> f64 {
        self.progress_bps as f64 / 100.0
    }
}

pub fn competition_stats(competition: &Competition) -> CompetitionStats {
    let progress_bps = if competition.max_tickets == 0 {
        0
    } else {
        competition.tickets_sold as u64 * BASIS_POINTS / competition.max_tickets as u64
    };
    CompetitionStats {
        tickets_sold: competition.tickets_sold,
        remaining_tickets: competition.remaining_tickets(),
        live_tickets: competition.live_tickets,
        progress_bps,
        revenue: competition.revenue,
        entry_count: competition.entry_count,
        participant_count: competition.participant_count,
    }
}

/// Per-prize totals: configured, claimed and remaining wins
pub fn instant_prize_summary<D: AsRef<[u8]>>(
    table: &PrizeTable<D>,
) -> Result<Vec<InstantPrize>, ProgramError> {
    table.prizes()
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstantWinPage {
    pub tickets: Vec<InstantWinTicket>,
    /// 1-based page number that was returned
    pub page: u32,
    pub total_pages: u32,
    /// Rows matching the filter across all pages
    pub total: u32,
}

/// Winning ticket rows in ticket order, optionally for a single prize.
/// Pages start at 1; page 0 is treated as page 1.
pub fn instant_win_tickets<D: AsRef<[u8]>>(
    table: &PrizeTable<D>,
    page: u32,
    prize_filter: Option<u8>,
) -> InstantWinPage {
    let matching: Vec<InstantWinTicket> = table
        .tickets()
        .filter(|row| prize_filter.map_or(true, |index| row.prize_index == index))
        .collect();

    let total = matching.len();
    let page = page.max(1);
    let total_pages = (total + INSTANT_WIN_PAGE_SIZE - 1) / INSTANT_WIN_PAGE_SIZE;
    let tickets = matching
        .into_iter()
        .skip((page as usize - 1) * INSTANT_WIN_PAGE_SIZE)
        .take(INSTANT_WIN_PAGE_SIZE)
        .collect();

    InstantWinPage {
        tickets,
        page,
        total_pages: total_pages as u32,
        total: total as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::tests::{config, pinned_table};
    use crate::random::HashChainRng;
    use crate::state::PrizeKind;
    use solana_program::pubkey::Pubkey;

    fn competition(max_tickets: u32, tickets_sold: u32) -> Competition {
        Competition {
            is_initialized: true,
            index: 0,
            authority: Pubkey::new_unique(),
            title: [0u8; 32],
            ticket_price: 250,
            max_tickets,
            tickets_sold,
            live_tickets: tickets_sold,
            start_time: 0,
            end_time: 100,
            is_active: true,
            prize_value: None,
            winner: None,
            draw_timestamp: None,
            winning_ticket: None,
            has_instant_wins: false,
            entry_count: 4,
            participant_count: 3,
            revenue: tickets_sold as u64 * 250,
            ledger: Pubkey::new_unique(),
            prize_table: Pubkey::new_unique(),
            draw_commitment: [0u8; 32],
            bump: 255,
        }
    }

    #[test]
    fn test_competition_stats_progress() {
        let stats = competition_stats(&competition(300, 75));
        assert_eq!(stats.tickets_sold, 75);
        assert_eq!(stats.remaining_tickets, 225);
        assert_eq!(stats.progress_bps, 2_500);
        assert_eq!(stats.progress_percent(), 25.0);
        assert_eq!(stats.revenue, 18_750);
        assert_eq!(stats.participant_count, 3);

        assert_eq!(competition_stats(&competition(0, 0)).progress_bps, 0);
        assert_eq!(competition_stats(&competition(3, 3)).progress_bps, BASIS_POINTS);
    }

    #[test]
    fn test_prize_summary_reports_claims() {
        let mut table = pinned_table(PrizeKind::SiteCredit, 5, &[2, 4, 6]);
        table.resolve(1..=4, &Pubkey::new_unique(), 10).unwrap();
        let summary = instant_prize_summary(&table).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_wins, 3);
        assert_eq!(summary[0].remaining_wins, 1);
        assert_eq!(summary[0].claimed_wins(), 2);
    }

    #[test]
    fn test_instant_win_pages() {
        let mut table =
            PrizeTable::initialize(vec![0u8; PrizeTable::space(64)], &Pubkey::new_unique()).unwrap();
        let mut rng = HashChainRng::new([4u8; 32]);
        table
            .assign_instant_prizes(
                &mut rng,
                200,
                &[
                    config("Cash", PrizeKind::Cash, 100, 30),
                    config("Credit", PrizeKind::SiteCredit, 10, 15),
                ],
            )
            .unwrap();

        let first = instant_win_tickets(&table, 1, None);
        assert_eq!(first.total, 45);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.tickets.len(), INSTANT_WIN_PAGE_SIZE);
        assert!(first.tickets.windows(2).all(|w| w[0].ticket < w[1].ticket));

        let last = instant_win_tickets(&table, 3, None);
        assert_eq!(last.tickets.len(), 5);
        assert!(first.tickets[19].ticket < last.tickets[0].ticket);

        assert!(instant_win_tickets(&table, 4, None).tickets.is_empty());
        assert_eq!(instant_win_tickets(&table, 0, None), first);

        let credit = instant_win_tickets(&table, 1, Some(1));
        assert_eq!(credit.total, 15);
        assert_eq!(credit.total_pages, 1);
        assert!(credit.tickets.iter().all(|row| row.prize_index == 1));
    }
}
