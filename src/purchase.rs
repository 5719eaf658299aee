// Prize Competition Program - Purchase Orchestrator
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    allocator::{InstantWin, PrizeTable},
    error::CompetitionError,
    ledger::{Entry, Reservation, TicketLedger},
    state::{Competition, Credited, PaymentMethod, UserBalance},
};

/// A verified purchase request
#[derive(Debug, Clone, Copy)]
pub struct PurchaseRequest {
    pub buyer: Pubkey,
    pub quantity: u32,
    pub payment_method: PaymentMethod,
    pub now: UnixTimestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOutcome {
    pub entry: Entry,
    pub instant_wins: Vec<InstantWin>,
}

/// Total price of `quantity` tickets
pub fn total_cost(competition: &Competition, quantity: u32) -> Result<u64, CompetitionError> {
    competition
        .ticket_price
        .checked_mul(quantity as u64)
        .ok_or(CompetitionError::MathOverflow)
}

/// Reserve ticket numbers, record the entry and resolve instant wins.
///
/// Every precondition is checked before the first write, so a failed call
/// leaves the competition, ledger and prize table untouched. Payment is
/// settled by the caller inside the same transaction.
pub fn purchase<L, P>(
    competition: &mut Competition,
    ledger: &mut TicketLedger<L>,
    prize_table: Option<&mut PrizeTable<P>>,
    request: &PurchaseRequest,
) -> Result<PurchaseOutcome, ProgramError>
where
    L: AsRef<[u8]> + AsMut<[u8]>,
    P: AsRef<[u8]> + AsMut<[u8]>,
{
    if !competition.is_open(request.now) {
        return Err(CompetitionError::CompetitionClosed.into());
    }
    if request.quantity == 0 {
        return Err(CompetitionError::InvalidTicketQuantity.into());
    }
    if request.quantity > competition.remaining_tickets() {
        return Err(CompetitionError::CapacityExceeded.into());
    }
    if ledger.tickets_issued() != competition.tickets_sold {
        return Err(CompetitionError::AccountMismatch.into());
    }
    if ledger.len() >= ledger.capacity() {
        return Err(CompetitionError::LedgerFull.into());
    }
    let cost = total_cost(competition, request.quantity)?;
    let revenue = competition
        .revenue
        .checked_add(cost)
        .ok_or(CompetitionError::MathOverflow)?;

    let first_ticket = competition.tickets_sold + 1;
    let range = first_ticket..=competition.tickets_sold + request.quantity;

    let instant_wins = match prize_table {
        Some(table) if competition.has_instant_wins => {
            table.resolve(range, &request.buyer, request.now)?
        }
        _ => Vec::new(),
    };

    let entry = ledger.reserve(
        competition.max_tickets,
        &Reservation {
            user: request.buyer,
            quantity: request.quantity,
            total_cost: cost,
            payment_method: request.payment_method,
            purchased_at: request.now,
        },
    )?;

    competition.tickets_sold = ledger.tickets_issued();
    competition.live_tickets += request.quantity;
    competition.entry_count = ledger.len();
    competition.revenue = revenue;

    Ok(PurchaseOutcome {
        entry,
        instant_wins,
    })
}

/// Credit each instant win to the buyer's balance using its prize kind
pub fn apply_instant_wins(
    balance: &mut UserBalance,
    wins: &[InstantWin],
) -> Result<Vec<Credited>, CompetitionError> {
    wins.iter()
        .map(|win| win.kind.credit(balance, win.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::tests::pinned_table;
    use crate::state::{PaymentStatus, PrizeKind};

    fn competition(max_tickets: u32) -> Competition {
        Competition {
            is_initialized: true,
            index: 1,
            authority: Pubkey::new_unique(),
            title: [0u8; 32],
            ticket_price: 100,
            max_tickets,
            tickets_sold: 0,
            live_tickets: 0,
            start_time: 0,
            end_time: 1_000,
            is_active: true,
            prize_value: None,
            winner: None,
            draw_timestamp: None,
            winning_ticket: None,
            has_instant_wins: true,
            entry_count: 0,
            participant_count: 0,
            revenue: 0,
            ledger: Pubkey::new_unique(),
            prize_table: Pubkey::new_unique(),
            draw_commitment: [0u8; 32],
            bump: 255,
        }
    }

    fn ledger() -> TicketLedger<Vec<u8>> {
        TicketLedger::initialize(vec![0u8; TicketLedger::space(16)], &Pubkey::new_unique())
            .unwrap()
    }

    fn request(buyer: Pubkey, quantity: u32) -> PurchaseRequest {
        PurchaseRequest {
            buyer,
            quantity,
            payment_method: PaymentMethod::Lamports,
            now: 500,
        }
    }

    #[test]
    fn test_purchase_records_entry_and_instant_win() {
        let mut competition = competition(20);
        let mut ledger = ledger();
        let mut table = pinned_table(PrizeKind::Cash, 1_000, &[7]);
        let first = Pubkey::new_unique();
        let second = Pubkey::new_unique();

        let opening = purchase(&mut competition, &mut ledger, Some(&mut table), &request(first, 4))
            .unwrap();
        assert!(opening.instant_wins.is_empty());

        let outcome =
            purchase(&mut competition, &mut ledger, Some(&mut table), &request(second, 5)).unwrap();
        assert_eq!(outcome.entry.ticket_numbers(), 5..=9);
        assert_eq!(outcome.entry.total_cost, 500);
        assert_eq!(outcome.entry.payment_status, PaymentStatus::Paid);
        assert_eq!(outcome.instant_wins.len(), 1);
        assert_eq!(outcome.instant_wins[0].ticket, 7);
        assert_eq!(table.prize(0).unwrap().remaining_wins, 0);
        assert_eq!(table.lookup(7).unwrap().unwrap().winner, Some(second));

        assert_eq!(competition.tickets_sold, 9);
        assert_eq!(competition.live_tickets, 9);
        assert_eq!(competition.entry_count, 2);
        assert_eq!(competition.revenue, 900);
    }

    #[test]
    fn test_second_oversized_purchase_fails_with_capacity_exceeded() {
        let mut competition = competition(10);
        let mut ledger = ledger();

        purchase::<_, Vec<u8>>(&mut competition, &mut ledger, None, &request(Pubkey::new_unique(), 6))
            .unwrap();
        let before = competition;
        assert_eq!(
            purchase::<_, Vec<u8>>(
                &mut competition,
                &mut ledger,
                None,
                &request(Pubkey::new_unique(), 6)
            ),
            Err(CompetitionError::CapacityExceeded.into())
        );
        assert_eq!(competition, before);
        assert_eq!(competition.tickets_sold, 6);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_purchase_rejected_outside_window_or_inactive() {
        let mut competition = competition(10);
        let mut ledger = ledger();
        let mut late = request(Pubkey::new_unique(), 1);
        late.now = 1_000;
        assert_eq!(
            purchase::<_, Vec<u8>>(&mut competition, &mut ledger, None, &late),
            Err(CompetitionError::CompetitionClosed.into())
        );

        competition.is_active = false;
        assert_eq!(
            purchase::<_, Vec<u8>>(&mut competition, &mut ledger, None, &request(Pubkey::new_unique(), 1)),
            Err(CompetitionError::CompetitionClosed.into())
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_purchase_rejects_zero_quantity() {
        let mut competition = competition(10);
        let mut ledger = ledger();
        assert_eq!(
            purchase::<_, Vec<u8>>(&mut competition, &mut ledger, None, &request(Pubkey::new_unique(), 0)),
            Err(CompetitionError::InvalidTicketQuantity.into())
        );
    }

    #[test]
    fn test_claimed_rows_are_not_paid_twice() {
        let mut competition = competition(10);
        let mut ledger = ledger();
        let mut table = pinned_table(PrizeKind::Cash, 1, &[2, 3]);
        table.resolve(2..=3, &Pubkey::new_unique(), 0).unwrap();

        let outcome = purchase(
            &mut competition,
            &mut ledger,
            Some(&mut table),
            &request(Pubkey::new_unique(), 5),
        )
        .unwrap();
        assert!(outcome.instant_wins.is_empty());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_full_ledger_rejects_purchase_without_changes() {
        let mut competition = competition(10);
        let mut ledger =
            TicketLedger::initialize(vec![0u8; TicketLedger::space(1)], &Pubkey::new_unique())
                .unwrap();
        purchase::<_, Vec<u8>>(&mut competition, &mut ledger, None, &request(Pubkey::new_unique(), 2))
            .unwrap();
        let before = competition;
        assert_eq!(
            purchase::<_, Vec<u8>>(&mut competition, &mut ledger, None, &request(Pubkey::new_unique(), 2)),
            Err(CompetitionError::LedgerFull.into())
        );
        assert_eq!(competition, before);
    }

    #[test]
    fn test_instant_wins_credit_by_kind() {
        let mut balance = UserBalance::new(Pubkey::new_unique(), 255);
        let wins = vec![
            InstantWin {
                ticket: 3,
                prize_index: 0,
                name: [0u8; 32],
                kind: PrizeKind::Cash,
                value: 700,
            },
            InstantWin {
                ticket: 4,
                prize_index: 1,
                name: [0u8; 32],
                kind: PrizeKind::SiteCredit,
                value: 30,
            },
        ];
        let credits = apply_instant_wins(&mut balance, &wins).unwrap();
        assert_eq!(
            credits,
            vec![
                Credited::Withdrawable { balance_after: 700 },
                Credited::SiteCredit { balance_after: 30 },
            ]
        );
        assert_eq!(balance.withdrawable_cash, 700);
        assert_eq!(balance.site_credit, 30);
    }

    #[test]
    fn test_each_site_credit_win_snapshots_its_own_balance() {
        let mut balance = UserBalance::new(Pubkey::new_unique(), 255);
        let win = |ticket| InstantWin {
            ticket,
            prize_index: 0,
            name: [0u8; 32],
            kind: PrizeKind::SiteCredit,
            value: 7,
        };
        let credits = apply_instant_wins(&mut balance, &[win(1), win(2)]).unwrap();
        assert_eq!(
            credits,
            vec![
                Credited::SiteCredit { balance_after: 7 },
                Credited::SiteCredit { balance_after: 14 },
            ]
        );
        assert_eq!(balance.site_credit, 14);
    }
}
