// Prize Competition Program - Instruction Processor
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::{Clock, UnixTimestamp},
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    allocator::{InstantPrizeConfig, PrizeTable},
    constants::{
        BALANCE_SEED, COMPETITION_SEED, CONFIG_SEED, DRAW_SEED, PARTICIPANT_SEED, RYDER_CASH_SEED,
        VAULT_SEED,
    },
    draw,
    error::CompetitionError,
    instruction::CompetitionInstruction,
    ledger::TicketLedger,
    purchase::{self, PurchaseRequest},
    random::{self, HashChainRng},
    state::{
        Competition, Config, Credited, DrawRecord, Participant, PaymentMethod, RyderCashTransaction,
        TransactionDirection, TransactionReason, UserBalance,
    },
    utils::{
        assert_address, assert_owned_by, assert_signer, create_pda_account,
        find_balance_address, find_competition_address, find_config_address, find_draw_address,
        find_participant_address, find_ryder_cash_address, find_vault_address, lamports_to_sol,
        transfer_lamports,
    },
};

/// Program state handler.
pub struct Processor {}

impl Processor {
    /// Process a Prize Competition instruction
    pub fn process(program_id: &Pubkey, accounts: &[AccountInfo], instruction_data: &[u8]) -> ProgramResult {
        let instruction = CompetitionInstruction::unpack(instruction_data)?;

        match instruction {
            CompetitionInstruction::InitializeConfig => {
                msg!("Instruction: Initialize Config");
                Self::process_initialize_config(program_id, accounts)
            }
            CompetitionInstruction::UpdateAdmin => {
                msg!("Instruction: Update Admin");
                Self::process_update_admin(program_id, accounts)
            }
            CompetitionInstruction::CreateCompetition {
                title,
                ticket_price,
                max_tickets,
                start_time,
                end_time,
                prize_value,
                draw_commitment,
            } => {
                msg!("Instruction: Create Competition");
                Self::process_create_competition(
                    program_id,
                    accounts,
                    title,
                    ticket_price,
                    max_tickets,
                    start_time,
                    end_time,
                    prize_value,
                    draw_commitment,
                )
            }
            CompetitionInstruction::AssignInstantPrizes { prizes, entropy } => {
                msg!("Instruction: Assign Instant Prizes");
                Self::process_assign_instant_prizes(program_id, accounts, &prizes, entropy)
            }
            CompetitionInstruction::PurchaseTickets {
                quantity,
                payment_method,
            } => {
                msg!("Instruction: Purchase Tickets");
                Self::process_purchase_tickets(program_id, accounts, quantity, payment_method)
            }
            CompetitionInstruction::CloseCompetition => {
                msg!("Instruction: Close Competition");
                Self::process_close_competition(program_id, accounts)
            }
            CompetitionInstruction::DrawWinner { secret } => {
                msg!("Instruction: Draw Winner");
                Self::process_draw_winner(program_id, accounts, secret)
            }
            CompetitionInstruction::RefundEntry { entry_index } => {
                msg!("Instruction: Refund Entry");
                Self::process_refund_entry(program_id, accounts, entry_index)
            }
            CompetitionInstruction::WithdrawCash { amount } => {
                msg!("Instruction: Withdraw Cash");
                Self::process_withdraw_cash(program_id, accounts, amount)
            }
        }
    }

    /// Process the InitializeConfig instruction
    ///
    /// Creates the config account and tops the vault up to its rent-exempt minimum
    fn process_initialize_config(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(admin_info, "Admin")?;

        let (expected_config, config_bump) = find_config_address(program_id);
        assert_address(config_info, &expected_config, "config")?;
        let (expected_vault, vault_bump) = find_vault_address(program_id);
        assert_address(vault_info, &expected_vault, "vault")?;

        if config_info.owner == program_id {
            msg!("Config account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }
        create_pda_account(
            admin_info,
            config_info,
            system_program_info,
            program_id,
            Config::LEN,
            &[CONFIG_SEED, &[config_bump]],
        )?;

        let vault_minimum = Rent::get()?.minimum_balance(0);
        if vault_info.lamports() < vault_minimum {
            transfer_lamports(
                admin_info,
                vault_info,
                system_program_info,
                vault_minimum - vault_info.lamports(),
            )?;
        }

        let config = Config {
            is_initialized: true,
            admin: *admin_info.key,
            vault_bump,
            next_competition_index: 0,
        };
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        msg!("Config initialized: Admin={}, Vault={}", admin_info.key, vault_info.key);
        Ok(())
    }

    fn process_update_admin(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let new_admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;

        let mut config = Self::load_config(program_id, config_info)?;
        Self::assert_admin(&config, admin_info)?;

        config.admin = *new_admin_info.key;
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        msg!("Admin updated to {}", new_admin_info.key);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_create_competition(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        title: [u8; 32],
        ticket_price: u64,
        max_tickets: u32,
        start_time: i64,
        end_time: i64,
        prize_value: Option<u64>,
        draw_commitment: [u8; 32],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let competition_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let prize_table_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        let mut config = Self::load_config(program_id, config_info)?;
        Self::assert_admin(&config, admin_info)?;

        if max_tickets == 0 || end_time <= start_time {
            msg!("Competition needs tickets and an end time after its start time");
            return Err(CompetitionError::InvalidCompetitionParameters.into());
        }

        let index = config.next_competition_index;
        let (expected_competition, bump) = find_competition_address(program_id, index);
        assert_address(competition_info, &expected_competition, "competition")?;

        if ledger_info.key == prize_table_info.key {
            msg!("Ledger and prize table must be separate accounts");
            return Err(ProgramError::InvalidArgument);
        }
        assert_owned_by(ledger_info, program_id, "Ledger")?;
        assert_owned_by(prize_table_info, program_id, "Prize table")?;

        create_pda_account(
            admin_info,
            competition_info,
            system_program_info,
            program_id,
            Competition::LEN,
            &[COMPETITION_SEED, &index.to_le_bytes(), &[bump]],
        )?;

        let ledger_capacity = {
            let mut ledger_data = ledger_info.try_borrow_mut_data()?;
            let ledger = TicketLedger::initialize(&mut **ledger_data, competition_info.key)?;
            ledger.capacity()
        };
        let win_capacity = {
            let mut table_data = prize_table_info.try_borrow_mut_data()?;
            let table = PrizeTable::initialize(&mut **table_data, competition_info.key)?;
            table.win_capacity()
        };

        let competition = Competition {
            is_initialized: true,
            index,
            authority: *admin_info.key,
            title,
            ticket_price,
            max_tickets,
            tickets_sold: 0,
            live_tickets: 0,
            start_time,
            end_time,
            is_active: true,
            prize_value,
            winner: None,
            draw_timestamp: None,
            winning_ticket: None,
            has_instant_wins: false,
            entry_count: 0,
            participant_count: 0,
            revenue: 0,
            ledger: *ledger_info.key,
            prize_table: *prize_table_info.key,
            draw_commitment,
            bump,
        };
        Competition::pack(competition, &mut competition_info.data.borrow_mut())?;

        config.next_competition_index = index
            .checked_add(1)
            .ok_or(CompetitionError::MathOverflow)?;
        Config::pack(config, &mut config_info.data.borrow_mut())?;

        msg!(
            "Competition {} created: MaxTickets={}, TicketPrice={} SOL, LedgerCapacity={}, WinCapacity={}",
            index,
            max_tickets,
            lamports_to_sol(ticket_price),
            ledger_capacity,
            win_capacity
        );
        Ok(())
    }

    fn process_assign_instant_prizes(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        prizes: &[InstantPrizeConfig],
        entropy: [u8; 32],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let competition_info = next_account_info(account_info_iter)?;
        let prize_table_info = next_account_info(account_info_iter)?;
        let slot_hashes_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(program_id, config_info)?;
        Self::assert_admin(&config, admin_info)?;

        let mut competition = Self::load_competition(program_id, competition_info)?;
        Self::assert_bound(prize_table_info, &competition.prize_table, "prize table")?;

        if competition.winner.is_some() {
            return Err(CompetitionError::AlreadyDrawn.into());
        }
        if competition.has_instant_wins {
            msg!("Instant prizes were already assigned");
            return Err(CompetitionError::InstantPrizesAlreadyAssigned.into());
        }
        if competition.tickets_sold > 0 {
            msg!("Instant prizes must be assigned before the first sale");
            return Err(CompetitionError::SalesAlreadyStarted.into());
        }

        let clock = Clock::get()?;
        let slot_hash = random::latest_slot_hash(slot_hashes_info)?;
        let seed = random::assignment_seed(&entropy, competition_info.key, clock.slot, slot_hash);
        let mut rng = HashChainRng::new(seed);

        let assigned = {
            let mut table_data = prize_table_info.try_borrow_mut_data()?;
            let mut table = PrizeTable::load(&mut **table_data)?;
            let assigned = table.assign_instant_prizes(&mut rng, competition.max_tickets, prizes)?;
            assigned
        };

        competition.has_instant_wins = true;
        Competition::pack(competition, &mut competition_info.data.borrow_mut())?;

        msg!(
            "Assigned {} instant winning tickets across {} prizes",
            assigned,
            prizes.len()
        );
        Ok(())
    }

    fn process_purchase_tickets(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        quantity: u32,
        payment_method: PaymentMethod,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let buyer_info = next_account_info(account_info_iter)?;
        let competition_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let prize_table_info = next_account_info(account_info_iter)?;
        let balance_info = next_account_info(account_info_iter)?;
        let participant_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(buyer_info, "Buyer")?;
        let mut competition = Self::load_competition(program_id, competition_info)?;
        Self::assert_bound(ledger_info, &competition.ledger, "ledger")?;
        Self::assert_bound(prize_table_info, &competition.prize_table, "prize table")?;
        assert_address(vault_info, &find_vault_address(program_id).0, "vault")?;

        let now = Clock::get()?.unix_timestamp;
        if !competition.is_open(now) {
            return Err(purchase_failed(CompetitionError::CompetitionClosed));
        }
        let total_cost = purchase::total_cost(&competition, quantity).map_err(purchase_failed)?;

        let mut balance = Self::load_or_create_balance(
            program_id,
            buyer_info,
            balance_info,
            buyer_info.key,
            system_program_info,
        )?;
        let mut participant = Self::load_or_create_participant(
            program_id,
            buyer_info,
            participant_info,
            competition_info.key,
            system_program_info,
        )?;

        match payment_method {
            PaymentMethod::Lamports => {
                if buyer_info.lamports() < total_cost {
                    return Err(purchase_failed(CompetitionError::PurchaseFailed));
                }
                if total_cost > 0 {
                    transfer_lamports(buyer_info, vault_info, system_program_info, total_cost)?;
                }
            }
            PaymentMethod::SiteCredit => {
                balance
                    .debit_site_credit(total_cost)
                    .map_err(purchase_failed)?;
                let transaction_info = next_account_info(account_info_iter)
                    .map_err(|_| purchase_failed(CompetitionError::PurchaseFailed))?;
                let balance_after = balance.site_credit;
                Self::record_ryder_cash(
                    program_id,
                    buyer_info,
                    transaction_info,
                    system_program_info,
                    &mut balance,
                    TransactionDirection::Debit,
                    total_cost,
                    balance_after,
                    TransactionReason::TicketPurchase,
                    competition_info.key,
                    now,
                )?;
            }
        }

        let request = PurchaseRequest {
            buyer: *buyer_info.key,
            quantity,
            payment_method,
            now,
        };
        let outcome = {
            let mut ledger_data = ledger_info.try_borrow_mut_data()?;
            let mut table_data = prize_table_info.try_borrow_mut_data()?;
            let mut ledger = TicketLedger::load(&mut **ledger_data)?;
            let mut table = PrizeTable::load(&mut **table_data)?;
            let outcome =
                purchase::purchase(&mut competition, &mut ledger, Some(&mut table), &request)
                    .map_err(purchase_failed)?;
            outcome
        };

        let credits = purchase::apply_instant_wins(&mut balance, &outcome.instant_wins)?;
        for (win, credited) in outcome.instant_wins.iter().zip(credits) {
            msg!(
                "Instant win: ticket {} won prize {} worth {}",
                win.ticket,
                win.prize_index,
                win.value
            );
            if let Credited::SiteCredit { balance_after } = credited {
                let transaction_info = next_account_info(account_info_iter)
                    .map_err(|_| purchase_failed(CompetitionError::PurchaseFailed))?;
                Self::record_ryder_cash(
                    program_id,
                    buyer_info,
                    transaction_info,
                    system_program_info,
                    &mut balance,
                    TransactionDirection::Credit,
                    win.value,
                    balance_after,
                    TransactionReason::InstantWin,
                    competition_info.key,
                    now,
                )?;
            }
        }

        if participant.add_entry(quantity)? {
            competition.participant_count = competition
                .participant_count
                .checked_add(1)
                .ok_or(CompetitionError::MathOverflow)?;
        }

        save_borsh(&participant, participant_info)?;
        save_borsh(&balance, balance_info)?;
        Competition::pack(competition, &mut competition_info.data.borrow_mut())?;

        msg!(
            "Purchased tickets {}-{} for {} lamports, {} instant wins",
            outcome.entry.first_ticket,
            outcome.entry.last_ticket(),
            total_cost,
            outcome.instant_wins.len()
        );
        Ok(())
    }

    fn process_close_competition(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let competition_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(program_id, config_info)?;
        Self::assert_admin(&config, admin_info)?;

        let mut competition = Self::load_competition(program_id, competition_info)?;
        if competition.winner.is_some() {
            return Err(CompetitionError::AlreadyDrawn.into());
        }
        competition.is_active = false;
        Competition::pack(competition, &mut competition_info.data.borrow_mut())?;

        msg!("Competition {} closed with {} tickets sold", competition.index, competition.tickets_sold);
        Ok(())
    }

    fn process_draw_winner(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        secret: [u8; 32],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let competition_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let draw_info = next_account_info(account_info_iter)?;
        let slot_hashes_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(program_id, config_info)?;
        Self::assert_admin(&config, admin_info)?;

        let mut competition = Self::load_competition(program_id, competition_info)?;
        Self::assert_bound(ledger_info, &competition.ledger, "ledger")?;
        let (expected_draw, draw_bump) = find_draw_address(program_id, competition_info.key);
        assert_address(draw_info, &expected_draw, "draw record")?;

        if competition.winner.is_some() || draw_info.owner == program_id {
            msg!("Competition has already been drawn");
            return Err(CompetitionError::AlreadyDrawn.into());
        }
        random::verify_reveal(&competition.draw_commitment, &secret)?;

        let clock = Clock::get()?;
        let slot_hash = random::latest_slot_hash(slot_hashes_info)?;
        let seed = random::draw_seed(
            &secret,
            competition_info.key,
            competition.live_tickets,
            slot_hash,
        );
        let mut rng = HashChainRng::new(seed);

        let record = {
            let ledger_data = ledger_info.try_borrow_data()?;
            let ledger = TicketLedger::load(&**ledger_data)?;
            let record = draw::draw_winner(
                &mut competition,
                competition_info.key,
                &ledger,
                &mut rng,
                seed,
                clock.unix_timestamp,
            )?;
            record
        };

        create_pda_account(
            admin_info,
            draw_info,
            system_program_info,
            program_id,
            DrawRecord::LEN,
            &[DRAW_SEED, competition_info.key.as_ref(), &[draw_bump]],
        )?;
        save_borsh(&record, draw_info)?;
        Competition::pack(competition, &mut competition_info.data.borrow_mut())?;

        msg!(
            "Winner drawn: ticket {} of {} held by {}",
            record.winning_ticket,
            record.total_tickets,
            record.winner
        );
        Ok(())
    }

    fn process_refund_entry(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        entry_index: u32,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let admin_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let competition_info = next_account_info(account_info_iter)?;
        let ledger_info = next_account_info(account_info_iter)?;
        let balance_info = next_account_info(account_info_iter)?;
        let participant_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        let config = Self::load_config(program_id, config_info)?;
        Self::assert_admin(&config, admin_info)?;

        let mut competition = Self::load_competition(program_id, competition_info)?;
        Self::assert_bound(ledger_info, &competition.ledger, "ledger")?;
        if competition.winner.is_some() {
            msg!("Entries cannot be refunded after the draw");
            return Err(CompetitionError::AlreadyDrawn.into());
        }

        let entry = {
            let mut ledger_data = ledger_info.try_borrow_mut_data()?;
            let mut ledger = TicketLedger::load(&mut **ledger_data)?;
            let entry = ledger.void(entry_index)?;
            entry
        };
        competition.live_tickets = competition
            .live_tickets
            .checked_sub(entry.quantity)
            .ok_or(CompetitionError::MathOverflow)?;
        competition.revenue = competition
            .revenue
            .checked_sub(entry.total_cost)
            .ok_or(CompetitionError::MathOverflow)?;

        assert_owned_by(participant_info, program_id, "Participant")?;
        assert_address(
            participant_info,
            &find_participant_address(program_id, competition_info.key, &entry.user).0,
            "participant",
        )?;
        let mut participant = Participant::try_from_slice(&participant_info.data.borrow())?;
        if participant.remove_entry(entry.quantity)? {
            competition.participant_count = competition
                .participant_count
                .checked_sub(1)
                .ok_or(CompetitionError::MathOverflow)?;
        }

        let mut balance = Self::load_or_create_balance(
            program_id,
            admin_info,
            balance_info,
            &entry.user,
            system_program_info,
        )?;
        match entry.payment_method {
            PaymentMethod::Lamports => {
                balance.withdrawable_cash = balance
                    .withdrawable_cash
                    .checked_add(entry.total_cost)
                    .ok_or(CompetitionError::MathOverflow)?;
            }
            PaymentMethod::SiteCredit => {
                balance.site_credit = balance
                    .site_credit
                    .checked_add(entry.total_cost)
                    .ok_or(CompetitionError::MathOverflow)?;
                let transaction_info = next_account_info(account_info_iter)?;
                let balance_after = balance.site_credit;
                Self::record_ryder_cash(
                    program_id,
                    admin_info,
                    transaction_info,
                    system_program_info,
                    &mut balance,
                    TransactionDirection::Credit,
                    entry.total_cost,
                    balance_after,
                    TransactionReason::Refund,
                    competition_info.key,
                    Clock::get()?.unix_timestamp,
                )?;
            }
        }

        save_borsh(&participant, participant_info)?;
        save_borsh(&balance, balance_info)?;
        Competition::pack(competition, &mut competition_info.data.borrow_mut())?;

        msg!(
            "Refunded entry {} (tickets {}-{}) for {} lamports",
            entry.index,
            entry.first_ticket,
            entry.last_ticket(),
            entry.total_cost
        );
        Ok(())
    }

    fn process_withdraw_cash(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let user_info = next_account_info(account_info_iter)?;
        let balance_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        assert_signer(user_info, "User")?;
        assert_owned_by(balance_info, program_id, "Balance")?;
        assert_address(
            balance_info,
            &find_balance_address(program_id, user_info.key).0,
            "balance",
        )?;
        let (expected_vault, vault_bump) = find_vault_address(program_id);
        assert_address(vault_info, &expected_vault, "vault")?;

        let mut balance = UserBalance::try_from_slice(&balance_info.data.borrow())?;
        if balance.owner != *user_info.key {
            return Err(CompetitionError::NotAuthorized.into());
        }
        balance.debit_cash(amount)?;

        let vault_minimum = Rent::get()?.minimum_balance(0);
        if vault_info.lamports() < amount.saturating_add(vault_minimum) {
            msg!("Vault cannot cover {} lamports", amount);
            return Err(CompetitionError::VaultInsufficientFunds.into());
        }
        invoke_signed(
            &system_instruction::transfer(vault_info.key, user_info.key, amount),
            &[
                vault_info.clone(),
                user_info.clone(),
                system_program_info.clone(),
            ],
            &[&[VAULT_SEED, &[vault_bump]]],
        )?;

        save_borsh(&balance, balance_info)?;

        msg!("Withdrew {} SOL to {}", lamports_to_sol(amount), user_info.key);
        Ok(())
    }

    fn load_config(program_id: &Pubkey, config_info: &AccountInfo) -> Result<Config, ProgramError> {
        assert_owned_by(config_info, program_id, "Config")?;
        assert_address(config_info, &find_config_address(program_id).0, "config")?;
        Config::unpack(&config_info.data.borrow())
    }

    fn assert_admin(config: &Config, admin_info: &AccountInfo) -> ProgramResult {
        assert_signer(admin_info, "Admin")?;
        if config.admin != *admin_info.key {
            msg!("Only the admin can perform this action");
            return Err(CompetitionError::NotAuthorized.into());
        }
        Ok(())
    }

    fn load_competition(
        program_id: &Pubkey,
        competition_info: &AccountInfo,
    ) -> Result<Competition, ProgramError> {
        assert_owned_by(competition_info, program_id, "Competition")?;
        let competition = Competition::unpack(&competition_info.data.borrow())?;
        let expected = Pubkey::create_program_address(
            &[
                COMPETITION_SEED,
                &competition.index.to_le_bytes(),
                &[competition.bump],
            ],
            program_id,
        )
        .map_err(|_| ProgramError::InvalidSeeds)?;
        assert_address(competition_info, &expected, "competition")?;
        Ok(competition)
    }

    /// Check an account is the one recorded on the competition
    fn assert_bound(info: &AccountInfo, expected: &Pubkey, name: &str) -> ProgramResult {
        if info.key != expected {
            msg!("The {} account does not belong to this competition", name);
            return Err(CompetitionError::AccountMismatch.into());
        }
        Ok(())
    }

    /// Load a user's balance, creating it on first use
    fn load_or_create_balance<'a>(
        program_id: &Pubkey,
        payer_info: &AccountInfo<'a>,
        balance_info: &AccountInfo<'a>,
        owner: &Pubkey,
        system_program_info: &AccountInfo<'a>,
    ) -> Result<UserBalance, ProgramError> {
        let (expected, bump) = find_balance_address(program_id, owner);
        assert_address(balance_info, &expected, "balance")?;

        if balance_info.owner == program_id {
            let balance = UserBalance::try_from_slice(&balance_info.data.borrow())?;
            if balance.owner != *owner {
                return Err(CompetitionError::AccountMismatch.into());
            }
            return Ok(balance);
        }
        create_pda_account(
            payer_info,
            balance_info,
            system_program_info,
            program_id,
            UserBalance::LEN,
            &[BALANCE_SEED, owner.as_ref(), &[bump]],
        )?;
        Ok(UserBalance::new(*owner, bump))
    }

    /// Load the buyer's participant marker, creating it on first entry
    fn load_or_create_participant<'a>(
        program_id: &Pubkey,
        buyer_info: &AccountInfo<'a>,
        participant_info: &AccountInfo<'a>,
        competition: &Pubkey,
        system_program_info: &AccountInfo<'a>,
    ) -> Result<Participant, ProgramError> {
        let (expected, bump) = find_participant_address(program_id, competition, buyer_info.key);
        assert_address(participant_info, &expected, "participant")?;

        if participant_info.owner == program_id {
            let participant = Participant::try_from_slice(&participant_info.data.borrow())?;
            return Ok(participant);
        }
        create_pda_account(
            buyer_info,
            participant_info,
            system_program_info,
            program_id,
            Participant::LEN,
            &[
                PARTICIPANT_SEED,
                competition.as_ref(),
                buyer_info.key.as_ref(),
                &[bump],
            ],
        )?;
        Ok(Participant {
            is_initialized: true,
            competition: *competition,
            user: *buyer_info.key,
            tickets: 0,
            entries: 0,
        })
    }

    /// Persist a Ryder Cash movement at the user's next transaction index,
    /// snapshotting `balance_after` as the site credit right after it.
    #[allow(clippy::too_many_arguments)]
    fn record_ryder_cash<'a>(
        program_id: &Pubkey,
        payer_info: &AccountInfo<'a>,
        transaction_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        balance: &mut UserBalance,
        direction: TransactionDirection,
        amount: u64,
        balance_after: u64,
        reason: TransactionReason,
        competition: &Pubkey,
        now: UnixTimestamp,
    ) -> ProgramResult {
        let index = balance.transaction_count;
        let (expected, bump) = find_ryder_cash_address(program_id, &balance.owner, index);
        assert_address(transaction_info, &expected, "Ryder Cash transaction")?;

        create_pda_account(
            payer_info,
            transaction_info,
            system_program_info,
            program_id,
            RyderCashTransaction::LEN,
            &[
                RYDER_CASH_SEED,
                balance.owner.as_ref(),
                &index.to_le_bytes(),
                &[bump],
            ],
        )?;
        let transaction = RyderCashTransaction {
            is_initialized: true,
            user: balance.owner,
            index,
            direction,
            amount,
            balance_after,
            reason,
            competition: *competition,
            created_at: now,
        };
        save_borsh(&transaction, transaction_info)?;

        balance.transaction_count += 1;
        Ok(())
    }
}

fn purchase_failed<E: Into<ProgramError>>(err: E) -> ProgramError {
    let err = err.into();
    msg!("Purchase failed: {}", err);
    err
}

fn save_borsh<T: BorshSerialize>(value: &T, info: &AccountInfo) -> ProgramResult {
    value.serialize(&mut &mut info.data.borrow_mut()[..])?;
    Ok(())
}
