// Prize Competition Program - Instructions
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::{
    allocator::InstantPrizeConfig,
    error::CompetitionError,
    state::PaymentMethod,
    utils::{
        find_balance_address, find_config_address, find_draw_address, find_participant_address,
        find_vault_address,
    },
};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum CompetitionInstruction {
    /// Initialize the global config and fund the vault
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin account, pays for the config account
    /// 1. `[writable]` The config account (PDA)
    /// 2. `[writable]` The vault (PDA)
    /// 3. `[]` The system program
    InitializeConfig,

    /// Hand the admin role to another key (admin only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` Current admin authority
    /// 1. `[]` New admin address
    /// 2. `[writable]` Config account
    UpdateAdmin,

    /// Create a competition bound to a pre-allocated ledger and prize table
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin, pays for the competition account
    /// 1. `[writable]` Config account
    /// 2. `[writable]` The competition account (PDA of the next index)
    /// 3. `[writable]` The ticket ledger account, program owned and zeroed
    /// 4. `[writable]` The prize table account, program owned and zeroed
    /// 5. `[]` The system program
    CreateCompetition {
        title: [u8; 32],
        /// Price per ticket in lamports
        ticket_price: u64,
        max_tickets: u32,
        start_time: i64,
        end_time: i64,
        prize_value: Option<u64>,
        /// sha256 of the secret revealed at draw time
        draw_commitment: [u8; 32],
    },

    /// Pre-assign instant prizes to ticket numbers, before any sale
    ///
    /// Accounts expected:
    /// 0. `[signer]` The admin authority
    /// 1. `[]` Config account
    /// 2. `[writable]` The competition account
    /// 3. `[writable]` The prize table account
    /// 4. `[]` The SlotHashes sysvar
    AssignInstantPrizes {
        prizes: Vec<InstantPrizeConfig>,
        /// Admin supplied entropy mixed with the latest slot hash
        entropy: [u8; 32],
    },

    /// Buy a block of tickets
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The buyer
    /// 1. `[writable]` The competition account
    /// 2. `[writable]` The ticket ledger account
    /// 3. `[writable]` The prize table account
    /// 4. `[writable]` The buyer's balance account (PDA, created on first use)
    /// 5. `[writable]` The buyer's participant account (PDA, created on first use)
    /// 6. `[writable]` The vault (PDA)
    /// 7. `[]` The system program
    /// 8.. `[writable]` Ryder Cash transaction accounts (PDAs) in creation order:
    ///     the site credit debit first when paying with site credit, then one
    ///     per site credit instant win in ticket order
    PurchaseTickets {
        quantity: u32,
        payment_method: PaymentMethod,
    },

    /// Stop sales early (admin only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` The admin authority
    /// 1. `[]` Config account
    /// 2. `[writable]` The competition account
    CloseCompetition,

    /// Reveal the draw secret and pick the grand prize winner
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin, pays for the draw record
    /// 1. `[]` Config account
    /// 2. `[writable]` The competition account
    /// 3. `[]` The ticket ledger account
    /// 4. `[writable]` The draw record account (PDA)
    /// 5. `[]` The SlotHashes sysvar
    /// 6. `[]` The system program
    DrawWinner { secret: [u8; 32] },

    /// Refund an entry to the buyer's balance and pull it from the draw
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The admin, pays for any account created
    /// 1. `[]` Config account
    /// 2. `[writable]` The competition account
    /// 3. `[writable]` The ticket ledger account
    /// 4. `[writable]` The buyer's balance account (PDA)
    /// 5. `[writable]` The buyer's participant account (PDA)
    /// 6. `[]` The system program
    /// 7. `[writable]` Ryder Cash transaction account, only for site credit entries
    RefundEntry { entry_index: u32 },

    /// Withdraw cash winnings and refunds from the vault
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The user
    /// 1. `[writable]` The user's balance account (PDA)
    /// 2. `[writable]` The vault (PDA)
    /// 3. `[]` The system program
    WithdrawCash { amount: u64 },
}

impl CompetitionInstruction {
    /// Unpacks a byte buffer into a CompetitionInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| CompetitionError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        Ok(self.try_to_vec()?)
    }
}

/// Create initialize_config instruction
pub fn initialize_config(program_id: &Pubkey, admin: &Pubkey) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::InitializeConfig.pack()?;

    let accounts = vec![
        AccountMeta::new(*admin, true),
        AccountMeta::new(find_config_address(program_id).0, false),
        AccountMeta::new(find_vault_address(program_id).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create update_admin instruction
pub fn update_admin(
    program_id: &Pubkey,
    admin: &Pubkey,
    new_admin: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::UpdateAdmin.pack()?;

    let accounts = vec![
        AccountMeta::new_readonly(*admin, true),
        AccountMeta::new_readonly(*new_admin, false),
        AccountMeta::new(find_config_address(program_id).0, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create create_competition instruction
#[allow(clippy::too_many_arguments)]
pub fn create_competition(
    program_id: &Pubkey,
    admin: &Pubkey,
    competition: &Pubkey,
    ledger: &Pubkey,
    prize_table: &Pubkey,
    title: [u8; 32],
    ticket_price: u64,
    max_tickets: u32,
    start_time: i64,
    end_time: i64,
    prize_value: Option<u64>,
    draw_commitment: [u8; 32],
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::CreateCompetition {
        title,
        ticket_price,
        max_tickets,
        start_time,
        end_time,
        prize_value,
        draw_commitment,
    }
    .pack()?;

    let accounts = vec![
        AccountMeta::new(*admin, true),
        AccountMeta::new(find_config_address(program_id).0, false),
        AccountMeta::new(*competition, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new(*prize_table, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create assign_instant_prizes instruction
pub fn assign_instant_prizes(
    program_id: &Pubkey,
    admin: &Pubkey,
    competition: &Pubkey,
    prize_table: &Pubkey,
    prizes: Vec<InstantPrizeConfig>,
    entropy: [u8; 32],
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::AssignInstantPrizes { prizes, entropy }.pack()?;

    let accounts = vec![
        AccountMeta::new_readonly(*admin, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(*competition, false),
        AccountMeta::new(*prize_table, false),
        AccountMeta::new_readonly(sysvar::slot_hashes::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create purchase_tickets instruction.
///
/// `ryder_cash_transactions` are the Ryder Cash records this purchase will
/// create, derived from the buyer's current transaction count.
#[allow(clippy::too_many_arguments)]
pub fn purchase_tickets(
    program_id: &Pubkey,
    buyer: &Pubkey,
    competition: &Pubkey,
    ledger: &Pubkey,
    prize_table: &Pubkey,
    quantity: u32,
    payment_method: PaymentMethod,
    ryder_cash_transactions: &[Pubkey],
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::PurchaseTickets {
        quantity,
        payment_method,
    }
    .pack()?;

    let mut accounts = vec![
        AccountMeta::new(*buyer, true),
        AccountMeta::new(*competition, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new(*prize_table, false),
        AccountMeta::new(find_balance_address(program_id, buyer).0, false),
        AccountMeta::new(find_participant_address(program_id, competition, buyer).0, false),
        AccountMeta::new(find_vault_address(program_id).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    accounts.extend(
        ryder_cash_transactions
            .iter()
            .map(|key| AccountMeta::new(*key, false)),
    );

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create close_competition instruction
pub fn close_competition(
    program_id: &Pubkey,
    admin: &Pubkey,
    competition: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::CloseCompetition.pack()?;

    let accounts = vec![
        AccountMeta::new_readonly(*admin, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(*competition, false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create draw_winner instruction
pub fn draw_winner(
    program_id: &Pubkey,
    admin: &Pubkey,
    competition: &Pubkey,
    ledger: &Pubkey,
    secret: [u8; 32],
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::DrawWinner { secret }.pack()?;

    let accounts = vec![
        AccountMeta::new(*admin, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(*competition, false),
        AccountMeta::new_readonly(*ledger, false),
        AccountMeta::new(find_draw_address(program_id, competition).0, false),
        AccountMeta::new_readonly(sysvar::slot_hashes::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create refund_entry instruction. `ryder_cash_transaction` is required
/// when the entry was paid with site credit.
pub fn refund_entry(
    program_id: &Pubkey,
    admin: &Pubkey,
    competition: &Pubkey,
    ledger: &Pubkey,
    buyer: &Pubkey,
    entry_index: u32,
    ryder_cash_transaction: Option<&Pubkey>,
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::RefundEntry { entry_index }.pack()?;

    let mut accounts = vec![
        AccountMeta::new(*admin, true),
        AccountMeta::new_readonly(find_config_address(program_id).0, false),
        AccountMeta::new(*competition, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new(find_balance_address(program_id, buyer).0, false),
        AccountMeta::new(find_participant_address(program_id, competition, buyer).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    if let Some(key) = ryder_cash_transaction {
        accounts.push(AccountMeta::new(*key, false));
    }

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create withdraw_cash instruction
pub fn withdraw_cash(
    program_id: &Pubkey,
    user: &Pubkey,
    amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = CompetitionInstruction::WithdrawCash { amount }.pack()?;

    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(find_balance_address(program_id, user).0, false),
        AccountMeta::new(find_vault_address(program_id).0, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PrizeKind;

    #[test]
    fn test_unpack_rejects_garbage() {
        assert_eq!(
            CompetitionInstruction::unpack(&[200, 1, 2]),
            Err(CompetitionError::InvalidInstruction.into())
        );
        assert_eq!(
            CompetitionInstruction::unpack(&[]),
            Err(CompetitionError::InvalidInstruction.into())
        );
    }

    #[test]
    fn test_assign_instant_prizes_data_decodes() {
        let program_id = Pubkey::new_unique();
        let prizes = vec![InstantPrizeConfig {
            name: [1u8; 32],
            kind: PrizeKind::SiteCredit,
            value: 500,
            total_wins: 10,
        }];
        let ix = assign_instant_prizes(
            &program_id,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            prizes.clone(),
            [9u8; 32],
        )
        .unwrap();
        assert_eq!(
            CompetitionInstruction::unpack(&ix.data).unwrap(),
            CompetitionInstruction::AssignInstantPrizes {
                prizes,
                entropy: [9u8; 32]
            }
        );
        assert_eq!(ix.accounts[4].pubkey, sysvar::slot_hashes::id());
    }

    #[test]
    fn test_purchase_appends_ryder_cash_accounts() {
        let program_id = Pubkey::new_unique();
        let extra = [Pubkey::new_unique(), Pubkey::new_unique()];
        let ix = purchase_tickets(
            &program_id,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            3,
            PaymentMethod::SiteCredit,
            &extra,
        )
        .unwrap();
        assert_eq!(ix.accounts.len(), 10);
        assert_eq!(ix.accounts[8].pubkey, extra[0]);
        assert!(ix.accounts[9].is_writable);
    }
}
