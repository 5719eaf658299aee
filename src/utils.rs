// Prize Competition Program - Utility Functions
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::constants::{
    BALANCE_SEED, COMPETITION_SEED, CONFIG_SEED, DRAW_SEED, PARTICIPANT_SEED, RYDER_CASH_SEED,
    VAULT_SEED,
};

/// Find the program derived address of the global config
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Find the lamport vault holding ticket payments
pub fn find_vault_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED], program_id)
}

/// Find a program derived address for a competition
pub fn find_competition_address(program_id: &Pubkey, index: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[COMPETITION_SEED, &index.to_le_bytes()], program_id)
}

/// Find a user's balance account
pub fn find_balance_address(program_id: &Pubkey, user: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[BALANCE_SEED, user.as_ref()], program_id)
}

/// Find the `index`th Ryder Cash transaction of a user
pub fn find_ryder_cash_address(program_id: &Pubkey, user: &Pubkey, index: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[RYDER_CASH_SEED, user.as_ref(), &index.to_le_bytes()],
        program_id,
    )
}

/// Find the draw record of a competition
pub fn find_draw_address(program_id: &Pubkey, competition: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[DRAW_SEED, competition.as_ref()], program_id)
}

/// Find a user's participation marker in a competition
pub fn find_participant_address(
    program_id: &Pubkey,
    competition: &Pubkey,
    user: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[PARTICIPANT_SEED, competition.as_ref(), user.as_ref()],
        program_id,
    )
}

/// Check an account sits at the expected address
pub fn assert_address(info: &AccountInfo, expected: &Pubkey, name: &str) -> ProgramResult {
    if info.key != expected {
        msg!("Invalid {} account address", name);
        return Err(ProgramError::InvalidArgument);
    }
    Ok(())
}

/// Check an account is owned by this program
pub fn assert_owned_by(info: &AccountInfo, program_id: &Pubkey, name: &str) -> ProgramResult {
    if info.owner != program_id {
        msg!("{} account must be owned by this program", name);
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

pub fn assert_signer(info: &AccountInfo, name: &str) -> ProgramResult {
    if !info.is_signer {
        msg!("{} must sign the transaction", name);
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

/// Create a rent-exempt program-owned account at a PDA, paid by `payer`.
/// A PDA that already holds lamports is topped up to rent exemption, then
/// allocated and assigned in place.
pub fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    program_id: &Pubkey,
    space: usize,
    seeds: &[&[u8]],
) -> ProgramResult {
    let rent_lamports = Rent::get()?.minimum_balance(space);
    let current_lamports = new_account.lamports();

    if current_lamports == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                new_account.key,
                rent_lamports,
                space as u64,
                program_id,
            ),
            &[payer.clone(), new_account.clone(), system_program.clone()],
            &[seeds],
        );
    }

    msg!("Account {} is already funded, allocating in place", new_account.key);
    let top_up = rent_lamports.saturating_sub(current_lamports);
    if top_up > 0 {
        transfer_lamports(payer, new_account, system_program, top_up)?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account.key, space as u64),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(new_account.key, program_id),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )
}

/// Move lamports between system accounts, `from` signing the transaction
pub fn transfer_lamports<'a>(
    from: &AccountInfo<'a>,
    to: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    amount: u64,
) -> ProgramResult {
    invoke(
        &system_instruction::transfer(from.key, to.key, amount),
        &[from.clone(), to.clone(), system_program.clone()],
    )
}

/// Pad or truncate a title to its fixed on-chain width
pub fn title_bytes(title: &str) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    let len = std::cmp::min(title.len(), 32);
    bytes[..len].copy_from_slice(&title.as_bytes()[..len]);
    bytes
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_bytes_pads_and_truncates() {
        let short = title_bytes("Dream Car");
        assert_eq!(&short[..9], b"Dream Car");
        assert!(short[9..].iter().all(|b| *b == 0));

        let long = title_bytes("An extremely long competition title that overflows");
        assert_eq!(&long[..], &b"An extremely long competition title that overflows"[..32]);
    }

    #[test]
    fn test_competition_addresses_differ_by_index() {
        let program_id = Pubkey::new_unique();
        let (first, _) = find_competition_address(&program_id, 0);
        let (second, _) = find_competition_address(&program_id, 1);
        assert_ne!(first, second);
        assert_eq!(find_competition_address(&program_id, 1).0, second);
    }

    #[test]
    fn test_lamports_to_sol() {
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
    }
}
