// Prize Competition Program - Entrypoint
use solana_program::{
    account_info::AccountInfo, entrypoint, entrypoint::ProgramResult, msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::CompetitionError;

entrypoint!(process_instruction);

fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    if let Err(error) = crate::process_instruction(program_id, accounts, instruction_data) {
        match error {
            ProgramError::Custom(code) => match CompetitionError::from_code(code) {
                Some(competition_error) => msg!("Error: {}", competition_error),
                None => msg!("Instruction failed: {}", error),
            },
            _ => msg!("Instruction failed: {}", error),
        }
        return Err(error);
    }
    Ok(())
}
