// Prize Competition Program
// Paid-entry competitions with pre-assigned instant prizes and a fair grand prize draw

pub mod allocator;
pub mod constants;
pub mod draw;
pub mod error;
pub mod instruction;
pub mod ledger;
pub mod processor;
pub mod purchase;
pub mod random;
pub mod state;
pub mod stats;
pub mod utils;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
