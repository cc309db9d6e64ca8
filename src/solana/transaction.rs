//! Transaction building for funded flows.
//!
//! Every funded flow is a single native transfer from the wallet to the
//! recipient, optionally preceded by a compute unit price instruction so the
//! transfer lands under load. The wallet is the only signer and pays the fee.

use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::system_instruction;

pub use solana_sdk::transaction::Transaction;

use crate::solana::types::{Hash, Lamports, Pubkey};

/// Instructions moving `amount` from `payer` to `recipient`.
pub fn transfer_instructions(
    payer: &Pubkey,
    recipient: &Pubkey,
    amount: Lamports,
    priority_fee_micro_lamports: Option<u64>,
) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(2);
    if let Some(price) = priority_fee_micro_lamports {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(price));
    }
    instructions.push(system_instruction::transfer(payer, recipient, amount.0));
    instructions
}

/// An unsigned transfer with `payer` as fee payer and only signer.
pub fn unsigned_transfer(
    payer: &Pubkey,
    recipient: &Pubkey,
    amount: Lamports,
    priority_fee_micro_lamports: Option<u64>,
    recent_blockhash: Hash,
) -> Transaction {
    let instructions = transfer_instructions(payer, recipient, amount, priority_fee_micro_lamports);
    let message = Message::new_with_blockhash(&instructions, Some(payer), &recent_blockhash);
    Transaction::new_unsigned(message)
}

/// Fee payer of a compiled transaction.
pub fn fee_payer(tx: &Transaction) -> Option<&Pubkey> {
    tx.message.account_keys.first()
}
