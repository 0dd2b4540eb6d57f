use super::{Evaluation, SettlementOutcome, SharedContext, SkipReason};
use crate::{
    detail::TransactionDetail,
    error::{Result, SettlementError},
    storage::{ReceiptKind, SettlementReceipt},
};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use spl_associated_token_account_client::{
    address::get_associated_token_address,
    instruction::create_associated_token_account_idempotent,
};

/// A qualifying lamport deposit into the treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRecord {
    /// The fee payer of the origin transaction.
    pub depositor: Pubkey,
    pub native_amount_received: u64,
    pub token_amount_to_mint: u64,
}

/// Mints derivative tokens for lamports received by the treasury.
#[derive(Clone)]
pub struct DepositProcessor {
    ctx: SharedContext,
}

impl DepositProcessor {
    pub(crate) fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }

    /// Derives the deposit from a transaction's balance snapshot.
    pub fn evaluate(&self, detail: &TransactionDetail) -> Result<Evaluation<DepositRecord>> {
        if detail.failed {
            return Ok(Evaluation::Skip(SkipReason::FailedTransaction));
        }

        let treasury = self.ctx.watched.address;
        let delta = detail
            .lamport_delta(&treasury)
            .ok_or(SettlementError::AccountNotFound(treasury))?;
        if delta <= 0 {
            return Ok(Evaluation::Skip(SkipReason::NonPositiveDelta));
        }

        let native_amount_received = u64::try_from(delta)
            .map_err(|_| SettlementError::InvalidAmount(format!("delta {delta} exceeds u64")))?;
        let depositor = detail.fee_payer().ok_or_else(|| {
            SettlementError::MalformedTransaction(format!("{} has no accounts", detail.signature))
        })?;
        let token_amount_to_mint = self.ctx.rate.to_token(native_amount_received)?;
        if token_amount_to_mint == 0 {
            return Ok(Evaluation::Skip(SkipReason::ZeroAmount));
        }

        Ok(Evaluation::Settle(DepositRecord {
            depositor,
            native_amount_received,
            token_amount_to_mint,
        }))
    }

    /// Builds the instructions that create the depositor's token account if
    /// needed and mint the record's amount into it.
    pub fn mint_instructions(&self, record: &DepositRecord) -> Result<Vec<Instruction>> {
        let watched = &self.ctx.watched;
        let authority = self.ctx.submitter.payer();
        let token_program = spl_token::id();
        let destination = get_associated_token_address(&record.depositor, &watched.token_mint);

        let create_account = create_associated_token_account_idempotent(
            &authority,
            &record.depositor,
            &watched.token_mint,
            &token_program,
        );
        let mint = spl_token::instruction::mint_to(
            &token_program,
            &watched.token_mint,
            &destination,
            &authority,
            &[],
            record.token_amount_to_mint,
        )
        .map_err(|e| SettlementError::InstructionBuild(e.to_string()))?;

        Ok(vec![create_account, mint])
    }

    pub async fn process(&self, signature: &Signature) -> Result<SettlementOutcome> {
        let detail = self.ctx.ledger.get_transaction_detail(signature).await?;
        let record = match self.evaluate(&detail)? {
            Evaluation::Settle(record) => record,
            Evaluation::Skip(reason) => {
                tracing::info!(%signature, ?reason, "Not a deposit, ignoring");
                return Ok(SettlementOutcome::Skipped(reason));
            }
        };

        tracing::info!(
            %signature,
            depositor = %record.depositor,
            lamports = record.native_amount_received,
            tokens = record.token_amount_to_mint,
            "Deposit detected, minting"
        );

        let instructions = self.mint_instructions(&record)?;
        let receipt =
            SettlementReceipt::claimed(signature, ReceiptKind::Mint, record.token_amount_to_mint);
        match self.ctx.submitter.submit(receipt, &instructions).await? {
            Some(mint_signature) => {
                tracing::info!(
                    %signature,
                    mint_signature = %mint_signature,
                    depositor = %record.depositor,
                    "Minted derivative tokens"
                );
                Ok(SettlementOutcome::Minted {
                    record,
                    signature: mint_signature,
                })
            }
            None => Ok(SettlementOutcome::Skipped(SkipReason::AlreadySettled)),
        }
    }
}
