use super::{Evaluation, SettlementOutcome, SharedContext, SkipReason};
use crate::{
    detail::TransactionDetail,
    error::{Result, SettlementError},
    storage::{ReceiptKind, SettlementReceipt},
};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
use solana_system_interface::instruction as system_instruction;

/// A qualifying derivative-token transfer into the treasury token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionRecord {
    /// Owner of the source token account; receives the lamports.
    pub redeemer: Pubkey,
    pub token_amount_received: u64,
    pub native_amount_to_return: u64,
}

/// Returns lamports for derivative tokens sent to the treasury token account.
#[derive(Clone)]
pub struct WithdrawalProcessor {
    ctx: SharedContext,
}

impl WithdrawalProcessor {
    pub(crate) fn new(ctx: SharedContext) -> Self {
        Self { ctx }
    }

    /// Derives the redemption from the first parsed token transfer.
    ///
    /// The caller must already have verified that the treasury token account
    /// exists.
    pub fn evaluate(&self, detail: &TransactionDetail) -> Result<Evaluation<RedemptionRecord>> {
        if detail.failed {
            return Ok(Evaluation::Skip(SkipReason::FailedTransaction));
        }

        let Some(transfer) = detail.token_transfers.first() else {
            return Ok(Evaluation::Skip(SkipReason::NoTokenTransfer));
        };

        let watched = &self.ctx.watched;
        if transfer.destination != watched.token_account {
            return Ok(Evaluation::Skip(SkipReason::ForeignDestination));
        }
        if transfer.mint.is_some_and(|mint| mint != watched.token_mint) {
            return Ok(Evaluation::Skip(SkipReason::ForeignMint));
        }

        let native_amount_to_return = self.ctx.rate.to_native(transfer.amount)?;
        if native_amount_to_return == 0 {
            return Ok(Evaluation::Skip(SkipReason::ZeroAmount));
        }

        Ok(Evaluation::Settle(RedemptionRecord {
            redeemer: transfer.authority,
            token_amount_received: transfer.amount,
            native_amount_to_return,
        }))
    }

    async fn ensure_treasury_token_account(&self) -> Result<()> {
        let token_account = self.ctx.watched.token_account;
        if self.ctx.ledger.account_exists(&token_account).await? {
            Ok(())
        } else {
            Err(SettlementError::TreasuryAccountMissing(token_account))
        }
    }

    pub fn refund_instructions(&self, record: &RedemptionRecord) -> Vec<Instruction> {
        vec![system_instruction::transfer(
            &self.ctx.submitter.payer(),
            &record.redeemer,
            record.native_amount_to_return,
        )]
    }

    pub async fn process(&self, signature: &Signature) -> Result<SettlementOutcome> {
        let detail = self.ctx.ledger.get_transaction_detail(signature).await?;
        if !detail.failed && !detail.token_transfers.is_empty() {
            self.ensure_treasury_token_account().await?;
        }

        let record = match self.evaluate(&detail)? {
            Evaluation::Settle(record) => record,
            Evaluation::Skip(reason) => {
                tracing::info!(%signature, ?reason, "Not a redemption, ignoring");
                return Ok(SettlementOutcome::Skipped(reason));
            }
        };

        tracing::info!(
            %signature,
            redeemer = %record.redeemer,
            tokens = record.token_amount_received,
            lamports = record.native_amount_to_return,
            "Redemption detected, returning lamports"
        );

        let instructions = self.refund_instructions(&record);
        let receipt = SettlementReceipt::claimed(
            signature,
            ReceiptKind::Refund,
            record.native_amount_to_return,
        );
        match self.ctx.submitter.submit(receipt, &instructions).await? {
            Some(refund_signature) => {
                tracing::info!(
                    %signature,
                    refund_signature = %refund_signature,
                    redeemer = %record.redeemer,
                    "Returned lamports"
                );
                Ok(SettlementOutcome::Refunded {
                    record,
                    signature: refund_signature,
                })
            }
            None => Ok(SettlementOutcome::Skipped(SkipReason::AlreadySettled)),
        }
    }
}
