//! Decoding of `getTransaction` responses (`jsonParsed` encoding) into the
//! few facts the processors need: balances per account and parsed SPL token
//! transfers.

use crate::error::{Result, SettlementError};
use serde_json::Value;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use solana_transaction_status::{
    parse_instruction::ParsedInstruction, EncodedConfirmedTransactionWithStatusMeta,
    EncodedTransaction, UiInstruction, UiMessage, UiParsedInstruction,
};
use std::str::FromStr;

/// Program name the RPC node uses for parsed SPL token instructions.
const SPL_TOKEN_PROGRAM_NAME: &str = "spl-token";

/// Balance snapshot and token transfers of one confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDetail {
    pub signature: Signature,
    pub slot: u64,
    pub failed: bool,
    /// Index 0 is the fee payer.
    pub account_keys: Vec<Pubkey>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    /// Inner-instruction transfers first, then top-level ones.
    pub token_transfers: Vec<TokenTransfer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    /// Source token account.
    pub source: Pubkey,
    /// Destination token account.
    pub destination: Pubkey,
    /// Owner (or delegate) that signed for the source account.
    pub authority: Pubkey,
    /// Amount in token base units.
    pub amount: u64,
    /// Only present for `transferChecked`.
    pub mint: Option<Pubkey>,
    pub inner: bool,
}

impl TransactionDetail {
    /// Returns the signed lamport change of `account`, or `None` when the
    /// account is not part of the transaction.
    pub fn lamport_delta(&self, account: &Pubkey) -> Option<i128> {
        let index = self.account_keys.iter().position(|key| key == account)?;
        let pre = *self.pre_balances.get(index)?;
        let post = *self.post_balances.get(index)?;
        Some(post as i128 - pre as i128)
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.account_keys.first().copied()
    }

    pub fn from_encoded(
        signature: Signature,
        encoded: EncodedConfirmedTransactionWithStatusMeta,
    ) -> Result<Self> {
        let slot = encoded.slot;
        let meta = encoded.transaction.meta.ok_or_else(|| {
            SettlementError::MalformedTransaction(format!("{signature} has no status meta"))
        })?;

        let message = match encoded.transaction.transaction {
            EncodedTransaction::Json(tx) => match tx.message {
                UiMessage::Parsed(message) => message,
                UiMessage::Raw(_) => {
                    return Err(SettlementError::MalformedTransaction(format!(
                        "{signature} was returned with a raw message; jsonParsed expected"
                    )))
                }
            },
            _ => {
                return Err(SettlementError::MalformedTransaction(format!(
                    "{signature} was returned in a binary encoding; jsonParsed expected"
                )))
            }
        };

        let account_keys = message
            .account_keys
            .iter()
            .map(|account| parse_pubkey(&account.pubkey))
            .collect::<Result<Vec<_>>>()?;

        let inner: Option<Vec<_>> = meta.inner_instructions.into();
        let mut token_transfers: Vec<TokenTransfer> = inner
            .unwrap_or_default()
            .iter()
            .flat_map(|group| group.instructions.iter())
            .filter_map(|ix| token_transfer_from_ui(ix, true))
            .collect();
        token_transfers.extend(
            message
                .instructions
                .iter()
                .filter_map(|ix| token_transfer_from_ui(ix, false)),
        );

        Ok(Self {
            signature,
            slot,
            failed: meta.err.is_some(),
            account_keys,
            pre_balances: meta.pre_balances,
            post_balances: meta.post_balances,
            token_transfers,
        })
    }
}

fn token_transfer_from_ui(ix: &UiInstruction, inner: bool) -> Option<TokenTransfer> {
    match ix {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => {
            parse_token_transfer(parsed, inner)
        }
        _ => None,
    }
}

/// Extracts a `transfer` / `transferChecked` from a parsed SPL token
/// instruction. Anything else, including malformed fields, yields `None`.
pub fn parse_token_transfer(ix: &ParsedInstruction, inner: bool) -> Option<TokenTransfer> {
    if ix.program != SPL_TOKEN_PROGRAM_NAME {
        return None;
    }
    let kind = ix.parsed.get("type")?.as_str()?;
    let info = ix.parsed.get("info")?;

    let (amount, mint) = match kind {
        "transfer" => (amount_field(info.get("amount")?)?, None),
        "transferChecked" => (
            amount_field(info.get("tokenAmount")?.get("amount")?)?,
            Some(pubkey_field(info, "mint")?),
        ),
        _ => return None,
    };

    let authority = pubkey_field(info, "authority")
        .or_else(|| pubkey_field(info, "multisigAuthority"))?;

    Some(TokenTransfer {
        source: pubkey_field(info, "source")?,
        destination: pubkey_field(info, "destination")?,
        authority,
        amount,
        mint,
        inner,
    })
}

fn amount_field(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn pubkey_field(info: &Value, name: &str) -> Option<Pubkey> {
    Pubkey::from_str(info.get(name)?.as_str()?).ok()
}

fn parse_pubkey(s: &str) -> Result<Pubkey> {
    Pubkey::from_str(s)
        .map_err(|e| SettlementError::MalformedTransaction(format!("bad account key {s}: {e}")))
}
