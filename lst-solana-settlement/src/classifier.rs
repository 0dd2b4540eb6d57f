//! Labels observed events from their log lines.
//!
//! Matching on `Program <id> invoke` lines is a heuristic: a transaction that
//! merely touches one of these programs is still labelled. The processors
//! re-derive the actual transfer from the structured transaction detail.

use crate::events::ObservedEvent;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
    /// Lamports were (probably) sent to the treasury.
    Deposit,
    /// Derivative tokens were (probably) sent to the treasury token account.
    Redemption,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTransaction {
    pub kind: SettlementKind,
    pub signature: Signature,
}

#[derive(Debug, Clone)]
pub struct TransactionClassifier {
    /// Checked in order; the first family with a matching line wins.
    markers: Vec<(SettlementKind, String)>,
}

impl Default for TransactionClassifier {
    fn default() -> Self {
        Self::new(&solana_sdk::system_program::id(), &spl_token::id())
    }
}

impl TransactionClassifier {
    pub fn new(native_transfer_program: &Pubkey, token_program: &Pubkey) -> Self {
        Self {
            markers: vec![
                (SettlementKind::Deposit, invoke_marker(native_transfer_program)),
                (SettlementKind::Redemption, invoke_marker(token_program)),
            ],
        }
    }

    pub fn classify(&self, event: &ObservedEvent) -> ClassifiedTransaction {
        let kind = self
            .markers
            .iter()
            .find(|(_, marker)| event.log_lines.iter().any(|line| line.contains(marker.as_str())))
            .map(|(kind, _)| *kind)
            .unwrap_or(SettlementKind::Ignored);

        ClassifiedTransaction {
            kind,
            signature: event.signature,
        }
    }
}

fn invoke_marker(program: &Pubkey) -> String {
    format!("Program {program} invoke")
}
