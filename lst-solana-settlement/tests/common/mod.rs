#![allow(dead_code)]

use async_trait::async_trait;
use lst_solana_settlement::{
    client::LedgerClient,
    config::SettlementConfig,
    detail::{TokenTransfer, TransactionDetail},
    events::ObservedEvent,
    listener::SettlementListener,
    storage::{SettlementReceipt, SettlementStore},
    Result, SettlementError,
};
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use spl_token::instruction::TokenInstruction;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
/// One whole derivative token at 9 decimals.
pub const TOKEN: u64 = 1_000_000_000;

pub const SYSTEM_INVOKE: &str = "Program 11111111111111111111111111111111 invoke [1]";
pub const TOKEN_INVOKE: &str = "Program TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA invoke [1]";

// A mock ledger that serves canned transaction details and records every submission.
#[derive(Default)]
pub struct MockLedger {
    transactions: Mutex<HashMap<Signature, TransactionDetail>>,
    accounts: Mutex<HashSet<Pubkey>>,
    submitted: Mutex<Vec<Transaction>>,
    /// Delay applied to `get_transaction_detail`.
    latency: Option<Duration>,
    /// Number of upcoming `get_latest_blockhash` calls that fail.
    blockhash_failures: AtomicUsize,
}

impl MockLedger {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn with_blockhash_failures(failures: usize) -> Self {
        Self {
            blockhash_failures: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    pub fn insert_transaction(&self, detail: TransactionDetail) {
        self.transactions
            .lock()
            .unwrap()
            .insert(detail.signature, detail);
    }

    pub fn get_detail(&self, signature: &Signature) -> Option<TransactionDetail> {
        self.transactions.lock().unwrap().get(signature).cloned()
    }

    pub fn create_account(&self, address: Pubkey) {
        self.accounts.lock().unwrap().insert(address);
    }

    pub fn submitted(&self) -> Vec<Transaction> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_transaction_detail(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionDetail>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self.accounts.lock().unwrap().contains(address))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        let failing = self
            .blockhash_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SettlementError::NetworkFailure("node unavailable".into()));
        }
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        if transaction.signatures.is_empty() {
            return Err(SettlementError::NetworkFailure("unsigned transaction".into()));
        }
        self.submitted.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }
}

/// An in-memory `SettlementStore`.
#[derive(Default)]
pub struct MemoryStore {
    receipts: Mutex<HashMap<String, SettlementReceipt>>,
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn claim(&self, receipt: &SettlementReceipt) -> anyhow::Result<bool> {
        let mut receipts = self.receipts.lock().unwrap();
        if receipts.contains_key(&receipt.origin_signature) {
            return Ok(false);
        }
        receipts.insert(receipt.origin_signature.clone(), receipt.clone());
        Ok(true)
    }

    async fn complete(&self, receipt: &SettlementReceipt) -> anyhow::Result<()> {
        self.receipts
            .lock()
            .unwrap()
            .insert(receipt.origin_signature.clone(), receipt.clone());
        Ok(())
    }

    async fn receipt(&self, origin: &Signature) -> anyhow::Result<Option<SettlementReceipt>> {
        Ok(self.receipts.lock().unwrap().get(&origin.to_string()).cloned())
    }
}

/// A listener wired to a `MockLedger`, plus the keys it was configured with.
pub struct TestHarness {
    pub ledger: Arc<MockLedger>,
    pub treasury: Arc<Keypair>,
    pub mint: Pubkey,
    pub listener: SettlementListener,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(MockLedger::default(), None, |_| {})
    }

    pub fn with_store(store: Arc<dyn SettlementStore>) -> Self {
        Self::build(MockLedger::default(), Some(store), |_| {})
    }

    pub fn with_ledger_and_store(ledger: MockLedger, store: Arc<dyn SettlementStore>) -> Self {
        Self::build(ledger, Some(store), |_| {})
    }

    pub fn build(
        ledger: MockLedger,
        store: Option<Arc<dyn SettlementStore>>,
        configure: impl FnOnce(&mut SettlementConfig),
    ) -> Self {
        let ledger = Arc::new(ledger);
        let treasury = Arc::new(Keypair::new());
        let mint = Pubkey::new_unique();

        let mut config = SettlementConfig::default();
        config.treasury.address = treasury.pubkey();
        config.treasury.token_mint = mint;
        configure(&mut config);

        let listener = SettlementListener::new(
            Arc::new(config),
            ledger.clone(),
            treasury.clone(),
            store,
        )
        .expect("valid test configuration");

        Self {
            ledger,
            treasury,
            mint,
            listener,
        }
    }

    /// The treasury's associated token account.
    pub fn treasury_token_account(&self) -> Pubkey {
        self.listener.watched().token_account
    }

    /// Registers a lamport transfer `depositor -> treasury` with the given
    /// treasury balances.
    pub fn add_deposit(&self, signature: Signature, depositor: Pubkey, pre: u64, post: u64) {
        self.ledger.insert_transaction(TransactionDetail {
            signature,
            slot: 10,
            failed: false,
            account_keys: vec![depositor, self.treasury.pubkey(), solana_sdk::system_program::id()],
            pre_balances: vec![10 * LAMPORTS_PER_SOL, pre, 1],
            post_balances: vec![10 * LAMPORTS_PER_SOL - (post.saturating_sub(pre)) - 5_000, post, 1],
            token_transfers: vec![],
        });
    }

    /// Registers a token transfer signed by `redeemer` into `destination`.
    pub fn add_redemption(
        &self,
        signature: Signature,
        redeemer: Pubkey,
        destination: Pubkey,
        amount: u64,
    ) {
        self.ledger.insert_transaction(TransactionDetail {
            signature,
            slot: 11,
            failed: false,
            account_keys: vec![redeemer, Pubkey::new_unique(), destination, spl_token::id()],
            pre_balances: vec![LAMPORTS_PER_SOL, 2_039_280, 2_039_280, 1],
            post_balances: vec![LAMPORTS_PER_SOL - 5_000, 2_039_280, 2_039_280, 1],
            token_transfers: vec![TokenTransfer {
                source: Pubkey::new_unique(),
                destination,
                authority: redeemer,
                amount,
                mint: None,
                inner: false,
            }],
        });
    }
}

pub fn signature(seed: u8) -> Signature {
    Signature::from([seed; 64])
}

pub fn event(signature: Signature, marker: &str) -> ObservedEvent {
    ObservedEvent::new(
        signature,
        vec![
            marker.to_string(),
            marker.replace("invoke [1]", "success"),
        ],
    )
}

/// An event that invokes neither the system nor the token program.
pub fn unrelated_event(signature: Signature) -> ObservedEvent {
    event(
        signature,
        "Program ComputeBudget111111111111111111111111111111 invoke [1]",
    )
}

/// `(destination, amount)` of every SPL `MintTo` in the transaction.
pub fn mints(tx: &Transaction) -> Vec<(Pubkey, u64)> {
    let keys = &tx.message.account_keys;
    tx.message
        .instructions
        .iter()
        .filter(|ix| keys[ix.program_id_index as usize] == spl_token::id())
        .filter_map(|ix| match TokenInstruction::unpack(&ix.data) {
            Ok(TokenInstruction::MintTo { amount }) => {
                Some((keys[ix.accounts[1] as usize], amount))
            }
            _ => None,
        })
        .collect()
}

/// `(from, to, lamports)` of every system transfer in the transaction.
pub fn lamport_transfers(tx: &Transaction) -> Vec<(Pubkey, Pubkey, u64)> {
    let keys = &tx.message.account_keys;
    tx.message
        .instructions
        .iter()
        .filter(|ix| keys[ix.program_id_index as usize] == solana_sdk::system_program::id())
        // SystemInstruction::Transfer is variant 2, followed by a little-endian u64.
        .filter(|ix| ix.data.len() == 12 && ix.data[..4] == [2, 0, 0, 0])
        .map(|ix| {
            let lamports = u64::from_le_bytes(ix.data[4..12].try_into().unwrap());
            (
                keys[ix.accounts[0] as usize],
                keys[ix.accounts[1] as usize],
                lamports,
            )
        })
        .collect()
}
