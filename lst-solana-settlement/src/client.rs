//! # Ledger Access
//!
//! This module holds the seam between settlement logic and the Solana node.
//!
//! - [`LedgerClient`]: the request/response calls the processors need,
//!   implemented for the nonblocking `RpcClient` and by in-memory mocks in tests.
//! - [`LedgerHandle`]: wraps a shared client and puts a deadline on every call.
//! - [`Submitter`]: the single writer for the treasury keypair. It fetches a
//!   blockhash, signs and submits one transaction at a time, and consults the
//!   optional [`SettlementStore`] before anything is sent.

use crate::{
    detail::TransactionDetail,
    error::{Result, SettlementError},
    storage::{SettlementReceipt, SettlementStore},
};
use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcTransactionConfig,
};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use solana_transaction_status::UiTransactionEncoding;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::Mutex;

/// A trait abstracting over the asynchronous RPC calls used during settlement.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetches a transaction in `jsonParsed` form. `Ok(None)` means the node
    /// does not know the signature (yet).
    async fn get_transaction_detail(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionDetail>>;
    /// Whether an account currently exists at `address`.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool>;
    /// Fetches the latest blockhash from the RPC endpoint.
    async fn get_latest_blockhash(&self) -> Result<Hash>;
    /// Sends a signed transaction and waits until it reaches the client's commitment.
    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature>;
}

#[async_trait]
impl LedgerClient for RpcClient {
    async fn get_transaction_detail(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionDetail>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(self.commitment()),
            max_supported_transaction_version: Some(0),
        };
        match self.get_transaction_with_config(signature, config).await {
            Ok(tx) => TransactionDetail::from_encoded(*signature, tx).map(Some),
            Err(e) if is_missing_transaction(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await?;
        Ok(response.value.is_some())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(RpcClient::get_latest_blockhash(self).await?)
    }

    async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        Ok(RpcClient::send_and_confirm_transaction(self, transaction).await?)
    }
}

/// `getTransaction` answers `null` for unknown signatures, which the client
/// surfaces as a deserialization error.
fn is_missing_transaction(err: &ClientError) -> bool {
    matches!(err.kind(), ClientErrorKind::SerdeJson(_))
}

/// A shared ledger client with a deadline on every call.
#[derive(Clone)]
pub struct LedgerHandle {
    client: Arc<dyn LedgerClient>,
    timeout: Duration,
}

impl LedgerHandle {
    pub fn new(client: Arc<dyn LedgerClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn get_transaction_detail(&self, signature: &Signature) -> Result<TransactionDetail> {
        self.within("get_transaction", self.client.get_transaction_detail(signature))
            .await?
            .ok_or(SettlementError::TransactionNotFound(*signature))
    }

    pub async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        self.within("get_account", self.client.account_exists(address))
            .await
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.within("get_latest_blockhash", self.client.get_latest_blockhash())
            .await
    }

    pub async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        self.within(
            "send_and_confirm_transaction",
            self.client.send_and_confirm_transaction(transaction),
        )
        .await
    }

    async fn within<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| SettlementError::Timeout(operation))?
    }
}

/// Signs and submits counter-transactions with the treasury keypair.
///
/// Only one build-and-submit section runs at a time so that concurrent
/// dispatches never race on the same signer.
pub struct Submitter {
    ledger: LedgerHandle,
    signer: Arc<Keypair>,
    store: Option<Arc<dyn SettlementStore>>,
    lock: Mutex<()>,
}

impl Submitter {
    pub fn new(
        ledger: LedgerHandle,
        signer: Arc<Keypair>,
        store: Option<Arc<dyn SettlementStore>>,
    ) -> Self {
        Self {
            ledger,
            signer,
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn payer(&self) -> Pubkey {
        self.signer.pubkey()
    }

    /// Submits `instructions` as one transaction settling `receipt`'s origin.
    ///
    /// Returns `Ok(None)` without sending anything if the configured store
    /// reports that the origin was already claimed. The transaction is built
    /// and signed before the claim is taken, so a failure to reach the node at
    /// that point leaves the origin unclaimed. Once claimed, a failed send
    /// keeps the claim: the transaction may still have landed.
    pub async fn submit(
        &self,
        receipt: SettlementReceipt,
        instructions: &[Instruction],
    ) -> Result<Option<Signature>> {
        let _guard = self.lock.lock().await;

        let blockhash = self.ledger.get_latest_blockhash().await?;
        let payer = self.signer.pubkey();
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer),
            &[self.signer.as_ref()],
            blockhash,
        );

        if let Some(store) = &self.store {
            let claimed = store.claim(&receipt).await.map_err(store_error)?;
            if !claimed {
                tracing::warn!(
                    origin = %receipt.origin_signature,
                    "Origin transaction already settled, skipping submission"
                );
                return Ok(None);
            }
        }

        let signature = self
            .ledger
            .send_and_confirm_transaction(&transaction)
            .await
            .inspect_err(|e| {
                if self.store.is_some() {
                    tracing::error!(
                        origin = %receipt.origin_signature,
                        "Submission failed after claiming the origin; it will not be retried: {}",
                        e
                    );
                }
            })?;

        if let Some(store) = &self.store {
            store
                .complete(&receipt.completed(&signature))
                .await
                .map_err(store_error)?;
        }

        Ok(Some(signature))
    }
}

fn store_error(err: anyhow::Error) -> SettlementError {
    SettlementError::Store(format!("{err:#}"))
}
