//! # Settlement Listener
//!
//! The [`SettlementListener`] owns the single `logsSubscribe` subscription for
//! the treasury and runs every notification through the classifier and the
//! matching processor.
//!
//! ## Lifecycle
//!
//! `Idle → Subscribed → (event) Dispatching → Subscribed`, ending in
//! `Stopped` when the subscription cannot be established or its stream ends.
//! Both are reported as [`SettlementError::SubscriptionFailure`]; the listener
//! never keeps running without a live subscription.
//!
//! ## Scheduling
//!
//! With `dispatch.max-concurrency = 1` (the default) each notification is fully
//! processed before the next one is taken from the stream. Larger values let
//! classification and detail fetches overlap, while submissions remain
//! serialised by the [`Submitter`].

use crate::{
    classifier::{SettlementKind, TransactionClassifier},
    client::{LedgerClient, LedgerHandle, Submitter},
    config::SettlementConfig,
    error::{Result, SettlementError},
    events::ObservedEvent,
    processors::{
        DepositProcessor, SettlementContext, SettlementOutcome, SkipReason, WatchedAccount,
        WithdrawalProcessor,
    },
    rate::ExchangeRate,
    storage::SettlementStore,
};
use futures::{future, Stream, StreamExt};
use solana_client::{
    nonblocking::pubsub_client::PubsubClient,
    rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter},
};
use solana_sdk::{commitment_config::CommitmentConfig, signature::Keypair};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Subscribed,
    Dispatching,
    Stopped,
}

pub struct SettlementListener {
    config: Arc<SettlementConfig>,
    watched: WatchedAccount,
    classifier: TransactionClassifier,
    deposits: DepositProcessor,
    withdrawals: WithdrawalProcessor,
    state: watch::Sender<ListenerState>,
    in_flight: AtomicUsize,
}

impl SettlementListener {
    /// Wires the processors to a ledger client and the treasury keypair.
    ///
    /// `store` enables durable at-most-once settlement; pass `None` to keep
    /// no state at all between dispatches.
    pub fn new(
        config: Arc<SettlementConfig>,
        client: Arc<dyn LedgerClient>,
        signer: Arc<Keypair>,
        store: Option<Arc<dyn SettlementStore>>,
    ) -> Result<Self> {
        let rate = ExchangeRate::from_config(&config.exchange)?;
        let watched = WatchedAccount::from_config(&config.treasury);
        let ledger = LedgerHandle::new(
            client,
            Duration::from_secs(config.dispatch.request_timeout_secs),
        );
        let submitter = Submitter::new(ledger.clone(), signer, store);

        let ctx = Arc::new(SettlementContext {
            watched,
            rate,
            ledger,
            submitter,
        });
        let (state, _) = watch::channel(ListenerState::Idle);

        Ok(Self {
            config,
            watched,
            classifier: TransactionClassifier::default(),
            deposits: DepositProcessor::new(ctx.clone()),
            withdrawals: WithdrawalProcessor::new(ctx),
            state,
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn watched(&self) -> &WatchedAccount {
        &self.watched
    }

    pub fn deposits(&self) -> &DepositProcessor {
        &self.deposits
    }

    pub fn withdrawals(&self) -> &WithdrawalProcessor {
        &self.withdrawals
    }

    /// Subscribes to state transitions.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Opens the log subscription and processes notifications until it ends.
    ///
    /// Only ever returns an error; every error it returns is fatal.
    pub async fn run(&self) -> Result<()> {
        let solana = &self.config.solana;
        let client = PubsubClient::new(&solana.ws_url).await.map_err(|e| {
            self.transition(ListenerState::Stopped);
            SettlementError::SubscriptionFailure(format!("connect {}: {}", solana.ws_url, e))
        })?;

        let (stream, _unsubscribe) = client
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![self.watched.address.to_string()]),
                RpcTransactionLogsConfig {
                    commitment: Some(CommitmentConfig {
                        commitment: solana.commitment,
                    }),
                },
            )
            .await
            .map_err(|e| {
                self.transition(ListenerState::Stopped);
                SettlementError::SubscriptionFailure(format!("logsSubscribe: {e}"))
            })?;

        tracing::info!(
            treasury = %self.watched.address,
            token_account = %self.watched.token_account,
            "Listening for treasury logs..."
        );

        let events = stream.filter_map(|msg| future::ready(ObservedEvent::from_notification(msg)));
        self.process_stream(events).await
    }

    /// Dispatches every event of `events`. The end of the stream is treated
    /// as a lost subscription.
    pub async fn process_stream<S>(&self, events: S) -> Result<()>
    where
        S: Stream<Item = ObservedEvent>,
    {
        self.transition(ListenerState::Subscribed);

        let limit = self.config.dispatch.max_concurrency.max(1);
        events
            .for_each_concurrent(limit, |event| self.dispatch_and_log(event))
            .await;

        self.transition(ListenerState::Stopped);
        Err(SettlementError::SubscriptionFailure(
            "log subscription stream closed".to_string(),
        ))
    }

    /// Classifies one event and runs the matching processor.
    pub async fn dispatch(&self, event: &ObservedEvent) -> Result<SettlementOutcome> {
        if event.failed {
            return Ok(SettlementOutcome::Skipped(SkipReason::FailedTransaction));
        }

        let classified = self.classifier.classify(event);
        match classified.kind {
            SettlementKind::Deposit => {
                tracing::info!(signature = %classified.signature, "Potential SOL deposit");
                self.deposits.process(&classified.signature).await
            }
            SettlementKind::Redemption => {
                tracing::info!(signature = %classified.signature, "Potential LST redemption");
                self.withdrawals.process(&classified.signature).await
            }
            SettlementKind::Ignored => Ok(SettlementOutcome::Skipped(SkipReason::Unclassified)),
        }
    }

    async fn dispatch_and_log(&self, event: ObservedEvent) {
        self.track_in_flight(true);

        match self.dispatch(&event).await {
            Ok(SettlementOutcome::Skipped(reason)) => {
                tracing::debug!(signature = %event.signature, ?reason, "No settlement required");
            }
            Ok(outcome) => {
                tracing::info!(signature = %event.signature, ?outcome, "Settlement complete");
            }
            Err(e) => {
                tracing::error!(
                    signature = %event.signature,
                    slot = event.slot,
                    "Failed to settle transaction, dropping event: {}",
                    e
                );
            }
        }

        self.track_in_flight(false);
    }

    /// Counts a dispatch in or out and publishes the matching state. Both
    /// happen under the channel's lock, so a finishing dispatch can never
    /// overwrite the `Dispatching` state of one that started after it.
    fn track_in_flight(&self, starting: bool) {
        self.state.send_if_modified(|state| {
            let in_flight = if starting {
                self.in_flight.fetch_add(1, Ordering::SeqCst) + 1
            } else {
                self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1
            };
            let next = if in_flight > 0 {
                ListenerState::Dispatching
            } else {
                ListenerState::Subscribed
            };
            if *state == next {
                return false;
            }
            tracing::debug!(previous = ?*state, ?next, "Listener state changed");
            *state = next;
            true
        });
    }

    fn transition(&self, next: ListenerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(?previous, ?next, "Listener state changed");
        }
    }
}
