//! Actor-based concurrency for the engine
//!
//! This module implements the single-writer pattern using Tokio actors:
//! one task owns the [`Reconciler`], so no two calls ever mutate the
//! shared state concurrently. Callers hold a cloneable
//! [`ReconcilerHandle`] and await their reply over a oneshot channel.
//!
//! ```text
//! callers ──▶ ReconcilerHandle (Clone)
//!                  │ mpsc::channel (bounded)
//!                  ▼
//!           ReconcilerActor (single task)
//!                  │
//!                  ▼
//!           Reconciler (exclusively owned)
//! ```

use crate::{
    auth::Credential,
    engine::{Reconciler, StateSnapshot},
    Error, Result,
};
use action_log::{ActionRange, CurrentAction, Cursor};
use merkle_ledger::{AccountRecord, IdentityKey, LedgerWitness};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the reconciler actor
pub enum ReconcilerMessage {
    /// Queue a sign-up action
    RequestSignUp {
        /// Caller credential
        credential: Credential,
        /// Identity to register
        identity: IdentityKey,
        /// Reply channel
        response: oneshot::Sender<Result<Cursor>>,
    },

    /// Queue an add-funds action
    RequestAddFunds {
        /// Caller credential
        credential: Credential,
        /// Caller's committed record
        claimed: AccountRecord,
        /// Witness proving the record
        witness: LedgerWitness,
        /// Deposit amount
        amount: Decimal,
        /// Reply channel
        response: oneshot::Sender<Result<Cursor>>,
    },

    /// Queue a release-funds action
    RequestReleaseFunds {
        /// Caller credential
        credential: Credential,
        /// Caller's committed record
        claimed: AccountRecord,
        /// Witness proving the record
        witness: LedgerWitness,
        /// Release amount
        amount: Decimal,
        /// Release recipient (caller when None)
        counterparty: Option<IdentityKey>,
        /// Reply channel
        response: oneshot::Sender<Result<Cursor>>,
    },

    /// Freeze a new settlement range
    OpenRange {
        /// Reply channel
        response: oneshot::Sender<Result<ActionRange>>,
    },

    /// Resolve the action at the current turn
    CurrentAction {
        /// Reply channel
        response: oneshot::Sender<Result<CurrentAction>>,
    },

    /// Settle the sign-up action at the current turn
    ProcessSignUp {
        /// Witness proving the empty slot
        witness: LedgerWitness,
        /// Reply channel
        response: oneshot::Sender<Result<[u8; 32]>>,
    },

    /// Settle the add-funds action at the current turn
    ProcessAddFunds {
        /// Committed record being replaced
        claimed: AccountRecord,
        /// Witness proving the record
        witness: LedgerWitness,
        /// Reply channel
        response: oneshot::Sender<Result<[u8; 32]>>,
    },

    /// Settle the release action at the current turn
    ProcessReleaseFunds {
        /// Committed record being replaced
        claimed: AccountRecord,
        /// Witness proving the record
        witness: LedgerWitness,
        /// Reply channel
        response: oneshot::Sender<Result<[u8; 32]>>,
    },

    /// Fresh witness for an identity
    WitnessFor {
        /// Identity to witness
        identity: IdentityKey,
        /// Reply channel
        response: oneshot::Sender<Result<LedgerWitness>>,
    },

    /// Read the commitment surface
    Snapshot {
        /// Reply channel
        response: oneshot::Sender<StateSnapshot>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Handle for sending messages to the reconciler actor
#[derive(Clone)]
pub struct ReconcilerHandle {
    sender: mpsc::Sender<ReconcilerMessage>,
}

impl std::fmt::Debug for ReconcilerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerHandle").finish()
    }
}

impl ReconcilerHandle {
    async fn call<T>(
        &self,
        message: ReconcilerMessage,
        receiver: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.sender
            .send(message)
            .await
            .map_err(|_| Error::Concurrency("actor mailbox closed".to_string()))?;
        receiver
            .await
            .map_err(|_| Error::Concurrency("actor dropped response".to_string()))?
    }

    /// Queue a sign-up action
    pub async fn request_sign_up(
        &self,
        credential: Credential,
        identity: IdentityKey,
    ) -> Result<Cursor> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ReconcilerMessage::RequestSignUp {
                credential,
                identity,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Queue an add-funds action
    pub async fn request_add_funds(
        &self,
        credential: Credential,
        claimed: AccountRecord,
        witness: LedgerWitness,
        amount: Decimal,
    ) -> Result<Cursor> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ReconcilerMessage::RequestAddFunds {
                credential,
                claimed,
                witness,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Queue a release-funds action
    pub async fn request_release_funds(
        &self,
        credential: Credential,
        claimed: AccountRecord,
        witness: LedgerWitness,
        amount: Decimal,
        counterparty: Option<IdentityKey>,
    ) -> Result<Cursor> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ReconcilerMessage::RequestReleaseFunds {
                credential,
                claimed,
                witness,
                amount,
                counterparty,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Freeze a new settlement range
    pub async fn open_range(&self) -> Result<ActionRange> {
        let (tx, rx) = oneshot::channel();
        self.call(ReconcilerMessage::OpenRange { response: tx }, rx)
            .await
    }

    /// Resolve the action at the current turn
    pub async fn current_action(&self) -> Result<CurrentAction> {
        let (tx, rx) = oneshot::channel();
        self.call(ReconcilerMessage::CurrentAction { response: tx }, rx)
            .await
    }

    /// Settle the sign-up action at the current turn
    pub async fn process_sign_up(&self, witness: LedgerWitness) -> Result<[u8; 32]> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ReconcilerMessage::ProcessSignUp {
                witness,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Settle the add-funds action at the current turn
    pub async fn process_add_funds(
        &self,
        claimed: AccountRecord,
        witness: LedgerWitness,
    ) -> Result<[u8; 32]> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ReconcilerMessage::ProcessAddFunds {
                claimed,
                witness,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Settle the release action at the current turn
    pub async fn process_release_funds(
        &self,
        claimed: AccountRecord,
        witness: LedgerWitness,
    ) -> Result<[u8; 32]> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ReconcilerMessage::ProcessReleaseFunds {
                claimed,
                witness,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Fresh witness for an identity
    pub async fn witness_for(&self, identity: IdentityKey) -> Result<LedgerWitness> {
        let (tx, rx) = oneshot::channel();
        self.call(
            ReconcilerMessage::WitnessFor {
                identity,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Read the commitment surface
    pub async fn snapshot(&self) -> Result<StateSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ReconcilerMessage::Snapshot { response: tx })
            .await
            .map_err(|_| Error::Concurrency("actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("actor dropped response".to_string()))
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(ReconcilerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("actor mailbox closed".to_string()))
    }
}

/// Spawn the reconciler actor, returning a handle to it
pub fn spawn_reconciler(engine: Reconciler, mailbox_capacity: usize) -> ReconcilerHandle {
    let (sender, mailbox) = mpsc::channel(mailbox_capacity);
    tokio::spawn(run(engine, mailbox));
    ReconcilerHandle { sender }
}

/// Actor event loop: drain the mailbox one message at a time
async fn run(mut engine: Reconciler, mut mailbox: mpsc::Receiver<ReconcilerMessage>) {
    while let Some(message) = mailbox.recv().await {
        match message {
            ReconcilerMessage::RequestSignUp {
                credential,
                identity,
                response,
            } => {
                let _ = response.send(engine.request_sign_up(&credential, identity));
            }
            ReconcilerMessage::RequestAddFunds {
                credential,
                claimed,
                witness,
                amount,
                response,
            } => {
                let _ =
                    response.send(engine.request_add_funds(&credential, &claimed, &witness, amount));
            }
            ReconcilerMessage::RequestReleaseFunds {
                credential,
                claimed,
                witness,
                amount,
                counterparty,
                response,
            } => {
                let _ = response.send(engine.request_release_funds(
                    &credential,
                    &claimed,
                    &witness,
                    amount,
                    counterparty,
                ));
            }
            ReconcilerMessage::OpenRange { response } => {
                let _ = response.send(engine.open_range());
            }
            ReconcilerMessage::CurrentAction { response } => {
                let _ = response.send(engine.current_action());
            }
            ReconcilerMessage::ProcessSignUp { witness, response } => {
                let _ = response.send(engine.process_sign_up(&witness));
            }
            ReconcilerMessage::ProcessAddFunds {
                claimed,
                witness,
                response,
            } => {
                let _ = response.send(engine.process_add_funds(&claimed, &witness));
            }
            ReconcilerMessage::ProcessReleaseFunds {
                claimed,
                witness,
                response,
            } => {
                let _ = response.send(engine.process_release_funds(&claimed, &witness));
            }
            ReconcilerMessage::WitnessFor { identity, response } => {
                let _ = response.send(engine.witness_for(&identity));
            }
            ReconcilerMessage::Snapshot { response } => {
                let _ = response.send(engine.snapshot());
            }
            ReconcilerMessage::Shutdown => {
                tracing::info!("reconciler actor shutting down");
                break;
            }
        }
    }
}
